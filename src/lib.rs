//! Thin front ends for the Kokoro neural text-to-speech engine.
//!
//! The crate wires four small pieces together:
//!
//! - [`artifacts`] resolves the model/voices files into the local cache,
//!   downloading them on first use.
//! - [`backends`] invokes the external engine and hands back raw PCM.
//! - [`audio`] writes WAV containers and plays buffers on output devices.
//! - [`server`] exposes the whole thing over HTTP; the CLI lives in the
//!   `kokorofile` binary.

pub mod artifacts;
pub mod audio;
pub mod backends;
pub mod error;
pub mod input;
pub mod server;
pub mod settings;

pub use error::KokoroError;

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the front ends and the synthesis plumbing.
///
/// Validation failures (`EmptyInput`, `VoiceNotFound`, `InvalidSpeed`,
/// `InvalidDevice`) map to HTTP 400; everything else is a 500.
#[derive(Debug, Error)]
pub enum KokoroError {
    #[error("No input text provided")]
    EmptyInput,

    #[error("voice '{0}' is not available")]
    VoiceNotFound(String),

    #[error("speed must be a positive number (got {0})")]
    InvalidSpeed(f32),

    #[error("no audio output device with id {0}")]
    InvalidDevice(usize),

    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audio device error: {0}")]
    Device(String),

    #[error("invalid voices archive: {0}")]
    VoiceParse(String),

    #[error("audio codec error: {0}")]
    Audio(#[from] hound::Error),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl KokoroError {
    /// True for errors caused by a bad request rather than an internal
    /// failure. The HTTP adapter uses this to pick 400 over 500.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KokoroError::EmptyInput
                | KokoroError::VoiceNotFound(_)
                | KokoroError::InvalidSpeed(_)
                | KokoroError::InvalidDevice(_)
        )
    }
}

use std::fs::File;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{AudioBuffer, SynthesisBackend, SynthesisRequest};
use crate::artifacts::ModelArtifacts;
use crate::error::KokoroError;

/// Backend driving the external Kokoro engine binary.
///
/// Each call spawns the engine with the resolved model/voices artifacts,
/// writes the text to its stdin and reads a WAV stream from its stdout.
/// The voice catalog is read once from the voices archive at construction
/// and kept for validation and listing.
pub struct KokoroBackend {
    binary: String,
    artifacts: ModelArtifacts,
    voices: Vec<String>,
}

impl KokoroBackend {
    pub fn new(binary: impl Into<String>, artifacts: ModelArtifacts) -> Result<Self, KokoroError> {
        let voices = voice_names(&artifacts.voices_path)?;
        info!("Loaded {} voices from archive", voices.len());
        Ok(Self {
            binary: binary.into(),
            artifacts,
            voices,
        })
    }

    /// Reject voices the loaded archive does not contain.
    pub fn ensure_voice(&self, voice: &str) -> Result<(), KokoroError> {
        if self.voices.iter().any(|v| v == voice) {
            Ok(())
        } else {
            Err(KokoroError::VoiceNotFound(voice.to_string()))
        }
    }
}

impl SynthesisBackend for KokoroBackend {
    fn id(&self) -> &'static str {
        "kokoro"
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, KokoroError> {
        self.ensure_voice(&request.voice)?;

        debug!(
            "Generating speech with voice '{}', speed {}, language '{}'",
            request.voice, request.speed, request.lang
        );

        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.artifacts.model_path)
            .arg("--voices")
            .arg(&self.artifacts.voices_path)
            .arg("--voice")
            .arg(&request.voice)
            .arg("--speed")
            .arg(request.speed.to_string())
            .arg("--lang")
            .arg(&request.lang)
            .arg("--output-file")
            .arg("-") // Output WAV to stdout
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                KokoroError::Synthesis(format!(
                    "failed to launch engine '{}': {}",
                    self.binary, e
                ))
            })?;

        // Write text to stdin and close it
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.text.as_bytes())?;
            stdin.write_all(b"\n")?;
            // stdin is dropped here, closing the pipe
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(KokoroError::Synthesis(format!(
                "engine exited with {}: {}",
                output.status,
                err.trim()
            )));
        }

        let buffer = decode_wav(output.stdout)?;
        if buffer.samples.is_empty() {
            return Err(KokoroError::Synthesis("engine produced no audio".into()));
        }
        Ok(buffer)
    }

    fn list_voices(&self) -> Vec<String> {
        self.voices.clone()
    }
}

/// List voice names from a `.npz` (numpy zip) archive.
///
/// Each entry is a `.npy` file named after the voice (e.g. `af_sarah.npy`);
/// the embeddings themselves are only read by the engine.
pub fn voice_names(path: &std::path::Path) -> Result<Vec<String>, KokoroError> {
    let file = File::open(path).map_err(|source| KokoroError::Filesystem {
        path: path.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| KokoroError::VoiceParse(format!("failed to open archive: {e}")))?;

    let mut names = Vec::new();
    for i in 0..zip.len() {
        let entry = zip
            .by_index(i)
            .map_err(|e| KokoroError::VoiceParse(format!("failed to read entry {i}: {e}")))?;

        let raw_name = entry.name().to_string();
        if raw_name.ends_with('/') {
            continue;
        }
        let voice = raw_name.trim_end_matches(".npy").to_string();
        if !voice.is_empty() {
            names.push(voice);
        }
    }

    names.sort_unstable();
    Ok(names)
}

/// Decode the engine's WAV stream into a mono f32 buffer.
fn decode_wav(bytes: Vec<u8>) -> Result<AudioBuffer, KokoroError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(KokoroError::Synthesis(format!(
            "expected mono engine output, got {} channels",
            spec.channels
        )));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(KokoroError::Audio)?,
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<Result<_, _>>()
            .map_err(KokoroError::Audio)?,
        (format, bits) => {
            return Err(KokoroError::Synthesis(format!(
                "unsupported engine sample format: {bits}-bit {format:?}"
            )))
        }
    };

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
    })
}

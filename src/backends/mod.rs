pub mod kokoro;

pub use kokoro::KokoroBackend;

use crate::error::KokoroError;

/// A single synthesis call: what to say and how.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub lang: String,
}

impl SynthesisRequest {
    /// Build a request, rejecting empty text and non-positive speed.
    pub fn new(
        text: impl Into<String>,
        voice: impl Into<String>,
        speed: f32,
        lang: impl Into<String>,
    ) -> Result<Self, KokoroError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(KokoroError::EmptyInput);
        }
        if !(speed.is_finite() && speed > 0.0) {
            return Err(KokoroError::InvalidSpeed(speed));
        }
        Ok(Self {
            text,
            voice: voice.into(),
            speed,
            lang: lang.into(),
        })
    }
}

/// Raw mono PCM produced by the engine, consumed by the output sink.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Trait that all speech synthesis backends must implement.
/// This keeps the front ends agnostic of how the audio is produced.
pub trait SynthesisBackend: Send + Sync {
    /// Returns the unique ID of the backend (e.g., "kokoro")
    fn id(&self) -> &'static str;

    /// Run one synthesis call, returning the decoded audio.
    /// The voice is validated against `list_voices` before the engine runs.
    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, KokoroError>;

    /// Returns the voices the loaded model can speak with, sorted.
    fn list_voices(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_and_rejects_empty_text() {
        let err = SynthesisRequest::new("   \n", "af_sarah", 1.0, "en-us").unwrap_err();
        assert!(matches!(err, KokoroError::EmptyInput));

        let req = SynthesisRequest::new(" hello ", "af_sarah", 1.0, "en-us").unwrap();
        assert_eq!(req.text, "hello");
    }

    #[test]
    fn test_request_rejects_non_positive_speed() {
        for speed in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = SynthesisRequest::new("hi", "af_sarah", speed, "en-us").unwrap_err();
            assert!(matches!(err, KokoroError::InvalidSpeed(_)));
        }
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 24000],
            sample_rate: 24000,
        };
        assert!((buffer.duration_secs() - 1.0).abs() < f64::EPSILON);
    }
}

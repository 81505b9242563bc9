use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::KokoroError;

/// Process-wide configuration, merged from defaults, an optional
/// `Kokorofile` config file and `KOKOROFILE_*` environment variables.
/// Command-line flags are applied on top by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    /// External engine binary invoked per synthesis request.
    pub engine_binary: String,
    pub voice: String,
    pub speed: f32,
    pub lang: String,
    pub host: String,
    pub port: u16,
}

fn default_dir(base: Option<PathBuf>) -> String {
    base.unwrap_or_else(std::env::temp_dir)
        .join("kokorofile")
        .to_string_lossy()
        .into_owned()
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            .set_default("cache_dir", default_dir(dirs::cache_dir()))?
            .set_default("data_dir", default_dir(dirs::data_dir()))?
            .set_default("engine_binary", "kokoro-tts")?
            .set_default("voice", "af_sarah")?
            .set_default("speed", 1.0)?
            .set_default("lang", "en-us")?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Kokorofile").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.config/kokorofile/Kokorofile",
                    std::env::var("HOME").unwrap_or_default()
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. KOKOROFILE_VOICE)
            .add_source(Environment::with_prefix("KOKOROFILE"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(config::ConfigError::Message(format!(
                "Invalid speed: {}. Must be a positive number",
                self.speed
            )));
        }
        if self.voice.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "voice must not be empty".to_string(),
            ));
        }
        if self.engine_binary.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "engine_binary must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the cache and data directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), KokoroError> {
        for dir in [&self.cache_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|source| KokoroError::Filesystem {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_settings_defaults() {
        let settings = Settings::new().expect("Failed to load settings");
        assert_eq!(settings.voice, "af_sarah");
        assert_eq!(settings.lang, "en-us");
        assert_eq!(settings.port, 8000);
        assert!(settings.speed > 0.0);
        assert!(settings.cache_dir.ends_with("kokorofile"));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("KOKOROFILE_VOICE", "bf_emma");
        let settings = Settings::new().expect("Failed to load settings");
        std::env::remove_var("KOKOROFILE_VOICE");
        assert_eq!(settings.voice, "bf_emma");
    }

    #[test]
    fn test_validate_rejects_bad_speed() {
        let mut settings = Settings::new().expect("Failed to load settings");
        settings.speed = 0.0;
        assert!(settings.validate().is_err());
        settings.speed = -1.5;
        assert!(settings.validate().is_err());
    }
}

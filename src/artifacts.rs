use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::KokoroError;
use crate::settings::Settings;

/// Fixed artifact filenames under the cache directory.
pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";
pub const VOICES_FILE: &str = "voices-v1.0.bin";

/// Release the artifacts are published under.
pub const DEFAULT_BASE_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0";

/// Locally resolved model files, ready to hand to the engine.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model_path: PathBuf,
    pub voices_path: PathBuf,
}

/// Resolves the model artifact pair into the cache directory, fetching
/// missing files from the release URL. Resolution is idempotent: a file
/// already present on disk is never downloaded again. There is no hash
/// check and no partial-download recovery.
pub struct ArtifactStore {
    cache_dir: PathBuf,
    base_url: String,
}

impl ArtifactStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            cache_dir: settings.cache_dir.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Store with a custom release URL. Used by tests against a local
    /// HTTP mock.
    pub fn with_base_url(cache_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            base_url: base_url.into(),
        }
    }

    pub fn resolve(&self) -> Result<ModelArtifacts, KokoroError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|source| KokoroError::Filesystem {
            path: self.cache_dir.clone(),
            source,
        })?;

        let model_path = self.fetch_if_missing(MODEL_FILE)?;
        let voices_path = self.fetch_if_missing(VOICES_FILE)?;

        Ok(ModelArtifacts {
            model_path,
            voices_path,
        })
    }

    fn fetch_if_missing(&self, file: &str) -> Result<PathBuf, KokoroError> {
        let dest = self.cache_dir.join(file);
        if dest.exists() {
            debug!("artifact {} already cached", file);
            return Ok(dest);
        }

        let url = format!("{}/{}", self.base_url, file);
        info!("Downloading {}...", file);

        let mut resp = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .map_err(|source| KokoroError::Download {
                url: url.clone(),
                source,
            })?;

        let mut out = write_dest(&dest)?;
        std::io::copy(&mut resp, &mut out).map_err(|source| KokoroError::Filesystem {
            path: dest.clone(),
            source,
        })?;

        info!("Saved {}", dest.display());
        Ok(dest)
    }
}

fn write_dest(path: &Path) -> Result<File, KokoroError> {
    File::create(path).map_err(|source| KokoroError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

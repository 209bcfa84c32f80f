//! Where downloaded PDFs end up.
//!
//! [`ArtifactSink`] stands in for a browser's native "save file" step. The
//! controller hands it the regenerated bytes together with the configured
//! filename; the sink decides where they go and reports the final location.

use crate::error::PreviewError;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

/// Persists a generated artifact under a given filename.
pub trait ArtifactSink: Send + Sync {
    /// Store `bytes` as `filename`, returning where it was saved.
    fn save<'a>(&'a self, filename: &'a str, bytes: &'a [u8]) -> BoxFuture<'a, Result<PathBuf, PreviewError>>;
}

/// Writes artifacts into a directory.
///
/// Uses atomic write (temp file + rename) so a failed download never leaves a
/// truncated PDF behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    async fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, PreviewError> {
        let path = self.dir.join(filename);
        let write_err = |source| PreviewError::ArtifactWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let tmp_path = path.with_extension("pdf.tmp");
        tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

        info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

impl ArtifactSink for DirectorySink {
    fn save<'a>(&'a self, filename: &'a str, bytes: &'a [u8]) -> BoxFuture<'a, Result<PathBuf, PreviewError>> {
        Box::pin(self.write(filename, bytes))
    }
}

/// Keeps artifacts in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, oldest first.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn save<'a>(&'a self, filename: &'a str, bytes: &'a [u8]) -> BoxFuture<'a, Result<PathBuf, PreviewError>> {
        Box::pin(async move {
            self.saved
                .lock()
                .map_err(|e| PreviewError::Internal(e.to_string()))?
                .push((filename.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(filename))
        })
    }
}

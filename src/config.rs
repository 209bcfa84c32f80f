//! Configuration types for the preview client.
//!
//! Everything the client needs to know lives in [`ClientConfig`], built via
//! its [`ClientConfigBuilder`]. The service endpoints, the download filename
//! and the two behavioural policies (eager vs. lazy generation, malformed
//! table handling) are all set here so a controller can be reproduced from
//! its config alone.

use crate::error::PreviewError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::lifecycle::RequestLifecycleController`].
///
/// # Example
/// ```rust
/// use edgequake_pdfpreview::{ClientConfig, GenerationMode};
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:5000")
///     .request_timeout_secs(60)
///     .generation(GenerationMode::Eager)
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_url().unwrap().path(), "/upload-pdfs");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the extraction/generation service. Default: `http://127.0.0.1:5000`.
    pub base_url: String,

    /// Path of the extraction endpoint. Default: `/upload-pdfs`.
    pub upload_path: String,

    /// Path of the generation endpoint. Default: `/generate-pdf`.
    pub generate_path: String,

    /// Multipart field name shared by every uploaded file. Default: `pdfFile`.
    pub file_field: String,

    /// Filename the regenerated PDF is saved under. Default: `extracted_content.pdf`.
    pub download_filename: String,

    /// Directory the default artifact sink writes into. Default: `.`.
    pub download_dir: PathBuf,

    /// Upper bound on any single request, in seconds. Default: 120.
    ///
    /// Expiry surfaces as [`PreviewError::Timeout`] and restores the phase
    /// the controller was in before the request.
    pub request_timeout_secs: u64,

    /// When the regenerated PDF is requested. Default: [`GenerationMode::Lazy`].
    pub generation: GenerationMode,

    /// What a malformed table payload does to a render. Default: [`TableErrorPolicy::Isolate`].
    pub table_errors: TableErrorPolicy,

    /// Text shown on an empty preview.
    pub placeholder: String,

    /// Reject files without the `%PDF` header before uploading. Default: true.
    pub verify_pdf_magic: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            upload_path: "/upload-pdfs".to_string(),
            generate_path: "/generate-pdf".to_string(),
            file_field: "pdfFile".to_string(),
            download_filename: "extracted_content.pdf".to_string(),
            download_dir: PathBuf::from("."),
            request_timeout_secs: 120,
            generation: GenerationMode::default(),
            table_errors: TableErrorPolicy::default(),
            placeholder: "Extracted content will appear here.".to_string(),
            verify_pdf_magic: true,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the extraction endpoint.
    pub fn upload_url(&self) -> Result<Url, PreviewError> {
        join_endpoint(&self.base_url, &self.upload_path)
    }

    /// Full URL of the generation endpoint.
    pub fn generate_url(&self) -> Result<Url, PreviewError> {
        join_endpoint(&self.base_url, &self.generate_path)
    }

    /// The request bound as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn join_endpoint(base: &str, path: &str) -> Result<Url, PreviewError> {
    let base = Url::parse(base)
        .map_err(|e| PreviewError::InvalidConfig(format!("invalid base URL '{base}': {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(PreviewError::InvalidConfig(format!(
            "base URL must be http or https, got '{}'",
            base.scheme()
        )));
    }
    // Keep any path prefix on the base URL ("http://host/api" + "/upload-pdfs").
    let prefix = base.path().trim_end_matches('/');
    let joined = format!("{}/{}", prefix, path.trim_start_matches('/'));
    let mut url = base.clone();
    url.set_path(&joined);
    Ok(url)
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn generate_path(mut self, path: impl Into<String>) -> Self {
        self.config.generate_path = path.into();
        self
    }

    pub fn file_field(mut self, name: impl Into<String>) -> Self {
        self.config.file_field = name.into();
        self
    }

    pub fn download_filename(mut self, name: impl Into<String>) -> Self {
        self.config.download_filename = name.into();
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn generation(mut self, mode: GenerationMode) -> Self {
        self.config.generation = mode;
        self
    }

    pub fn table_errors(mut self, policy: TableErrorPolicy) -> Self {
        self.config.table_errors = policy;
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.placeholder = text.into();
        self
    }

    pub fn verify_pdf_magic(mut self, v: bool) -> Self {
        self.config.verify_pdf_magic = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, PreviewError> {
        let c = &self.config;
        c.upload_url()?;
        c.generate_url()?;
        if c.request_timeout_secs == 0 {
            return Err(PreviewError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.file_field.trim().is_empty() {
            return Err(PreviewError::InvalidConfig(
                "Multipart field name must not be empty".into(),
            ));
        }
        let name = c.download_filename.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(PreviewError::InvalidConfig(format!(
                "Download filename must be a bare file name, got '{}'",
                c.download_filename
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// When the regenerated PDF is requested from the service.
///
/// | Mode | Behaviour |
/// |------|-----------|
/// | `Lazy`  | Only when the user asks for a download (default) |
/// | `Eager` | Right after every successful extraction, as an abortable background task; the download reuses its result |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    Lazy,
    Eager,
}

/// What a malformed item payload (typically a table) does to a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableErrorPolicy {
    /// Replace the bad item with an error placeholder and keep going. (default)
    #[default]
    Isolate,
    /// Fail the whole render; the preview stays empty.
    Abort,
}

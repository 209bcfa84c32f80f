//! # edgequake-pdfpreview
//!
//! Client for a PDF extraction service: upload PDFs, preview the extracted
//! text, images and tables grouped by source document, then download a PDF
//! regenerated from exactly the content you previewed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF files
//!  │
//!  ├─ 1. Validate  non-empty selection, %PDF header
//!  ├─ 2. Extract   POST /upload-pdfs (multipart)  → ExtractedDataset
//!  ├─ 3. Render    group by source run, dispatch text / image / table
//!  ├─ 4. Retain    dataset held by the controller for download
//!  └─ 5. Download  POST /generate-pdf (JSON)      → extracted_content.pdf
//! ```
//!
//! The [`RequestLifecycleController`] drives the sequence as a state machine
//! (`Idle → Uploading → Extracted → Downloading`) and keeps a single status
//! line for the user. The [`ContentRenderer`] turns a dataset into
//! [`PreviewNode`]s on any [`DisplaySurface`]; [`PreviewDocument`] plus
//! [`render::html`] gives an HTML preview.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfpreview::{
//!     ClientConfig, HttpExtractionService, PreviewDocument, RequestLifecycleController,
//!     UploadFile,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder().base_url("http://localhost:5000").build()?;
//!     let service = Arc::new(HttpExtractionService::new(&config)?);
//!     let mut controller = RequestLifecycleController::new(config, service, PreviewDocument::new());
//!
//!     let files = vec![UploadFile::from_path("report.pdf").await?];
//!     controller.request_extraction(files).await?;
//!     println!("{}", edgequake_pdfpreview::render::html::to_html_fragment(controller.surface()));
//!
//!     let saved = controller.request_download().await?;
//!     eprintln!("saved {}", saved.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfpreview` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod observer;
pub mod render;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{ArtifactSink, DirectorySink, MemorySink};
pub use config::{ClientConfig, ClientConfigBuilder, GenerationMode, TableErrorPolicy};
pub use error::{ErrorCategory, ItemError, Operation, PreviewError};
pub use lifecycle::{CancelHandle, DownloadOutcome, ExtractionOutcome, RequestLifecycleController};
pub use model::{ContentBlock, ContentItem, ContentKind, ExtractedDataset, TablePayload, UploadFile};
pub use observer::{
    ControlState, LifecycleObserver, LifecyclePhase, NoopObserver, Severity, SharedObserver,
    StatusMessage,
};
pub use render::{ContentRenderer, DisplaySurface, PreviewDocument, PreviewNode, RenderSummary, SkippedItem};
pub use service::{ExtractionService, HttpExtractionService};

//! Error types for the edgequake-pdfpreview library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PreviewError`]: **Fatal** for the operation in flight: the upload or
//!   download cannot complete (no files selected, service rejected the
//!   request, network down, request timed out). Returned as
//!   `Err(PreviewError)` from the lifecycle operations, and mirrored into the
//!   controller's status line.
//!
//! * [`ItemError`]: **Non-fatal**: one content item carried a malformed
//!   payload, but every other item still renders. Stored inside
//!   [`crate::render::RenderSummary`] so callers can see which items were
//!   replaced by an error placeholder.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The network operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Operation {
    /// `POST /upload-pdfs`
    Extract,
    /// `POST /generate-pdf`
    Generate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Extract => f.write_str("extraction"),
            Operation::Generate => f.write_str("PDF generation"),
        }
    }
}

/// Coarse classification of a [`PreviewError`].
///
/// | Category     | Reaches the network? | Typical fix |
/// |--------------|----------------------|-------------|
/// | `Validation` | never                | select files / extract first |
/// | `Service`    | yes, non-2xx or bad body | retry or fix the input PDF |
/// | `Transport`  | yes, no response     | check connectivity, retry |
/// | `Data`       | after a 2xx          | inspect the extracted payload |
/// | `Internal`   | n/a                  | configuration or local I/O |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Service,
    Transport,
    Data,
    Internal,
}

/// All fatal errors returned by the edgequake-pdfpreview library.
///
/// Item-level failures use [`ItemError`] and are stored in
/// [`crate::render::RenderSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PreviewError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// `request_extraction` was called with an empty file list.
    #[error("No files selected. Please choose at least one PDF file.")]
    NoFilesSelected,

    /// `request_download` was called before anything was extracted.
    #[error("Nothing to download. Extract content from a PDF first.")]
    NothingToDownload,

    /// A selected file does not start with the `%PDF` magic bytes.
    #[error("'{name}' is not a PDF file (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Service errors ────────────────────────────────────────────────────
    /// The service answered with a non-2xx status.
    ///
    /// `message` is the body's `error` field when present, otherwise a
    /// generic status-derived message.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The service answered 2xx but the body could not be decoded.
    #[error("Invalid response from {operation} service: {detail}")]
    InvalidResponse { operation: Operation, detail: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// No response was received (connection refused, reset, DNS failure).
    #[error("Network error during {operation}: {reason}")]
    Transport { operation: Operation, reason: String },

    /// The request did not complete within the configured bound.
    #[error("{operation} request timed out after {secs}s")]
    Timeout { operation: Operation, secs: u64 },

    /// The request was abandoned through a [`crate::lifecycle::CancelHandle`].
    #[error("{operation} request was cancelled")]
    Cancelled { operation: Operation },

    // ── Data errors ───────────────────────────────────────────────────────
    /// A content item's payload could not be interpreted for its kind.
    #[error("Item {index} ({kind}) has a malformed payload: {detail}")]
    MalformedItem {
        index: usize,
        kind: String,
        detail: String,
    },

    // ── Internal errors ───────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The downloaded artifact could not be written.
    #[error("Failed to write '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PreviewError {
    /// Which bucket of the error taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PreviewError::NoFilesSelected
            | PreviewError::NothingToDownload
            | PreviewError::NotAPdf { .. }
            | PreviewError::FileNotFound { .. }
            | PreviewError::PermissionDenied { .. } => ErrorCategory::Validation,
            PreviewError::Service { .. } | PreviewError::InvalidResponse { .. } => {
                ErrorCategory::Service
            }
            PreviewError::Transport { .. }
            | PreviewError::Timeout { .. }
            | PreviewError::Cancelled { .. } => ErrorCategory::Transport,
            PreviewError::MalformedItem { .. } => ErrorCategory::Data,
            PreviewError::InvalidConfig(_)
            | PreviewError::ArtifactWriteFailed { .. }
            | PreviewError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the failure happened before any request was sent.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Build a transport error from a reqwest failure, keeping timeouts distinct.
    pub(crate) fn from_reqwest(operation: Operation, secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PreviewError::Timeout { operation, secs }
        } else {
            PreviewError::Transport {
                operation,
                reason: err.to_string(),
            }
        }
    }
}

/// A non-fatal error for a single content item.
///
/// Stored in [`crate::render::RenderSummary::failed`] when the renderer runs
/// with [`crate::config::TableErrorPolicy::Isolate`].
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The item's payload could not be interpreted for its kind.
    #[error("Item {index} ({kind}): {detail}")]
    Malformed {
        index: usize,
        kind: String,
        detail: String,
    },
}

impl ItemError {
    /// Zero-based position of the failed item in the dataset.
    pub fn index(&self) -> usize {
        match self {
            ItemError::Malformed { index, .. } => *index,
        }
    }
}

impl From<ItemError> for PreviewError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::Malformed {
                index,
                kind,
                detail,
            } => PreviewError::MalformedItem {
                index,
                kind,
                detail,
            },
        }
    }
}

//! Observer trait for lifecycle events.
//!
//! Inject an [`Arc<dyn LifecycleObserver>`] via
//! [`crate::lifecycle::RequestLifecycleController::with_observer`] to mirror
//! the controller's state into a UI: phase transitions, the single status
//! line, and whether the extract/download triggers are currently enabled.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfpreview::{LifecycleObserver, StatusMessage};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct StatusLog(Mutex<Vec<String>>);
//!
//! impl LifecycleObserver for StatusLog {
//!     fn on_status(&self, status: &StatusMessage) {
//!         self.0.lock().unwrap().push(status.text.clone());
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Position of the controller in the upload/extract/preview/download cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LifecyclePhase {
    /// Nothing extracted (or the last extraction produced nothing).
    #[default]
    Idle,
    /// An extraction request is in flight.
    Uploading,
    /// A dataset is displayed and retained for download.
    Extracted,
    /// A generation request is in flight.
    Downloading,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecyclePhase::Idle => "idle",
            LifecyclePhase::Uploading => "uploading",
            LifecyclePhase::Extracted => "extracted",
            LifecyclePhase::Downloading => "downloading",
        };
        f.write_str(s)
    }
}

/// How a status message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// The one user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

impl StatusMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Which user triggers are currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    /// File selection and the extract trigger.
    pub extract_enabled: bool,
    /// The download trigger.
    pub download_enabled: bool,
}

impl ControlState {
    /// Everything disabled while a request is in flight.
    pub const BUSY: ControlState = ControlState {
        extract_enabled: false,
        download_enabled: false,
    };
}

/// Receives lifecycle events from the controller.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events are delivered synchronously from the task
/// driving the controller.
pub trait LifecycleObserver: Send + Sync {
    /// Called on every phase transition.
    fn on_phase_change(&self, from: LifecyclePhase, to: LifecyclePhase) {
        let _ = (from, to);
    }

    /// Called when the status line is replaced.
    fn on_status(&self, status: &StatusMessage) {
        let _ = status;
    }

    /// Called when triggers are disabled for a request or re-enabled after it.
    fn on_controls_changed(&self, controls: ControlState) {
        let _ = controls;
    }
}

/// A no-op observer; the controller's default.
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

/// Convenience alias for the type stored in the controller.
pub type SharedObserver = Arc<dyn LifecycleObserver>;

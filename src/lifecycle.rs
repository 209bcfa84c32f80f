//! The upload → extract → preview → download state machine.
//!
//! ```text
//!          extract            ok, non-empty          download
//!  Idle ───────────▶ Uploading ────────────▶ Extracted ─────────▶ Downloading
//!   ▲                   │                      ▲                     │
//!   └── ok, empty ──────┤                      └──── ok | error ─────┘
//!   └── error ──────────┘
//! ```
//!
//! [`RequestLifecycleController`] owns the retained dataset, the renderer and
//! the single status line. Its operations take `&mut self`, so one controller
//! can never have two requests in flight; the observer's
//! [`ControlState`] mirrors that for a UI.
//!
//! Every request is bounded by the configured timeout and can be abandoned
//! through a [`CancelHandle`]. Either outcome restores the phase the
//! controller was in before the request.

use crate::artifact::{ArtifactSink, DirectorySink};
use crate::config::{ClientConfig, GenerationMode};
use crate::error::{Operation, PreviewError};
use crate::model::{ExtractedDataset, UploadFile};
use crate::observer::{
    ControlState, LifecyclePhase, NoopObserver, Severity, SharedObserver, StatusMessage,
};
use crate::render::{ContentRenderer, DisplaySurface, RenderSummary};
use crate::service::ExtractionService;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Abandons the request a controller currently has in flight.
///
/// Obtain one with [`RequestLifecycleController::cancel_handle`] before
/// starting an operation and trigger it from another task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    /// Cancel the in-flight request, if any.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Result of a successful [`RequestLifecycleController::request_extraction`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Items were extracted and are now displayed and retained.
    Extracted(RenderSummary),
    /// The service succeeded but returned no items.
    NothingExtracted,
}

/// Result of a successful [`RequestLifecycleController::request_download`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DownloadOutcome {
    /// Where the artifact sink stored the PDF.
    pub path: PathBuf,
    pub size_bytes: usize,
    /// Whether the bytes came from the eager background generation.
    pub pregenerated: bool,
}

/// Background generation started right after an extraction.
struct Pregeneration {
    dataset: Arc<ExtractedDataset>,
    handle: JoinHandle<Result<Vec<u8>, PreviewError>>,
}

/// Drives extraction and download requests and keeps the preview in sync.
pub struct RequestLifecycleController<S: DisplaySurface> {
    config: ClientConfig,
    service: Arc<dyn ExtractionService>,
    sink: Arc<dyn ArtifactSink>,
    observer: SharedObserver,
    renderer: ContentRenderer<S>,
    phase: LifecyclePhase,
    dataset: Option<Arc<ExtractedDataset>>,
    pregeneration: Option<Pregeneration>,
    status: Option<StatusMessage>,
    busy: bool,
    cancel: CancelHandle,
}

impl<S: DisplaySurface> RequestLifecycleController<S> {
    /// Create a controller in the `Idle` phase with the surface showing its placeholder.
    ///
    /// Downloads go to a [`DirectorySink`] at `config.download_dir` until
    /// replaced with [`with_sink`](Self::with_sink).
    pub fn new(config: ClientConfig, service: Arc<dyn ExtractionService>, surface: S) -> Self {
        let renderer = ContentRenderer::new(surface, config.placeholder.clone(), config.table_errors);
        let sink = Arc::new(DirectorySink::new(config.download_dir.clone()));
        Self {
            config,
            service,
            sink,
            observer: Arc::new(NoopObserver),
            renderer,
            phase: LifecyclePhase::Idle,
            dataset: None,
            pregeneration: None,
            status: None,
            busy: false,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// The dataset currently displayed and retained for download.
    pub fn dataset(&self) -> Option<&Arc<ExtractedDataset>> {
        self.dataset.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A handle that abandons whatever request this controller has in flight.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn controls(&self) -> ControlState {
        if self.busy {
            ControlState::BUSY
        } else {
            ControlState {
                extract_enabled: true,
                download_enabled: self.can_download(),
            }
        }
    }

    pub fn controls_enabled(&self) -> bool {
        !self.busy
    }

    /// Whether a download request would reach the service.
    pub fn can_download(&self) -> bool {
        !self.busy && self.phase == LifecyclePhase::Extracted && self.dataset.is_some()
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Upload `files`, render the extracted items and retain them for download.
    ///
    /// # Errors
    /// * [`PreviewError::NoFilesSelected`] / [`PreviewError::NotAPdf`] before
    ///   any request is sent;
    /// * service, transport, timeout and cancellation errors from the upload;
    /// * [`PreviewError::MalformedItem`] when rendering aborts under
    ///   [`crate::config::TableErrorPolicy::Abort`].
    ///
    /// Every error is also reported through the status line, and controls are
    /// re-enabled before returning.
    pub async fn request_extraction(
        &mut self,
        files: Vec<UploadFile>,
    ) -> Result<ExtractionOutcome, PreviewError> {
        if files.is_empty() {
            return Err(self.reject(PreviewError::NoFilesSelected));
        }
        if self.config.verify_pdf_magic {
            if let Some(bad) = files.iter().find(|f| !f.is_pdf()) {
                let err = PreviewError::NotAPdf {
                    name: bad.name.clone(),
                    magic: bad.magic(),
                };
                return Err(self.reject(err));
            }
        }

        info!("Extracting content from {} file(s)", files.len());
        self.abort_pregeneration();
        self.dataset = None;
        self.renderer.clear();
        self.begin(LifecyclePhase::Uploading, "Uploading and extracting content…");

        let service = Arc::clone(&self.service);
        let result = bounded(
            Operation::Extract,
            self.config.request_timeout(),
            &self.cancel,
            service.extract(&files),
        )
        .await;

        let outcome = match result {
            Ok(dataset) if dataset.is_empty() => {
                info!("Extraction returned no items");
                self.transition(LifecyclePhase::Idle);
                self.set_status(Severity::Warning, "No content was extracted from the selected PDF(s).");
                Ok(ExtractionOutcome::NothingExtracted)
            }
            Ok(dataset) => self.show(Arc::new(dataset)),
            Err(err) => {
                warn!("Extraction failed: {}", err);
                self.transition(LifecyclePhase::Idle);
                self.set_status(Severity::Error, format!("Error: {err}"));
                Err(err)
            }
        };

        self.finish();
        outcome
    }

    /// Generate a PDF from the retained dataset and hand it to the artifact sink.
    ///
    /// # Errors
    /// * [`PreviewError::NothingToDownload`] when no dataset is retained;
    /// * service, transport, timeout and cancellation errors from generation;
    /// * [`PreviewError::ArtifactWriteFailed`] from the sink.
    ///
    /// The dataset survives every failure, so the download can be retried.
    pub async fn request_download(&mut self) -> Result<DownloadOutcome, PreviewError> {
        let Some(dataset) = self.dataset.clone() else {
            return Err(self.reject(PreviewError::NothingToDownload));
        };

        info!("Downloading PDF for {} items", dataset.len());
        self.begin(LifecyclePhase::Downloading, "Generating PDF…");

        let result = self.generate_and_save(&dataset).await;
        self.transition(LifecyclePhase::Extracted);
        let outcome = match result {
            Ok(outcome) => {
                self.set_status(
                    Severity::Success,
                    format!("PDF downloaded as {}.", self.config.download_filename),
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!("Download failed: {}", err);
                self.set_status(Severity::Error, format!("Error: {err}"));
                Err(err)
            }
        };

        self.finish();
        outcome
    }

    /// Forget the dataset, abort background work and return to the placeholder.
    pub fn reset(&mut self) {
        self.abort_pregeneration();
        self.dataset = None;
        self.renderer.clear();
        self.transition(LifecyclePhase::Idle);
        self.status = None;
        self.observer.on_controls_changed(self.controls());
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn show(&mut self, dataset: Arc<ExtractedDataset>) -> Result<ExtractionOutcome, PreviewError> {
        match self.renderer.render(&dataset) {
            Ok(summary) => {
                info!(
                    "Extracted {} items from {} source run(s)",
                    dataset.len(),
                    summary.group_headers
                );
                if self.config.generation == GenerationMode::Eager {
                    self.start_pregeneration(Arc::clone(&dataset));
                }
                self.dataset = Some(dataset);
                self.transition(LifecyclePhase::Extracted);
                self.set_status(Severity::Success, "Content extracted successfully.");
                Ok(ExtractionOutcome::Extracted(summary))
            }
            Err(err) => {
                warn!("Render aborted: {}", err);
                self.renderer.clear();
                self.transition(LifecyclePhase::Idle);
                self.set_status(Severity::Error, format!("Error: {err}"));
                Err(err)
            }
        }
    }

    async fn generate_and_save(
        &mut self,
        dataset: &Arc<ExtractedDataset>,
    ) -> Result<DownloadOutcome, PreviewError> {
        let timeout = self.config.request_timeout();
        let mut pregenerated = false;
        let mut bytes = None;

        if let Some(pre) = self.pregeneration.take() {
            if Arc::ptr_eq(&pre.dataset, dataset) {
                let abort = pre.handle.abort_handle();
                let waited = bounded(Operation::Generate, timeout, &self.cancel, async {
                    match pre.handle.await {
                        Ok(result) => result,
                        Err(e) => Err(PreviewError::Internal(format!("background generation: {e}"))),
                    }
                })
                .await;
                match waited {
                    Ok(b) => {
                        debug!("Using pre-generated PDF ({} bytes)", b.len());
                        pregenerated = true;
                        bytes = Some(b);
                    }
                    Err(err @ PreviewError::Cancelled { .. }) => {
                        abort.abort();
                        return Err(err);
                    }
                    Err(err) => {
                        abort.abort();
                        debug!("Pre-generated PDF unavailable ({}), requesting again", err);
                    }
                }
            } else {
                pre.handle.abort();
            }
        }

        let bytes = match bytes {
            Some(b) => b,
            None => {
                let service = Arc::clone(&self.service);
                bounded(Operation::Generate, timeout, &self.cancel, service.generate(dataset)).await?
            }
        };

        let path = self.sink.save(&self.config.download_filename, &bytes).await?;
        Ok(DownloadOutcome {
            path,
            size_bytes: bytes.len(),
            pregenerated,
        })
    }

    fn start_pregeneration(&mut self, dataset: Arc<ExtractedDataset>) {
        let service = Arc::clone(&self.service);
        let timeout = self.config.request_timeout();
        let task_dataset = Arc::clone(&dataset);
        let handle = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, service.generate(&task_dataset)).await {
                Ok(r) => r,
                Err(_) => Err(PreviewError::Timeout {
                    operation: Operation::Generate,
                    secs: timeout.as_secs(),
                }),
            };
            if let Err(ref e) = result {
                debug!("Background generation failed: {}", e);
            }
            result
        });
        debug!("Started background PDF generation");
        self.pregeneration = Some(Pregeneration { dataset, handle });
    }

    fn abort_pregeneration(&mut self) {
        if let Some(pre) = self.pregeneration.take() {
            debug!("Aborting background PDF generation");
            pre.handle.abort();
        }
    }

    /// Report a local validation failure; no phase change, no request.
    fn reject(&mut self, err: PreviewError) -> PreviewError {
        debug!("Rejected: {}", err);
        self.set_status(Severity::Error, err.to_string());
        err
    }

    fn begin(&mut self, phase: LifecyclePhase, message: &str) {
        self.cancel.reset();
        self.busy = true;
        self.observer.on_controls_changed(ControlState::BUSY);
        self.transition(phase);
        self.set_status(Severity::Info, message);
    }

    fn finish(&mut self) {
        self.busy = false;
        self.observer.on_controls_changed(self.controls());
    }

    fn transition(&mut self, to: LifecyclePhase) {
        let from = self.phase;
        if from != to {
            debug!("Phase {} → {}", from, to);
            self.phase = to;
            self.observer.on_phase_change(from, to);
        }
    }

    fn set_status(&mut self, severity: Severity, text: impl Into<String>) {
        let status = StatusMessage::new(severity, text);
        self.observer.on_status(&status);
        self.status = Some(status);
    }
}

impl<S: DisplaySurface> Drop for RequestLifecycleController<S> {
    fn drop(&mut self) {
        self.abort_pregeneration();
    }
}

/// Run `fut` with a deadline and a cancellation escape hatch.
async fn bounded<T, F>(
    operation: Operation,
    timeout: Duration,
    cancel: &CancelHandle,
    fut: F,
) -> Result<T, PreviewError>
where
    F: Future<Output = Result<T, PreviewError>>,
{
    let notified = cancel.notify.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if cancel.is_cancelled() {
        return Err(PreviewError::Cancelled { operation });
    }

    tokio::select! {
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(r) => r,
            Err(_) => Err(PreviewError::Timeout { operation, secs: timeout.as_secs() }),
        },
        _ = &mut notified => Err(PreviewError::Cancelled { operation }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_through_result() {
        let cancel = CancelHandle::default();
        let r = bounded(Operation::Extract, Duration::from_secs(5), &cancel, async { Ok(7) }).await;
        assert_eq!(r.unwrap(), 7);
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let cancel = CancelHandle::default();
        let r: Result<(), _> = bounded(
            Operation::Generate,
            Duration::from_millis(20),
            &cancel,
            futures::future::pending(),
        )
        .await;
        assert!(matches!(r, Err(PreviewError::Timeout { operation: Operation::Generate, .. })));
    }

    #[tokio::test]
    async fn bounded_honours_cancel_raised_before_start() {
        let cancel = CancelHandle::default();
        cancel.cancel();
        let r: Result<(), _> = bounded(
            Operation::Extract,
            Duration::from_secs(5),
            &cancel,
            futures::future::pending(),
        )
        .await;
        assert!(matches!(r, Err(PreviewError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn bounded_honours_cancel_from_another_task() {
        let cancel = CancelHandle::default();
        let remote = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.cancel();
        });
        let r: Result<(), _> = bounded(
            Operation::Extract,
            Duration::from_secs(5),
            &cancel,
            futures::future::pending(),
        )
        .await;
        assert!(matches!(r, Err(PreviewError::Cancelled { .. })));
    }
}

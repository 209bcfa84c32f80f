//! CLI binary for edgequake-pdfpreview.
//!
//! A thin shim over the library crate: maps CLI flags to `ClientConfig`,
//! drives one extraction (and optionally one download), and writes the
//! preview as HTML.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfpreview::render::html;
use edgequake_pdfpreview::{
    ClientConfig, ControlState, ExtractionOutcome, GenerationMode, HttpExtractionService,
    LifecycleObserver, LifecyclePhase, PreviewDocument, RequestLifecycleController, Severity,
    StatusMessage, TableErrorPolicy, UploadFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while a request is in flight, one coloured
/// line per status message.
struct CliObserver {
    spinner: Mutex<Option<ProgressBar>>,
    show_spinner: bool,
    quiet: bool,
}

impl CliObserver {
    fn new(show_spinner: bool, quiet: bool) -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
            show_spinner,
            quiet,
        })
    }

    fn println(&self, line: String) {
        match self.spinner.lock().ok().and_then(|s| s.clone()) {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl LifecycleObserver for CliObserver {
    fn on_phase_change(&self, _from: LifecyclePhase, to: LifecyclePhase) {
        if let Some(bar) = self.spinner.lock().ok().and_then(|s| s.clone()) {
            bar.set_prefix(to.to_string());
        }
    }

    fn on_status(&self, status: &StatusMessage) {
        if self.quiet && status.severity != Severity::Error {
            return;
        }
        let line = match status.severity {
            Severity::Info => format!("{} {}", cyan("◆"), status.text),
            Severity::Success => format!("{} {}", green("✔"), bold(&status.text)),
            Severity::Warning => format!("{} {}", yellow("⚠"), status.text),
            Severity::Error => format!("{} {}", red("✘"), red(&status.text)),
        };
        if status.severity == Severity::Info {
            // The spinner message carries in-flight status.
            if let Some(bar) = self.spinner.lock().ok().and_then(|s| s.clone()) {
                bar.set_message(status.text.clone());
                return;
            }
        }
        self.println(line);
    }

    fn on_controls_changed(&self, controls: ControlState) {
        if !self.show_spinner {
            return;
        }
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        if controls == ControlState::BUSY {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            *slot = Some(bar);
        } else if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract two PDFs and print the HTML preview
  pdfpreview report.pdf appendix.pdf

  # Write the preview to a file and download the regenerated PDF
  pdfpreview report.pdf -o preview.html --download

  # Talk to a remote service, generate the PDF eagerly
  pdfpreview --server https://extract.example.com --eager report.pdf --download

  # Machine-readable summary
  pdfpreview --json report.pdf > summary.json

ENVIRONMENT VARIABLES:
  PDFPREVIEW_SERVER        Base URL of the extraction service
  PDFPREVIEW_TIMEOUT       Per-request timeout in seconds
  PDFPREVIEW_DOWNLOAD_DIR  Where --download saves extracted_content.pdf
  RUST_LOG                 Override log filtering (e.g. edgequake_pdfpreview=debug)
"#;

/// Preview the content a PDF extraction service finds in your PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfpreview",
    version,
    about = "Upload PDFs to an extraction service, preview the extracted content, download the regenerated PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to upload, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Base URL of the extraction service.
    #[arg(long, env = "PDFPREVIEW_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Write the HTML preview to this file instead of stdout.
    #[arg(short, long, env = "PDFPREVIEW_OUTPUT")]
    output: Option<PathBuf>,

    /// Also request the regenerated PDF and save it.
    #[arg(short, long)]
    download: bool,

    /// Directory the regenerated PDF is saved into.
    #[arg(long, env = "PDFPREVIEW_DOWNLOAD_DIR", default_value = ".")]
    download_dir: PathBuf,

    /// Filename of the regenerated PDF.
    #[arg(long, default_value = "extracted_content.pdf")]
    filename: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDFPREVIEW_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Start generating the PDF as soon as extraction succeeds.
    #[arg(long)]
    eager: bool,

    /// Fail the preview on a malformed table instead of showing an error block.
    #[arg(long)]
    strict_tables: bool,

    /// Upload files even if they do not start with %PDF.
    #[arg(long)]
    no_verify: bool,

    /// Print a JSON summary instead of the HTML preview.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDFPREVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFPREVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFPREVIEW_QUIET")]
    quiet: bool,
}

/// `--json` output.
#[derive(Serialize)]
struct Summary<'a> {
    phase: LifecyclePhase,
    status: Option<&'a StatusMessage>,
    items: usize,
    render: Option<&'a edgequake_pdfpreview::RenderSummary>,
    preview: &'a PreviewDocument,
    download: Option<&'a edgequake_pdfpreview::DownloadOutcome>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner and status lines are the user-facing output; library logs
    // stay at WARN unless asked for.
    let show_spinner = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = ClientConfig::builder()
        .base_url(&cli.server)
        .download_dir(&cli.download_dir)
        .download_filename(&cli.filename)
        .request_timeout_secs(cli.timeout)
        .generation(if cli.eager {
            GenerationMode::Eager
        } else {
            GenerationMode::Lazy
        })
        .table_errors(if cli.strict_tables {
            TableErrorPolicy::Abort
        } else {
            TableErrorPolicy::Isolate
        })
        .verify_pdf_magic(!cli.no_verify)
        .build()
        .context("Invalid configuration")?;

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        files.push(
            UploadFile::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
    }

    let service = Arc::new(HttpExtractionService::new(&config).context("Failed to create HTTP client")?);
    let observer = CliObserver::new(show_spinner, cli.quiet);
    let mut controller = RequestLifecycleController::new(config, service, PreviewDocument::new())
        .with_observer(observer);

    // ── Extract ──────────────────────────────────────────────────────────
    let render = match controller.request_extraction(files).await {
        Ok(ExtractionOutcome::Extracted(summary)) => Some(summary),
        Ok(ExtractionOutcome::NothingExtracted) => None,
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    if let Some(ref summary) = render {
        if !cli.quiet && !cli.json {
            eprintln!(
                "   {} items  /  {} source runs  /  {} skipped  /  {} failed",
                dim(&summary.blocks.to_string()),
                dim(&summary.group_headers.to_string()),
                dim(&summary.skipped.len().to_string()),
                dim(&summary.failed.len().to_string()),
            );
        }
    }

    // ── Download ─────────────────────────────────────────────────────────
    let mut download = None;
    let mut failed = false;
    if cli.download && controller.can_download() {
        match controller.request_download().await {
            Ok(outcome) => {
                if !cli.quiet && !cli.json {
                    eprintln!(
                        "   {}  {}",
                        bold(&outcome.path.display().to_string()),
                        dim(&format!("{} bytes", outcome.size_bytes)),
                    );
                }
                download = Some(outcome);
            }
            Err(_) => failed = true,
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let summary = Summary {
            phase: controller.phase(),
            status: controller.status(),
            items: controller.dataset().map(|d| d.len()).unwrap_or(0),
            render: render.as_ref(),
            preview: controller.surface(),
            download: download.as_ref(),
        };
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        let page = html::to_html_page(controller.surface(), "Extracted content");
        tokio::fs::write(path, page)
            .await
            .with_context(|| format!("Failed to write preview to {}", path.display()))?;
        if !cli.quiet {
            eprintln!("   preview  →  {}", bold(&path.display().to_string()));
        }
    } else {
        let fragment = html::to_html_fragment(controller.surface());
        io::stdout()
            .lock()
            .write_all(fragment.as_bytes())
            .context("Failed to write to stdout")?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

//! CLI binary for report-drafter.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DraftConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use report_drafter::{
    generate_report_to_archive, markdown_to_docx, normalize_markdown, DocxStyle, DraftConfig,
    DraftConfigBuilder, DraftProgressCallback, ProgressCallback, Stage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner per stage on stderr, and the draft text
/// echoed to stdout as it streams in.
struct CliProgressCallback {
    spinner: Mutex<Option<ProgressBar>>,
    started: Mutex<Option<Instant>>,
    show_spinner: bool,
    echo_draft: bool,
}

impl CliProgressCallback {
    fn new(show_spinner: bool, echo_draft: bool) -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
            started: Mutex::new(None),
            show_spinner,
            echo_draft,
        })
    }

    /// A panic in another callback must not take the progress display down
    /// with it, so poisoned locks are recovered.
    fn spinner(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn started(&self) -> MutexGuard<'_, Option<Instant>> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_spinner(&self, stage: Stage) {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(stage.to_string());
        bar.set_message(match stage {
            Stage::Ocr => "reading the textbook…",
            Stage::Draft => "writing the draft…",
            Stage::Convert => "running pandoc…",
        });
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.spinner() = Some(bar);
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.spinner().take() {
            bar.finish_and_clear();
        }
    }
}

impl DraftProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        *self.started() = Some(Instant::now());
        // Streamed text and a spinner would fight over the terminal.
        let streaming = stage == Stage::Draft && self.echo_draft;
        if self.show_spinner && !streaming {
            self.start_spinner(stage);
        } else if streaming {
            eprintln!("{} {}", cyan("◆"), bold("Draft"));
        }
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        self.stop_spinner();
        if stage == Stage::Draft && self.echo_draft {
            println!();
        }
        if !self.show_spinner && !self.echo_draft {
            return;
        }
        let secs = self
            .started()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        eprintln!(
            "  {} {:<20} {}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{output_len:>7} bytes")),
            dim(&format!("{secs:.1}s")),
        );
    }

    fn on_retry(&self, stage: Stage, retry: u32, delay_ms: u64, error: &str) {
        // Keep very long provider messages to one line.
        let msg: String = error.chars().take(100).collect();
        let line = format!(
            "  {} {} retry {} in {}ms: {}",
            yellow("⚠"),
            stage,
            retry,
            delay_ms,
            dim(&msg)
        );
        match self.spinner().as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn on_draft_chunk(&self, chunk: &str) {
        if self.echo_draft {
            let mut out = io::stdout().lock();
            let _ = out.write_all(chunk.as_bytes());
            let _ = out.flush();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full run: textbook PDF → report.zip (textbook.md, draft.md, report.docx)
  report-drafter generate experiment4.pdf --api-key AIza... -o report.zip

  # Use a URL as input, write the draft in English
  report-drafter generate https://example.org/lab/exp4.pdf --language English

  # Only convert an existing markdown draft to a styled Word document
  report-drafter convert draft.md -o report.docx

  # See what the normalizer does to a markdown file
  report-drafter normalize draft.md

  # Upload form on http://127.0.0.1:8080
  report-drafter serve --addr 127.0.0.1:8080

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Google Gemini API key (used by `generate`)
  REPORT_DRAFTER_PANDOC     Path to the pandoc executable
  RUST_LOG                  Override the log filter (e.g. report_drafter=debug)

SETUP:
  1. Install pandoc:  https://pandoc.org/installing.html
  2. Set API key:     export GEMINI_API_KEY=AIza...
  3. Generate:        report-drafter generate textbook.pdf
"#;

/// Draft lab reports from PDF textbooks and render them to Word.
#[derive(Parser, Debug)]
#[command(
    name = "report-drafter",
    version,
    about = "Draft lab reports from PDF textbooks and render them to Word",
    long_about = "Extract a PDF textbook with an LLM, stream a draft lab report from it, and \
convert the draft to a formatted Word document through pandoc.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "REPORT_DRAFTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "REPORT_DRAFTER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print (or write) markdown with math delimiters and block spacing fixed.
    Normalize {
        /// Markdown file.
        input: PathBuf,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a markdown file into a styled .docx.
    Convert {
        /// Markdown file.
        input: PathBuf,
        /// Output .docx (default: input with .docx extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        docx: DocxArgs,
    },

    /// OCR a PDF, stream a draft report and package everything into a zip.
    Generate {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output archive.
        #[arg(short, long, env = "REPORT_DRAFTER_OUTPUT", default_value = "report.zip")]
        output: PathBuf,

        /// Gemini API key.
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Model used to extract the PDF text.
        #[arg(long, env = "REPORT_DRAFTER_OCR_MODEL", default_value = "gemini-2.5-flash")]
        ocr_model: String,

        /// Model used to write the draft.
        #[arg(long, env = "REPORT_DRAFTER_DRAFT_MODEL", default_value = "gemini-2.5-pro")]
        draft_model: String,

        /// Language of the draft.
        #[arg(long, env = "REPORT_DRAFTER_LANGUAGE", default_value = "Japanese")]
        language: String,

        /// Retries per LLM call.
        #[arg(long, env = "REPORT_DRAFTER_MAX_RETRIES", default_value_t = 3)]
        max_retries: u32,

        /// Initial retry delay in milliseconds (doubles each retry).
        #[arg(long, env = "REPORT_DRAFTER_RETRY_BACKOFF_MS", default_value_t = 500)]
        retry_backoff_ms: u64,

        /// Per-call LLM timeout in seconds.
        #[arg(long, env = "REPORT_DRAFTER_API_TIMEOUT", default_value_t = 300)]
        api_timeout: u64,

        /// HTTP download timeout in seconds (URL inputs).
        #[arg(long, env = "REPORT_DRAFTER_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,

        /// Do not echo the draft to stdout while it streams.
        #[arg(long)]
        no_stream: bool,

        /// Disable the spinner.
        #[arg(long, env = "REPORT_DRAFTER_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        docx: DocxArgs,
    },

    /// Serve the upload form over HTTP.
    #[cfg(feature = "server")]
    Serve {
        /// Listen address.
        #[arg(long, env = "REPORT_DRAFTER_ADDR", default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "REPORT_DRAFTER_MAX_UPLOAD_MB", default_value_t = 32)]
        max_upload_mb: usize,

        #[command(flatten)]
        docx: DocxArgs,
    },
}

/// Options shared by every command that produces a .docx.
#[derive(Args, Debug, Clone)]
struct DocxArgs {
    /// pandoc executable.
    #[arg(long, env = "REPORT_DRAFTER_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Font for Latin text.
    #[arg(long, default_value = "Times New Roman")]
    latin_font: String,

    /// Font for East-Asian text.
    #[arg(long, default_value = "MS Mincho")]
    east_asian_font: String,
}

impl DocxArgs {
    fn apply(&self, builder: DraftConfigBuilder) -> DraftConfigBuilder {
        builder.pandoc_path(self.pandoc.clone()).style(DocxStyle {
            latin_font: self.latin_font.clone(),
            east_asian_font: self.east_asian_font.clone(),
            ..DocxStyle::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Generate { no_progress, .. } => !cli.quiet && !no_progress,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Normalize { input, output } => {
            let text = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let normalized = normalize_markdown(&text);
            match output {
                Some(path) => tokio::fs::write(&path, normalized)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => io::stdout()
                    .lock()
                    .write_all(normalized.as_bytes())
                    .context("Failed to write to stdout")?,
            }
        }

        Command::Convert {
            input,
            output,
            docx,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("docx"));
            let config = docx
                .apply(DraftConfig::builder())
                .build()
                .context("Invalid configuration")?;
            let report = markdown_to_docx(&input, &output, &config)
                .await
                .context("Conversion failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} paragraphs, {} tables  →  {}",
                    green("✔"),
                    report.paragraphs,
                    report.tables,
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Generate {
            input,
            output,
            api_key,
            ocr_model,
            draft_model,
            language,
            max_retries,
            retry_backoff_ms,
            api_timeout,
            download_timeout,
            no_stream,
            no_progress: _,
            docx,
        } => {
            let echo = !cli.quiet && !no_stream;
            let progress: ProgressCallback = CliProgressCallback::new(show_progress, echo);

            let mut builder = docx
                .apply(DraftConfig::builder())
                .ocr_model(ocr_model)
                .draft_model(draft_model)
                .language(language)
                .max_retries(max_retries)
                .retry_backoff_ms(retry_backoff_ms)
                .api_timeout_secs(api_timeout)
                .download_timeout_secs(download_timeout)
                .progress_callback(progress);
            if let Some(key) = api_key {
                builder = builder.api_key(key);
            }
            let config = builder.build().context("Invalid configuration")?;

            let stats = generate_report_to_archive(&input, &output, &config)
                .await
                .context("Report generation failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} draft chunks  {} retries  {}ms  →  {}",
                    green("✔"),
                    stats.draft_chunks,
                    stats.retries,
                    stats.total_duration_ms,
                    bold(&output.display().to_string()),
                );
                eprintln!(
                    "   {} OCR tokens in  /  {} out",
                    dim(&stats.ocr_input_tokens.to_string()),
                    dim(&stats.ocr_output_tokens.to_string()),
                );
            }
        }

        #[cfg(feature = "server")]
        Command::Serve {
            addr,
            max_upload_mb,
            docx,
        } => {
            let config = docx
                .apply(DraftConfig::builder())
                .max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024))
                .build()
                .context("Invalid configuration")?;
            if !cli.quiet {
                eprintln!("{} Listening on {}", cyan("◆"), bold(&format!("http://{addr}")));
            }
            report_drafter::server::serve(addr, config)
                .await
                .context("Server failed")?;
        }
    }

    Ok(())
}

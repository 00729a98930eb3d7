//! Eager entry points: markdown → docx, and the full PDF → archive run.
//!
//! [`markdown_to_docx`] is usable on its own (no API key, no network): it
//! normalizes the markdown, hands it to pandoc and styles the result.
//! [`generate_report`] chains OCR, draft generation and that conversion,
//! collecting all three artefacts into a [`ReportOutput`].

use crate::config::DraftConfig;
use crate::docx::converter::{DocumentConverter, Pandoc};
use crate::docx::style::{apply_styles_to_file, StyleReport};
use crate::error::DraftError;
use crate::output::{ReportOutput, ReportStats, Stage};
use crate::pipeline::input::{resolve_input, PdfSource};
use crate::pipeline::llm::resolve_provider;
use crate::pipeline::normalize_markdown;
use crate::pipeline::ocr::extract_text;
use crate::stream::generate_draft;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a markdown file into a styled Word document.
///
/// Steps: read `md_path`, normalize math delimiters and block spacing, write
/// the result to a temporary `.md`, run the converter (relative image paths
/// resolve against the directory of `md_path`), then apply
/// [`DraftConfig::style`] to the produced file.
///
/// # Example
/// ```rust,no_run
/// use report_drafter::{markdown_to_docx, DraftConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DraftConfig::default();
/// markdown_to_docx("draft.md", "report.docx", &config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn markdown_to_docx(
    md_path: impl AsRef<Path>,
    docx_path: impl AsRef<Path>,
    config: &DraftConfig,
) -> Result<StyleReport, DraftError> {
    let md_path = md_path.as_ref();
    let docx_path = docx_path.as_ref();
    info!("Converting {} → {}", md_path.display(), docx_path.display());

    let text = tokio::fs::read_to_string(md_path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DraftError::FileNotFound {
                path: md_path.to_path_buf(),
            },
            _ => DraftError::ReadFailed {
                path: md_path.to_path_buf(),
                source: e,
            },
        })?;
    let normalized = normalize_markdown(&text);
    debug!(
        "Normalized markdown: {} → {} bytes",
        text.len(),
        normalized.len()
    );

    let mut tmp = tempfile::Builder::new()
        .prefix("report-drafter-")
        .suffix(".md")
        .tempfile()
        .map_err(|e| DraftError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(normalized.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| DraftError::Internal(format!("tempfile write: {e}")))?;

    if let Some(parent) = docx_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DraftError::OutputWriteFailed {
                path: docx_path.to_path_buf(),
                source: e,
            })?;
    }

    let resource_dir = match md_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let converter = resolve_converter(config);
    converter
        .convert(tmp.path(), docx_path, &resource_dir)
        .await?;
    // `tmp` is deleted when it goes out of scope.

    apply_styles_to_file(docx_path, &config.style).await
}

/// Synchronous wrapper around [`markdown_to_docx`].
///
/// Creates a temporary tokio runtime internally.
pub fn markdown_to_docx_sync(
    md_path: impl AsRef<Path>,
    docx_path: impl AsRef<Path>,
    config: &DraftConfig,
) -> Result<StyleReport, DraftError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DraftError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(markdown_to_docx(md_path, docx_path, config))
}

/// Run the whole pipeline on an uploaded PDF.
///
/// The API key is checked before anything else, so a missing key fails
/// without any network call. The draft is streamed; every chunk reaches
/// the progress callback as it arrives.
///
/// # Errors
/// - [`DraftError::MissingInput`] when no API key is available
/// - [`DraftError::RetriesExhausted`] when OCR or the draft call keeps failing
/// - [`DraftError::StreamInterrupted`] when the draft stream breaks
/// - converter and docx errors from the conversion stage
pub async fn generate_report(pdf: PdfSource, config: &DraftConfig) -> Result<ReportOutput, DraftError> {
    let total_start = Instant::now();
    let provider = resolve_provider(config)?;
    if pdf.is_empty() {
        return Err(DraftError::MissingInput { field: "file" });
    }
    info!("Generating report for '{}' ({} bytes)", pdf.name, pdf.len());

    let mut stats = ReportStats {
        pdf_bytes: pdf.len(),
        ..ReportStats::default()
    };

    // ── Stage 1: OCR ─────────────────────────────────────────────────────
    stage_start(config, Stage::Ocr);
    let ocr = extract_text(provider.as_ref(), &pdf, config).await?;
    stage_complete(config, Stage::Ocr, ocr.markdown.len());
    stats.ocr_input_tokens = ocr.input_tokens;
    stats.ocr_output_tokens = ocr.output_tokens;
    stats.ocr_duration_ms = ocr.duration_ms;
    stats.retries += ocr.retries;

    // ── Stage 2: Draft ───────────────────────────────────────────────────
    stage_start(config, Stage::Draft);
    let draft = generate_draft(provider.as_ref(), &ocr.markdown, config).await?;
    stage_complete(config, Stage::Draft, draft.markdown.len());
    stats.draft_chunks = draft.chunks;
    stats.draft_duration_ms = draft.duration_ms;
    stats.retries += draft.retries;

    // ── Stage 3: Convert ─────────────────────────────────────────────────
    stage_start(config, Stage::Convert);
    let convert_start = Instant::now();
    let workdir = tempfile::tempdir().map_err(|e| DraftError::Internal(format!("tempdir: {e}")))?;
    let md_path = workdir.path().join("draft.md");
    let docx_path = workdir.path().join("report.docx");
    tokio::fs::write(&md_path, &draft.markdown)
        .await
        .map_err(|e| DraftError::OutputWriteFailed {
            path: md_path.clone(),
            source: e,
        })?;
    markdown_to_docx(&md_path, &docx_path, config).await?;
    let docx = tokio::fs::read(&docx_path)
        .await
        .map_err(|e| DraftError::ReadFailed {
            path: docx_path.clone(),
            source: e,
        })?;
    stage_complete(config, Stage::Convert, docx.len());
    stats.convert_duration_ms = convert_start.elapsed().as_millis() as u64;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Report complete: {} chunks, {} retries, {}ms total",
        stats.draft_chunks, stats.retries, stats.total_duration_ms
    );

    Ok(ReportOutput {
        textbook: ocr.markdown,
        draft: draft.markdown,
        docx,
        stats,
    })
}

/// Resolve `input` (path or URL), run [`generate_report`] and write the
/// archive to `archive_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_report_to_archive(
    input: impl AsRef<str>,
    archive_path: impl AsRef<Path>,
    config: &DraftConfig,
) -> Result<ReportStats, DraftError> {
    // Fail on a missing key before downloading anything.
    resolve_provider(config)?;
    let pdf = resolve_input(
        input.as_ref(),
        config.download_timeout_secs,
        config.max_pdf_bytes,
    )
    .await?;
    let output = generate_report(pdf, config).await?;
    let bytes = output.to_archive_bytes()?;
    let path = archive_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DraftError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("zip.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| DraftError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| DraftError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pre-built converter from the config, or pandoc at `config.pandoc_path`.
fn resolve_converter(config: &DraftConfig) -> Arc<dyn DocumentConverter> {
    match &config.converter {
        Some(converter) => Arc::clone(converter),
        None => Arc::new(Pandoc::new(&config.pandoc_path)),
    }
}

fn stage_start(config: &DraftConfig, stage: Stage) {
    info!("{} started", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &DraftConfig, stage: Stage, output_len: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, output_len);
    }
}

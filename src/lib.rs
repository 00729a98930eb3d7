//! # report-drafter
//!
//! Draft a lab report from a PDF textbook with an LLM and deliver it as a
//! formatted Word document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + API key
//!  │
//!  ├─ 1. Input     validate the upload (or resolve a path / URL)
//!  ├─ 2. OCR       whole PDF → markdown with $$ math (gemini-2.5-flash)
//!  ├─ 3. Draft     textbook → streamed report markdown (gemini-2.5-pro)
//!  ├─ 4. Normalize in-sentence $$…$$ → $…$, blank lines around blocks
//!  ├─ 5. Convert   pandoc markdown → docx
//!  ├─ 6. Style     fonts, black text, justification, centred tables
//!  └─ 7. Archive   textbook.md + draft.md + report.docx
//! ```
//!
//! Both LLM calls retry with exponential backoff. Steps 4 to 6 need no API
//! key and are available on their own through [`markdown_to_docx`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_drafter::{generate_report_to_archive, DraftConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DraftConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let stats = generate_report_to_archive("experiment4.pdf", "report.zip", &config).await?;
//!     eprintln!("{} draft chunks, {} retries", stats.draft_chunks, stats.retries);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `report-drafter` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`], the axum upload form |
//!
//! Disable both when using only the library:
//! ```toml
//! report-drafter = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! Conversion shells out to [pandoc](https://pandoc.org) (`pandoc` on `PATH`,
//! or [`DraftConfig::pandoc_path`]).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod convert;
pub mod docx;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::write_archive;
pub use config::{DocxStyle, DraftConfig, DraftConfigBuilder, RetryPolicy};
pub use convert::{generate_report, generate_report_to_archive, markdown_to_docx, markdown_to_docx_sync};
pub use docx::{DocumentConverter, DocxPackage, Pandoc, StyleReport};
pub use error::{DraftError, LlmError};
pub use output::{ReportOutput, ReportStats, Stage};
pub use pipeline::input::{resolve_input, PdfSource};
pub use pipeline::llm::{resolve_provider, GeminiProvider, LlmProvider, LlmRequest, LlmResponse, TextStream};
pub use pipeline::normalize_markdown;
pub use progress::{DraftProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{draft_stream, generate_draft, DraftOutput, DraftStream};

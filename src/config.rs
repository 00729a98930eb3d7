//! Configuration types for report generation and docx conversion.
//!
//! All behaviour is controlled through [`DraftConfig`], built via its
//! [`DraftConfigBuilder`]. The docx styling knobs live in [`DocxStyle`] and
//! the retry budget in [`RetryPolicy`]; both are plain serialisable structs so
//! they can be logged or diffed between runs.

use crate::docx::converter::DocumentConverter;
use crate::error::DraftError;
use crate::pipeline::llm::LlmProvider;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for a report generation run.
///
/// # Example
/// ```rust
/// use report_drafter::DraftConfig;
///
/// let config = DraftConfig::builder()
///     .api_key("AIza...")
///     .draft_model("gemini-2.5-pro")
///     .max_retries(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct DraftConfig {
    /// API key for the LLM provider. Falls back to `GEMINI_API_KEY` /
    /// `GOOGLE_API_KEY` when `None`.
    pub api_key: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `api_key`.
    pub provider: Option<Arc<dyn LlmProvider>>,

    /// Pre-constructed document converter. Takes precedence over `pandoc_path`.
    pub converter: Option<Arc<dyn DocumentConverter>>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Model used for PDF text extraction. Default: `gemini-2.5-flash`.
    pub ocr_model: String,

    /// Model used for draft generation. Default: `gemini-2.5-pro`.
    pub draft_model: String,

    /// Sampling temperature for both calls. `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Cap on generated tokens per call. `None` leaves the provider default.
    pub max_output_tokens: Option<u32>,

    /// Retry budget for each of the two LLM calls.
    pub retry: RetryPolicy,

    /// Per-request timeout for LLM calls in seconds. Default: 300.
    ///
    /// The OCR call sends the whole PDF in one request, so this is far
    /// larger than a per-page budget would be.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Largest PDF accepted, in bytes. Default: 20 MiB (inline-data limit).
    pub max_pdf_bytes: usize,

    /// Custom OCR instruction. If None, uses [`crate::prompts::OCR_PROMPT`].
    pub ocr_prompt: Option<String>,

    /// Custom draft instruction block. If None, uses the built-in one.
    pub draft_instruction: Option<String>,

    /// Language the draft is written in. Default: `Japanese`.
    pub language: String,

    /// pandoc executable. Default: `pandoc` (looked up on `PATH`).
    pub pandoc_path: PathBuf,

    /// Styling applied to the produced docx.
    pub style: DocxStyle,

    /// Largest multipart body the HTTP front end accepts. Default: 32 MiB.
    pub max_upload_bytes: usize,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: None,
            converter: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ocr_model: "gemini-2.5-flash".to_string(),
            draft_model: "gemini-2.5-pro".to_string(),
            temperature: None,
            max_output_tokens: None,
            retry: RetryPolicy::default(),
            api_timeout_secs: 300,
            download_timeout_secs: 120,
            max_pdf_bytes: 20 * 1024 * 1024,
            ocr_prompt: None,
            draft_instruction: None,
            language: "Japanese".to_string(),
            pandoc_path: PathBuf::from("pandoc"),
            style: DocxStyle::default(),
            max_upload_bytes: 32 * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DraftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LlmProvider>"))
            .field(
                "converter",
                &self.converter.as_ref().map(|_| "<dyn DocumentConverter>"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("ocr_model", &self.ocr_model)
            .field("draft_model", &self.draft_model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("retry", &self.retry)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("language", &self.language)
            .field("pandoc_path", &self.pandoc_path)
            .field("style", &self.style)
            .finish()
    }
}

impl DraftConfig {
    /// Create a new builder for `DraftConfig`.
    pub fn builder() -> DraftConfigBuilder {
        DraftConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DraftConfig`].
#[derive(Debug)]
pub struct DraftConfigBuilder {
    config: DraftConfig,
}

impl DraftConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn draft_model(mut self, model: impl Into<String>) -> Self {
        self.config.draft_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.retry.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry.backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn max_pdf_bytes(mut self, n: usize) -> Self {
        self.config.max_pdf_bytes = n;
        self
    }

    pub fn ocr_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.ocr_prompt = Some(prompt.into());
        self
    }

    pub fn draft_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.draft_instruction = Some(instruction.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn pandoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pandoc_path = path.into();
        self
    }

    pub fn style(mut self, style: DocxStyle) -> Self {
        self.config.style = style;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DraftConfig, DraftError> {
        let c = &self.config;
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(DraftError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        if c.ocr_model.trim().is_empty() || c.draft_model.trim().is_empty() {
            return Err(DraftError::InvalidConfig("model names must not be empty".into()));
        }
        if c.max_pdf_bytes == 0 {
            return Err(DraftError::InvalidConfig("max_pdf_bytes must be ≥ 1".into()));
        }
        c.style.validate()?;
        Ok(self.config)
    }
}

/// Bounded exponential backoff for the LLM calls.
///
/// Attempt `n` (1-based retry count) waits `backoff_ms * 2^(n-1)`:
/// with the defaults that is 500 ms → 1 s → 2 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 3.
    pub max_retries: u32,
    /// Initial delay in milliseconds. Default: 500.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_ms(&self, retry: u32) -> u64 {
        let shift = retry.saturating_sub(1).min(20);
        self.backoff_ms.saturating_mul(1u64 << shift)
    }

    /// Total number of attempts including the first.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Styling applied to the converted Word document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocxStyle {
    /// Font for Latin glyphs (`w:ascii` / `w:hAnsi`). Default: Times New Roman.
    pub latin_font: String,
    /// Font for East-Asian glyphs (`w:eastAsia`). Default: MS Mincho.
    pub east_asian_font: String,
    /// Run colour as 6 hex digits. Default: `000000`.
    pub text_color: String,
    /// Table border width in eighths of a point. Default: 8 (1 pt).
    pub border_size: u32,
    /// Table border colour as 6 hex digits. Default: `000000`.
    pub border_color: String,
}

impl Default for DocxStyle {
    fn default() -> Self {
        Self {
            latin_font: "Times New Roman".to_string(),
            east_asian_font: "MS Mincho".to_string(),
            text_color: "000000".to_string(),
            border_size: 8,
            border_color: "000000".to_string(),
        }
    }
}

impl DocxStyle {
    fn validate(&self) -> Result<(), DraftError> {
        if self.latin_font.trim().is_empty() || self.east_asian_font.trim().is_empty() {
            return Err(DraftError::InvalidConfig("font names must not be empty".into()));
        }
        for (field, value) in [("text_color", &self.text_color), ("border_color", &self.border_color)] {
            if value.len() != 6 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(DraftError::InvalidConfig(format!(
                    "{field} must be 6 hex digits, got '{value}'"
                )));
            }
        }
        if self.border_size == 0 {
            return Err(DraftError::InvalidConfig("border_size must be ≥ 1".into()));
        }
        Ok(())
    }
}

//! Error types for the report-drafter library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`DraftError`] — **Fatal**: the request cannot complete (missing API key
//!   or file, bad PDF, pandoc missing, malformed docx, retries exhausted).
//!   Returned as `Err(DraftError)` from every top-level entry point.
//!
//! * [`LlmError`] — a single failed call to the LLM provider. The retry loop
//!   in [`crate::pipeline::retry`] absorbs these until the attempt budget is
//!   spent, then wraps the last one in [`DraftError::RetriesExhausted`].

use crate::output::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the report-drafter library.
#[derive(Debug, Error)]
pub enum DraftError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required user input (API key or PDF file) was not supplied.
    #[error("Missing required input: {field}\nProvide both an API key and a PDF file.")]
    MissingInput { field: &'static str },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// The PDF is larger than the provider accepts as inline data.
    #[error("'{name}' is {size} bytes; the limit is {limit} bytes")]
    PdfTooLarge { name: String, size: usize, limit: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// Every attempt of an LLM stage failed; carries the final error.
    #[error("{stage} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        stage: Stage,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    /// The draft stream broke after it had started yielding text.
    #[error("Draft stream interrupted: {0}")]
    StreamInterrupted(#[source] LlmError),

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The external document converter could not be started.
    #[error("Document converter '{program}' could not be started: {reason}\nInstall pandoc or pass --pandoc <PATH>.")]
    ConverterNotFound { program: String, reason: String },

    /// The external document converter exited unsuccessfully.
    #[error("Document converter exited with {status}: {stderr}")]
    ConverterFailed { status: String, stderr: String },

    /// The produced `.docx` is missing a part or is structurally unexpected.
    #[error("Invalid docx: {0}")]
    InvalidDocx(String),

    /// An OOXML part could not be parsed.
    #[error("XML error in '{part}': {detail}")]
    Xml { part: String, detail: String },

    /// The zip container could not be read or written.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read an input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the LLM provider.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The provider rejected the API key (HTTP 401/403).
    #[error("authentication rejected by '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429 from the provider.
    #[error("rate limit exceeded for '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("'{provider}' returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// The request did not complete in time.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered, but without any text (e.g. safety block).
    #[error("empty response (finish reason: {reason})")]
    EmptyResponse { reason: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl DraftError {
    /// `true` when the error is the caller's fault (missing or invalid input).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DraftError::MissingInput { .. }
                | DraftError::FileNotFound { .. }
                | DraftError::PermissionDenied { .. }
                | DraftError::NotAPdf { .. }
                | DraftError::PdfTooLarge { .. }
        )
    }

    /// `true` when the error came from the LLM provider.
    pub fn is_llm_error(&self) -> bool {
        matches!(
            self,
            DraftError::RetriesExhausted { .. } | DraftError::StreamInterrupted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_display() {
        let e = DraftError::MissingInput { field: "api_key" };
        assert!(e.to_string().contains("api_key"));
        assert!(e.is_input_error());
    }

    #[test]
    fn retries_exhausted_display_names_stage() {
        let e = DraftError::RetriesExhausted {
            stage: Stage::Ocr,
            attempts: 4,
            source: LlmError::RateLimited {
                provider: "gemini".into(),
                retry_after_secs: None,
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("OCR"), "got: {msg}");
        assert!(msg.contains("4 attempts"), "got: {msg}");
        assert!(msg.contains("gemini"), "got: {msg}");
        assert!(e.is_llm_error());
    }

    #[test]
    fn api_error_display() {
        let e = LlmError::Api {
            provider: "gemini".into(),
            status: 500,
            message: "backend overloaded".into(),
        };
        assert!(e.to_string().contains("500"));
        assert!(e.to_string().contains("backend overloaded"));
    }

    #[test]
    fn converter_not_found_hint() {
        let e = DraftError::ConverterNotFound {
            program: "pandoc".into(),
            reason: "No such file or directory".into(),
        };
        assert!(e.to_string().contains("--pandoc"));
        assert!(!e.is_input_error());
    }
}

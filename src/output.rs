//! Output types produced by a report generation run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three stages of a report generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Text extraction from the uploaded PDF.
    Ocr,
    /// Streaming draft generation from the extracted text.
    Draft,
    /// Markdown normalisation, pandoc conversion and docx styling.
    Convert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Ocr => "OCR",
            Stage::Draft => "Draft generation",
            Stage::Convert => "Document conversion",
        };
        f.write_str(s)
    }
}

/// Everything a successful run produced.
///
/// The three artefacts are exactly the entries of the downloadable archive
/// (see [`crate::archive`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    /// Markdown extracted from the PDF by the OCR step.
    pub textbook: String,
    /// Draft report markdown, as generated (after LLM-output cleanup).
    pub draft: String,
    /// The formatted Word document.
    #[serde(skip)]
    pub docx: Vec<u8>,
    /// Timing and token statistics.
    pub stats: ReportStats,
}

/// Statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportStats {
    /// Size of the uploaded PDF in bytes.
    pub pdf_bytes: usize,
    /// Retries spent across both LLM stages.
    pub retries: u32,
    /// Number of non-empty chunks received from the draft stream.
    pub draft_chunks: usize,
    /// Prompt tokens reported by the OCR call (0 if not reported).
    pub ocr_input_tokens: u32,
    /// Completion tokens reported by the OCR call (0 if not reported).
    pub ocr_output_tokens: u32,
    pub ocr_duration_ms: u64,
    pub draft_duration_ms: u64,
    pub convert_duration_ms: u64,
    pub total_duration_ms: u64,
}

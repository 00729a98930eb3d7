//! Pipeline stages for PDF → draft → Word conversion.
//!
//! Each submodule implements exactly one step, so every step is testable on
//! its own and the network-bound stages can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ draft ──▶ postprocess ──▶ math ──▶ spacing ──▶ docx
//! (path/URL) (LLM)  (LLM,      (LLM cleanup)   ($$→$)   (blank     (pandoc +
//!                   streamed)                           lines)     styling)
//! ```
//!
//! 1. [`input`]       — load and validate the PDF bytes
//! 2. [`llm`]         — provider seam and the Gemini REST client
//! 3. [`retry`]       — bounded exponential backoff around both LLM calls
//! 4. [`ocr`]         — PDF → markdown
//! 5. [`postprocess`] — strip fences and invisible characters the model adds
//! 6. [`math`]        — rewrite in-sentence `$$…$$` to `$…$`
//! 7. [`spacing`]     — blank lines around math, tables and figures
//!
//! The draft stage lives in [`crate::stream`] because it exposes a stream.

pub mod input;
pub mod llm;
pub mod math;
pub mod ocr;
pub mod postprocess;
pub mod retry;
pub mod spacing;

/// Prepare markdown for pandoc: math delimiters first, then block spacing.
///
/// # Example
/// ```rust
/// use report_drafter::normalize_markdown;
///
/// let md = "Fick's law gives $$J_A$$:\n$$J_A = -D \\frac{dC}{dz}$$\nwhere D is constant.";
/// assert_eq!(
///     normalize_markdown(md),
///     "Fick's law gives $J_A$:\n\n$$J_A = -D \\frac{dC}{dz}$$\n\nwhere D is constant."
/// );
/// ```
pub fn normalize_markdown(text: &str) -> String {
    spacing::pad_blocks(&math::normalize_math(text))
}

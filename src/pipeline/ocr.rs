//! OCR stage: the whole PDF goes to the model in one request and comes back
//! as markdown with `$$`-delimited math.

use super::input::PdfSource;
use super::llm::{Attachment, LlmProvider, LlmRequest, LlmResponse};
use super::postprocess::clean_markdown;
use super::retry::with_backoff;
use crate::config::DraftConfig;
use crate::error::{DraftError, LlmError};
use crate::output::Stage;
use crate::prompts::OCR_PROMPT;
use std::time::Instant;
use tracing::{debug, info};

/// Result of the OCR stage.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    /// Cleaned markdown of the textbook.
    pub markdown: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub retries: u32,
    pub duration_ms: u64,
}

/// Extract the text of `pdf` as markdown.
///
/// The call is retried per [`DraftConfig::retry`]. A response with no
/// text counts as a failed attempt.
pub async fn extract_text(
    provider: &dyn LlmProvider,
    pdf: &PdfSource,
    config: &DraftConfig,
) -> Result<OcrOutput, DraftError> {
    let prompt = config.ocr_prompt.as_deref().unwrap_or(OCR_PROMPT);
    let request = LlmRequest::new(&config.ocr_model, prompt)
        .with_attachment(Attachment::pdf(pdf.bytes.clone()))
        .with_options(config);

    info!(
        "OCR: sending '{}' ({} bytes) to {} ({})",
        pdf.name,
        pdf.len(),
        provider.name(),
        config.ocr_model
    );
    let start = Instant::now();
    let request = &request;

    let (response, retries) = with_backoff(
        Stage::Ocr,
        &config.retry,
        config.progress_callback.as_ref(),
        move |_| async move {
            let response: LlmResponse = provider.generate(request).await?;
            if response.text.trim().is_empty() {
                return Err(LlmError::EmptyResponse {
                    reason: "blank text".into(),
                });
            }
            Ok(response)
        },
    )
    .await?;

    let markdown = clean_markdown(&response.text);
    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        "OCR: {} chars, {} in / {} out tokens, {}ms",
        markdown.len(),
        response.input_tokens,
        response.output_tokens,
        duration_ms
    );

    Ok(OcrOutput {
        markdown,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        retries,
        duration_ms,
    })
}

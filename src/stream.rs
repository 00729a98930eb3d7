//! Streaming draft generation: emit report text as the model writes it.
//!
//! A full draft takes the model a minute or more. [`draft_stream`] hands
//! out chunks as they arrive so the CLI can echo them and the progress
//! callback can show liveness; [`generate_draft`] drains the same stream
//! into one string for callers that only want the result.
//!
//! Retries cover opening the stream only. Once text has started flowing, a
//! broken connection surfaces as [`DraftError::StreamInterrupted`] instead of
//! silently restarting and duplicating output.

use crate::config::DraftConfig;
use crate::error::{DraftError, LlmError};
use crate::output::Stage;
use crate::pipeline::llm::{LlmProvider, LlmRequest};
use crate::pipeline::postprocess::clean_markdown;
use crate::pipeline::retry::with_backoff;
use crate::prompts::draft_prompt;
use futures::stream::StreamExt;
use std::pin::Pin;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of draft text chunks.
pub type DraftStream = Pin<Box<dyn Stream<Item = Result<String, DraftError>> + Send>>;

/// A fully assembled draft.
#[derive(Debug, Clone)]
pub struct DraftOutput {
    /// Cleaned draft markdown.
    pub markdown: String,
    /// Number of non-empty chunks received.
    pub chunks: usize,
    /// Retries spent opening the stream.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Open a draft stream for `textbook`.
///
/// Empty chunks are dropped. Every chunk yielded is also passed to the
/// configured progress callback's `on_draft_chunk`.
///
/// # Returns
/// - `Ok((DraftStream, retries))` once the provider accepted the request
/// - `Err(DraftError::RetriesExhausted)` if it never did
///
/// # Example
/// ```rust,no_run
/// use report_drafter::{draft_stream, resolve_provider, DraftConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DraftConfig::builder().api_key("AIza...").build()?;
/// let provider = resolve_provider(&config)?;
/// let (mut stream, _) = draft_stream(provider.as_ref(), "# Experiment 4\n...", &config).await?;
/// while let Some(chunk) = stream.next().await {
///     print!("{}", chunk?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn draft_stream(
    provider: &dyn LlmProvider,
    textbook: &str,
    config: &DraftConfig,
) -> Result<(DraftStream, u32), DraftError> {
    let prompt = draft_prompt(
        textbook,
        config.draft_instruction.as_deref(),
        &config.language,
    );
    let request = LlmRequest::new(&config.draft_model, prompt).with_options(config);
    let request = &request;

    info!(
        "Draft: streaming from {} ({}), textbook {} chars",
        provider.name(),
        config.draft_model,
        textbook.len()
    );

    let (inner, retries) = with_backoff(
        Stage::Draft,
        &config.retry,
        config.progress_callback.as_ref(),
        move |_| async move { provider.generate_stream(request).await },
    )
    .await?;

    let progress = config.progress_callback.clone();
    let s = inner.filter_map(move |item| {
        let out = match item {
            Ok(text) if text.is_empty() => None,
            Ok(text) => {
                if let Some(cb) = &progress {
                    cb.on_draft_chunk(&text);
                }
                Some(Ok(text))
            }
            Err(e) => Some(Err(DraftError::StreamInterrupted(e))),
        };
        futures::future::ready(out)
    });

    Ok((Box::pin(s), retries))
}

/// Stream a draft to completion and return the cleaned markdown.
///
/// The first stream error aborts the run, as does a stream that ends
/// without yielding any text.
pub async fn generate_draft(
    provider: &dyn LlmProvider,
    textbook: &str,
    config: &DraftConfig,
) -> Result<DraftOutput, DraftError> {
    let start = Instant::now();
    let (mut stream, retries) = draft_stream(provider, textbook, config).await?;

    let mut raw = String::new();
    let mut chunks = 0usize;
    while let Some(chunk) = stream.next().await {
        raw.push_str(&chunk?);
        chunks += 1;
    }

    if raw.trim().is_empty() {
        return Err(DraftError::StreamInterrupted(LlmError::EmptyResponse {
            reason: "stream ended without text".into(),
        }));
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!("Draft: {} chunks, {} chars, {}ms", chunks, raw.len(), duration_ms);

    Ok(DraftOutput {
        markdown: clean_markdown(&raw),
        chunks,
        retries,
        duration_ms,
    })
}

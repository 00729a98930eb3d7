//! LLM provider seam and the Gemini REST client.
//!
//! The pipeline talks to the model only through [`LlmProvider`], so tests and
//! embedders can substitute their own implementation via
//! [`crate::config::DraftConfig::provider`]. [`GeminiProvider`] is the
//! built-in implementation: it takes the user's API key per instance (the
//! key arrives with each upload), sends PDFs as base64 inline data and reads
//! streamed answers from the `alt=sse` endpoint.
//!
//! Retries are not handled here; see [`crate::pipeline::retry`].

use crate::config::DraftConfig;
use crate::error::{DraftError, LlmError};
use async_trait::async_trait;
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of generated text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A file sent alongside the prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn pdf(data: Vec<u8>) -> Self {
        Self {
            mime_type: "application/pdf".to_string(),
            data,
        }
    }
}

/// One generation request: attachments first, then the text prompt.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            attachments: Vec::new(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Copy sampling options from the config.
    pub fn with_options(mut self, config: &DraftConfig) -> Self {
        self.temperature = config.temperature;
        self.max_output_tokens = config.max_output_tokens;
        self
    }
}

/// A complete (non-streamed) answer.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Anything that can answer an [`LlmRequest`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;

    /// Generate a complete answer.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Open a stream of answer chunks.
    ///
    /// An `Err` here means the stream could not be opened at all; errors
    /// after that arrive as stream items.
    async fn generate_stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError>;
}

// ── Gemini ────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
///
/// `timeout_secs` bounds a whole `generateContent` call. Streamed answers
/// can run for minutes, so the streaming client only bounds the connect and
/// the gap between two network chunks.
pub struct GeminiProvider {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            stream_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    /// Build from the key, endpoint and timeout in `config`.
    pub fn from_config(api_key: impl Into<String>, config: &DraftConfig) -> Result<Self, LlmError> {
        Self::new(api_key, config.api_base_url.clone(), config.api_timeout_secs)
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post(
        &self,
        client: &reqwest::Client,
        url: &str,
        request: &LlmRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let body = GenerateContentRequest::from_request(request);
        let response = client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &body, retry_after_secs))
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = self.endpoint(&request.model, "generateContent");
        debug!("POST {} ({} attachments)", url, request.attachments.len());

        let response = self.post(&self.client, &url, request).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = body.text();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                reason: body.finish_reason(),
            });
        }
        let usage = body.usage_metadata.unwrap_or_default();
        Ok(LlmResponse {
            text,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        })
    }

    async fn generate_stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        debug!("POST {} (streaming)", url);

        let response = self.post(&self.stream_client, &url, request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| LlmError::Transport(e.to_string())));

        Ok(sse_text_stream(bytes, Duration::from_secs(self.timeout_secs)))
    }
}

/// Turn an SSE body into a stream of non-empty text chunks.
///
/// `idle` bounds the wait for each network chunk, not the whole body. The
/// stream ends after the first error.
fn sse_text_stream<S, B>(bytes: S, idle: Duration) -> TextStream
where
    S: Stream<Item = Result<B, LlmError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let idle_secs = idle.as_secs();
    let framed = tokio_stream::StreamExt::timeout(bytes, idle)
        .map(move |item| match item {
            Ok(chunk) => Some(chunk),
            Err(_) => Some(Err(LlmError::Timeout { secs: idle_secs })),
        })
        // `None` marks the end of the body so the decoder can flush.
        .chain(stream::once(futures::future::ready(None)));

    let chunks = framed
        .scan(
            (SseDecoder::default(), false),
            |(decoder, failed), item| {
                if *failed {
                    return futures::future::ready(None);
                }
                let items: Vec<Result<String, LlmError>> = match item {
                    Some(Ok(bytes)) => decoder
                        .push(bytes.as_ref())
                        .into_iter()
                        .map(|payload| decode_stream_payload(&payload))
                        .collect(),
                    Some(Err(e)) => {
                        *failed = true;
                        vec![Err(e)]
                    }
                    None => decoder
                        .finish()
                        .into_iter()
                        .map(|payload| decode_stream_payload(&payload))
                        .collect(),
                };
                futures::future::ready(Some(stream::iter(items)))
            },
        )
        .flatten()
        .filter(|item| futures::future::ready(!matches!(item, Ok(text) if text.is_empty())));

    Box::pin(chunks)
}

// ── Provider resolution ───────────────────────────────────────────────────

/// Pick the provider for a run.
///
/// Resolution order:
/// 1. `config.provider` (pre-built, e.g. a test double)
/// 2. `config.api_key` (the key uploaded with the request)
/// 3. `GEMINI_API_KEY`, then `GOOGLE_API_KEY`
///
/// A blank key counts as absent.
pub fn resolve_provider(config: &DraftConfig) -> Result<Arc<dyn LlmProvider>, DraftError> {
    if let Some(provider) = &config.provider {
        return Ok(Arc::clone(provider));
    }

    let key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env_key("GEMINI_API_KEY"))
        .or_else(|| env_key("GOOGLE_API_KEY"))
        .ok_or(DraftError::MissingInput { field: "api_key" })?;

    let provider = GeminiProvider::from_config(key.trim(), config)
        .map_err(|e| DraftError::Internal(format!("could not build HTTP client: {e}")))?;
    Ok(Arc::new(provider))
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Map a non-success status to an [`LlmError`].
fn status_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.chars().take(300).collect());
    match status {
        401 | 403 => LlmError::Auth {
            provider: "gemini".to_string(),
            detail: message,
        },
        429 => LlmError::RateLimited {
            provider: "gemini".to_string(),
            retry_after_secs,
        },
        _ => LlmError::Api {
            provider: "gemini".to_string(),
            status,
            message,
        },
    }
}

fn decode_stream_payload(payload: &str) -> Result<String, LlmError> {
    let chunk: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| LlmError::Decode(e.to_string()))?;
    Ok(chunk.text())
}

// ── SSE framing ───────────────────────────────────────────────────────────

/// Incremental decoder for `text/event-stream` bodies.
///
/// Network chunks split events at arbitrary byte offsets; the decoder
/// buffers until a complete line is available and returns the `data:`
/// payloads of every event completed by the pushed bytes.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.line(&raw, &mut events);
        }

        events
    }

    /// Flush at end of body: a last event need not end with a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            self.line(&raw, &mut events);
        }
        self.line(b"", &mut events);
        events
    }

    fn line(&mut self, raw: &[u8], events: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // `event:`, `id:`, `retry:` and `:` comments carry nothing we use.
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        let mut parts: Vec<Part> = request
            .attachments
            .iter()
            .map(|a| Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: a.mime_type.clone(),
                    data: engine.encode(&a.data),
                }),
            })
            .collect();
        parts.push(Part {
            text: Some(request.prompt.clone()),
            inline_data: None,
        });

        let generation_config = if request.temperature.is_some() || request.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn finish_reason(&self) -> String {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
            return format!("prompt blocked: {reason}");
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "no candidates".to_string())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

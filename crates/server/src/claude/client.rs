//! Claude API client for streaming chat turns.

use std::future::Future;
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use shop_chat_core::Message;

use crate::config::ClaudeConfig;

use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, StreamEvent, Tool};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Stream of raw model events for one assistant message.
pub type ModelStream = BoxStream<'static, Result<StreamEvent, ClaudeError>>;

/// A model that answers a conversation with a stream of events.
pub trait ModelBackend: Send + Sync {
    /// Start streaming one assistant message.
    fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> impl Future<Output = Result<ModelStream, ClaudeError>> + Send;
}

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::Unauthorized` if the API key contains invalid
    /// header characters, or `ClaudeError::Http` if the HTTP client cannot
    /// be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let api_key = config.api_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|_| {
                ClaudeError::Unauthorized("API key is not a valid header value".to_string())
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    /// Model ID requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send a chat request and get a streaming response.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial request fails or the API answers with
    /// an error status.
    #[instrument(skip(self, messages, system, tools), fields(model = %self.inner.model))]
    pub async fn chat_stream(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ModelStream, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
            tools,
            stream: Some(true),
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;

        // Check for error responses before streaming
        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        Ok(stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);

                        // Process complete SSE events
                        while let Some(event) = extract_sse_event(&mut buffer) {
                            if let Some(parsed) = parse_sse_event(&event) {
                                yield parsed;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ClaudeError::Stream(e.to_string()));
                        break;
                    }
                }
            }
        }
        .boxed())
    }
}

impl ModelBackend for ClaudeClient {
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ModelStream, ClaudeError> {
        self.chat_stream(messages, system, tools).await
    }
}

/// Handle an error status code.
async fn handle_error_status(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> ClaudeError {
    // Check for rate limiting
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return ClaudeError::RateLimited(retry_after);
    }

    // Check for unauthorized
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ClaudeError::Unauthorized("Invalid API key".to_string());
    }

    // Try to parse API error response
    match response.text().await {
        Ok(body) => parse_error_body(&body),
        Err(e) => ClaudeError::Http(e),
    }
}

fn parse_error_body(body: &str) -> ClaudeError {
    serde_json::from_str::<ApiErrorResponse>(body).map_or_else(
        |_| ClaudeError::Api {
            error_type: "unknown".to_string(),
            message: body.to_string(),
        },
        |api_error| ClaudeError::Api {
            error_type: api_error.error.error_type,
            message: api_error.error.message,
        },
    )
}

/// Extract a complete SSE event from the buffer.
///
/// Returns `Some(event)` if a complete event was found (and removes it from buffer),
/// or `None` if no complete event is available yet. Bytes are only decoded once
/// the whole event has arrived, so multi-byte characters split across chunks
/// survive.
fn extract_sse_event(buffer: &mut Vec<u8>) -> Option<String> {
    // SSE events are separated by double newlines
    let idx = buffer.windows(2).position(|w| w == b"\n\n")?;
    let rest = buffer.split_off(idx + 2);
    let mut event = std::mem::replace(buffer, rest);
    event.truncate(idx);
    Some(String::from_utf8_lossy(&event).into_owned())
}

/// Parse an SSE event string into a `StreamEvent`.
fn parse_sse_event(event: &str) -> Option<Result<StreamEvent, ClaudeError>> {
    // Skip empty events
    if event.trim().is_empty() {
        return None;
    }

    // Parse SSE format: "event: <type>\ndata: <json>"
    let data = event
        .lines()
        .find_map(|line| line.strip_prefix("data:").map(str::trim_start))?;

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(StreamEvent::Error { error }) => Some(Err(ClaudeError::Api {
            error_type: error.error_type,
            message: error.message,
        })),
        Ok(stream_event) => Some(Ok(stream_event)),
        Err(e) => Some(Err(ClaudeError::Parse(format!(
            "Failed to parse stream event: {e}"
        )))),
    }
}

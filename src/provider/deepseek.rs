//! DeepSeek capability provider (OpenAI-compatible chat completions).
//!
//! Speaks the `/chat/completions` wire format with Bearer auth, so pointing
//! `base_url` at any OpenAI-compatible endpoint works too. Streaming uses
//! server-sent events read incrementally off the response body: bytes are
//! buffered until a complete `data:` line is available, each line's
//! `delta.content` becomes one chunk, and `data: [DONE]` terminates the
//! sequence.

use crate::error::ProviderError;
use crate::provider::{CapabilityProvider, ChunkStream, CompletionRequest};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// DeepSeek (or any OpenAI-compatible) chat-completions provider.
pub struct DeepSeekProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Upper bound for a single non-streaming call.
    request_timeout: Duration,
}

impl DeepSeekProvider {
    /// Create a provider with the default model (`deepseek-chat`).
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, "deepseek-chat")
    }

    /// Create a provider with a specific model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            // No client-level timeout: streaming responses legitimately run
            // for minutes. Non-streaming calls get a per-request timeout.
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-call timeout for non-streaming completions.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });
        messages
    }

    /// Map a non-success HTTP response into the error taxonomy.
    async fn error_for_status(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            ProviderError::Auth {
                provider: "deepseek".into(),
                detail: body,
            }
        } else {
            ProviderError::Api {
                status: status.as_u16(),
                message: body,
            }
        }
    }

    /// Extract the content delta from one parsed SSE payload, if any.
    fn delta_content(data: &Value) -> Option<String> {
        let content = data
            .get("choices")?
            .get(0)?
            .get("delta")?
            .get("content")?
            .as_str()?;
        if content.is_empty() {
            None
        } else {
            Some(content.to_string())
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl CapabilityProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        secs: self.request_timeout.as_secs(),
                    }
                } else {
                    ProviderError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(content)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        };

        debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            "opening streaming completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        // Read SSE incrementally: buffer bytes until a full line is
        // available, forward each content delta as one chunk.
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, ProviderError>>(64);
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut line_buffer = String::new();

            'outer: while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::Stream {
                                detail: e.to_string(),
                            }))
                            .await;
                        return;
                    }
                };
                line_buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = line_buffer.find('\n') {
                    let line: String = line_buffer.drain(..=newline).collect();
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    match serde_json::from_str::<Value>(data) {
                        Ok(payload) => {
                            if let Some(content) = Self::delta_content(&payload) {
                                if tx.send(Ok(content)).await.is_err() {
                                    // Receiver dropped; request was cancelled.
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping unparsable SSE chunk");
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

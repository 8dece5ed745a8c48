//! Scripted capability provider for tests and demos.
//!
//! Production code never branches on a "mock mode" flag; instead this
//! separate implementation is injected wherever a real provider would be.
//! Responses are scripted up front: queued per-call answers, an optional
//! default answer, optional streaming chunks, and failure injection for
//! both paths.

use crate::error::ProviderError;
use crate::provider::{CapabilityProvider, ChunkStream, CompletionRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A provider whose every answer is decided in advance.
///
/// `complete` pops scripted responses in FIFO order, then falls back to the
/// default response, then fails. Streaming is off until chunks are supplied
/// via [`with_stream_chunks`](FakeProvider::with_stream_chunks).
#[derive(Default)]
pub struct FakeProvider {
    scripted: Mutex<VecDeque<Result<String, String>>>,
    default_response: Option<String>,
    stream_chunks: Option<Vec<String>>,
    fail_streaming: bool,
    calls: AtomicUsize,
}

impl FakeProvider {
    /// A provider with no script: every call fails. Useful for exercising
    /// pure-fallback paths.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// A provider that answers every completion with the same text.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            default_response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Queue one successful response (consumed in FIFO order before the
    /// default response is considered).
    pub fn respond(self, response: impl Into<String>) -> Self {
        self.scripted
            .lock()
            .expect("script lock")
            .push_back(Ok(response.into()));
        self
    }

    /// Queue one failed call.
    pub fn respond_err(self, detail: impl Into<String>) -> Self {
        self.scripted
            .lock()
            .expect("script lock")
            .push_back(Err(detail.into()));
        self
    }

    /// Enable streaming; `complete_streaming` will yield these chunks in
    /// order.
    pub fn with_stream_chunks(mut self, chunks: Vec<String>) -> Self {
        self.stream_chunks = Some(chunks);
        self
    }

    /// Enable streaming but make every streaming call fail at start, forcing
    /// callers onto their non-streaming fallback.
    pub fn with_broken_streaming(mut self) -> Self {
        self.fail_streaming = true;
        self
    }

    /// Number of `complete` calls made so far (streaming not included).
    pub fn completion_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = self.scripted.lock().expect("script lock").pop_front() {
            return scripted.map_err(|detail| ProviderError::Api {
                status: 500,
                message: detail,
            });
        }

        match &self.default_response {
            Some(text) => Ok(text.clone()),
            None => Err(ProviderError::Api {
                status: 503,
                message: "fake provider has no scripted response".into(),
            }),
        }
    }

    fn supports_streaming(&self) -> bool {
        self.stream_chunks.is_some() || self.fail_streaming
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let _ = request;
        if self.fail_streaming {
            return Err(ProviderError::Stream {
                detail: "fake stream configured to fail".into(),
            });
        }
        match &self.stream_chunks {
            Some(chunks) => {
                let items: Vec<Result<String, ProviderError>> =
                    chunks.iter().cloned().map(Ok).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            None => Err(ProviderError::StreamingUnsupported {
                provider: "fake".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Structured;
    use futures::StreamExt;

    #[tokio::test]
    async fn scripted_responses_pop_in_order() {
        let provider = FakeProvider::always("default").respond("first").respond("second");
        let req = CompletionRequest::new("q");
        assert_eq!(provider.complete(&req).await.unwrap(), "first");
        assert_eq!(provider.complete(&req).await.unwrap(), "second");
        assert_eq!(provider.complete(&req).await.unwrap(), "default");
        assert_eq!(provider.completion_calls(), 3);
    }

    #[tokio::test]
    async fn unreachable_provider_always_errors() {
        let provider = FakeProvider::unreachable();
        let req = CompletionRequest::new("q");
        assert!(provider.complete(&req).await.is_err());
        assert!(!provider.supports_streaming());
    }

    #[tokio::test]
    async fn stream_chunks_yield_in_order() {
        let provider = FakeProvider::always("x")
            .with_stream_chunks(vec!["<!DOCTYPE html>".into(), "<html>".into(), "</html>".into()]);
        let mut stream = provider
            .complete_streaming(&CompletionRequest::new("q"))
            .await
            .unwrap();
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk.unwrap());
        }
        assert_eq!(out, "<!DOCTYPE html><html></html>");
    }

    #[tokio::test]
    async fn structured_default_method_parses_fenced_json() {
        let provider = FakeProvider::always("```json\n{\"intent\": \"compare\"}\n```");
        match provider.complete_structured("analyze", None).await.unwrap() {
            Structured::Parsed(v) => assert_eq!(v["intent"], "compare"),
            Structured::Malformed { .. } => panic!("should parse"),
        }
    }
}

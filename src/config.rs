//! Configuration types for visualization generation.
//!
//! All pipeline behaviour is controlled through [`VizConfig`], built via its
//! [`VizConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share configs across requests and to diff two runs to understand why
//! their outputs differ.

use crate::error::VizError;
use crate::progress::ProgressObserver;
use crate::provider::CapabilityProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for a visualization request.
///
/// Built via [`VizConfig::builder()`] or [`VizConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2viz::VizConfig;
///
/// let config = VizConfig::builder()
///     .model("deepseek-chat")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VizConfig {
    /// Pre-constructed capability provider. Takes precedence over
    /// `api_key`/environment resolution. This is the injection point for
    /// [`crate::provider::FakeProvider`] in tests.
    pub provider: Option<Arc<dyn CapabilityProvider>>,

    /// API key for the default DeepSeek provider. If `None`, the
    /// `DEEPSEEK_API_KEY` environment variable is consulted.
    pub api_key: Option<String>,

    /// Model identifier. Default: "deepseek-chat".
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to the supplied data, which
    /// matters more here than creative layout variety.
    pub temperature: f32,

    /// Token budget for the streamed generation call. Default: 16384.
    ///
    /// Streaming exists precisely so the document can be large; this budget
    /// is deliberately bigger than the non-streaming one.
    pub max_tokens_stream: u32,

    /// Token budget for the non-streaming generation fallback. Default: 8192.
    pub max_tokens_single: u32,

    /// Maximum retry attempts for the non-streaming generation fallback.
    /// Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms, 1 s, 2 s.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for single completions, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Overall timeout for draining a streamed generation, in seconds.
    /// Default: 180.
    pub stream_timeout_secs: u64,

    /// Character budget for paper body text in extraction prompts.
    /// Default: 15000.
    pub max_paper_chars: usize,

    /// Optional observer for stage and streaming events.
    pub progress: Option<ProgressObserver>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 0.1,
            max_tokens_stream: 16_384,
            max_tokens_single: 8_192,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            stream_timeout_secs: 180,
            max_paper_chars: 15_000,
            progress: None,
        }
    }
}

impl fmt::Debug for VizConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VizConfig")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens_stream", &self.max_tokens_stream)
            .field("max_tokens_single", &self.max_tokens_single)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("stream_timeout_secs", &self.stream_timeout_secs)
            .field("max_paper_chars", &self.max_paper_chars)
            .finish()
    }
}

impl VizConfig {
    /// Create a new builder.
    pub fn builder() -> VizConfigBuilder {
        VizConfigBuilder {
            config: Self::default(),
        }
    }

    /// Observer to notify, defaulting to a no-op.
    pub(crate) fn observer(&self) -> ProgressObserver {
        self.progress
            .clone()
            .unwrap_or_else(|| Arc::new(crate::progress::NoopProgress))
    }
}

/// Builder for [`VizConfig`].
#[derive(Debug)]
pub struct VizConfigBuilder {
    config: VizConfig,
}

impl VizConfigBuilder {
    pub fn provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens_stream(mut self, n: u32) -> Self {
        self.config.max_tokens_stream = n.max(256);
        self
    }

    pub fn max_tokens_single(mut self, n: u32) -> Self {
        self.config.max_tokens_single = n.max(256);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn stream_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stream_timeout_secs = secs;
        self
    }

    pub fn max_paper_chars(mut self, chars: usize) -> Self {
        self.config.max_paper_chars = chars;
        self
    }

    pub fn progress(mut self, observer: ProgressObserver) -> Self {
        self.config.progress = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VizConfig, VizError> {
        let c = &self.config;
        if c.model.is_empty() {
            return Err(VizError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens_stream < c.max_tokens_single {
            return Err(VizError::InvalidConfig(format!(
                "streaming token budget ({}) must be at least the single-call budget ({})",
                c.max_tokens_stream, c.max_tokens_single
            )));
        }
        if c.stream_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(VizError::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FakeProvider;

    #[test]
    fn defaults_are_valid() {
        let config = VizConfig::builder().build().unwrap();
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.max_tokens_stream, 16_384);
        assert!(config.max_tokens_stream >= config.max_tokens_single);
    }

    #[test]
    fn inverted_token_budgets_rejected() {
        let result = VizConfig::builder()
            .max_tokens_stream(1024)
            .max_tokens_single(4096)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn empty_model_rejected() {
        assert!(VizConfig::builder().model("").build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let config = VizConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = VizConfig::builder()
            .api_key("sk-secret-value")
            .provider(Arc::new(FakeProvider::unreachable()))
            .build()
            .unwrap();
        let dump = format!("{config:?}");
        assert!(!dump.contains("sk-secret-value"));
        assert!(dump.contains("redacted"));
        assert!(dump.contains("fake"));
    }
}

//! Capability-provider abstraction: the pipeline's only external collaborator.
//!
//! Every LLM interaction goes through [`CapabilityProvider`], which models
//! exactly three capabilities:
//!
//! 1. [`complete`](CapabilityProvider::complete) — prompt in, text out
//! 2. [`complete_streaming`](CapabilityProvider::complete_streaming) — prompt
//!    in, lazy sequence of text chunks out (optional; default unsupported)
//! 3. [`complete_structured`](CapabilityProvider::complete_structured) — a
//!    provided method layered on `complete` that coaxes, cleans, and parses
//!    JSON output, returning a tagged [`Structured`] result instead of
//!    throwing on garbage
//!
//! The pipeline stages depend only on this trait, so tests and demos inject
//! [`fake::FakeProvider`] while production wires up
//! [`deepseek::DeepSeekProvider`]. One provider instance is constructed per
//! process (or per request) and passed into each stage — no global
//! singletons.

pub mod deepseek;
pub mod fake;

pub use deepseek::DeepSeekProvider;
pub use fake::FakeProvider;

use crate::error::ProviderError;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use tracing::debug;

/// A lazy, finite, non-restartable sequence of generated text chunks.
///
/// Chunks must be concatenated in yield order to reconstruct the full text.
/// A transport failure mid-stream surfaces as an `Err` item; chunks already
/// yielded are not guaranteed structurally complete.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// One completion request: prompt, optional system prompt, sampling knobs.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: 4096,
            temperature: 0.1,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }
}

/// Outcome of a structured (JSON-producing) completion.
///
/// A tagged result instead of an exception: "the provider produced garbage"
/// is an expected, recoverable condition that every stage handles by
/// pattern-matching and falling back.
#[derive(Debug, Clone)]
pub enum Structured {
    /// The response parsed (possibly after fence stripping or balanced-block
    /// extraction) into a JSON value.
    Parsed(Value),
    /// Nothing parseable could be recovered; `raw` holds the response text
    /// (truncated) for diagnostics.
    Malformed { raw: String },
}

impl Structured {
    /// The parsed value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Structured::Parsed(v) => Some(v),
            Structured::Malformed { .. } => None,
        }
    }
}

/// Strict instruction appended to the system prompt for structured calls.
const JSON_ONLY_INSTRUCTION: &str = "You MUST output ONLY valid JSON.\n\
No explanations, no markdown, no code blocks, just pure JSON.\n\
Start directly with { or [ and end with } or ].";

/// Token budget for structured calls; analyses and practice lists are small.
const STRUCTURED_MAX_TOKENS: u32 = 4096;

/// External text/JSON completion service, treated as a black box.
///
/// Implementations must be `Send + Sync` and tolerate concurrent independent
/// calls; the pipeline issues them strictly sequentially within one request,
/// but separate requests may share a provider.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Provider name for logging ("deepseek", "fake", …).
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Single text completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Whether [`complete_streaming`](Self::complete_streaming) is usable.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Streamed completion. The default implementation reports the provider
    /// as non-streaming; the render driver then takes the non-streaming path.
    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let _ = request;
        Err(ProviderError::StreamingUnsupported {
            provider: self.name().to_string(),
        })
    }

    /// Completion that must yield JSON.
    ///
    /// Appends the output-only-JSON instruction to the system prompt, then
    /// cleans and parses the response: fences stripped, then a straight
    /// parse, then first-balanced-block extraction. A response that defeats
    /// all three comes back as [`Structured::Malformed`] rather than an
    /// error, so callers treat it like any other fallback trigger.
    async fn complete_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<Structured, ProviderError> {
        let system = match system {
            Some(s) => format!("{s}\n\n{JSON_ONLY_INSTRUCTION}"),
            None => JSON_ONLY_INSTRUCTION.to_string(),
        };
        let request = CompletionRequest::new(prompt)
            .with_system(system)
            .with_max_tokens(STRUCTURED_MAX_TOKENS);
        let text = self.complete(&request).await?;
        Ok(parse_structured(&text))
    }
}

// ── Response cleaning ────────────────────────────────────────────────────

/// Parse a model response that was asked for JSON.
pub fn parse_structured(text: &str) -> Structured {
    let cleaned = strip_code_fences(text);

    if let Ok(v) = serde_json::from_str::<Value>(cleaned) {
        return Structured::Parsed(v);
    }

    if let Some(candidate) = extract_balanced_json(cleaned) {
        if let Ok(v) = serde_json::from_str::<Value>(candidate) {
            debug!("structured response recovered via balanced-block extraction");
            return Structured::Parsed(v);
        }
    }

    let raw: String = cleaned.chars().take(500).collect();
    Structured::Malformed { raw }
}

/// Strip a surrounding markdown code fence (```json … ``` or bare ```),
/// leaving everything else untouched.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Find the first balanced `{…}` or `[…]` substring.
///
/// A bracket-depth scan rather than a regex: nested objects make balanced
/// matching non-regular. Brackets inside JSON strings are skipped.
fn extract_balanced_json(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find(['{', '['])?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strip_fences_bare() {
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn strip_fences_passthrough() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn parse_clean_json() {
        match parse_structured("{\"intent\": \"compare\"}") {
            Structured::Parsed(v) => assert_eq!(v["intent"], "compare"),
            Structured::Malformed { .. } => panic!("should parse"),
        }
    }

    #[test]
    fn parse_fenced_json() {
        let got = parse_structured("```json\n{\"x\": [1, 2]}\n```");
        assert_eq!(got.value().unwrap(), &json!({"x": [1, 2]}));
    }

    #[test]
    fn parse_json_embedded_in_prose() {
        let text = "Sure, here is the analysis:\n{\"intent\": \"compare\", \"nested\": {\"k\": 1}}\nHope that helps!";
        let got = parse_structured(text);
        assert_eq!(got.value().unwrap()["nested"]["k"], 1);
    }

    #[test]
    fn parse_array_embedded_in_prose() {
        let got = parse_structured("the result is [\"a\", \"b\"] as requested");
        assert_eq!(got.value().unwrap(), &json!(["a", "b"]));
    }

    #[test]
    fn parse_garbage_is_malformed_not_panic() {
        match parse_structured("I cannot help with that.") {
            Structured::Malformed { raw } => assert!(raw.contains("cannot help")),
            Structured::Parsed(_) => panic!("garbage must not parse"),
        }
    }

    #[test]
    fn balanced_scan_ignores_brackets_inside_strings() {
        let text = r#"note: {"msg": "use } carefully", "n": 2} trailing"#;
        let got = parse_structured(text);
        assert_eq!(got.value().unwrap()["n"], 2);
    }

    #[test]
    fn malformed_raw_is_capped() {
        let long = "x".repeat(2000);
        match parse_structured(&long) {
            Structured::Malformed { raw } => assert!(raw.len() <= 500),
            Structured::Parsed(_) => panic!(),
        }
    }

    #[test]
    fn request_builder_defaults() {
        let r = CompletionRequest::new("hi");
        assert_eq!(r.max_tokens, 4096);
        assert!(r.system.is_none());
        let r = r.with_system("sys").with_max_tokens(16384).with_temperature(0.7);
        assert_eq!(r.system.as_deref(), Some("sys"));
        assert_eq!(r.max_tokens, 16384);
    }
}

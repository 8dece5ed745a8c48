//! Error types for the paper2viz library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`VizError`] — **Fatal**: the request cannot proceed at all (no provider
//!   configured, unreadable PDF, unwritable data directory, final generation
//!   call exhausted every fallback). Returned as `Err(VizError)` from the
//!   top-level entry points.
//!
//! * [`ProviderError`] — **Recoverable**: a single LLM call failed
//!   (transport, auth, timeout, broken stream). Every pipeline stage except
//!   the final render catches it locally and substitutes its deterministic
//!   fallback, so the pipeline as a whole keeps progressing.
//!
//! The separation keeps the propagation policy visible in the signatures:
//! stage functions that can degrade return plain values, and only the
//! functions that may genuinely fail return `Result<_, VizError>`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2viz library.
///
/// Per-call LLM failures use [`ProviderError`] and are absorbed by stage
/// fallbacks rather than propagated here.
#[derive(Debug, Error)]
pub enum VizError {
    // ── Provider errors ───────────────────────────────────────────────────
    /// No capability provider could be resolved from config or environment.
    #[error("LLM provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// The final generation call failed after streaming and non-streaming
    /// attempts were both exhausted.
    #[error("Visualization generation failed: {source}")]
    GenerationFailed {
        #[source]
        source: ProviderError,
    },

    /// An extraction call failed at the transport level. Malformed output is
    /// not an error (it yields an empty fact list); a dead provider is.
    #[error("Extraction of '{category}' failed: {source}")]
    ExtractionFailed {
        category: String,
        #[source]
        source: ProviderError,
    },

    // ── Ingestion errors ──────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The PDF could not be parsed into text.
    #[error("Failed to extract text from PDF '{paper_id}': {detail}")]
    PdfExtractFailed { paper_id: String, detail: String },

    /// Extraction produced no text at all.
    #[error("PDF '{paper_id}' contains no extractable text")]
    EmptyDocument { paper_id: String },

    // ── Store errors ──────────────────────────────────────────────────────
    /// Could not read a cached fact file.
    #[error("Failed to read '{path}': {source}")]
    StoreReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write a file in the data directory.
    #[error("Failed to write '{path}': {source}")]
    StoreWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached fact file exists but is not valid JSON.
    #[error("Corrupt cache file '{path}': {detail}")]
    CorruptCache { path: PathBuf, detail: String },

    /// No cached facts exist for the requested paper.
    #[error("No cached data for paper '{paper_id}'\nRun `paper2viz extract` first.")]
    PaperNotFound { paper_id: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable error from a single capability-provider call.
///
/// Stages that consume structured completions treat any `ProviderError` as a
/// signal to use their deterministic fallback. Only the render driver is
/// allowed to let one escape, wrapped in [`VizError::GenerationFailed`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failure (connection, DNS, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication was rejected (401/403) — retrying will not help.
    #[error("Authentication failed for provider '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// The call exceeded its time budget.
    #[error("Provider call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The transport broke while a streamed response was in flight.
    /// Chunks already yielded are not guaranteed structurally complete.
    #[error("Stream interrupted: {detail}")]
    Stream { detail: String },

    /// The provider returned a success status but no usable content.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The provider does not implement a streaming interface.
    #[error("Provider '{provider}' does not support streaming")]
    StreamingUnsupported { provider: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failed_carries_source() {
        let e = VizError::GenerationFailed {
            source: ProviderError::Timeout { secs: 180 },
        };
        let msg = e.to_string();
        assert!(msg.contains("generation failed"), "got: {msg}");
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn api_error_display() {
        let e = ProviderError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("rate limited"));
    }

    #[test]
    fn streaming_unsupported_names_provider() {
        let e = ProviderError::StreamingUnsupported {
            provider: "fake".into(),
        };
        assert!(e.to_string().contains("fake"));
    }

    #[test]
    fn paper_not_found_hints_at_extract() {
        let e = VizError::PaperNotFound {
            paper_id: "paper_1".into(),
        };
        assert!(e.to_string().contains("paper2viz extract"));
    }
}

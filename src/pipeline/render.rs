//! Render driver: turn the assembled prompt into a complete HTML document.
//!
//! ## Strategy
//!
//! Streaming first: long documents routinely exceed what a single response
//! window returns comfortably, so when the provider supports streaming the
//! driver requests the larger token budget and accumulates chunks in arrival
//! order under an overall deadline. Any streaming failure (unsupported,
//! refused at start, broken mid-stream, deadline exceeded) drops to a
//! non-streaming call with the smaller budget, retried with exponential
//! backoff (`retry_backoff_ms * 2^attempt`).
//!
//! This is the only pipeline stage allowed to fail the whole request, and
//! only after both paths are exhausted.
//!
//! ## Repair
//!
//! Models occasionally wrap the document in markdown fences or emit a body
//! fragment without the surrounding document. [`normalize_markup`] strips
//! the fences and, when the result does not start with a doctype or root
//! element, wraps it verbatim in a minimal dark-theme shell so the caller
//! always receives something renderable.

use crate::config::VizConfig;
use crate::error::ProviderError;
use crate::provider::{CapabilityProvider, CompletionRequest};
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// How often (in chunks) to notify the progress observer while streaming.
const PROGRESS_EVERY: usize = 50;

/// Generate markup from `prompt`. Returns the normalized document and
/// whether streaming produced it.
pub async fn render(
    provider: &Arc<dyn CapabilityProvider>,
    prompt: &str,
    config: &VizConfig,
) -> Result<(String, bool), ProviderError> {
    if provider.supports_streaming() {
        match render_streaming(provider, prompt, config).await {
            Ok(markup) => return Ok((normalize_markup(&markup), true)),
            Err(e) => {
                warn!(error = %e, "streaming generation failed, falling back to single call");
            }
        }
    } else {
        debug!("provider does not stream, using single call");
    }

    let markup = render_single(provider, prompt, config).await?;
    Ok((normalize_markup(&markup), false))
}

/// Streamed generation: drain all chunks in arrival order under a deadline.
async fn render_streaming(
    provider: &Arc<dyn CapabilityProvider>,
    prompt: &str,
    config: &VizConfig,
) -> Result<String, ProviderError> {
    let request = CompletionRequest::new(prompt)
        .with_system(crate::prompts::GENERATOR_SYSTEM_PROMPT)
        .with_max_tokens(config.max_tokens_stream)
        .with_temperature(config.temperature);

    let observer = config.observer();
    let deadline = Duration::from_secs(config.stream_timeout_secs);

    let drained = timeout(deadline, async {
        let mut stream = provider.complete_streaming(&request).await?;
        let mut markup = String::new();
        let mut chunk_count = 0usize;

        // Chunks concatenate in yield order; reordering would corrupt the
        // document.
        while let Some(chunk) = stream.next().await {
            markup.push_str(&chunk?);
            chunk_count += 1;
            if chunk_count % PROGRESS_EVERY == 0 {
                observer.on_stream_progress(chunk_count, markup.len());
            }
        }

        debug!(chunks = chunk_count, chars = markup.len(), "stream drained");
        Ok::<String, ProviderError>(markup)
    })
    .await;

    match drained {
        Ok(Ok(markup)) if markup.trim().is_empty() => Err(ProviderError::EmptyResponse),
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            secs: config.stream_timeout_secs,
        }),
    }
}

/// Non-streaming generation with retry and exponential backoff.
async fn render_single(
    provider: &Arc<dyn CapabilityProvider>,
    prompt: &str,
    config: &VizConfig,
) -> Result<String, ProviderError> {
    let request = CompletionRequest::new(prompt)
        .with_system(crate::prompts::GENERATOR_SYSTEM_PROMPT)
        .with_max_tokens(config.max_tokens_single)
        .with_temperature(config.temperature);

    let mut last_err: Option<ProviderError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                attempt,
                max = config.max_retries,
                backoff_ms = backoff,
                "retrying generation"
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.complete(&request).await {
            Ok(markup) if !markup.trim().is_empty() => {
                info!(chars = markup.len(), "generation complete");
                return Ok(markup);
            }
            Ok(_) => {
                warn!("generation returned empty markup");
                last_err = Some(ProviderError::EmptyResponse);
            }
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "generation attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(ProviderError::EmptyResponse))
}

// ── Markup repair ────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:html)?\s*\n(.*)\n```\s*$").unwrap());

/// Normalize raw model output into a renderable document: trim, strip a
/// surrounding code fence, and wrap fragments in a document shell.
pub fn normalize_markup(input: &str) -> String {
    let trimmed = input.trim();

    let unfenced = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    };

    if is_complete_document(&unfenced) {
        unfenced
    } else {
        wrap_in_shell(&unfenced)
    }
}

/// Case-insensitive check for a leading doctype or root-element declaration.
fn is_complete_document(markup: &str) -> bool {
    let head: String = markup
        .chars()
        .take(16)
        .collect::<String>()
        .to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Wrap a fragment verbatim inside a minimal dark-theme document.
fn wrap_in_shell(fragment: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Research Paper Visualization</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            padding: 20px;
            background: #0a0e27;
            color: #eee;
            margin: 0;
        }}
        .container {{
            max-width: 1400px;
            margin: 0 auto;
        }}
    </style>
</head>
<body>
    <div class="container">
        {fragment}
    </div>
</body>
</html>"#
    )
}

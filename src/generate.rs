//! Visualization entry point: orchestrate the seven-stage pipeline.
//!
//! This is the one operation the surrounding system calls: cached facts in,
//! self-contained HTML plus a decision audit trail out. Stages run strictly
//! in sequence because each consumes the previous stage's output; every
//! stage before the final render is total (provider failures degrade to
//! deterministic fallbacks), so the only error a caller can see is
//! [`VizError::GenerationFailed`] from the render itself — or a
//! configuration problem before anything runs.

use crate::config::VizConfig;
use crate::error::VizError;
use crate::model::{RawCorpus, RenderedArtifact, StageSource, VizMetadata};
use crate::pipeline::{analyze, assemble, filter, practices, refine, render, select};
use crate::progress::Stage;
use crate::provider::{CapabilityProvider, DeepSeekProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Generate a visualization for `query` over the given papers' cached facts.
///
/// # Arguments
/// * `paper_ids` — papers included in this request; the analysis tiers key
///   on their count
/// * `query` — free-text visualization request
/// * `raw_corpus` — per-paper fact sets, as loaded from the fact store
/// * `config` — pipeline configuration
///
/// # Errors
/// * [`VizError::ProviderNotConfigured`] if no provider could be resolved
/// * [`VizError::GenerationFailed`] if the final render call failed after
///   both the streaming and non-streaming paths were exhausted
pub async fn generate(
    paper_ids: &[String],
    query: &str,
    raw_corpus: &RawCorpus,
    config: &VizConfig,
) -> Result<RenderedArtifact, VizError> {
    let provider = resolve_provider(config)?;
    let observer = config.observer();
    let paper_count = paper_ids.len();
    let mut fallback_stages: Vec<String> = Vec::new();

    info!(
        papers = paper_count,
        provider = provider.name(),
        "starting visualization pipeline"
    );

    // ── Stage 1: Analyze query ───────────────────────────────────────────
    observer.on_stage_start(Stage::Analyze);
    let (analysis, source) = analyze::analyze(&provider, query, paper_count).await;
    note_fallback(&mut fallback_stages, Stage::Analyze, source);
    observer.on_stage_complete(Stage::Analyze, source);
    debug!(intent = %analysis.intent, shape = %analysis.shape, "query analysed");

    // ── Stage 2: Generate best practices ─────────────────────────────────
    observer.on_stage_start(Stage::Practices);
    let (practice_list, source) = practices::generate(&provider, &analysis).await;
    note_fallback(&mut fallback_stages, Stage::Practices, source);
    observer.on_stage_complete(Stage::Practices, source);

    // ── Stage 3: Refine query ────────────────────────────────────────────
    observer.on_stage_start(Stage::Refine);
    let (refined, source) = refine::refine(&provider, query, &analysis, &practice_list).await;
    note_fallback(&mut fallback_stages, Stage::Refine, source);
    observer.on_stage_complete(Stage::Refine, source);

    // ── Stage 4: Select data ─────────────────────────────────────────────
    observer.on_stage_start(Stage::Select);
    let strategy = select::select(&analysis);
    observer.on_stage_complete(Stage::Select, StageSource::Provider);
    debug!(categories = strategy.categories.len(), "selection strategy built");

    // ── Stage 5: Filter data ─────────────────────────────────────────────
    observer.on_stage_start(Stage::Filter);
    let corpus = filter::filter(raw_corpus, &strategy);
    observer.on_stage_complete(Stage::Filter, StageSource::Provider);

    // ── Stage 6: Assemble prompt ─────────────────────────────────────────
    observer.on_stage_start(Stage::Assemble);
    let prompt = assemble::assemble(&refined, &practice_list, &corpus, &analysis);
    observer.on_stage_complete(Stage::Assemble, StageSource::Provider);
    debug!(prompt_chars = prompt.len(), "generation prompt assembled");

    // ── Stage 7: Render ──────────────────────────────────────────────────
    observer.on_stage_start(Stage::Render);
    let (markup, streamed) = render::render(&provider, &prompt, config)
        .await
        .map_err(|source| VizError::GenerationFailed { source })?;
    observer.on_stage_complete(Stage::Render, StageSource::Provider);
    observer.on_generation_complete(markup.len(), streamed);

    info!(
        chars = markup.len(),
        streamed,
        fallbacks = fallback_stages.len(),
        "visualization complete"
    );

    let metadata = VizMetadata {
        original_query: query.to_string(),
        refined_query: refined.refined.clone(),
        analysis: analysis.clone(),
        practices_applied: practice_list,
        categories_used: strategy.categories.clone(),
        priority_order: strategy.priority_order.clone(),
        paper_count,
        markup_length: markup.len(),
        streamed,
        fallback_stages,
    };

    Ok(RenderedArtifact { markup, metadata })
}

fn note_fallback(fallbacks: &mut Vec<String>, stage: Stage, source: StageSource) {
    if source == StageSource::Fallback {
        fallbacks.push(stage.name().to_string());
    }
}

/// Resolve the capability provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured it entirely; used as-is. This is how tests inject fakes.
/// 2. **Explicit API key** (`config.api_key`) — a DeepSeek provider is built
///    with the configured model and timeout.
/// 3. **Environment** (`DEEPSEEK_API_KEY`) — convenient for CLI use with no
///    other configuration.
pub fn resolve_provider(config: &VizConfig) -> Result<Arc<dyn CapabilityProvider>, VizError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let key_from_env = std::env::var("DEEPSEEK_API_KEY").ok();
    let api_key = config
        .api_key
        .clone()
        .or(key_from_env)
        .filter(|k| !k.is_empty());

    match api_key {
        Some(key) => Ok(Arc::new(
            DeepSeekProvider::with_model(key, &config.model)
                .with_request_timeout(Duration::from_secs(config.api_timeout_secs)),
        )),
        None => Err(VizError::ProviderNotConfigured {
            hint: "Set DEEPSEEK_API_KEY, pass an api_key in VizConfig, or inject a \
                   pre-built provider."
                .into(),
        }),
    }
}

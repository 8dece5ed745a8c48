//! Query refinement: rewrite the request into a denser specification.
//!
//! Invariant, on both paths: the refined text is strictly longer than the
//! original. The provider path enforces it by rejecting any answer that is
//! not longer; the fallback path holds it by construction because it only
//! ever appends sentences to the original.

use crate::model::{QueryAnalysis, RefinedQuery, StageSource, StyleGuidelines, VizShape};
use crate::prompts;
use crate::provider::{CapabilityProvider, Structured};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rewrite `original` using the analysis and practice list as context.
pub async fn refine(
    provider: &Arc<dyn CapabilityProvider>,
    original: &str,
    analysis: &QueryAnalysis,
    practices: &[String],
) -> (RefinedQuery, StageSource) {
    let prompt = prompts::refine_prompt(original, analysis, practices);

    match provider.complete_structured(&prompt, None).await {
        Ok(Structured::Parsed(value)) => match from_response(original, &value) {
            Some(refined) => {
                debug!(len = refined.refined.len(), "refined query from provider");
                (refined, StageSource::Provider)
            }
            None => {
                warn!("refinement response unusable, using deterministic fallback");
                (fallback_refine(original, analysis), StageSource::Fallback)
            }
        },
        Ok(Structured::Malformed { .. }) => {
            warn!("refinement response unparsable, using deterministic fallback");
            (fallback_refine(original, analysis), StageSource::Fallback)
        }
        Err(e) => {
            warn!(error = %e, "refinement call failed, using deterministic fallback");
            (fallback_refine(original, analysis), StageSource::Fallback)
        }
    }
}

/// Accept a provider answer only if it actually refines: non-empty and
/// strictly longer than the original.
fn from_response(original: &str, value: &Value) -> Option<RefinedQuery> {
    let refined = value.get("enhanced_query")?.as_str()?.trim().to_string();
    if refined.len() <= original.len() {
        return None;
    }

    let requirements = value
        .get("key_requirements")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let defaults = StyleGuidelines::default();
    let style = value.get("style_guidelines");
    let style_field = |key: &str, default: &str| {
        style
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    Some(RefinedQuery {
        original: original.to_string(),
        refined,
        requirements,
        style_guidelines: StyleGuidelines {
            layout: style_field("layout", &defaults.layout),
            colors: style_field("colors", &defaults.colors),
            typography: style_field("typography", &defaults.typography),
        },
    })
}

/// Deterministic refinement: append shape, filtering, and theme guidance to
/// the original query.
pub fn fallback_refine(original: &str, analysis: &QueryAnalysis) -> RefinedQuery {
    let mut parts: Vec<String> = vec![original.to_string()];

    match analysis.shape {
        VizShape::Table => parts.push(format!(
            "Present as a comparison table with papers as columns and {} as rows.",
            analysis.focus_areas.join(", ")
        )),
        VizShape::Cards => {
            parts.push("Display using a card-based grid layout with one card per paper.".into())
        }
        VizShape::Timeline => {
            parts.push("Arrange entries along a vertical timeline in chronological order.".into())
        }
        _ => {}
    }

    if analysis.paper_count > 3 {
        parts.push("Include filtering and search capabilities.".into());
    }

    parts.push("Use a modern dark theme with clear visual hierarchy.".into());

    RefinedQuery {
        original: original.to_string(),
        refined: parts.join(" "),
        requirements: vec![
            "Must be self-contained HTML".into(),
            "No external dependencies".into(),
            "Mobile responsive".into(),
        ],
        style_guidelines: StyleGuidelines::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complexity, Intent};
    use crate::provider::FakeProvider;

    fn analysis(shape: VizShape, papers: usize) -> QueryAnalysis {
        QueryAnalysis {
            intent: Intent::Summarize,
            focus_areas: vec!["contributions".into()],
            shape,
            complexity: Complexity::Medium,
            paper_count: papers,
            cross_paper_required: papers > 1,
        }
    }

    #[test]
    fn fallback_refined_is_strictly_longer() {
        for shape in [VizShape::Table, VizShape::Cards, VizShape::Graph] {
            for papers in [1, 4] {
                let q = fallback_refine("Show contributions", &analysis(shape, papers));
                assert!(
                    q.refined.len() > q.original.len(),
                    "shape {shape}, papers {papers}"
                );
            }
        }
    }

    #[test]
    fn fallback_adds_search_for_many_papers() {
        let q = fallback_refine("query", &analysis(VizShape::Cards, 5));
        assert!(q.refined.contains("filtering and search"));
        let q = fallback_refine("query", &analysis(VizShape::Cards, 2));
        assert!(!q.refined.contains("filtering and search"));
    }

    #[tokio::test]
    async fn provider_answer_accepted_when_longer() {
        let provider: Arc<dyn CapabilityProvider> = Arc::new(FakeProvider::always(
            r#"{"enhanced_query": "Display every contribution in a responsive card grid, one card per paper, sorted by impact.",
                "key_requirements": ["self-contained"],
                "style_guidelines": {"layout": "masonry grid"}}"#,
        ));
        let (q, source) = refine(&provider, "Show contributions", &analysis(VizShape::Cards, 1)).await;
        assert_eq!(source, StageSource::Provider);
        assert!(q.refined.len() > q.original.len());
        assert_eq!(q.style_guidelines.layout, "masonry grid");
        // Unspecified style fields keep their defaults.
        assert_eq!(q.style_guidelines.colors, StyleGuidelines::default().colors);
    }

    #[tokio::test]
    async fn short_provider_answer_rejected() {
        let provider: Arc<dyn CapabilityProvider> =
            Arc::new(FakeProvider::always(r#"{"enhanced_query": "ok"}"#));
        let original = "Show me all the contributions across papers";
        let (q, source) = refine(&provider, original, &analysis(VizShape::Cards, 1)).await;
        assert_eq!(source, StageSource::Fallback);
        assert!(q.refined.len() > original.len());
    }

    #[tokio::test]
    async fn dead_provider_falls_back_and_invariant_holds() {
        let provider: Arc<dyn CapabilityProvider> = Arc::new(FakeProvider::unreachable());
        let (q, source) = refine(&provider, "compare", &analysis(VizShape::Table, 2)).await;
        assert_eq!(source, StageSource::Fallback);
        assert!(q.refined.len() > q.original.len());
        assert!(q.refined.contains("comparison table"));
    }
}

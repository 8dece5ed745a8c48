//! Query analysis: classify a free-text visualization request.
//!
//! The primary path asks the provider for structured JSON. Any failure
//! (transport, auth, timeout, unparsable output) drops to a deterministic
//! keyword classifier, so this stage is total: it always produces a usable
//! [`QueryAnalysis`] and never surfaces an error.

use crate::model::{Complexity, Intent, QueryAnalysis, StageSource, VizShape};
use crate::prompts;
use crate::provider::{CapabilityProvider, Structured};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyword cues for each fact category, used by the fallback classifier.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("contributions", &["contribution", "innovation", "novelty", "propose"]),
    ("experiments", &["experiment", "result", "performance", "evaluation"]),
    ("architectures", &["architecture", "model", "network", "structure"]),
    ("training", &["training", "optimization", "learning"]),
    ("hyperparameters", &["hyperparameter", "learning rate", "batch size"]),
    ("baselines", &["baseline", "comparison", "prior work"]),
    ("datasets", &["dataset", "benchmark", "data"]),
    ("limitations", &["limitation", "weakness", "drawback"]),
];

/// Focus areas assumed when the query names nothing recognisable.
const DEFAULT_FOCUS: &[&str] = &["contributions", "experiments", "architectures"];

/// Classify `query` into intent, focus areas, shape, and complexity.
pub async fn analyze(
    provider: &Arc<dyn CapabilityProvider>,
    query: &str,
    paper_count: usize,
) -> (QueryAnalysis, StageSource) {
    let prompt = prompts::analysis_prompt(query, paper_count);

    match provider.complete_structured(&prompt, None).await {
        Ok(Structured::Parsed(value)) if usable(&value) => {
            debug!("query analysis from provider");
            (from_response(&value, paper_count), StageSource::Provider)
        }
        Ok(Structured::Parsed(_)) | Ok(Structured::Malformed { .. }) => {
            warn!("query analysis response unusable, using keyword fallback");
            (fallback_analysis(query, paper_count), StageSource::Fallback)
        }
        Err(e) => {
            warn!(error = %e, "query analysis call failed, using keyword fallback");
            (fallback_analysis(query, paper_count), StageSource::Fallback)
        }
    }
}

/// A response is usable if it is an object without an error marker.
fn usable(value: &Value) -> bool {
    value.as_object().is_some_and(|o| !o.contains_key("error"))
}

/// Build an analysis from a parsed provider response, default-filling any
/// missing or unrecognised field.
fn from_response(value: &Value, paper_count: usize) -> QueryAnalysis {
    let str_field = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default();

    let focus_areas = value
        .get("focus_areas")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    QueryAnalysis {
        intent: Intent::parse_lenient(str_field("intent")),
        focus_areas,
        shape: VizShape::parse_lenient(str_field("visualization_type")),
        complexity: Complexity::parse_lenient(str_field("complexity")),
        paper_count,
        cross_paper_required: value
            .get("requires_cross_paper_analysis")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Deterministic keyword classifier. Total: never fails, never empty.
pub fn fallback_analysis(query: &str, paper_count: usize) -> QueryAnalysis {
    let q = query.to_lowercase();

    let intent = if ["compare", "versus", "vs", "difference"].iter().any(|w| q.contains(w)) {
        Intent::Compare
    } else if ["timeline", "evolution", "over time"].iter().any(|w| q.contains(w)) {
        Intent::Timeline
    } else if ["cluster", "group", "categorize"].iter().any(|w| q.contains(w)) {
        Intent::Cluster
    } else if ["all", "show", "list"].iter().any(|w| q.contains(w)) {
        Intent::Summarize
    } else {
        Intent::Explore
    };

    let mut focus_areas: Vec<String> = CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| q.contains(kw)))
        .map(|(category, _)| category.to_string())
        .collect();

    if focus_areas.is_empty() {
        focus_areas = DEFAULT_FOCUS.iter().map(|s| s.to_string()).collect();
    }

    QueryAnalysis {
        intent,
        focus_areas,
        shape: if intent == Intent::Compare {
            VizShape::Table
        } else {
            VizShape::Cards
        },
        complexity: Complexity::Medium,
        paper_count,
        cross_paper_required: paper_count > 1,
    }
}

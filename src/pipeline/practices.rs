//! Practice generation: presentation guidelines tailored to the analysis.
//!
//! Primary path asks the provider for 5-10 actionable guidelines. The
//! rule-table fallback fires on any provider failure and also when the
//! provider returns fewer than [`MIN_PRACTICES`] items; its output is never
//! empty because a universal set is always appended.

use crate::model::{Intent, QueryAnalysis, StageSource, VizShape};
use crate::prompts;
use crate::provider::{CapabilityProvider, Structured};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Below this count a provider answer is considered unusable.
const MIN_PRACTICES: usize = 3;

/// Derive an ordered list of presentation guidelines for `analysis`.
pub async fn generate(
    provider: &Arc<dyn CapabilityProvider>,
    analysis: &QueryAnalysis,
) -> (Vec<String>, StageSource) {
    let prompt = prompts::practices_prompt(analysis);

    match provider.complete_structured(&prompt, None).await {
        Ok(Structured::Parsed(value)) => {
            let practices = practices_from_response(&value);
            if practices.len() >= MIN_PRACTICES {
                debug!(count = practices.len(), "practices from provider");
                return (practices, StageSource::Provider);
            }
            warn!(
                count = practices.len(),
                "provider returned too few practices, using rule table"
            );
            (fallback_practices(analysis), StageSource::Fallback)
        }
        Ok(Structured::Malformed { .. }) => {
            warn!("practices response unparsable, using rule table");
            (fallback_practices(analysis), StageSource::Fallback)
        }
        Err(e) => {
            warn!(error = %e, "practices call failed, using rule table");
            (fallback_practices(analysis), StageSource::Fallback)
        }
    }
}

fn practices_from_response(value: &Value) -> Vec<String> {
    value
        .get("best_practices")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Rule-table fallback keyed on analysis fields. Never empty: the universal
/// guidelines are always appended.
pub fn fallback_practices(analysis: &QueryAnalysis) -> Vec<String> {
    let mut practices: Vec<String> = Vec::new();

    if analysis.intent == Intent::Compare {
        practices.extend(
            [
                "Use a side-by-side comparison layout with aligned attributes",
                "Highlight differences with color coding (red for worse, green for better)",
                "Include a summary section at the top showing key differences",
                "Use consistent ordering across all papers",
            ]
            .map(String::from),
        );
    }

    if analysis.paper_count > 5 {
        practices.push("Implement collapsible sections to manage information density".into());
        practices.push("Add a table of contents or navigation for quick access".into());
    }

    if analysis.focus_areas.iter().any(|f| f == "experiments") {
        practices.extend(
            [
                "Show baseline comparisons with clear performance deltas",
                "Group experiments by type (main vs ablation)",
                "Include dataset and metric information prominently",
            ]
            .map(String::from),
        );
    }

    if analysis.shape == VizShape::Table {
        practices.extend(
            [
                "Use sticky headers for scrollable tables",
                "Add alternating row colors for readability",
                "Make columns sortable if possible",
            ]
            .map(String::from),
        );
    }

    practices.extend(
        [
            "Use a clear visual hierarchy with proper heading levels",
            "Implement hover effects for interactive elements",
            "Ensure responsive design that works at different viewport sizes",
        ]
        .map(String::from),
    );

    practices
}

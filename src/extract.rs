//! Generic fact extraction: one data-driven extractor for every category.
//!
//! The per-category variation is a table of [`CategorySpec`] rows — name plus
//! an instruction block describing the JSON records to produce — rather than
//! one hand-written extractor type per category. Adding a category means
//! adding a row.
//!
//! Response unwrapping is defensive: models return a bare array, an object
//! wrapped under the category's key, an object with some other array value,
//! or an error-shaped mapping. The first three yield facts; the last (and
//! unparsable output) yields an empty list with a warning. Only transport
//! failures propagate.

use crate::config::VizConfig;
use crate::error::VizError;
use crate::model::PaperText;
use crate::prompts;
use crate::provider::{CapabilityProvider, Structured};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One row of the extraction table.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    /// Category name; also the key the response may be wrapped under and the
    /// file stem in the fact store.
    pub name: &'static str,
    /// Instruction block inserted into the extraction prompt.
    pub instructions: &'static str,
}

/// Every extraction category, in store order.
pub const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        name: "contributions",
        instructions: r#"Return a JSON array of the paper's primary technical contributions. Each record:
- "contribution_type": a short category phrase (e.g. "Novel Architecture", "Training Procedure", "Loss Function"). Define new categories as needed.
- "specific_innovation": one sentence describing the new component.
- "problem_addressed": the specific issue this contribution solves.
- "evidence_location": the section where it is introduced.
- "comment": optional remark, may be empty."#,
    },
    CategorySpec {
        name: "experiments",
        instructions: r#"Return a JSON array of the experiments performed. Each record:
- "name": short experiment name.
- "task": the task being evaluated.
- "datasets": array of dataset names used.
- "baselines": array of {"name", "performance"} records.
- "metrics": array of evaluation metric names.
- "results": object mapping metric to reported value.
- "conclusion": one sentence on the outcome.
- "evidence_location": section or table reference."#,
    },
    CategorySpec {
        name: "architectures",
        instructions: r#"Return a JSON array of model architectures described. Each record:
- "name": architecture name.
- "components": array of major component names.
- "input_representation": how inputs are encoded.
- "novel_elements": what distinguishes it from prior architectures.
- "evidence_location": section reference."#,
    },
    CategorySpec {
        name: "hyperparameters",
        instructions: r#"Return a JSON array of hyperparameter settings reported. Each record:
- "name": hyperparameter name (e.g. "learning rate", "batch size").
- "value": reported value as a string.
- "context": which model or experiment it applies to.
- "evidence_location": section or table reference."#,
    },
    CategorySpec {
        name: "ablations",
        instructions: r#"Return a JSON array of ablation studies. Each record:
- "component": the component removed or varied.
- "impact": measured effect of the ablation.
- "conclusion": what the authors infer.
- "evidence_location": section or table reference."#,
    },
    CategorySpec {
        name: "baselines",
        instructions: r#"Return a JSON array of baseline methods compared against. Each record:
- "name": baseline name.
- "source": citation or origin of the baseline.
- "performance": reported baseline performance, as a string.
- "compared_on": dataset or task of the comparison."#,
    },
    CategorySpec {
        name: "datasets",
        instructions: r#"Return a JSON array of datasets used or introduced. Each record:
- "name": dataset name.
- "role": "training", "evaluation", or "both".
- "size": reported size, as a string.
- "is_new": true when the paper introduces the dataset."#,
    },
    CategorySpec {
        name: "algorithms",
        instructions: r#"Return a JSON array of algorithms presented. Each record:
- "name": algorithm name.
- "purpose": what it computes or decides.
- "novelty": what is new relative to prior algorithms.
- "evidence_location": algorithm listing or section reference."#,
    },
    CategorySpec {
        name: "equations",
        instructions: r#"Return a JSON array of key equations. Each record:
- "latex": the equation in LaTeX.
- "meaning": one-sentence plain-language description.
- "evidence_location": equation number or section."#,
    },
    CategorySpec {
        name: "training",
        instructions: r#"Return a JSON array of training procedures described. Each record:
- "procedure": short name of the procedure.
- "optimizer": optimizer used.
- "schedule": learning-rate schedule or curriculum, if any.
- "hardware": reported training hardware, if any.
- "duration": reported training time or steps, if any."#,
    },
    CategorySpec {
        name: "metrics",
        instructions: r#"Return a JSON array of evaluation metrics used. Each record:
- "name": metric name.
- "definition": what it measures.
- "direction": "higher_better" or "lower_better"."#,
    },
    CategorySpec {
        name: "loss_functions",
        instructions: r#"Return a JSON array of loss functions used or introduced. Each record:
- "name": loss name.
- "formulation": LaTeX or plain-text formulation, if given.
- "purpose": what behaviour the loss encourages.
- "is_new": true when the paper introduces it."#,
    },
    CategorySpec {
        name: "limitations",
        instructions: r#"Return a JSON array of limitations the authors acknowledge. Each record:
- "limitation": one-sentence statement.
- "severity": "minor", "moderate", or "major" as you judge it.
- "evidence_location": section reference."#,
    },
    CategorySpec {
        name: "future_work",
        instructions: r#"Return a JSON array of future-work directions mentioned. Each record:
- "direction": one-sentence statement.
- "motivation": why the authors consider it promising."#,
    },
    CategorySpec {
        name: "related_work",
        instructions: r#"Return a JSON array of the most relevant related works discussed. Each record:
- "reference": short citation string.
- "relationship": how this paper relates to it (extends, contrasts, uses)."#,
    },
    CategorySpec {
        name: "claims",
        instructions: r#"Return a JSON array of the paper's central claims. Each record:
- "claim": one-sentence statement.
- "support": the evidence offered (experiment, proof, argument).
- "evidence_location": section reference."#,
    },
    CategorySpec {
        name: "code_resources",
        instructions: r#"Return a JSON array of code and resource releases mentioned. Each record:
- "resource": what is released (code, models, data).
- "location": URL or reference as printed in the paper."#,
    },
];

/// Look up a category by name.
pub fn category_spec(name: &str) -> Option<&'static CategorySpec> {
    CATEGORIES.iter().find(|spec| spec.name == name)
}

/// Names of all known categories.
pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|spec| spec.name).collect()
}

/// Extract one category of facts from one paper.
///
/// Malformed or error-shaped responses yield `Ok(vec![])`; only transport
/// failures return `Err`.
pub async fn extract(
    provider: &Arc<dyn CapabilityProvider>,
    spec: &CategorySpec,
    paper: &PaperText,
    config: &VizConfig,
) -> Result<Vec<Value>, VizError> {
    let body = truncate_chars(&paper.body, config.max_paper_chars);
    let prompt = prompts::extraction_prompt(
        spec.name,
        spec.instructions,
        &paper.title,
        &paper.abstract_text,
        body,
    );

    info!(category = spec.name, paper = %paper.paper_id, "extracting");

    let structured = provider
        .complete_structured(&prompt, Some(prompts::EXTRACTION_SYSTEM_PROMPT))
        .await
        .map_err(|source| VizError::ExtractionFailed {
            category: spec.name.to_string(),
            source,
        })?;

    match structured {
        Structured::Parsed(value) => {
            let facts = unwrap_fact_list(spec, value);
            debug!(category = spec.name, count = facts.len(), "extraction done");
            Ok(facts)
        }
        Structured::Malformed { raw } => {
            warn!(
                category = spec.name,
                preview = raw.chars().take(80).collect::<String>(),
                "extraction response unparsable, keeping empty list"
            );
            Ok(Vec::new())
        }
    }
}

/// Extract several categories from one paper, in table order.
pub async fn extract_all(
    provider: &Arc<dyn CapabilityProvider>,
    categories: &[&str],
    paper: &PaperText,
    config: &VizConfig,
) -> Result<BTreeMap<String, Vec<Value>>, VizError> {
    let mut results = BTreeMap::new();
    for spec in CATEGORIES {
        if !categories.contains(&spec.name) {
            continue;
        }
        let facts = extract(provider, spec, paper, config).await?;
        results.insert(spec.name.to_string(), facts);
    }
    Ok(results)
}

/// Cut to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pull the fact list out of whatever shape the model chose.
fn unwrap_fact_list(spec: &CategorySpec, value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            if map.contains_key("error") {
                warn!(category = spec.name, "provider returned an error mapping");
                return Vec::new();
            }
            if let Some(Value::Array(items)) = map.get(spec.name) {
                return items.clone();
            }
            // Otherwise take the first array-valued field.
            map.into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

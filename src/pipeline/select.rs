//! Data selection: which categories to include, how many items each, and in
//! what priority order.
//!
//! Pure and fully deterministic: no provider call, same analysis in, same
//! strategy out. The per-category caps come in three tiers keyed on paper
//! count: a single paper shows essentially everything, a handful of papers
//! gets generous caps, and larger sets get tight caps so the assembled
//! prompt stays within the generation model's working budget.

use crate::model::{QueryAnalysis, SelectionStrategy};
use std::collections::BTreeMap;

/// Cap used for "show everything" entries and for categories outside the
/// built-in tables.
pub const UNLIMITED: usize = 999;

/// Categories implied by the presence of another category.
const IMPLIED: &[(&str, &[&str])] = &[
    ("experiments", &["baselines", "datasets", "metrics"]),
    ("architectures", &["hyperparameters"]),
];

/// Categories used when the analysis names none.
const DEFAULT_CATEGORIES: &[&str] = &[
    "contributions",
    "experiments",
    "architectures",
    "datasets",
    "baselines",
];

/// Single paper: show everything, with mild caps on the noisiest categories.
const LIMITS_SINGLE: &[(&str, usize)] = &[
    ("contributions", UNLIMITED),
    ("experiments", UNLIMITED),
    ("architectures", UNLIMITED),
    ("hyperparameters", UNLIMITED),
    ("ablations", UNLIMITED),
    ("baselines", UNLIMITED),
    ("datasets", UNLIMITED),
    ("algorithms", UNLIMITED),
    ("equations", 50),
    ("training", UNLIMITED),
    ("metrics", UNLIMITED),
    ("loss_functions", UNLIMITED),
    ("limitations", UNLIMITED),
    ("future_work", UNLIMITED),
    ("related_work", 20),
    ("claims", 20),
    ("code_resources", UNLIMITED),
];

/// Two or three papers: generous caps.
const LIMITS_FEW: &[(&str, usize)] = &[
    ("contributions", 10),
    ("experiments", 15),
    ("architectures", 5),
    ("hyperparameters", 5),
    ("ablations", 10),
    ("baselines", 15),
    ("datasets", 10),
    ("algorithms", 5),
    ("equations", 20),
    ("training", 5),
    ("metrics", 15),
    ("loss_functions", 10),
    ("limitations", 10),
    ("future_work", 10),
    ("related_work", 10),
    ("claims", 10),
    ("code_resources", 10),
];

/// More than three papers: tight caps.
const LIMITS_MANY: &[(&str, usize)] = &[
    ("contributions", 5),
    ("experiments", 8),
    ("architectures", 3),
    ("hyperparameters", 3),
    ("ablations", 5),
    ("baselines", 10),
    ("datasets", 8),
    ("algorithms", 3),
    ("equations", 10),
    ("training", 3),
    ("metrics", 10),
    ("loss_functions", 5),
    ("limitations", 5),
    ("future_work", 5),
    ("related_work", 5),
    ("claims", 5),
    ("code_resources", 5),
];

/// Decide the selection strategy for `analysis`.
pub fn select(analysis: &QueryAnalysis) -> SelectionStrategy {
    // Dedup focus areas, keeping first-mention order.
    let mut categories: Vec<String> = Vec::new();
    for focus in &analysis.focus_areas {
        if !categories.contains(focus) {
            categories.push(focus.clone());
        }
    }

    // Implication rules: add missing related categories.
    for (trigger, implied) in IMPLIED {
        if categories.iter().any(|c| c == trigger) {
            for implied_cat in *implied {
                if !categories.iter().any(|c| c == implied_cat) {
                    categories.push(implied_cat.to_string());
                }
            }
        }
    }

    if categories.is_empty() {
        categories = DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect();
    }

    let tier = if analysis.paper_count <= 1 {
        LIMITS_SINGLE
    } else if analysis.paper_count <= 3 {
        LIMITS_FEW
    } else {
        LIMITS_MANY
    };
    let per_category_limit: BTreeMap<String, usize> = tier
        .iter()
        .map(|(name, limit)| (name.to_string(), *limit))
        .collect();

    // Focus areas first, everything else after; relative order preserved on
    // both sides.
    let mut priority_order: Vec<String> = Vec::with_capacity(categories.len());
    for cat in &categories {
        if analysis.focus_areas.contains(cat) {
            priority_order.push(cat.clone());
        }
    }
    for cat in &categories {
        if !priority_order.contains(cat) {
            priority_order.push(cat.clone());
        }
    }

    SelectionStrategy {
        categories,
        per_category_limit,
        priority_order,
        metadata_included: true,
        cross_references_included: analysis.cross_paper_required && analysis.paper_count > 1,
    }
}

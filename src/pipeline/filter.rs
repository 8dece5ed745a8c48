//! Data filtering: apply the selection strategy to raw per-paper facts.
//!
//! Sequence-valued categories are truncated to their cap (first N items,
//! original order) and annotated with a single overflow note when items were
//! dropped. Scalar values pass through untouched. When cross-references are
//! requested and more than one paper is present, a synthetic
//! `_cross_paper_insights` entry carries aggregate statistics.
//!
//! All aggregations are order-independent; papers are visited in sorted-id
//! order and ties broken by first encounter, so the output is deterministic
//! for a given corpus.

use crate::model::{FilteredCorpus, RawCorpus, SelectionStrategy};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Key of the synthetic aggregate entry in the filtered corpus.
pub const CROSS_PAPER_KEY: &str = "_cross_paper_insights";

/// Apply `strategy` to `raw`, producing the corpus the prompt assembler
/// serialises. The strategy already encodes every decision the analysis
/// contributed, so this stage needs nothing else.
pub fn filter(raw: &RawCorpus, strategy: &SelectionStrategy) -> FilteredCorpus {
    let mut filtered = FilteredCorpus::new();

    for (paper_id, paper_data) in raw {
        let mut paper_out = Map::new();

        // Identity fields travel with the paper.
        if let Some(identity) = paper_data.get("paper") {
            paper_out.insert("paper".into(), identity.clone());
        }
        if strategy.metadata_included {
            paper_out.insert(
                "_metadata".into(),
                json!({
                    "paper_id": paper_id,
                    "selected_categories": strategy.categories,
                }),
            );
        }

        for category in &strategy.categories {
            let Some(data) = paper_data.get(category) else {
                continue;
            };
            if data.is_null() {
                continue;
            }

            match data {
                Value::Array(items) if items.is_empty() => {}
                Value::Array(items) => {
                    let limit = strategy.limit_for(category);
                    let mut kept: Vec<Value> = items.iter().take(limit).cloned().collect();
                    if items.len() > limit {
                        kept.push(json!({
                            "_note": format!("Showing {} of {} total items", limit, items.len()),
                        }));
                    }
                    paper_out.insert(category.clone(), Value::Array(kept));
                }
                scalar => {
                    paper_out.insert(category.clone(), scalar.clone());
                }
            }
        }

        filtered.insert(paper_id.clone(), Value::Object(paper_out));
    }

    if strategy.cross_references_included && paper_count(&filtered) > 1 {
        let insights = cross_paper_insights(&filtered, strategy);
        filtered.insert(CROSS_PAPER_KEY.into(), Value::Object(insights));
    }

    filtered
}

fn paper_count(filtered: &FilteredCorpus) -> usize {
    filtered.keys().filter(|k| !k.starts_with('_')).count()
}

/// Aggregate statistics across the filtered papers.
///
/// `common_datasets`: dataset names used by more than one paper, sorted by
/// paper count descending (ties by first encounter), top 10.
/// `contribution_distribution`: histogram of contribution-type strings,
/// present only when "contributions" is a selected category.
fn cross_paper_insights(
    filtered: &FilteredCorpus,
    strategy: &SelectionStrategy,
) -> Map<String, Value> {
    let mut insights = Map::new();

    // ── Common datasets ──────────────────────────────────────────────────
    // One vote per paper: a paper listing the same dataset twice still
    // counts once, so `paper_count` is the number of distinct papers.
    let mut dataset_names: Vec<String> = Vec::new();
    for (paper_id, paper_data) in filtered {
        if paper_id.starts_with('_') {
            continue;
        }
        let Some(datasets) = paper_data.get("datasets").and_then(Value::as_array) else {
            continue;
        };
        let mut in_this_paper: Vec<String> = Vec::new();
        for entry in datasets {
            let name = match entry {
                Value::Object(o) => match o.get("name").and_then(Value::as_str) {
                    Some(name) => name.to_string(),
                    None => continue,
                },
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !in_this_paper.contains(&name) {
                in_this_paper.push(name);
            }
        }
        dataset_names.extend(in_this_paper);
    }

    if !dataset_names.is_empty() {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new(); // name -> (count, first_seen)
        for (i, name) in dataset_names.iter().enumerate() {
            let entry = counts.entry(name).or_insert((0, i));
            entry.0 += 1;
        }
        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(name, (count, first))| (name, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let common: Vec<Value> = ranked
            .into_iter()
            .filter(|(_, count, _)| *count > 1)
            .take(10)
            .map(|(name, count, _)| json!({ "name": name, "paper_count": count }))
            .collect();
        insights.insert("common_datasets".into(), Value::Array(common));
    }

    // ── Contribution-type distribution ───────────────────────────────────
    if strategy.categories.iter().any(|c| c == "contributions") {
        let mut types: Vec<String> = Vec::new();
        for (paper_id, paper_data) in filtered {
            if paper_id.starts_with('_') {
                continue;
            }
            let Some(contribs) = paper_data.get("contributions").and_then(Value::as_array) else {
                continue;
            };
            for c in contribs {
                if let Some(obj) = c.as_object() {
                    if obj.contains_key("_note") {
                        continue;
                    }
                    let t = obj
                        .get("contribution_type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    types.push(t.to_string());
                }
            }
        }

        if !types.is_empty() {
            let mut histogram: Map<String, Value> = Map::new();
            for t in &types {
                let count = histogram.get(t).and_then(Value::as_u64).unwrap_or(0);
                histogram.insert(t.clone(), json!(count + 1));
            }
            insights.insert("contribution_distribution".into(), Value::Object(histogram));
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complexity, Intent, QueryAnalysis, VizShape};
    use crate::pipeline::select;

    fn analysis(focus: &[&str], papers: usize, cross: bool) -> QueryAnalysis {
        QueryAnalysis {
            intent: Intent::Summarize,
            focus_areas: focus.iter().map(|s| s.to_string()).collect(),
            shape: VizShape::Cards,
            complexity: Complexity::Medium,
            paper_count: papers,
            cross_paper_required: cross,
        }
    }

    fn paper_with_items(n: usize) -> Value {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({"contribution_type": "method", "idx": i}))
            .collect();
        json!({
            "paper": {"title": "Paper"},
            "contributions": items,
        })
    }

    #[test]
    fn truncation_law() {
        // n items, limit L: min(n, L) originals plus one note iff n > L.
        let a = analysis(&["contributions"], 5, false);
        let strategy = select::select(&a); // many-papers tier: contributions cap 5
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), paper_with_items(9));

        let filtered = filter(&raw, &strategy);
        let contribs = filtered["p1"]["contributions"].as_array().unwrap();
        assert_eq!(contribs.len(), 5 + 1);
        assert_eq!(contribs[0]["idx"], 0);
        assert_eq!(contribs[4]["idx"], 4);
        assert_eq!(
            contribs[5]["_note"],
            json!("Showing 5 of 9 total items")
        );
    }

    #[test]
    fn no_note_when_under_limit() {
        let a = analysis(&["contributions"], 5, false);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), paper_with_items(3));

        let filtered = filter(&raw, &strategy);
        let contribs = filtered["p1"]["contributions"].as_array().unwrap();
        assert_eq!(contribs.len(), 3);
        assert!(contribs.iter().all(|c| c.get("_note").is_none()));
    }

    #[test]
    fn scalar_category_passes_through() {
        let a = analysis(&["training"], 1, false);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert(
            "p1".into(),
            json!({"training": {"optimizer": "AdamW", "epochs": 90}}),
        );

        let filtered = filter(&raw, &strategy);
        assert_eq!(filtered["p1"]["training"]["optimizer"], "AdamW");
    }

    #[test]
    fn metadata_lists_selected_categories() {
        let a = analysis(&["datasets"], 1, false);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), json!({"datasets": ["x"]}));

        let filtered = filter(&raw, &strategy);
        assert_eq!(filtered["p1"]["_metadata"]["paper_id"], "p1");
        assert!(filtered["p1"]["_metadata"]["selected_categories"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c == "datasets"));
    }

    #[test]
    fn cross_paper_insight_law() {
        let a = analysis(&["datasets"], 3, true);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert(
            "p1".into(),
            json!({"datasets": [{"name": "ImageNet"}, {"name": "CIFAR-10"}]}),
        );
        raw.insert("p2".into(), json!({"datasets": [{"name": "ImageNet"}]}));
        raw.insert(
            "p3".into(),
            json!({"datasets": [{"name": "ImageNet"}, {"name": "MNIST"}]}),
        );

        let filtered = filter(&raw, &strategy);
        let common = filtered[CROSS_PAPER_KEY]["common_datasets"].as_array().unwrap();

        // ImageNet appears in 3 papers; CIFAR-10 and MNIST in exactly one
        // paper each must not appear.
        assert_eq!(common.len(), 1);
        assert_eq!(common[0]["name"], "ImageNet");
        assert_eq!(common[0]["paper_count"], 3);
    }

    #[test]
    fn string_dataset_entries_count_too() {
        let a = analysis(&["datasets"], 2, true);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), json!({"datasets": ["GLUE"]}));
        raw.insert("p2".into(), json!({"datasets": ["GLUE"]}));

        let filtered = filter(&raw, &strategy);
        let common = filtered[CROSS_PAPER_KEY]["common_datasets"].as_array().unwrap();
        assert_eq!(common[0], json!({"name": "GLUE", "paper_count": 2}));
    }

    #[test]
    fn duplicate_listing_within_one_paper_counts_once() {
        let a = analysis(&["datasets"], 2, true);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        // p1 lists SQuAD twice; still only one paper uses it.
        raw.insert(
            "p1".into(),
            json!({"datasets": [{"name": "SQuAD"}, {"name": "SQuAD"}]}),
        );
        raw.insert("p2".into(), json!({"datasets": [{"name": "HotpotQA"}]}));

        let filtered = filter(&raw, &strategy);
        let common = filtered[CROSS_PAPER_KEY]["common_datasets"].as_array().unwrap();
        assert!(common.is_empty());
    }

    #[test]
    fn contribution_histogram_when_selected() {
        let a = analysis(&["contributions", "datasets"], 2, true);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert(
            "p1".into(),
            json!({"contributions": [
                {"contribution_type": "architecture"},
                {"contribution_type": "loss_function"},
            ]}),
        );
        raw.insert(
            "p2".into(),
            json!({"contributions": [{"contribution_type": "architecture"}]}),
        );

        let filtered = filter(&raw, &strategy);
        let dist = &filtered[CROSS_PAPER_KEY]["contribution_distribution"];
        assert_eq!(dist["architecture"], 2);
        assert_eq!(dist["loss_function"], 1);
    }

    #[test]
    fn no_insights_for_single_paper() {
        let a = analysis(&["datasets"], 1, true);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), json!({"datasets": ["ImageNet"]}));

        let filtered = filter(&raw, &strategy);
        assert!(!filtered.contains_key(CROSS_PAPER_KEY));
    }

    #[test]
    fn no_insights_without_cross_reference_flag() {
        let a = analysis(&["datasets"], 2, false);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), json!({"datasets": ["A"]}));
        raw.insert("p2".into(), json!({"datasets": ["A"]}));

        let filtered = filter(&raw, &strategy);
        assert!(!filtered.contains_key(CROSS_PAPER_KEY));
    }

    #[test]
    fn absent_and_null_categories_are_skipped() {
        let a = analysis(&["contributions", "datasets"], 1, false);
        let strategy = select::select(&a);
        let mut raw = RawCorpus::new();
        raw.insert("p1".into(), json!({"datasets": null}));

        let filtered = filter(&raw, &strategy);
        let paper = filtered["p1"].as_object().unwrap();
        assert!(!paper.contains_key("datasets"));
        assert!(!paper.contains_key("contributions"));
    }
}

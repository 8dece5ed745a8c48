//! Data model for the visualization pipeline.
//!
//! Every type here is request-scoped: created fresh for one visualization
//! request, handed from stage to stage by value or shared reference, and
//! discarded once the [`RenderedArtifact`] is returned. Nothing mutates
//! across requests.
//!
//! Enum parsing from provider JSON is deliberately permissive: an unknown
//! `intent` or `visualization_type` string falls back to the default variant
//! instead of rejecting the whole analysis. A sloppy-but-usable provider
//! answer beats a round-trip through the keyword fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Raw per-paper fact sets keyed by paper id, as loaded from the fact store.
///
/// Each paper value is a JSON object mapping category names to extracted
/// data (usually arrays of fact records, occasionally scalars). The pipeline
/// treats fact records as opaque. `BTreeMap` keeps paper iteration order
/// stable, which the cross-paper tie-break rules rely on.
pub type RawCorpus = BTreeMap<String, Value>;

/// Filtered, truncated, annotated corpus ready for prompt assembly.
///
/// Paper ids map to filtered records; a synthetic `_cross_paper_insights`
/// entry is present when cross-references were requested and more than one
/// paper was involved. `serde_json::Map` serialises with sorted keys, so the
/// assembled prompt is byte-deterministic.
pub type FilteredCorpus = serde_json::Map<String, Value>;

// ── Query analysis ───────────────────────────────────────────────────────

/// What the user wants the visualization to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Compare,
    #[default]
    Summarize,
    Explore,
    Timeline,
    Cluster,
    Filter,
    Detail,
}

impl Intent {
    /// Parse a provider-supplied string, defaulting on anything unknown.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "compare" => Intent::Compare,
            "summarize" | "summarise" => Intent::Summarize,
            "explore" => Intent::Explore,
            "timeline" => Intent::Timeline,
            "cluster" => Intent::Cluster,
            "filter" => Intent::Filter,
            "detail" => Intent::Detail,
            _ => Intent::default(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intent::Compare => "compare",
            Intent::Summarize => "summarize",
            Intent::Explore => "explore",
            Intent::Timeline => "timeline",
            Intent::Cluster => "cluster",
            Intent::Filter => "filter",
            Intent::Detail => "detail",
        };
        f.write_str(s)
    }
}

/// Overall shape of the generated visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizShape {
    Table,
    #[default]
    Cards,
    Timeline,
    Graph,
    Matrix,
    List,
    DetailView,
}

impl VizShape {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "table" => VizShape::Table,
            "cards" => VizShape::Cards,
            "timeline" => VizShape::Timeline,
            "graph" => VizShape::Graph,
            "matrix" => VizShape::Matrix,
            "list" => VizShape::List,
            "detail_view" | "detail" => VizShape::DetailView,
            _ => VizShape::default(),
        }
    }
}

impl fmt::Display for VizShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VizShape::Table => "table",
            VizShape::Cards => "cards",
            VizShape::Timeline => "timeline",
            VizShape::Graph => "graph",
            VizShape::Matrix => "matrix",
            VizShape::List => "list",
            VizShape::DetailView => "detail_view",
        };
        f.write_str(s)
    }
}

/// How involved the visualization needs to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "simple" => Complexity::Simple,
            "medium" => Complexity::Medium,
            "complex" => Complexity::Complex,
            _ => Complexity::default(),
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        };
        f.write_str(s)
    }
}

/// Structured understanding of a free-text visualization request.
///
/// Produced once per request by the query analyzer and treated as immutable
/// by every later stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    /// Fact categories the user cares about, in mention order. Free-form
    /// strings: the provider may name categories beyond the built-in table.
    pub focus_areas: Vec<String>,
    pub shape: VizShape,
    pub complexity: Complexity,
    pub paper_count: usize,
    pub cross_paper_required: bool,
}

// ── Refined query ────────────────────────────────────────────────────────

/// Style directions for the generated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleGuidelines {
    pub layout: String,
    pub colors: String,
    pub typography: String,
}

impl Default for StyleGuidelines {
    fn default() -> Self {
        Self {
            layout: "grid-based with proper spacing".into(),
            colors: "dark theme with accent colors".into(),
            typography: "system fonts, clear hierarchy".into(),
        }
    }
}

/// The user's request rewritten into a denser, designer-ready specification.
///
/// Invariant: `refined` is strictly longer than `original`, on both the
/// provider path and the deterministic fallback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedQuery {
    pub original: String,
    pub refined: String,
    pub requirements: Vec<String>,
    pub style_guidelines: StyleGuidelines,
}

// ── Selection strategy ───────────────────────────────────────────────────

/// Which categories to include, how many items each, and in what order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionStrategy {
    /// Deduplicated focus areas plus implied categories.
    pub categories: Vec<String>,
    /// Per-category item caps for the active paper-count tier.
    pub per_category_limit: BTreeMap<String, usize>,
    /// `categories` reordered so the user's focus areas come first.
    pub priority_order: Vec<String>,
    pub metadata_included: bool,
    pub cross_references_included: bool,
}

impl SelectionStrategy {
    /// Item cap for a category, falling back to the unlimited-tier value for
    /// categories outside the built-in table.
    pub fn limit_for(&self, category: &str) -> usize {
        self.per_category_limit
            .get(category)
            .copied()
            .unwrap_or(crate::pipeline::select::UNLIMITED)
    }
}

// ── Rendered artifact ────────────────────────────────────────────────────

/// Which path produced a stage's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageSource {
    /// The capability provider answered and its output was usable.
    Provider,
    /// The deterministic fallback supplied the output.
    Fallback,
}

/// Audit record reproducing every intermediate decision of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizMetadata {
    pub original_query: String,
    pub refined_query: String,
    pub analysis: QueryAnalysis,
    pub practices_applied: Vec<String>,
    pub categories_used: Vec<String>,
    pub priority_order: Vec<String>,
    pub paper_count: usize,
    pub markup_length: usize,
    pub streamed: bool,
    /// Stages whose provider call failed and whose deterministic fallback
    /// produced the content instead. Empty means fully provider-sourced.
    pub fallback_stages: Vec<String>,
}

/// Final output of a visualization request: self-contained markup plus the
/// decision audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedArtifact {
    /// Complete HTML document. Always begins with a doctype or root element;
    /// fragments from the model are wrapped before this struct is built.
    pub markup: String,
    pub metadata: VizMetadata,
}

// ── Ingestion output ─────────────────────────────────────────────────────

/// Plain-text view of one ingested paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperText {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    /// Full extracted text, reading order as pdf-extract produced it.
    pub body: String,
    pub num_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_lenient_parse_known_and_unknown() {
        assert_eq!(Intent::parse_lenient("Compare"), Intent::Compare);
        assert_eq!(Intent::parse_lenient("timeline"), Intent::Timeline);
        assert_eq!(Intent::parse_lenient("banana"), Intent::Summarize);
        assert_eq!(Intent::parse_lenient(""), Intent::Summarize);
    }

    #[test]
    fn shape_lenient_parse_defaults_to_cards() {
        assert_eq!(VizShape::parse_lenient("table"), VizShape::Table);
        assert_eq!(VizShape::parse_lenient("detail_view"), VizShape::DetailView);
        assert_eq!(VizShape::parse_lenient("hologram"), VizShape::Cards);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&VizShape::DetailView).unwrap(),
            "\"detail_view\""
        );
        assert_eq!(serde_json::to_string(&Intent::Compare).unwrap(), "\"compare\"");
    }

    #[test]
    fn display_round_trips_through_lenient_parse() {
        for intent in [
            Intent::Compare,
            Intent::Summarize,
            Intent::Explore,
            Intent::Timeline,
            Intent::Cluster,
            Intent::Filter,
            Intent::Detail,
        ] {
            assert_eq!(Intent::parse_lenient(&intent.to_string()), intent);
        }
    }
}

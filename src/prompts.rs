//! Prompt templates for analysis, refinement, extraction, and generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how a stage talks to the model
//!    requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can build and inspect prompts directly
//!    without a live provider, making prompt regressions easy to catch.

use crate::model::QueryAnalysis;

// ── Stage prompts ────────────────────────────────────────────────────────

/// Prompt for the query analyzer: classify a free-text request into intent,
/// focus areas, shape, and complexity.
pub fn analysis_prompt(query: &str, paper_count: usize) -> String {
    format!(
        r#"Analyze this visualization query and extract structured information.

USER QUERY: "{query}"
PAPER COUNT: {paper_count}

Analyze the query and output JSON with:
{{
  "intent": "<compare|summarize|explore|timeline|cluster|filter|detail>",
  "focus_areas": ["<relevant data categories: contributions, experiments, architectures, hyperparameters, ablations, baselines, datasets, limitations, future_work, algorithms, equations, training, metrics, loss_functions, related_work, claims, code_resources>"],
  "visualization_type": "<table|cards|timeline|graph|matrix|list|detail_view>",
  "complexity": "<simple|medium|complex>",
  "requires_cross_paper_analysis": <true|false>
}}

Examples:
- "Show me all contributions" -> intent: summarize, focus: [contributions], viz: cards
- "Compare training procedures across papers" -> intent: compare, focus: [training], viz: table
- "Timeline of architectural improvements" -> intent: timeline, focus: [architectures], viz: timeline

Output ONLY the JSON."#
    )
}

/// Prompt for the practice generator: 5-10 presentation guidelines tailored
/// to the analysed request.
pub fn practices_prompt(analysis: &QueryAnalysis) -> String {
    format!(
        r#"Generate specific best practices for creating a visualization based on this analysis:

INTENT: {intent}
FOCUS AREAS: {focus}
VISUALIZATION TYPE: {shape}
PAPER COUNT: {papers}
COMPLEXITY: {complexity}

Generate 5-10 specific, actionable best practices for this visualization. Consider:
- Layout and organization
- Information hierarchy
- Interactive elements
- Visual design
- Data presentation
- User experience

Output as JSON:
{{
  "best_practices": [
    "Specific practice 1...",
    "Specific practice 2..."
  ]
}}"#,
        intent = analysis.intent,
        focus = analysis.focus_areas.join(", "),
        shape = analysis.shape,
        papers = analysis.paper_count,
        complexity = analysis.complexity,
    )
}

/// Prompt for the query refiner: rewrite the request into a denser
/// specification a designer could follow.
pub fn refine_prompt(original: &str, analysis: &QueryAnalysis, practices: &[String]) -> String {
    let practice_lines: String = practices
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Enhance this visualization query to be more specific and actionable.

ORIGINAL QUERY: "{original}"

CONTEXT:
- Intent: {intent}
- Focus: {focus}
- Visualization type: {shape}
- Number of papers: {papers}

BEST PRACTICES TO INCORPORATE:
{practice_lines}

Create an enhanced query that:
1. Is more specific about what to show
2. Includes layout/structure guidance
3. Specifies interaction patterns
4. Mentions key visual elements

Output JSON:
{{
  "enhanced_query": "Enhanced detailed query here...",
  "key_requirements": ["req1", "req2"],
  "style_guidelines": {{
    "layout": "description",
    "colors": "description",
    "typography": "description"
  }}
}}

The enhanced query should be 2-4 sentences that a designer could follow."#,
        intent = analysis.intent,
        focus = analysis.focus_areas.join(", "),
        shape = analysis.shape,
        papers = analysis.paper_count,
    )
}

// ── Generation prompt building blocks ────────────────────────────────────

/// System prompt for the final generation call.
pub const GENERATOR_SYSTEM_PROMPT: &str = "You are a senior data visualization \
designer specializing in scientific research papers. You produce complete, \
polished, self-contained HTML documents.";

/// Fixed design system embedded in every generation prompt. The layout line
/// is appended separately because it comes from the refined query's style
/// guidelines.
pub const DESIGN_SYSTEM: &str = r#"Colors:
- Background: #0a0e27 (dark blue-black)
- Cards/Panels: #16213e (navy blue)
- Accent: #e94560 (coral red)
- Secondary: #0f3460 (deep blue)
- Text: #eee (light gray)
- Muted text: #a8a8a8

Typography:
- Font family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif
- Base size: 16px
- Headings: 1.5rem to 2.5rem with bold weight
- Body: 1rem with line-height 1.6

Layout:
- Max width: 1400px, centered
- Padding: 2rem
- Card spacing: 1.5rem gap

Interactive Elements:
- Smooth transitions (0.3s ease)
- Hover effects: transform: translateY(-4px) and shadow
- Collapsible sections: use <details> and <summary> tags
- Click indicators: cursor: pointer, subtle color changes"#;

/// Hard output-format requirements for the generation call.
pub const TECHNICAL_REQUIREMENTS: &str = r#"- Output ONLY valid HTML - no markdown, no explanations, no code fences
- Start with <!DOCTYPE html> and include complete HTML structure
- Use inline CSS in a <style> tag in <head>
- Use inline JavaScript in a <script> tag at the end of <body> if needed
- Completely self-contained - NO external dependencies (no CDNs, no external fonts)
- Modern, clean design with proper spacing and typography"#;

/// Content-density directives. The generated document should be long and
/// information-dense rather than a thin summary.
pub const DENSITY_REQUIREMENTS: &str = r#"- Make the document information-dense: several full screens of scrollable content
- Include every piece of data provided; do not summarize away details
- Create 5-10 major sections with detailed subsections
- Use <details> tags to pack information densely
- Include comprehensive tables showing all data points
- Show specific numbers, metrics, percentages, and evidence
- Add summary boxes with statistics and comparison matrices where they fit"#;

/// Things the generator must never do.
pub const MANDATORY_CONSTRAINTS: &str = r#"NEVER use external CDNs (cdnjs, unpkg, googleapis, ...)
NEVER use placeholder or Lorem Ipsum text - use the actual data
NEVER output markdown code fences
NEVER use alert() or console.log() for user-facing messages
NEVER create horizontal page scroll (use overflow-x: auto on containers if needed)
ALWAYS use semantic HTML (header, main, section, article, nav)
ALWAYS include a proper heading hierarchy (h1 then h2 then h3)
ALWAYS make interactive elements keyboard-accessible
ALWAYS use the actual data provided"#;

/// Closing instruction for the generation call.
pub const OUTPUT_INSTRUCTION: &str = r#"Generate the complete HTML now. Remember:
1. Use the enhanced query requirements as your guide
2. Follow all best practices listed above
3. Incorporate the data naturally and comprehensively
4. Create a polished, professional result
5. Start directly with <!DOCTYPE html>"#;

// ── Extraction prompts ───────────────────────────────────────────────────

/// System prompt shared by every category extractor.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert machine learning \
researcher analyzing academic papers. Your task is to extract structured facts \
accurately and systematically. Always output valid JSON only.";

/// Build the extraction prompt for one category of one paper.
///
/// `instructions` is the category's block from the extraction table; `body`
/// is already truncated to the configured character budget by the caller.
pub fn extraction_prompt(
    category: &str,
    instructions: &str,
    title: &str,
    abstract_text: &str,
    body: &str,
) -> String {
    format!(
        r#"Analyze the provided paper and extract its {category}.

{instructions}

Output ONLY the JSON array. No explanations.

Paper Title: {title}

Paper Abstract:
{abstract_text}

Paper Content:
{body}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complexity, Intent, VizShape};

    fn analysis() -> QueryAnalysis {
        QueryAnalysis {
            intent: Intent::Compare,
            focus_areas: vec!["training".into(), "experiments".into()],
            shape: VizShape::Table,
            complexity: Complexity::Medium,
            paper_count: 4,
            cross_paper_required: true,
        }
    }

    #[test]
    fn analysis_prompt_lists_enums_and_examples() {
        let p = analysis_prompt("Show me all contributions", 1);
        assert!(p.contains("compare|summarize|explore|timeline|cluster|filter|detail"));
        assert!(p.contains("table|cards|timeline|graph|matrix|list|detail_view"));
        assert!(p.contains("Show me all contributions"));
        assert!(p.contains("PAPER COUNT: 1"));
    }

    #[test]
    fn practices_prompt_embeds_analysis_fields() {
        let p = practices_prompt(&analysis());
        assert!(p.contains("INTENT: compare"));
        assert!(p.contains("training, experiments"));
        assert!(p.contains("PAPER COUNT: 4"));
    }

    #[test]
    fn refine_prompt_lists_practices() {
        let p = refine_prompt(
            "compare them",
            &analysis(),
            &["Use sticky headers".into(), "Align columns".into()],
        );
        assert!(p.contains("- Use sticky headers"));
        assert!(p.contains("- Align columns"));
        assert!(p.contains("\"compare them\""));
    }

    #[test]
    fn extraction_prompt_truncation_is_callers_job() {
        let p = extraction_prompt("contributions", "List each contribution.", "T", "A", "B");
        assert!(p.contains("extract its contributions"));
        assert!(p.contains("Paper Title: T"));
    }
}

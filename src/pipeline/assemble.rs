//! Prompt assembly: combine every upstream decision into one generation
//! request.
//!
//! Pure templating, no provider call. Identical inputs produce a
//! byte-identical prompt: the corpus serialises with sorted keys and every
//! other block is either fixed text from [`crate::prompts`] or a
//! deterministic function of its input. That determinism is what makes the
//! assembler testable without a model in the loop.

use crate::model::{FilteredCorpus, QueryAnalysis, RefinedQuery};
use crate::prompts;
use serde_json::Value;

/// Build the final generation prompt.
pub fn assemble(
    refined: &RefinedQuery,
    practices: &[String],
    corpus: &FilteredCorpus,
    analysis: &QueryAnalysis,
) -> String {
    let data_json = serde_json::to_string_pretty(&Value::Object(corpus.clone()))
        .unwrap_or_else(|_| "{}".to_string());

    let numbered_practices: String = practices
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n");

    let requirements: String = refined
        .requirements
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<role>{system}</role>

<task>Generate a complete, professional HTML visualization of research paper data.</task>

<original_user_query>{original}</original_user_query>

<enhanced_visualization_requirements>
{refined}
</enhanced_visualization_requirements>

<key_requirements>
{requirements}
</key_requirements>

<query_analysis>
- Intent: {intent}
- Focus: {focus}
- Visualization type: {shape}
- Paper count: {papers}
- Complexity: {complexity}
</query_analysis>

<best_practices>
{practices}
</best_practices>

<data>
{data}
</data>

<technical_requirements>
{technical}
</technical_requirements>

<design_system>
{design}

Layout guidance: {layout}
Color guidance: {colors}
Typography guidance: {typography}
</design_system>

<content_density>
{density}
</content_density>

<mandatory_constraints>
{constraints}
</mandatory_constraints>

<output_instruction>
{output}
</output_instruction>"#,
        system = prompts::GENERATOR_SYSTEM_PROMPT,
        original = refined.original,
        refined = refined.refined,
        requirements = requirements,
        intent = analysis.intent,
        focus = analysis.focus_areas.join(", "),
        shape = analysis.shape,
        papers = analysis.paper_count,
        complexity = analysis.complexity,
        practices = numbered_practices,
        data = data_json,
        technical = prompts::TECHNICAL_REQUIREMENTS,
        design = prompts::DESIGN_SYSTEM,
        layout = refined.style_guidelines.layout,
        colors = refined.style_guidelines.colors,
        typography = refined.style_guidelines.typography,
        density = prompts::DENSITY_REQUIREMENTS,
        constraints = prompts::MANDATORY_CONSTRAINTS,
        output = prompts::OUTPUT_INSTRUCTION,
    )
}

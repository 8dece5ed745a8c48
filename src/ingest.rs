//! PDF ingestion: extract plain text and light structure from a paper.
//!
//! Layout fidelity is out of scope; `pdf-extract` gives us the text in
//! reading order and that is enough for prompt-based extraction. Pages are
//! counted from the form feeds pdf-extract inserts between pages. Title and
//! abstract come from cheap heuristics: first significant line, and the text
//! between an "abstract" marker and the introduction heading.

use crate::error::VizError;
use crate::model::PaperText;
use std::path::Path;
use tracing::{debug, info};

/// Upper bound on extracted abstract length, characters.
const MAX_ABSTRACT_CHARS: usize = 2000;

/// Headings that terminate the abstract.
const ABSTRACT_END_MARKERS: &[&str] = &[
    "introduction",
    "1 introduction",
    "1. introduction",
    "1 background",
];

/// Parse PDF bytes into a [`PaperText`].
pub fn ingest_pdf(bytes: &[u8], paper_id: &str) -> Result<PaperText, VizError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| VizError::PdfExtractFailed {
        paper_id: paper_id.to_string(),
        detail: e.to_string(),
    })?;

    if text.trim().is_empty() {
        return Err(VizError::EmptyDocument {
            paper_id: paper_id.to_string(),
        });
    }

    // pdf-extract separates pages with form feeds.
    let num_pages = text.matches('\x0C').count() + 1;
    let title = extract_title(&text);
    let abstract_text = extract_abstract(&text);

    info!(
        paper = paper_id,
        pages = num_pages,
        chars = text.len(),
        "ingested PDF"
    );
    debug!(title = %title, "title heuristic");

    Ok(PaperText {
        paper_id: paper_id.to_string(),
        title,
        abstract_text,
        body: text,
        num_pages,
    })
}

/// Read and parse a PDF file. The parse is CPU-bound, so it runs on the
/// blocking pool.
pub async fn ingest_pdf_file(
    path: impl AsRef<Path>,
    paper_id: &str,
) -> Result<PaperText, VizError> {
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        return Err(VizError::FileNotFound { path });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| VizError::StoreReadFailed {
            path: path.clone(),
            source,
        })?;

    let paper_id = paper_id.to_string();
    tokio::task::spawn_blocking(move || ingest_pdf(&bytes, &paper_id))
        .await
        .map_err(|e| VizError::Internal(format!("ingest task panicked: {e}")))?
}

/// First line that looks like a title: long enough to be one, short enough
/// not to be a paragraph, and not an all-caps running header.
fn extract_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| {
            line.len() > 10 && line.len() < 200 && !line.chars().all(|c| !c.is_lowercase())
        })
        .unwrap_or("Unknown Title")
        .to_string()
}

/// Text between the "abstract" marker and the introduction heading, capped.
fn extract_abstract(text: &str) -> String {
    let lower = text.to_lowercase();
    let Some(start) = lower.find("abstract") else {
        return String::new();
    };

    let mut end = text.len();
    for marker in ABSTRACT_END_MARKERS {
        if let Some(pos) = lower[start..].find(marker) {
            end = end.min(start + pos);
        }
    }

    // Indices come from the lowercased copy, whose byte layout can differ
    // from the original for some Unicode.
    let raw = text.get(start..end).unwrap_or("");
    let cleaned = raw
        .trim_start_matches(|c: char| c.is_alphabetic()) // the "Abstract" word itself
        .trim_start_matches([':', '.', '-', '—'])
        .trim();

    let capped: String = cleaned.chars().take(MAX_ABSTRACT_CHARS).collect();
    capped.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Flat-file fact store: cached extraction results as JSON on disk.
//!
//! Layout under the store root:
//!
//! ```text
//! data/
//!  ├─ paper_1/
//!  │   ├─ paper.json          identity + ingested text
//!  │   ├─ contributions.json  one file per extracted category
//!  │   └─ experiments.json
//!  └─ visualizations/
//!      └─ compare-training.html
//! ```
//!
//! Every write is atomic (sibling `.tmp` + rename) so a crash mid-write
//! never leaves a half-written cache file behind.

use crate::error::VizError;
use crate::model::{PaperText, RawCorpus};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File stem of the per-paper identity record.
const PAPER_FILE: &str = "paper";

/// Directory for saved visualization artifacts.
const VIZ_DIR: &str = "visualizations";

/// Handle to a data directory of cached facts.
#[derive(Debug, Clone)]
pub struct FactStore {
    root: PathBuf,
}

impl FactStore {
    /// Open (or designate) a store rooted at `root`. The directory is
    /// created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paper_dir(&self, paper_id: &str) -> PathBuf {
        self.root.join(paper_id)
    }

    fn category_path(&self, paper_id: &str, category: &str) -> PathBuf {
        self.paper_dir(paper_id).join(format!("{category}.json"))
    }

    // ── Papers ───────────────────────────────────────────────────────────

    /// Persist an ingested paper's identity and text.
    pub async fn save_paper(&self, paper: &PaperText) -> Result<(), VizError> {
        let value = serde_json::to_value(paper)
            .map_err(|e| VizError::Internal(format!("serialise paper: {e}")))?;
        self.write_json(&self.category_path(&paper.paper_id, PAPER_FILE), &value)
            .await
    }

    /// Load an ingested paper, if present.
    pub async fn load_paper(&self, paper_id: &str) -> Result<Option<PaperText>, VizError> {
        match self.read_json(&self.category_path(paper_id, PAPER_FILE)).await? {
            Some(value) => {
                let paper = serde_json::from_value(value).map_err(|e| VizError::CorruptCache {
                    path: self.category_path(paper_id, PAPER_FILE),
                    detail: e.to_string(),
                })?;
                Ok(Some(paper))
            }
            None => Ok(None),
        }
    }

    /// List paper ids with cached data, sorted.
    pub async fn list_papers(&self) -> Result<Vec<String>, VizError> {
        let mut papers = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(papers), // nothing stored yet
        };
        while let Some(entry) = entries.next_entry().await.map_err(|source| {
            VizError::StoreReadFailed {
                path: self.root.clone(),
                source,
            }
        })? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir && name != VIZ_DIR {
                papers.push(name);
            }
        }
        papers.sort();
        Ok(papers)
    }

    // ── Facts ────────────────────────────────────────────────────────────

    /// Persist one category's extracted facts for one paper.
    pub async fn save_facts(
        &self,
        paper_id: &str,
        category: &str,
        facts: &[Value],
    ) -> Result<(), VizError> {
        self.write_json(
            &self.category_path(paper_id, category),
            &Value::Array(facts.to_vec()),
        )
        .await
    }

    /// Load one category's facts, if extracted.
    pub async fn load_facts(
        &self,
        paper_id: &str,
        category: &str,
    ) -> Result<Option<Vec<Value>>, VizError> {
        match self.read_json(&self.category_path(paper_id, category)).await? {
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Ok(Some(vec![other])),
            None => Ok(None),
        }
    }

    /// Assemble the raw corpus the pipeline consumes: for each paper, an
    /// object with a `paper` identity field plus one field per cached
    /// category.
    pub async fn load_corpus(&self, paper_ids: &[String]) -> Result<RawCorpus, VizError> {
        let mut corpus = RawCorpus::new();

        for paper_id in paper_ids {
            let dir = self.paper_dir(paper_id);
            if !dir.is_dir() {
                return Err(VizError::PaperNotFound {
                    paper_id: paper_id.clone(),
                });
            }

            let mut record = serde_json::Map::new();

            if let Some(paper) = self.load_paper(paper_id).await? {
                record.insert(
                    "paper".into(),
                    json!({
                        "paper_id": paper.paper_id,
                        "title": paper.title,
                        "abstract": paper.abstract_text,
                        "num_pages": paper.num_pages,
                    }),
                );
            }

            let mut entries =
                tokio::fs::read_dir(&dir)
                    .await
                    .map_err(|source| VizError::StoreReadFailed {
                        path: dir.clone(),
                        source,
                    })?;
            while let Some(entry) =
                entries
                    .next_entry()
                    .await
                    .map_err(|source| VizError::StoreReadFailed {
                        path: dir.clone(),
                        source,
                    })?
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if stem == PAPER_FILE {
                    continue;
                }
                if let Some(value) = self.read_json(&path).await? {
                    record.insert(stem.to_string(), value);
                }
            }

            corpus.insert(paper_id.clone(), Value::Object(record));
        }

        debug!(papers = corpus.len(), "corpus loaded");
        Ok(corpus)
    }

    // ── Artifacts ────────────────────────────────────────────────────────

    /// Save a rendered visualization under `visualizations/<name>.html` and
    /// return its path.
    pub async fn save_artifact(&self, name: &str, markup: &str) -> Result<PathBuf, VizError> {
        let path = self.root.join(VIZ_DIR).join(format!("{name}.html"));
        self.write_atomic(&path, markup.as_bytes()).await?;
        info!(path = %path.display(), "artifact saved");
        Ok(path)
    }

    // ── I/O helpers ──────────────────────────────────────────────────────

    async fn write_json(&self, path: &Path, value: &Value) -> Result<(), VizError> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| VizError::Internal(format!("serialise json: {e}")))?;
        self.write_atomic(path, &body).await
    }

    /// Atomic write: temp sibling + rename, so readers never see a partial
    /// file.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), VizError> {
        let write_err = |source| VizError::StoreWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }

    async fn read_json(&self, path: &Path) -> Result<Option<Value>, VizError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(VizError::StoreReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| VizError::CorruptCache {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Ok(Some(value))
    }
}

//! # paper2viz
//!
//! Turn extracted research-paper facts into self-contained HTML
//! visualizations using LLMs.
//!
//! ## Why this crate?
//!
//! Dumping raw extraction JSON on a reader is useless, and hand-building a
//! dashboard per question does not scale. Instead this crate runs a
//! multi-stage prompt-engineering pipeline over cached per-paper facts: it
//! works out what the user is asking for, decides which facts matter and how
//! many, and asks a text-generation model for one dense, self-contained HTML
//! document — with deterministic fallbacks at every stage so a flaky model
//! degrades the result instead of failing it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! query + cached facts
//!  │
//!  ├─ 1. Analyze    classify intent, focus areas, shape (LLM, keyword fallback)
//!  ├─ 2. Practices  derive presentation guidelines (LLM, rule-table fallback)
//!  ├─ 3. Refine     rewrite the query into a denser brief (LLM, deterministic fallback)
//!  ├─ 4. Select     pure: categories, per-category caps, priority order
//!  ├─ 5. Filter     pure: truncate, annotate overflow, cross-paper aggregates
//!  ├─ 6. Assemble   pure: one byte-deterministic generation prompt
//!  └─ 7. Render     streamed generation + retrying fallback + markup repair
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2viz::{generate, FactStore, VizConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider picked up from DEEPSEEK_API_KEY
//!     let config = VizConfig::default();
//!     let store = FactStore::new("data");
//!
//!     let papers: Vec<String> = store.list_papers().await?;
//!     let corpus = store.load_corpus(&papers).await?;
//!
//!     let artifact = generate(&papers, "Compare training procedures", &corpus, &config).await?;
//!     println!("{}", artifact.markup);
//!     eprintln!("fallback stages: {:?}", artifact.metadata.fallback_stages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2viz` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2viz = { version = "0.3", default-features = false }
//! ```
//!
//! ## Testing without a model
//!
//! Every stage takes the provider as an `Arc<dyn CapabilityProvider>`;
//! inject [`FakeProvider`] to script responses, stream chunks, or fail on
//! demand. The pipeline is designed so that a completely dead provider still
//! produces a valid analysis, practice list, and refined query — only the
//! final render requires a working model.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{VizConfig, VizConfigBuilder};
pub use error::{ProviderError, VizError};
pub use extract::{category_names, category_spec, extract, extract_all, CategorySpec};
pub use generate::{generate, resolve_provider};
pub use ingest::{ingest_pdf, ingest_pdf_file};
pub use model::{
    Complexity, FilteredCorpus, Intent, PaperText, QueryAnalysis, RawCorpus, RefinedQuery,
    RenderedArtifact, SelectionStrategy, StageSource, StyleGuidelines, VizMetadata, VizShape,
};
pub use progress::{NoopProgress, ProgressObserver, Stage, VizProgress};
pub use provider::{
    CapabilityProvider, ChunkStream, CompletionRequest, DeepSeekProvider, FakeProvider, Structured,
};
pub use store::FactStore;

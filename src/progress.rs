//! Progress-observer trait for pipeline stage events.
//!
//! Inject an `Arc<dyn VizProgress>` via
//! [`crate::config::VizConfigBuilder::progress`] to receive events as the
//! pipeline runs: one start/complete pair per stage, plus periodic ticks
//! while the render stage streams chunks. Callers can forward events to a
//! terminal spinner, a channel, or a log without the library knowing how the
//! host application communicates.
//!
//! All methods have default no-op implementations so callers only override
//! what they care about. Implementations must be `Send + Sync`; within one
//! request events arrive strictly in stage order, but a shared observer may
//! see interleaved events from concurrent requests.

use crate::model::StageSource;
use std::fmt;
use std::sync::Arc;

/// The seven pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyze,
    Practices,
    Refine,
    Select,
    Filter,
    Assemble,
    Render,
}

impl Stage {
    /// Stable name used in metadata and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analyze => "analyze",
            Stage::Practices => "practices",
            Stage::Refine => "refine",
            Stage::Select => "select",
            Stage::Filter => "filter",
            Stage::Assemble => "assemble",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Called by the pipeline as it moves through its stages.
pub trait VizProgress: Send + Sync {
    /// A stage is about to run.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage finished; `source` says whether the provider or the
    /// deterministic fallback produced its output (always `Provider` for the
    /// pure stages).
    fn on_stage_complete(&self, stage: Stage, source: StageSource) {
        let _ = (stage, source);
    }

    /// Periodic tick while the render stage drains a stream.
    fn on_stream_progress(&self, chunks: usize, chars: usize) {
        let _ = (chunks, chars);
    }

    /// Generation finished; `streamed` says which path produced the markup.
    fn on_generation_complete(&self, markup_len: usize, streamed: bool) {
        let _ = (markup_len, streamed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl VizProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::VizConfig`].
pub type ProgressObserver = Arc<dyn VizProgress>;

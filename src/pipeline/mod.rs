//! Pipeline stages for visualization generation.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets the deterministic
//! stages stay free of provider plumbing.
//!
//! ## Data Flow
//!
//! ```text
//! analyze ──▶ practices ──▶ refine ──▶ select ──▶ filter ──▶ assemble ──▶ render
//! (intent)    (guidelines)  (rewrite)  (strategy)  (truncate)  (prompt)     (markup)
//! ```
//!
//! 1. [`analyze`]   — classify the request; keyword fallback keeps it total
//! 2. [`practices`] — derive presentation guidelines; rule-table fallback
//! 3. [`refine`]    — rewrite the query into a denser specification
//! 4. [`select`]    — pure: choose categories, caps, and priority order
//! 5. [`filter`]    — pure: truncate facts, annotate overflow, cross-paper
//!    aggregates
//! 6. [`assemble`]  — pure: build the generation prompt (byte-deterministic)
//! 7. [`render`]    — the only stage allowed to fail: streamed generation
//!    with a retrying non-streaming fallback, then markup repair

pub mod analyze;
pub mod assemble;
pub mod filter;
pub mod practices;
pub mod refine;
pub mod render;
pub mod select;

//! revq — tiered code-review orchestration.
//!
//! Accepts a change set, classifies its complexity, dispatches it to the
//! analyzers registered for its content types, lazily fetches full file
//! context on demand, and merges heterogeneous findings into one ordered,
//! deduplicated report.
//!
//! ```text
//! ChangeSet ─▸ classify ─▸ dispatch ─┬─▸ Analyzer (rs) ──┐
//!                 │                  ├─▸ Analyzer (go) ──┼─▸ aggregate ─▸ ReviewReport
//!    Complex ─▸ snapshot             └─▸ Analyzer (sql) ─┘
//!                                          │
//!                                 ContextLoader (lazy, single-flight)
//! ```
//!
//! ## Design
//! - Analyzers are capabilities behind a trait, registered per content tag
//!   in an open [`AnalyzerRegistry`] — no hardcoded dispatch switch.
//! - One concurrent task per (partition, analyzer) pair, each under its own
//!   timeout; failures isolate per partition and surface as report content.
//! - A valid change set always yields a report, possibly flagged
//!   `degraded` (no full snapshot) or `partial` (run budget exceeded).
//! - Rule content, transports, and report rendering live outside this
//!   crate: callers implement [`Analyzer`], [`ContentSource`], and
//!   [`SnapshotSource`].
//!
//! ## Extension
//! Add review capabilities by implementing [`Analyzer`] and registering
//! them with [`AnalyzerRegistry::register`] before building the
//! [`ReviewEngine`].

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod registry;
pub mod snapshot;

pub use aggregate::{aggregate, AggregationInput};
pub use classify::{classify, ComplexityTier};
pub use config::{ClassifierConfig, ReviewConfig};
pub use context::{ContentSource, ContextHandle, ContextLoader};
pub use dispatch::ReviewEngine;
pub use error::{ContextError, ReviewError, SnapshotError};
pub use model::{
    ChangeKind, ChangeSet, ContentTag, DiffHunk, FileChange, Finding, ReviewReport, Severity,
    SeverityTotals,
};
pub use registry::{Analyzer, AnalyzerInput, AnalyzerOutput, AnalyzerRegistry};
pub use snapshot::{PatchMaterializer, SnapshotSource};

//! Analyzer capability trait and the open tag → analyzer registry.
//!
//! The "which analyzer handles which content type" relationship is a
//! capability-dispatch table: tags map to interchangeable [`Analyzer`]
//! implementations behind a trait object, and new capabilities register
//! without touching dispatcher logic. Registration order is significant —
//! it is the tie-break key when the aggregator dedupes findings from
//! different analyzers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ContextHandle;
use crate::model::{ChangeSet, ContentTag, FileChange, Finding};

// ── Analyzer input / output ──────────────────────────────────────

/// Everything one analyzer invocation gets to see.
pub struct AnalyzerInput {
    /// The full (immutable, shared) change set.
    pub change: Arc<ChangeSet>,
    /// The subset of file changes in this analyzer's partition.
    pub files: Vec<FileChange>,
    /// Lazy full-content access, scoped to this partition's paths.
    pub context: ContextHandle,
    /// Root of the materialized snapshot, present only for `Complex`-tier
    /// runs where materialization succeeded.
    pub snapshot_root: Option<PathBuf>,
}

/// What one analyzer invocation produced.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutput {
    /// Issues and observations.
    pub findings: Vec<Finding>,
    /// Positive observations worth surfacing in the report.
    pub positives: Vec<String>,
}

// ── Analyzer trait ───────────────────────────────────────────────

/// A pluggable unit of review logic bound to one or more content tags.
///
/// Implementations wrap whatever rule content they like (security
/// checklists, style linters, model-backed reviewers); the engine only
/// cares about the shape of the exchange.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Unique identifier, recorded on every finding this analyzer emits.
    fn id(&self) -> &str;

    /// Analyze one partition of a change set.
    ///
    /// Errors are isolated by the dispatcher: a failure here becomes a
    /// synthesized finding plus a run-level warning, never an aborted run.
    async fn analyze(&self, input: &AnalyzerInput) -> anyhow::Result<AnalyzerOutput>;
}

// ── Registry ─────────────────────────────────────────────────────

/// Open mapping from content tags to registered analyzers.
///
/// Multiple tags may map to one analyzer (extension families) and one tag
/// may map to several analyzers; resolution preserves registration order.
#[derive(Default)]
pub struct AnalyzerRegistry {
    /// All analyzers in registration order.
    analyzers: Vec<Arc<dyn Analyzer>>,
    /// Tag → indexes into `analyzers`.
    by_tag: HashMap<ContentTag, Vec<usize>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an analyzer under one or more content tags.
    pub fn register(&mut self, tags: &[&str], analyzer: Arc<dyn Analyzer>) {
        let index = self.analyzers.len();
        self.analyzers.push(analyzer);
        for tag in tags {
            let entries = self.by_tag.entry(ContentTag::new(*tag)).or_default();
            if !entries.contains(&index) {
                entries.push(index);
            }
        }
    }

    /// Resolve the analyzers registered for a tag, in registration order.
    ///
    /// The returned index is the analyzer's registration position, used by
    /// the aggregator as the dedup tie-break key.
    pub fn resolve(&self, tag: &ContentTag) -> Vec<(usize, Arc<dyn Analyzer>)> {
        let mut resolved: Vec<(usize, Arc<dyn Analyzer>)> = self
            .by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .map(|&i| (i, Arc::clone(&self.analyzers[i])))
            .collect();
        resolved.sort_by_key(|(i, _)| *i);
        resolved
    }

    /// Number of registered analyzers.
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    struct NoopAnalyzer {
        id: String,
    }

    #[async_trait]
    impl Analyzer for NoopAnalyzer {
        fn id(&self) -> &str {
            &self.id
        }

        async fn analyze(&self, _input: &AnalyzerInput) -> anyhow::Result<AnalyzerOutput> {
            Ok(AnalyzerOutput {
                findings: vec![Finding::new(
                    Severity::Low,
                    "noop",
                    "src/a.rs",
                    "noop",
                    self.id.clone(),
                )],
                positives: vec![],
            })
        }
    }

    fn noop(id: &str) -> Arc<dyn Analyzer> {
        Arc::new(NoopAnalyzer { id: id.into() })
    }

    #[test]
    fn resolve_unknown_tag_is_empty() {
        let registry = AnalyzerRegistry::new();
        assert!(registry.resolve(&ContentTag::new("md")).is_empty());
    }

    #[test]
    fn one_analyzer_serves_an_extension_family() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(&["js", "ts", "jsx", "tsx"], noop("js-reviewer"));

        for tag in ["js", "ts", "jsx", "tsx"] {
            let resolved = registry.resolve(&ContentTag::new(tag));
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].1.id(), "js-reviewer");
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolution_preserves_registration_order() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(&["rs"], noop("first"));
        registry.register(&["rs"], noop("second"));
        registry.register(&["rs", "go"], noop("third"));

        let resolved = registry.resolve(&ContentTag::new("rs"));
        let ids: Vec<&str> = resolved.iter().map(|(_, a)| a.id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
        assert_eq!(resolved[0].0, 0);
        assert_eq!(resolved[2].0, 2);
    }

    #[test]
    fn duplicate_tag_registration_is_ignored() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(&["rs", "rs"], noop("only"));
        assert_eq!(registry.resolve(&ContentTag::new("rs")).len(), 1);
    }
}

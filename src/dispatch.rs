//! The review engine: classification → dispatch → join → aggregation.
//!
//! [`ReviewEngine::review`] is synchronous from the caller's view and
//! concurrent inside: one task per (partition, analyzer) pair, each under
//! its own time budget, joined explicitly before aggregation.
//!
//! ```text
//! ChangeSet ─▸ classify ─▸ partition by tag ─┬─▸ analyzer task ─┐
//!                  │                         ├─▸ analyzer task ─┼─▸ join ─▸ aggregate ─▸ ReviewReport
//!     Complex? ─▸ snapshot                   └─▸ analyzer task ─┘
//! ```
//!
//! ## Failure isolation
//! Task outcomes are a tagged union (completed / timed out / failed)
//! collected by the join loop — no exception crosses a task boundary. A
//! timeout or failure in one analyzer becomes a synthesized finding and a
//! run-level warning; sibling analyzers are untouched. Only an invalid
//! change set is a hard error: a valid one always yields a report,
//! possibly flagged `degraded` or `partial`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::aggregate::{aggregate, AggregationInput};
use crate::classify::{classify, ComplexityTier};
use crate::config::ReviewConfig;
use crate::context::{ContentSource, ContextHandle, ContextLoader};
use crate::error::ReviewError;
use crate::model::{ChangeSet, ContentTag, FileChange, Finding, ReviewReport, Severity};
use crate::registry::{AnalyzerInput, AnalyzerOutput, AnalyzerRegistry};
use crate::snapshot::{PatchMaterializer, SnapshotSource};

/// Analyzer id stamped on findings the engine synthesizes itself
/// (unsupported partitions, timeouts, analyzer failures).
const ORCHESTRATOR_ID: &str = "orchestrator";

// ── Task outcomes ────────────────────────────────────────────────

/// Terminal state of one analyzer task.
enum TaskOutcome {
    Completed(AnalyzerOutput),
    TimedOut(Duration),
    Failed(String),
}

/// One joined analyzer task, tagged with its registration order so the
/// collected results can be re-sorted independently of completion order.
struct TaskResult {
    order: usize,
    tag: ContentTag,
    analyzer_id: String,
    outcome: TaskOutcome,
}

// ── Review engine ────────────────────────────────────────────────

/// Orchestrates a full review run over a change set.
pub struct ReviewEngine {
    registry: AnalyzerRegistry,
    content: Arc<dyn ContentSource>,
    snapshot: Option<PatchMaterializer>,
    config: ReviewConfig,
}

impl ReviewEngine {
    pub fn new(
        registry: AnalyzerRegistry,
        content: Arc<dyn ContentSource>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            registry,
            content,
            snapshot: None,
            config,
        }
    }

    /// Attach a snapshot source for `Complex`-tier full-context review.
    ///
    /// Without one, `Complex` runs still complete — in degraded
    /// (diff-only) mode.
    pub fn with_snapshot_source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.snapshot = Some(PatchMaterializer::new(source));
        self
    }

    /// Review a change set and produce a report.
    ///
    /// Input validation happens at [`ChangeSet::new`], so a change set
    /// that reaches this point always yields a report; collaborator and
    /// analyzer trouble degrades into report content.
    pub async fn review(&self, change: ChangeSet) -> Result<ReviewReport, ReviewError> {
        let started = Instant::now();
        // The tier is computed exactly once per run, here; the change set
        // itself stays a plain immutable value.
        let tier = classify(&change, &self.config.classifier);
        let mut warnings: Vec<String> = Vec::new();
        let mut degraded = false;

        tracing::info!(
            change = %change.id(),
            tier = tier.label(),
            files = change.files().len(),
            changed_lines = change.changed_lines(),
            "starting review run"
        );

        // Complex changes get static-analysis-grade context up front.
        let snapshot_root = if tier == ComplexityTier::Complex {
            match &self.snapshot {
                Some(materializer) => match materializer.materialize(&change).await {
                    Ok(root) => Some(root),
                    Err(e) => {
                        tracing::warn!(change = %change.id(), error = %e, "snapshot failed; falling back to diff-only review");
                        degraded = true;
                        warnings.push(format!(
                            "full-context snapshot unavailable ({e}); reduced-context diff-only review performed"
                        ));
                        None
                    }
                },
                None => {
                    degraded = true;
                    warnings.push(
                        "no snapshot source configured; reduced-context diff-only review performed"
                            .to_string(),
                    );
                    None
                }
            }
        } else {
            None
        };

        // Partition by content tag; BTreeMap keeps partition order stable.
        let mut partitions: BTreeMap<ContentTag, Vec<FileChange>> = BTreeMap::new();
        for fc in change.files() {
            partitions.entry(fc.tag.clone()).or_default().push(fc.clone());
        }

        let change = Arc::new(change);
        let loader = Arc::new(ContextLoader::new(Arc::clone(&self.content)));
        let budget = self.config.analyzer_timeout();

        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut meta: HashMap<tokio::task::Id, (usize, ContentTag, String)> = HashMap::new();
        let mut unsupported: Vec<Finding> = Vec::new();

        for (tag, files) in &partitions {
            let resolved = self.registry.resolve(tag);
            if resolved.is_empty() {
                unsupported.push(unsupported_finding(tag, files));
                continue;
            }

            let scope: Arc<HashSet<String>> =
                Arc::new(files.iter().map(|fc| fc.path.clone()).collect());

            for (order, analyzer) in resolved {
                let input = AnalyzerInput {
                    change: Arc::clone(&change),
                    files: files.clone(),
                    context: ContextHandle::new(
                        Arc::clone(&loader),
                        change.source_ref(),
                        Arc::clone(&scope),
                    ),
                    snapshot_root: snapshot_root.clone(),
                };
                let analyzer_id = analyzer.id().to_string();
                let tag = tag.clone();

                let handle = tasks.spawn({
                    let analyzer_id = analyzer_id.clone();
                    let tag = tag.clone();
                    async move {
                        let outcome =
                            match tokio::time::timeout(budget, analyzer.analyze(&input)).await {
                                Ok(Ok(output)) => TaskOutcome::Completed(output),
                                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                                Err(_) => TaskOutcome::TimedOut(budget),
                            };
                        TaskResult { order, tag, analyzer_id, outcome }
                    }
                });
                meta.insert(handle.id(), (order, tag, analyzer_id));
            }
        }

        let task_count = tasks.len();
        let run_budget = self.config.run_budget(task_count);
        tracing::debug!(
            change = %change.id(),
            tasks = task_count,
            partitions = partitions.len(),
            run_budget_ms = run_budget.as_millis() as u64,
            "dispatching analyzer tasks"
        );

        // Join every task to a terminal state, bounded by the run budget.
        let mut results: Vec<TaskResult> = Vec::new();
        let mut joined_ids: HashSet<tokio::task::Id> = HashSet::new();
        let all_joined = tokio::time::timeout(run_budget, async {
            while let Some(joined) = tasks.join_next_with_id().await {
                match joined {
                    Ok((id, result)) => {
                        joined_ids.insert(id);
                        results.push(result);
                    }
                    Err(err) => {
                        let id = err.id();
                        joined_ids.insert(id);
                        if let Some((order, tag, analyzer_id)) = meta.get(&id).cloned() {
                            tracing::warn!(analyzer = %analyzer_id, "analyzer task panicked");
                            results.push(TaskResult {
                                order,
                                tag,
                                analyzer_id,
                                outcome: TaskOutcome::Failed("analyzer task panicked".to_string()),
                            });
                        }
                    }
                }
            }
        })
        .await
        .is_ok();

        let partial = !all_joined;
        if partial {
            tasks.abort_all();
            warnings.push(format!(
                "run budget of {}ms exceeded; report built from completed analyzers only",
                run_budget.as_millis()
            ));
            // Everything still in flight is reported as incomplete.
            for (id, (order, tag, analyzer_id)) in &meta {
                if !joined_ids.contains(id) {
                    results.push(TaskResult {
                        order: *order,
                        tag: tag.clone(),
                        analyzer_id: analyzer_id.clone(),
                        outcome: TaskOutcome::TimedOut(run_budget),
                    });
                }
            }
        }

        // Completion order is nondeterministic; registration order is not.
        results.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.tag.cmp(&b.tag)));

        let mut runs: Vec<(String, Vec<Finding>)> = Vec::new();
        let mut positives: Vec<String> = Vec::new();
        for result in results {
            let partition_path = partitions
                .get(&result.tag)
                .and_then(|files| files.first())
                .map(|fc| fc.path.clone())
                .unwrap_or_default();

            match result.outcome {
                TaskOutcome::Completed(output) => {
                    tracing::debug!(
                        analyzer = %result.analyzer_id,
                        tag = %result.tag,
                        findings = output.findings.len(),
                        "analyzer completed"
                    );
                    positives.extend(output.positives);
                    runs.push((result.analyzer_id, output.findings));
                }
                TaskOutcome::TimedOut(budget) => {
                    warnings.push(format!(
                        "analysis incomplete for {}: '{}' partition exceeded {}ms budget",
                        result.analyzer_id,
                        result.tag,
                        budget.as_millis()
                    ));
                    // The analyzer id is part of the dimension so two
                    // timeouts on one partition survive dedup as two
                    // findings.
                    let finding = Finding::new(
                        Severity::Medium,
                        format!("incomplete:{}", result.analyzer_id),
                        partition_path,
                        format!(
                            "analysis incomplete for {}: timed out after {}ms",
                            result.analyzer_id,
                            budget.as_millis()
                        ),
                        ORCHESTRATOR_ID,
                    );
                    runs.push((result.analyzer_id, vec![finding]));
                }
                TaskOutcome::Failed(message) => {
                    warnings.push(format!(
                        "analyzer {} failed on '{}' partition: {}",
                        result.analyzer_id, result.tag, message
                    ));
                    let finding = Finding::new(
                        Severity::Medium,
                        format!("analyzer-failure:{}", result.analyzer_id),
                        partition_path,
                        format!("analyzer {} failed: {}", result.analyzer_id, message),
                        ORCHESTRATOR_ID,
                    );
                    runs.push((result.analyzer_id, vec![finding]));
                }
            }
        }

        if !unsupported.is_empty() {
            runs.push((ORCHESTRATOR_ID.to_string(), unsupported));
        }

        let report = aggregate(AggregationInput {
            change_id: change.id().to_string(),
            tier,
            runs,
            positives,
            context_loaded: loader.loaded_paths(),
            degraded,
            partial,
            warnings,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(report)
    }
}

/// Informational finding for a partition no analyzer claims.
fn unsupported_finding(tag: &ContentTag, files: &[FileChange]) -> Finding {
    let path = files.first().map(|fc| fc.path.clone()).unwrap_or_default();
    Finding::new(
        Severity::Low,
        "unsupported",
        path,
        format!(
            "no analyzer registered for content type '{tag}' ({} file(s) skipped)",
            files.len()
        ),
        ORCHESTRATOR_ID,
    )
}

// ── Tests ────────────────────────────────────────────────────────

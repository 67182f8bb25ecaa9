//! Merging analyzer outputs into one deterministic report.
//!
//! The aggregator is pure and single-threaded: by the time it runs, the
//! dispatcher has already joined every analyzer task, so all inputs are
//! materialized. Its job is dedup, ordering, and counting — it never edits
//! finding content beyond attaching corroboration notes during dedup.
//!
//! ## Determinism
//! Runs arrive sorted by analyzer registration order (the dispatcher
//! guarantees this), and the final sort is total — severity, then path,
//! then line, then dimension, then analyzer — so the same multiset of
//! findings always produces byte-identical report ordering no matter which
//! analyzer finished first.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use crate::classify::ComplexityTier;
use crate::model::{Finding, ReviewReport, Severity, SeverityTotals};

// ── Aggregation input ────────────────────────────────────────────

/// Collected results of one review run, ready to fold into a report.
#[derive(Debug, Clone)]
pub struct AggregationInput {
    /// Identifier of the reviewed change set.
    pub change_id: String,
    /// Tier the run was classified as.
    pub tier: ComplexityTier,
    /// (analyzer id, findings) pairs in analyzer registration order.
    pub runs: Vec<(String, Vec<Finding>)>,
    /// Positive observations from all analyzers.
    pub positives: Vec<String>,
    /// Paths whose full content was fetched.
    pub context_loaded: Vec<String>,
    /// Run fell back to diff-only mode.
    pub degraded: bool,
    /// Run budget expired before all analyzers finished.
    pub partial: bool,
    /// Run-level warnings accumulated by the dispatcher.
    pub warnings: Vec<String>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

// ── Aggregation ──────────────────────────────────────────────────

/// Fold collected analyzer runs into the final [`ReviewReport`].
pub fn aggregate(input: AggregationInput) -> ReviewReport {
    let AggregationInput {
        change_id,
        tier,
        runs,
        positives,
        context_loaded,
        degraded,
        partial,
        mut warnings,
        duration_ms,
    } = input;

    let mut findings = dedup(runs, &mut warnings);
    sort_findings(&mut findings);

    let mut dimension_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut totals = SeverityTotals::default();
    for f in &findings {
        *dimension_counts.entry(f.dimension.clone()).or_default() += 1;
        match f.severity {
            Severity::Critical => totals.critical += 1,
            Severity::High => totals.high += 1,
            Severity::Medium => totals.medium += 1,
            Severity::Low => totals.low += 1,
        }
    }

    tracing::info!(
        change = %change_id,
        findings = findings.len(),
        critical = totals.critical,
        high = totals.high,
        degraded,
        partial,
        "review aggregated"
    );

    ReviewReport {
        change_id,
        tier,
        generated_at: Utc::now(),
        duration_ms,
        findings,
        positives,
        dimension_counts,
        severity_totals: totals,
        context_loaded,
        degraded,
        partial,
        warnings,
    }
}

/// Deduplicate findings across analyzers.
///
/// Two findings are duplicates when they share (path, line, dimension) and
/// their severities differ by at most one level. The higher severity wins;
/// exact ties keep the first-seen (analyzer registration order). The kept
/// finding records every merged-away analyzer as corroboration. Severity
/// gaps of two or more levels keep both findings.
fn dedup(runs: Vec<(String, Vec<Finding>)>, warnings: &mut Vec<String>) -> Vec<Finding> {
    type Key = (String, Option<u32>, String);
    let mut kept: Vec<Finding> = Vec::new();
    let mut buckets: HashMap<Key, Vec<usize>> = HashMap::new();

    for (analyzer_id, findings) in runs {
        for f in findings {
            if !f.is_well_formed() {
                warnings.push(format!(
                    "dropped malformed finding from {analyzer_id} (missing required field)"
                ));
                continue;
            }
            let key: Key = (f.path.clone(), f.line, f.dimension.clone());
            let bucket = buckets.entry(key).or_default();

            let mut merged = false;
            for &i in bucket.iter() {
                let existing = &mut kept[i];
                let gap = existing.severity.rank().abs_diff(f.severity.rank());
                if gap > 1 {
                    continue;
                }
                if f.severity > existing.severity {
                    let mut winner = f.clone();
                    winner.corroborated_by = existing.corroborated_by.clone();
                    corroborate(&mut winner, existing.analyzer.clone());
                    *existing = winner;
                } else {
                    let by = f.analyzer.clone();
                    corroborate(existing, by);
                }
                merged = true;
                break;
            }
            if !merged {
                bucket.push(kept.len());
                kept.push(f);
            }
        }
    }

    kept
}

/// Record `analyzer` as corroborating `finding`, without self-notes or
/// duplicates.
fn corroborate(finding: &mut Finding, analyzer: String) {
    if analyzer != finding.analyzer && !finding.corroborated_by.contains(&analyzer) {
        finding.corroborated_by.push(analyzer);
    }
}

/// Total deterministic order: severity descending, path ascending, line
/// ascending with line-less findings last, then dimension and analyzer as
/// final tie-breaks.
fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| match (a.line, b.line) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.dimension.cmp(&b.dimension))
            .then_with(|| a.analyzer.cmp(&b.analyzer))
    });
}

// ── Tests ────────────────────────────────────────────────────────

//! Engine configuration: classification thresholds and time budgets.
//!
//! All thresholds are operator-tunable; the defaults below are the
//! documented reference values. Callers deserialize [`ReviewConfig`] from
//! whatever config surface they own — the engine only consumes the struct.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default: a single-file change below this many changed lines is `Simple`.
const DEFAULT_SIMPLE_MAX_LINES: u32 = 100;

/// Default: at most this many files for a `Moderate` change.
const DEFAULT_MODERATE_MAX_FILES: usize = 10;

/// Default: below this many changed lines for a `Moderate` change.
const DEFAULT_MODERATE_MAX_LINES: u32 = 500;

/// Default: a deleted file carrying more than this share of changed lines
/// marks the change as structural.
const DEFAULT_STRUCTURAL_DELETE_RATIO: f32 = 0.5;

/// Default per-analyzer time budget: 30 seconds.
const DEFAULT_ANALYZER_TIMEOUT_MS: u64 = 30_000;

/// Default aggregation margin added to the run-level budget: 5 seconds.
const DEFAULT_RUN_MARGIN_MS: u64 = 5_000;

// ── Classifier thresholds ────────────────────────────────────────

/// Thresholds for the complexity classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// `Simple` ceiling: 1 file and fewer changed lines than this.
    pub simple_max_lines: u32,
    /// `Moderate` ceiling on file count.
    pub moderate_max_files: usize,
    /// `Moderate` ceiling on changed lines (exclusive).
    pub moderate_max_lines: u32,
    /// Share of changed lines in one deleted file that makes a change
    /// structural (and therefore `Complex`).
    pub structural_delete_ratio: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_max_lines: DEFAULT_SIMPLE_MAX_LINES,
            moderate_max_files: DEFAULT_MODERATE_MAX_FILES,
            moderate_max_lines: DEFAULT_MODERATE_MAX_LINES,
            structural_delete_ratio: DEFAULT_STRUCTURAL_DELETE_RATIO,
        }
    }
}

// ── Engine configuration ─────────────────────────────────────────

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Complexity classification thresholds.
    pub classifier: ClassifierConfig,
    /// Time budget per analyzer invocation, in milliseconds.
    pub analyzer_timeout_ms: Option<u64>,
    /// Aggregation margin added on top of the summed per-task budgets to
    /// form the run-level budget, in milliseconds.
    pub run_margin_ms: Option<u64>,
}

impl ReviewConfig {
    /// Per-analyzer time budget.
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms.unwrap_or(DEFAULT_ANALYZER_TIMEOUT_MS))
    }

    /// Run-level budget: one per-task budget per spawned task plus the
    /// aggregation margin.
    pub fn run_budget(&self, task_count: usize) -> Duration {
        let margin = Duration::from_millis(self.run_margin_ms.unwrap_or(DEFAULT_RUN_MARGIN_MS));
        self.analyzer_timeout() * task_count.max(1) as u32 + margin
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let cfg = ClassifierConfig::default();
        assert_eq!(cfg.simple_max_lines, 100);
        assert_eq!(cfg.moderate_max_files, 10);
        assert_eq!(cfg.moderate_max_lines, 500);
        assert!((cfg.structural_delete_ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn run_budget_scales_with_task_count() {
        let cfg = ReviewConfig {
            analyzer_timeout_ms: Some(1_000),
            run_margin_ms: Some(500),
            ..Default::default()
        };
        assert_eq!(cfg.run_budget(3), Duration::from_millis(3_500));
        // Zero tasks still gets one budget plus the margin.
        assert_eq!(cfg.run_budget(0), Duration::from_millis(1_500));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = ReviewConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ReviewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: ReviewConfig = serde_json::from_str(r#"{"analyzer_timeout_ms": 100}"#).unwrap();
        assert_eq!(cfg.analyzer_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.classifier.moderate_max_files, 10);
    }
}

//! Complexity classification of change sets.
//!
//! [`classify`] is a pure function: same change set and thresholds always
//! yield the same tier, no I/O, no side effects. The tier drives how much
//! review depth the dispatcher buys — `Complex` runs get a full local
//! snapshot, everything else stays diff-only with lazy context fetches.
//!
//! ## Rules (checked in order)
//! 1. Exactly 1 file and fewer than `simple_max_lines` changed lines
//!    → `Simple`. This always wins, even for a lone deletion.
//! 2. Structural heuristic → `Complex`: a deleted file carries more than
//!    `structural_delete_ratio` of the changed lines, or the change spans
//!    more than one top-level path segment.
//! 3. At most `moderate_max_files` files and fewer than
//!    `moderate_max_lines` changed lines → `Moderate`.
//! 4. Everything else → `Complex` (so ≥ 500 changed lines is always
//!    `Complex` under the default thresholds, regardless of file count).

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::model::{ChangeKind, ChangeSet};

// ── Complexity tier ──────────────────────────────────────────────

/// How much review depth a change set warrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    /// Small single-file change; diff-only review.
    Simple,
    /// Multi-file but bounded change; diff-only with lazy context.
    Moderate,
    /// Large or structural change; eager full-snapshot review.
    Complex,
}

impl ComplexityTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Classification ───────────────────────────────────────────────

/// Classify a change set into a complexity tier.
pub fn classify(change: &ChangeSet, config: &ClassifierConfig) -> ComplexityTier {
    let files = change.files().len();
    let changed = change.changed_lines();

    if files == 1 && changed < config.simple_max_lines {
        return ComplexityTier::Simple;
    }

    if is_structural(change, config) {
        return ComplexityTier::Complex;
    }

    if files <= config.moderate_max_files && changed < config.moderate_max_lines {
        return ComplexityTier::Moderate;
    }

    ComplexityTier::Complex
}

/// Structural heuristic: changes that reshape the tree rather than edit it.
fn is_structural(change: &ChangeSet, config: &ClassifierConfig) -> bool {
    let total = change.changed_lines();

    // A deletion dominating the change suggests a module removal.
    if total > 0 {
        let threshold = total as f32 * config.structural_delete_ratio;
        let dominant_delete = change
            .files()
            .iter()
            .filter(|fc| fc.kind == ChangeKind::Deleted)
            .any(|fc| fc.changed() as f32 > threshold);
        if dominant_delete {
            return true;
        }
    }

    // Spanning more than one top-level path segment crosses module
    // boundaries.
    let mut top_level: Option<&str> = None;
    for fc in change.files() {
        let segment = fc.path.split('/').next().unwrap_or(fc.path.as_str());
        match top_level {
            None => top_level = Some(segment),
            Some(seen) if seen != segment => return true,
            Some(_) => {}
        }
    }

    false
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiffHunk, FileChange};

    fn hunk(added: u32, removed: u32) -> DiffHunk {
        DiffHunk { old_start: 1, removed, new_start: 1, added }
    }

    fn change_set(files: Vec<FileChange>) -> ChangeSet {
        ChangeSet::new("cs-test", "feature", "main", files).unwrap()
    }

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn single_small_file_is_simple() {
        let cs = change_set(vec![FileChange::new(
            "src/lib.rs",
            ChangeKind::Modified,
            vec![hunk(40, 59)],
        )]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Simple);
    }

    #[test]
    fn single_small_deletion_is_still_simple() {
        // The 1-file rule wins over the structural-deletion heuristic.
        let cs = change_set(vec![FileChange::new(
            "src/old.rs",
            ChangeKind::Deleted,
            vec![hunk(0, 80)],
        )]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Simple);
    }

    #[test]
    fn single_file_at_line_threshold_is_not_simple() {
        let cs = change_set(vec![FileChange::new(
            "src/lib.rs",
            ChangeKind::Modified,
            vec![hunk(100, 0)],
        )]);
        assert_ne!(classify(&cs, &cfg()), ComplexityTier::Simple);
    }

    #[test]
    fn bounded_multi_file_change_is_moderate() {
        let cs = change_set(vec![
            FileChange::new("src/a.rs", ChangeKind::Modified, vec![hunk(100, 50)]),
            FileChange::new("src/b.rs", ChangeKind::Modified, vec![hunk(100, 50)]),
            FileChange::new("src/c.rs", ChangeKind::Added, vec![hunk(100, 0)]),
        ]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Moderate);
    }

    #[test]
    fn five_hundred_lines_is_complex_regardless_of_files() {
        let cs = change_set(vec![
            FileChange::new("src/a.rs", ChangeKind::Modified, vec![hunk(250, 0)]),
            FileChange::new("src/b.rs", ChangeKind::Modified, vec![hunk(250, 0)]),
        ]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Complex);
    }

    #[test]
    fn large_fan_out_is_complex() {
        // 600 changed lines across 40 files.
        let files: Vec<FileChange> = (0..40)
            .map(|i| {
                FileChange::new(
                    format!("src/mod_{i}.rs"),
                    ChangeKind::Modified,
                    vec![hunk(15, 0)],
                )
            })
            .collect();
        let cs = change_set(files);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Complex);
    }

    #[test]
    fn dominant_deletion_is_structural() {
        let cs = change_set(vec![
            FileChange::new("src/legacy.rs", ChangeKind::Deleted, vec![hunk(0, 300)]),
            FileChange::new("src/lib.rs", ChangeKind::Modified, vec![hunk(10, 5)]),
        ]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Complex);
    }

    #[test]
    fn spanning_top_level_modules_is_structural() {
        let cs = change_set(vec![
            FileChange::new("src/a.rs", ChangeKind::Modified, vec![hunk(10, 0)]),
            FileChange::new("docs/a.md", ChangeKind::Modified, vec![hunk(10, 0)]),
        ]);
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Complex);
    }

    #[test]
    fn classification_is_deterministic() {
        let cs = change_set(vec![FileChange::new(
            "src/lib.rs",
            ChangeKind::Modified,
            vec![hunk(10, 0)],
        )]);
        // Pure function: repeated calls with the same inputs agree, and
        // different thresholds are honored.
        assert_eq!(classify(&cs, &cfg()), classify(&cs, &cfg()));
        assert_eq!(classify(&cs, &cfg()), ComplexityTier::Simple);
        let strict = ClassifierConfig { simple_max_lines: 1, ..cfg() };
        assert_eq!(classify(&cs, &strict), ComplexityTier::Moderate);
    }
}

//! Canonical in-memory model of a reviewable change set and its report.
//!
//! A [`ChangeSet`] is built once per review request and never mutated
//! afterward; analyzer tasks share it behind an `Arc`. [`Finding`]s are
//! immutable value objects produced by analyzers; the aggregator reorders
//! and dedupes them but never edits their content (corroboration notes are
//! the one aggregator-owned field). A [`ReviewReport`] is terminal output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ComplexityTier;
use crate::error::ReviewError;

// ── Severity ─────────────────────────────────────────────────────

/// Severity level for a review finding.
///
/// Derived `Ord` ranks `Critical` highest, so `max()` picks the more
/// severe of two findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational suggestion, not a blocker.
    Low,
    /// Should be addressed but not urgent.
    Medium,
    /// Important issue that should be fixed before merge.
    High,
    /// Must-fix: correctness, security, or architecture violation.
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Numeric rank for adjacency checks (`Low` = 0 … `Critical` = 3).
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Content tag ──────────────────────────────────────────────────

/// Content-type tag derived from a file path suffix.
///
/// Tags are normalized lowercase extensions (`rs`, `go`, `md`, …); files
/// without an extension get the `none` tag. The analyzer registry groups
/// extension families by registering one analyzer under several tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTag(String);

impl ContentTag {
    /// Tag for files with no recognizable extension.
    pub const NONE: &'static str = "none";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().to_ascii_lowercase())
    }

    /// Derive the tag from a path suffix.
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Self::new(ext),
            _ => Self(Self::NONE.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Diff hunks ───────────────────────────────────────────────────

/// One contiguous region of added/removed lines within a file diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// First affected line in the old version of the file.
    pub old_start: u32,
    /// Number of removed lines.
    pub removed: u32,
    /// First affected line in the new version of the file.
    pub new_start: u32,
    /// Number of added lines.
    pub added: u32,
}

impl DiffHunk {
    /// Total changed lines in this hunk.
    pub fn changed(&self) -> u32 {
        self.added + self.removed
    }
}

// ── File change ──────────────────────────────────────────────────

/// What happened to a file within a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One changed file: path, change kind, content tag, and ordered diff hunks.
///
/// Full file content is not stored here; it lives in the run-scoped context
/// cache and is fetched lazily through a
/// [`ContextHandle`](crate::context::ContextHandle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository-relative path, unique within the change set.
    pub path: String,
    /// What happened to the file.
    pub kind: ChangeKind,
    /// Content tag derived from the path suffix.
    pub tag: ContentTag,
    /// Ordered added/removed line ranges.
    pub hunks: Vec<DiffHunk>,
}

impl FileChange {
    /// Build a file change, deriving the content tag from the path.
    pub fn new(path: impl Into<String>, kind: ChangeKind, hunks: Vec<DiffHunk>) -> Self {
        let path = path.into();
        let tag = ContentTag::from_path(&path);
        Self { path, kind, tag, hunks }
    }

    /// Total added lines across all hunks.
    pub fn added(&self) -> u32 {
        self.hunks.iter().map(|h| h.added).sum()
    }

    /// Total removed lines across all hunks.
    pub fn removed(&self) -> u32 {
        self.hunks.iter().map(|h| h.removed).sum()
    }

    /// Total changed (added + removed) lines.
    pub fn changed(&self) -> u32 {
        self.added() + self.removed()
    }
}

// ── Change set ───────────────────────────────────────────────────

/// The unit of review: a set of file modifications between two references.
///
/// Immutable once constructed: fields are private and exposed through
/// read-only accessors, so the constructor's validation (non-empty,
/// unique paths) holds for the whole run.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    id: String,
    source_ref: String,
    target_ref: String,
    files: Vec<FileChange>,
}

impl ChangeSet {
    /// Validate and build a change set.
    ///
    /// Rejects empty file lists and duplicate paths before any dispatch
    /// work happens.
    pub fn new(
        id: impl Into<String>,
        source_ref: impl Into<String>,
        target_ref: impl Into<String>,
        files: Vec<FileChange>,
    ) -> Result<Self, ReviewError> {
        if files.is_empty() {
            return Err(ReviewError::EmptyChangeSet);
        }
        let mut seen = std::collections::HashSet::new();
        for fc in &files {
            if !seen.insert(fc.path.as_str()) {
                return Err(ReviewError::DuplicatePath(fc.path.clone()));
            }
        }
        Ok(Self {
            id: id.into(),
            source_ref: source_ref.into(),
            target_ref: target_ref.into(),
            files,
        })
    }

    /// Caller-supplied identifier (PR number, revision id, …).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reference the change was made from (the side being reviewed).
    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    /// Reference the change targets.
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Ordered file changes; paths are unique.
    pub fn files(&self) -> &[FileChange] {
        &self.files
    }

    /// Total added lines across all files.
    pub fn lines_added(&self) -> u32 {
        self.files.iter().map(FileChange::added).sum()
    }

    /// Total removed lines across all files.
    pub fn lines_removed(&self) -> u32 {
        self.files.iter().map(FileChange::removed).sum()
    }

    /// Total changed (added + removed) lines.
    pub fn changed_lines(&self) -> u32 {
        self.lines_added() + self.lines_removed()
    }
}

// ── Finding ──────────────────────────────────────────────────────

/// A single issue or observation produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity of this finding.
    pub severity: Severity,
    /// Analyzer-defined dimension label (e.g. "security", "nullability").
    pub dimension: String,
    /// File this finding relates to.
    pub path: String,
    /// Line number in the new version of the file, if known.
    pub line: Option<u32>,
    /// Human-readable description of the issue.
    pub description: String,
    /// Suggested fix or improvement, if any.
    pub suggestion: Option<String>,
    /// Identifier of the analyzer that produced this finding.
    pub analyzer: String,
    /// Analyzers that independently reported the same issue.
    ///
    /// Filled in by the aggregator during deduplication; analyzers leave
    /// this empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corroborated_by: Vec<String>,
}

impl Finding {
    /// Build a finding with the optional fields empty.
    pub fn new(
        severity: Severity,
        dimension: impl Into<String>,
        path: impl Into<String>,
        description: impl Into<String>,
        analyzer: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            dimension: dimension.into(),
            path: path.into(),
            line: None,
            description: description.into(),
            suggestion: None,
            analyzer: analyzer.into(),
            corroborated_by: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether all required fields are present.
    ///
    /// Malformed findings are dropped by the aggregator with a run-level
    /// warning instead of failing the report.
    pub fn is_well_formed(&self) -> bool {
        !self.dimension.is_empty()
            && !self.path.is_empty()
            && !self.description.is_empty()
            && !self.analyzer.is_empty()
    }
}

// ── Review report ────────────────────────────────────────────────

/// Finding totals per severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTotals {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityTotals {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Terminal output of a review run.
///
/// Always produced for a valid change set, possibly flagged
/// `degraded` (no full snapshot) or `partial` (run budget exceeded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    /// Identifier of the reviewed change set.
    pub change_id: String,
    /// Complexity tier the run was classified as.
    pub tier: ComplexityTier,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Deduplicated findings, ordered by severity, then path, then line.
    pub findings: Vec<Finding>,
    /// Positive observations reported by analyzers.
    pub positives: Vec<String>,
    /// Finding counts per dimension label.
    pub dimension_counts: std::collections::BTreeMap<String, usize>,
    /// Finding counts per severity.
    pub severity_totals: SeverityTotals,
    /// Paths whose full content was fetched during the run.
    pub context_loaded: Vec<String>,
    /// Review fell back to diff-only mode (no full snapshot).
    pub degraded: bool,
    /// Run budget expired; report built from completed analyzers only.
    pub partial: bool,
    /// Run-level warnings (analyzer failures, dropped findings, …).
    pub warnings: Vec<String>,
}

impl ReviewReport {
    /// Count findings at one severity level.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Whether the report has any critical or high severity findings.
    pub fn has_blockers(&self) -> bool {
        self.findings
            .iter()
            .any(|f| matches!(f.severity, Severity::Critical | Severity::High))
    }
}

// ── Tests ────────────────────────────────────────────────────────

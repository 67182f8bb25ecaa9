//! Error taxonomy for the review engine.
//!
//! Only input errors ([`ReviewError`]) ever reach the caller of
//! [`ReviewEngine::review`](crate::dispatch::ReviewEngine::review) as a hard
//! failure. Collaborator and analyzer errors degrade into report content
//! (synthesized findings, warnings, `degraded`/`partial` flags) instead.

use thiserror::Error;

// ── Input errors ─────────────────────────────────────────────────

/// A change set that cannot be reviewed at all.
///
/// Raised before dispatch; no partial report is produced.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The change set contains no file changes.
    #[error("change set is empty")]
    EmptyChangeSet,
    /// Two file changes share the same path.
    #[error("duplicate path in change set: {0}")]
    DuplicatePath(String),
}

// ── Context loader errors ────────────────────────────────────────

/// Failure to fetch full file content.
///
/// `Clone` because the loader caches the first outcome per (path, reference)
/// key and replays it to later callers without re-fetching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The file does not exist at the given reference.
    #[error("file not found: {path}@{reference}")]
    NotFound { path: String, reference: String },
    /// The content source refused access.
    #[error("access denied: {path}@{reference}")]
    AccessDenied { path: String, reference: String },
    /// The path is outside the requesting analyzer's partition.
    #[error("path outside analyzer partition: {0}")]
    OutOfScope(String),
    /// Any other transport-level failure from the content source.
    #[error("content fetch failed: {0}")]
    Transport(String),
}

// ── Snapshot errors ──────────────────────────────────────────────

/// Failure to materialize a full local snapshot of the change.
///
/// Any of these puts the run into degraded (diff-only) mode; none of them
/// aborts the review.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot source cannot serve this reference pair right now.
    #[error("snapshot source unavailable: {0}")]
    Unavailable(String),
    /// The reference pair cannot be combined into a consistent tree.
    #[error("snapshot conflict: {0}")]
    Conflict(String),
    /// The materialized tree does not match the declared change set.
    #[error("snapshot inconsistent with change set: {0}")]
    Inconsistent(String),
    /// No snapshot source is configured on the engine.
    #[error("no snapshot source configured")]
    NotConfigured,
}

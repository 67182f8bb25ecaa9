//! Full local snapshot materialization for `Complex`-tier runs.
//!
//! Static-analysis-grade review needs the whole changed tree, not a diff
//! view. The [`PatchMaterializer`] asks its [`SnapshotSource`] collaborator
//! for a local tree and then verifies the tree against the declared change
//! set. Either the snapshot fully checks out or the materializer fails
//! cleanly — the dispatcher then drops to diff-only review and flags the
//! report `degraded`, never silently.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SnapshotError;
use crate::model::{ChangeKind, ChangeSet};

// ── Snapshot source collaborator ─────────────────────────────────

/// Collaborator that produces a local tree for a reference pair.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Materialize the changed tree for `source_ref` applied onto
    /// `target_ref`; returns the local root directory.
    async fn materialize(
        &self,
        source_ref: &str,
        target_ref: &str,
    ) -> Result<PathBuf, SnapshotError>;
}

// ── Patch materializer ───────────────────────────────────────────

/// Obtains and verifies a full local snapshot of a change set.
pub struct PatchMaterializer {
    source: Arc<dyn SnapshotSource>,
}

impl PatchMaterializer {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self { source }
    }

    /// Materialize a snapshot consistent with `change`.
    ///
    /// Consistency check: every changed path that still exists after the
    /// change (anything not deleted) must be present under the returned
    /// root. A missing path means the snapshot does not describe the
    /// declared change set and the whole materialization fails.
    pub async fn materialize(&self, change: &ChangeSet) -> Result<PathBuf, SnapshotError> {
        let root = self
            .source
            .materialize(change.source_ref(), change.target_ref())
            .await?;

        for fc in change.files() {
            if fc.kind == ChangeKind::Deleted {
                continue;
            }
            let path = root.join(&fc.path);
            if tokio::fs::metadata(&path).await.is_err() {
                return Err(SnapshotError::Inconsistent(format!(
                    "changed file missing from snapshot: {}",
                    fc.path
                )));
            }
        }

        tracing::debug!(
            change = %change.id(),
            root = %root.display(),
            files = change.files().len(),
            "snapshot materialized and verified"
        );
        Ok(root)
    }
}

// ── Tests ────────────────────────────────────────────────────────

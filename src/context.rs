//! Lazy, cached full-file content access for analyzers.
//!
//! Diff hunks are often not enough (a signature cut off mid-hunk, a
//! cross-file relationship); analyzers then ask the [`ContextLoader`] for
//! the full file. The loader is created fresh per review run and never
//! pre-fetches — tiered review depth depends on fetching only when unsure.
//!
//! ## Single-flight cache
//! The cache is keyed by (path, reference). Each key owns one
//! `tokio::sync::OnceCell`; concurrent callers of the same key await the
//! same in-flight fetch, so the underlying [`ContentSource`] sees exactly
//! one call per key per run. The first outcome — success or failure — is
//! cached and replayed; a key is never re-fetched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::error::ContextError;

// ── Content source collaborator ──────────────────────────────────

/// Collaborator that serves full file content at a reference.
///
/// Transport is out of scope here; implementations may shell out to a
/// forge API, a local checkout, or anything else.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the raw bytes of `path` at `reference`.
    async fn fetch_file(&self, path: &str, reference: &str) -> Result<Vec<u8>, ContextError>;
}

// ── Context loader ───────────────────────────────────────────────

type Slot = Arc<OnceCell<Result<Arc<str>, ContextError>>>;

/// Run-scoped, single-flight cache over a [`ContentSource`].
pub struct ContextLoader {
    source: Arc<dyn ContentSource>,
    cache: Mutex<HashMap<(String, String), Slot>>,
}

impl ContextLoader {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Full content of `path` at `reference`.
    ///
    /// Idempotent per key within the run: repeated and concurrent calls
    /// share one underlying fetch and one cached outcome. Content is
    /// decoded lossily, so near-UTF-8 files still yield reviewable text.
    pub async fn fetch(&self, path: &str, reference: &str) -> Result<Arc<str>, ContextError> {
        let slot = {
            let mut cache = self.cache.lock();
            cache
                .entry((path.to_string(), reference.to_string()))
                .or_default()
                .clone()
        };

        slot.get_or_init(|| async {
            tracing::debug!(path, reference, "fetching full file content");
            match self.source.fetch_file(path, reference).await {
                Ok(bytes) => Ok(Arc::from(String::from_utf8_lossy(&bytes).into_owned())),
                Err(e) => {
                    tracing::warn!(path, reference, error = %e, "context fetch failed");
                    Err(e)
                }
            }
        })
        .await
        .clone()
    }

    /// Paths whose content was successfully fetched during this run,
    /// sorted for deterministic reporting.
    pub fn loaded_paths(&self) -> Vec<String> {
        let cache = self.cache.lock();
        let mut paths: Vec<String> = cache
            .iter()
            .filter(|(_, slot)| matches!(slot.get(), Some(Ok(_))))
            .map(|((path, _), _)| path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

// ── Partition-scoped handle ──────────────────────────────────────

/// Loader view handed to one analyzer invocation.
///
/// Scoped to the paths of the analyzer's partition; requests outside the
/// scope fail with [`ContextError::OutOfScope`] instead of fetching.
#[derive(Clone)]
pub struct ContextHandle {
    loader: Arc<ContextLoader>,
    reference: Arc<str>,
    scope: Arc<std::collections::HashSet<String>>,
}

impl ContextHandle {
    pub fn new(
        loader: Arc<ContextLoader>,
        reference: impl Into<Arc<str>>,
        scope: Arc<std::collections::HashSet<String>>,
    ) -> Self {
        Self {
            loader,
            reference: reference.into(),
            scope,
        }
    }

    /// Full content of a file in this analyzer's partition, at the run's
    /// source reference.
    pub async fn full_file(&self, path: &str) -> Result<Arc<str>, ContextError> {
        if !self.scope.contains(path) {
            return Err(ContextError::OutOfScope(path.to_string()));
        }
        self.loader.fetch(path, &self.reference).await
    }

    /// Paths this handle may fetch.
    pub fn scope(&self) -> impl Iterator<Item = &str> {
        self.scope.iter().map(String::as_str)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts underlying fetches; sleeps a little so concurrent callers
    /// overlap in flight.
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn fetch_file(&self, path: &str, reference: &str) -> Result<Vec<u8>, ContextError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(ContextError::NotFound {
                    path: path.to_string(),
                    reference: reference.to_string(),
                });
            }
            Ok(format!("contents of {path}@{reference}").into_bytes())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_fetches_share_one_call() {
        let source = CountingSource::new(false);
        let loader = Arc::new(ContextLoader::new(source.clone()));

        let (a, b) = tokio::join!(
            loader.fetch("src/a.rs", "feature"),
            loader.fetch("src/a.rs", "feature"),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_separately() {
        let source = CountingSource::new(false);
        let loader = ContextLoader::new(source.clone());

        loader.fetch("src/a.rs", "feature").await.unwrap();
        loader.fetch("src/b.rs", "feature").await.unwrap();
        loader.fetch("src/a.rs", "main").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_are_cached_and_never_refetched() {
        let source = CountingSource::new(true);
        let loader = ContextLoader::new(source.clone());

        let first = loader.fetch("gone.rs", "feature").await.unwrap_err();
        let second = loader.fetch("gone.rs", "feature").await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(loader.loaded_paths().is_empty());
    }

    #[tokio::test]
    async fn loaded_paths_lists_successes_sorted() {
        let source = CountingSource::new(false);
        let loader = ContextLoader::new(source);

        loader.fetch("src/z.rs", "feature").await.unwrap();
        loader.fetch("src/a.rs", "feature").await.unwrap();
        assert_eq!(loader.loaded_paths(), vec!["src/a.rs", "src/z.rs"]);
    }

    #[tokio::test]
    async fn handle_rejects_out_of_scope_paths() {
        let source = CountingSource::new(false);
        let loader = Arc::new(ContextLoader::new(source.clone()));
        let scope: Arc<HashSet<String>> =
            Arc::new(["src/a.rs".to_string()].into_iter().collect());
        let handle = ContextHandle::new(loader, "feature", scope);

        handle.full_file("src/a.rs").await.unwrap();
        let err = handle.full_file("src/secret.rs").await.unwrap_err();
        assert!(matches!(err, ContextError::OutOfScope(p) if p == "src/secret.rs"));
        // The out-of-scope request never reached the source.
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}

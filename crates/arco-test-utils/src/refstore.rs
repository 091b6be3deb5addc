//! Reference store with operation tracing and failure injection.
//!
//! Wraps [`MemoryRefStore`] and records every call for test assertions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arco_core::error::{Error, Result};
use arco_core::{
    BranchRef, CommitMeta, Content, ContentKey, Entry, LogEntry, MemoryRefStore,
    NO_ANCESTOR_HASH, Operation, ReferenceStore,
};

/// Record of a reference-store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefStoreOp {
    /// Default branch lookup.
    DefaultBranch,
    /// Branch lookup.
    GetReference {
        /// Branch name.
        name: String,
    },
    /// Content read.
    GetContent {
        /// Rendered key.
        key: String,
        /// Hash read at.
        hash: String,
    },
    /// Entry listing.
    ListEntries {
        /// Prefix listed.
        prefix: Vec<String>,
        /// Hash read at.
        hash: String,
    },
    /// Commit attempt.
    Commit {
        /// Branch.
        branch: String,
        /// Expected hash.
        expected_hash: String,
        /// Operations sent.
        operations: Vec<Operation>,
    },
    /// Branch creation.
    CreateBranch {
        /// New branch name.
        name: String,
    },
}

/// Store call that an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `default_branch`.
    DefaultBranch,
    /// `get_reference`.
    GetReference,
    /// `get_content`.
    GetContent,
    /// `list_entries`.
    ListEntries,
    /// `commit`.
    Commit,
    /// Every call.
    All,
}

/// In-memory reference store with operation tracing.
#[derive(Debug, Clone, Default)]
pub struct TracingRefStore {
    inner: MemoryRefStore,
    operations: Arc<Mutex<Vec<RefStoreOp>>>,
    failures: Arc<Mutex<Vec<FailurePoint>>>,
    pending_conflicts: Arc<Mutex<usize>>,
    latency: Option<Duration>,
}

impl TracingRefStore {
    /// Creates a store with an empty `main` branch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose default branch has the given name.
    #[must_use]
    pub fn with_default_branch(name: impl Into<String>) -> Self {
        Self {
            inner: MemoryRefStore::with_default_branch(name),
            ..Self::default()
        }
    }

    /// Creates a store that sleeps before each call.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &MemoryRefStore {
        &self.inner
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<RefStoreOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Returns the recorded commit attempts.
    #[must_use]
    pub fn commits(&self) -> Vec<RefStoreOp> {
        self.operations()
            .into_iter()
            .filter(|op| matches!(op, RefStoreOp::Commit { .. }))
            .collect()
    }

    /// Returns how many times the default branch was looked up.
    #[must_use]
    pub fn default_branch_calls(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, RefStoreOp::DefaultBranch))
            .count()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Makes calls at `point` fail with a transport error until cleared.
    pub fn inject_failure(&self, point: FailurePoint) {
        self.failures.lock().expect("lock").push(point);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock").clear();
    }

    /// Makes the next `count` commits fail as if another writer had moved
    /// the branch first. Nothing is applied.
    pub fn inject_conflicts(&self, count: usize) {
        *self.pending_conflicts.lock().expect("lock") += count;
    }

    /// Returns the current hash of a branch, bypassing tracing.
    #[must_use]
    pub fn head(&self, branch: &str) -> Option<String> {
        let log = self.inner.commit_log(branch).ok()?;
        Some(
            log.first()
                .map_or_else(|| NO_ANCESTOR_HASH.to_string(), |entry| entry.hash.clone()),
        )
    }

    /// Returns the commit history of a branch, newest first.
    #[must_use]
    pub fn commit_log(&self, branch: &str) -> Vec<LogEntry> {
        self.inner.commit_log(branch).unwrap_or_default()
    }

    fn record(&self, op: RefStoreOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, point: FailurePoint) -> Result<()> {
        let failures = self.failures.lock().expect("lock");
        if failures
            .iter()
            .any(|p| *p == point || *p == FailurePoint::All)
        {
            return Err(Error::transport(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        let mut pending = self.pending_conflicts.lock().expect("lock");
        if *pending > 0 {
            *pending -= 1;
            true
        } else {
            false
        }
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl ReferenceStore for TracingRefStore {
    async fn default_branch(&self) -> Result<String> {
        self.maybe_delay().await;
        self.record(RefStoreOp::DefaultBranch);
        self.check_failure(FailurePoint::DefaultBranch)?;
        self.inner.default_branch().await
    }

    async fn get_reference(&self, name: &str) -> Result<BranchRef> {
        self.maybe_delay().await;
        self.record(RefStoreOp::GetReference {
            name: name.to_string(),
        });
        self.check_failure(FailurePoint::GetReference)?;
        self.inner.get_reference(name).await
    }

    async fn get_content(&self, key: &ContentKey, hash: &str) -> Result<Option<Content>> {
        self.maybe_delay().await;
        self.record(RefStoreOp::GetContent {
            key: key.to_string(),
            hash: hash.to_string(),
        });
        self.check_failure(FailurePoint::GetContent)?;
        self.inner.get_content(key, hash).await
    }

    async fn list_entries(&self, prefix: &[String], hash: &str) -> Result<Vec<Entry>> {
        self.maybe_delay().await;
        self.record(RefStoreOp::ListEntries {
            prefix: prefix.to_vec(),
            hash: hash.to_string(),
        });
        self.check_failure(FailurePoint::ListEntries)?;
        self.inner.list_entries(prefix, hash).await
    }

    async fn commit(
        &self,
        branch: &str,
        expected_hash: &str,
        meta: CommitMeta,
        operations: Vec<Operation>,
    ) -> Result<BranchRef> {
        self.maybe_delay().await;
        self.record(RefStoreOp::Commit {
            branch: branch.to_string(),
            expected_hash: expected_hash.to_string(),
            operations: operations.clone(),
        });
        self.check_failure(FailurePoint::Commit)?;
        if self.take_conflict() {
            return Err(Error::ReferenceConflict {
                name: branch.to_string(),
                expected: expected_hash.to_string(),
                actual: "injected-concurrent-commit".to_string(),
            });
        }
        self.inner
            .commit(branch, expected_hash, meta, operations)
            .await
    }

    async fn create_branch(&self, name: &str, from: &BranchRef) -> Result<BranchRef> {
        self.record(RefStoreOp::CreateBranch {
            name: name.to_string(),
        });
        self.inner.create_branch(name, from).await
    }
}

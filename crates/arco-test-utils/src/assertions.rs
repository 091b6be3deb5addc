//! Assertion helpers for catalog tests.

use arco_core::Operation;
use arco_nessie::CatalogError;

use crate::refstore::{RefStoreOp, TracingRefStore};

/// Asserts that an error is a retryable commit conflict.
///
/// # Panics
///
/// Panics if the error is anything else.
pub fn assert_commit_conflict(err: &CatalogError) {
    assert!(
        matches!(err, CatalogError::CommitConflict { .. }),
        "Expected CommitConflict, got {err:?}"
    );
    assert!(err.is_retryable(), "CommitConflict must be retryable");
}

/// Asserts that a branch has exactly `expected` commits.
///
/// # Panics
///
/// Panics if the count differs.
pub fn assert_commit_count(store: &TracingRefStore, branch: &str, expected: usize) {
    let log = store.commit_log(branch);
    assert_eq!(
        log.len(),
        expected,
        "Expected {expected} commits on {branch}, found {}",
        log.len()
    );
}

/// Returns the operations of every commit attempt sent to the store.
#[must_use]
pub fn attempted_operations(store: &TracingRefStore) -> Vec<Vec<Operation>> {
    store
        .commits()
        .into_iter()
        .filter_map(|op| match op {
            RefStoreOp::Commit { operations, .. } => Some(operations),
            _ => None,
        })
        .collect()
}

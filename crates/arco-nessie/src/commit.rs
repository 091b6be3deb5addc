//! Hash-guarded commits against a branch.
//!
//! A commit attempt starts from a resolved branch (name plus the hash read
//! moments earlier) and sends its operations as one conditional commit. The
//! store applies all of them or none. The attempt ends in exactly one
//! [`CommitOutcome`]; a failed attempt is never retried here. Retrying means
//! resolving the branch again and building a new attempt.

use std::sync::Arc;

use tracing::Instrument;

use arco_core::{
    BranchRef, CommitMeta, Content, ContentKey, Error as StoreError, Operation, ReferenceStore,
    commit_span,
};

use crate::error::{CatalogError, CatalogResult};
use crate::metrics;

/// Commit property marking commits written by an Iceberg catalog.
pub const APPLICATION_TYPE_PROPERTY: &str = "application-type";

/// Value of [`APPLICATION_TYPE_PROPERTY`].
pub const APPLICATION_TYPE_ICEBERG: &str = "iceberg";

/// A commit ready to be sent: the resolved branch, a message, and the
/// operations to apply in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAttempt {
    branch: BranchRef,
    operation: String,
    message: String,
    operations: Vec<Operation>,
}

impl CommitAttempt {
    /// Starts an attempt against `branch` for the named catalog operation.
    #[must_use]
    pub fn new(branch: BranchRef, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            branch,
            operation: operation.into(),
            message: message.into(),
            operations: Vec::new(),
        }
    }

    /// Appends a `Put`.
    #[must_use]
    pub fn put(mut self, key: ContentKey, content: Content) -> Self {
        self.operations.push(Operation::Put { key, content });
        self
    }

    /// Appends a `Delete`.
    #[must_use]
    pub fn delete(mut self, key: ContentKey) -> Self {
        self.operations.push(Operation::Delete { key });
        self
    }

    /// Returns the branch and expected hash.
    #[must_use]
    pub const fn branch(&self) -> &BranchRef {
        &self.branch
    }

    /// Returns the catalog operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the operations.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

/// Terminal state of one commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The branch advanced to the returned reference.
    Committed(BranchRef),
    /// The branch moved past the expected hash.
    Conflicted {
        /// Branch name.
        branch: String,
        /// Hash the attempt expected.
        expected: String,
        /// Hash the branch was at.
        actual: String,
    },
    /// A `Delete` targeted a key absent at the expected hash.
    NotFound {
        /// Rendered key.
        key: String,
    },
    /// The branch no longer exists.
    BranchMissing {
        /// Branch name.
        branch: String,
    },
    /// The attempt was malformed and never applied.
    Rejected {
        /// Reason.
        message: String,
    },
    /// The store failed or could not be reached.
    Unavailable {
        /// Reason.
        message: String,
    },
}

impl CommitOutcome {
    /// Returns the metric label of this outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Committed(_) => "committed",
            Self::Conflicted { .. } => "conflicted",
            Self::NotFound { .. } => "not_found",
            Self::BranchMissing { .. } => "branch_missing",
            Self::Rejected { .. } => "rejected",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    /// Converts the outcome into the new branch reference or a catalog error.
    ///
    /// # Errors
    ///
    /// Each failure state maps to its own error kind: `CommitConflict`,
    /// `NoSuchTable`, `NoSuchBranch`, `InvalidArgument`, `CatalogUnavailable`.
    pub fn into_result(self) -> CatalogResult<BranchRef> {
        match self {
            Self::Committed(reference) => Ok(reference),
            Self::Conflicted {
                branch,
                expected,
                actual,
            } => Err(CatalogError::commit_conflict(format!(
                "Branch {branch} moved: expected hash {expected}, found {actual}"
            ))),
            Self::NotFound { key } => Err(CatalogError::table_not_found(key)),
            Self::BranchMissing { branch } => Err(CatalogError::branch_not_found(branch)),
            Self::Rejected { message } => Err(CatalogError::invalid_argument(message)),
            Self::Unavailable { message } => Err(CatalogError::unavailable(message)),
        }
    }
}

impl From<StoreError> for CommitOutcome {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ReferenceConflict {
                name,
                expected,
                actual,
            } => Self::Conflicted {
                branch: name,
                expected,
                actual,
            },
            StoreError::ContentNotFound { key } => Self::NotFound { key },
            StoreError::ReferenceNotFound { name } => Self::BranchMissing { branch: name },
            StoreError::InvalidInput(message) => Self::Rejected { message },
            other @ (StoreError::Transport { .. }
            | StoreError::ReferenceAlreadyExists { .. }
            | StoreError::UnknownHash { .. }
            | StoreError::Serialization { .. }
            | StoreError::Internal { .. }) => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Sends commit attempts to the reference store.
#[derive(Clone)]
pub struct CommitOrchestrator {
    store: Arc<dyn ReferenceStore>,
    author: Option<String>,
}

impl std::fmt::Debug for CommitOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitOrchestrator")
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

impl CommitOrchestrator {
    /// Creates an orchestrator that records `author` on every commit.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>, author: Option<String>) -> Self {
        Self { store, author }
    }

    /// Runs one attempt to its terminal state.
    pub async fn attempt(&self, attempt: CommitAttempt) -> CommitOutcome {
        let CommitAttempt {
            branch,
            operation,
            message,
            operations,
        } = attempt;
        let span = commit_span(&branch.name, &branch.hash, operations.len());

        let outcome = async {
            if operations.is_empty() {
                return CommitOutcome::Rejected {
                    message: format!("{operation}: commit must contain at least one operation"),
                };
            }
            let meta = CommitMeta::new(message)
                .with_author(self.author.clone())
                .with_property(APPLICATION_TYPE_PROPERTY, APPLICATION_TYPE_ICEBERG);
            match self
                .store
                .commit(&branch.name, &branch.hash, meta, operations)
                .await
            {
                Ok(reference) => CommitOutcome::Committed(reference),
                Err(err) => CommitOutcome::from(err),
            }
        }
        .instrument(span)
        .await;

        metrics::record_commit(&operation, outcome.label());
        match &outcome {
            CommitOutcome::Committed(reference) => {
                tracing::info!(
                    operation = %operation,
                    branch = %reference.name,
                    from_hash = %branch.hash,
                    to_hash = %reference.hash,
                    "commit applied"
                );
            }
            CommitOutcome::Conflicted { actual, .. } => {
                metrics::record_conflict(&operation);
                tracing::info!(
                    operation = %operation,
                    branch = %branch.name,
                    expected_hash = %branch.hash,
                    actual_hash = %actual,
                    "commit conflict"
                );
            }
            CommitOutcome::Unavailable { message } => {
                tracing::warn!(operation = %operation, branch = %branch.name, error = %message, "commit failed");
            }
            other => {
                tracing::debug!(operation = %operation, branch = %branch.name, outcome = other.label(), "commit not applied");
            }
        }
        outcome
    }

    /// Runs one attempt and converts its outcome.
    ///
    /// # Errors
    ///
    /// See [`CommitOutcome::into_result`].
    pub async fn commit(&self, attempt: CommitAttempt) -> CatalogResult<BranchRef> {
        self.attempt(attempt).await.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arco_core::{IcebergTable, MemoryRefStore};

    fn key(name: &str) -> ContentKey {
        ContentKey::of(&["db".to_string()], name).expect("key")
    }

    fn table(location: &str) -> Content {
        Content::IcebergTable(IcebergTable {
            id: "t-1".to_string(),
            metadata_location: location.to_string(),
            snapshot_id: None,
            schema_id: 0,
            spec_id: 0,
            sort_order_id: 0,
        })
    }

    async fn setup() -> (MemoryRefStore, CommitOrchestrator, BranchRef) {
        let store = MemoryRefStore::new();
        let orchestrator = CommitOrchestrator::new(Arc::new(store.clone()), Some("tester".into()));
        let main = store.get_reference("main").await.expect("main");
        (store, orchestrator, main)
    }

    #[tokio::test]
    async fn test_commit_advances_branch() {
        let (store, orchestrator, main) = setup().await;
        let attempt = CommitAttempt::new(main.clone(), "create_table", "create db.orders")
            .put(key("orders"), table("s3://b/m1"));
        let new_ref = orchestrator.commit(attempt).await.expect("commit");
        assert_ne!(new_ref.hash, main.hash);
        assert_eq!(store.get_reference("main").await.expect("main"), new_ref);

        let log = store.commit_log("main").expect("log");
        assert_eq!(log[0].meta.author.as_deref(), Some("tester"));
        assert_eq!(
            log[0].meta.properties.get(APPLICATION_TYPE_PROPERTY).map(String::as_str),
            Some(APPLICATION_TYPE_ICEBERG)
        );
    }

    #[tokio::test]
    async fn test_stale_hash_conflicts() {
        let (store, orchestrator, main) = setup().await;
        orchestrator
            .commit(CommitAttempt::new(main.clone(), "create_table", "first").put(key("a"), table("s3://b/a")))
            .await
            .expect("first");
        let head = store.get_reference("main").await.expect("main");

        let outcome = orchestrator
            .attempt(CommitAttempt::new(main.clone(), "create_table", "second").put(key("b"), table("s3://b/b")))
            .await;
        assert!(matches!(outcome, CommitOutcome::Conflicted { .. }));
        let err = outcome.into_result().expect_err("conflict");
        assert!(matches!(err, CatalogError::CommitConflict { .. }));
        assert_eq!(store.get_reference("main").await.expect("main"), head);
    }

    #[tokio::test]
    async fn test_delete_missing_is_no_such_table() {
        let (_, orchestrator, main) = setup().await;
        let err = orchestrator
            .commit(CommitAttempt::new(main, "drop_table", "drop").delete(key("ghost")))
            .await
            .expect_err("missing");
        assert!(matches!(err, CatalogError::NoSuchTable { .. }));
    }

    #[tokio::test]
    async fn test_empty_attempt_never_reaches_store() {
        let (store, orchestrator, main) = setup().await;
        let outcome = orchestrator
            .attempt(CommitAttempt::new(main.clone(), "noop", "nothing"))
            .await;
        assert_eq!(outcome.label(), "rejected");
        assert!(matches!(
            outcome.into_result(),
            Err(CatalogError::InvalidArgument { .. })
        ));
        assert!(store.commit_log("main").expect("log").is_empty());
    }

    #[tokio::test]
    async fn test_missing_branch() {
        let (_, orchestrator, _) = setup().await;
        let gone = BranchRef::new("gone", "abc");
        let err = orchestrator
            .commit(CommitAttempt::new(gone, "drop_table", "drop").delete(key("t")))
            .await
            .expect_err("missing branch");
        assert_eq!(err, CatalogError::branch_not_found("gone"));
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            CommitOutcome::from(StoreError::transport("reset")).label(),
            "unavailable"
        );
        assert_eq!(
            CommitOutcome::from(StoreError::UnknownHash { hash: "x".into() }).label(),
            "unavailable"
        );
        assert_eq!(
            CommitOutcome::from(StoreError::ContentNotFound { key: "db.t".into() }),
            CommitOutcome::NotFound { key: "db.t".into() }
        );
    }
}

//! Reference store abstraction (Nessie-style version control for catalog content).
//!
//! The contract has three primitives:
//! - Resolve a branch to its current hash
//! - Read content at an immutable hash
//! - Commit a batch of operations conditionally on the branch still being at
//!   an expected hash (compare-and-swap on the branch head)
//!
//! A commit either applies all of its operations or none of them. A stale
//! expected hash is reported as [`Error::ReferenceConflict`], never applied.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::content::{Content, ContentKey, ContentType};
use crate::error::{Error, Result};

/// Hash of the empty commit every branch starts from.
pub const NO_ANCESTOR_HASH: &str =
    "2e1cfa82b035c26cbbbdae632cea070514eb8b773f616aaeaf668e2f0be8f10d";

/// Default branch name for a freshly created store.
pub const DEFAULT_BRANCH: &str = "main";

/// A branch and the hash it pointed at when it was read.
///
/// The hash is a point-in-time read: it is only meaningful as the expected
/// hash of a subsequent commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,
    /// Commit hash the branch pointed at.
    pub hash: String,
}

impl BranchRef {
    /// Creates a branch reference.
    #[must_use]
    pub fn new(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
        }
    }
}

/// Metadata recorded with every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Commit message.
    pub message: String,
    /// Author, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Time the commit was authored.
    pub author_time: DateTime<Utc>,
    /// Free-form commit properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl CommitMeta {
    /// Creates commit metadata with the given message, authored now.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author: None,
            author_time: Utc::now(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Adds a commit property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A single mutation inside a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Store `content` at `key`, replacing any existing content.
    Put {
        /// Target key.
        key: ContentKey,
        /// Content to store.
        content: Content,
    },
    /// Remove the content at `key`. Fails the whole commit if absent.
    Delete {
        /// Target key.
        key: ContentKey,
    },
}

impl Operation {
    /// Returns the key this operation targets.
    #[must_use]
    pub const fn key(&self) -> &ContentKey {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// An entry returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry key.
    pub key: ContentKey,
    /// Entry content kind.
    pub content_type: ContentType,
}

/// One commit in a branch's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Commit hash.
    pub hash: String,
    /// Parent commit hash.
    pub parent_hash: String,
    /// Commit metadata.
    pub meta: CommitMeta,
    /// Operations applied by the commit.
    pub operations: Vec<Operation>,
}

/// Client contract for a version-controlled reference store.
///
/// Implementations report failures in the store's own vocabulary
/// ([`Error`]); catalog layers translate them.
#[async_trait]
pub trait ReferenceStore: Send + Sync + 'static {
    /// Returns the name of the store's default branch.
    async fn default_branch(&self) -> Result<String>;

    /// Resolves a branch to its current hash.
    ///
    /// Returns `Error::ReferenceNotFound` if the branch is unknown.
    async fn get_reference(&self, name: &str) -> Result<BranchRef>;

    /// Reads the content stored at `key` as of `hash`.
    ///
    /// Returns `None` if the key has no content at that hash.
    async fn get_content(&self, key: &ContentKey, hash: &str) -> Result<Option<Content>>;

    /// Lists all entries strictly below `prefix` as of `hash`, sorted by key.
    async fn list_entries(&self, prefix: &[String], hash: &str) -> Result<Vec<Entry>>;

    /// Applies `operations` atomically on `branch` if it is still at
    /// `expected_hash`, returning the branch at its new hash.
    ///
    /// Returns `Error::ReferenceConflict` if the branch has moved and
    /// `Error::ContentNotFound` if a `Delete` targets a missing key.
    async fn commit(
        &self,
        branch: &str,
        expected_hash: &str,
        meta: CommitMeta,
        operations: Vec<Operation>,
    ) -> Result<BranchRef>;

    /// Creates a new branch pointing at `from.hash`.
    async fn create_branch(&self, name: &str, from: &BranchRef) -> Result<BranchRef>;
}

type Tree = BTreeMap<ContentKey, Content>;

#[derive(Debug)]
struct StoreState {
    branches: HashMap<String, String>,
    trees: HashMap<String, Arc<Tree>>,
    log: HashMap<String, LogEntry>,
    sequence: u64,
}

/// In-memory reference store.
///
/// Thread-safe via `RwLock`. Every commit snapshots the full tree under a new
/// hash, so reads at old hashes keep working after the branch advances.
#[derive(Debug, Clone)]
pub struct MemoryRefStore {
    default_branch: String,
    state: Arc<RwLock<StoreState>>,
}

impl Default for MemoryRefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRefStore {
    /// Creates a store with an empty `main` branch.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_branch(DEFAULT_BRANCH)
    }

    /// Creates a store whose default branch has the given name.
    #[must_use]
    pub fn with_default_branch(name: impl Into<String>) -> Self {
        let default_branch = name.into();
        let mut trees = HashMap::new();
        trees.insert(NO_ANCESTOR_HASH.to_string(), Arc::new(Tree::new()));
        let mut branches = HashMap::new();
        branches.insert(default_branch.clone(), NO_ANCESTOR_HASH.to_string());
        Self {
            default_branch,
            state: Arc::new(RwLock::new(StoreState {
                branches,
                trees,
                log: HashMap::new(),
                sequence: 0,
            })),
        }
    }

    /// Returns the commit history of `branch`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReferenceNotFound` if the branch is unknown.
    pub fn commit_log(&self, branch: &str) -> Result<Vec<LogEntry>> {
        let state = self.read()?;
        let mut hash = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::reference_not_found(branch))?;
        let mut entries = Vec::new();
        while let Some(entry) = state.log.get(&hash) {
            hash.clone_from(&entry.parent_hash);
            entries.push(entry.clone());
        }
        Ok(entries)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }
}

fn commit_hash(
    parent: &str,
    sequence: u64,
    meta: &CommitMeta,
    operations: &[Operation],
) -> Result<String> {
    let ops = serde_json::to_vec(operations).map_err(|e| Error::Serialization {
        message: format!("failed to serialize operations: {e}"),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(parent.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(meta.message.as_bytes());
    hasher.update(&ops);
    Ok(hex::encode(hasher.finalize()))
}

#[async_trait]
impl ReferenceStore for MemoryRefStore {
    async fn default_branch(&self) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    async fn get_reference(&self, name: &str) -> Result<BranchRef> {
        let state = self.read()?;
        state
            .branches
            .get(name)
            .map(|hash| BranchRef::new(name, hash.clone()))
            .ok_or_else(|| Error::reference_not_found(name))
    }

    async fn get_content(&self, key: &ContentKey, hash: &str) -> Result<Option<Content>> {
        let state = self.read()?;
        let tree = state.trees.get(hash).ok_or_else(|| Error::UnknownHash {
            hash: hash.to_string(),
        })?;
        Ok(tree.get(key).cloned())
    }

    async fn list_entries(&self, prefix: &[String], hash: &str) -> Result<Vec<Entry>> {
        let state = self.read()?;
        let tree = state.trees.get(hash).ok_or_else(|| Error::UnknownHash {
            hash: hash.to_string(),
        })?;
        Ok(tree
            .iter()
            .filter(|(key, _)| key.is_descendant_of(prefix))
            .map(|(key, content)| Entry {
                key: key.clone(),
                content_type: content.content_type(),
            })
            .collect())
    }

    async fn commit(
        &self,
        branch: &str,
        expected_hash: &str,
        meta: CommitMeta,
        operations: Vec<Operation>,
    ) -> Result<BranchRef> {
        if operations.is_empty() {
            return Err(Error::InvalidInput(
                "commit must contain at least one operation".to_string(),
            ));
        }

        let mut state = self.write()?;

        let current = state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::reference_not_found(branch))?;
        if current != expected_hash {
            return Err(Error::ReferenceConflict {
                name: branch.to_string(),
                expected: expected_hash.to_string(),
                actual: current,
            });
        }

        let base = state.trees.get(&current).ok_or_else(|| Error::Internal {
            message: format!("branch {branch} points at missing tree {current}"),
        })?;
        let mut tree = Tree::clone(base);
        for operation in &operations {
            match operation {
                Operation::Put { key, content } => {
                    tree.insert(key.clone(), content.clone());
                }
                Operation::Delete { key } => {
                    if tree.remove(key).is_none() {
                        return Err(Error::ContentNotFound {
                            key: key.to_string(),
                        });
                    }
                }
            }
        }

        state.sequence += 1;
        let new_hash = commit_hash(&current, state.sequence, &meta, &operations)?;
        state.trees.insert(new_hash.clone(), Arc::new(tree));
        state.log.insert(
            new_hash.clone(),
            LogEntry {
                hash: new_hash.clone(),
                parent_hash: current,
                meta,
                operations,
            },
        );
        state.branches.insert(branch.to_string(), new_hash.clone());
        drop(state);

        Ok(BranchRef::new(branch, new_hash))
    }

    async fn create_branch(&self, name: &str, from: &BranchRef) -> Result<BranchRef> {
        let mut state = self.write()?;
        if state.branches.contains_key(name) {
            return Err(Error::ReferenceAlreadyExists {
                name: name.to_string(),
            });
        }
        if !state.trees.contains_key(&from.hash) {
            return Err(Error::UnknownHash {
                hash: from.hash.clone(),
            });
        }
        state.branches.insert(name.to_string(), from.hash.clone());
        Ok(BranchRef::new(name, from.hash.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{IcebergTable, Namespace};

    fn key(elements: &[&str]) -> ContentKey {
        ContentKey::new(elements.iter().map(|e| (*e).to_string()).collect()).expect("valid key")
    }

    fn table(location: &str) -> Content {
        Content::IcebergTable(IcebergTable {
            id: "table-id".into(),
            metadata_location: location.into(),
            snapshot_id: None,
            schema_id: 0,
            spec_id: 0,
            sort_order_id: 0,
        })
    }

    fn put(k: &[&str], location: &str) -> Operation {
        Operation::Put {
            key: key(k),
            content: table(location),
        }
    }

    #[tokio::test]
    async fn test_new_store_has_empty_default_branch() {
        let store = MemoryRefStore::new();
        assert_eq!(store.default_branch().await.expect("default"), "main");
        let main = store.get_reference("main").await.expect("main");
        assert_eq!(main.hash, NO_ANCESTOR_HASH);
        assert!(store.commit_log("main").expect("log").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_branch_is_reference_not_found() {
        let store = MemoryRefStore::new();
        let err = store.get_reference("nope").await.expect_err("missing");
        assert!(matches!(err, Error::ReferenceNotFound { ref name } if name == "nope"));
    }

    #[tokio::test]
    async fn test_commit_advances_hash_and_keeps_old_snapshot() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");

        let advanced = store
            .commit(
                "main",
                &main.hash,
                CommitMeta::new("create"),
                vec![put(&["db", "orders"], "loc-0")],
            )
            .await
            .expect("commit");
        assert_ne!(advanced.hash, main.hash);

        let at_new = store
            .get_content(&key(&["db", "orders"]), &advanced.hash)
            .await
            .expect("read");
        assert!(at_new.is_some());
        let at_old = store
            .get_content(&key(&["db", "orders"]), &main.hash)
            .await
            .expect("read");
        assert!(at_old.is_none());

        let log = store.commit_log("main").expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].parent_hash, main.hash);
    }

    #[tokio::test]
    async fn test_stale_hash_conflicts_without_applying() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        let head = store
            .commit("main", &main.hash, CommitMeta::new("a"), vec![put(&["a"], "1")])
            .await
            .expect("commit");

        let err = store
            .commit("main", &main.hash, CommitMeta::new("b"), vec![put(&["b"], "2")])
            .await
            .expect_err("stale");
        assert!(matches!(err, Error::ReferenceConflict { .. }));

        let current = store.get_reference("main").await.expect("main");
        assert_eq!(current.hash, head.hash);
        assert!(
            store
                .get_content(&key(&["b"]), &current.hash)
                .await
                .expect("read")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_missing_key_fails_whole_commit() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");

        let err = store
            .commit(
                "main",
                &main.hash,
                CommitMeta::new("mixed"),
                vec![
                    put(&["db", "t1"], "1"),
                    Operation::Delete {
                        key: key(&["db", "missing"]),
                    },
                ],
            )
            .await
            .expect_err("missing delete");
        assert!(matches!(err, Error::ContentNotFound { .. }));

        let current = store.get_reference("main").await.expect("main");
        assert_eq!(current.hash, main.hash);
    }

    #[tokio::test]
    async fn test_empty_commit_rejected() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        let err = store
            .commit("main", &main.hash, CommitMeta::new("empty"), vec![])
            .await
            .expect_err("empty");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_branches_are_isolated() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        let dev = store.create_branch("dev", &main).await.expect("branch");

        let dev = store
            .commit("dev", &dev.hash, CommitMeta::new("dev only"), vec![put(&["t"], "x")])
            .await
            .expect("commit");

        let main = store.get_reference("main").await.expect("main");
        assert!(
            store
                .get_content(&key(&["t"]), &main.hash)
                .await
                .expect("read")
                .is_none()
        );
        assert!(
            store
                .get_content(&key(&["t"]), &dev.hash)
                .await
                .expect("read")
                .is_some()
        );

        let err = store.create_branch("dev", &main).await.expect_err("exists");
        assert!(matches!(err, Error::ReferenceAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_list_entries_under_prefix() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        let ns = Content::Namespace(Namespace {
            id: "ns".into(),
            elements: vec!["db".into()],
            properties: BTreeMap::new(),
        });
        let head = store
            .commit(
                "main",
                &main.hash,
                CommitMeta::new("seed"),
                vec![
                    Operation::Put {
                        key: key(&["db"]),
                        content: ns,
                    },
                    put(&["db", "b"], "2"),
                    put(&["db", "a"], "1"),
                    put(&["other", "c"], "3"),
                ],
            )
            .await
            .expect("commit");

        let entries = store
            .list_entries(&["db".to_string()], &head.hash)
            .await
            .expect("list");
        let names: Vec<_> = entries.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(names, vec!["db.a", "db.b"]);

        let all = store.list_entries(&[], &head.hash).await.expect("list");
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].content_type, ContentType::Namespace);
    }
}

//! # arco-nessie
//!
//! An Iceberg table catalog backed by a Nessie-style versioned reference store.
//!
//! Tables and namespaces live as content entries on branches. Each catalog
//! operation resolves a branch to its current hash, reads at that hash, and
//! writes through a single commit that only applies if the branch is still at
//! that hash. Of two writers racing on one branch, exactly one wins; the other
//! gets a retryable [`CatalogError::CommitConflict`].
//!
//! ## Components
//!
//! - [`identifier`]: parses `ns.table@branch` identifiers
//! - [`branch`]: resolves a branch selector to a hash, memoizing the default branch name
//! - [`locator`]: reads table pointers and namespaces at a hash
//! - [`commit`]: sends hash-guarded commits and classifies their outcome
//! - [`NessieCatalog`]: the table and namespace operations
//!
//! Metadata documents are read and written through [`metadata::MetadataIo`];
//! the reference store only holds the pointer to the current document.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod branch;
pub mod catalog;
pub mod commit;
pub mod config;
pub mod error;
pub mod identifier;
pub mod locator;
pub mod metadata;
pub mod metrics;
pub mod table;
pub mod types;
pub mod update;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::NessieCatalog;
    pub use crate::config::CatalogConfig;
    pub use crate::error::{CatalogError, CatalogResult};
    pub use crate::identifier::{
        Identifier, NamespaceIdentifier, NamespaceRef, TableIdentifier, TableRef,
    };
    pub use crate::metadata::{MemoryMetadataIo, MetadataIo};
    pub use crate::table::Table;
    pub use crate::types::{
        CommitTableRequest, CommitTableResponse, PartitionField, PartitionSpec,
        PropertiesUpdateSummary, Schema, SchemaField, Snapshot, SnapshotRefType, SortField,
        SortOrder, TableCreation, TableMetadata, TableUpdate, UpdateRequirement,
    };
}

pub use catalog::NessieCatalog;
pub use commit::{CommitAttempt, CommitOrchestrator, CommitOutcome};
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use identifier::{Identifier, NamespaceIdentifier, NamespaceRef, TableIdentifier, TableRef};
pub use metadata::{MemoryMetadataIo, MetadataIo};
pub use table::Table;

//! # arco-core
//!
//! Core abstractions for the Arco Nessie catalog.
//!
//! This crate provides the foundational types and traits used by the catalog
//! adapter and its test tooling:
//!
//! - **Reference Store**: The contract of a version-controlled content store
//!   (branches, immutable hashes, conditional commits) and an in-memory implementation
//! - **Content Addressing**: Reversible content keys and the content kinds stored under them
//! - **Error Types**: Store-level error definitions and result types
//! - **Observability**: Logging initialization and span constructors
//!
//! ## Crate Boundary
//!
//! Errors defined here describe the *store's* failure modes. Catalog crates
//! translate them into their own error vocabulary and never re-export them.
//!
//! ## Example
//!
//! ```rust
//! use arco_core::prelude::*;
//!
//! let store = MemoryRefStore::new();
//! let key = ContentKey::of(&["db".to_string()], "orders").expect("valid key");
//! assert_eq!(key.to_path_string(), "db.orders");
//! # let _ = store;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod content;
pub mod error;
pub mod observability;
pub mod refstore;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::content::{Content, ContentKey, ContentType, IcebergTable, Namespace};
    pub use crate::error::{Error, Result};
    pub use crate::refstore::{
        BranchRef, CommitMeta, Entry, LogEntry, MemoryRefStore, Operation, ReferenceStore,
    };
}

// Re-export key types at crate root for ergonomics
pub use content::{Content, ContentKey, ContentType, IcebergTable, Namespace};
pub use error::{Error, Result};
pub use observability::{LogFormat, catalog_span, commit_span, init_logging};
pub use refstore::{
    BranchRef, CommitMeta, DEFAULT_BRANCH, Entry, LogEntry, MemoryRefStore, NO_ANCESTOR_HASH,
    Operation, ReferenceStore,
};

//! Error types and result aliases for reference-store access.
//!
//! These errors describe failures in the vocabulary of the version-controlled
//! reference store (references, content keys, transport). Catalog crates are
//! expected to translate them into their own error kinds at the boundary rather
//! than surfacing them to callers.

use std::fmt;

/// The result type used by reference-store clients.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a reference store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The named reference (branch) does not exist.
    #[error("reference not found: {name}")]
    ReferenceNotFound {
        /// Reference name that was looked up.
        name: String,
    },

    /// The reference already exists (branch creation).
    #[error("reference already exists: {name}")]
    ReferenceAlreadyExists {
        /// Reference name that was requested.
        name: String,
    },

    /// The reference moved past the hash the caller expected.
    #[error("reference conflict on {name}: expected hash {expected}, found {actual}")]
    ReferenceConflict {
        /// Reference name.
        name: String,
        /// Hash the caller expected the reference to be at.
        expected: String,
        /// Hash the reference is actually at.
        actual: String,
    },

    /// A commit tried to delete a key that does not exist at the expected hash.
    #[error("content not found: {key}")]
    ContentNotFound {
        /// Rendered content key.
        key: String,
    },

    /// The hash does not identify a known commit.
    #[error("unknown hash: {hash}")]
    UnknownHash {
        /// The unknown hash.
        hash: String,
    },

    /// The store could not be reached or the transport failed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error with a source cause.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a reference-not-found error.
    #[must_use]
    pub fn reference_not_found(name: impl fmt::Display) -> Self {
        Self::ReferenceNotFound {
            name: name.to_string(),
        }
    }

    /// Returns true when the error is a transient transport failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

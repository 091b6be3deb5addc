//! Catalog error types.
//!
//! Every failure a caller can observe is one of the kinds below. Reference-store
//! errors never cross this boundary unchanged: the resolver, locator and commit
//! orchestrator each translate them explicitly.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog error kinds.
///
/// `error_type()` names the matching Iceberg exception so callers bridging to
/// an Iceberg client can report the conventional type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The identifier is malformed.
    #[error("Invalid identifier: {message}")]
    InvalidIdentifier {
        /// Human-readable error message.
        message: String,
    },

    /// A request argument is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable error message.
        message: String,
    },

    /// The branch does not exist in the reference store.
    #[error("Branch does not exist: {branch}")]
    NoSuchBranch {
        /// Branch name.
        branch: String,
    },

    /// No table is stored at the identifier.
    #[error("Table does not exist: {table}")]
    NoSuchTable {
        /// Rendered table identifier.
        table: String,
    },

    /// Content already exists at the table's key.
    #[error("Table already exists: {table}")]
    TableAlreadyExists {
        /// Rendered table identifier.
        table: String,
    },

    /// The namespace does not exist.
    #[error("Namespace does not exist: {namespace}")]
    NoSuchNamespace {
        /// Rendered namespace.
        namespace: String,
    },

    /// Content already exists at the namespace's key.
    #[error("Namespace already exists: {namespace}")]
    NamespaceAlreadyExists {
        /// Rendered namespace.
        namespace: String,
    },

    /// The namespace still contains tables or namespaces.
    #[error("Namespace is not empty: {namespace}")]
    NamespaceNotEmpty {
        /// Rendered namespace.
        namespace: String,
    },

    /// The branch or table moved since it was read. Retry with fresh state.
    #[error("Commit conflict: {message}")]
    CommitConflict {
        /// Human-readable error message.
        message: String,
    },

    /// The reference store could not be reached.
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable {
        /// Human-readable error message.
        message: String,
    },

    /// Unexpected failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl CatalogError {
    /// Creates an invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a branch not found error.
    #[must_use]
    pub fn branch_not_found(branch: impl Into<String>) -> Self {
        Self::NoSuchBranch {
            branch: branch.into(),
        }
    }

    /// Creates a table not found error.
    #[must_use]
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::NoSuchTable {
            table: table.into(),
        }
    }

    /// Creates a table already exists error.
    #[must_use]
    pub fn table_already_exists(table: impl Into<String>) -> Self {
        Self::TableAlreadyExists {
            table: table.into(),
        }
    }

    /// Creates a namespace not found error.
    #[must_use]
    pub fn namespace_not_found(namespace: impl Into<String>) -> Self {
        Self::NoSuchNamespace {
            namespace: namespace.into(),
        }
    }

    /// Creates a namespace already exists error.
    #[must_use]
    pub fn namespace_already_exists(namespace: impl Into<String>) -> Self {
        Self::NamespaceAlreadyExists {
            namespace: namespace.into(),
        }
    }

    /// Creates a namespace not empty error.
    #[must_use]
    pub fn namespace_not_empty(namespace: impl Into<String>) -> Self {
        Self::NamespaceNotEmpty {
            namespace: namespace.into(),
        }
    }

    /// Creates a commit conflict error.
    #[must_use]
    pub fn commit_conflict(message: impl Into<String>) -> Self {
        Self::CommitConflict {
            message: message.into(),
        }
    }

    /// Creates a catalog unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error for property keys present in both
    /// removals and updates.
    #[must_use]
    pub fn property_overlap(keys: &[String]) -> Self {
        Self::invalid_argument(format!(
            "Keys present in both updates and removals: {}",
            keys.join(", ")
        ))
    }

    /// Returns the Iceberg exception name for this error.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier { .. } | Self::InvalidArgument { .. } => "BadRequestException",
            Self::NoSuchBranch { .. } => "NoSuchBranchException",
            Self::NoSuchTable { .. } => "NoSuchTableException",
            Self::TableAlreadyExists { .. } => "TableAlreadyExistsException",
            Self::NoSuchNamespace { .. } => "NoSuchNamespaceException",
            Self::NamespaceAlreadyExists { .. } => "NamespaceAlreadyExistsException",
            Self::NamespaceNotEmpty { .. } => "NamespaceNotEmptyException",
            Self::CommitConflict { .. } => "CommitFailedException",
            Self::CatalogUnavailable { .. } => "ServiceUnavailableException",
            Self::Internal { .. } => "InternalServerException",
        }
    }

    /// Returns true if the caller may retry after re-reading current state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CommitConflict { .. } | Self::CatalogUnavailable { .. }
        )
    }

    /// Returns true for the not-found family of errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchBranch { .. } | Self::NoSuchTable { .. } | Self::NoSuchNamespace { .. }
        )
    }
}

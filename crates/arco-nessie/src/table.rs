//! Loaded table handle.

use arco_core::BranchRef;

use crate::identifier::TableIdentifier;
use crate::types::{CommitTableRequest, TableMetadata};

/// A table as loaded from one branch at one hash.
///
/// The handle is a snapshot: it does not follow later commits. Reload the
/// table to observe them. Requests built from the handle pin its branch and
/// its metadata location, so a commit based on stale state is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    identifier: TableIdentifier,
    branch: BranchRef,
    metadata_location: String,
    metadata: TableMetadata,
}

impl Table {
    pub(crate) fn new(
        identifier: TableIdentifier,
        branch: BranchRef,
        metadata_location: String,
        metadata: TableMetadata,
    ) -> Self {
        Self {
            identifier: identifier.with_branch(Some(branch.name.clone())),
            branch,
            metadata_location,
            metadata,
        }
    }

    /// Identifier, with the branch the table was loaded from.
    #[must_use]
    pub const fn identifier(&self) -> &TableIdentifier {
        &self.identifier
    }

    /// Branch and the hash the table was read at.
    #[must_use]
    pub const fn branch(&self) -> &BranchRef {
        &self.branch
    }

    /// Location of the metadata file this handle was loaded from.
    #[must_use]
    pub fn metadata_location(&self) -> &str {
        &self.metadata_location
    }

    /// The loaded metadata.
    #[must_use]
    pub const fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// Starts a commit request based on this handle's metadata location.
    #[must_use]
    pub fn new_commit_request(&self) -> CommitTableRequest {
        CommitTableRequest::new(&self.identifier)
            .with_base_metadata_location(self.metadata_location.clone())
    }
}

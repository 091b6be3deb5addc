//! Commit request and response types.
//!
//! A commit request carries the table it targets, the metadata location the
//! caller based its change on, requirements checked against the current
//! metadata, and the updates to apply.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::table::{PartitionSpec, Schema, Snapshot, SnapshotRefType, SortOrder, TableMetadata};
use crate::identifier::TableIdentifier;

/// Iceberg table update requirement for optimistic concurrency.
///
/// Requirements are checked before applying updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UpdateRequirement {
    /// Assert that the table UUID matches.
    AssertTableUuid {
        /// Expected table UUID.
        uuid: Uuid,
    },

    /// Assert that a ref points to a specific snapshot.
    AssertRefSnapshotId {
        /// Reference name (e.g., "main").
        #[serde(rename = "ref")]
        ref_name: String,
        /// Expected snapshot ID (null means ref should not exist).
        #[serde(rename = "snapshot-id")]
        snapshot_id: Option<i64>,
    },

    /// Assert the last assigned column ID.
    AssertLastAssignedFieldId {
        /// Expected last assigned field ID.
        #[serde(rename = "last-assigned-field-id")]
        last_assigned_field_id: i32,
    },

    /// Assert the current schema ID.
    AssertCurrentSchemaId {
        /// Expected current schema ID.
        #[serde(rename = "current-schema-id")]
        current_schema_id: i32,
    },

    /// Assert the last assigned partition ID.
    AssertLastAssignedPartitionId {
        /// Expected last assigned partition ID.
        #[serde(rename = "last-assigned-partition-id")]
        last_assigned_partition_id: i32,
    },

    /// Assert the default spec ID.
    AssertDefaultSpecId {
        /// Expected default spec ID.
        #[serde(rename = "default-spec-id")]
        default_spec_id: i32,
    },

    /// Assert the default sort order ID.
    AssertDefaultSortOrderId {
        /// Expected default sort order ID.
        #[serde(rename = "default-sort-order-id")]
        default_sort_order_id: i32,
    },
}

/// Iceberg table update action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TableUpdate {
    /// Assign a new UUID to the table.
    AssignUuid {
        /// New UUID for the table.
        uuid: Uuid,
    },

    /// Upgrade the format version.
    UpgradeFormatVersion {
        /// Target format version.
        #[serde(rename = "format-version")]
        format_version: i32,
    },

    /// Add a new schema.
    AddSchema {
        /// The schema to add.
        schema: Schema,
        /// Highest column id after the change (optional).
        #[serde(rename = "last-column-id", skip_serializing_if = "Option::is_none")]
        last_column_id: Option<i32>,
    },

    /// Set the current schema.
    SetCurrentSchema {
        /// Schema ID to make current.
        #[serde(rename = "schema-id")]
        schema_id: i32,
    },

    /// Add a new partition spec.
    AddPartitionSpec {
        /// The partition spec to add.
        spec: PartitionSpec,
    },

    /// Set the default partition spec.
    SetDefaultSpec {
        /// Spec ID to make default.
        #[serde(rename = "spec-id")]
        spec_id: i32,
    },

    /// Add a new sort order.
    AddSortOrder {
        /// The sort order to add.
        #[serde(rename = "sort-order")]
        sort_order: SortOrder,
    },

    /// Set the default sort order.
    SetDefaultSortOrder {
        /// Sort order ID to make default.
        #[serde(rename = "sort-order-id")]
        sort_order_id: i32,
    },

    /// Add a new snapshot.
    AddSnapshot {
        /// The snapshot to add.
        snapshot: Snapshot,
    },

    /// Set a snapshot reference (branch or tag).
    SetSnapshotRef {
        /// Reference name.
        #[serde(rename = "ref-name")]
        ref_name: String,
        /// Reference type.
        #[serde(rename = "type")]
        ref_type: SnapshotRefType,
        /// Snapshot ID for the ref.
        #[serde(rename = "snapshot-id")]
        snapshot_id: i64,
    },

    /// Remove a snapshot reference.
    RemoveSnapshotRef {
        /// Reference name to remove.
        #[serde(rename = "ref-name")]
        ref_name: String,
    },

    /// Remove snapshots by IDs.
    RemoveSnapshots {
        /// Snapshot IDs to remove.
        #[serde(rename = "snapshot-ids")]
        snapshot_ids: Vec<i64>,
    },

    /// Set table location.
    SetLocation {
        /// New location.
        location: String,
    },

    /// Set table properties.
    SetProperties {
        /// Properties to set.
        updates: HashMap<String, String>,
    },

    /// Remove table properties.
    RemoveProperties {
        /// Property keys to remove.
        removals: Vec<String>,
    },
}

/// Request to commit changes to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommitTableRequest {
    /// Target table and its branch selector.
    pub identifier: TableIdentifier,

    /// Metadata location the change was based on. When set, the commit is
    /// rejected if the table has moved past it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_metadata_location: Option<String>,

    /// Requirements checked against the current metadata.
    #[serde(default)]
    pub requirements: Vec<UpdateRequirement>,

    /// Updates applied in order.
    #[serde(default)]
    pub updates: Vec<TableUpdate>,
}

impl CommitTableRequest {
    /// Creates an empty request for a table.
    #[must_use]
    pub fn new(identifier: impl Into<TableIdentifier>) -> Self {
        Self {
            identifier: identifier.into(),
            base_metadata_location: None,
            requirements: Vec::new(),
            updates: Vec::new(),
        }
    }

    /// Sets the base metadata location.
    #[must_use]
    pub fn with_base_metadata_location(mut self, location: impl Into<String>) -> Self {
        self.base_metadata_location = Some(location.into());
        self
    }

    /// Adds a requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: UpdateRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Adds an update.
    #[must_use]
    pub fn with_update(mut self, update: TableUpdate) -> Self {
        self.updates.push(update);
        self
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommitTableResponse {
    /// Location of the new metadata file.
    pub metadata_location: String,

    /// The new metadata.
    pub metadata: TableMetadata,
}

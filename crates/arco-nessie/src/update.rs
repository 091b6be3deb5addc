//! Requirement checks and metadata updates for table commits.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::{CatalogError, CatalogResult};
use crate::types::{
    MAIN_REF, MetadataLogEntry, SnapshotLogEntry, SnapshotRefMetadata, TableMetadata,
    TableUpdate, UpdateRequirement,
};

/// Validates update requirements against current table metadata.
///
/// # Errors
///
/// Returns `CatalogError::CommitConflict` if any requirement is not met.
pub fn validate_requirements(
    metadata: &TableMetadata,
    requirements: &[UpdateRequirement],
) -> CatalogResult<()> {
    for requirement in requirements {
        validate_requirement(metadata, requirement)?;
    }
    Ok(())
}

fn validate_requirement(
    metadata: &TableMetadata,
    requirement: &UpdateRequirement,
) -> CatalogResult<()> {
    match requirement {
        UpdateRequirement::AssertTableUuid { uuid } => {
            if metadata.table_uuid != *uuid {
                return Err(CatalogError::commit_conflict(format!(
                    "Table UUID mismatch: expected {uuid}, found {}",
                    metadata.table_uuid
                )));
            }
        }
        UpdateRequirement::AssertRefSnapshotId {
            ref_name,
            snapshot_id,
        } => {
            let current = metadata.ref_snapshot_id(ref_name);
            if current != *snapshot_id {
                return Err(CatalogError::commit_conflict(format!(
                    "Ref '{ref_name}' snapshot mismatch: expected {snapshot_id:?}, found {current:?}",
                )));
            }
        }
        UpdateRequirement::AssertCurrentSchemaId { current_schema_id } => {
            check_id("Current schema ID", *current_schema_id, metadata.current_schema_id)?;
        }
        UpdateRequirement::AssertLastAssignedFieldId {
            last_assigned_field_id,
        } => {
            check_id(
                "Last assigned field ID",
                *last_assigned_field_id,
                metadata.last_column_id,
            )?;
        }
        UpdateRequirement::AssertDefaultSpecId { default_spec_id } => {
            check_id("Default spec ID", *default_spec_id, metadata.default_spec_id)?;
        }
        UpdateRequirement::AssertDefaultSortOrderId {
            default_sort_order_id,
        } => {
            check_id(
                "Default sort order ID",
                *default_sort_order_id,
                metadata.default_sort_order_id,
            )?;
        }
        UpdateRequirement::AssertLastAssignedPartitionId {
            last_assigned_partition_id,
        } => {
            check_id(
                "Last assigned partition ID",
                *last_assigned_partition_id,
                metadata.last_partition_id,
            )?;
        }
    }
    Ok(())
}

fn check_id(what: &str, expected: i32, found: i32) -> CatalogResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CatalogError::commit_conflict(format!(
            "{what} mismatch: expected {expected}, found {found}"
        )))
    }
}

/// Applies updates in order.
///
/// # Errors
///
/// Returns `CatalogError::InvalidArgument` if an update references missing
/// state or moves an id backwards.
pub fn apply_updates(metadata: &mut TableMetadata, updates: &[TableUpdate]) -> CatalogResult<()> {
    for update in updates {
        apply_update(metadata, update)?;
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn apply_update(metadata: &mut TableMetadata, update: &TableUpdate) -> CatalogResult<()> {
    match update {
        TableUpdate::AssignUuid { uuid } => {
            metadata.table_uuid = *uuid;
        }
        TableUpdate::UpgradeFormatVersion { format_version } => {
            if *format_version < metadata.format_version {
                return Err(CatalogError::invalid_argument(
                    "format-version cannot be downgraded",
                ));
            }
            metadata.format_version = *format_version;
        }
        TableUpdate::AddSchema {
            schema,
            last_column_id,
        } => {
            if metadata
                .schemas
                .iter()
                .any(|existing| existing.schema_id == schema.schema_id)
            {
                return Err(CatalogError::invalid_argument(format!(
                    "Schema {} already exists",
                    schema.schema_id
                )));
            }
            metadata.schemas.push(schema.clone());
            metadata.last_column_id = metadata.last_column_id.max(schema.highest_field_id());
            if let Some(last_column_id) = last_column_id {
                if *last_column_id < metadata.last_column_id {
                    return Err(CatalogError::invalid_argument(
                        "last-column-id cannot move backwards",
                    ));
                }
                metadata.last_column_id = *last_column_id;
            }
        }
        TableUpdate::SetCurrentSchema { schema_id } => {
            if !metadata.schemas.iter().any(|s| s.schema_id == *schema_id) {
                return Err(CatalogError::invalid_argument(format!(
                    "Schema {schema_id} does not exist"
                )));
            }
            metadata.current_schema_id = *schema_id;
        }
        TableUpdate::AddPartitionSpec { spec } => {
            if let Some(max_field_id) = spec.fields.iter().map(|f| f.field_id).max() {
                metadata.last_partition_id = metadata.last_partition_id.max(max_field_id);
            }
            metadata.partition_specs.push(spec.clone());
        }
        TableUpdate::SetDefaultSpec { spec_id } => {
            if !metadata.partition_specs.iter().any(|s| s.spec_id == *spec_id) {
                return Err(CatalogError::invalid_argument(format!(
                    "Partition spec {spec_id} does not exist"
                )));
            }
            metadata.default_spec_id = *spec_id;
        }
        TableUpdate::AddSortOrder { sort_order } => {
            metadata.sort_orders.push(sort_order.clone());
        }
        TableUpdate::SetDefaultSortOrder { sort_order_id } => {
            if !metadata.sort_orders.iter().any(|o| o.order_id == *sort_order_id) {
                return Err(CatalogError::invalid_argument(format!(
                    "Sort order {sort_order_id} does not exist"
                )));
            }
            metadata.default_sort_order_id = *sort_order_id;
        }
        TableUpdate::AddSnapshot { snapshot } => {
            if metadata
                .snapshots
                .iter()
                .any(|s| s.snapshot_id == snapshot.snapshot_id)
            {
                return Err(CatalogError::invalid_argument(format!(
                    "Snapshot {} already exists",
                    snapshot.snapshot_id
                )));
            }
            metadata.last_sequence_number =
                metadata.last_sequence_number.max(snapshot.sequence_number);
            metadata.snapshots.push(snapshot.clone());
        }
        TableUpdate::SetSnapshotRef {
            ref_name,
            ref_type,
            snapshot_id,
        } => {
            if !metadata.snapshots.iter().any(|s| s.snapshot_id == *snapshot_id) {
                return Err(CatalogError::invalid_argument(format!(
                    "Snapshot {snapshot_id} does not exist"
                )));
            }
            metadata.refs.insert(
                ref_name.clone(),
                SnapshotRefMetadata {
                    snapshot_id: *snapshot_id,
                    ref_type: *ref_type,
                },
            );
            if ref_name == MAIN_REF {
                metadata.current_snapshot_id = Some(*snapshot_id);
                metadata.snapshot_log.push(SnapshotLogEntry {
                    snapshot_id: *snapshot_id,
                    timestamp_ms: Utc::now().timestamp_millis(),
                });
            }
        }
        TableUpdate::RemoveSnapshotRef { ref_name } => {
            metadata.refs.remove(ref_name);
            if ref_name == MAIN_REF {
                metadata.current_snapshot_id = None;
            }
        }
        TableUpdate::RemoveSnapshots { snapshot_ids } => {
            let ids: HashSet<i64> = snapshot_ids.iter().copied().collect();
            metadata
                .snapshots
                .retain(|snap| !ids.contains(&snap.snapshot_id));
            metadata.refs.retain(|_, r| !ids.contains(&r.snapshot_id));
            if metadata
                .current_snapshot_id
                .is_some_and(|id| ids.contains(&id))
            {
                metadata.current_snapshot_id = None;
            }
        }
        TableUpdate::SetLocation { location } => {
            if location.trim().is_empty() {
                return Err(CatalogError::invalid_argument("location cannot be empty"));
            }
            metadata.location = location.trim_end_matches('/').to_string();
        }
        TableUpdate::SetProperties { updates } => {
            for (key, value) in updates {
                metadata.properties.insert(key.clone(), value.clone());
            }
        }
        TableUpdate::RemoveProperties { removals } => {
            for key in removals {
                metadata.properties.remove(key);
            }
        }
    }

    Ok(())
}

/// Records the previous metadata file and stamps the update time.
pub fn finalize_metadata(
    metadata: &mut TableMetadata,
    base_metadata: &TableMetadata,
    previous_location: &str,
) {
    if metadata
        .metadata_log
        .last()
        .is_none_or(|entry| entry.metadata_file != previous_location)
    {
        metadata.metadata_log.push(MetadataLogEntry {
            metadata_file: previous_location.to_string(),
            timestamp_ms: base_metadata.last_updated_ms,
        });
    }
    metadata.last_updated_ms = Utc::now().timestamp_millis().max(base_metadata.last_updated_ms);
}

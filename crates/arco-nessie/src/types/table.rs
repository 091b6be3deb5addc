//! Iceberg table metadata.
//!
//! Field names follow the Iceberg table-metadata JSON layout (kebab-case).
//! The catalog only interprets the parts its commit path needs; schemas and
//! snapshots are carried through as written by the client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Current format version written for new tables.
pub const FORMAT_VERSION: i32 = 2;

/// Name of the snapshot ref that tracks the current snapshot.
pub const MAIN_REF: &str = "main";

/// Iceberg table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    /// Format version (1 or 2).
    pub format_version: i32,

    /// Unique table identifier.
    pub table_uuid: Uuid,

    /// Table location (root path for data and metadata).
    pub location: String,

    /// Last sequence number assigned.
    pub last_sequence_number: i64,

    /// Last updated timestamp in milliseconds.
    pub last_updated_ms: i64,

    /// Last assigned column ID.
    pub last_column_id: i32,

    /// Current schema ID.
    pub current_schema_id: i32,

    /// All schemas.
    pub schemas: Vec<Schema>,

    /// Current snapshot ID.
    #[serde(default)]
    pub current_snapshot_id: Option<i64>,

    /// All snapshots.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,

    /// Snapshot log (history of current-snapshot-id changes).
    #[serde(default)]
    pub snapshot_log: Vec<SnapshotLogEntry>,

    /// Metadata log (history of metadata files).
    #[serde(default)]
    pub metadata_log: Vec<MetadataLogEntry>,

    /// Table properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,

    /// Default partition spec ID.
    pub default_spec_id: i32,

    /// Partition specs.
    pub partition_specs: Vec<PartitionSpec>,

    /// Highest assigned partition field ID.
    pub last_partition_id: i32,

    /// Snapshot refs (branches and tags).
    #[serde(default)]
    pub refs: HashMap<String, SnapshotRefMetadata>,

    /// Default sort order ID.
    pub default_sort_order_id: i32,

    /// Sort orders.
    pub sort_orders: Vec<SortOrder>,
}

impl TableMetadata {
    /// Builds the first metadata version of a new table.
    #[must_use]
    pub fn new_table(table_uuid: Uuid, location: impl Into<String>, creation: &TableCreation) -> Self {
        let mut schema = creation.schema.clone();
        schema.schema_id = 0;
        let last_column_id = schema.highest_field_id();

        let mut spec = creation
            .partition_spec
            .clone()
            .unwrap_or_else(PartitionSpec::unpartitioned);
        spec.spec_id = 0;
        let last_partition_id = spec
            .fields
            .iter()
            .map(|f| f.field_id)
            .max()
            .unwrap_or(PartitionSpec::UNPARTITIONED_LAST_ASSIGNED_ID);

        let sort_order = creation.sort_order.clone().unwrap_or_else(SortOrder::unsorted);
        let default_sort_order_id = sort_order.order_id;

        Self {
            format_version: FORMAT_VERSION,
            table_uuid,
            location: location.into(),
            last_sequence_number: 0,
            last_updated_ms: chrono::Utc::now().timestamp_millis(),
            last_column_id,
            current_schema_id: 0,
            schemas: vec![schema],
            current_snapshot_id: None,
            snapshots: vec![],
            snapshot_log: vec![],
            metadata_log: vec![],
            properties: creation.properties.clone(),
            default_spec_id: 0,
            partition_specs: vec![spec],
            last_partition_id,
            refs: HashMap::new(),
            default_sort_order_id,
            sort_orders: vec![sort_order],
        }
    }

    /// Returns the current schema, if present.
    #[must_use]
    pub fn current_schema(&self) -> Option<&Schema> {
        self.schemas
            .iter()
            .find(|schema| schema.schema_id == self.current_schema_id)
    }

    /// Returns the current snapshot, if any.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        let id = self.current_snapshot_id?;
        self.snapshots.iter().find(|snap| snap.snapshot_id == id)
    }

    /// Returns the snapshot id a ref points at; `main` falls back to the
    /// current snapshot when no explicit ref is recorded.
    #[must_use]
    pub fn ref_snapshot_id(&self, ref_name: &str) -> Option<i64> {
        self.refs
            .get(ref_name)
            .map(|r| r.snapshot_id)
            .or_else(|| {
                if ref_name == MAIN_REF {
                    self.current_snapshot_id
                } else {
                    None
                }
            })
    }
}

/// Iceberg schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema ID.
    #[serde(rename = "schema-id")]
    pub schema_id: i32,

    /// Schema type (always "struct" for table schemas).
    #[serde(rename = "type", default = "default_struct_type")]
    pub schema_type: String,

    /// Schema fields.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

fn default_struct_type() -> String {
    "struct".to_string()
}

impl Schema {
    /// Creates a schema with the given fields.
    #[must_use]
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self {
            schema_id: 0,
            schema_type: default_struct_type(),
            fields,
        }
    }

    /// Returns the highest top-level field id, or 0 for an empty schema.
    #[must_use]
    pub fn highest_field_id(&self) -> i32 {
        self.fields.iter().map(|f| f.id).max().unwrap_or(0)
    }
}

/// A field in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Unique field ID.
    pub id: i32,

    /// Field name.
    pub name: String,

    /// Whether the field is required.
    pub required: bool,

    /// Field data type.
    #[serde(rename = "type")]
    pub field_type: serde_json::Value, // string or nested type
}

impl SchemaField {
    /// Creates a field with a primitive type name.
    #[must_use]
    pub fn primitive(id: i32, name: impl Into<String>, type_name: &str, required: bool) -> Self {
        Self {
            id,
            name: name.into(),
            required,
            field_type: serde_json::Value::String(type_name.to_string()),
        }
    }
}

/// Iceberg snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    /// Unique snapshot ID.
    pub snapshot_id: i64,

    /// Parent snapshot ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_snapshot_id: Option<i64>,

    /// Sequence number.
    #[serde(default)]
    pub sequence_number: i64,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,

    /// Manifest list location.
    pub manifest_list: String,

    /// Snapshot summary.
    #[serde(default)]
    pub summary: HashMap<String, String>,

    /// Schema ID for this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<i32>,
}

/// Entry in the snapshot log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotLogEntry {
    /// Snapshot ID.
    pub snapshot_id: i64,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// Entry in the metadata log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataLogEntry {
    /// Metadata file location.
    pub metadata_file: String,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// Partition specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Spec ID.
    #[serde(rename = "spec-id")]
    pub spec_id: i32,

    /// Partition fields.
    #[serde(default)]
    pub fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// Last assigned partition field id of an unpartitioned table.
    pub const UNPARTITIONED_LAST_ASSIGNED_ID: i32 = 999;

    /// Returns the unpartitioned spec.
    #[must_use]
    pub fn unpartitioned() -> Self {
        Self {
            spec_id: 0,
            fields: vec![],
        }
    }
}

/// A field in a partition specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionField {
    /// Unique field ID.
    pub field_id: i32,

    /// Source column ID.
    pub source_id: i32,

    /// Field name.
    pub name: String,

    /// Transform type (identity, bucket, truncate, etc.).
    pub transform: String,
}

/// Snapshot ref type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotRefType {
    /// A mutable branch.
    Branch,
    /// An immutable tag.
    Tag,
}

/// Snapshot reference metadata (for refs map).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRefMetadata {
    /// Snapshot ID.
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,

    /// Reference type.
    #[serde(rename = "type")]
    pub ref_type: SnapshotRefType,
}

/// Sort order specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Order ID.
    #[serde(rename = "order-id")]
    pub order_id: i32,

    /// Sort fields.
    #[serde(default)]
    pub fields: Vec<SortField>,
}

impl SortOrder {
    /// Returns the unsorted order (id 0, no fields).
    #[must_use]
    pub fn unsorted() -> Self {
        Self {
            order_id: 0,
            fields: vec![],
        }
    }
}

/// A field in a sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SortField {
    /// Source column ID.
    pub source_id: i32,

    /// Transform type.
    pub transform: String,

    /// Sort direction (asc or desc).
    pub direction: String,

    /// Null ordering (nulls-first or nulls-last).
    pub null_order: String,
}

/// Everything a caller supplies to create a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCreation {
    /// Initial schema. Its id is reset to 0.
    pub schema: Schema,
    /// Table location; derived from the warehouse when `None`.
    pub location: Option<String>,
    /// Partition spec; unpartitioned when `None`.
    pub partition_spec: Option<PartitionSpec>,
    /// Sort order; unsorted when `None`.
    pub sort_order: Option<SortOrder>,
    /// Table properties.
    pub properties: HashMap<String, String>,
}

impl TableCreation {
    /// Starts a creation request for the given schema.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            location: None,
            partition_spec: None,
            sort_order: None,
            properties: HashMap::new(),
        }
    }

    /// Sets the table location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the partition spec.
    #[must_use]
    pub fn with_partition_spec(mut self, spec: PartitionSpec) -> Self {
        self.partition_spec = Some(spec);
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Adds a table property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            SchemaField::primitive(1, "id", "long", true),
            SchemaField::primitive(2, "amount", "decimal(10,2)", false),
        ])
    }

    #[test]
    fn test_new_table_defaults() {
        let uuid = Uuid::new_v4();
        let creation = TableCreation::new(schema()).with_property("owner", "etl");
        let metadata = TableMetadata::new_table(uuid, "s3://bucket/db/orders", &creation);

        assert_eq!(metadata.format_version, 2);
        assert_eq!(metadata.table_uuid, uuid);
        assert_eq!(metadata.last_column_id, 2);
        assert_eq!(metadata.last_partition_id, 999);
        assert_eq!(metadata.default_sort_order_id, 0);
        assert!(metadata.current_snapshot_id.is_none());
        assert_eq!(metadata.properties.get("owner").map(String::as_str), Some("etl"));
        assert_eq!(metadata.current_schema().map(|s| s.fields.len()), Some(2));
    }

    #[test]
    fn test_metadata_json_uses_kebab_case() {
        let metadata =
            TableMetadata::new_table(Uuid::new_v4(), "s3://b/t", &TableCreation::new(schema()));
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert!(json.get("table-uuid").is_some());
        assert!(json.get("last-column-id").is_some());
        assert_eq!(json["schemas"][0]["fields"][0]["type"], "long");
        let parsed: TableMetadata = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_minimal_metadata_deserializes() {
        let json = r#"{
            "format-version": 2,
            "table-uuid": "550e8400-e29b-41d4-a716-446655440000",
            "location": "gs://bucket/table",
            "last-sequence-number": 0,
            "last-updated-ms": 1234567890000,
            "last-column-id": 3,
            "current-schema-id": 0,
            "schemas": [],
            "default-spec-id": 0,
            "partition-specs": [],
            "last-partition-id": 0,
            "default-sort-order-id": 0,
            "sort-orders": []
        }"#;
        let metadata: TableMetadata = serde_json::from_str(json).expect("deserialize");
        assert_eq!(metadata.location, "gs://bucket/table");
        assert!(metadata.refs.is_empty());
        assert_eq!(metadata.ref_snapshot_id("main"), None);
    }
}

//! Metadata file I/O.
//!
//! The catalog stores only a pointer (the metadata location) in the reference
//! store. The metadata documents themselves are written and read through
//! [`MetadataIo`]. Metadata files are immutable: a location is written once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::types::TableMetadata;

const METADATA_DIR: &str = "metadata";
const METADATA_SUFFIX: &str = ".metadata.json";

/// Reads and writes table metadata documents.
#[async_trait]
pub trait MetadataIo: Send + Sync + 'static {
    /// Writes a metadata document to a location that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CommitConflict` if the location already exists,
    /// or `CatalogError::CatalogUnavailable` if storage cannot be reached.
    async fn write(&self, location: &str, metadata: &TableMetadata) -> CatalogResult<()>;

    /// Reads a metadata document. Returns `None` if nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Internal` if the document cannot be decoded.
    async fn read(&self, location: &str) -> CatalogResult<Option<TableMetadata>>;
}

/// In-memory metadata I/O keeping serialized JSON documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataIo {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryMetadataIo {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored location, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Internal` if the lock is poisoned.
    pub fn locations(&self) -> CatalogResult<Vec<String>> {
        let files = self.files.read().map_err(|_| lock_poisoned())?;
        let mut locations: Vec<String> = files.keys().cloned().collect();
        locations.sort();
        Ok(locations)
    }
}

fn lock_poisoned() -> CatalogError {
    CatalogError::internal("lock poisoned")
}

#[async_trait]
impl MetadataIo for MemoryMetadataIo {
    async fn write(&self, location: &str, metadata: &TableMetadata) -> CatalogResult<()> {
        let bytes = serde_json::to_vec(metadata).map_err(|e| {
            CatalogError::internal(format!("failed to serialize table metadata: {e}"))
        })?;
        let mut files = self.files.write().map_err(|_| lock_poisoned())?;
        if files.contains_key(location) {
            return Err(CatalogError::commit_conflict(format!(
                "Metadata file already exists: {location}"
            )));
        }
        files.insert(location.to_string(), bytes);
        Ok(())
    }

    async fn read(&self, location: &str) -> CatalogResult<Option<TableMetadata>> {
        let files = self.files.read().map_err(|_| lock_poisoned())?;
        files
            .get(location)
            .map(|bytes| {
                serde_json::from_slice(bytes).map_err(|e| {
                    CatalogError::internal(format!("failed to parse metadata at {location}: {e}"))
                })
            })
            .transpose()
    }
}

/// Builds the location of a new metadata file:
/// `{table_location}/metadata/{version:05}-{uuid}.metadata.json`.
///
/// # Errors
///
/// Returns `CatalogError::InvalidArgument` if the table location is empty.
pub fn new_metadata_location(table_location: &str, version: u64) -> CatalogResult<String> {
    let base = table_location.trim_end_matches('/');
    if base.is_empty() {
        return Err(CatalogError::invalid_argument("Table location is empty"));
    }
    Ok(format!(
        "{base}/{METADATA_DIR}/{version:05}-{}{METADATA_SUFFIX}",
        Uuid::new_v4()
    ))
}

/// Parses the version number from a metadata file name written by
/// [`new_metadata_location`]. Returns `None` for other naming schemes.
#[must_use]
pub fn parse_metadata_version(location: &str) -> Option<u64> {
    let file_name = location.rsplit('/').next()?;
    let stem = file_name.strip_suffix(METADATA_SUFFIX)?;
    let (version, _) = stem.split_once('-')?;
    version.parse().ok()
}

/// Returns the version that follows the metadata file at `location`.
///
/// Falls back to `fallback` when the current name carries no version
/// (for example a table registered from an external writer).
#[must_use]
pub fn next_metadata_version(location: &str, fallback: u64) -> u64 {
    parse_metadata_version(location).map_or(fallback, |version| version + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Schema, TableCreation};

    fn metadata() -> TableMetadata {
        TableMetadata::new_table(
            Uuid::new_v4(),
            "s3://bucket/db/orders",
            &TableCreation::new(Schema::new(vec![])),
        )
    }

    #[test]
    fn test_new_metadata_location_format() {
        let location = new_metadata_location("s3://bucket/db/orders/", 3).expect("location");
        assert!(location.starts_with("s3://bucket/db/orders/metadata/00003-"));
        assert!(location.ends_with(".metadata.json"));
        assert_eq!(parse_metadata_version(&location), Some(3));
        assert_eq!(next_metadata_version(&location, 0), 4);
        assert!(new_metadata_location("/", 0).is_err());
    }

    #[test]
    fn test_parse_version_of_foreign_names() {
        assert_eq!(parse_metadata_version("s3://b/t/metadata/v1.metadata.json"), None);
        assert_eq!(parse_metadata_version("s3://b/t/metadata/snap.avro"), None);
        assert_eq!(next_metadata_version("s3://b/t/metadata/v1.metadata.json", 7), 7);
    }

    #[tokio::test]
    async fn test_memory_io_write_read() {
        let io = MemoryMetadataIo::new();
        let doc = metadata();
        io.write("s3://b/m1.metadata.json", &doc).await.expect("write");
        let read = io.read("s3://b/m1.metadata.json").await.expect("read");
        assert_eq!(read, Some(doc));
        assert_eq!(io.read("s3://b/missing").await.expect("read"), None);
        assert_eq!(io.locations().expect("list"), vec!["s3://b/m1.metadata.json"]);
    }

    #[tokio::test]
    async fn test_memory_io_files_are_immutable() {
        let io = MemoryMetadataIo::new();
        io.write("s3://b/m1", &metadata()).await.expect("write");
        let err = io.write("s3://b/m1", &metadata()).await.expect_err("exists");
        assert!(matches!(err, CatalogError::CommitConflict { .. }));
    }
}

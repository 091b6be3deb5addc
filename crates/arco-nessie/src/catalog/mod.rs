//! The catalog facade.
//!
//! Every operation parses its identifier, resolves the branch to its current
//! hash, reads what it needs at that hash, and (for mutations) sends a single
//! hash-guarded commit. Nothing is cached between operations except the
//! default branch name.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arco_core::MemoryRefStore;
//! use arco_nessie::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let catalog = NessieCatalog::new(
//!     CatalogConfig::new("lake").with_warehouse("s3://bucket/warehouse"),
//!     Arc::new(MemoryRefStore::new()),
//!     Arc::new(MemoryMetadataIo::new()),
//! )
//! .expect("valid config");
//!
//! catalog.create_namespace("db", Default::default()).await.expect("namespace");
//! let schema = Schema::new(vec![SchemaField::primitive(1, "id", "long", true)]);
//! let table = catalog
//!     .create_table("db.orders", TableCreation::new(schema))
//!     .await
//!     .expect("create");
//! assert_eq!(table.identifier().to_string(), "db.orders@main");
//! # });
//! ```

mod namespaces;

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use arco_core::{BranchRef, Content, IcebergTable, ReferenceStore, catalog_span};

use crate::branch::BranchResolver;
use crate::commit::{CommitAttempt, CommitOrchestrator};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::identifier::{Identifier, TableIdentifier, TableRef};
use crate::locator::ContentLocator;
use crate::metadata::{MetadataIo, new_metadata_location, next_metadata_version};
use crate::table::Table;
use crate::types::{CommitTableRequest, CommitTableResponse, TableCreation, TableMetadata};
use crate::update::{apply_updates, finalize_metadata, validate_requirements};

/// Iceberg catalog backed by a versioned reference store.
pub struct NessieCatalog {
    config: CatalogConfig,
    metadata_io: Arc<dyn MetadataIo>,
    resolver: BranchResolver,
    locator: ContentLocator,
    orchestrator: CommitOrchestrator,
}

impl std::fmt::Debug for NessieCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NessieCatalog")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl NessieCatalog {
    /// Creates a catalog over a reference store and a metadata store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if the configuration is invalid.
    pub fn new(
        config: CatalogConfig,
        store: Arc<dyn ReferenceStore>,
        metadata_io: Arc<dyn MetadataIo>,
    ) -> CatalogResult<Self> {
        config.validate()?;
        crate::metrics::register_metrics();
        Ok(Self {
            resolver: BranchResolver::new(Arc::clone(&store), config.reference.clone()),
            locator: ContentLocator::new(Arc::clone(&store)),
            orchestrator: CommitOrchestrator::new(store, config.author.clone()),
            metadata_io,
            config,
        })
    }

    /// Returns the catalog name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Returns the default branch name, asking the store at most once.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store cannot be reached.
    pub async fn default_branch(&self) -> CatalogResult<String> {
        self.resolver.default_branch().await.map(ToString::to_string)
    }

    /// Resolves a branch selector to its current hash.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoSuchBranch` or `CatalogError::CatalogUnavailable`.
    pub async fn resolve_branch(&self, branch: Option<&str>) -> CatalogResult<BranchRef> {
        self.resolver.resolve(branch).await
    }

    /// Parses raw caller input as a table identifier in this catalog.
    ///
    /// A leading segment equal to the catalog name is stripped. Use the result
    /// to build a [`CommitTableRequest`] from a user-supplied name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if the input does not parse.
    pub fn parse_table_identifier(
        &self,
        identifier: impl Into<Identifier>,
    ) -> CatalogResult<TableIdentifier> {
        TableIdentifier::parse_in_catalog(identifier, &self.config.name)
    }

    fn parse_table(&self, table: impl Into<TableRef>) -> CatalogResult<TableIdentifier> {
        table.into().into_identifier(&self.config.name)
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// - `NoSuchNamespace` if the namespace does not exist on the branch
    /// - `TableAlreadyExists` if content exists at the table's key
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn create_table(
        &self,
        identifier: impl Into<TableRef>,
        creation: TableCreation,
    ) -> CatalogResult<Table> {
        let table = self.parse_table(identifier)?;
        let span = catalog_span("create_table", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            let key = table.content_key()?;
            self.require_namespace(&table.namespace, &branch.hash).await?;
            if self.locator.locate_content(&key, &branch.hash).await?.is_some() {
                return Err(CatalogError::table_already_exists(table.table_path()));
            }

            let table_uuid = Uuid::new_v4();
            let location = match &creation.location {
                Some(location) => location.trim_end_matches('/').to_string(),
                None => self
                    .config
                    .default_table_location(&table.namespace, &table.name, table_uuid)?,
            };
            let metadata = TableMetadata::new_table(table_uuid, location.clone(), &creation);
            let metadata_location = new_metadata_location(&location, 0)?;
            self.metadata_io.write(&metadata_location, &metadata).await?;

            let attempt = CommitAttempt::new(
                branch,
                "create_table",
                self.config.commit_message("create table", &table.table_path()),
            )
            .put(
                key,
                table_content(Uuid::new_v4().to_string(), &metadata_location, &metadata),
            );
            let committed = self.orchestrator.commit(attempt).await?;
            tracing::info!(table = %table.table_path(), location = %metadata_location, "created table");
            Ok(Table::new(table.clone(), committed, metadata_location, metadata))
        }
        .instrument(span)
        .await
    }

    /// Registers an existing metadata file as a table.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if no metadata file exists at `metadata_location`
    /// - `NoSuchNamespace`, `TableAlreadyExists`, `CommitConflict` as for
    ///   [`NessieCatalog::create_table`]
    pub async fn register_table(
        &self,
        identifier: impl Into<TableRef>,
        metadata_location: &str,
    ) -> CatalogResult<Table> {
        let table = self.parse_table(identifier)?;
        let span = catalog_span("register_table", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            let key = table.content_key()?;
            self.require_namespace(&table.namespace, &branch.hash).await?;
            if self.locator.locate_content(&key, &branch.hash).await?.is_some() {
                return Err(CatalogError::table_already_exists(table.table_path()));
            }

            let metadata = self.metadata_io.read(metadata_location).await?.ok_or_else(|| {
                CatalogError::invalid_argument(format!(
                    "Metadata file does not exist: {metadata_location}"
                ))
            })?;

            let attempt = CommitAttempt::new(
                branch,
                "register_table",
                self.config.commit_message("register table", &table.table_path()),
            )
            .put(
                key,
                table_content(Uuid::new_v4().to_string(), metadata_location, &metadata),
            );
            let committed = self.orchestrator.commit(attempt).await?;
            Ok(Table::new(
                table.clone(),
                committed,
                metadata_location.to_string(),
                metadata,
            ))
        }
        .instrument(span)
        .await
    }

    /// Loads a table.
    ///
    /// # Errors
    ///
    /// - `NoSuchTable` if no table is stored at the identifier
    /// - `NoSuchBranch` if the selected branch does not exist
    pub async fn load_table(&self, identifier: impl Into<TableRef>) -> CatalogResult<Table> {
        let table = self.parse_table(identifier)?;
        let span = catalog_span("load_table", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            let pointer = self
                .locator
                .locate_table(&table.content_key()?, &branch.hash)
                .await?
                .ok_or_else(|| CatalogError::table_not_found(table.table_path()))?;
            let metadata = self.read_metadata(&pointer.metadata_location).await?;
            Ok(Table::new(
                table.clone(),
                branch,
                pointer.metadata_location,
                metadata,
            ))
        }
        .instrument(span)
        .await
    }

    /// Returns true if a table is stored at the identifier.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier`, `NoSuchBranch`, or `CatalogUnavailable`.
    pub async fn table_exists(&self, identifier: impl Into<TableRef>) -> CatalogResult<bool> {
        let table = self.parse_table(identifier)?;
        let span = catalog_span("table_exists", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            Ok(self
                .locator
                .locate_table(&table.content_key()?, &branch.hash)
                .await?
                .is_some())
        }
        .instrument(span)
        .await
    }

    /// Drops a table.
    ///
    /// # Errors
    ///
    /// - `NoSuchTable` if no table is stored at the identifier, including when
    ///   a concurrent drop removed it first
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn drop_table(&self, identifier: impl Into<TableRef>) -> CatalogResult<()> {
        let table = self.parse_table(identifier)?;
        let span = catalog_span("drop_table", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            let key = table.content_key()?;
            if self.locator.locate_table(&key, &branch.hash).await?.is_none() {
                return Err(CatalogError::table_not_found(table.table_path()));
            }

            let attempt = CommitAttempt::new(
                branch,
                "drop_table",
                self.config.commit_message("drop table", &table.table_path()),
            )
            .delete(key);
            self.orchestrator
                .commit(attempt)
                .await
                .map_err(|err| match err {
                    CatalogError::NoSuchTable { .. } => {
                        CatalogError::table_not_found(table.table_path())
                    }
                    other => other,
                })?;
            tracing::info!(table = %table.table_path(), "dropped table");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Renames a table within one branch.
    ///
    /// The delete of the old key and the put of the new key are one commit:
    /// the table is never visible at both or neither. A branch selector on
    /// either identifier applies to both.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the identifiers select different branches
    /// - `NoSuchTable` if the source does not exist
    /// - `NoSuchNamespace` if the destination namespace does not exist
    /// - `TableAlreadyExists` if content exists at the destination
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn rename_table(
        &self,
        from: impl Into<TableRef>,
        to: impl Into<TableRef>,
    ) -> CatalogResult<Table> {
        let from = self.parse_table(from)?;
        let to = self.parse_table(to)?;
        let span = catalog_span("rename_table", self.name(), from.branch.as_deref());
        async {
            if let (Some(source), Some(target)) = (&from.branch, &to.branch) {
                if source != target {
                    return Err(CatalogError::invalid_argument(format!(
                        "Cannot rename across branches: {from} -> {to}"
                    )));
                }
            }

            let selected = from.branch.as_deref().or(to.branch.as_deref());
            let branch = self.resolver.resolve(selected).await?;
            let from_key = from.content_key()?;
            let to_key = to.content_key()?;

            let source = self
                .locator
                .locate_table(&from_key, &branch.hash)
                .await?
                .ok_or_else(|| CatalogError::table_not_found(from.table_path()))?;
            self.require_namespace(&to.namespace, &branch.hash).await?;
            if self.locator.locate_content(&to_key, &branch.hash).await?.is_some() {
                return Err(CatalogError::table_already_exists(to.table_path()));
            }
            let metadata = self.read_metadata(&source.metadata_location).await?;

            let attempt = CommitAttempt::new(
                branch,
                "rename_table",
                self.config.commit_message(
                    "rename table",
                    &format!("{} to {}", from.table_path(), to.table_path()),
                ),
            )
            .delete(from_key)
            .put(to_key, Content::IcebergTable(source.clone()));
            let committed = self.orchestrator.commit(attempt).await?;
            tracing::info!(from = %from.table_path(), to = %to.table_path(), "renamed table");
            Ok(Table::new(
                to.clone(),
                committed,
                source.metadata_location,
                metadata,
            ))
        }
        .instrument(span)
        .await
    }

    /// Commits metadata changes to a table.
    ///
    /// The branch is resolved fresh and the table's **current** pointer is
    /// read at that hash. The request is rejected if it was based on another
    /// metadata location or its requirements do not hold. The new metadata
    /// file is written, then the pointer is swapped in one conditional commit.
    /// A request with no updates commits nothing and returns current state.
    ///
    /// # Errors
    ///
    /// - `NoSuchTable` if the table is gone
    /// - `CommitConflict` (retryable) if the base location is stale, a
    ///   requirement fails, or the branch moved
    /// - `InvalidArgument` if an update is invalid
    pub async fn commit_table(&self, request: CommitTableRequest) -> CatalogResult<CommitTableResponse> {
        let CommitTableRequest {
            identifier: table,
            base_metadata_location,
            requirements,
            updates,
        } = request;
        table.validate()?;
        let span = catalog_span("commit_table", self.name(), table.branch.as_deref());
        async {
            let branch = self.resolver.resolve(table.branch.as_deref()).await?;
            let key = table.content_key()?;
            let current = self
                .locator
                .locate_table(&key, &branch.hash)
                .await?
                .ok_or_else(|| CatalogError::table_not_found(table.table_path()))?;

            if let Some(base) = &base_metadata_location {
                if *base != current.metadata_location {
                    return Err(CatalogError::commit_conflict(format!(
                        "Table {} changed: based on {base}, current is {}",
                        table.table_path(),
                        current.metadata_location
                    )));
                }
            }

            let base_metadata = self.read_metadata(&current.metadata_location).await?;
            validate_requirements(&base_metadata, &requirements)?;
            if updates.is_empty() {
                return Ok(CommitTableResponse {
                    metadata_location: current.metadata_location,
                    metadata: base_metadata,
                });
            }

            let mut metadata = base_metadata.clone();
            apply_updates(&mut metadata, &updates)?;
            finalize_metadata(&mut metadata, &base_metadata, &current.metadata_location);

            let fallback = u64::try_from(metadata.metadata_log.len()).unwrap_or(u64::MAX);
            let version = next_metadata_version(&current.metadata_location, fallback);
            let metadata_location = new_metadata_location(&metadata.location, version)?;
            self.metadata_io.write(&metadata_location, &metadata).await?;

            let attempt = CommitAttempt::new(
                branch,
                "commit_table",
                self.config.commit_message("update table", &table.table_path()),
            )
            .put(
                key,
                table_content(current.id.clone(), &metadata_location, &metadata),
            );
            self.orchestrator.commit(attempt).await?;
            tracing::info!(
                table = %table.table_path(),
                from = %current.metadata_location,
                to = %metadata_location,
                updates = updates.len(),
                "committed table metadata"
            );
            Ok(CommitTableResponse {
                metadata_location,
                metadata,
            })
        }
        .instrument(span)
        .await
    }

    async fn read_metadata(&self, location: &str) -> CatalogResult<TableMetadata> {
        self.metadata_io.read(location).await?.ok_or_else(|| {
            CatalogError::internal(format!("Table metadata file is missing: {location}"))
        })
    }

    async fn require_namespace(&self, namespace: &[String], hash: &str) -> CatalogResult<()> {
        let key = arco_core::ContentKey::new(namespace.to_vec())
            .map_err(|err| CatalogError::invalid_identifier(err.to_string()))?;
        if self.locator.locate_namespace(&key, hash).await?.is_none() {
            return Err(CatalogError::namespace_not_found(namespace.join(".")));
        }
        Ok(())
    }
}

fn table_content(id: String, metadata_location: &str, metadata: &TableMetadata) -> Content {
    Content::IcebergTable(IcebergTable {
        id,
        metadata_location: metadata_location.to_string(),
        snapshot_id: metadata.current_snapshot_id,
        schema_id: metadata.current_schema_id,
        spec_id: metadata.default_spec_id,
        sort_order_id: metadata.default_sort_order_id,
    })
}

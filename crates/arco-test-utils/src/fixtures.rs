//! Pre-built catalogs for integration tests.
//!
//! A [`CatalogFixture`] wires a [`NessieCatalog`] to a [`TracingRefStore`]
//! and an in-memory metadata store, both shared so a second client can race
//! the first against the same branch.

use std::collections::HashMap;
use std::sync::Arc;

use arco_nessie::prelude::*;

use crate::refstore::TracingRefStore;

/// Catalog name used by fixtures.
pub const TEST_CATALOG: &str = "nessie";

/// Warehouse root used by fixtures.
pub const TEST_WAREHOUSE: &str = "memory://warehouse";

/// A catalog over shared in-memory stores.
pub struct CatalogFixture {
    /// Reference store, shared with every client of this fixture.
    pub store: Arc<TracingRefStore>,
    /// Metadata store, shared with every client of this fixture.
    pub metadata: Arc<MemoryMetadataIo>,
    /// The primary client.
    pub catalog: NessieCatalog,
}

impl CatalogFixture {
    /// Creates a fixture with an empty `main` branch.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(TracingRefStore::new())
    }

    /// Creates a fixture over a prepared store.
    #[must_use]
    pub fn with_store(store: TracingRefStore) -> Self {
        Self::with_config(store, default_config())
    }

    /// Creates a fixture over a prepared store and configuration.
    #[must_use]
    pub fn with_config(store: TracingRefStore, config: CatalogConfig) -> Self {
        let store = Arc::new(store);
        let metadata = Arc::new(MemoryMetadataIo::new());
        let catalog = NessieCatalog::new(config, store.clone(), metadata.clone())
            .expect("valid catalog config");
        Self {
            store,
            metadata,
            catalog,
        }
    }

    /// Creates another client over the same stores.
    #[must_use]
    pub fn second_client(&self) -> NessieCatalog {
        NessieCatalog::new(
            self.catalog.config().clone(),
            self.store.clone(),
            self.metadata.clone(),
        )
        .expect("valid catalog config")
    }

    /// Creates a namespace with no properties.
    pub async fn namespace(&self, namespace: &str) {
        self.catalog
            .create_namespace(namespace, HashMap::new())
            .await
            .expect("create namespace");
    }

    /// Creates a table with [`sample_schema`].
    pub async fn table(&self, identifier: &str) -> Table {
        self.catalog
            .create_table(identifier, TableCreation::new(sample_schema()))
            .await
            .expect("create table")
    }

    /// Creates a branch off the current head of `from`.
    pub async fn branch(&self, name: &str, from: &str) {
        use arco_core::ReferenceStore as _;

        let head = self.store.get_reference(from).await.expect("source branch");
        self.store
            .create_branch(name, &head)
            .await
            .expect("create branch");
    }

    /// Returns the current hash of a branch.
    #[must_use]
    pub fn head(&self, branch: &str) -> String {
        self.store.head(branch).expect("branch exists")
    }
}

impl Default for CatalogFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by fixtures.
#[must_use]
pub fn default_config() -> CatalogConfig {
    CatalogConfig::new(TEST_CATALOG)
        .with_warehouse(TEST_WAREHOUSE)
        .with_author("test-user")
}

/// A three-column schema.
#[must_use]
pub fn sample_schema() -> Schema {
    Schema::new(vec![
        SchemaField::primitive(1, "id", "long", true),
        SchemaField::primitive(2, "customer", "string", false),
        SchemaField::primitive(3, "ts", "timestamptz", false),
    ])
}

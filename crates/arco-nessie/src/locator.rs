//! Content lookups at a fixed hash.
//!
//! Every lookup has three outcomes: the content, its absence, or
//! `CatalogUnavailable` when the store fails. Reads never mutate.

use std::sync::Arc;

use arco_core::{
    Content, ContentKey, ContentType, Entry, Error as StoreError, IcebergTable, Namespace,
    ReferenceStore,
};

use crate::error::{CatalogError, CatalogResult};

/// Reads content from the reference store.
#[derive(Clone)]
pub struct ContentLocator {
    store: Arc<dyn ReferenceStore>,
}

impl std::fmt::Debug for ContentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentLocator").finish_non_exhaustive()
    }
}

impl ContentLocator {
    /// Creates a locator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    /// Returns whatever content is stored at `key` as of `hash`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn locate_content(&self, key: &ContentKey, hash: &str) -> CatalogResult<Option<Content>> {
        self.store
            .get_content(key, hash)
            .await
            .map_err(|err| map_store_error(&err, key))
    }

    /// Returns the table pointer stored for `namespace.table` as of `hash`.
    ///
    /// A key holding anything other than a table is reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` for an unaddressable name, or
    /// `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn locate(
        &self,
        namespace: &[String],
        table: &str,
        hash: &str,
    ) -> CatalogResult<Option<IcebergTable>> {
        let key = ContentKey::of(namespace, table)
            .map_err(|err| CatalogError::invalid_identifier(err.to_string()))?;
        self.locate_table(&key, hash).await
    }

    /// Returns the table pointer stored at `key` as of `hash`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn locate_table(&self, key: &ContentKey, hash: &str) -> CatalogResult<Option<IcebergTable>> {
        let content = self.locate_content(key, hash).await?;
        Ok(match content {
            Some(Content::IcebergTable(table)) => Some(table),
            Some(Content::Namespace(_)) | None => None,
        })
    }

    /// Returns the namespace stored at `key` as of `hash`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn locate_namespace(&self, key: &ContentKey, hash: &str) -> CatalogResult<Option<Namespace>> {
        let content = self.locate_content(key, hash).await?;
        Ok(match content {
            Some(Content::Namespace(namespace)) => Some(namespace),
            Some(Content::IcebergTable(_)) | None => None,
        })
    }

    /// Lists entries strictly below `prefix` as of `hash`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn list(&self, prefix: &[String], hash: &str) -> CatalogResult<Vec<Entry>> {
        let mut entries = self
            .store
            .list_entries(prefix, hash)
            .await
            .map_err(|err| {
                CatalogError::unavailable(format!(
                    "failed to list entries under '{}': {err}",
                    prefix.join(".")
                ))
            })?;
        entries.retain(|entry| entry.key.is_descendant_of(prefix));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Lists the direct children of `parent` with the given content type.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store fails.
    pub async fn list_children(
        &self,
        parent: &[String],
        content_type: ContentType,
        hash: &str,
    ) -> CatalogResult<Vec<ContentKey>> {
        Ok(self
            .list(parent, hash)
            .await?
            .into_iter()
            .filter(|entry| entry.content_type == content_type && entry.key.is_child_of(parent))
            .map(|entry| entry.key)
            .collect())
    }
}

fn map_store_error(err: &StoreError, key: &ContentKey) -> CatalogError {
    CatalogError::unavailable(format!("failed to read content at '{key}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arco_core::{CommitMeta, MemoryRefStore, Operation};

    fn table(location: &str) -> Content {
        Content::IcebergTable(IcebergTable {
            id: "t-1".to_string(),
            metadata_location: location.to_string(),
            snapshot_id: None,
            schema_id: 0,
            spec_id: 0,
            sort_order_id: 0,
        })
    }

    fn namespace(elements: &[&str]) -> Content {
        Content::Namespace(Namespace {
            id: format!("ns-{}", elements.join(".")),
            elements: elements.iter().map(|e| (*e).to_string()).collect(),
            properties: std::collections::BTreeMap::new(),
        })
    }

    fn key(elements: &[&str]) -> ContentKey {
        ContentKey::new(elements.iter().map(|e| (*e).to_string()).collect()).expect("key")
    }

    async fn seeded() -> (ContentLocator, String) {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        let head = store
            .commit(
                "main",
                &main.hash,
                CommitMeta::new("seed"),
                vec![
                    Operation::Put {
                        key: key(&["db"]),
                        content: namespace(&["db"]),
                    },
                    Operation::Put {
                        key: key(&["db", "orders"]),
                        content: table("s3://b/orders/metadata/00000-a.metadata.json"),
                    },
                    Operation::Put {
                        key: key(&["db", "sub"]),
                        content: namespace(&["db", "sub"]),
                    },
                    Operation::Put {
                        key: key(&["db", "sub", "items"]),
                        content: table("s3://b/items/metadata/00000-b.metadata.json"),
                    },
                ],
            )
            .await
            .expect("seed");
        (ContentLocator::new(Arc::new(store)), head.hash)
    }

    #[tokio::test]
    async fn test_locate_found_and_absent() {
        let (locator, hash) = seeded().await;
        let db = vec!["db".to_string()];
        let found = locator.locate(&db, "orders", &hash).await.expect("locate");
        assert_eq!(
            found.map(|t| t.metadata_location),
            Some("s3://b/orders/metadata/00000-a.metadata.json".to_string())
        );
        assert!(locator.locate(&db, "missing", &hash).await.expect("locate").is_none());
    }

    #[tokio::test]
    async fn test_namespace_is_not_a_table() {
        let (locator, hash) = seeded().await;
        let db = vec!["db".to_string()];
        assert!(locator.locate(&db, "sub", &hash).await.expect("locate").is_none());
        assert!(
            locator
                .locate_namespace(&key(&["db", "sub"]), &hash)
                .await
                .expect("locate")
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_list_children() {
        let (locator, hash) = seeded().await;
        let db = vec!["db".to_string()];
        let tables = locator
            .list_children(&db, ContentType::IcebergTable, &hash)
            .await
            .expect("list");
        assert_eq!(tables, vec![key(&["db", "orders"])]);
        let namespaces = locator
            .list_children(&[], ContentType::Namespace, &hash)
            .await
            .expect("list");
        assert_eq!(namespaces, vec![key(&["db"])]);
        assert_eq!(locator.list(&db, &hash).await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_hash_is_unavailable() {
        let (locator, _) = seeded().await;
        let err = locator
            .locate(&["db".to_string()], "orders", "deadbeef")
            .await
            .expect_err("unknown hash");
        assert!(matches!(err, CatalogError::CatalogUnavailable { .. }));
    }
}

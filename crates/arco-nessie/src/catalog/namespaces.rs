//! Namespace operations.
//!
//! Namespaces are content entries in the same tree as tables. Property
//! updates are conditional commits like any table change.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::Instrument;
use uuid::Uuid;

use arco_core::{Content, ContentType, Namespace, catalog_span};

use super::NessieCatalog;
use crate::commit::CommitAttempt;
use crate::error::{CatalogError, CatalogResult};
use crate::identifier::{NamespaceIdentifier, NamespaceRef, TableIdentifier};
use crate::types::PropertiesUpdateSummary;

impl NessieCatalog {
    fn parse_namespace(
        &self,
        namespace: impl Into<NamespaceRef>,
        allow_root: bool,
    ) -> CatalogResult<NamespaceIdentifier> {
        namespace
            .into()
            .into_identifier(&self.config.name, allow_root)
    }

    async fn load_namespace(
        &self,
        namespace: &NamespaceIdentifier,
        hash: &str,
    ) -> CatalogResult<Namespace> {
        self.locator
            .locate_namespace(&namespace.content_key()?, hash)
            .await?
            .ok_or_else(|| CatalogError::namespace_not_found(namespace.path()))
    }

    /// Creates a namespace. Nested namespaces require their parent to exist.
    ///
    /// # Errors
    ///
    /// - `NamespaceAlreadyExists` if content exists at the namespace's key
    /// - `NoSuchNamespace` if the parent namespace does not exist
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn create_namespace(
        &self,
        namespace: impl Into<NamespaceRef>,
        properties: HashMap<String, String>,
    ) -> CatalogResult<()> {
        let namespace = self.parse_namespace(namespace, false)?;
        let span = catalog_span("create_namespace", self.name(), namespace.branch.as_deref());
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            let key = namespace.content_key()?;
            if self.locator.locate_content(&key, &branch.hash).await?.is_some() {
                return Err(CatalogError::namespace_already_exists(namespace.path()));
            }
            let parent = key.namespace();
            if !parent.is_empty() {
                self.require_namespace(parent, &branch.hash).await?;
            }

            let content = Content::Namespace(Namespace {
                id: Uuid::new_v4().to_string(),
                elements: namespace.elements.clone(),
                properties: properties.into_iter().collect(),
            });
            let attempt = CommitAttempt::new(
                branch,
                "create_namespace",
                self.config.commit_message("create namespace", &namespace.path()),
            )
            .put(key, content);
            self.orchestrator.commit(attempt).await?;
            tracing::info!(namespace = %namespace.path(), "created namespace");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Drops an empty namespace.
    ///
    /// # Errors
    ///
    /// - `NoSuchNamespace` if the namespace does not exist
    /// - `NamespaceNotEmpty` if any table or namespace lives under it
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn drop_namespace(&self, namespace: impl Into<NamespaceRef>) -> CatalogResult<()> {
        let namespace = self.parse_namespace(namespace, false)?;
        let span = catalog_span("drop_namespace", self.name(), namespace.branch.as_deref());
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            self.load_namespace(&namespace, &branch.hash).await?;
            let children = self.locator.list(&namespace.elements, &branch.hash).await?;
            if !children.is_empty() {
                return Err(CatalogError::namespace_not_empty(namespace.path()));
            }

            let attempt = CommitAttempt::new(
                branch,
                "drop_namespace",
                self.config.commit_message("drop namespace", &namespace.path()),
            )
            .delete(namespace.content_key()?);
            self.orchestrator
                .commit(attempt)
                .await
                .map_err(|err| match err {
                    CatalogError::NoSuchTable { .. } => {
                        CatalogError::namespace_not_found(namespace.path())
                    }
                    other => other,
                })?;
            tracing::info!(namespace = %namespace.path(), "dropped namespace");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Lists the tables directly inside a namespace, sorted.
    ///
    /// Returned identifiers carry the branch selector of the request.
    ///
    /// # Errors
    ///
    /// `NoSuchNamespace` if the namespace does not exist.
    pub async fn list_tables(
        &self,
        namespace: impl Into<NamespaceRef>,
    ) -> CatalogResult<Vec<TableIdentifier>> {
        let namespace = self.parse_namespace(namespace, false)?;
        let span = catalog_span("list_tables", self.name(), namespace.branch.as_deref());
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            self.load_namespace(&namespace, &branch.hash).await?;
            let keys = self
                .locator
                .list_children(&namespace.elements, ContentType::IcebergTable, &branch.hash)
                .await?;
            Ok(keys
                .into_iter()
                .map(|key| {
                    TableIdentifier::new(key.namespace().to_vec(), key.name())
                        .with_branch(namespace.branch.clone())
                })
                .collect())
        }
        .instrument(span)
        .await
    }

    /// Lists the namespaces directly under `parent`, sorted. An empty parent
    /// lists the top-level namespaces.
    ///
    /// Returned identifiers carry the branch selector of the request.
    ///
    /// # Errors
    ///
    /// `NoSuchNamespace` if a non-root parent does not exist.
    pub async fn list_namespaces(
        &self,
        parent: impl Into<NamespaceRef>,
    ) -> CatalogResult<Vec<NamespaceIdentifier>> {
        let parent = self.parse_namespace(parent, true)?;
        let span = catalog_span("list_namespaces", self.name(), parent.branch.as_deref());
        async {
            let branch = self.resolver.resolve(parent.branch.as_deref()).await?;
            if !parent.is_root() {
                self.load_namespace(&parent, &branch.hash).await?;
            }
            let keys = self
                .locator
                .list_children(&parent.elements, ContentType::Namespace, &branch.hash)
                .await?;
            Ok(keys
                .into_iter()
                .map(|key| NamespaceIdentifier {
                    elements: key.elements().to_vec(),
                    branch: parent.branch.clone(),
                })
                .collect())
        }
        .instrument(span)
        .await
    }

    /// Returns the properties of a namespace.
    ///
    /// # Errors
    ///
    /// `NoSuchNamespace` if the namespace does not exist.
    pub async fn load_namespace_properties(
        &self,
        namespace: impl Into<NamespaceRef>,
    ) -> CatalogResult<HashMap<String, String>> {
        let namespace = self.parse_namespace(namespace, false)?;
        let span = catalog_span(
            "load_namespace_properties",
            self.name(),
            namespace.branch.as_deref(),
        );
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            let stored = self.load_namespace(&namespace, &branch.hash).await?;
            Ok(stored.properties.into_iter().collect())
        }
        .instrument(span)
        .await
    }

    /// Removes and sets namespace properties in one conditional commit.
    ///
    /// Nothing is committed when the properties would not change.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a key is both removed and updated
    /// - `NoSuchNamespace` if the namespace does not exist
    /// - `CommitConflict` if the branch moved during the operation
    pub async fn update_namespace_properties(
        &self,
        namespace: impl Into<NamespaceRef>,
        removals: HashSet<String>,
        updates: HashMap<String, String>,
    ) -> CatalogResult<PropertiesUpdateSummary> {
        let namespace = self.parse_namespace(namespace, false)?;
        let mut overlap: Vec<String> = removals
            .iter()
            .filter(|key| updates.contains_key(*key))
            .cloned()
            .collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(CatalogError::property_overlap(&overlap));
        }

        let span = catalog_span(
            "update_namespace_properties",
            self.name(),
            namespace.branch.as_deref(),
        );
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            let stored = self.load_namespace(&namespace, &branch.hash).await?;

            let mut properties: BTreeMap<String, String> = stored.properties.clone();
            let mut summary = PropertiesUpdateSummary::default();
            for key in removals {
                if properties.remove(&key).is_some() {
                    summary.removed.push(key);
                } else {
                    summary.missing.push(key);
                }
            }
            for (key, value) in updates {
                properties.insert(key.clone(), value);
                summary.updated.push(key);
            }
            summary.removed.sort();
            summary.missing.sort();
            summary.updated.sort();

            if properties == stored.properties {
                return Ok(summary);
            }

            let attempt = CommitAttempt::new(
                branch,
                "update_namespace_properties",
                self.config
                    .commit_message("update namespace properties", &namespace.path()),
            )
            .put(
                namespace.content_key()?,
                Content::Namespace(Namespace {
                    properties,
                    ..stored
                }),
            );
            self.orchestrator.commit(attempt).await?;
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Returns true if the namespace exists.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier`, `NoSuchBranch`, or `CatalogUnavailable`.
    pub async fn namespace_exists(&self, namespace: impl Into<NamespaceRef>) -> CatalogResult<bool> {
        let namespace = self.parse_namespace(namespace, false)?;
        let span = catalog_span("namespace_exists", self.name(), namespace.branch.as_deref());
        async {
            let branch = self.resolver.resolve(namespace.branch.as_deref()).await?;
            Ok(self
                .locator
                .locate_namespace(&namespace.content_key()?, &branch.hash)
                .await?
                .is_some())
        }
        .instrument(span)
        .await
    }
}

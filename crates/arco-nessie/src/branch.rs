//! Branch resolution.
//!
//! Turns an optional branch selector into the branch's current hash. Hashes
//! are read fresh on every call; only the default branch *name* is memoized,
//! once, for the resolver's lifetime.

use std::sync::Arc;

use tokio::sync::OnceCell;

use arco_core::{BranchRef, Error as StoreError, ReferenceStore};

use crate::error::{CatalogError, CatalogResult};

/// Resolves branch selectors against the reference store.
pub struct BranchResolver {
    store: Arc<dyn ReferenceStore>,
    configured_default: Option<String>,
    default_branch: OnceCell<String>,
}

impl std::fmt::Debug for BranchResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchResolver")
            .field("configured_default", &self.configured_default)
            .field("default_branch", &self.default_branch.get())
            .finish_non_exhaustive()
    }
}

impl BranchResolver {
    /// Creates a resolver. `configured_default` overrides the store's default
    /// branch when set.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>, configured_default: Option<String>) -> Self {
        Self {
            store,
            configured_default,
            default_branch: OnceCell::new(),
        }
    }

    /// Returns the default branch name, asking the store at most once.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CatalogUnavailable` if the store cannot be reached.
    pub async fn default_branch(&self) -> CatalogResult<&str> {
        let name = self
            .default_branch
            .get_or_try_init(|| async {
                if let Some(configured) = &self.configured_default {
                    return Ok(configured.clone());
                }
                let name = self
                    .store
                    .default_branch()
                    .await
                    .map_err(|err| map_store_error(err, "<default>"))?;
                tracing::debug!(branch = %name, "resolved default branch");
                Ok::<_, CatalogError>(name)
            })
            .await?;
        Ok(name.as_str())
    }

    /// Resolves a branch selector to the branch's current name and hash.
    ///
    /// `None` selects the default branch.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoSuchBranch` if the branch does not exist, or
    /// `CatalogError::CatalogUnavailable` if the store cannot be reached.
    pub async fn resolve(&self, branch: Option<&str>) -> CatalogResult<BranchRef> {
        let name = match branch {
            Some(name) => name,
            None => self.default_branch().await?,
        };
        let reference = self
            .store
            .get_reference(name)
            .await
            .map_err(|err| map_store_error(err, name))?;
        tracing::debug!(branch = %reference.name, hash = %reference.hash, "resolved branch");
        Ok(reference)
    }
}

fn map_store_error(err: StoreError, branch: &str) -> CatalogError {
    match err {
        StoreError::ReferenceNotFound { name } => CatalogError::branch_not_found(name),
        other => CatalogError::unavailable(format!("failed to resolve branch {branch}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arco_core::MemoryRefStore;

    #[tokio::test]
    async fn test_resolves_default_branch() {
        let store = MemoryRefStore::new();
        let resolver = BranchResolver::new(Arc::new(store.clone()), None);
        let resolved = resolver.resolve(None).await.expect("resolve");
        let explicit = resolver.resolve(Some("main")).await.expect("resolve");
        assert_eq!(resolved, explicit);
        assert_eq!(resolver.default_branch().await.expect("default"), "main");
    }

    #[tokio::test]
    async fn test_unknown_branch() {
        let resolver = BranchResolver::new(Arc::new(MemoryRefStore::new()), None);
        let err = resolver.resolve(Some("nope")).await.expect_err("missing");
        assert_eq!(err, CatalogError::branch_not_found("nope"));
    }

    #[tokio::test]
    async fn test_configured_default_overrides_store() {
        let store = MemoryRefStore::new();
        let main = store.get_reference("main").await.expect("main");
        store.create_branch("dev", &main).await.expect("create");
        let resolver = BranchResolver::new(Arc::new(store), Some("dev".to_string()));
        assert_eq!(resolver.resolve(None).await.expect("resolve").name, "dev");
    }

    #[test]
    fn test_transport_maps_to_unavailable() {
        let err = map_store_error(StoreError::transport("connection refused"), "main");
        assert!(matches!(err, CatalogError::CatalogUnavailable { .. }));
        assert!(err.is_retryable());
    }
}

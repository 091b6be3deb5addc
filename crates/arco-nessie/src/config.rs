//! Catalog configuration.
//!
//! Configuration comes from a catalog properties map (the keys an Iceberg
//! client passes when loading a catalog) or from `NESSIE_*` environment
//! variables. Both paths share one parser over a key lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arco_core::LogFormat;

use crate::error::{CatalogError, CatalogResult};

/// Property key for the catalog name.
pub const PROP_NAME: &str = "name";
/// Property key for the reference store endpoint.
pub const PROP_URI: &str = "uri";
/// Property key for the branch that overrides the store's default branch.
pub const PROP_REF: &str = "ref";
/// Property key for the warehouse root used to derive table locations.
pub const PROP_WAREHOUSE: &str = "warehouse";
/// Property key for the commit author.
pub const PROP_AUTHOR: &str = "author";
/// Property key for the commit message prefix.
pub const PROP_COMMIT_MESSAGE_PREFIX: &str = "commit-message-prefix";
/// Property key for the log format (`json` or `pretty`).
pub const PROP_LOG_FORMAT: &str = "log-format";

const DEFAULT_CATALOG_NAME: &str = "nessie";
const DEFAULT_COMMIT_MESSAGE_PREFIX: &str = "iceberg";

/// Configuration for a [`crate::NessieCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogConfig {
    /// Catalog name; a leading identifier segment equal to it is stripped.
    pub name: String,
    /// Reference store endpoint. Informational for in-process stores.
    pub uri: Option<String>,
    /// Branch used when an identifier names none. Falls back to the store's default.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    /// Warehouse root for tables created without an explicit location.
    pub warehouse: Option<String>,
    /// Author recorded on every commit.
    pub author: Option<String>,
    /// Prefix of every commit message.
    pub commit_message_prefix: String,
    /// Log output format.
    #[serde(skip)]
    pub log_format: LogFormat,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CATALOG_NAME.to_string(),
            uri: None,
            reference: None,
            warehouse: None,
            author: None,
            commit_message_prefix: DEFAULT_COMMIT_MESSAGE_PREFIX.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl CatalogConfig {
    /// Creates a configuration with the given catalog name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the warehouse root.
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Sets the branch override.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the commit author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Builds a configuration from catalog properties.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if a property has an invalid value.
    pub fn from_properties(properties: &HashMap<String, String>) -> CatalogResult<Self> {
        Self::from_lookup(|key| properties.get(key).cloned())
    }

    /// Builds a configuration from `NESSIE_*` environment variables.
    ///
    /// `NESSIE_NAME`, `NESSIE_URI`, `NESSIE_REF`, `NESSIE_WAREHOUSE`,
    /// `NESSIE_AUTHOR`, `NESSIE_COMMIT_MESSAGE_PREFIX`, `NESSIE_LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if a variable has an invalid value.
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(env_var_name(key)).ok())
    }

    /// Builds a configuration from an arbitrary property lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if a property has an invalid value.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| non_blank(lookup(key));
        let mut config = Self::default();

        if let Some(name) = lookup(PROP_NAME) {
            config.name = name;
        }
        config.uri = lookup(PROP_URI);
        config.reference = lookup(PROP_REF);
        config.warehouse = lookup(PROP_WAREHOUSE);
        config.author = lookup(PROP_AUTHOR);
        if let Some(prefix) = lookup(PROP_COMMIT_MESSAGE_PREFIX) {
            config.commit_message_prefix = prefix;
        }
        if let Some(format) = lookup(PROP_LOG_FORMAT) {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| {
                CatalogError::invalid_argument(format!(
                    "{PROP_LOG_FORMAT} must be 'json' or 'pretty', got '{format}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` for an empty or dotted catalog
    /// name, or a branch override containing `@`.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.name.is_empty() || self.name.contains('.') {
            return Err(CatalogError::invalid_argument(format!(
                "catalog name must be non-empty and contain no '.': '{}'",
                self.name
            )));
        }
        if let Some(reference) = &self.reference {
            if reference.contains('@') {
                return Err(CatalogError::invalid_argument(format!(
                    "{PROP_REF} must be a plain branch name: '{reference}'"
                )));
            }
        }
        Ok(())
    }

    /// Returns the location for a new table created without one:
    /// `{warehouse}/{namespace…}/{table}_{id}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidArgument` if no warehouse is configured.
    pub fn default_table_location(
        &self,
        namespace: &[String],
        table: &str,
        id: Uuid,
    ) -> CatalogResult<String> {
        let Some(warehouse) = &self.warehouse else {
            return Err(CatalogError::invalid_argument(format!(
                "No location given for table {table} and no {PROP_WAREHOUSE} configured"
            )));
        };
        let mut location = warehouse.trim_end_matches('/').to_string();
        for element in namespace {
            location.push('/');
            location.push_str(element);
        }
        location.push('/');
        location.push_str(&format!("{table}_{}", id.simple()));
        Ok(location)
    }

    /// Builds the commit message for a catalog action.
    #[must_use]
    pub fn commit_message(&self, action: &str, target: &str) -> String {
        format!("{}: {action} {target}", self.commit_message_prefix)
    }

    /// Initializes process-wide logging in the configured `log-format`.
    ///
    /// Only the first call across the process takes effect.
    pub fn init_logging(&self) {
        arco_core::init_logging(self.log_format);
    }
}

fn env_var_name(key: &str) -> String {
    format!("NESSIE_{}", key.replace('-', "_").to_ascii_uppercase())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

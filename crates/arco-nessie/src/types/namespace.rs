//! Namespace-related types.

use serde::{Deserialize, Serialize};

/// Outcome of a namespace property update.
///
/// Every list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesUpdateSummary {
    /// Keys that were present and removed.
    pub removed: Vec<String>,
    /// Keys that were set.
    pub updated: Vec<String>,
    /// Keys requested for removal that were not present.
    pub missing: Vec<String>,
}

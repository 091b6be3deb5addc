//! Content addressing for the reference store.
//!
//! Every entry in a branch's content tree is addressed by a [`ContentKey`]: the
//! ordered namespace elements followed by the entry name. Keys render as dotted
//! paths; a literal `.` inside an element is escaped with the group separator
//! (`U+001D`) so that rendering is reversible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Separator between rendered key elements.
pub const KEY_SEPARATOR: char = '.';

/// Escape used for a literal `.` inside a single key element.
pub const ESCAPED_SEPARATOR: char = '\u{1D}';

/// Address of a content item in the reference store's tree.
///
/// Ordering is lexicographic by element, so a sorted listing groups
/// children directly under their parent namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ContentKey {
    elements: Vec<String>,
}

impl ContentKey {
    /// Creates a key from its elements.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if there are no elements, an element is
    /// empty, or an element contains the reserved escape character.
    pub fn new(elements: Vec<String>) -> Result<Self> {
        if elements.is_empty() {
            return Err(Error::InvalidInput(
                "content key must have at least one element".to_string(),
            ));
        }
        for element in &elements {
            if element.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "content key has an empty element: {elements:?}"
                )));
            }
            if element.contains(ESCAPED_SEPARATOR) {
                return Err(Error::InvalidInput(format!(
                    "content key element contains reserved character U+001D: {element:?}"
                )));
            }
        }
        Ok(Self { elements })
    }

    /// Creates the key for `name` inside `namespace`.
    ///
    /// # Errors
    ///
    /// Same validation as [`ContentKey::new`].
    pub fn of(namespace: &[String], name: &str) -> Result<Self> {
        let mut elements = namespace.to_vec();
        elements.push(name.to_string());
        Self::new(elements)
    }

    /// Parses a rendered path produced by [`ContentKey::to_path_string`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the path has an empty element.
    pub fn parse_path(path: &str) -> Result<Self> {
        let elements = path
            .split(KEY_SEPARATOR)
            .map(|element| element.replace(ESCAPED_SEPARATOR, "."))
            .collect::<Vec<_>>();
        if elements.iter().any(String::is_empty) {
            return Err(Error::InvalidInput(format!(
                "content key path has an empty element: {path:?}"
            )));
        }
        Ok(Self { elements })
    }

    /// Renders the key as an escaped dotted path.
    #[must_use]
    pub fn to_path_string(&self) -> String {
        self.elements
            .iter()
            .map(|element| element.replace(KEY_SEPARATOR, &ESCAPED_SEPARATOR.to_string()))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns all elements.
    #[must_use]
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Returns the last element (table or namespace leaf name).
    #[must_use]
    pub fn name(&self) -> &str {
        self.elements.last().map_or("", String::as_str)
    }

    /// Returns every element except the last.
    #[must_use]
    pub fn namespace(&self) -> &[String] {
        self.elements
            .split_last()
            .map(|(_, namespace)| namespace)
            .unwrap_or_default()
    }

    /// Returns true if this key is strictly below `prefix`.
    #[must_use]
    pub fn is_descendant_of(&self, prefix: &[String]) -> bool {
        self.elements.len() > prefix.len() && self.elements.starts_with(prefix)
    }

    /// Returns true if this key sits directly inside `parent`.
    #[must_use]
    pub fn is_child_of(&self, parent: &[String]) -> bool {
        self.elements.len() == parent.len() + 1 && self.elements.starts_with(parent)
    }
}

impl TryFrom<Vec<String>> for ContentKey {
    type Error = Error;

    fn try_from(elements: Vec<String>) -> Result<Self> {
        Self::new(elements)
    }
}

impl From<ContentKey> for Vec<String> {
    fn from(key: ContentKey) -> Self {
        key.elements
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.join("."))
    }
}

/// Kind of a content item, as reported by entry listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// An Iceberg table pointer.
    IcebergTable,
    /// A namespace.
    Namespace,
}

/// Pointer to the current metadata file of an Iceberg table.
///
/// Only `metadata_location` is authoritative; the denormalized ids are
/// carried along for store-side inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcebergTable {
    /// Stable content id, preserved across updates and renames.
    pub id: String,
    /// Location of the table's current metadata file.
    pub metadata_location: String,
    /// Current snapshot id, if the table has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<i64>,
    /// Current schema id.
    #[serde(default)]
    pub schema_id: i32,
    /// Default partition spec id.
    #[serde(default)]
    pub spec_id: i32,
    /// Default sort order id.
    #[serde(default)]
    pub sort_order_id: i32,
}

/// A namespace entry and its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Stable content id.
    pub id: String,
    /// Namespace elements (same as the content key's elements).
    pub elements: Vec<String>,
    /// Namespace properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A content item stored at a [`ContentKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Content {
    /// Iceberg table pointer.
    IcebergTable(IcebergTable),
    /// Namespace.
    Namespace(Namespace),
}

impl Content {
    /// Returns the content kind.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::IcebergTable(_) => ContentType::IcebergTable,
            Self::Namespace(_) => ContentType::Namespace,
        }
    }

    /// Returns the stable content id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::IcebergTable(table) => &table.id,
            Self::Namespace(namespace) => &namespace.id,
        }
    }

    /// Returns the table pointer, if this is a table.
    #[must_use]
    pub const fn as_table(&self) -> Option<&IcebergTable> {
        match self {
            Self::IcebergTable(table) => Some(table),
            Self::Namespace(_) => None,
        }
    }

    /// Returns the namespace, if this is a namespace.
    #[must_use]
    pub const fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Self::Namespace(namespace) => Some(namespace),
            Self::IcebergTable(_) => None,
        }
    }
}

//! Catalog identifier parsing.
//!
//! Identifiers are dotted paths whose final segment may select a branch:
//! `db.schema.orders@feature-x`. The final segment is split on its **first**
//! `@`; an empty remainder after the `@` means the default branch, exactly as
//! if no `@` were present.
//!
//! Parsing is pure. Nothing here talks to the reference store.

use std::fmt;

use serde::{Deserialize, Serialize};

use arco_core::ContentKey;

use crate::error::{CatalogError, CatalogResult};

/// Separator between identifier segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Separator between a table (or namespace leaf) name and its branch.
pub const BRANCH_SEPARATOR: char = '@';

/// A raw identifier: a dotted string or pre-split segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier {
    segments: Vec<String>,
}

impl Identifier {
    /// Creates an identifier from pre-split segments.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true if there are no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drops a leading segment equal to `catalog` when at least `min_remaining`
    /// segments are left afterwards.
    #[must_use]
    pub fn without_catalog(mut self, catalog: &str, min_remaining: usize) -> Self {
        if self.segments.len() > min_remaining
            && self.segments.first().is_some_and(|first| first == catalog)
        {
            self.segments.remove(0);
        }
        self
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self::new(
            value
                .split(SEGMENT_SEPARATOR)
                .map(ToString::to_string)
                .collect(),
        )
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for Identifier {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for Identifier {
    fn from(segments: Vec<String>) -> Self {
        Self::new(segments)
    }
}

impl From<&[String]> for Identifier {
    fn from(segments: &[String]) -> Self {
        Self::new(segments.to_vec())
    }
}

impl From<&[&str]> for Identifier {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Identifier {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments.iter().map(ToString::to_string).collect())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Splits a name on its first `@` into the name and an optional branch.
///
/// An empty branch after the `@` is treated as absent.
#[must_use]
pub fn split_table_and_branch(name: &str) -> (&str, Option<&str>) {
    match name.split_once(BRANCH_SEPARATOR) {
        Some((table, branch)) if !branch.is_empty() => (table, Some(branch)),
        Some((table, _)) => (table, None),
        None => (name, None),
    }
}

/// Renders a table identifier in canonical `ns.table[@branch]` form.
#[must_use]
pub fn format_table(namespace: &[String], name: &str, branch: Option<&str>) -> String {
    let mut rendered = namespace.join(".");
    if !rendered.is_empty() {
        rendered.push(SEGMENT_SEPARATOR);
    }
    rendered.push_str(name);
    if let Some(branch) = branch {
        rendered.push(BRANCH_SEPARATOR);
        rendered.push_str(branch);
    }
    rendered
}

fn check_segments(segments: &[String], raw: &Identifier) -> CatalogResult<()> {
    if segments.iter().any(String::is_empty) {
        return Err(CatalogError::invalid_identifier(format!(
            "Identifier has an empty segment: '{raw}'"
        )));
    }
    Ok(())
}

/// A parsed table identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Namespace segments.
    pub namespace: Vec<String>,
    /// Table name.
    pub name: String,
    /// Branch selector; `None` means the default branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl TableIdentifier {
    /// Creates an identifier on the default branch.
    #[must_use]
    pub fn new(namespace: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
            branch: None,
        }
    }

    /// Returns this identifier with the branch selector set.
    #[must_use]
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    /// Parses a table identifier.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if fewer than two segments
    /// are supplied, any segment is empty, or the table name is empty.
    pub fn parse(identifier: impl Into<Identifier>) -> CatalogResult<Self> {
        let raw = identifier.into();
        let segments = raw.segments();
        let Some((last, namespace)) = segments.split_last() else {
            return Err(CatalogError::invalid_identifier(
                "Table identifier is empty".to_string(),
            ));
        };
        if namespace.is_empty() {
            return Err(CatalogError::invalid_identifier(format!(
                "Missing namespace or invalid identifier: '{raw}'"
            )));
        }
        check_segments(namespace, &raw)?;

        let (name, branch) = split_table_and_branch(last);
        if name.is_empty() {
            return Err(CatalogError::invalid_identifier(format!(
                "Table name is empty: '{raw}'"
            )));
        }

        Ok(Self {
            namespace: namespace.to_vec(),
            name: name.to_string(),
            branch: branch.map(ToString::to_string),
        })
    }

    /// Parses an identifier that may be qualified with the catalog's name.
    ///
    /// # Errors
    ///
    /// Same as [`TableIdentifier::parse`].
    pub fn parse_in_catalog(identifier: impl Into<Identifier>, catalog: &str) -> CatalogResult<Self> {
        Self::parse(identifier.into().without_catalog(catalog, 2))
    }

    /// Returns the content key addressing this table.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if an element cannot form a key.
    pub fn content_key(&self) -> CatalogResult<ContentKey> {
        ContentKey::of(&self.namespace, &self.name)
            .map_err(|err| CatalogError::invalid_identifier(err.to_string()))
    }

    /// Checks the shape [`TableIdentifier::parse`] guarantees.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if the namespace is empty, a
    /// segment is empty, the name is empty or holds `@`, or the branch is empty.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.namespace.is_empty() {
            return Err(CatalogError::invalid_identifier(format!(
                "Missing namespace or invalid identifier: '{self}'"
            )));
        }
        if self.namespace.iter().any(String::is_empty)
            || self.name.is_empty()
            || self.name.contains(BRANCH_SEPARATOR)
        {
            return Err(CatalogError::invalid_identifier(format!(
                "Invalid table identifier: '{self}'"
            )));
        }
        check_branch(self.branch.as_deref())
    }

    /// Renders the identifier without its branch selector.
    #[must_use]
    pub fn table_path(&self) -> String {
        format_table(&self.namespace, &self.name, None)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_table(
            &self.namespace,
            &self.name,
            self.branch.as_deref(),
        ))
    }
}

impl From<&TableIdentifier> for TableIdentifier {
    fn from(table: &TableIdentifier) -> Self {
        table.clone()
    }
}

/// A parsed namespace identifier.
///
/// The last element may carry a branch selector (`db.schema@dev`). A bare
/// `@dev` addresses the root namespace on branch `dev`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceIdentifier {
    /// Namespace elements; empty for the root.
    pub elements: Vec<String>,
    /// Branch selector; `None` means the default branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl NamespaceIdentifier {
    /// Parses a namespace identifier that must name at least one element.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if no elements remain or any
    /// element is empty.
    pub fn parse(identifier: impl Into<Identifier>) -> CatalogResult<Self> {
        let parsed = Self::parse_allow_root(identifier)?;
        if parsed.elements.is_empty() {
            return Err(CatalogError::invalid_identifier(
                "Namespace identifier is empty".to_string(),
            ));
        }
        Ok(parsed)
    }

    /// Parses a namespace identifier that may address the root.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if any element is empty.
    pub fn parse_allow_root(identifier: impl Into<Identifier>) -> CatalogResult<Self> {
        let raw = identifier.into();
        let mut elements = raw.segments().to_vec();
        let mut branch = None;
        if let Some(last) = elements.pop() {
            let (leaf, selected) = split_table_and_branch(&last);
            branch = selected.map(ToString::to_string);
            if !leaf.is_empty() {
                elements.push(leaf.to_string());
            } else if !(elements.is_empty() && last.starts_with(BRANCH_SEPARATOR)) {
                return Err(CatalogError::invalid_identifier(format!(
                    "Identifier has an empty segment: '{raw}'"
                )));
            }
        }
        check_segments(&elements, &raw)?;
        Ok(Self { elements, branch })
    }

    /// Parses a namespace identifier that may be qualified with the catalog's name.
    ///
    /// # Errors
    ///
    /// Same as [`NamespaceIdentifier::parse_allow_root`].
    pub fn parse_in_catalog(
        identifier: impl Into<Identifier>,
        catalog: &str,
        allow_root: bool,
    ) -> CatalogResult<Self> {
        let identifier = identifier.into().without_catalog(catalog, 1);
        if allow_root {
            Self::parse_allow_root(identifier)
        } else {
            Self::parse(identifier)
        }
    }

    /// Checks the shape the parsers guarantee.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if an element is empty, the
    /// leaf holds `@`, the branch is empty, or this is the root and
    /// `allow_root` is false.
    pub fn validate(&self, allow_root: bool) -> CatalogResult<()> {
        if self.elements.is_empty() && !allow_root {
            return Err(CatalogError::invalid_identifier(
                "Namespace identifier is empty".to_string(),
            ));
        }
        if self.elements.iter().any(String::is_empty)
            || self
                .elements
                .last()
                .is_some_and(|leaf| leaf.contains(BRANCH_SEPARATOR))
        {
            return Err(CatalogError::invalid_identifier(format!(
                "Invalid namespace identifier: '{self}'"
            )));
        }
        check_branch(self.branch.as_deref())
    }

    /// Returns true if this addresses the root namespace.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the content key addressing this namespace.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` for the root or an invalid element.
    pub fn content_key(&self) -> CatalogResult<ContentKey> {
        ContentKey::new(self.elements.clone())
            .map_err(|err| CatalogError::invalid_identifier(err.to_string()))
    }

    /// Renders the elements without the branch selector.
    #[must_use]
    pub fn path(&self) -> String {
        self.elements.join(".")
    }
}

impl fmt::Display for NamespaceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())?;
        if let Some(branch) = &self.branch {
            write!(f, "{BRANCH_SEPARATOR}{branch}")?;
        }
        Ok(())
    }
}

/// A table as named by a caller of the catalog.
///
/// Raw input may be qualified with the catalog's name and is parsed against
/// it. A [`TableIdentifier`] the catalog handed out is used as is: its
/// namespace is never prefix-stripped a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// A dotted string or segments, possibly catalog-qualified.
    Raw(Identifier),
    /// An already parsed identifier.
    Parsed(TableIdentifier),
}

impl TableRef {
    /// Resolves the reference to a table identifier in `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if raw input does not parse or
    /// a parsed identifier is malformed.
    pub fn into_identifier(self, catalog: &str) -> CatalogResult<TableIdentifier> {
        match self {
            Self::Raw(raw) => TableIdentifier::parse_in_catalog(raw, catalog),
            Self::Parsed(table) => {
                table.validate()?;
                Ok(table)
            }
        }
    }
}

impl From<TableIdentifier> for TableRef {
    fn from(table: TableIdentifier) -> Self {
        Self::Parsed(table)
    }
}

impl From<&TableIdentifier> for TableRef {
    fn from(table: &TableIdentifier) -> Self {
        Self::Parsed(table.clone())
    }
}

/// A namespace as named by a caller of the catalog.
///
/// Same contract as [`TableRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceRef {
    /// A dotted string or segments, possibly catalog-qualified.
    Raw(Identifier),
    /// An already parsed identifier.
    Parsed(NamespaceIdentifier),
}

impl NamespaceRef {
    /// Resolves the reference to a namespace identifier in `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIdentifier` if raw input does not parse,
    /// a parsed identifier is malformed, or the root is named where it is not
    /// allowed.
    pub fn into_identifier(
        self,
        catalog: &str,
        allow_root: bool,
    ) -> CatalogResult<NamespaceIdentifier> {
        match self {
            Self::Raw(raw) => NamespaceIdentifier::parse_in_catalog(raw, catalog, allow_root),
            Self::Parsed(namespace) => {
                namespace.validate(allow_root)?;
                Ok(namespace)
            }
        }
    }
}

impl From<NamespaceIdentifier> for NamespaceRef {
    fn from(namespace: NamespaceIdentifier) -> Self {
        Self::Parsed(namespace)
    }
}

impl From<&NamespaceIdentifier> for NamespaceRef {
    fn from(namespace: &NamespaceIdentifier) -> Self {
        Self::Parsed(namespace.clone())
    }
}

macro_rules! raw_reference {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for TableRef {
                fn from(value: $source) -> Self {
                    Self::Raw(Identifier::from(value))
                }
            }

            impl From<$source> for NamespaceRef {
                fn from(value: $source) -> Self {
                    Self::Raw(Identifier::from(value))
                }
            }
        )*
    };
}

raw_reference!(&str, String, &String, Vec<String>, &[String], &[&str]);

impl<const N: usize> From<[&str; N]> for TableRef {
    fn from(segments: [&str; N]) -> Self {
        Self::Raw(Identifier::from(segments))
    }
}

impl<const N: usize> From<[&str; N]> for NamespaceRef {
    fn from(segments: [&str; N]) -> Self {
        Self::Raw(Identifier::from(segments))
    }
}

impl From<Identifier> for TableRef {
    fn from(raw: Identifier) -> Self {
        Self::Raw(raw)
    }
}

impl From<Identifier> for NamespaceRef {
    fn from(raw: Identifier) -> Self {
        Self::Raw(raw)
    }
}

fn check_branch(branch: Option<&str>) -> CatalogResult<()> {
    match branch {
        Some(branch) if branch.is_empty() => Err(CatalogError::invalid_identifier(
            "Branch selector is empty".to_string(),
        )),
        _ => Ok(()),
    }
}

//! Iceberg metadata, commit, and namespace types.

pub mod commit;
mod namespace;
mod table;

pub use commit::*;
pub use namespace::*;
pub use table::*;

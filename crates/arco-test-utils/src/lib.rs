//! Shared test utilities for the Arco Nessie catalog.
//!
//! This crate provides:
//! - [`TracingRefStore`]: In-memory reference store with operation recording
//!   and failure injection
//! - [`CatalogFixture`]: A catalog wired to shared in-memory stores
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use arco_test_utils::CatalogFixture;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let fx = CatalogFixture::new();
//!     fx.namespace("db").await;
//!     fx.table("db.orders").await;
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod refstore;

pub use assertions::*;
pub use fixtures::*;
pub use refstore::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("arco_nessie=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}

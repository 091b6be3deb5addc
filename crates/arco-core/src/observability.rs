//! Observability infrastructure for the catalog.
//!
//! Structured logging with consistent spans. Catalog operations run inside a
//! `catalog` span carrying the operation name and the branch it targets, so that
//! every store call and commit outcome logged beneath it can be correlated.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name (`json` or `pretty`), case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops, as is a call made after another global
/// subscriber was installed.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `arco_nessie=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .try_init();
            }
            LogFormat::Pretty => {
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .try_init();
            }
        }
    });
}

/// Creates a span for catalog operations with standard fields.
///
/// `branch` is the branch selector as written by the caller; `None` means the
/// default branch will be used.
///
/// # Example
///
/// ```rust
/// use arco_core::observability::catalog_span;
///
/// let span = catalog_span("drop_table", "lakehouse", Some("feature-x"));
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn catalog_span(operation: &str, catalog: &str, branch: Option<&str>) -> Span {
    tracing::info_span!(
        "catalog",
        op = operation,
        catalog = catalog,
        branch = branch.unwrap_or("<default>"),
    )
}

/// Creates a span for a single reference-store commit attempt.
#[must_use]
pub fn commit_span(branch: &str, expected_hash: &str, operations: usize) -> Span {
    tracing::debug_span!(
        "nessie_commit",
        branch = branch,
        expected_hash = expected_hash,
        operations = operations,
    )
}

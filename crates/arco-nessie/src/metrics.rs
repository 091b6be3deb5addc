//! Commit metrics.
//!
//! Counters are emitted through the `metrics` facade; installing a recorder
//! (Prometheus or otherwise) is left to the embedding application.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};

/// Commit attempts by catalog operation and outcome.
pub const NESSIE_COMMIT_TOTAL: &str = "nessie_commit_total";

/// Commit attempts rejected because the branch moved.
pub const NESSIE_COMMIT_CONFLICT_TOTAL: &str = "nessie_commit_conflict_total";

static METRICS_REGISTERED: OnceLock<()> = OnceLock::new();

/// Registers metric descriptions.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn register_metrics() {
    METRICS_REGISTERED.get_or_init(|| {
        describe_counter!(
            NESSIE_COMMIT_TOTAL,
            "Total number of reference-store commit attempts"
        );
        describe_counter!(
            NESSIE_COMMIT_CONFLICT_TOTAL,
            "Total number of commit attempts rejected by a hash conflict"
        );
    });
}

/// Records the outcome of one commit attempt.
pub fn record_commit(operation: &str, outcome: &'static str) {
    register_metrics();
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(NESSIE_COMMIT_TOTAL, &labels).increment(1);
}

/// Records a commit conflict.
pub fn record_conflict(operation: &str) {
    register_metrics();
    let labels = [("operation", operation.to_string())];
    counter!(NESSIE_COMMIT_CONFLICT_TOTAL, &labels).increment(1);
}

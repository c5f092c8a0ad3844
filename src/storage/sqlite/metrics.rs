//! Metrics recording for ledger operations.

use std::time::Instant;

/// Records operation metrics for a ledger call.
///
/// Emits two series per call:
/// 1. `ledger_operations_total` - counter by backend, operation and status
/// 2. `ledger_operation_duration_ms` - latency histogram with the same labels
///
/// `status` is one of `"success"`, `"duplicate"` or `"error"`.
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "ledger_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "ledger_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Maps a ledger result onto the status label used by [`record_operation_metrics`].
#[must_use]
pub const fn status_label<T>(result: &crate::Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(crate::Error::DuplicateKey { .. }) => "duplicate",
        Err(_) => "error",
    }
}

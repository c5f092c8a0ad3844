//! `SQLite` ledger backend and shared helpers.
//!
//! - `connection`: mutex handling with poison recovery and pragma setup
//! - `metrics`: per-operation counters and latency histograms
//! - `sql`: LIKE escaping and filter clause construction
//! - `row`: conversion between table rows and [`crate::models::AttendanceRecord`]

mod connection;
mod ledger;
mod metrics;
mod row;
mod sql;

pub use connection::{acquire_lock, configure_connection};
pub use ledger::SqliteLedger;
pub use metrics::record_operation_metrics;
pub use row::AttendanceRow;
pub use sql::{build_filter_clause, escape_like_wildcards};

//! Shared connection handling for the `SQLite` ledger.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Busy timeout applied to every ledger connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Acquires a mutex lock, recovering the inner value if it was poisoned.
///
/// A panic inside one ledger call must not take the whole recognition run
/// down with it; the connection itself stays usable.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a ledger connection.
///
/// - **WAL mode**: concurrent readers alongside the single writer
/// - **NORMAL synchronous**: durable at checkpoints
/// - **`busy_timeout`**: a second process writing the same file waits instead of failing
/// - **`foreign_keys`**: enabled for future schema versions
///
/// In-memory databases report `memory` for `journal_mode`, so the WAL
/// switch is allowed to be a no-op there.
///
/// # Errors
///
/// Returns [`Error::LedgerUnavailable`] if the busy timeout cannot be set.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "foreign_keys", "ON");
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
        .map_err(|e| Error::LedgerUnavailable {
            operation: "configure_connection".to_string(),
            cause: e.to_string(),
        })?;

    Ok(())
}

//! Storage layer.
//!
//! The ledger is the authoritative record of who attended which subject on
//! which day. Two backends implement [`Ledger`]:
//! - **`SQLite`**: durable, shared between processes through the file
//! - **Memory**: non-persistent, for tests and dry runs
//!
//! Both enforce uniqueness of `(student_name, subject, date)` at write time,
//! so callers never rely on a read-then-write check for correctness.

// Dropping the connection guard a few statements early gains nothing here.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::Ledger;

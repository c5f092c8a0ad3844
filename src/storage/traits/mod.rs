//! Storage backend traits.

mod ledger;

pub use ledger::Ledger;

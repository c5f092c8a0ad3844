//! Status CLI command.

use super::{open_ledger, write_error};
use crate::config::RollcallConfig;
use crate::storage::Ledger;
use crate::storage::migrations::{LEDGER_MIGRATIONS, latest_version};
use crate::Result;
use std::io::Write;

/// Shows ledger location, schema version and row count.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCommand;

impl StatusCommand {
    /// Creates a new status command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Prints the status report. Opening the ledger creates it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be
    /// opened or read.
    pub fn run(self, config: &RollcallConfig, out: &mut impl Write) -> Result<()> {
        let path = config.ledger_path();
        let existed = path.exists();
        let ledger = open_ledger(config)?;

        writeln!(out, "Rollcall Status").map_err(write_error)?;
        writeln!(out, "===============").map_err(write_error)?;
        writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION")).map_err(write_error)?;
        writeln!(out, "Data Directory: {}", config.data_dir.display()).map_err(write_error)?;
        writeln!(
            out,
            "Ledger: {}{}",
            path.display(),
            if existed { "" } else { " (created)" }
        )
        .map_err(write_error)?;
        writeln!(
            out,
            "Schema Version: {} of {}",
            ledger.schema_version()?,
            latest_version(LEDGER_MIGRATIONS)
        )
        .map_err(write_error)?;
        writeln!(out, "Records: {}", ledger.count()?).map_err(write_error)?;
        Ok(())
    }
}

//! Config CLI command.

use super::write_error;
use crate::config::RollcallConfig;
use crate::Result;
use clap::Args;
use std::io::Write;

/// Shows the effective configuration.
#[derive(Debug, Clone, Copy, Args)]
pub struct ConfigCommand {
    /// Show current configuration.
    #[arg(long)]
    pub show: bool,
}

impl ConfigCommand {
    /// Prints the configuration as TOML, or a hint when `--show` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be rendered.
    pub fn run(self, config: &RollcallConfig, out: &mut impl Write) -> Result<()> {
        if !self.show {
            writeln!(out, "Use 'rollcall config --show' to view the effective configuration")
                .map_err(write_error)?;
            return Ok(());
        }

        writeln!(out, "# ledger: {}", config.ledger_path().display()).map_err(write_error)?;
        write!(out, "{}", config.to_toml()?).map_err(write_error)?;
        Ok(())
    }
}

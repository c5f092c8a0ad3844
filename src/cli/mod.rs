//! CLI command implementations.
//!
//! Each submodule implements one `rollcall` subcommand. Commands take their
//! parsed arguments, the effective [`RollcallConfig`] and an output writer,
//! so they can be exercised without a terminal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `replay` | Run the recognition loop over a recorded match stream |
//! | `save` | Write a session roster with explicit statuses |
//! | `show` | Show the records of one session |
//! | `report` | List records by teacher, subject or keyword, or summarise a student |
//! | `status` | Show ledger location, schema version and row count |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! # Replay a recording against today's Maths session
//! rollcall replay stream.jsonl --subject Maths --teacher "Ms. Rivera"
//!
//! # Preview without writing
//! rollcall replay stream.jsonl --subject Maths --dry-run
//!
//! # Manual entry
//! rollcall save --subject Maths --student Alice Bob Cara --present Alice Cara
//!
//! # Attendance percentage
//! rollcall report --student Alice
//! ```

mod config;
mod replay;
mod report;
mod save;
mod show;
mod status;

pub use config::ConfigCommand;
pub use replay::{DecisionLog, ReplayCommand};
pub use report::ReportCommand;
pub use save::SaveCommand;
pub use show::ShowCommand;
pub use status::StatusCommand;

use crate::config::RollcallConfig;
use crate::models::SessionContext;
use crate::storage::SqliteLedger;
use crate::{Error, Result};
use chrono::NaiveDate;
use clap::Args;

/// Arguments that identify a class session.
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Subject being taught.
    #[arg(short, long)]
    pub subject: String,

    /// Teacher running the session (defaults to the configured teacher).
    #[arg(short, long)]
    pub teacher: Option<String>,

    /// Session date, YYYY-MM-DD (defaults to today).
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

impl SessionArgs {
    /// Builds the validated session context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] for an empty or placeholder subject.
    pub fn resolve(&self, config: &RollcallConfig) -> Result<SessionContext> {
        config.session(&self.subject, self.teacher.as_deref(), self.date)
    }
}

/// Opens the configured on-disk ledger.
///
/// # Errors
///
/// Returns [`Error::LedgerUnavailable`] if the database cannot be opened.
pub fn open_ledger(config: &RollcallConfig) -> Result<SqliteLedger> {
    SqliteLedger::new(config.ledger_path())
}

#[allow(clippy::needless_pass_by_value)]
pub(crate) fn write_error(e: std::io::Error) -> Error {
    Error::OperationFailed {
        operation: "write_output".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Config whose data directory lives in a fresh temp dir.
    pub fn temp_config() -> (TempDir, RollcallConfig) {
        let dir = TempDir::new().unwrap();
        let config = RollcallConfig::default().with_data_dir(dir.path());
        (dir, config)
    }

    pub fn session_args(subject: &str) -> SessionArgs {
        SessionArgs {
            subject: subject.to_string(),
            teacher: Some("T1".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 10),
        }
    }
}

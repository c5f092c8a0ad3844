//! Save CLI command.

use super::{SessionArgs, open_ledger, write_error};
use crate::config::RollcallConfig;
use crate::services::ManualEntryService;
use crate::Result;
use clap::Args;
use std::collections::HashSet;
use std::io::Write;

/// Writes a session roster with an explicit status per student.
#[derive(Debug, Clone, Args)]
pub struct SaveCommand {
    /// Session the records belong to.
    #[command(flatten)]
    pub session: SessionArgs,

    /// Roster, in roll-number order.
    #[arg(long = "student", required = true, num_args = 1..)]
    pub students: Vec<String>,

    /// Students to mark present; everyone else is marked absent.
    #[arg(long = "present", num_args = 1.., conflicts_with = "all_present")]
    pub present: Vec<String>,

    /// Mark the whole roster present.
    #[arg(long)]
    pub all_present: bool,
}

impl SaveCommand {
    /// Saves the roster and returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSession`] for a bad subject,
    /// [`crate::Error::InvalidInput`] when `--present` names someone outside
    /// the roster, and [`crate::Error::LedgerUnavailable`] if the batch
    /// cannot be written.
    pub fn run(&self, config: &RollcallConfig, out: &mut impl Write) -> Result<usize> {
        let session = self.session.resolve(config)?;
        self.check_present_on_roster()?;

        let service = ManualEntryService::new(open_ledger(config)?);
        let written = if self.all_present {
            service.mark_all_present(&session, &self.students)?
        } else {
            let present: HashSet<String> = self.present.iter().cloned().collect();
            service.save(&session, &self.students, &present)?
        };

        let marked = service
            .load(&session)?
            .values()
            .filter(|status| status.is_present())
            .count();
        writeln!(out, "Saved {written} records for {session} ({marked} present)")
            .map_err(write_error)?;
        Ok(written)
    }

    fn check_present_on_roster(&self) -> Result<()> {
        let roster: HashSet<String> = self
            .students
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();
        let unknown: Vec<&str> = self
            .present
            .iter()
            .filter(|name| !roster.contains(&name.trim().to_lowercase()))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::InvalidInput(format!(
                "not on the roster: {}",
                unknown.join(", ")
            )))
        }
    }
}

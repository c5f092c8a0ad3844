//! Show CLI command.

use super::{open_ledger, write_error};
use crate::config::RollcallConfig;
use crate::models::AttendanceRecord;
use crate::storage::Ledger;
use crate::Result;
use chrono::NaiveDate;
use clap::Args;
use std::io::Write;

/// Shows the records of one session.
#[derive(Debug, Clone, Args)]
pub struct ShowCommand {
    /// Subject.
    #[arg(short, long)]
    pub subject: String,

    /// Session date, YYYY-MM-DD (defaults to today).
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

impl ShowCommand {
    /// Prints the session's records, roll number first, then name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be read.
    pub fn run(&self, config: &RollcallConfig, out: &mut impl Write) -> Result<Vec<AttendanceRecord>> {
        let subject = self.subject.trim();
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let mut records = open_ledger(config)?.records_for_session(subject, date)?;
        records.sort_by(|a, b| {
            (a.roll_number.is_none(), a.roll_number, &a.student_name)
                .cmp(&(b.roll_number.is_none(), b.roll_number, &b.student_name))
        });

        if records.is_empty() {
            writeln!(out, "No records for {subject} on {date}").map_err(write_error)?;
            return Ok(records);
        }

        writeln!(out, "{subject} on {date}").map_err(write_error)?;
        for record in &records {
            let roll = record
                .roll_number
                .map_or_else(|| "-".to_string(), |r| r.to_string());
            writeln!(
                out,
                "  {roll:>3}  {:<24} {:<8} {}",
                record.student_name,
                record.status.as_str(),
                record.teacher_name
            )
            .map_err(write_error)?;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::temp_config;

    #[test]
    fn test_show_orders_rostered_first() {
        let (_dir, config) = temp_config();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let ledger = open_ledger(&config).unwrap();
        ledger.insert_present("Zoe", "Maths", date, "T1").unwrap();
        let mut bob = AttendanceRecord::present("Bob", "Maths", date, "T1");
        bob.roll_number = Some(1);
        ledger.insert_or_overwrite(&bob).unwrap();
        drop(ledger);

        let cmd = ShowCommand {
            subject: "Maths".to_string(),
            date: Some(date),
        };
        let mut out = Vec::new();
        let records = cmd.run(&config, &mut out).unwrap();

        let names: Vec<_> = records.iter().map(|r| r.student_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Zoe"]);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Maths on 2024-01-10"));
        assert!(text.contains("    -  Zoe"));
    }

    #[test]
    fn test_show_empty_session() {
        let (_dir, config) = temp_config();
        let cmd = ShowCommand {
            subject: "Maths".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10),
        };
        let mut out = Vec::new();
        assert!(cmd.run(&config, &mut out).unwrap().is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap().trim(),
            "No records for Maths on 2024-01-10"
        );
    }
}

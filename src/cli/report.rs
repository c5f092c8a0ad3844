//! Report CLI command.

use super::{open_ledger, write_error};
use crate::config::RollcallConfig;
use crate::models::RecordFilter;
use crate::services::ReportService;
use crate::{Error, Result};
use clap::Args;
use std::io::Write;

/// Lists records or summarises one student.
#[derive(Debug, Clone, Args)]
pub struct ReportCommand {
    /// Summarise this student's attendance instead of listing records.
    #[arg(long, conflicts_with_all = ["teacher", "subject", "keyword"])]
    pub student: Option<String>,

    /// Only this teacher's sessions.
    #[arg(short, long)]
    pub teacher: Option<String>,

    /// Only this subject.
    #[arg(short, long)]
    pub subject: Option<String>,

    /// Substring matched against student name or date.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Maximum number of records.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl ReportCommand {
    /// Prints the report.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be read.
    pub fn run(&self, config: &RollcallConfig, out: &mut impl Write) -> Result<()> {
        let reports = ReportService::new(open_ledger(config)?);

        if let Some(student) = &self.student {
            let summary = reports.student_summary(student.trim())?;
            if self.json {
                return write_json(out, &summary);
            }
            writeln!(out, "{}: {summary}", summary.student_name).map_err(write_error)?;
            return Ok(());
        }

        let records = reports.list(&self.filter())?;
        if self.json {
            return write_json(out, &records);
        }
        if records.is_empty() {
            writeln!(out, "No matching records").map_err(write_error)?;
            return Ok(());
        }
        for record in &records {
            writeln!(
                out,
                "{}  {:<16} {:<24} {:<8} {}",
                record.date,
                record.subject,
                record.student_name,
                record.status.as_str(),
                record.teacher_name
            )
            .map_err(write_error)?;
        }
        writeln!(out, "{} records", records.len()).map_err(write_error)?;
        Ok(())
    }

    fn filter(&self) -> RecordFilter {
        let mut filter = RecordFilter::new();
        if let Some(teacher) = &self.teacher {
            filter = filter.with_teacher(teacher.trim());
        }
        if let Some(subject) = &self.subject {
            filter = filter.with_subject(subject.trim());
        }
        if let Some(keyword) = &self.keyword {
            filter = filter.with_keyword(keyword.trim());
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        filter
    }
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::OperationFailed {
        operation: "render_report".to_string(),
        cause: e.to_string(),
    })?;
    writeln!(out, "{json}").map_err(write_error)
}

//! Session context for a recognition run.

use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Teacher name recorded when none is supplied.
pub const DEFAULT_TEACHER: &str = "Unknown Teacher";

/// Subject values that mean "nothing selected yet".
pub const DEFAULT_PLACEHOLDER_SUBJECTS: &[&str] = &["select subject", "no subject selected"];

/// The immutable (subject, teacher, date) scope of one recognition run.
///
/// Only constructible through validating constructors, so holding a
/// `SessionContext` means the subject is real.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionContext {
    subject: String,
    teacher: String,
    date: NaiveDate,
}

impl SessionContext {
    /// Creates a session context, rejecting the default placeholder subjects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] if the subject is empty or a placeholder.
    pub fn new(
        subject: impl Into<String>,
        teacher: impl Into<String>,
        date: NaiveDate,
    ) -> Result<Self> {
        Self::with_placeholders(subject, teacher, date, DEFAULT_PLACEHOLDER_SUBJECTS)
    }

    /// Creates a session context dated today (local calendar day).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] if the subject is empty or a placeholder.
    pub fn for_today(subject: impl Into<String>, teacher: impl Into<String>) -> Result<Self> {
        Self::new(subject, teacher, Local::now().date_naive())
    }

    /// Creates a session context against a custom placeholder list.
    ///
    /// Placeholders are compared case-insensitively after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSession`] if the subject is empty or a placeholder.
    pub fn with_placeholders<S: AsRef<str>>(
        subject: impl Into<String>,
        teacher: impl Into<String>,
        date: NaiveDate,
        placeholders: &[S],
    ) -> Result<Self> {
        let subject = subject.into().trim().to_string();
        if subject.is_empty() {
            return Err(Error::InvalidSession("subject is empty".to_string()));
        }

        let lowered = subject.to_lowercase();
        if placeholders
            .iter()
            .any(|p| p.as_ref().trim().to_lowercase() == lowered)
        {
            return Err(Error::InvalidSession(format!(
                "'{subject}' is a placeholder, select a subject first"
            )));
        }

        let teacher = teacher.into().trim().to_string();
        let teacher = if teacher.is_empty() {
            DEFAULT_TEACHER.to_string()
        } else {
            teacher
        };

        Ok(Self {
            subject,
            teacher,
            date,
        })
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the teacher name.
    #[must_use]
    pub fn teacher(&self) -> &str {
        &self.teacher
    }

    /// Returns the calendar day.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) on {}", self.subject, self.teacher, self.date)
    }
}

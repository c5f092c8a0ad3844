//! SQL helpers for the `SQLite` ledger.

use crate::models::RecordFilter;

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// `%`, `_` and `\` are prefixed with a backslash; queries using the result
/// must declare `ESCAPE '\'`.
///
/// # Examples
///
/// ```
/// use rollcall::storage::sqlite::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("o_neil"), "o\\_neil");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds a `WHERE` clause and positional parameters for a [`RecordFilter`].
///
/// Returns an empty clause for an empty filter. Parameters are numbered
/// from `?1` in the order they appear in the clause. The keyword matches a
/// substring of the student name or the ISO date; `SQLite` LIKE is
/// case-insensitive for ASCII.
///
/// # Examples
///
/// ```
/// use rollcall::models::RecordFilter;
/// use rollcall::storage::sqlite::build_filter_clause;
///
/// let filter = RecordFilter::new().with_subject("Maths").with_keyword("ali");
/// let (clause, params) = build_filter_clause(&filter);
/// assert_eq!(
///     clause,
///     " WHERE subject = ?1 AND (student_name LIKE ?2 ESCAPE '\\' OR date LIKE ?2 ESCAPE '\\')"
/// );
/// assert_eq!(params, vec!["Maths".to_string(), "%ali%".to_string()]);
/// ```
#[must_use]
pub fn build_filter_clause(filter: &RecordFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    let mut push_eq = |column: &str, value: String, conditions: &mut Vec<String>| {
        params.push(value);
        conditions.push(format!("{column} = ?{}", params.len()));
    };

    if let Some(student) = &filter.student {
        push_eq("student_name", student.clone(), &mut conditions);
    }
    if let Some(teacher) = &filter.teacher {
        push_eq("teacher_name", teacher.clone(), &mut conditions);
    }
    if let Some(subject) = &filter.subject {
        push_eq("subject", subject.clone(), &mut conditions);
    }
    if let Some(date) = filter.date {
        push_eq("date", date.to_string(), &mut conditions);
    }
    if let Some(status) = filter.status {
        push_eq("status", status.as_str().to_string(), &mut conditions);
    }
    if let Some(keyword) = &filter.keyword {
        params.push(format!("%{}%", escape_like_wildcards(keyword)));
        let idx = params.len();
        conditions.push(format!(
            "(student_name LIKE ?{idx} ESCAPE '\\' OR date LIKE ?{idx} ESCAPE '\\')"
        ));
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

//! Row normalization, filtering, and ordering.

use chrono::NaiveDate;

use crate::schema::{dates, ColumnMap, Field, FIELD_COUNT};
use crate::sheet::RawRow;

/// Status values that mean a row is finished and leaves the report.
pub const COMPLETED_STATUSES: [&str; 3] = ["complete", "done", "closed"];

/// One report-ready row with canonical fields resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    fields: [String; FIELD_COUNT],
    /// Normalized target date, if one resolved.
    pub due_date: Option<NaiveDate>,
    /// Signed days from the run date to the due date. Negative is
    /// overdue; `None` renders as "N/A".
    pub days_until_due: Option<i64>,
    /// Sort key. Undated rows carry the sentinel and sort last.
    pub sort_date: NaiveDate,
}

impl NormalizedRow {
    /// Build from a raw row using the worksheet's column map.
    ///
    /// When the target date normalizes, the rendered date field is the
    /// ISO form rather than whatever the cell held, so mixed-format
    /// sheets produce uniform reports. Unparseable date text (say
    /// "TBD") is shown as written.
    pub fn from_raw(raw: &RawRow, columns: &ColumnMap, today: NaiveDate) -> Self {
        let mut fields: [String; FIELD_COUNT] = Default::default();
        for field in Field::ALL {
            fields[field.index()] = columns.value(field, raw).display_text();
        }

        let due_date = columns
            .get(Field::TargetDate)
            .and_then(|idx| dates::normalize(raw.get(idx)));
        if let Some(due) = due_date {
            fields[Field::TargetDate.index()] = due.format("%Y-%m-%d").to_string();
        }

        let days_until_due = due_date.map(|due| dates::days_until(due, today));
        let sort_date = due_date.unwrap_or(dates::SORT_SENTINEL);

        Self {
            fields,
            due_date,
            days_until_due,
            sort_date,
        }
    }

    pub fn get(&self, field: Field) -> &str {
        &self.fields[field.index()]
    }

    pub fn status(&self) -> &str {
        self.get(Field::Status)
    }

    /// Whether the status marks this row finished, case-insensitively.
    pub fn is_completed(&self) -> bool {
        let status = self.status().trim();
        COMPLETED_STATUSES
            .iter()
            .any(|s| status.eq_ignore_ascii_case(s))
    }

    /// Whether every resolved field came back empty.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(String::is_empty)
    }

    /// Days-until-due for display: the signed number, or "N/A" when no
    /// date resolved.
    pub fn days_display(&self) -> String {
        match self.days_until_due {
            Some(days) => days.to_string(),
            None => "N/A".to_string(),
        }
    }
}

/// Drop completed and blank rows. Keeps input order.
pub fn filter_rows(rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
    rows.into_iter()
        .filter(|row| !row.is_completed() && !row.is_blank())
        .collect()
}

/// Stable ascending sort by due date. Undated rows keep their relative
/// order at the end.
pub fn sort_rows(rows: &mut [NormalizedRow]) {
    rows.sort_by_key(|row| row.sort_date);
}

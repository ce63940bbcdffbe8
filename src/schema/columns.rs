//! Per-worksheet resolution of canonical fields to column positions.

use crate::error::{ReportError, Result};
use crate::schema::aliases::{Field, ALIASES, FIELD_COUNT};
use crate::sheet::{CellValue, RawRow};

/// Canonical field to column index, resolved for one worksheet (or one
/// header block). Lifetime is a single report run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    slots: [Option<usize>; FIELD_COUNT],
}

impl ColumnMap {
    /// Resolve a header row against the alias table.
    ///
    /// Fields are visited in fixed table order and each field takes the
    /// last column whose trimmed text is in its alias set, so repeated
    /// or overlapping aliases resolve the same way on every run.
    pub fn resolve(header: &RawRow) -> Self {
        let mut slots = [None; FIELD_COUNT];
        for (field, aliases) in ALIASES {
            for (idx, cell) in header.cells.iter().enumerate() {
                if let CellValue::Text(text) = cell {
                    if aliases.contains(&text.trim()) {
                        slots[field.index()] = Some(idx);
                    }
                }
            }
        }
        Self { slots }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.slots[field.index()]
    }

    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Column index for a required field, or a schema error naming the
    /// worksheet.
    pub fn require(&self, field: Field, worksheet: &str) -> Result<usize> {
        self.get(field).ok_or_else(|| ReportError::Schema {
            worksheet: worksheet.to_string(),
            message: format!(
                "no recognizable {} column",
                field.canonical_name().to_lowercase()
            ),
        })
    }

    /// Fields that resolved to a column, in canonical order.
    pub fn resolved_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|f| self.has(*f))
    }

    /// Whether no field resolved at all.
    pub fn is_unresolved(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Cell for a field in a data row; the empty cell when the field
    /// did not resolve.
    pub fn value<'a>(&self, field: Field, row: &'a RawRow) -> &'a CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        match self.get(field) {
            Some(idx) => row.get(idx),
            None => &EMPTY,
        }
    }
}

//! Cell values decoded from workbook data.

use chrono::NaiveDate;

use crate::schema::dates;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A single spreadsheet cell, decoded once at read time.
///
/// Downstream stages match on this instead of the raw workbook types,
/// so date handling and display formatting live in one place.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Decode a calamine cell.
    pub fn from_data(data: &calamine::Data) -> Self {
        use calamine::Data;

        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                match dates::from_serial(serial) {
                    Some(date) => CellValue::Date(date),
                    None => CellValue::Number(serial),
                }
            }
            Data::DateTimeIso(s) => match dates::parse_iso_datetime(s) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Text(s.clone()),
            },
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            // Formula error cells (#VALUE!, #REF!) carry no usable value.
            Data::Error(_) => CellValue::Empty,
        }
    }

    /// Whether the cell is empty or whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell for report output.
    ///
    /// Whole numbers print without a trailing `.0` so numeric IDs read
    /// the way they do in the sheet.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    format!("{}", f)
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One physical worksheet row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `idx`, or the empty cell for ragged rows.
    pub fn get(&self, idx: usize) -> &CellValue {
        self.cells.get(idx).unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether every cell in the row is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;

    #[test]
    fn test_from_data_basic_variants() {
        assert_eq!(CellValue::from_data(&Data::Empty), CellValue::Empty);
        assert_eq!(
            CellValue::from_data(&Data::String("Status".to_string())),
            CellValue::Text("Status".to_string())
        );
        assert_eq!(
            CellValue::from_data(&Data::Float(2.5)),
            CellValue::Number(2.5)
        );
        assert_eq!(CellValue::from_data(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(
            CellValue::from_data(&Data::Bool(true)),
            CellValue::Bool(true)
        );
    }

    #[test]
    fn test_from_data_error_cell_is_empty() {
        let cell = CellValue::from_data(&Data::Error(calamine::CellErrorType::Value));
        assert_eq!(cell, CellValue::Empty);
    }

    #[test]
    fn test_from_data_iso_datetime() {
        let cell = CellValue::from_data(&Data::DateTimeIso("2024-03-15T00:00:00".to_string()));
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(cell, CellValue::Date(expected));
    }

    #[test]
    fn test_display_text_whole_numbers() {
        assert_eq!(CellValue::Number(42.0).display_text(), "42");
        assert_eq!(CellValue::Number(2.5).display_text(), "2.5");
        assert_eq!(CellValue::Number(-3.0).display_text(), "-3");
    }

    #[test]
    fn test_display_text_trims() {
        assert_eq!(
            CellValue::Text("  In Progress  ".to_string()).display_text(),
            "In Progress"
        );
        assert_eq!(CellValue::Empty.display_text(), "");
    }

    #[test]
    fn test_is_empty_whitespace_text() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::Text("   ".to_string()).is_empty());
        assert!(!CellValue::Text("x".to_string()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_raw_row_blank_and_ragged_get() {
        let row = RawRow::new(vec![
            CellValue::Empty,
            CellValue::Text("  ".to_string()),
        ]);
        assert!(row.is_blank());
        assert_eq!(row.get(5), &CellValue::Empty);

        let row = RawRow::new(vec![CellValue::Text("API".to_string())]);
        assert!(!row.is_blank());
    }
}

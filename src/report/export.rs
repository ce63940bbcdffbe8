//! Tabular export of the report rows.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{ReportError, Result};
use crate::report::html::ReportSection;
use crate::report::output;
use crate::schema::Field;

/// Column headers in export order, matching the HTML table.
const EXPORT_HEADERS: [&str; 6] = [
    "Component",
    "Status",
    "Owner",
    "Target Date",
    "Days Until Due",
    "Notes",
];

/// Write the export workbook: the same rows as the HTML report, with
/// canonical headers, one worksheet. Saved to a temp sibling and
/// renamed into place.
pub fn write_export(path: &Path, worksheet: &str, sections: &[ReportSection]) -> Result<()> {
    output::check_overwritable(path)?;

    let mut workbook = build_workbook(worksheet, sections).map_err(|e| ReportError::Render {
        artifact: "export".to_string(),
        reason: e.to_string(),
    })?;

    let tmp = output::temp_sibling(path);
    workbook
        .save(&tmp)
        .map_err(|e| ReportError::write(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        ReportError::write(path, e)
    })?;
    Ok(())
}

fn build_workbook(
    worksheet: &str,
    sections: &[ReportSection],
) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&safe_sheet_name(worksheet))?;

    let header_format = Format::new().set_bold();
    let mut row: u32 = 0;

    for (i, section) in sections.iter().enumerate() {
        if let Some(heading) = &section.heading {
            sheet.write_string_with_format(row, 0, heading, &header_format)?;
            row += 1;
        }

        for (col, header) in EXPORT_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, *header, &header_format)?;
        }
        row += 1;

        for data in &section.rows {
            sheet.write_string(row, 0, data.get(Field::Component))?;
            sheet.write_string(row, 1, data.status())?;
            sheet.write_string(row, 2, data.get(Field::Owner))?;
            sheet.write_string(row, 3, data.get(Field::TargetDate))?;
            match data.days_until_due {
                Some(days) => sheet.write_number(row, 4, days as f64)?,
                None => sheet.write_string(row, 4, "N/A")?,
            };
            sheet.write_string(row, 5, data.get(Field::Notes))?;
            row += 1;
        }

        // Blank separator row between stacked tables.
        if i + 1 < sections.len() {
            row += 1;
        }
    }

    Ok(workbook)
}

/// Worksheet names cap at 31 characters and reject a handful of
/// punctuation characters.
fn safe_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
            c => c,
        })
        .take(31)
        .collect();
    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMap;
    use crate::sheet::{CellValue, RawRow, WorkbookReader};
    use crate::report::rows::NormalizedRow;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn row(cells: &[&str]) -> NormalizedRow {
        let header = RawRow::new(
            ["Component", "Status", "Owner", "Target Date", "Notes"]
                .iter()
                .map(|s| CellValue::Text(s.to_string()))
                .collect(),
        );
        let map = ColumnMap::resolve(&header);
        let raw = RawRow::new(
            cells
                .iter()
                .map(|s| CellValue::Text(s.to_string()))
                .collect(),
        );
        NormalizedRow::from_raw(&raw, &map, today())
    }

    #[test]
    fn test_safe_sheet_name() {
        assert_eq!(safe_sheet_name("Release: Q1/Q2"), "Release- Q1-Q2");
        assert_eq!(safe_sheet_name(""), "Report");
        assert_eq!(safe_sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_export_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let sections = vec![ReportSection {
            heading: None,
            rows: vec![
                row(&["API", "Pending", "Alice", "2024-01-01", "late"]),
                row(&["Docs", "In Progress", "Bob", "TBD", ""]),
            ],
        }];
        write_export(&path, "Tracking", &sections).unwrap();

        let mut reader = WorkbookReader::open(&path).unwrap();
        assert_eq!(reader.sheet_names(), vec!["Tracking".to_string()]);

        let grid = reader.read_sheet("Tracking").unwrap();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows[0].get(0), &CellValue::Text("Component".to_string()));
        assert_eq!(grid.rows[0].get(4), &CellValue::Text("Days Until Due".to_string()));
        assert_eq!(grid.rows[1].get(0), &CellValue::Text("API".to_string()));
        assert_eq!(grid.rows[1].get(4), &CellValue::Number(-9.0));
        assert_eq!(grid.rows[2].get(4), &CellValue::Text("N/A".to_string()));
    }

    #[test]
    fn test_export_sections_with_headings_and_separators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let sections = vec![
            ReportSection {
                heading: Some("Table 1".to_string()),
                rows: vec![row(&["API", "Pending", "", "", ""])],
            },
            ReportSection {
                heading: Some("Table 2".to_string()),
                rows: vec![row(&["Docs", "Pending", "", "", ""])],
            },
        ];
        write_export(&path, "Checklist", &sections).unwrap();

        let mut reader = WorkbookReader::open(&path).unwrap();
        let grid = reader.read_sheet("Checklist").unwrap();

        // Heading, header, data, blank, heading, header, data.
        assert_eq!(grid.row_count(), 7);
        assert_eq!(grid.rows[0].get(0), &CellValue::Text("Table 1".to_string()));
        assert!(grid.rows[3].is_blank());
        assert_eq!(grid.rows[4].get(0), &CellValue::Text("Table 2".to_string()));
    }

    #[test]
    fn test_export_missing_dir_fails() {
        let sections = vec![ReportSection {
            heading: None,
            rows: vec![],
        }];
        let err = write_export(Path::new("no/such/dir/export.xlsx"), "T", &sections).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
    }
}

//! Workbook reading: cell decoding, worksheet grids, flavor matching.

pub mod cell;
pub mod reader;

pub use cell::{CellValue, RawRow};
pub use reader::{check_readable, SheetGrid, WorkbookReader};

/// Normalize a worksheet name for flavor matching: lowercase, letters
/// and digits only. "Go / No-Go" and "GoNoGo" compare equal.
pub fn normalize_sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Whether a worksheet name matches one of the configured multi-table
/// sheet names.
pub fn is_special_sheet(name: &str, special: &[String]) -> bool {
    let normalized = normalize_sheet_name(name);
    special
        .iter()
        .any(|s| normalize_sheet_name(s) == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sheet_name() {
        assert_eq!(normalize_sheet_name("Go / No-Go"), "gonogo");
        assert_eq!(normalize_sheet_name("Release Checklist"), "releasechecklist");
        assert_eq!(normalize_sheet_name(""), "");
    }

    #[test]
    fn test_is_special_sheet_ignores_case_and_punctuation() {
        let special = vec!["Release Checklist".to_string(), "Go-No-Go".to_string()];
        assert!(is_special_sheet("release checklist", &special));
        assert!(is_special_sheet("GO / NO / GO", &special));
        assert!(!is_special_sheet("Tracking", &special));
    }
}

//! Workbook access on top of calamine.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader, Sheets};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::sheet::cell::{CellValue, RawRow};

/// All rows of one worksheet, decoded to [`CellValue`].
///
/// Rows are physical: the header row (where one exists) is `rows[0]`,
/// and multi-table sheets keep every row so block boundaries stay
/// aligned with what the user sees.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl SheetGrid {
    /// First row as the literal header, remaining rows as data.
    pub fn split_header(&self) -> Option<(&RawRow, &[RawRow])> {
        self.rows.split_first()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Open workbook handle.
pub struct WorkbookReader {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookReader {
    /// Open a workbook, verifying the path is readable first so access
    /// problems surface before any processing starts.
    pub fn open(path: &Path) -> Result<Self> {
        check_readable(path)?;
        let workbook = open_workbook_auto(path).map_err(|e| ReportError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Read one worksheet into a grid.
    pub fn read_sheet(&mut self, name: &str) -> Result<SheetGrid> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| ReportError::Workbook {
                path: self.path.clone(),
                reason: format!("worksheet '{}': {}", name, e),
            })?;

        let rows: Vec<RawRow> = range
            .rows()
            .map(|cells| RawRow::new(cells.iter().map(CellValue::from_data).collect()))
            .collect();

        debug!(worksheet = name, rows = rows.len(), "read worksheet");
        Ok(SheetGrid {
            name: name.to_string(),
            rows,
        })
    }
}

/// Verify a source file exists and can be opened for reading.
///
/// Catches missing paths and files locked by another process before
/// the job is counted as started.
pub fn check_readable(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| ReportError::file_access(path, e))?;
    if !meta.is_file() {
        return Err(ReportError::file_access(path, "not a regular file"));
    }
    File::open(path).map_err(|e| ReportError::file_access(path, e))?;
    Ok(())
}

//! Header-block detection for sheets with stacked tables.
//!
//! Checklist-style sheets have no single header row: several small
//! tables sit one after another, each with its own header. The scanner
//! finds those headers and assigns every following row to the nearest
//! block above it, so downstream stages can treat each block like a
//! small standalone sheet.

use tracing::debug;

use crate::schema::aliases::is_known_alias;
use crate::schema::columns::ColumnMap;
use crate::sheet::{CellValue, RawRow};

/// One header-plus-data table detected inside a sheet.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    /// Grid index of the header row.
    pub header_row: usize,
    /// Columns resolved from the header row, applied positionally to
    /// the block's data rows.
    pub columns: ColumnMap,
    /// First data row owned by this block.
    pub data_start: usize,
    /// One past the last data row owned by this block.
    pub data_end: usize,
}

impl HeaderBlock {
    pub fn data_range(&self) -> std::ops::Range<usize> {
        self.data_start..self.data_end
    }

    pub fn data_len(&self) -> usize {
        self.data_end - self.data_start
    }
}

/// Count the cells whose trimmed text equals a recognized alias.
fn alias_hits(row: &RawRow) -> usize {
    row.cells
        .iter()
        .filter(|cell| match cell {
            CellValue::Text(text) => is_known_alias(text),
            _ => false,
        })
        .count()
}

/// Whether a row reads as a table header.
///
/// The threshold guards against data rows that happen to contain one
/// alias-like cell; real header rows match several.
pub fn is_header_row(row: &RawRow, threshold: usize) -> bool {
    alias_hits(row) >= threshold.max(1)
}

/// Scan a sheet top to bottom for stacked tables.
///
/// Each header row opens a block owning the rows up to the next header
/// row, or the end of the sheet for the last block. Blocks are returned
/// in sheet order; rows above the first header belong to no block.
pub fn scan_blocks(rows: &[RawRow], threshold: usize) -> Vec<HeaderBlock> {
    let headers: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| is_header_row(row, threshold))
        .map(|(idx, _)| idx)
        .collect();

    let blocks: Vec<HeaderBlock> = headers
        .iter()
        .enumerate()
        .map(|(i, &header_row)| {
            let data_end = headers.get(i + 1).copied().unwrap_or(rows.len());
            HeaderBlock {
                header_row,
                columns: ColumnMap::resolve(&rows[header_row]),
                data_start: header_row + 1,
                data_end,
            }
        })
        .collect();

    debug!(blocks = blocks.len(), rows = rows.len(), "scanned header blocks");
    blocks
}

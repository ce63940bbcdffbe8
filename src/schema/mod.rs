//! Sheet schema resolution: canonical fields, column maps, date
//! normalization, and multi-table header detection.

pub mod aliases;
pub mod blocks;
pub mod columns;
pub mod dates;

pub use aliases::{Field, FIELD_COUNT};
pub use blocks::{scan_blocks, HeaderBlock};
pub use columns::ColumnMap;

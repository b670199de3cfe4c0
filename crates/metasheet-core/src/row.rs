//! Row types

use crate::cell::CellValue;
use crate::number_format::NumberFormat;

/// A dense row of cell values, index 0 = column A
pub type Row = Vec<CellValue>;

/// Number formats of a row, index 0 = column A
///
/// May be shorter than its row; missing entries mean General.
pub type RowFormats = Vec<Option<NumberFormat>>;

/// Check whether every cell in a row is empty or whitespace-only
///
/// An empty slice counts as blank.
pub fn row_is_blank(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}

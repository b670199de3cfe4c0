//! # metasheet-core
//!
//! Core data structures shared by the metasheet crates.
//!
//! This crate provides the in-memory model the engine works on:
//! - [`CellValue`] - Represents cell values (numbers, strings, booleans, errors, formulas)
//! - [`CellAddress`] - Cell addressing and column-letter conversion
//! - [`NumberFormat`] - Display format attached to a cell
//! - [`Workbook`], [`Worksheet`] - The document structures
//!
//! ## Example
//!
//! ```rust
//! use metasheet_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let index = workbook.add_worksheet_with_name("Sample").unwrap();
//! let sheet = workbook.worksheet_mut(index).unwrap();
//!
//! sheet.set_cell_value_at(0, 0, "expNum").unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::Number(7.0)).unwrap();
//! sheet.set_cell_formula_at(1, 1, "=A2*2").unwrap();
//!
//! assert_eq!(sheet.row_count(), 2);
//! ```

pub mod cell;
pub mod error;
pub mod number_format;
pub mod row;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellValue, SharedString};
pub use error::{Error, Result};
pub use number_format::NumberFormat;
pub use row::{row_is_blank, Row, RowFormats};
pub use workbook::Workbook;
pub use worksheet::{CellData, Worksheet};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

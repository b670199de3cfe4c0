//! # metasheet-xlsx
//!
//! Spreadsheet file I/O for metasheet.
//!
//! - [`XlsxReader`] opens `.xlsx`, `.xlsm` and `.xls` files and reads sheets
//!   either as stored values or with formula text kept.
//! - [`XlsxWriter`] saves a [`metasheet_core::Workbook`] as `.xlsx`, including
//!   formula cells and number formats. Formulas are never evaluated; the
//!   written workbook asks the spreadsheet application to recalculate on load.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::{ReadMode, XlsxReader};
pub use writer::XlsxWriter;

//! # metasheet
//!
//! Combines laboratory run metadata workbooks into one workbook per run,
//! fills a formula template with the merged samples, and exports fixed
//! sheet regions to flat files.
//!
//! ## Features
//!
//! - Group `metadata_<RUN>_<YYYYMMDD>[_<SUFFIX>].xlsx` files by run and date
//! - Merge every sheet of a group under a prefix/header/data layout
//! - Project the sample sheet onto a fixed column set
//! - Write lookup, classification and manifest formulas into a template
//! - Export sheet regions to CSV, stopping at the first blank row
//!
//! ## Example
//!
//! ```no_run
//! use metasheet::prelude::*;
//!
//! let options = CombineOptions::new("incoming", "combined").with_template("template.xlsx");
//! let report = combine(&options, &mut |p: f64| println!("{:.0}%", p)).unwrap();
//! for path in report.outputs() {
//!     println!("{}", path.display());
//! }
//!
//! let export_options = ExportOptions::new("combined", "flat");
//! export(&export_options, &mut |_: f64| {}).unwrap();
//! ```

pub mod classify;
pub mod combine;
pub mod error;
pub mod export;
pub mod formula;
pub mod layout;
pub mod merge;
pub mod prelude;
pub mod progress;
pub mod project;
pub mod synthesize;

pub use classify::{classify, group, scan, RunGroup, RunKey, ScanMode, SourceFile};
pub use combine::{combine, CombineOptions, CombineReport, GroupReport};
pub use error::{Error, GroupWarning, Result};
pub use export::{export, ExportOptions, ExportTarget};
pub use layout::{LayoutConfig, SheetLayout, SheetRole, SheetRule};
pub use merge::{merge_sheet, MergedTable, SheetGrid};
pub use progress::ProgressSink;
pub use project::{Projection, SAMPLE_COLUMNS};
pub use synthesize::{synthesize, SynthesisSession};

// Re-export the cell model and file I/O
pub use metasheet_core::{CellValue, NumberFormat, Row, Workbook, Worksheet};
pub use metasheet_csv::{CsvWriteOptions, CsvWriter, LineTerminator};
pub use metasheet_xlsx::{ReadMode, XlsxReader, XlsxWriter};

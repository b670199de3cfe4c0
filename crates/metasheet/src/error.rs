//! Error and warning types for the metasheet engine

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a whole run, a group, or a workbook export
#[derive(Debug, Error)]
pub enum Error {
    /// A source, template or export input path does not exist
    #[error("Input path not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A path that must be a directory is something else
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A path that must be a file is something else
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// A scan or export found nothing to process
    #[error("No matching input files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    /// Strict scan found spreadsheet names that do not follow the pattern
    #[error(
        "File names do not match metadata_<RUN>_<YYYYMMDD>[_<SUFFIX>].xlsx: {}",
        .names.join(", ")
    )]
    FilenameFormat {
        /// Every offending file name, sorted
        names: Vec<String>,
    },

    /// The reference file of a group is too short to hold the header row
    #[error("Header row {} missing in sheet '{sheet}' ({rows} rows)", .header_row + 1)]
    HeaderRowMissing {
        /// Sheet being merged
        sheet: String,
        /// 0-based header row
        header_row: u32,
        /// Rows present in the reference file
        rows: u32,
    },

    /// None of the desired columns appear in the header
    #[error("No desired columns found in sheet '{sheet}'")]
    NoDesiredColumns {
        /// Sheet whose header was searched
        sheet: String,
    },

    /// The template lacks one of the sheets derived rows are written to
    #[error("Template missing sheet '{sheet}'")]
    TemplateMissingSheet {
        /// Missing sheet name
        sheet: String,
    },

    /// An export target sheet is absent from a workbook
    #[error("Sheet '{sheet}' not found in {workbook}")]
    SheetNotFound {
        /// Requested sheet
        sheet: String,
        /// File name of the workbook
        workbook: String,
    },

    /// The layout configuration is inconsistent
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Spreadsheet I/O error
    #[error(transparent)]
    Xlsx(#[from] metasheet_xlsx::XlsxError),

    /// Flat file write error
    #[error(transparent)]
    Csv(#[from] metasheet_csv::CsvError),

    /// Cell model error
    #[error(transparent)]
    Core(#[from] metasheet_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A recoverable problem recorded against one group
///
/// Warnings never stop a group; they are surfaced in its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupWarning {
    /// A source file could not be opened or decoded
    UnreadableFile {
        /// The file
        path: PathBuf,
        /// Decoder message
        reason: String,
    },
    /// A source file lacks a sheet that other files in the group have
    MissingSheet {
        /// The file
        path: PathBuf,
        /// The absent sheet
        sheet: String,
    },
    /// A source file ends before its data region begins
    ShortSheet {
        /// The file
        path: PathBuf,
        /// The sheet
        sheet: String,
        /// Rows present
        rows: u32,
    },
    /// A row filter column is absent from the header, so the filter was skipped
    MissingFilterColumn {
        /// The sheet
        sheet: String,
        /// The absent column
        column: String,
    },
    /// Values that occur more than once in a checked column
    DuplicateValues {
        /// Column name
        column: String,
        /// Repeated values, sorted
        values: Vec<String>,
    },
    /// No file in the group produced anything to merge
    NoUsableRows,
}

impl fmt::Display for GroupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupWarning::UnreadableFile { path, reason } => {
                write!(f, "cannot read {}: {}", path.display(), reason)
            }
            GroupWarning::MissingSheet { path, sheet } => {
                write!(f, "{} has no sheet '{}'", path.display(), sheet)
            }
            GroupWarning::ShortSheet { path, sheet, rows } => write!(
                f,
                "sheet '{}' in {} has only {} rows and contributes no data",
                sheet,
                path.display(),
                rows
            ),
            GroupWarning::MissingFilterColumn { sheet, column } => write!(
                f,
                "sheet '{}' has no '{}' column; row filter skipped",
                sheet, column
            ),
            GroupWarning::DuplicateValues { column, values } => {
                write!(f, "duplicate {} values: {}", column, values.join(", "))
            }
            GroupWarning::NoUsableRows => f.write_str("no file yielded usable rows; group skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::HeaderRowMissing {
            sheet: "Sample".into(),
            header_row: 20,
            rows: 5,
        };
        assert_eq!(err.to_string(), "Header row 21 missing in sheet 'Sample' (5 rows)");

        let err = Error::FilenameFormat {
            names: vec!["a.xlsx".into(), "badname.xlsx".into()],
        };
        assert!(err.to_string().ends_with("a.xlsx, badname.xlsx"));

        let err = Error::SheetNotFound {
            sheet: "Aviti Manifest".into(),
            workbook: "RUN1_20240101.xlsx".into(),
        };
        assert_eq!(
            err.to_string(),
            "Sheet 'Aviti Manifest' not found in RUN1_20240101.xlsx"
        );
    }

    #[test]
    fn test_warning_display() {
        let w = GroupWarning::DuplicateValues {
            column: "LABCODE".into(),
            values: vec!["GS01".into(), "GS02".into()],
        };
        assert_eq!(w.to_string(), "duplicate LABCODE values: GS01, GS02");
    }
}

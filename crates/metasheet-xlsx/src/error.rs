//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during spreadsheet reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Error raised by the workbook decoder
    #[error("Read error: {0}")]
    Read(#[from] calamine::Error),

    /// Sheet not present in the workbook
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    /// Invalid file format
    #[error("Invalid spreadsheet format: {0}")]
    InvalidFormat(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] metasheet_core::Error),
}

//! Spreadsheet reader
//!
//! Decoding is delegated to calamine, which handles both the Office Open XML
//! formats and legacy `.xls`. This module maps its cell model onto
//! [`metasheet_core`] types.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, CellErrorType, Data, Range, Reader, Sheets};
use metasheet_core::{CellError, CellValue, NumberFormat, Workbook, Worksheet};
use tracing::debug;

use crate::error::{XlsxError, XlsxResult};

/// How formula cells are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Stored values only; a formula cell yields its cached result, if any
    #[default]
    Values,
    /// Formula cells yield their formula text; other cells their value
    Formulas,
}

/// Spreadsheet file reader
pub struct XlsxReader {
    path: PathBuf,
    inner: Sheets<BufReader<File>>,
}

impl XlsxReader {
    /// Open a workbook, detecting the format from the file extension
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let path = path.as_ref();
        let inner = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Read a whole workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P, mode: ReadMode) -> XlsxResult<Workbook> {
        Self::open(path)?.read_workbook(mode)
    }

    /// The path this reader was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    /// Check whether a sheet exists
    pub fn has_sheet(&self, name: &str) -> bool {
        self.inner.sheet_names().iter().any(|n| n == name)
    }

    /// Read every sheet into a workbook
    pub fn read_workbook(&mut self, mode: ReadMode) -> XlsxResult<Workbook> {
        let mut workbook = Workbook::new();
        for name in self.sheet_names() {
            let sheet = self.read_sheet(&name, mode)?;
            workbook.add_existing_worksheet(sheet)?;
        }
        Ok(workbook)
    }

    /// Read one sheet
    pub fn read_sheet(&mut self, name: &str, mode: ReadMode) -> XlsxResult<Worksheet> {
        if !self.has_sheet(name) {
            return Err(XlsxError::SheetNotFound(name.to_string()));
        }

        let mut sheet = Worksheet::new(name);
        let range = self.inner.worksheet_range(name)?;
        copy_values(&mut sheet, &range)?;

        if mode == ReadMode::Formulas {
            // Formula ranges are absent for some formats
            match self.inner.worksheet_formula(name) {
                Ok(formulas) => copy_formulas(&mut sheet, &formulas)?,
                Err(e) => debug!(sheet = name, error = %e, "no formula range"),
            }
        }

        debug!(
            path = %self.path.display(),
            sheet = name,
            rows = sheet.row_count(),
            cols = sheet.column_count(),
            "read sheet"
        );
        Ok(sheet)
    }
}

fn copy_values(sheet: &mut Worksheet, range: &Range<Data>) -> XlsxResult<()> {
    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
    for (r, c, cell) in range.cells() {
        let (row, col) = absolute_position(row_offset, col_offset, r, c)?;
        let value = match cell {
            Data::Empty => continue,
            Data::String(s) => CellValue::string(s.as_str()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::Error(e) => CellValue::Error(map_error(e)),
            Data::DateTime(dt) => {
                let format = NumberFormat::from_id(NumberFormat::ID_DATE_SHORT);
                sheet.set_number_format_at(row, col, format)?;
                CellValue::Number(dt.as_f64())
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::string(s.as_str()),
        };
        sheet.set_cell_value_at(row, col, value)?;
    }
    Ok(())
}

fn copy_formulas(sheet: &mut Worksheet, formulas: &Range<String>) -> XlsxResult<()> {
    let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
    for (r, c, formula) in formulas.cells() {
        if formula.trim().is_empty() {
            continue;
        }
        let (row, col) = absolute_position(row_offset, col_offset, r, c)?;
        sheet.set_cell_formula_at(row, col, formula)?;
    }
    Ok(())
}

fn absolute_position(
    row_offset: u32,
    col_offset: u32,
    r: usize,
    c: usize,
) -> XlsxResult<(u32, u16)> {
    let row = row_offset as usize + r;
    let col = col_offset as usize + c;
    let row = u32::try_from(row)
        .map_err(|_| XlsxError::InvalidFormat(format!("row {} out of range", row)))?;
    let col = u16::try_from(col)
        .map_err(|_| XlsxError::InvalidFormat(format!("column {} out of range", col)))?;
    Ok((row, col))
}

fn map_error(e: &CellErrorType) -> CellError {
    match e {
        CellErrorType::Div0 => CellError::Div0,
        CellErrorType::NA => CellError::Na,
        CellErrorType::Name => CellError::Name,
        CellErrorType::Null => CellError::Null,
        CellErrorType::Num => CellError::Num,
        CellErrorType::Ref => CellError::Ref,
        CellErrorType::Value => CellError::Value,
        CellErrorType::GettingData => CellError::GettingData,
    }
}

//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellValue};
use crate::error::{Error, Result};
use crate::number_format::NumberFormat;
use crate::row::{Row, RowFormats};
use crate::{MAX_COLS, MAX_ROWS};

/// Data stored for a single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellData {
    /// The cell value
    pub value: CellValue,
    /// Display format (None = General)
    pub number_format: Option<NumberFormat>,
}

impl CellData {
    /// Create cell data with a value and no format
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            number_format: None,
        }
    }
}

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely, keyed by row then column, so iteration is
/// always in row-major order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cell storage
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Build a worksheet from dense rows, skipping empty cells
    pub fn from_rows<S: Into<String>>(name: S, rows: &[Row]) -> Result<Self> {
        let mut sheet = Self::new(name);
        for (r, row) in rows.iter().enumerate() {
            sheet.write_row(r as u32, row)?;
        }
        Ok(sheet)
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_at(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|cells| cells.get(&col))
    }

    /// Get cell value by address (convenience method)
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.value_at(row, col).cloned().unwrap_or_default()
    }

    /// Borrow a cell value by indices
    pub fn value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cell_at(row, col).map(|c| &c.value)
    }

    /// Get the formula text at a cell position (if it's a formula)
    pub fn get_formula_at(&self, row: u32, col: u16) -> Option<&str> {
        self.value_at(row, col).and_then(CellValue::formula_text)
    }

    /// Get the number format of a cell
    pub fn number_format_at(&self, row: u32, col: u16) -> Option<&NumberFormat> {
        self.cell_at(row, col).and_then(|c| c.number_format.as_ref())
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    ///
    /// Writing [`CellValue::Empty`] keeps any number format on the cell.
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        validate_cell_position(row, col)?;
        self.rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_default()
            .value = value.into();
        Ok(())
    }

    /// Set a cell formula by address string
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    /// Set a cell formula by row and column indices
    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        self.set_cell_value_at(row, col, CellValue::formula(formula))
    }

    /// Set a cell's number format by row and column indices
    pub fn set_number_format_at(
        &mut self,
        row: u32,
        col: u16,
        format: NumberFormat,
    ) -> Result<()> {
        validate_cell_position(row, col)?;
        let format = match format {
            NumberFormat::General => None,
            other => Some(other),
        };
        self.rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_default()
            .number_format = format;
        Ok(())
    }

    /// Clear a cell's value, keeping its number format
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        let Some(cells) = self.rows.get_mut(&row) else {
            return;
        };
        let remove = match cells.get_mut(&col) {
            Some(cell) if cell.number_format.is_some() => {
                cell.value = CellValue::Empty;
                false
            }
            Some(_) => true,
            None => false,
        };
        if remove {
            cells.remove(&col);
            if cells.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    /// Write a dense row starting at column A
    ///
    /// Empty values clear the target cell, so writing a row fully replaces
    /// the previous content of the covered columns.
    pub fn write_row(&mut self, row: u32, values: &[CellValue]) -> Result<()> {
        for (c, value) in values.iter().enumerate() {
            let col = u16::try_from(c).map_err(|_| Error::ColumnOutOfBounds(c as u32, MAX_COLS - 1))?;
            if value.is_empty() {
                validate_cell_position(row, col)?;
                self.clear_cell_at(row, col);
            } else {
                self.set_cell_value_at(row, col, value.clone())?;
            }
        }
        Ok(())
    }

    // === Dimensions ===

    /// Number of rows up to and including the last row holding a non-empty value
    pub fn row_count(&self) -> u32 {
        self.rows
            .iter()
            .rev()
            .find(|(_, cells)| cells.values().any(|c| !c.value.is_empty()))
            .map(|(row, _)| row + 1)
            .unwrap_or(0)
    }

    /// Number of columns up to and including the right-most non-empty value
    pub fn column_count(&self) -> u16 {
        self.rows
            .values()
            .filter_map(|cells| {
                cells
                    .iter()
                    .rev()
                    .find(|(_, c)| !c.value.is_empty())
                    .map(|(col, _)| col + 1)
            })
            .max()
            .unwrap_or(0)
    }

    /// Check if the worksheet holds no values
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Dense values of one row, `width` cells wide
    pub fn row_values(&self, row: u32, width: u16) -> Row {
        let mut out = vec![CellValue::Empty; width as usize];
        if let Some(cells) = self.rows.get(&row) {
            for (col, cell) in cells.range(..width) {
                out[*col as usize] = cell.value.clone();
            }
        }
        out
    }

    /// The whole sheet as a dense grid of `row_count` x `column_count`
    pub fn to_rows(&self) -> Vec<Row> {
        let width = self.column_count();
        (0..self.row_count())
            .map(|r| self.row_values(r, width))
            .collect()
    }

    /// Number formats of one row, trimmed after the last formatted cell
    pub fn row_formats(&self, row: u32, width: u16) -> RowFormats {
        let mut out = RowFormats::new();
        if let Some(cells) = self.rows.get(&row) {
            for (col, cell) in cells.range(..width) {
                if let Some(format) = &cell.number_format {
                    out.resize(*col as usize + 1, None);
                    out[*col as usize] = Some(format.clone());
                }
            }
        }
        out
    }

    /// Number formats matching [`Worksheet::to_rows`], row for row
    pub fn to_row_formats(&self) -> Vec<RowFormats> {
        let width = self.column_count();
        (0..self.row_count())
            .map(|r| self.row_formats(r, width))
            .collect()
    }

    /// Apply the formats of one row starting at column A; `None` leaves a cell alone
    pub fn write_row_formats(&mut self, row: u32, formats: &[Option<NumberFormat>]) -> Result<()> {
        for (c, format) in formats.iter().enumerate() {
            let Some(format) = format else {
                continue;
            };
            let col = u16::try_from(c).map_err(|_| Error::ColumnOutOfBounds(c as u32, MAX_COLS - 1))?;
            self.set_number_format_at(row, col, format.clone())?;
        }
        Ok(())
    }

    // === Iteration ===

    /// Iterate over all stored cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(row, cells)| cells.iter().map(move |(col, cell)| (*row, *col, cell)))
    }

    /// Iterate over all formula cells: (row, col, formula_text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.iter_cells()
            .filter_map(|(row, col, cell)| cell.value.formula_text().map(|f| (row, col, f)))
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
    }
    Ok(())
}

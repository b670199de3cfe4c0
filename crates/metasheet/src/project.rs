//! Column projection onto the canonical sample columns

use metasheet_core::{CellValue, Row};

use crate::error::{Error, Result};
use crate::merge::MergedTable;

/// Canonical sample columns, in output order
pub const SAMPLE_COLUMNS: [&str; 8] = [
    "expNum",
    "LABCODE",
    "Sample_Name",
    "Sample_Type",
    "Index_ID",
    "Index2",
    "Collection_Date",
    "Note",
];

/// Maps desired columns to positions in a source header
///
/// The positions are fixed by the first header seen and reused for every
/// row after it, so a later file with a different header is only sliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<String>,
    keep_positions: Vec<Option<usize>>,
}

impl Projection {
    /// Resolve `desired` against a header row
    ///
    /// Fails with [`Error::NoDesiredColumns`] when none of them is present.
    pub fn from_header<S: AsRef<str>>(sheet: &str, header: &[CellValue], desired: &[S]) -> Result<Self> {
        let keep_positions: Vec<Option<usize>> = desired
            .iter()
            .map(|name| {
                let name = name.as_ref();
                header.iter().position(|cell| cell.text().trim() == name)
            })
            .collect();

        if keep_positions.iter().all(Option::is_none) {
            return Err(Error::NoDesiredColumns {
                sheet: sheet.to_string(),
            });
        }

        Ok(Self {
            columns: desired.iter().map(|s| s.as_ref().to_string()).collect(),
            keep_positions,
        })
    }

    /// Desired column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Source position of each desired column
    pub fn keep_positions(&self) -> &[Option<usize>] {
        &self.keep_positions
    }

    /// Output position of a desired column
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Project one row; absent columns become empty cells
    pub fn apply(&self, row: &[CellValue]) -> Row {
        self.keep_positions
            .iter()
            .map(|pos| {
                pos.and_then(|p| row.get(p))
                    .cloned()
                    .unwrap_or(CellValue::Empty)
            })
            .collect()
    }

    /// Project many rows
    pub fn project_rows(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter().map(|row| self.apply(row)).collect()
    }

    /// Project a merged table, prefix and header included
    pub fn project_table(&self, table: &MergedTable) -> MergedTable {
        MergedTable {
            sheet: table.sheet.clone(),
            prefix: self.project_rows(&table.prefix),
            header: table.header.as_ref().map(|h| self.apply(h)),
            data: self.project_rows(&table.data),
            formats: Vec::new(),
        }
    }
}

/// Project a merged sample table onto [`SAMPLE_COLUMNS`]
pub fn project_samples(table: &MergedTable) -> Result<MergedTable> {
    let header = table.header.as_deref().unwrap_or(&[]);
    let projection = Projection::from_header(&table.sheet, header, &SAMPLE_COLUMNS)?;
    Ok(projection.project_table(table))
}

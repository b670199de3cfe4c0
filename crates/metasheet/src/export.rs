//! Flat export of fixed sheet regions

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use metasheet_core::{row_is_blank, CellValue, Row, Worksheet};
use metasheet_csv::{CsvWriteOptions, CsvWriter};
use metasheet_xlsx::{ReadMode, XlsxReader};
use tracing::{debug, info};

use crate::classify::is_temp_file;
use crate::error::{Error, Result};
use crate::progress::{percent, ProgressSink};

/// A sheet and the 1-based row its export starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    /// Sheet name
    pub sheet: String,
    /// First exported row, 1-based
    pub start_row: u32,
}

impl ExportTarget {
    /// Create a target
    pub fn new<S: Into<String>>(sheet: S, start_row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            start_row,
        }
    }

    /// Sequencer import rows
    pub fn primary() -> Self {
        Self::new("SampleImport", 24)
    }

    /// Aviti manifest rows
    pub fn aviti() -> Self {
        Self::new("Aviti Manifest", 16)
    }
}

/// Options for [`export`]
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// A workbook or a folder of workbooks
    pub input: PathBuf,
    /// Folder the flat files are written to
    pub output_dir: PathBuf,
    /// Always exported
    pub primary: ExportTarget,
    /// Exported too when set
    pub secondary: Option<ExportTarget>,
    /// Delimited format
    pub csv: CsvWriteOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::new(),
            primary: ExportTarget::primary(),
            secondary: Some(ExportTarget::aviti()),
            csv: CsvWriteOptions::default(),
        }
    }
}

impl ExportOptions {
    /// Default targets for an input and output folder
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input: P, output_dir: Q) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Targets in export order
    ///
    /// A secondary target that would write the primary's file is dropped.
    pub fn targets(&self) -> impl Iterator<Item = &ExportTarget> {
        let primary_file = export_file_name("", &self.primary.sheet);
        let secondary = self
            .secondary
            .iter()
            .filter(move |t| export_file_name("", &t.sheet) != primary_file);
        std::iter::once(&self.primary).chain(secondary)
    }
}

/// Rows from `start_row` (0-based) up to the first blank row
///
/// Every row is as wide as the sheet. Date-formatted numbers are written as
/// `YYYY-MM-DD HH:MM:SS`.
pub fn export_rows(sheet: &Worksheet, start_row: u32) -> Vec<Row> {
    let width = sheet.column_count();
    let mut rows = Vec::new();
    for r in start_row..sheet.row_count() {
        let mut row = sheet.row_values(r, width);
        if row_is_blank(&row) {
            break;
        }
        for (c, value) in row.iter_mut().enumerate() {
            let is_date = sheet
                .number_format_at(r, c as u16)
                .is_some_and(|f| f.is_date_format());
            let serial = match value {
                CellValue::Number(n) if is_date => *n,
                _ => continue,
            };
            if let Some(text) = date_text(serial) {
                *value = CellValue::string(text);
            }
        }
        rows.push(row);
    }
    rows
}

fn date_text(serial: f64) -> Option<String> {
    // last day a spreadsheet can display is 9999-12-31
    if !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let at = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(at.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// `<stem>_<sheet>.csv` with spaces in the sheet name replaced
pub fn export_file_name(stem: &str, sheet: &str) -> String {
    format!("{}_{}.csv", stem, sheet.replace(' ', "_"))
}

/// The workbooks an export input names, sorted
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_xlsx = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("xlsx"));
        if path.is_file() && is_xlsx && !is_temp_file(&name) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(Error::NoInputFiles(input.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Export every target of one workbook, returning the written files
pub fn export_workbook<'a>(
    path: &Path,
    targets: impl IntoIterator<Item = &'a ExportTarget>,
    output_dir: &Path,
    csv: &CsvWriteOptions,
) -> Result<Vec<PathBuf>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = XlsxReader::open(path)?;
    let mut written = Vec::new();
    for target in targets {
        if !reader.has_sheet(&target.sheet) {
            return Err(Error::SheetNotFound {
                sheet: target.sheet.clone(),
                workbook: file_name,
            });
        }
        let sheet = reader.read_sheet(&target.sheet, ReadMode::Values)?;
        let rows = export_rows(&sheet, target.start_row.saturating_sub(1));
        let out = output_dir.join(export_file_name(&stem, &target.sheet));
        CsvWriter::write_file(&rows, &out, csv)?;
        debug!(path = %out.display(), rows = rows.len(), "exported");
        written.push(out);
    }
    Ok(written)
}

/// Export a workbook or folder of workbooks to flat files
///
/// Stops at the first workbook that fails.
pub fn export<S: ProgressSink>(options: &ExportOptions, progress: &mut S) -> Result<Vec<PathBuf>> {
    let inputs = collect_inputs(&options.input)?;
    fs::create_dir_all(&options.output_dir)?;

    let per_file = options.targets().count();
    let total = inputs.len() * per_file;
    let mut outputs = Vec::new();
    for (i, path) in inputs.iter().enumerate() {
        let written = export_workbook(path, options.targets(), &options.output_dir, &options.csv)?;
        outputs.extend(written);
        progress.report(percent((i + 1) * per_file, total));
    }
    progress.report(100.0);

    info!(files = inputs.len(), outputs = outputs.len(), "export finished");
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasheet_core::NumberFormat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stops_at_first_blank_row() {
        let mut sheet = Worksheet::new("SampleImport");
        sheet.set_cell_value_at(0, 0, "header").unwrap();
        sheet.set_cell_value_at(1, 0, "a").unwrap();
        sheet.set_cell_value_at(1, 2, 3.0).unwrap();
        sheet.set_cell_value_at(2, 1, "   ").unwrap();
        sheet.set_cell_value_at(3, 0, "after gap").unwrap();

        let rows = export_rows(&sheet, 1);
        assert_eq!(
            rows,
            vec![vec![CellValue::string("a"), CellValue::Empty, CellValue::Number(3.0)]]
        );
    }

    #[test]
    fn test_dates_become_text() {
        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, 45292.5).unwrap();
        sheet.set_number_format_at(0, 0, NumberFormat::date_dmy()).unwrap();
        sheet.set_cell_value_at(0, 1, 45292.0).unwrap();
        let rows = export_rows(&sheet, 0);
        assert_eq!(rows[0][0], CellValue::string("2024-01-01 12:00:00"));
        assert_eq!(rows[0][1], CellValue::Number(45292.0));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("RUN1_20240101", "Aviti Manifest"),
            "RUN1_20240101_Aviti_Manifest.csv"
        );
        assert_eq!(export_file_name("x", "SampleImport"), "x_SampleImport.csv");
    }

    #[test]
    fn test_collect_inputs() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            collect_inputs(&dir.path().join("missing")),
            Err(Error::InputNotFound(_))
        ));
        assert!(matches!(collect_inputs(dir.path()), Err(Error::NoInputFiles(_))));

        for name in ["b.xlsx", "a.XLSX", "~$a.xlsx", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = collect_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b.xlsx"]);
    }

    #[test]
    fn test_default_targets() {
        let options = ExportOptions::new("in", "out");
        let targets: Vec<&ExportTarget> = options.targets().collect();
        assert_eq!(targets, vec![&ExportTarget::primary(), &ExportTarget::aviti()]);
    }

    #[test]
    fn test_secondary_naming_the_primary_file_is_dropped() {
        let mut options = ExportOptions::new("in", "out");
        options.primary = ExportTarget::new("Aviti Manifest", 20);
        let targets: Vec<&ExportTarget> = options.targets().collect();
        assert_eq!(targets, vec![&ExportTarget::new("Aviti Manifest", 20)]);

        options.primary = ExportTarget::new("Aviti_Manifest", 20);
        assert_eq!(options.targets().count(), 1);
    }
}

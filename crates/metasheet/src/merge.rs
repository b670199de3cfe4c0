//! Sheet merge engine
//!
//! Every sheet name found in a group is merged on its own. The first file
//! (in path order) that has the sheet is the reference: it supplies the
//! prefix rows, the header row and the output width. Data rows from every
//! file follow, each file sliced below its own header row and aligned to the
//! reference width by position. Number formats travel with their cells,
//! so dates stay dates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use metasheet_core::{row_is_blank, CellValue, NumberFormat, Row, RowFormats, Worksheet};
use metasheet_xlsx::{ReadMode, XlsxReader};
use tracing::{debug, warn};

use crate::error::{Error, GroupWarning, Result};
use crate::layout::{LayoutConfig, SheetRule, SAMPLE_IMPORT_SHEET, SAMPLE_SHEET};

/// One file's grid for one sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    /// Source file
    pub path: PathBuf,
    /// Dense rows from the first row of the sheet
    pub rows: Vec<Row>,
    /// Number formats, row for row; may be shorter than `rows`
    pub formats: Vec<RowFormats>,
}

impl SheetGrid {
    /// A grid without number formats
    pub fn new<P: Into<PathBuf>>(path: P, rows: Vec<Row>) -> Self {
        Self {
            path: path.into(),
            rows,
            formats: Vec::new(),
        }
    }

    /// Widest row
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Formats of one row; empty when it has none
    pub fn row_formats(&self, row: usize) -> &[Option<NumberFormat>] {
        self.formats.get(row).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Every sheet of every readable file in a group
///
/// Sheet names are matched case-insensitively, as spreadsheet applications
/// do. The first spelling seen names the merged sheet.
#[derive(Debug, Default)]
pub struct GroupSheets {
    /// Sheet names in order of first appearance
    order: Vec<String>,
    /// Grids per lower-cased sheet name, in file order
    grids: HashMap<String, Vec<SheetGrid>>,
    /// Files that could be opened, in file order
    readable: Vec<PathBuf>,
}

impl GroupSheets {
    /// Sheet names in order of first appearance
    pub fn sheet_names(&self) -> &[String] {
        &self.order
    }

    /// Grids of one sheet, in file order
    pub fn grids(&self, sheet: &str) -> &[SheetGrid] {
        self.grids
            .get(&sheet_key(sheet))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Files that could be opened
    pub fn readable_files(&self) -> &[PathBuf] {
        &self.readable
    }

    /// Whether no file could be read
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty()
    }

    /// Add one file's sheet
    pub fn push(&mut self, sheet: &str, grid: SheetGrid) {
        let key = sheet_key(sheet);
        if !self.grids.contains_key(&key) {
            self.order.push(sheet.to_string());
        } else if !self.order.iter().any(|name| name == sheet) {
            debug!(sheet, "merging sheet under a differently cased name");
        }
        if self.readable.last() != Some(&grid.path) {
            self.readable.push(grid.path.clone());
        }
        self.grids.entry(key).or_default().push(grid);
    }
}

fn sheet_key(sheet: &str) -> String {
    sheet.to_lowercase()
}

/// A merged sheet: prefix, then one header row, then data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedTable {
    /// Sheet name
    pub sheet: String,
    /// Rows copied from the reference file above the header
    pub prefix: Vec<Row>,
    /// Header row; `None` when the reference sheet was empty
    pub header: Option<Row>,
    /// Data rows from every file
    pub data: Vec<Row>,
    /// Number formats in output order, row for row; may be shorter than the rows
    pub formats: Vec<RowFormats>,
}

impl MergedTable {
    /// An empty sheet
    pub fn empty<S: Into<String>>(sheet: S) -> Self {
        Self {
            sheet: sheet.into(),
            ..Default::default()
        }
    }

    /// All rows in output order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.prefix.iter().chain(self.header.iter()).chain(self.data.iter())
    }

    /// Number of output rows
    pub fn row_count(&self) -> usize {
        self.prefix.len() + usize::from(self.header.is_some()) + self.data.len()
    }

    /// Position of a header cell whose trimmed text equals `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header
            .as_ref()?
            .iter()
            .position(|cell| cell.text().trim() == name)
    }

    /// Build the output worksheet
    pub fn to_worksheet(&self) -> Result<Worksheet> {
        let rows: Vec<Row> = self.rows().cloned().collect();
        let mut sheet = Worksheet::from_rows(self.sheet.as_str(), &rows)?;
        for (r, formats) in self.formats.iter().enumerate().take(rows.len()) {
            sheet.write_row_formats(r as u32, formats)?;
        }
        Ok(sheet)
    }

    /// Index of the first data row in output order
    fn data_offset(&self) -> usize {
        self.prefix.len() + usize::from(self.header.is_some())
    }
}

/// Data rows kept by a per-sheet filter must have text in every named column
#[derive(Debug, Clone, Copy)]
struct RowFilter {
    columns: &'static [&'static str],
    /// Also drop a lone `-` placeholder
    reject_dash: bool,
}

fn row_filter(sheet: &str) -> Option<RowFilter> {
    match sheet {
        SAMPLE_SHEET => Some(RowFilter {
            columns: &["expNum", "LABCODE"],
            reject_dash: false,
        }),
        SAMPLE_IMPORT_SHEET => Some(RowFilter {
            columns: &["Sample_ID"],
            reject_dash: true,
        }),
        _ => None,
    }
}

/// Open every file and read all its sheets as values
///
/// Unreadable files and sheets missing from some files become warnings.
pub fn load_group(paths: &[PathBuf], warnings: &mut Vec<GroupWarning>) -> GroupSheets {
    let mut sheets = GroupSheets::default();
    let mut names_per_file: Vec<(PathBuf, Vec<String>)> = Vec::new();

    for path in paths {
        match read_all_sheets(path) {
            Ok(grids) => {
                names_per_file.push((path.clone(), grids.iter().map(|(n, _)| n.clone()).collect()));
                for (name, grid) in grids {
                    sheets.push(&name, grid);
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                warnings.push(GroupWarning::UnreadableFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for sheet in sheets.sheet_names() {
        for (path, names) in &names_per_file {
            if !names.iter().any(|name| sheet_key(name) == sheet_key(sheet)) {
                warn!(path = %path.display(), sheet = %sheet, "sheet missing");
                warnings.push(GroupWarning::MissingSheet {
                    path: path.clone(),
                    sheet: sheet.clone(),
                });
            }
        }
    }

    sheets
}

fn read_all_sheets(path: &Path) -> Result<Vec<(String, SheetGrid)>> {
    let mut reader = XlsxReader::open(path)?;
    let mut out = Vec::new();
    for name in reader.sheet_names() {
        let sheet = reader.read_sheet(&name, ReadMode::Values)?;
        out.push((
            name,
            SheetGrid {
                path: path.to_path_buf(),
                rows: sheet.to_rows(),
                formats: sheet.to_row_formats(),
            },
        ));
    }
    Ok(out)
}

/// Merge one sheet across the grids of a group
///
/// Returns `None` when no file has the sheet.
pub fn merge_sheet(
    sheet: &str,
    grids: &[SheetGrid],
    rule: SheetRule,
    warnings: &mut Vec<GroupWarning>,
) -> Result<Option<MergedTable>> {
    let Some(reference) = grids.first() else {
        return Ok(None);
    };
    if reference.rows.is_empty() {
        debug!(sheet, "reference sheet is empty");
        return Ok(Some(MergedTable::empty(sheet)));
    }

    let header_row = rule.header_row as usize;
    if header_row >= reference.rows.len() {
        return Err(Error::HeaderRowMissing {
            sheet: sheet.to_string(),
            header_row: rule.header_row,
            rows: reference.rows.len() as u32,
        });
    }

    let width = reference.width();
    let prefix_end = (rule.prefix_rows as usize).min(reference.rows.len());
    let prefix = reference.rows[..prefix_end]
        .iter()
        .map(|row| aligned(row, width))
        .collect();
    let header = aligned(&reference.rows[header_row], width);
    let mut formats: Vec<RowFormats> = (0..prefix_end)
        .chain(std::iter::once(header_row))
        .map(|r| aligned_formats(reference.row_formats(r), width))
        .collect();

    let mut data = Vec::new();
    for grid in grids {
        if grid.rows.len() <= header_row {
            warn!(path = %grid.path.display(), sheet, rows = grid.rows.len(), "sheet too short");
            warnings.push(GroupWarning::ShortSheet {
                path: grid.path.clone(),
                sheet: sheet.to_string(),
                rows: grid.rows.len() as u32,
            });
            continue;
        }
        let before = data.len();
        let start = rule.data_start() as usize;
        for (r, row) in grid.rows.iter().enumerate().skip(start) {
            let row = aligned(row, width);
            if row_is_blank(&row) {
                continue;
            }
            data.push(row);
            formats.push(aligned_formats(grid.row_formats(r), width));
        }
        debug!(path = %grid.path.display(), sheet, rows = data.len() - before, "data rows");
    }

    Ok(Some(MergedTable {
        sheet: sheet.to_string(),
        prefix,
        header: Some(header),
        data,
        formats,
    }))
}

/// Drop data rows that fail the sheet's filter, if it has one
pub fn apply_row_filter(table: &mut MergedTable, warnings: &mut Vec<GroupWarning>) {
    let Some(filter) = row_filter(&table.sheet) else {
        return;
    };

    let mut positions = Vec::with_capacity(filter.columns.len());
    for column in filter.columns {
        match table.column_index(column) {
            Some(pos) => positions.push(pos),
            None => {
                warn!(sheet = %table.sheet, column, "filter column missing");
                warnings.push(GroupWarning::MissingFilterColumn {
                    sheet: table.sheet.clone(),
                    column: column.to_string(),
                });
            }
        }
    }
    if positions.len() != filter.columns.len() {
        return;
    }

    let before = table.data.len();
    let keep: Vec<bool> = table
        .data
        .iter()
        .map(|row| {
            positions.iter().all(|&pos| {
                let text = row.get(pos).map(CellValue::text).unwrap_or_default();
                let text = text.trim();
                !text.is_empty() && !(filter.reject_dash && text == "-")
            })
        })
        .collect();

    let mut kept = keep.iter();
    table.data.retain(|_| kept.next().copied().unwrap_or(true));
    let offset = table.data_offset();
    if table.formats.len() > offset {
        let data_formats = table.formats.split_off(offset);
        table.formats.extend(
            data_formats
                .into_iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .map(|(formats, _)| formats),
        );
    }
    debug!(sheet = %table.sheet, dropped = before - table.data.len(), "row filter applied");
}

/// Merge and filter every sheet of a group, in first-appearance order
pub fn merge_group(
    sheets: &GroupSheets,
    layout: &LayoutConfig,
    warnings: &mut Vec<GroupWarning>,
) -> Result<Vec<MergedTable>> {
    let mut tables = Vec::new();
    for name in sheets.sheet_names() {
        let rule = layout.rule_for(name);
        if let Some(mut table) = merge_sheet(name, sheets.grids(name), rule, warnings)? {
            apply_row_filter(&mut table, warnings);
            tables.push(table);
        }
    }
    Ok(tables)
}

fn aligned(row: &[CellValue], width: usize) -> Row {
    let mut out: Row = row.iter().take(width).cloned().collect();
    out.resize(width, CellValue::Empty);
    out
}

fn aligned_formats(formats: &[Option<NumberFormat>], width: usize) -> RowFormats {
    formats.iter().take(width).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_row(cells: &[&str]) -> Row {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::string(*c)
                }
            })
            .collect()
    }

    fn grid(path: &str, rows: Vec<Row>) -> SheetGrid {
        SheetGrid::new(path, rows)
    }

    #[test]
    fn test_single_file_is_reproduced() {
        let rows = vec![
            text_row(&["title", ""]),
            text_row(&["a", "b"]),
            text_row(&["1", "2"]),
            text_row(&["", ""]),
            text_row(&["3", "4"]),
        ];
        let mut warnings = Vec::new();
        let table = merge_sheet("Other", &[grid("x.xlsx", rows.clone())], SheetRule::new(1, 1), &mut warnings)
            .unwrap()
            .unwrap();

        let out: Vec<Row> = table.rows().cloned().collect();
        assert_eq!(out, vec![rows[0].clone(), rows[1].clone(), rows[2].clone(), rows[4].clone()]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_data_concatenates_in_file_order() {
        let a = vec![text_row(&["h1", "h2"]), text_row(&["a1", "a2"]), text_row(&["a3", ""])];
        let b = vec![text_row(&["h1", "h2"]), text_row(&["b1", "b2"])];
        let mut warnings = Vec::new();
        let table = merge_sheet("Other", &[grid("a", a), grid("b", b)], SheetRule::DEFAULT, &mut warnings)
            .unwrap()
            .unwrap();

        assert_eq!(table.header, Some(text_row(&["h1", "h2"])));
        assert_eq!(
            table.data,
            vec![text_row(&["a1", "a2"]), text_row(&["a3", ""]), text_row(&["b1", "b2"])]
        );
    }

    #[test]
    fn test_width_follows_reference() {
        let a = vec![text_row(&["h1", "h2"]), text_row(&["a1", "a2"])];
        let b = vec![text_row(&["h1", "h2", "h3"]), text_row(&["b1", "b2", "b3"])];
        let c = vec![text_row(&["h1"]), text_row(&["c1"])];
        let mut warnings = Vec::new();
        let table = merge_sheet(
            "Other",
            &[grid("a", a), grid("b", b), grid("c", c)],
            SheetRule::DEFAULT,
            &mut warnings,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            table.data,
            vec![text_row(&["a1", "a2"]), text_row(&["b1", "b2"]), text_row(&["c1", ""])]
        );
    }

    #[test]
    fn test_header_missing_in_reference() {
        let mut warnings = Vec::new();
        let err = merge_sheet(
            "Sample",
            &[grid("a", vec![text_row(&["x"])])],
            SheetRule::new(20, 20),
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, Error::HeaderRowMissing { header_row: 20, rows: 1, .. }));
    }

    #[test]
    fn test_short_file_is_a_warning() {
        let a = vec![text_row(&["h"]), text_row(&["1"])];
        let b = vec![];
        let mut warnings = Vec::new();
        let table = merge_sheet("Other", &[grid("a", a), grid("b", b)], SheetRule::DEFAULT, &mut warnings)
            .unwrap()
            .unwrap();
        assert_eq!(table.data.len(), 1);
        assert_eq!(
            warnings,
            vec![GroupWarning::ShortSheet {
                path: PathBuf::from("b"),
                sheet: "Other".into(),
                rows: 0
            }]
        );
    }

    #[test]
    fn test_empty_reference_yields_empty_sheet() {
        let mut warnings = Vec::new();
        let table = merge_sheet("Notes", &[grid("a", vec![])], SheetRule::DEFAULT, &mut warnings)
            .unwrap()
            .unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(merge_sheet("Notes", &[], SheetRule::DEFAULT, &mut warnings).unwrap().is_none());
    }

    #[test]
    fn test_sample_filter_needs_both_columns() {
        let mut table = MergedTable {
            sheet: "Sample".into(),
            prefix: vec![],
            header: Some(text_row(&["ID", " expNum ", "LABCODE"])),
            data: vec![
                text_row(&["1", "", "GS01"]),
                text_row(&["2", "E1", "GS02"]),
                text_row(&["3", "E2", "   "]),
            ],
            formats: vec![],
        };
        let mut warnings = Vec::new();
        apply_row_filter(&mut table, &mut warnings);
        assert_eq!(table.data, vec![text_row(&["2", "E1", "GS02"])]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_sample_import_filter_drops_dashes() {
        let mut table = MergedTable {
            sheet: "Sample Import".into(),
            prefix: vec![],
            header: Some(text_row(&["Sample_ID", "x"])),
            data: vec![
                text_row(&["-", "a"]),
                text_row(&["  -  ", "b"]),
                text_row(&["", "c"]),
                text_row(&["S-1", "d"]),
            ],
            formats: vec![],
        };
        let mut warnings = Vec::new();
        apply_row_filter(&mut table, &mut warnings);
        assert_eq!(table.data, vec![text_row(&["S-1", "d"])]);
    }

    #[test]
    fn test_missing_filter_column_skips_filter() {
        let mut table = MergedTable {
            sheet: "Sample".into(),
            prefix: vec![],
            header: Some(text_row(&["expNum"])),
            data: vec![text_row(&[""])],
            formats: vec![],
        };
        let mut warnings = Vec::new();
        apply_row_filter(&mut table, &mut warnings);
        assert_eq!(table.data.len(), 1);
        assert_eq!(
            warnings,
            vec![GroupWarning::MissingFilterColumn {
                sheet: "Sample".into(),
                column: "LABCODE".into()
            }]
        );
    }

    #[test]
    fn test_formats_follow_kept_rows() {
        let date = || Some(NumberFormat::date_dmy());
        let mut a = grid(
            "a",
            vec![
                text_row(&["expNum", "LABCODE", "Collection_Date"]),
                text_row(&["", "GS01", ""]),
                text_row(&["", "", ""]),
                text_row(&["E2", "GS02", ""]),
            ],
        );
        a.rows[3][2] = CellValue::Number(45292.0);
        a.rows[1][2] = CellValue::Number(45000.0);
        a.formats = vec![vec![], vec![None, None, date()], vec![], vec![None, None, date(), date()]];

        let mut warnings = Vec::new();
        let mut table = merge_sheet("Sample", &[a], SheetRule::DEFAULT, &mut warnings)
            .unwrap()
            .unwrap();
        assert_eq!(table.formats.len(), 3);
        apply_row_filter(&mut table, &mut warnings);

        assert_eq!(table.data.len(), 1);
        assert_eq!(table.formats, vec![vec![], vec![None, None, date()]]);

        let sheet = table.to_worksheet().unwrap();
        assert_eq!(sheet.get_value_at(1, 2), CellValue::Number(45292.0));
        assert_eq!(sheet.number_format_at(1, 2), Some(&NumberFormat::date_dmy()));
        assert_eq!(sheet.number_format_at(0, 2), None);
    }

    #[test]
    fn test_sheet_names_match_ignoring_case() {
        let mut sheets = GroupSheets::default();
        sheets.push("Notes", grid("1", vec![text_row(&["h"]), text_row(&["a"])]));
        sheets.push("notes", grid("2", vec![text_row(&["h"]), text_row(&["b"])]));
        assert_eq!(sheets.sheet_names(), &["Notes"]);
        assert_eq!(sheets.grids("NOTES").len(), 2);

        let mut warnings = Vec::new();
        let tables = merge_group(&sheets, &LayoutConfig::default(), &mut warnings).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet, "Notes");
        assert_eq!(tables[0].data, vec![text_row(&["a"]), text_row(&["b"])]);
    }

    #[test]
    fn test_group_sheet_order() {
        let mut sheets = GroupSheets::default();
        sheets.push("B", grid("1", vec![]));
        sheets.push("A", grid("1", vec![]));
        sheets.push("C", grid("2", vec![]));
        sheets.push("A", grid("2", vec![]));
        assert_eq!(sheets.sheet_names(), &["B", "A", "C"]);
        assert_eq!(sheets.grids("A").len(), 2);
        assert_eq!(sheets.readable_files(), &[PathBuf::from("1"), PathBuf::from("2")]);
    }
}

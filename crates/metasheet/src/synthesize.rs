//! Derived-sheet synthesis
//!
//! A [`SynthesisSession`] owns a copy of the template workbook. Sample rows
//! are written to the primary sheet, and every dependent sheet gets formula
//! rows at the same ordinal. Formulas are written as text and never
//! evaluated here.

use std::collections::{BTreeSet, HashMap};

use metasheet_core::{CellAddress, CellValue, NumberFormat, Row, Workbook, Worksheet};
use tracing::debug;

use crate::error::{Error, GroupWarning, Result};
use crate::formula::{self, SAMPLE_CLASS_RULES};
use crate::layout::{LayoutConfig, SheetRole};
use crate::project::SAMPLE_COLUMNS;

/// Index lookup table on the template
pub const INDEX_LIST_SHEET: &str = "Index List";
/// i7 reverse lookup table
pub const INDEX_I7_SHEET: &str = "Index i7";
/// i5 reverse lookup table
pub const INDEX_I5_SHEET: &str = "Index i5";

/// Primary-sheet column of each entry of [`SAMPLE_COLUMNS`]
const PRIMARY_DESTINATIONS: [u16; 8] = [1, 2, 3, 4, 5, 7, 8, 9];

const ID_COLUMN: u16 = 0;
const INDEX_LOOKUP_COLUMN: u16 = 6;
const DATE_COLUMN: &str = "Collection_Date";

/// Marker columns for duplicate `Index_ID` and `LABCODE` values
const DUPLICATE_MARKER_COLUMNS: [u16; 2] = [10, 11];

/// Columns checked for repeated values
pub const DUPLICATE_CHECK_COLUMNS: [&str; 2] = ["Index_ID", "LABCODE"];

/// Characters of an index sequence that are reversed
const INDEX_WIDTH: u32 = 30;

fn letter(col: u16) -> String {
    CellAddress::column_to_letters(col)
}

/// Workbook under construction from a template
#[derive(Debug)]
pub struct SynthesisSession<'a> {
    workbook: Workbook,
    layout: &'a LayoutConfig,
}

impl<'a> SynthesisSession<'a> {
    /// Start a session on a template copy
    ///
    /// Fails when any of the role sheets is missing.
    pub fn new(template: Workbook, layout: &'a LayoutConfig) -> Result<Self> {
        for role in SheetRole::ALL {
            let sheet = &layout.role(role).sheet;
            if template.worksheet_by_name(sheet).is_none() {
                return Err(Error::TemplateMissingSheet {
                    sheet: sheet.clone(),
                });
            }
        }
        Ok(Self {
            workbook: template,
            layout,
        })
    }

    /// Write every sample row and its derived rows
    ///
    /// `samples` are rows projected onto [`SAMPLE_COLUMNS`].
    pub fn write_samples(&mut self, samples: &[Row]) -> Result<()> {
        let layout = self.layout;
        for (k, sample) in samples.iter().enumerate() {
            write_primary_row(self.sheet_mut(SheetRole::Primary)?, layout, k, sample)?;
            write_import_row(self.sheet_mut(SheetRole::Import)?, layout, k)?;
            write_aviti_row(self.sheet_mut(SheetRole::AvitiManifest)?, layout, k)?;
            write_illumina_row(self.sheet_mut(SheetRole::IlluminaManifest)?, layout, k)?;
        }
        debug!(rows = samples.len(), "derived rows written");
        Ok(())
    }

    /// The workbook so far
    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Finish the session
    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    fn sheet_mut(&mut self, role: SheetRole) -> Result<&mut Worksheet> {
        let layout = self.layout;
        let sheet = &layout.role(role).sheet;
        self.workbook
            .worksheet_by_name_mut(sheet)
            .ok_or_else(|| Error::TemplateMissingSheet {
                sheet: sheet.clone(),
            })
    }
}

/// Synthesize a workbook from a template and projected sample rows
pub fn synthesize(template: Workbook, layout: &LayoutConfig, samples: &[Row]) -> Result<Workbook> {
    let mut session = SynthesisSession::new(template, layout)?;
    session.write_samples(samples)?;
    Ok(session.into_workbook())
}

fn write_primary_row(sheet: &mut Worksheet, layout: &LayoutConfig, k: usize, sample: &[CellValue]) -> Result<()> {
    let r = layout.primary.row_for(k);

    sheet.set_cell_value_at(r, ID_COLUMN, (k + 1) as u32)?;

    for (i, (name, col)) in SAMPLE_COLUMNS.iter().zip(PRIMARY_DESTINATIONS).enumerate() {
        match sample.get(i) {
            Some(value) if !value.is_empty() => sheet.set_cell_value_at(r, col, value.clone())?,
            _ => sheet.clear_cell_at(r, col),
        }
        if *name == DATE_COLUMN {
            sheet.set_number_format_at(r, col, NumberFormat::date_dmy())?;
        }
    }

    let key = formula::abs_ref(&letter(PRIMARY_DESTINATIONS[4]), r);
    let lookup = formula::vlookup(&key, &formula::column_range(INDEX_LIST_SHEET, "A", "B"), 2);
    sheet.set_cell_formula_at(r, INDEX_LOOKUP_COLUMN, &lookup)?;

    for col in DUPLICATE_MARKER_COLUMNS {
        sheet.clear_cell_at(r, col);
    }
    Ok(())
}

fn write_import_row(sheet: &mut Worksheet, layout: &LayoutConfig, k: usize) -> Result<()> {
    let p = layout.import.row_for(k);
    let s = layout.primary.row_for(k);
    let primary = |col: &str| formula::sheet_ref(&layout.primary.sheet, col, s);

    let index_lookup = |table: &str| {
        formula::index_match(
            &formula::column_range(table, "A", "A"),
            &primary("F"),
            &formula::column_range(table, "B", "B"),
        )
    };

    let formulas = [
        formula::concat(&primary("B"), "_", &primary("C")),
        formula::concat(&primary("C"), "-", &primary("D")),
        formula::passthrough(&primary("F")),
        index_lookup(INDEX_I7_SHEET),
        index_lookup(INDEX_I5_SHEET),
        formula::classify(&primary("C"), &primary("E"), &SAMPLE_CLASS_RULES),
    ];
    write_formulas(sheet, p, &formulas)
}

fn write_aviti_row(sheet: &mut Worksheet, layout: &LayoutConfig, k: usize) -> Result<()> {
    let m = layout.aviti_manifest.row_for(k);
    let p = layout.import.row_for(k);
    let import = |col: &str| formula::sheet_ref(&layout.import.sheet, col, p);

    let formulas = [
        formula::passthrough(&import("A")),
        formula::passthrough(&import("D")),
        formula::reverse(&formula::abs_ref("E", m), INDEX_WIDTH),
        formula::passthrough(&import("F")),
        formula::complement(&import("E")),
    ];
    write_formulas(sheet, m, &formulas)
}

fn write_illumina_row(sheet: &mut Worksheet, layout: &LayoutConfig, k: usize) -> Result<()> {
    let q = layout.illumina_manifest.row_for(k);
    let s = layout.primary.row_for(k);

    let complement = formula::complement(&formula::sheet_ref(&layout.primary.sheet, "H", s));
    sheet.set_cell_formula_at(q, 2, &complement)?;
    let reversed = formula::reverse(&formula::abs_ref("C", q), INDEX_WIDTH);
    sheet.set_cell_formula_at(q, 1, &reversed)?;
    Ok(())
}

fn write_formulas(sheet: &mut Worksheet, row: u32, formulas: &[String]) -> Result<()> {
    for (col, text) in formulas.iter().enumerate() {
        sheet.set_cell_formula_at(row, col as u16, text)?;
    }
    Ok(())
}

/// Values occurring more than once in column `col`; blanks are ignored
pub fn find_duplicates(rows: &[Row], col: usize) -> BTreeSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let Some(value) = row.get(col) else {
            continue;
        };
        let text = value.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        *counts.entry(text.to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(value, _)| value)
        .collect()
}

/// Duplicate warnings for projected sample rows
pub fn duplicate_warnings(samples: &[Row]) -> Vec<GroupWarning> {
    DUPLICATE_CHECK_COLUMNS
        .iter()
        .filter_map(|column| {
            let col = SAMPLE_COLUMNS.iter().position(|c| c == column)?;
            let values = find_duplicates(samples, col);
            (!values.is_empty()).then(|| GroupWarning::DuplicateValues {
                column: column.to_string(),
                values: values.into_iter().collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template() -> Workbook {
        let mut wb = Workbook::new();
        for name in ["Sample", "SampleImport", "Aviti Manifest", "Illumina Manifest", "Index List"] {
            wb.add_worksheet_with_name(name).unwrap();
        }
        wb
    }

    fn sample(exp: &str, lab: &str, index: &str) -> Row {
        let mut row = vec![CellValue::Empty; SAMPLE_COLUMNS.len()];
        row[0] = CellValue::string(exp);
        row[1] = CellValue::string(lab);
        row[3] = CellValue::string("B");
        row[4] = CellValue::string(index);
        row[6] = CellValue::Number(45292.0);
        row
    }

    #[test]
    fn test_missing_template_sheet() {
        let mut wb = template();
        wb.remove_worksheet_by_name("Aviti Manifest").unwrap();
        let layout = LayoutConfig::default();
        let err = SynthesisSession::new(wb, &layout).unwrap_err();
        assert!(matches!(err, Error::TemplateMissingSheet { sheet } if sheet == "Aviti Manifest"));
    }

    #[test]
    fn test_primary_rows() {
        let layout = LayoutConfig::default();
        let mut wb = template();
        wb.worksheet_by_name_mut("Sample")
            .unwrap()
            .set_cell_value_at(21, 10, "stale")
            .unwrap();
        let samples = vec![sample("E1", "GS01", "UDI1"), sample("E2", "GS02", "UDI2")];
        let wb = synthesize(wb, &layout, &samples).unwrap();
        let sheet = wb.worksheet_by_name("Sample").unwrap();

        // row 22 and 23 in spreadsheet terms
        assert_eq!(sheet.get_value_at(21, 0), CellValue::Number(1.0));
        assert_eq!(sheet.get_value_at(22, 0), CellValue::Number(2.0));
        assert_eq!(sheet.get_value_at(22, 2), CellValue::string("GS02"));
        assert_eq!(sheet.get_value_at(21, 5), CellValue::string("UDI1"));
        assert_eq!(
            sheet.get_formula_at(21, 6),
            Some("=VLOOKUP($F$22,'Index List'!$A:$B,2,FALSE)")
        );
        assert_eq!(sheet.get_value_at(21, 8), CellValue::Number(45292.0));
        assert_eq!(sheet.number_format_at(21, 8), Some(&NumberFormat::date_dmy()));
        assert_eq!(sheet.get_value_at(21, 10), CellValue::Empty);
    }

    #[test]
    fn test_dependent_row_offsets() {
        let layout = LayoutConfig::default();
        let samples: Vec<Row> = (0..3).map(|i| sample(&format!("E{}", i), "GS", "U")).collect();
        let wb = synthesize(template(), &layout, &samples).unwrap();

        let import = wb.worksheet_by_name("SampleImport").unwrap();
        for k in 0..3u32 {
            let s = 22 + k;
            assert_eq!(
                import.get_formula_at(23 + k, 0).map(str::to_string),
                Some(format!("=Sample!$B${s}&\"_\"&Sample!$C${s}"))
            );
        }
        assert_eq!(import.get_formula_at(23, 1), Some("=Sample!$C$22&\"-\"&Sample!$D$22"));
        assert_eq!(import.get_formula_at(23, 2), Some("=Sample!$F$22"));
        assert_eq!(
            import.get_formula_at(24, 4),
            Some("=IFERROR(INDEX('Index i5'!$A:$A,MATCH(Sample!$F$23,'Index i5'!$B:$B,0)),\"\")")
        );
        assert!(import.get_formula_at(23, 5).unwrap().starts_with("=IF(AND(OR(LEFT(Sample!$C$22,2)"));
        assert_eq!(import.get_formula_at(26, 0), None);

        let aviti = wb.worksheet_by_name("Aviti Manifest").unwrap();
        assert_eq!(aviti.get_formula_at(15, 0), Some("=SampleImport!$A$24"));
        assert_eq!(aviti.get_formula_at(17, 1), Some("=SampleImport!$D$26"));
        assert!(aviti.get_formula_at(16, 2).unwrap().starts_with("=MID($E$17,30,1)&"));
        assert_eq!(aviti.get_formula_at(15, 3), Some("=SampleImport!$F$24"));
        assert!(aviti.get_formula_at(15, 4).unwrap().contains("SampleImport!$E$24,\"A\",\"1\")"));

        let illumina = wb.worksheet_by_name("Illumina Manifest").unwrap();
        assert!(illumina.get_formula_at(23, 2).unwrap().contains("(Sample!$H$22,\"A\",\"1\")"));
        assert!(illumina.get_formula_at(25, 1).unwrap().ends_with("&MID($C$26,1,1)"));
    }

    #[test]
    fn test_empty_values_clear_cells() {
        let layout = LayoutConfig::default();
        let mut wb = template();
        wb.worksheet_by_name_mut("Sample")
            .unwrap()
            .set_cell_value_at(21, 9, "old note")
            .unwrap();
        let wb = synthesize(wb, &layout, &[sample("E1", "GS01", "U")]).unwrap();
        let sheet = wb.worksheet_by_name("Sample").unwrap();
        assert_eq!(sheet.get_value_at(21, 9), CellValue::Empty);
    }

    #[test]
    fn test_find_duplicates() {
        let rows = vec![
            sample("E1", "GS01", "U1"),
            sample("E2", " GS01 ", "U2"),
            sample("E3", "", "U1"),
            sample("E4", "", "U3"),
        ];
        assert_eq!(find_duplicates(&rows, 1), BTreeSet::from(["GS01".to_string()]));
        assert_eq!(
            duplicate_warnings(&rows),
            vec![
                GroupWarning::DuplicateValues {
                    column: "Index_ID".into(),
                    values: vec!["U1".into()]
                },
                GroupWarning::DuplicateValues {
                    column: "LABCODE".into(),
                    values: vec!["GS01".into()]
                },
            ]
        );
    }

    #[test]
    fn test_destinations_match_letters() {
        let letters: Vec<String> = PRIMARY_DESTINATIONS.iter().map(|c| letter(*c)).collect();
        assert_eq!(letters, vec!["B", "C", "D", "E", "F", "H", "I", "J"]);
    }
}

//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use metasheet::{CellValue, Workbook, Worksheet, XlsxWriter};

pub const SAMPLE_HEADER: [&str; 9] = [
    "ID",
    "expNum",
    "LABCODE",
    "Sample_Name",
    "Sample_Type",
    "Index_ID",
    "Index2",
    "Collection_Date",
    "Note",
];

/// One sample row under [`SAMPLE_HEADER`]; empty strings are left empty
pub fn sample_row(id: u32, exp: &str, lab: &str, index: &str) -> Vec<CellValue> {
    let text = |s: &str| {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::string(s)
        }
    };
    vec![
        CellValue::from(id),
        text(exp),
        text(lab),
        text(&format!("name-{}", id)),
        CellValue::string("Blood"),
        text(index),
        CellValue::string("ACGT"),
        CellValue::Number(45292.0),
        CellValue::Empty,
    ]
}

/// A "Sample" sheet: a title row, 20 prefix rows, the header on row 21
pub fn sample_sheet(title: &str, data: &[Vec<CellValue>]) -> Worksheet {
    let mut sheet = Worksheet::new("Sample");
    sheet.set_cell_value_at(0, 0, title).unwrap();
    sheet.set_cell_value_at(19, 0, "prefix end").unwrap();
    let header: Vec<CellValue> = SAMPLE_HEADER.iter().map(|h| CellValue::string(*h)).collect();
    sheet.write_row(20, &header).unwrap();
    for (i, row) in data.iter().enumerate() {
        sheet.write_row(21 + i as u32, row).unwrap();
    }
    sheet
}

/// A plain sheet with its header on the first row
pub fn plain_sheet(name: &str, rows: &[&[&str]]) -> Worksheet {
    let mut sheet = Worksheet::new(name);
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.set_cell_value_at(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    sheet
}

/// Save sheets as a workbook at `dir/name`
pub fn write_workbook(dir: &Path, name: &str, sheets: Vec<Worksheet>) -> PathBuf {
    let mut wb = Workbook::new();
    for sheet in sheets {
        wb.add_existing_worksheet(sheet).unwrap();
    }
    let path = dir.join(name);
    XlsxWriter::write_file(&wb, &path).unwrap();
    path
}

/// A template with the four role sheets and an index table
pub fn write_template(dir: &Path) -> PathBuf {
    let mut primary = Worksheet::new("Sample");
    primary.set_cell_value_at(20, 0, "ID").unwrap();
    primary.set_cell_value_at(20, 1, "expNum").unwrap();
    let mut import = Worksheet::new("SampleImport");
    import.set_cell_value_at(22, 0, "Sample_ID").unwrap();
    let mut aviti = Worksheet::new("Aviti Manifest");
    aviti.set_cell_value_at(14, 0, "SampleName").unwrap();
    let mut illumina = Worksheet::new("Illumina Manifest");
    illumina.set_cell_value_at(22, 0, "Lane").unwrap();
    let index = plain_sheet("Index List", &[&["UDI1", "ACGTACGT"], &["UDI2", "TTGGCCAA"]]);

    write_workbook(dir, "template.xlsx", vec![primary, import, aviti, illumina, index])
}

//! XLSX styles (styles.xml) write helpers
//!
//! Only number formats are carried; every other formatting attribute uses the
//! default font, fill and border.

use std::collections::HashMap;

use metasheet_core::{NumberFormat, Workbook};
use quick_xml::escape::escape;

#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Distinct number formats; index + 1 is the cellXfs index (xf 0 is default)
    formats: Vec<NumberFormat>,
    /// Reverse lookup from format to cellXfs index
    xf_ids: HashMap<NumberFormat, u32>,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut formats = Vec::new();
        let mut xf_ids = HashMap::new();

        for sheet in workbook.worksheets() {
            for (_row, _col, cell) in sheet.iter_cells() {
                let Some(format) = &cell.number_format else {
                    continue;
                };
                if *format == NumberFormat::General || xf_ids.contains_key(format) {
                    continue;
                }
                formats.push(format.clone());
                xf_ids.insert(format.clone(), formats.len() as u32);
            }
        }

        Self { formats, xf_ids }
    }

    /// cellXfs index for a cell's number format (0 = default)
    pub(crate) fn xf_id_for(&self, format: Option<&NumberFormat>) -> u32 {
        format
            .and_then(|f| self.xf_ids.get(f))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        // Custom formats get ids from 164 up, in first-seen order
        let mut custom: Vec<(u32, &str)> = Vec::new();
        let mut num_fmt_ids: Vec<u32> = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let id = match format.id() {
                Some(id) => id,
                None => {
                    let id = NumberFormat::FIRST_CUSTOM_ID + custom.len() as u32;
                    custom.push((id, format.format_string()));
                    id
                }
            };
            num_fmt_ids.push(id);
        }

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !custom.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", custom.len()));
            for (id, code) in &custom {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape(*code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(
            r#"
  <fonts count="1">
    <font><sz val="11"/><name val="Calibri"/><family val="2"/></font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="1">
    <border><left/><right/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", num_fmt_ids.len() + 1));
        xml.push_str("\n    <xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>");
        for id in &num_fmt_ids {
            xml.push_str(&format!(
                "\n    <xf numFmtId=\"{}\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"/>",
                id
            ));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );

        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_with_formats(formats: &[NumberFormat]) -> Workbook {
        let mut wb = Workbook::new();
        let idx = wb.add_worksheet_with_name("Sample").unwrap();
        let sheet = wb.worksheet_mut(idx).unwrap();
        for (i, f) in formats.iter().enumerate() {
            sheet.set_number_format_at(i as u32, 0, f.clone()).unwrap();
        }
        wb
    }

    #[test]
    fn test_default_only() {
        let table = XlsxStyleTable::build(&workbook_with_formats(&[]));
        let xml = table.to_styles_xml();
        assert!(!xml.contains("<numFmts"));
        assert!(xml.contains("<cellXfs count=\"1\">"));
        assert_eq!(table.xf_id_for(None), 0);
    }

    #[test]
    fn test_custom_and_builtin_formats() {
        let table = XlsxStyleTable::build(&workbook_with_formats(&[
            NumberFormat::date_dmy(),
            NumberFormat::from_id(14),
            NumberFormat::date_dmy(),
        ]));

        assert_eq!(table.xf_id_for(Some(&NumberFormat::date_dmy())), 1);
        assert_eq!(table.xf_id_for(Some(&NumberFormat::from_id(14))), 2);

        let xml = table.to_styles_xml();
        assert!(xml.contains("<numFmt numFmtId=\"164\" formatCode=\"dd/mm/yyyy\"/>"));
        assert!(xml.contains("<cellXfs count=\"3\">"));
        assert!(xml.contains("<xf numFmtId=\"14\""));
    }
}

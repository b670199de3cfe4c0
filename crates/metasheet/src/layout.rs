//! Row layout configuration
//!
//! Every hard row offset the engine uses lives here: how source sheets are
//! split into prefix, header and data when merging, and where each template
//! sheet's header and data region sit. Rows are 0-based throughout; user
//! facing messages add one.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

/// Source sheet holding one row per sample
pub const SAMPLE_SHEET: &str = "Sample";

/// Source sheet holding the sequencer import rows
pub const SAMPLE_IMPORT_SHEET: &str = "Sample Import";

/// How a source sheet is split before merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetRule {
    /// Rows copied verbatim from the reference file
    pub prefix_rows: u32,
    /// Row holding the column headers
    pub header_row: u32,
}

impl SheetRule {
    /// Rule for sheets without an entry: header in the first row, no prefix
    pub const DEFAULT: SheetRule = SheetRule {
        prefix_rows: 0,
        header_row: 0,
    };

    /// Create a rule
    pub const fn new(prefix_rows: u32, header_row: u32) -> Self {
        Self {
            prefix_rows,
            header_row,
        }
    }

    /// First data row
    pub fn data_start(&self) -> u32 {
        self.header_row + 1
    }
}

impl Default for SheetRule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The four template sheets derived rows are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SheetRole {
    /// Sample rows copied from the merged source
    Primary,
    /// Sequencer import rows derived from the primary sheet
    Import,
    /// Aviti sequencer manifest
    AvitiManifest,
    /// Illumina sequencer manifest
    IlluminaManifest,
}

impl SheetRole {
    /// All roles, in write order
    pub const ALL: [SheetRole; 4] = [
        SheetRole::Primary,
        SheetRole::Import,
        SheetRole::AvitiManifest,
        SheetRole::IlluminaManifest,
    ];
}

/// Where a template sheet's regions are
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetLayout {
    /// Sheet name in the template
    pub sheet: String,
    /// Rows above the header
    pub prefix_rows: u32,
    /// Header row
    pub header_row: u32,
    /// Row the first sample is written to
    pub data_start_row: u32,
}

impl SheetLayout {
    /// Create a layout whose data starts right below the header
    pub fn new<S: Into<String>>(sheet: S, header_row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            prefix_rows: header_row,
            header_row,
            data_start_row: header_row + 1,
        }
    }

    /// Row for the sample at ordinal `k`
    pub fn row_for(&self, k: usize) -> u32 {
        self.data_start_row + k as u32
    }
}

/// Merge rules and template layout, validated once per entry point
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    /// Per-sheet merge rules; unlisted sheets use [`SheetRule::DEFAULT`]
    pub merge_rules: BTreeMap<String, SheetRule>,
    /// Primary sample sheet
    pub primary: SheetLayout,
    /// Import sheet
    pub import: SheetLayout,
    /// Aviti manifest sheet
    pub aviti_manifest: SheetLayout,
    /// Illumina manifest sheet
    pub illumina_manifest: SheetLayout,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let mut merge_rules = BTreeMap::new();
        merge_rules.insert(SAMPLE_SHEET.to_string(), SheetRule::new(20, 20));
        merge_rules.insert(SAMPLE_IMPORT_SHEET.to_string(), SheetRule::new(22, 22));

        Self {
            merge_rules,
            primary: SheetLayout::new("Sample", 20),
            import: SheetLayout::new("SampleImport", 22),
            aviti_manifest: SheetLayout::new("Aviti Manifest", 14),
            illumina_manifest: SheetLayout::new("Illumina Manifest", 22),
        }
    }
}

impl LayoutConfig {
    /// Merge rule for a source sheet
    pub fn rule_for(&self, sheet: &str) -> SheetRule {
        self.merge_rules.get(sheet).copied().unwrap_or_default()
    }

    /// Layout of a template sheet
    pub fn role(&self, role: SheetRole) -> &SheetLayout {
        match role {
            SheetRole::Primary => &self.primary,
            SheetRole::Import => &self.import,
            SheetRole::AvitiManifest => &self.aviti_manifest,
            SheetRole::IlluminaManifest => &self.illumina_manifest,
        }
    }

    /// Check that every region is ordered and role sheets are distinct
    pub fn validate(&self) -> Result<()> {
        for (sheet, rule) in &self.merge_rules {
            if rule.prefix_rows > rule.header_row {
                return Err(Error::InvalidLayout(format!(
                    "merge rule for '{}': {} prefix rows overlap header row {}",
                    sheet,
                    rule.prefix_rows,
                    rule.header_row + 1
                )));
            }
        }

        let mut seen = HashSet::new();
        for role in SheetRole::ALL {
            let layout = self.role(role);
            if layout.sheet.trim().is_empty() {
                return Err(Error::InvalidLayout(format!("{:?} sheet has no name", role)));
            }
            if layout.prefix_rows > layout.header_row || layout.header_row >= layout.data_start_row
            {
                return Err(Error::InvalidLayout(format!(
                    "'{}' needs prefix rows <= header row < data start (got {}, {}, {})",
                    layout.sheet,
                    layout.prefix_rows,
                    layout.header_row + 1,
                    layout.data_start_row + 1
                )));
            }
            if !seen.insert(layout.sheet.to_lowercase()) {
                return Err(Error::InvalidLayout(format!(
                    "sheet '{}' is used by more than one role",
                    layout.sheet
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_rules() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.rule_for("Sample"), SheetRule::new(20, 20));
        assert_eq!(layout.rule_for("Sample Import"), SheetRule::new(22, 22));
        assert_eq!(layout.rule_for("Index List"), SheetRule::DEFAULT);
        assert_eq!(layout.rule_for("Sample").data_start(), 21);
    }

    #[test]
    fn test_default_roles() {
        let layout = LayoutConfig::default();
        // 1-based data starts: 22, 24, 16, 24
        assert_eq!(layout.role(SheetRole::Primary).row_for(0), 21);
        assert_eq!(layout.role(SheetRole::Import).row_for(0), 23);
        assert_eq!(layout.role(SheetRole::AvitiManifest).row_for(0), 15);
        assert_eq!(layout.role(SheetRole::IlluminaManifest).row_for(3), 26);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_order() {
        let mut layout = LayoutConfig::default();
        layout.import.data_start_row = layout.import.header_row;
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));

        let mut layout = LayoutConfig::default();
        layout
            .merge_rules
            .insert("Sample".into(), SheetRule::new(21, 20));
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_sheets() {
        let mut layout = LayoutConfig::default();
        layout.illumina_manifest.sheet = "aviti manifest".into();
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "aviti_manifest": { "sheet": "Aviti", "prefix_rows": 10, "header_row": 10, "data_start_row": 11 } }"#;
        let layout: LayoutConfig = serde_json::from_str(json).unwrap();
        assert_eq!(layout.aviti_manifest.sheet, "Aviti");
        assert_eq!(layout.primary, LayoutConfig::default().primary);
        assert_eq!(layout.rule_for("Sample"), SheetRule::new(20, 20));
    }
}

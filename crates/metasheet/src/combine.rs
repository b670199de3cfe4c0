//! Folder-level combine: scan, merge each group, optionally fill a template
//!
//! Groups are independent. A group that fails records its error in its
//! report and leaves no files behind; the other groups carry on.

use std::fs;
use std::path::{Path, PathBuf};

use metasheet_core::{Row, Workbook};
use metasheet_xlsx::{ReadMode, XlsxReader, XlsxWriter};
use tracing::{error, info, warn};

use crate::classify::{scan, RunGroup, RunKey, ScanMode};
use crate::error::{Error, GroupWarning, Result};
use crate::layout::{LayoutConfig, SAMPLE_SHEET};
use crate::merge::{load_group, merge_group, MergedTable};
use crate::progress::{percent, ProgressSink};
use crate::project::project_samples;
use crate::synthesize::{duplicate_warnings, synthesize};

/// Options for [`combine`]
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Folder of source metadata workbooks
    pub source_dir: PathBuf,
    /// Folder outputs are written to; created if absent
    pub output_dir: PathBuf,
    /// Template filled with each group's samples
    pub template: Option<PathBuf>,
    /// How file names are grouped
    pub mode: ScanMode,
    /// Row layout
    pub layout: LayoutConfig,
}

impl CombineOptions {
    /// Strict scan, default layout, no template
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source_dir: P, output_dir: Q) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the template
    pub fn with_template<P: Into<PathBuf>>(mut self, template: P) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the scan mode
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the layout
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }
}

/// Outcome of one group
#[derive(Debug)]
pub struct GroupReport {
    /// Run and date
    pub key: RunKey,
    /// Source files, in merge order
    pub files: Vec<PathBuf>,
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Recoverable problems
    pub warnings: Vec<GroupWarning>,
    /// Why the group failed, if it did
    pub error: Option<Error>,
}

impl GroupReport {
    fn new(group: &RunGroup) -> Self {
        Self {
            key: group.key.clone(),
            files: group.paths(),
            outputs: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Whether the group failed
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a whole combine run
#[derive(Debug, Default)]
pub struct CombineReport {
    /// One report per group, in key order
    pub groups: Vec<GroupReport>,
}

impl CombineReport {
    /// Every file written
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.groups
            .iter()
            .flat_map(|g| g.outputs.iter().map(PathBuf::as_path))
    }

    /// Groups that failed
    pub fn failed(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.failed())
    }

    /// Whether any group failed
    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// A template loaded once and copied per group
struct Template {
    path: PathBuf,
    workbook: Workbook,
}

/// Combine every group in the source folder
///
/// Input problems (missing folders, a bad template path, a strict scan
/// that finds foreign names) fail before any group runs. After that each
/// group's outcome is in the returned report.
pub fn combine<S: ProgressSink>(options: &CombineOptions, progress: &mut S) -> Result<CombineReport> {
    options.layout.validate()?;

    if let Some(template) = &options.template {
        if !template.exists() {
            return Err(Error::InputNotFound(template.clone()));
        }
        if !template.is_file() {
            return Err(Error::NotAFile(template.clone()));
        }
    }

    let groups = scan(&options.source_dir, options.mode)?;
    fs::create_dir_all(&options.output_dir)?;

    let template = match &options.template {
        Some(path) => {
            let workbook = XlsxReader::read_file(path, ReadMode::Formulas)?;
            warn!(
                template = %path.display(),
                "template styling beyond number formats is not carried into filled copies"
            );
            Some(Template {
                path: path.clone(),
                workbook,
            })
        }
        None => None,
    };

    let total = groups.len();
    let mut report = CombineReport::default();
    for (i, group) in groups.iter().enumerate() {
        info!(group = %group.key, files = group.files.len(), "combining group");
        let mut group_report = GroupReport::new(group);
        if let Err(e) = process_group(group, options, template.as_ref(), &mut group_report) {
            error!(group = %group.key, error = %e, "group failed");
            discard_outputs(&mut group_report);
            group_report.error = Some(e);
        }
        report.groups.push(group_report);
        progress.report(percent(i + 1, total));
    }
    progress.report(100.0);

    Ok(report)
}

fn process_group(
    group: &RunGroup,
    options: &CombineOptions,
    template: Option<&Template>,
    report: &mut GroupReport,
) -> Result<()> {
    let layout = &options.layout;
    let sheets = load_group(&report.files, &mut report.warnings);
    let tables = merge_group(&sheets, layout, &mut report.warnings)?;

    if tables.iter().all(|t| t.row_count() == 0) {
        warn!(group = %group.key, "no usable rows");
        report.warnings.push(GroupWarning::NoUsableRows);
        return Ok(());
    }

    let mut combined = Workbook::new();
    for table in &tables {
        combined.add_existing_worksheet(table.to_worksheet()?)?;
    }

    // Build everything before writing so a group fails without output
    let templated = match template {
        Some(template) => {
            let samples = sample_rows(tables.iter().find(|t| t.sheet == SAMPLE_SHEET))?;
            let dups = duplicate_warnings(&samples);
            for w in &dups {
                warn!(group = %group.key, "{}", w);
            }
            report.warnings.extend(dups);
            let out = options.output_dir.join(group.key.template_file_name());
            if samples.is_empty() {
                Some((out, None))
            } else {
                Some((out, Some(synthesize(template.workbook.clone(), layout, &samples)?)))
            }
        }
        None => None,
    };

    // Outputs are recorded before writing so a partial file is cleaned up too
    let out = options.output_dir.join(group.key.combined_file_name());
    report.outputs.push(out.clone());
    XlsxWriter::write_file(&combined, &out)?;

    if let (Some((out, workbook)), Some(template)) = (templated, template) {
        report.outputs.push(out.clone());
        match workbook {
            Some(workbook) => XlsxWriter::write_file(&workbook, &out)?,
            None => {
                fs::copy(&template.path, &out)?;
            }
        }
    }

    for out in &report.outputs {
        info!(group = %group.key, path = %out.display(), "wrote");
    }
    Ok(())
}

/// Projected sample rows of the merged Sample sheet, if any
fn sample_rows(table: Option<&MergedTable>) -> Result<Vec<Row>> {
    match table {
        Some(table) if table.header.is_some() => Ok(project_samples(table)?.data),
        _ => Ok(Vec::new()),
    }
}

fn discard_outputs(report: &mut GroupReport) {
    for path in report.outputs.drain(..) {
        if !path.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}

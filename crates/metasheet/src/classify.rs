//! Filename classification and run grouping
//!
//! Source workbooks are named `metadata_<RUN>_<YYYYMMDD>[_<SUFFIX>].xlsx`.
//! Files that share run and date belong to one group whatever their suffix.
//! Two scan modes exist:
//!
//! - [`ScanMode::Strict`] only accepts names that follow the pattern and
//!   fails the whole scan, naming every offender, if any `.xlsx` does not.
//! - [`ScanMode::Lenient`] groups anything that looks like a workbook, taking
//!   the date from the first `20YYMMDD` in the name or else from the file's
//!   modification time.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use lazy_regex::{lazy_regex, Lazy, Regex};
use tracing::{debug, info};

use crate::error::{Error, Result};

static METADATA_NAME: Lazy<Regex> = lazy_regex!(
    r"^metadata_(?P<run>[A-Za-z0-9_-]+)_(?P<date>20\d{6})(?:_(?P<suffix>.*))?\.xlsx$"i
);
static BARE_DATE: Lazy<Regex> = lazy_regex!(r"20\d{6}");
static UNSAFE_RUN_CHARS: Lazy<Regex> = lazy_regex!(r"[^A-Za-z0-9_-]+");

const METADATA_PREFIX: &str = "metadata_";
const RUN_SEPARATORS: &[char] = &[' ', '_', '-'];
const FALLBACK_RUN: &str = "run";

/// Marker the spreadsheet application puts on its lock files
pub const TEMP_FILE_PREFIX: &str = "~$";

/// Identity of a batch of files: one run on one date
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    /// Normalized run name
    pub run: String,
    /// `YYYYMMDD`
    pub date: String,
}

impl RunKey {
    /// Create a key, normalizing the run name
    pub fn new(run: &str, date: impl Into<String>) -> Self {
        Self {
            run: normalize_run(run),
            date: date.into(),
        }
    }

    /// Combined workbook name: `metadata_<run>_<date>.xlsx`
    pub fn combined_file_name(&self) -> String {
        format!("metadata_{}_{}.xlsx", sanitize_run(&self.run), self.date)
    }

    /// Template export name: `<run>_<date>.xlsx`
    pub fn template_file_name(&self) -> String {
        format!("{}_{}.xlsx", sanitize_run(&self.run), self.date)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.run, self.date)
    }
}

/// Parts of a file name that follows the metadata pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedName {
    /// Group key
    pub key: RunKey,
    /// Text after the date, without the leading `_`
    pub suffix: Option<String>,
}

/// One spreadsheet on disk with the key it was grouped under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location
    pub path: PathBuf,
    /// Group key
    pub key: RunKey,
    /// Suffix from the name, strict mode only
    pub suffix: Option<String>,
}

/// Files sharing a key, sorted by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunGroup {
    /// Group key
    pub key: RunKey,
    /// Members in path order
    pub files: Vec<SourceFile>,
}

impl RunGroup {
    /// Member paths in path order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// How file names are turned into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Only `metadata_<RUN>_<YYYYMMDD>[_<SUFFIX>].xlsx`, anything else fails
    #[default]
    Strict,
    /// Best effort over `.xlsx`, `.xlsm` and `.xls`
    Lenient,
}

/// Parse a file name against the metadata pattern
///
/// ```
/// use metasheet::classify::classify;
///
/// let name = classify("metadata_RUN1_20240101_rerun.xlsx").unwrap();
/// assert_eq!(name.key.run, "RUN1");
/// assert_eq!(name.key.date, "20240101");
/// assert_eq!(name.suffix.as_deref(), Some("rerun"));
/// ```
pub fn classify(file_name: &str) -> Option<ClassifiedName> {
    let caps = METADATA_NAME.captures(file_name)?;
    Some(ClassifiedName {
        key: RunKey::new(&caps["run"], &caps["date"]),
        suffix: caps.name("suffix").map(|m| m.as_str().to_string()),
    })
}

/// Strip any `metadata_` prefixes and surrounding separators
///
/// An empty result becomes `"run"`. Normalizing twice changes nothing.
pub fn normalize_run(run: &str) -> String {
    let mut rest = run;
    loop {
        let has_prefix = rest
            .get(..METADATA_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(METADATA_PREFIX));
        let stripped = if has_prefix {
            &rest[METADATA_PREFIX.len()..]
        } else {
            rest
        };
        let stripped = stripped.trim_matches(RUN_SEPARATORS);
        if stripped == rest {
            break;
        }
        rest = stripped;
    }

    if rest.is_empty() {
        FALLBACK_RUN.to_string()
    } else {
        rest.to_string()
    }
}

/// Make a run name safe for a file name
///
/// Every stretch of characters outside `[A-Za-z0-9_-]` becomes one `_`, and
/// surrounding `_` are trimmed.
pub fn sanitize_run(run: &str) -> String {
    let safe = UNSAFE_RUN_CHARS.replace_all(run, "_");
    let safe = safe.trim_matches('_');
    if safe.is_empty() {
        FALLBACK_RUN.to_string()
    } else {
        safe.to_string()
    }
}

/// Spreadsheet lock files are never processed
pub fn is_temp_file(file_name: &str) -> bool {
    file_name.starts_with(TEMP_FILE_PREFIX)
}

/// Key for a file that does not follow the pattern
///
/// The date is the first `20YYMMDD` in the stem, else the local modification
/// date. The run is the rest of the stem, normalized and lower-cased.
pub fn lenient_key(path: &Path) -> Result<RunKey> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let date = match BARE_DATE.find(&stem) {
        Some(m) => m.as_str().to_string(),
        None => {
            let modified = fs::metadata(path)?.modified()?;
            DateTime::<Local>::from(modified).format("%Y%m%d").to_string()
        }
    };

    let run = stem
        .replace(&date, "")
        .trim_matches(&[' ', '_', '-', '.'][..])
        .to_string();
    Ok(RunKey {
        run: normalize_run(&run).to_lowercase(),
        date,
    })
}

/// Group files by key; groups come out in key order, members in path order
pub fn group(files: impl IntoIterator<Item = SourceFile>) -> Vec<RunGroup> {
    let mut grouped: BTreeMap<RunKey, Vec<SourceFile>> = BTreeMap::new();
    for file in files {
        grouped.entry(file.key.clone()).or_default().push(file);
    }
    grouped
        .into_iter()
        .map(|(key, mut files)| {
            files.sort_by(|a, b| a.path.cmp(&b.path));
            RunGroup { key, files }
        })
        .collect()
}

/// Scan a directory (non-recursively) and group its workbooks
pub fn scan(dir: &Path, mode: ScanMode) -> Result<Vec<RunGroup>> {
    if !dir.exists() {
        return Err(Error::InputNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(Error::NotADirectory(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::new();
    let mut offenders = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_temp_file(&name) || !has_extension(&path, mode) {
            continue;
        }

        match mode {
            ScanMode::Strict => match classify(&name) {
                Some(classified) => files.push(SourceFile {
                    path,
                    key: classified.key,
                    suffix: classified.suffix,
                }),
                None => offenders.push(name),
            },
            ScanMode::Lenient => {
                let key = lenient_key(&path)?;
                files.push(SourceFile {
                    path,
                    key,
                    suffix: None,
                });
            }
        }
    }

    if !offenders.is_empty() {
        return Err(Error::FilenameFormat { names: offenders });
    }
    if files.is_empty() {
        return Err(Error::NoInputFiles(dir.to_path_buf()));
    }

    let groups = group(files);
    for g in &groups {
        debug!(group = %g.key, files = g.files.len(), "grouped");
    }
    info!(dir = %dir.display(), groups = groups.len(), ?mode, "scanned source folder");
    Ok(groups)
}

fn has_extension(path: &Path, mode: ScanMode) -> bool {
    let accepted: &[&str] = match mode {
        ScanMode::Strict => &["xlsx"],
        ScanMode::Lenient => &["xlsx", "xlsm", "xls"],
    };
    path.extension()
        .map(|e| e.to_string_lossy())
        .is_some_and(|e| accepted.iter().any(|a| e.eq_ignore_ascii_case(a)))
}

//! Metasheet CLI - run metadata combine and export tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metasheet::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "metasheet")]
#[command(
    author,
    version,
    about = "Combine laboratory run metadata workbooks and export sequencer sheets"
)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the run groups found in a folder
    Scan {
        /// Folder of metadata workbooks
        dir: PathBuf,

        /// Group files that do not follow the naming pattern
        #[arg(long)]
        lenient: bool,
    },

    /// Merge each run group into one workbook
    Combine {
        /// Folder of metadata workbooks
        #[arg(short, long)]
        source: PathBuf,

        /// Output folder (created if missing)
        #[arg(short, long)]
        output: PathBuf,

        /// Template filled with each run's samples
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Group files that do not follow the naming pattern
        #[arg(long)]
        lenient: bool,

        /// JSON file overriding the row layout
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Export sheet regions of a workbook or folder to CSV
    #[command(alias = "csv")]
    Export {
        /// Workbook or folder of workbooks
        input: PathBuf,

        /// Output folder (created if missing)
        #[arg(short, long)]
        output: PathBuf,

        /// Sheet to export
        #[arg(long, default_value = "SampleImport")]
        sheet: String,

        /// First exported row (1-based)
        #[arg(long, default_value = "24")]
        start_row: u32,

        /// Skip the Aviti Manifest export
        #[arg(long)]
        no_duo: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan { dir, lenient } => list_groups(&dir, scan_mode(lenient)),
        Commands::Combine {
            source,
            output,
            template,
            lenient,
            layout,
        } => run_combine(source, output, template, scan_mode(lenient), layout.as_deref()),
        Commands::Export {
            input,
            output,
            sheet,
            start_row,
            no_duo,
        } => run_export(input, output, sheet, start_row, no_duo),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn scan_mode(lenient: bool) -> ScanMode {
    if lenient {
        ScanMode::Lenient
    } else {
        ScanMode::Strict
    }
}

fn list_groups(dir: &Path, mode: ScanMode) -> Result<()> {
    let groups = scan(dir, mode).with_context(|| format!("Failed to scan '{}'", dir.display()))?;

    for group in &groups {
        println!("{}\t{} file(s)", group.key, group.files.len());
        for file in &group.files {
            println!("  {}", file.path.display());
        }
    }

    Ok(())
}

fn load_layout(path: Option<&Path>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let layout: LayoutConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid layout file '{}'", path.display()))?;
    debug!(?layout, "loaded layout");
    Ok(layout)
}

fn run_combine(
    source: PathBuf,
    output: PathBuf,
    template: Option<PathBuf>,
    mode: ScanMode,
    layout: Option<&Path>,
) -> Result<()> {
    let options = CombineOptions {
        source_dir: source,
        output_dir: output,
        template,
        mode,
        layout: load_layout(layout)?,
    };

    let report = combine(&options, &mut |percent: f64| debug!(percent, "progress"))
        .context("Combine failed")?;

    for group in &report.groups {
        for path in &group.outputs {
            println!("{}", path.display());
        }
        for warning in &group.warnings {
            eprintln!("Warning [{}]: {}", group.key, warning);
        }
        if let Some(error) = &group.error {
            eprintln!("Error [{}]: {}", group.key, error);
        }
    }

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{} of {} group(s) failed", failed, report.groups.len());
    }
    Ok(())
}

fn run_export(input: PathBuf, output: PathBuf, sheet: String, start_row: u32, no_duo: bool) -> Result<()> {
    if start_row == 0 {
        bail!("--start-row is 1-based");
    }

    let options = ExportOptions {
        primary: ExportTarget::new(sheet, start_row),
        secondary: if no_duo { None } else { Some(ExportTarget::aviti()) },
        ..ExportOptions::new(input, output)
    };

    let written = export(&options, &mut |percent: f64| debug!(percent, "progress"))
        .with_context(|| format!("Failed to export '{}'", options.input.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    eprintln!("Wrote {} file(s)", written.len());

    Ok(())
}

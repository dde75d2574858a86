use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use datestamp_core::{FileOutcome, FileReport, ProcessOptions, RenameError};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datestamp", version, about = "Prefix photo filenames with their EXIF capture date")]
struct Cli {
    /// Directory containing the photos to rename
    directory: Option<PathBuf>,

    /// Log per-file decisions to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print the run summary as JSON instead of per-file lines
    #[arg(long)]
    json: bool,
}

/// Exit status when no directory was given.
const EXIT_USAGE: u8 = 2;

/// Exit status when the directory is invalid.
const EXIT_INVALID_DIRECTORY: u8 = 1;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = run(cli, &mut io::stdout().lock())?;
    Ok(ExitCode::from(code))
}

/// Run one invocation, writing narration to `out`. Returns the exit status.
fn run<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<u8> {
    let Some(directory) = cli.directory else {
        writeln!(out, "{}", Cli::command().render_usage())?;
        return Ok(EXIT_USAGE);
    };

    if !cli.json {
        let shown = std::fs::canonicalize(&directory).unwrap_or_else(|_| directory.clone());
        if shown.is_dir() {
            writeln!(out, "Processing images in: {}", shown.display())?;
        }
    }

    let options = ProcessOptions { directory };
    let reports = RefCell::new(Vec::new());
    let out = RefCell::new(out);
    let write_error = RefCell::new(None);
    let result = datestamp_core::process_directory(&options, &|report: &FileReport| {
        if cli.json {
            reports.borrow_mut().push(report.clone());
        } else if let Err(e) = writeln!(out.borrow_mut(), "{}", describe(report)) {
            write_error.borrow_mut().get_or_insert(e);
        }
    });
    let out = out.into_inner();
    if let Some(e) = write_error.into_inner() {
        return Err(e.into());
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(err @ RenameError::NotADirectory { .. }) => {
            writeln!(out, "Error: {err}.")?;
            return Ok(EXIT_INVALID_DIRECTORY);
        }
        Err(err) => return Err(err.into()),
    };

    if cli.json {
        let doc = json!({ "summary": summary, "files": reports.into_inner() });
        writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
    } else {
        writeln!(out, "\nCompleted. {} files renamed.", summary.renamed)?;
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "datestamp_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn describe(report: &FileReport) -> String {
    let name = &report.file_name;
    match &report.outcome {
        FileOutcome::Renamed { new_name } => format!("Renamed: {name} -> {new_name}"),
        FileOutcome::AlreadyPrefixed => format!("Skipping {name} (already renamed)"),
        FileOutcome::NoCaptureDate { .. } => format!("Skipping {name} (No EXIF date found)"),
        FileOutcome::RenameFailed { error } => format!("Error renaming {name}: {error}"),
    }
}

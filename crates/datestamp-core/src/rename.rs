use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{RenameError, RenameFileError};
use crate::extract::{extract_capture_timestamp, Extraction, NotFoundReason};
use crate::timestamp::CaptureTimestamp;

/// Options for one run over a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub directory: PathBuf,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Renamed { new_name: String },
    NoCaptureDate { reason: NotFoundReason },
    AlreadyPrefixed,
    RenameFailed { error: String },
}

/// Per-file report passed to the caller's callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Totals for one run. `renamed` is the number of files renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub directory: PathBuf,
    pub renamed: u64,
    pub already_prefixed: u64,
    pub no_capture_date: u64,
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Renamed { .. } => self.renamed += 1,
            FileOutcome::NoCaptureDate { .. } => self.no_capture_date += 1,
            FileOutcome::AlreadyPrefixed => self.already_prefixed += 1,
            FileOutcome::RenameFailed { .. } => self.failed += 1,
        }
    }
}

/// Callback receiving one report per processed file.
pub type ReportCallback<'a> = dyn Fn(&FileReport) + 'a;

/// Rename decision for a file whose capture timestamp is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDecision {
    pub original_name: OsString,
    pub prefix: String,
    pub already_prefixed: bool,
}

impl RenameDecision {
    pub fn decide(original_name: &OsStr, timestamp: &CaptureTimestamp) -> Self {
        let prefix = timestamp.prefix();
        let already_prefixed = original_name.to_string_lossy().starts_with(&prefix);
        Self {
            original_name: original_name.to_os_string(),
            prefix,
            already_prefixed,
        }
    }

    /// `<prefix>-<original name>`
    pub fn new_name(&self) -> OsString {
        let mut name = OsString::from(&self.prefix);
        name.push("-");
        name.push(&self.original_name);
        name
    }
}

/// Prefix every eligible file directly inside `options.directory` with its
/// capture timestamp.
///
/// Only an invalid directory is an error. Per-file problems are reported
/// through `on_file` and never stop the run.
pub fn process_directory(
    options: &ProcessOptions,
    on_file: &ReportCallback<'_>,
) -> Result<RunSummary, RenameError> {
    let dir = &options.directory;
    if !dir.is_dir() {
        return Err(RenameError::NotADirectory { path: dir.clone() });
    }

    let mut summary = RunSummary {
        directory: dir.clone(),
        ..RunSummary::default()
    };

    for path in list_candidates(dir)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        let file_name = name.to_string_lossy().into_owned();
        let outcome = process_file(dir, &path, name);
        summary.record(&outcome);
        on_file(&FileReport { file_name, outcome });
    }

    debug!(?summary, "run finished");
    Ok(summary)
}

/// Snapshot of regular, non-hidden files in `dir`, sorted by name.
fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, RenameError> {
    let entries = fs::read_dir(dir).map_err(|source| RenameError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        // Follows symlinks: a link to a regular file is processed.
        if !fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            continue;
        }
        if is_hidden(&entry.file_name()) {
            debug!(path = %path.display(), "skipping hidden file");
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn process_file(dir: &Path, path: &Path, name: &OsStr) -> FileOutcome {
    let timestamp = match extract_capture_timestamp(path) {
        Extraction::Found(ts) => ts,
        Extraction::NotFound(reason) => return FileOutcome::NoCaptureDate { reason },
    };

    let decision = RenameDecision::decide(name, &timestamp);
    if decision.already_prefixed {
        return FileOutcome::AlreadyPrefixed;
    }

    let new_name = decision.new_name();
    match rename_in_place(path, &dir.join(&new_name)) {
        Ok(()) => FileOutcome::Renamed {
            new_name: new_name.to_string_lossy().into_owned(),
        },
        Err(e) => {
            error!(path = %path.display(), error = %e, "rename failed");
            FileOutcome::RenameFailed { error: e.to_string() }
        }
    }
}

/// Rename without ever replacing an existing file.
fn rename_in_place(from: &Path, to: &Path) -> Result<(), RenameFileError> {
    if to.symlink_metadata().is_ok() {
        let name = to
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(RenameFileError::TargetExists(name));
    }
    fs::rename(from, to)?;
    Ok(())
}

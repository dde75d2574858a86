use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::metadata::{FieldValue, MetadataTable};
use crate::timestamp::CaptureTimestamp;

/// Outcome of looking for a capture timestamp in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Found(CaptureTimestamp),
    NotFound(NotFoundReason),
}

impl Extraction {
    pub fn timestamp(self) -> Option<CaptureTimestamp> {
        match self {
            Extraction::Found(ts) => Some(ts),
            Extraction::NotFound(_) => None,
        }
    }
}

/// Why no capture timestamp was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Not a recognised image container
    UnsupportedFormat,
    /// Image carries no metadata block, or an empty one
    NoMetadata,
    /// Metadata block or capture field could not be interpreted
    MalformedMetadata,
    /// Metadata present but without a capture date/time
    NoCaptureField,
    /// Capture field is not a valid `YYYY:MM:DD HH:MM:SS` value
    InvalidTimestamp,
    /// Unexpected I/O failure (logged)
    Unreadable,
}

/// Extract the capture timestamp from the image at `path`.
///
/// Never fails: every problem with the file becomes
/// [`Extraction::NotFound`]. Unexpected failures are logged with the file
/// name. The file is closed before this returns, on every path.
pub fn extract_capture_timestamp(path: &Path) -> Extraction {
    let table = match read_metadata_table(path) {
        Ok(table) => table,
        Err(err) => {
            let reason = match err {
                ExtractError::UnsupportedFormat => NotFoundReason::UnsupportedFormat,
                ExtractError::NoMetadata => NotFoundReason::NoMetadata,
                ExtractError::Malformed(_) => NotFoundReason::MalformedMetadata,
                ExtractError::Io(_) => {
                    warn!("Error reading {}: {}", display_name(path), err);
                    NotFoundReason::Unreadable
                }
            };
            debug!(path = %path.display(), %err, "no metadata table");
            return Extraction::NotFound(reason);
        }
    };

    let extraction = timestamp_from_table(&table);
    debug!(path = %path.display(), ?extraction, "capture timestamp lookup");
    extraction
}

/// Resolve the capture timestamp from an already-decoded table.
pub fn timestamp_from_table(table: &MetadataTable) -> Extraction {
    if table.is_empty() {
        return Extraction::NotFound(NotFoundReason::NoMetadata);
    }
    let value = match table.capture_value() {
        Some(value) if !value.is_empty() => value,
        _ => return Extraction::NotFound(NotFoundReason::NoCaptureField),
    };
    match value {
        FieldValue::Text(s) => match CaptureTimestamp::parse(s) {
            Some(ts) => Extraction::Found(ts),
            None => Extraction::NotFound(NotFoundReason::InvalidTimestamp),
        },
        FieldValue::Other(_) => Extraction::NotFound(NotFoundReason::MalformedMetadata),
    }
}

/// Decode the metadata table. The file handle lives only in this scope.
fn read_metadata_table(path: &Path) -> Result<MetadataTable, ExtractError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;
    Ok(MetadataTable::from_exif(&exif))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

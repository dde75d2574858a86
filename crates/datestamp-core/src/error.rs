use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure that ends a whole run.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("'{}' is not a valid directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to read directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why reading metadata from one file failed.
///
/// Never leaves the extractor; each variant collapses into a
/// [`NotFoundReason`](crate::extract::NotFoundReason).
#[derive(Error, Debug)]
pub(crate) enum ExtractError {
    #[error("unrecognised image format")]
    UnsupportedFormat,

    #[error("no embedded metadata")]
    NoMetadata,

    #[error("malformed metadata: {0}")]
    Malformed(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl From<exif::Error> for ExtractError {
    fn from(err: exif::Error) -> Self {
        match err {
            exif::Error::InvalidFormat("Unknown image format") => ExtractError::UnsupportedFormat,
            exif::Error::InvalidFormat(msg) => ExtractError::Malformed(msg.to_string()),
            exif::Error::NotFound(_) => ExtractError::NoMetadata,
            exif::Error::Io(e) => ExtractError::Io(e),
            other => ExtractError::Malformed(other.to_string()),
        }
    }
}

/// Failure of a single rename.
#[derive(Error, Debug)]
pub enum RenameFileError {
    #[error("target '{0}' already exists")]
    TargetExists(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

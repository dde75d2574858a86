pub mod error;
pub mod extract;
pub mod metadata;
pub mod rename;
pub mod timestamp;

pub use error::{RenameError, RenameFileError};
pub use extract::{extract_capture_timestamp, Extraction, NotFoundReason};
pub use metadata::{resolve_name, FieldValue, MetadataTable, DATE_TIME_ORIGINAL};
pub use rename::{
    process_directory, FileOutcome, FileReport, ProcessOptions, RenameDecision, ReportCallback,
    RunSummary,
};
pub use timestamp::CaptureTimestamp;

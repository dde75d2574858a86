use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Layout of Exif date/time strings: `YYYY:MM:DD HH:MM:SS`.
const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout of filename prefixes: `YYYY-MM-DD_HH-MM-SS`.
const PREFIX_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Length of both the Exif string and the derived prefix.
pub const PREFIX_LEN: usize = 19;

/// Capture date/time of a photo.
/// Exif datetimes have no timezone info - they are local time as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureTimestamp(NaiveDateTime);

impl CaptureTimestamp {
    /// Parse an Exif `YYYY:MM:DD HH:MM:SS` string.
    ///
    /// Every component must have its full width; out-of-range values are
    /// rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if !has_exif_layout(s) {
            return None;
        }
        let dt = NaiveDateTime::parse_from_str(s, EXIF_FORMAT).ok()?;
        // chrono encodes second 60 as a leap second and allows year 0.
        if dt.nanosecond() >= 1_000_000_000 || dt.year() < 1 {
            return None;
        }
        Some(Self(dt))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// Filename prefix, e.g. `2023-07-04_10-15-30`.
    pub fn prefix(&self) -> String {
        self.0.format(PREFIX_FORMAT).to_string()
    }
}

impl fmt::Display for CaptureTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PREFIX_FORMAT))
    }
}

fn has_exif_layout(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != PREFIX_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 | 13 | 16 => b == b':',
        10 => b == b' ',
        _ => b.is_ascii_digit(),
    })
}

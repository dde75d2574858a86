pub mod tags;

use exif::{Context, Exif, Value};

pub use tags::resolve_name;

/// Exif code of the "capture date/time original" field.
pub const DATE_TIME_ORIGINAL: u16 = 36867;

/// Registry name of the "capture date/time original" field.
pub const DATE_TIME_ORIGINAL_NAME: &str = "DateTimeOriginal";

/// Value stored under a metadata field code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// ASCII field (first component, trailing NULs removed)
    Text(String),
    /// Any other value shape, rendered for display
    Other(String),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Other(s) => s.is_empty(),
        }
    }

    fn from_exif(value: &Value, display: String) -> Self {
        match value {
            Value::Ascii(components) => {
                let first = components.first().map(Vec::as_slice).unwrap_or_default();
                let text = String::from_utf8_lossy(first);
                FieldValue::Text(text.trim_end_matches('\0').to_string())
            }
            _ => FieldValue::Other(display),
        }
    }
}

/// Embedded metadata of one image: field code -> value, in decoder order.
///
/// Built from the primary image's TIFF and Exif directories. GPS and
/// interoperability directories reuse low codes, so they are left out.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: Vec<(u16, FieldValue)>,
}

impl MetadataTable {
    /// Build a table from explicit entries. The first entry for a code wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u16, FieldValue)>,
    {
        let mut table = Self::default();
        for (code, value) in entries {
            table.insert(code, value);
        }
        table
    }

    pub(crate) fn from_exif(exif: &Exif) -> Self {
        let mut table = Self::default();
        for field in exif.fields() {
            if field.ifd_num != exif::In::PRIMARY {
                continue;
            }
            if !matches!(field.tag.context(), Context::Tiff | Context::Exif) {
                continue;
            }
            let display = field.display_value().to_string();
            table.insert(field.tag.number(), FieldValue::from_exif(&field.value, display));
        }
        table
    }

    fn insert(&mut self, code: u16, value: FieldValue) {
        if self.get(code).is_none() {
            self.entries.push((code, value));
        }
    }

    pub fn get(&self, code: u16) -> Option<&FieldValue> {
        self.entries.iter().find(|(c, _)| *c == code).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &FieldValue)> {
        self.entries.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Locate the capture date/time value.
    ///
    /// Tries [`DATE_TIME_ORIGINAL`] first. If that is absent or empty, takes
    /// the first entry (in table order) whose code resolves to
    /// `DateTimeOriginal`, whatever its value.
    pub fn capture_value(&self) -> Option<&FieldValue> {
        self.capture_value_with(resolve_name)
    }

    /// [`capture_value`](Self::capture_value) with a caller-supplied
    /// name registry for the fallback scan.
    pub fn capture_value_with<F>(&self, resolve: F) -> Option<&FieldValue>
    where
        F: Fn(u16) -> Option<&'static str>,
    {
        if let Some(value) = self.get(DATE_TIME_ORIGINAL) {
            if !value.is_empty() {
                return Some(value);
            }
        }
        self.iter()
            .find(|(code, _)| resolve(*code) == Some(DATE_TIME_ORIGINAL_NAME))
            .map(|(_, value)| value)
    }
}

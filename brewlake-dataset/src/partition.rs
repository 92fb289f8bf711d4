//! Partition path segments.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Directory value used for null partition values.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

fn needs_escape(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '/' | '\\' | '%' | '=' | ':' | '#' | '?' | '*' | '"' | '<' | '>' | '|' | '\''
        )
}

/// Percent-encode the characters that cannot appear inside a path segment.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Inverse of [`escape_value`]. Malformed escapes are kept literally.
pub fn unescape_value(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

/// Split a `column=value` directory name into its column and decoded value.
///
/// Returns `None` for names that are not partition segments. The default
/// partition marker decodes to a null value.
pub fn parse_segment(segment: &str) -> Option<(String, Option<String>)> {
    let (column, raw) = segment.split_once('=')?;
    if column.is_empty() {
        return None;
    }
    let value = if raw == HIVE_DEFAULT_PARTITION {
        None
    } else {
        Some(unescape_value(raw))
    };
    Some((column.to_string(), value))
}

/// Encode one `column=value` segment.
pub fn format_segment(column: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{column}={}", escape_value(v)),
        None => format!("{column}={HIVE_DEFAULT_PARTITION}"),
    }
}

/// Ordered list of partition values below a dataset root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PartitionPath {
    segments: Vec<(String, Option<String>)>,
}

impl PartitionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.push(column, value.map(Into::into));
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.segments.push((column.into(), value));
    }

    pub fn segments(&self) -> &[(String, Option<String>)] {
        &self.segments
    }

    pub fn value(&self, column: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Directory for this partition below `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for (column, value) in &self.segments {
            path.push(format_segment(column, value.as_deref()));
        }
        path
    }

    /// Recover partition values from the directories of `file` below `root`.
    ///
    /// Directory names that are not `column=value` segments are skipped.
    pub fn from_file(root: &Path, file: &Path) -> Self {
        let mut out = Self::new();
        let Ok(relative) = file.strip_prefix(root) else {
            return out;
        };
        let Some(parent) = relative.parent() else {
            return out;
        };
        for component in parent.components() {
            let name = component.as_os_str().to_string_lossy();
            if let Some((column, value)) = parse_segment(&name) {
                out.push(column, value);
            }
        }
        out
    }
}

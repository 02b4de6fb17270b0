//! Object keys carried by upload notifications.

use std::path::{Component, Path, PathBuf};

use derive_more::{Deref, Display};

use crate::{Result, WorkerError};

/// A validated object key.
///
/// Dereferences to the key with wrapping `"` characters stripped, which is the
/// name the object is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display)]
#[display("{name}")]
pub struct ObjectKey {
    #[deref]
    name: String,
    raw: String,
}

impl ObjectKey {
    /// Parses a key from a raw notification payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let raw = std::str::from_utf8(payload)
            .map_err(|_| WorkerError::invalid_key("payload is not valid UTF-8"))?;
        Self::parse(raw)
    }

    /// Parses a key, stripping any wrapping quote characters.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim_matches('"');
        if name.is_empty() {
            return Err(WorkerError::invalid_key("key is empty"));
        }
        if name.contains('\0') {
            return Err(WorkerError::invalid_key("key contains a NUL byte"));
        }

        Ok(Self {
            name: name.to_owned(),
            raw: raw.to_owned(),
        })
    }

    /// Returns the stored object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key exactly as it appeared in the payload.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resolves the destination path of this object under `root`.
    ///
    /// With `keep_quotes` the file is named after the raw payload instead of the
    /// stripped key. Keys that are not made only of plain path segments are
    /// rejected, so the result never leaves `root`.
    pub fn destination(&self, root: &Path, keep_quotes: bool) -> Result<PathBuf> {
        let relative = Path::new(if keep_quotes { &self.raw } else { &self.name });

        let mut components = relative.components().peekable();
        if components.peek().is_none() {
            return Err(WorkerError::path_traversal(self.raw.as_str()));
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(WorkerError::path_traversal(self.raw.as_str()));
        }

        Ok(root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_wrapping_quotes() {
        let key = ObjectKey::from_payload(b"\"report-42.csv\"").unwrap();
        assert_eq!(key.name(), "report-42.csv");
        assert_eq!(key.raw(), "\"report-42.csv\"");
        assert_eq!(&*key, "report-42.csv");
        assert_eq!(key.to_string(), "report-42.csv");
    }

    #[test]
    fn test_unquoted_key_is_unchanged() {
        let key = ObjectKey::parse("missing.csv").unwrap();
        assert_eq!(key.name(), "missing.csv");
    }

    #[test]
    fn test_rejects_unusable_payloads() {
        assert!(ObjectKey::from_payload(&[0xff, 0xfe]).is_err());
        assert!(ObjectKey::parse("").is_err());
        assert!(ObjectKey::parse("\"\"").is_err());
        assert!(ObjectKey::parse("a\0b").is_err());
    }

    #[test]
    fn test_destination_joins_root() {
        let key = ObjectKey::parse("\"nested/report-42.csv\"").unwrap();
        let path = key.destination(Path::new("/data/out"), false).unwrap();
        assert_eq!(path, Path::new("/data/out/nested/report-42.csv"));
    }

    #[test]
    fn test_destination_keeps_quotes_when_asked() {
        let key = ObjectKey::parse("\"report-42.csv\"").unwrap();
        let path = key.destination(Path::new("/data/out"), true).unwrap();
        assert_eq!(path, Path::new("/data/out/\"report-42.csv\""));
    }

    #[test]
    fn test_destination_rejects_traversal() {
        let root = Path::new("/data/out");
        for raw in ["../../etc/passwd", "/etc/passwd", "a/../../b", "./a", "a/.."] {
            let key = ObjectKey::parse(raw).unwrap();
            let err = key.destination(root, false).unwrap_err();
            assert!(
                matches!(err, WorkerError::PathTraversal { .. }),
                "{raw} was not rejected"
            );
        }
    }
}

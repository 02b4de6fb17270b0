//! Result types for object store operations.

use async_nats::jetstream::object_store::{self, ObjectInfo};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

/// Outcome of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteOutcome {
    /// The object existed and was removed.
    Removed,
    /// The object was already absent or already marked deleted.
    AlreadyAbsent,
}

/// SHA-256 digest recorded by the object store for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectDigest([u8; 32]);

impl ObjectDigest {
    const PREFIX: &'static str = "SHA-256=";

    /// Parses the `SHA-256=<base64>` form used in object metadata.
    ///
    /// Returns `None` for missing, foreign, or malformed digests.
    pub fn parse(encoded: &str) -> Option<Self> {
        let value = encoded.strip_prefix(Self::PREFIX)?;
        let bytes = [URL_SAFE, URL_SAFE_NO_PAD, STANDARD]
            .iter()
            .find_map(|engine| engine.decode(value).ok())?;
        let digest: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(digest))
    }

    /// Returns the digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for ObjectDigest {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

/// Result of a get operation with streaming reader.
///
/// Provides access to the object content via an async reader
/// and metadata about the stored object.
pub struct GetResult {
    /// The async reader for streaming the object content.
    reader: object_store::Object,
    /// Object metadata including size and digest.
    info: ObjectInfo,
}

impl GetResult {
    /// Creates a new get result.
    pub(crate) fn new(reader: object_store::Object, info: ObjectInfo) -> Self {
        Self { reader, info }
    }

    /// Consumes self and returns the reader.
    #[inline]
    pub fn into_reader(self) -> object_store::Object {
        self.reader
    }

    /// Returns the recorded object size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.info.size as u64
    }

    /// Returns the recorded digest, if present and well formed.
    pub fn digest(&self) -> Option<ObjectDigest> {
        self.info.digest.as_deref().and_then(ObjectDigest::parse)
    }
}

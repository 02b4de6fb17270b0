//! Object retrieval into the destination tree.
//!
//! Content is streamed into an [`AtomicFile`] while being hashed, checked
//! against the recorded size and digest, and only then renamed into place.
//! A failed or timed out retrieval leaves neither the final file nor the
//! temporary sibling behind.

mod atomic_file;

use std::path::Path;
use std::time::Duration;

pub use atomic_file::AtomicFile;
use puller_nats::object::HashingReader;
use tokio::time::timeout;

use crate::{ObjectKey, ObjectSource, Result, TRACING_TARGET_RETRIEVE, WorkerError};

/// Per-retrieval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Time budget for the whole retrieval, including the final commit.
    pub fetch_timeout: Duration,
    /// Whether the recorded digest is checked when present.
    pub verify_digest: bool,
}

/// Fetches the object stored under `key` into `destination`.
///
/// Returns the number of bytes written once the file is durably in place.
pub async fn retrieve<S: ObjectSource>(
    source: &S,
    key: &ObjectKey,
    destination: &Path,
    options: &RetrieveOptions,
) -> Result<u64> {
    match timeout(options.fetch_timeout, fetch(source, key, destination, options)).await {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout {
            key: key.name().to_owned(),
            timeout: options.fetch_timeout,
        }),
    }
}

async fn fetch<S: ObjectSource>(
    source: &S,
    key: &ObjectKey,
    destination: &Path,
    options: &RetrieveOptions,
) -> Result<u64> {
    let object = source
        .open(key.name())
        .await
        .map_err(|e| WorkerError::fetch(key.name(), e))?;

    tracing::debug!(
        target: TRACING_TARGET_RETRIEVE,
        object_key = %key,
        size = object.size,
        destination = %destination.display(),
        "Retrieving object"
    );

    let mut file = AtomicFile::create(destination).await?;
    let mut reader = HashingReader::new(object.reader);
    let written = tokio::io::copy(&mut reader, file.writer())
        .await
        .map_err(|e| WorkerError::io(file.temp_path(), e))?;

    if written != object.size {
        return Err(WorkerError::integrity(
            key.name(),
            format!("expected {} bytes, received {}", object.size, written),
        ));
    }

    if options.verify_digest
        && let Some(expected) = object.digest
    {
        let actual = reader.finalize();
        if actual != expected {
            return Err(WorkerError::integrity(
                key.name(),
                format!(
                    "digest mismatch: expected {}, computed {}",
                    expected.to_hex(),
                    actual.to_hex()
                ),
            ));
        }
    }

    let path = file.commit().await?;

    tracing::info!(
        target: TRACING_TARGET_RETRIEVE,
        object_key = %key,
        bytes = written,
        path = %path.display(),
        "Object retrieved"
    );

    Ok(written)
}

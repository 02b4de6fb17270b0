//! Object store seam used by retrieval and cleanup.

use std::pin::Pin;

use async_trait::async_trait;
use puller_nats::object::{DeleteOutcome, ObjectDigest, ObjectStore};
use tokio::io::AsyncRead;

/// An object opened for streaming, with its recorded metadata.
pub struct FetchedObject {
    /// Object content.
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    /// Recorded size in bytes.
    pub size: u64,
    /// Recorded SHA-256 digest, if any.
    pub digest: Option<ObjectDigest>,
}

impl std::fmt::Debug for FetchedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedObject")
            .field("size", &self.size)
            .field("digest", &self.digest.map(|d| d.to_hex()))
            .finish_non_exhaustive()
    }
}

/// Where uploaded objects are read from and removed.
#[async_trait]
pub trait ObjectSource: Clone + Send + Sync + 'static {
    /// Opens the object stored under `key`; objects marked deleted are absent.
    async fn open(&self, key: &str) -> puller_nats::Result<FetchedObject>;

    /// Removes the object stored under `key`; removing an absent object is not an error.
    async fn remove(&self, key: &str) -> puller_nats::Result<DeleteOutcome>;
}

#[async_trait]
impl ObjectSource for ObjectStore {
    async fn open(&self, key: &str) -> puller_nats::Result<FetchedObject> {
        let object = self.get(key).await?;
        let size = object.size();
        let digest = object.digest();

        Ok(FetchedObject {
            reader: Box::pin(object.into_reader()),
            size,
            digest,
        })
    }

    async fn remove(&self, key: &str) -> puller_nats::Result<DeleteOutcome> {
        self.delete(key).await
    }
}

//! Upload bucket wrapper for NATS object storage.

use std::sync::Arc;

use async_nats::jetstream;
use async_nats::jetstream::context::ObjectStoreErrorKind;
use async_nats::jetstream::object_store::{
    self, DeleteError, DeleteErrorKind, GetErrorKind, InfoErrorKind, ObjectInfo,
};

use super::bucket_config::BucketConfig;
use super::object_data::{DeleteOutcome, GetResult};
use crate::{Error, Result, TRACING_TARGET_OBJECT};

/// Handle to the upload bucket.
///
/// Cheap to clone and safe to share between concurrent transfers.
#[derive(Clone)]
pub struct ObjectStore {
    inner: Arc<object_store::ObjectStore>,
    bucket: Arc<String>,
}

impl ObjectStore {
    /// Opens the bucket with the declared policies, creating it if it does not
    /// exist and updating it if it has drifted.
    pub(crate) async fn ensure(jetstream: &jetstream::Context, config: &BucketConfig) -> Result<Self> {
        let bucket = config.bucket.clone();

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            bucket = %bucket,
            "Initializing object store"
        );

        let store = match jetstream.get_object_store(&bucket).await {
            Ok(store) => {
                Self::apply_policies(jetstream, config).await?;
                tracing::debug!(
                    target: TRACING_TARGET_OBJECT,
                    bucket = %bucket,
                    "Retrieved existing object store"
                );
                store
            }
            Err(e) if matches!(e.kind(), ObjectStoreErrorKind::GetStore) => {
                tracing::info!(
                    target: TRACING_TARGET_OBJECT,
                    bucket = %bucket,
                    max_bytes = ?config.max_bytes,
                    replicas = config.replicas,
                    "Creating new object store"
                );

                jetstream
                    .create_object_store(config.store_config())
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            target: TRACING_TARGET_OBJECT,
                            bucket = %bucket,
                            error = %e,
                            "Failed to create object store"
                        );
                        Error::object_bucket(&bucket, e.to_string())
                    })?
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_OBJECT,
                    bucket = %bucket,
                    error = %e,
                    "Failed to get object store"
                );
                return Err(Error::object_bucket(&bucket, e.to_string()));
            }
        };

        Ok(Self {
            inner: Arc::new(store),
            bucket: Arc::new(bucket),
        })
    }

    /// Updates the stream backing an existing bucket when its limits, replicas,
    /// storage or compression differ from the declared ones.
    async fn apply_policies(jetstream: &jetstream::Context, config: &BucketConfig) -> Result<()> {
        let bucket = config.bucket.as_str();
        let stream = jetstream
            .get_stream(format!("OBJ_{bucket}"))
            .await
            .map_err(|e| Error::object_bucket(bucket, e.to_string()))?;

        let Some(updated) = config.reconcile(&stream.cached_info().config) else {
            return Ok(());
        };

        tracing::info!(
            target: TRACING_TARGET_OBJECT,
            bucket = %bucket,
            max_bytes = updated.max_bytes,
            replicas = updated.num_replicas,
            "Updating object store policies"
        );

        jetstream.update_stream(&updated).await.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET_OBJECT,
                bucket = %bucket,
                error = %e,
                "Failed to update object store policies"
            );
            Error::object_bucket(bucket, e.to_string())
        })?;
        Ok(())
    }

    /// Returns the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Gets object info without downloading the content.
    ///
    /// Returns `None` if the object has never existed or its metadata is gone.
    async fn info(&self, key: &str) -> Result<Option<ObjectInfo>> {
        match self.inner.info(key).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if matches!(e.kind(), InfoErrorKind::NotFound) => Ok(None),
            Err(e) => Err(Error::operation("info", e.to_string())),
        }
    }

    /// Opens an object for streaming.
    ///
    /// Absent objects yield [`Error::ObjectNotFound`]. Objects marked deleted
    /// yield [`Error::ObjectDeleted`]: the store purges their content together
    /// with the delete marker, so there is nothing left to read.
    pub async fn get(&self, key: &str) -> Result<GetResult> {
        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            key = %key,
            bucket = %self.bucket,
            "Getting object"
        );

        let Some(info) = self.info(key).await? else {
            return Err(Error::object_not_found(self.bucket.as_str(), key));
        };

        if info.deleted {
            tracing::debug!(
                target: TRACING_TARGET_OBJECT,
                key = %key,
                "Object is marked deleted, treating as absent"
            );
            return Err(Error::object_deleted(self.bucket.as_str(), key));
        }

        match self.inner.get(key).await {
            Ok(reader) => {
                tracing::debug!(
                    target: TRACING_TARGET_OBJECT,
                    key = %key,
                    size = info.size,
                    "Object stream opened"
                );
                Ok(GetResult::new(reader, info))
            }
            Err(e) if matches!(e.kind(), GetErrorKind::NotFound) => {
                Err(Error::object_not_found(self.bucket.as_str(), key))
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_OBJECT,
                    key = %key,
                    error = %e,
                    "Failed to get object"
                );
                Err(Error::operation("get", e.to_string()))
            }
        }
    }

    /// Deletes an object from the store.
    ///
    /// Deleting an absent or already deleted object is not an error.
    pub async fn delete(&self, key: &str) -> Result<DeleteOutcome> {
        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            key = %key,
            bucket = %self.bucket,
            "Deleting object"
        );

        match self.info(key).await? {
            Some(info) if !info.deleted => {}
            _ => return Ok(DeleteOutcome::AlreadyAbsent),
        }

        if let Err(e) = self.inner.delete(key).await {
            return delete_failure(key, e);
        }

        tracing::info!(
            target: TRACING_TARGET_OBJECT,
            key = %key,
            bucket = %self.bucket,
            "Object deleted"
        );
        Ok(DeleteOutcome::Removed)
    }
}

/// Maps a failed delete to its outcome; an object that vanished in between is
/// already absent.
fn delete_failure(key: &str, e: DeleteError) -> Result<DeleteOutcome> {
    if matches!(e.kind(), DeleteErrorKind::NotFound) {
        return Ok(DeleteOutcome::AlreadyAbsent);
    }

    tracing::error!(
        target: TRACING_TARGET_OBJECT,
        key = %key,
        error = %e,
        "Failed to delete object"
    );
    Err(Error::operation("delete", e.to_string()))
}

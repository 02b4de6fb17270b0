//! Object store bucket configuration.

use async_nats::jetstream::object_store;
use async_nats::jetstream::stream::{self, Compression, StorageType};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default number of bucket replicas.
pub const DEFAULT_REPLICAS: usize = 1;

/// Declared policies for the upload bucket.
///
/// The bucket is always file-backed with compression enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct BucketConfig {
    /// Name of the object store bucket holding uploaded files
    #[cfg_attr(feature = "config", arg(long = "bucket", env = "PULLER_BUCKET"))]
    pub bucket: String,

    /// Maximum total size of the bucket in bytes (unset for unlimited)
    #[cfg_attr(
        feature = "config",
        arg(long = "bucket-max-bytes", env = "PULLER_BUCKET_MAX_BYTES")
    )]
    pub max_bytes: Option<u64>,

    /// Number of bucket replicas
    #[cfg_attr(
        feature = "config",
        arg(long = "bucket-replicas", env = "PULLER_BUCKET_REPLICAS", default_value_t = DEFAULT_REPLICAS)
    )]
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

fn default_replicas() -> usize {
    DEFAULT_REPLICAS
}

impl BucketConfig {
    /// Creates a single-replica, unbounded bucket configuration.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            max_bytes: None,
            replicas: DEFAULT_REPLICAS,
        }
    }

    /// Set the maximum bucket size in bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Set the number of replicas.
    #[must_use]
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("Bucket name cannot be empty".to_string());
        }
        if !self
            .bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("Invalid bucket name: {}", self.bucket));
        }
        if !(1..=5).contains(&self.replicas) {
            return Err(format!(
                "Replica count {} is invalid. Must be between 1 and 5.",
                self.replicas
            ));
        }
        if self.max_bytes == Some(0) {
            return Err("Bucket max bytes must be positive when set".to_string());
        }
        Ok(())
    }

    pub(crate) fn store_config(&self) -> object_store::Config {
        object_store::Config {
            bucket: self.bucket.clone(),
            storage: StorageType::File,
            num_replicas: self.replicas,
            compression: true,
            max_bytes: self
                .max_bytes
                .map(|max| i64::try_from(max).unwrap_or(i64::MAX))
                .unwrap_or(-1),
            ..Default::default()
        }
    }

    /// Applies the declared policies to the configuration of an existing
    /// bucket stream.
    ///
    /// Returns `None` when the stream already matches, otherwise the updated
    /// configuration to send to the server. Storage type cannot be changed
    /// in place, so a mismatch there is left for the server to reject.
    pub(crate) fn reconcile(&self, existing: &stream::Config) -> Option<stream::Config> {
        let declared = self.store_config();
        let mut updated = existing.clone();
        updated.max_bytes = declared.max_bytes;
        updated.num_replicas = declared.num_replicas;
        updated.storage = declared.storage;
        updated.compression = Some(Compression::S2);

        (updated != *existing).then_some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = BucketConfig::new("uploads").store_config();
        assert_eq!(config.bucket, "uploads");
        assert_eq!(config.storage, StorageType::File);
        assert_eq!(config.num_replicas, 1);
        assert!(config.compression);
        assert_eq!(config.max_bytes, -1);
    }

    #[test]
    fn test_store_config_max_bytes() {
        let config = BucketConfig::new("uploads")
            .with_max_bytes(50 * 1024 * 1024 * 1024)
            .with_replicas(3)
            .store_config();
        assert_eq!(config.max_bytes, 50 * 1024 * 1024 * 1024);
        assert_eq!(config.num_replicas, 3);
    }

    fn existing_stream() -> stream::Config {
        stream::Config {
            name: "OBJ_uploads".to_string(),
            subjects: vec!["$O.uploads.C.>".to_string(), "$O.uploads.M.>".to_string()],
            max_bytes: -1,
            storage: StorageType::File,
            num_replicas: 1,
            compression: Some(Compression::S2),
            allow_rollup: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_reconcile_accepts_matching_bucket() {
        let config = BucketConfig::new("uploads");
        assert!(config.reconcile(&existing_stream()).is_none());
    }

    #[test]
    fn test_reconcile_applies_declared_limits() {
        let config = BucketConfig::new("uploads")
            .with_max_bytes(1024)
            .with_replicas(3);

        let updated = config.reconcile(&existing_stream()).unwrap();
        assert_eq!(updated.max_bytes, 1024);
        assert_eq!(updated.num_replicas, 3);
        assert_eq!(updated.name, "OBJ_uploads");
        assert_eq!(updated.subjects, existing_stream().subjects);
        assert!(updated.allow_rollup);
    }

    #[test]
    fn test_reconcile_restores_compression_and_storage() {
        let mut existing = existing_stream();
        existing.compression = None;
        existing.storage = StorageType::Memory;

        let updated = BucketConfig::new("uploads").reconcile(&existing).unwrap();
        assert_eq!(updated.compression, Some(Compression::S2));
        assert_eq!(updated.storage, StorageType::File);
    }

    #[test]
    fn test_validation() {
        assert!(BucketConfig::new("uploads").validate().is_ok());
        assert!(BucketConfig::new("").validate().is_err());
        assert!(BucketConfig::new("up.loads").validate().is_err());
        assert!(BucketConfig::new("uploads").with_replicas(0).validate().is_err());
        assert!(BucketConfig::new("uploads").with_max_bytes(0).validate().is_err());
    }
}

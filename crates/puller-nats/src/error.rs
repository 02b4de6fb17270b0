//! Error types and utilities for NATS operations.

use std::path::PathBuf;
use std::time::Duration;

/// Result type for all NATS operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for NATS operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS material could not be loaded or is malformed
    #[error("TLS material error for '{}': {reason}", path.display())]
    Tls { path: PathBuf, reason: String },

    /// JetStream is not enabled for the account or unreachable
    #[error("JetStream unavailable: {0}")]
    JetStreamUnavailable(String),

    /// Acknowledgement error
    #[error("Acknowledgement error: {0}")]
    Ack(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Stream operation failed
    #[error("Stream operation failed on '{stream}': {error}")]
    StreamError { stream: String, error: String },

    /// Consumer operation failed
    #[error("Consumer '{consumer}' error: {reason}")]
    ConsumerError { consumer: String, reason: String },

    /// Object store bucket could not be opened or created
    #[error("Object store bucket '{bucket}' error: {reason}")]
    ObjectBucket { bucket: String, reason: String },

    /// Object not found in store
    #[error("Object '{name}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, name: String },

    /// Object metadata is marked deleted; its content is already purged
    #[error("Object '{name}' in bucket '{bucket}' is marked deleted")]
    ObjectDeleted { bucket: String, name: String },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("NATS operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create a TLS material error
    pub fn tls(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Tls {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a stream error
    pub fn stream_error(stream: impl Into<String>, error: impl Into<String>) -> Self {
        Self::StreamError {
            stream: stream.into(),
            error: error.into(),
        }
    }

    /// Create a consumer error
    pub fn consumer_error(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConsumerError {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Create an object bucket error
    pub fn object_bucket(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ObjectBucket {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    /// Create an object not found error
    pub fn object_not_found(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Create an object deleted error
    pub fn object_deleted(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectDeleted {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Returns true if the error means the object is absent from the store.
    pub fn is_absent_object(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. } | Self::ObjectDeleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_object_classification() {
        assert!(Error::object_not_found("uploads", "a.csv").is_absent_object());
        assert!(Error::object_deleted("uploads", "a.csv").is_absent_object());
        assert!(!Error::timeout(Duration::from_secs(1)).is_absent_object());
        assert!(!Error::operation("get", "boom").is_absent_object());
    }

    #[test]
    fn test_tls_error_message() {
        let err = Error::tls("/etc/puller/ca.pem", "no certificates found");
        assert_eq!(
            err.to_string(),
            "TLS material error for '/etc/puller/ca.pem': no certificates found"
        );
    }
}

//! Worker error types.

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// How the broker should be told about a failed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Redeliver later with a delay.
    Transient,
    /// Never redeliver.
    Permanent,
}

/// Worker error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Notification payload is not a usable object key.
    #[error("invalid object key: {reason}")]
    InvalidKey { reason: Cow<'static, str> },

    /// Object key would resolve outside the destination root.
    #[error("object key '{key}' escapes the destination root")]
    PathTraversal { key: String },

    /// Object could not be read from the store.
    #[error("failed to fetch object '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: puller_nats::Error,
    },

    /// Downloaded content does not match the recorded object metadata.
    #[error("object '{key}' failed integrity check: {reason}")]
    Integrity { key: String, reason: String },

    /// Retrieval did not finish within its time budget.
    #[error("retrieval of '{key}' timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    /// Destination filesystem operation failed.
    #[error("filesystem error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The notification subscription failed.
    #[error("subscription failed: {0}")]
    Subscription(#[from] puller_nats::Error),

    /// The notification subscription ended without being asked to.
    #[error("subscription ended unexpectedly")]
    SubscriptionClosed,

    /// The worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Task(String),

    /// Worker configuration is invalid.
    #[error("invalid worker configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerError {
    /// Creates an invalid key error.
    pub fn invalid_key(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    /// Creates a path traversal error.
    pub fn path_traversal(key: impl Into<String>) -> Self {
        Self::PathTraversal { key: key.into() }
    }

    /// Creates a fetch error.
    pub fn fetch(key: impl Into<String>, source: puller_nats::Error) -> Self {
        Self::Fetch {
            key: key.into(),
            source,
        }
    }

    /// Creates an integrity error.
    pub fn integrity(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a filesystem error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns how a notification that failed with this error is settled.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidKey { .. } | Self::PathTraversal { .. } => FailureClass::Permanent,
            _ => FailureClass::Transient,
        }
    }

    /// Returns true if the error means the object is not in the store.
    pub fn is_absent_object(&self) -> bool {
        matches!(self, Self::Fetch { source, .. } if source.is_absent_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_errors_are_permanent() {
        assert_eq!(
            WorkerError::invalid_key("empty").class(),
            FailureClass::Permanent
        );
        assert_eq!(
            WorkerError::path_traversal("../etc/passwd").class(),
            FailureClass::Permanent
        );
    }

    #[test]
    fn test_retrieval_errors_are_transient() {
        let missing = WorkerError::fetch(
            "missing.csv",
            puller_nats::Error::object_not_found("uploads", "missing.csv"),
        );
        assert_eq!(missing.class(), FailureClass::Transient);
        assert!(missing.is_absent_object());

        let timeout = WorkerError::Timeout {
            key: "big.bin".into(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(timeout.class(), FailureClass::Transient);
        assert_eq!(
            WorkerError::integrity("a.csv", "size mismatch").class(),
            FailureClass::Transient
        );
    }
}

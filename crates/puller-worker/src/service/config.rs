//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::retrieve::RetrieveOptions;

/// Default maximum concurrent transfers.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 4;

/// Default retrieval time budget in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 270;

/// Default delay before a failed notification is redelivered, in seconds.
pub const DEFAULT_REDELIVERY_DELAY_SECS: u64 = 30;

/// Default deadline for ack, nak, and term signals, in seconds.
pub const DEFAULT_ACK_TIMEOUT_SECS: u64 = 10;

/// Default deadline for deleting a transferred object, in seconds.
pub const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 30;

/// Transfer behavior of the upload worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// Directory retrieved objects are written under.
    #[cfg_attr(feature = "config", arg(long, env = "PULLER_DESTINATION"))]
    pub destination: PathBuf,

    /// Maximum number of objects transferred at the same time.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PULLER_MAX_CONCURRENT_TRANSFERS",
            default_value_t = DEFAULT_MAX_CONCURRENT_TRANSFERS
        )
    )]
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,

    /// Time budget for a single retrieval, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PULLER_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)
    )]
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Delay before a failed notification is redelivered, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PULLER_REDELIVERY_DELAY_SECS",
            default_value_t = DEFAULT_REDELIVERY_DELAY_SECS
        )
    )]
    #[serde(default = "default_redelivery_delay_secs")]
    pub redelivery_delay_secs: u64,

    /// Deadline for acknowledgement signals, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PULLER_ACK_TIMEOUT_SECS", default_value_t = DEFAULT_ACK_TIMEOUT_SECS)
    )]
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,

    /// Deadline for deleting a transferred object, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PULLER_DELETE_TIMEOUT_SECS", default_value_t = DEFAULT_DELETE_TIMEOUT_SECS)
    )]
    #[serde(default = "default_delete_timeout_secs")]
    pub delete_timeout_secs: u64,

    /// Name destination files after the raw payload, quotes included.
    #[cfg_attr(feature = "config", arg(long, env = "PULLER_KEEP_DESTINATION_QUOTES"))]
    #[serde(default)]
    pub keep_destination_quotes: bool,

    /// Check downloaded content against the recorded SHA-256 digest.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PULLER_VERIFY_DIGEST",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default = "default_verify_digest")]
    pub verify_digest: bool,
}

fn default_max_concurrent_transfers() -> usize {
    DEFAULT_MAX_CONCURRENT_TRANSFERS
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_redelivery_delay_secs() -> u64 {
    DEFAULT_REDELIVERY_DELAY_SECS
}

fn default_ack_timeout_secs() -> u64 {
    DEFAULT_ACK_TIMEOUT_SECS
}

fn default_delete_timeout_secs() -> u64 {
    DEFAULT_DELETE_TIMEOUT_SECS
}

fn default_verify_digest() -> bool {
    true
}

impl WorkerConfig {
    /// Creates a configuration with default transfer behavior.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            max_concurrent_transfers: DEFAULT_MAX_CONCURRENT_TRANSFERS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            redelivery_delay_secs: DEFAULT_REDELIVERY_DELAY_SECS,
            ack_timeout_secs: DEFAULT_ACK_TIMEOUT_SECS,
            delete_timeout_secs: DEFAULT_DELETE_TIMEOUT_SECS,
            keep_destination_quotes: false,
            verify_digest: true,
        }
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrent_transfers(mut self, max_concurrent_transfers: usize) -> Self {
        self.max_concurrent_transfers = max_concurrent_transfers;
        self
    }

    /// Sets the retrieval time budget.
    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Sets the redelivery delay.
    pub fn with_redelivery_delay_secs(mut self, secs: u64) -> Self {
        self.redelivery_delay_secs = secs;
        self
    }

    /// Sets whether destination files keep the payload quotes.
    pub fn with_keep_destination_quotes(mut self, keep: bool) -> Self {
        self.keep_destination_quotes = keep;
        self
    }

    /// Sets whether digests are verified.
    pub fn with_verify_digest(mut self, verify: bool) -> Self {
        self.verify_digest = verify;
        self
    }

    /// Returns the retrieval time budget.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Returns the redelivery delay.
    pub fn redelivery_delay(&self) -> Duration {
        Duration::from_secs(self.redelivery_delay_secs)
    }

    /// Returns the acknowledgement signal deadline.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Returns the delete deadline.
    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    /// Returns the per-retrieval policy.
    pub fn retrieve_options(&self) -> RetrieveOptions {
        RetrieveOptions {
            fetch_timeout: self.fetch_timeout(),
            verify_digest: self.verify_digest,
        }
    }

    /// Validates the configuration against the consumer ack wait.
    ///
    /// A retrieval must always finish before the broker considers the
    /// notification lost and redelivers it.
    pub fn validate(&self, ack_wait: Duration) -> Result<(), String> {
        if self.destination.as_os_str().is_empty() {
            return Err("destination cannot be empty".to_string());
        }
        if self.max_concurrent_transfers == 0 {
            return Err("max concurrent transfers must be at least 1".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch timeout must be greater than zero".to_string());
        }
        if self.redelivery_delay_secs == 0 {
            return Err("redelivery delay must be greater than zero".to_string());
        }
        if self.ack_timeout_secs == 0 || self.delete_timeout_secs == 0 {
            return Err("ack and delete timeouts must be greater than zero".to_string());
        }
        if self.fetch_timeout() >= ack_wait {
            return Err(format!(
                "fetch timeout ({}s) must be shorter than the consumer ack wait ({}s)",
                self.fetch_timeout_secs,
                ack_wait.as_secs()
            ));
        }
        Ok(())
    }
}

//! Process lifecycle configuration.

use std::time::Duration;

use anyhow::{Result as AnyhowResult, anyhow};
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default time to wait for in-flight transfers after a shutdown signal, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 330;

/// Process lifecycle and log output configuration.
///
/// # Environment Variables
///
/// - `PULLER_SHUTDOWN_TIMEOUT_SECS` - Drain timeout after a shutdown signal (default: 330)
/// - `PULLER_LOG_JSON` - Emit logs as JSON lines (default: false)
/// - `RUST_LOG` - Log filter (default: info)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct RuntimeConfig {
    /// Maximum time in seconds to wait for in-flight transfers after a shutdown signal.
    ///
    /// Should exceed the fetch timeout so a running transfer can finish its
    /// full sequence before the process exits.
    #[arg(long, env = "PULLER_SHUTDOWN_TIMEOUT_SECS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, env = "PULLER_LOG_JSON")]
    #[serde(default)]
    pub log_json: bool,
}

impl RuntimeConfig {
    /// Validates the configuration against the fetch timeout.
    pub fn validate(&self, fetch_timeout: Duration) -> AnyhowResult<()> {
        if self.shutdown_timeout_secs == 0 {
            return Err(anyhow!("Shutdown timeout must be greater than zero"));
        }

        if self.shutdown_timeout() <= fetch_timeout {
            tracing::warn!(
                target: crate::TRACING_TARGET_CONFIG,
                shutdown_timeout_secs = self.shutdown_timeout_secs,
                fetch_timeout_secs = fetch_timeout.as_secs(),
                "Shutdown timeout does not exceed the fetch timeout, in-flight transfers may be cut short"
            );
        }

        Ok(())
    }

    /// Returns the shutdown drain timeout as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

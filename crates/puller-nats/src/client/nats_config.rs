//! NATS connection configuration.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Configuration for mutually authenticated NATS connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// NATS server URL (comma-separated for clustering)
    #[cfg_attr(feature = "config", arg(long = "nats-url", env = "NATS_URL"))]
    pub nats_url: String,

    /// Path to the PEM bundle of CA certificates used to verify the server
    #[cfg_attr(feature = "config", arg(long = "nats-ca", env = "NATS_CA"))]
    pub nats_ca: PathBuf,

    /// Path to the PEM-encoded client private key
    #[cfg_attr(feature = "config", arg(long = "nats-key", env = "NATS_KEY"))]
    pub nats_key: PathBuf,

    /// Path to the PEM-encoded client certificate chain
    #[cfg_attr(feature = "config", arg(long = "nats-cert", env = "NATS_CERT"))]
    pub nats_cert: PathBuf,

    /// Client connection name for debugging and monitoring
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// Connection timeout in seconds (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout", env = "NATS_CONNECT_TIMEOUT_SECS")
    )]
    pub nats_connect_timeout: Option<u64>,

    /// Maximum number of reconnection attempts (0 = unlimited)
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-max-reconnects", env = "NATS_MAX_RECONNECTS")
    )]
    pub nats_max_reconnects: Option<usize>,
}

// Default values
const DEFAULT_NAME: &str = "puller";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RECONNECTS: usize = 10;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 2;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

impl NatsConfig {
    /// Create a new configuration with a server URL and the three mTLS files.
    pub fn new(
        server_url: impl Into<String>,
        ca: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
    ) -> Self {
        Self {
            nats_url: server_url.into(),
            nats_ca: ca.into(),
            nats_key: key.into(),
            nats_cert: cert.into(),
            nats_client_name: None,
            nats_connect_timeout: None,
            nats_max_reconnects: None,
        }
    }

    /// Returns the client name, using the default if not set.
    #[inline]
    pub fn name(&self) -> &str {
        self.nats_client_name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Returns the server URLs as a vector (splits comma-separated URLs).
    pub fn servers(&self) -> Vec<&str> {
        self.nats_url.split(',').map(str::trim).collect()
    }

    /// Returns the connection timeout, falling back to the default.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.nats_connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Returns the reconnect delay as a Duration.
    #[inline]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS)
    }

    /// Returns the ping interval as a Duration.
    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)
    }

    /// Returns the max reconnects as Option (0 means unlimited).
    #[inline]
    pub fn max_reconnects_option(&self) -> Option<usize> {
        let max = self.nats_max_reconnects.unwrap_or(DEFAULT_MAX_RECONNECTS);
        if max == 0 { None } else { Some(max) }
    }

    /// Set the client connection name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = Some(name.into());
        self
    }

    /// Set the connection timeout in seconds.
    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.nats_connect_timeout = Some(secs);
        self
    }

    /// Set maximum reconnection attempts (0 for unlimited).
    #[must_use]
    pub fn with_max_reconnects(mut self, max_reconnects: usize) -> Self {
        self.nats_max_reconnects = Some(max_reconnects);
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        let servers = self.servers();

        for server in servers {
            if server.is_empty() {
                return Err("Server URL cannot be empty".to_string());
            }
            if !(server.starts_with("nats://") || server.starts_with("tls://")) {
                return Err(format!("Invalid server URL format: {}", server));
            }
        }

        let files = [
            ("CA bundle", &self.nats_ca),
            ("client key", &self.nats_key),
            ("client certificate", &self.nats_cert),
        ];
        for (label, path) in files {
            if path.as_os_str().is_empty() {
                return Err(format!("Path to the {} cannot be empty", label));
            }
        }

        if self.nats_connect_timeout == Some(0) {
            return Err("Connection timeout must be at least one second".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NatsConfig {
        NatsConfig::new(
            "tls://localhost:4222",
            "/etc/puller/ca.pem",
            "/etc/puller/client.key",
            "/etc/puller/client.pem",
        )
    }

    #[test]
    fn test_new_config() {
        let config = config();
        assert_eq!(config.servers(), vec!["tls://localhost:4222"]);
        assert_eq!(config.name(), "puller");
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_reconnects_option(), Some(10));
    }

    #[test]
    fn test_config_builder() {
        let config = config()
            .with_name("puller-eu-1")
            .with_connect_timeout_secs(5)
            .with_max_reconnects(0);

        assert_eq!(config.name(), "puller-eu-1");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_reconnects_option(), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut empty_url = config();
        empty_url.nats_url = String::new();
        assert!(empty_url.validate().is_err());

        let mut http_url = config();
        http_url.nats_url = "http://localhost:4222".to_string();
        assert!(http_url.validate().is_err());

        let mut no_ca = config();
        no_ca.nats_ca = PathBuf::new();
        assert!(no_ca.validate().is_err());

        let zero_timeout = config().with_connect_timeout_secs(0);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_multiple_servers() {
        let mut config = config();
        config.nats_url = "nats://a:4222, nats://b:4222".to_string();
        assert_eq!(config.servers(), vec!["nats://a:4222", "nats://b:4222"]);
        assert!(config.validate().is_ok());
    }
}

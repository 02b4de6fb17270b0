//! Startup error types and process exit codes.

use puller_worker::WorkerError;
use thiserror::Error;

/// Result type for startup stages.
pub type StartupResult<T> = std::result::Result<T, StartupError>;

/// Failure of one startup stage, or of the subscription once running.
///
/// Every variant maps to its own process exit code so supervisors can tell
/// the failing stage apart without parsing logs.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    #[error("Invalid configuration: {0:#}")]
    Config(anyhow::Error),

    /// Connecting to the broker failed.
    #[error("Failed to connect to NATS: {0}")]
    Connect(#[source] puller_nats::Error),

    /// JetStream is not available on the connection.
    #[error("JetStream context unavailable: {0}")]
    JetStream(#[source] puller_nats::Error),

    /// The upload stream could not be created or opened.
    #[error("Failed to provision stream: {0}")]
    Stream(#[source] puller_nats::Error),

    /// The durable consumer could not be created or updated.
    #[error("Failed to provision consumer: {0}")]
    Consumer(#[source] puller_nats::Error),

    /// The object store bucket could not be created or opened.
    #[error("Failed to provision object store: {0}")]
    ObjectStore(#[source] puller_nats::Error),

    /// TLS material could not be loaded.
    #[error("Failed to load TLS material: {0}")]
    Tls(#[source] puller_nats::Error),

    /// The subscription failed and was drained.
    #[error("Subscription failed: {0}")]
    Subscription(#[source] WorkerError),
}

impl StartupError {
    /// Exit code for configuration failures, also used before tracing is initialized.
    pub const CONFIG_EXIT_CODE: i32 = 1;

    /// Returns the process exit code for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => Self::CONFIG_EXIT_CODE,
            Self::Connect(_) => 2,
            Self::JetStream(_) => 3,
            Self::Stream(_) => 4,
            Self::Consumer(_) => 5,
            Self::ObjectStore(_) => 6,
            Self::Tls(_) => 7,
            Self::Subscription(_) => 8,
        }
    }

    /// Returns the name of the failing stage.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Connect(_) => "connect",
            Self::JetStream(_) => "jetstream",
            Self::Stream(_) => "stream",
            Self::Consumer(_) => "consumer",
            Self::ObjectStore(_) => "object_store",
            Self::Tls(_) => "tls",
            Self::Subscription(_) => "subscription",
        }
    }

    /// Provides a human-readable suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check the required NATS_* and PULLER_* settings"),
            Self::Tls(_) => Some("Check that the CA, key, and certificate files exist and are PEM encoded"),
            Self::Connect(_) => Some("Check that the NATS URL is reachable and accepts the client certificate"),
            Self::JetStream(_) => Some("Check that JetStream is enabled for the account"),
            _ => None,
        }
    }
}

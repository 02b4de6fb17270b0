//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── nats: NatsConfig            # Broker URL, mTLS material, reconnects
//! ├── stream: UploadStreamConfig  # Stream, topic base, durable consumer
//! ├── bucket: BucketConfig        # Object store bucket and limits
//! ├── worker: WorkerConfig        # Destination and transfer behavior
//! └── runtime: RuntimeConfig      # Shutdown and log output
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! NATS_URL=tls://nats:4222 NATS_CA=ca.pem NATS_KEY=client.key NATS_CERT=client.pem \
//! PULLER_STREAM=UPLOADS PULLER_TOPICBASE=files PULLER_CONSUMER=puller \
//! PULLER_DESTINATION=/data/out PULLER_BUCKET=uploads puller
//! ```

mod runtime;

use std::process;

use anyhow::{Context, anyhow};
use clap::Parser;
use puller_nats::NatsConfig;
use puller_nats::object::BucketConfig;
use puller_nats::stream::UploadStreamConfig;
use puller_worker::WorkerConfig;
pub use runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "puller")]
#[command(about = "Retrieves uploaded objects announced on NATS JetStream")]
#[command(version)]
pub struct Cli {
    /// NATS connection and mutual TLS configuration.
    #[clap(flatten)]
    pub nats: NatsConfig,

    /// Upload stream and durable consumer configuration.
    #[clap(flatten)]
    pub stream: UploadStreamConfig,

    /// Object store bucket configuration.
    #[clap(flatten)]
    pub bucket: BucketConfig,

    /// Destination and transfer behavior.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// Process lifecycle and log output.
    #[clap(flatten)]
    pub runtime: RuntimeConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// This is the preferred way to initialize the CLI configuration as it ensures
    /// .env files are loaded before clap parses arguments, allowing environment
    /// variables from .env to be used as defaults.
    pub fn init() -> Result<Self, clap::Error> {
        Self::load_dotenv();
        Self::try_parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.nats
            .validate()
            .map_err(|e| anyhow!(e))
            .context("invalid NATS configuration")?;
        self.stream
            .validate()
            .map_err(|e| anyhow!(e))
            .context("invalid stream configuration")?;
        self.bucket
            .validate()
            .map_err(|e| anyhow!(e))
            .context("invalid bucket configuration")?;
        self.worker
            .validate(self.stream.ack_wait())
            .map_err(|e| anyhow!(e))
            .context("invalid worker configuration")?;
        self.runtime
            .validate(self.worker.fetch_timeout())
            .context("invalid runtime configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            servers = ?self.nats.servers(),
            client_name = self.nats.name(),
            connect_timeout_secs = self.nats.connect_timeout().as_secs(),
            max_reconnects = ?self.nats.max_reconnects_option(),
            "NATS configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            stream = %self.stream.stream_name,
            filter_subject = %self.stream.filter_subject(),
            consumer = %self.stream.consumer_name,
            ack_wait_secs = self.stream.ack_wait_secs,
            bucket = %self.bucket.bucket,
            bucket_max_bytes = ?self.bucket.max_bytes,
            bucket_replicas = self.bucket.replicas,
            "Topology configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            destination = %self.worker.destination.display(),
            max_concurrent_transfers = self.worker.max_concurrent_transfers,
            fetch_timeout_secs = self.worker.fetch_timeout_secs,
            redelivery_delay_secs = self.worker.redelivery_delay_secs,
            keep_destination_quotes = self.worker.keep_destination_quotes,
            verify_digest = self.worker.verify_digest,
            shutdown_timeout_secs = self.runtime.shutdown_timeout_secs,
            "Worker configuration"
        );
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

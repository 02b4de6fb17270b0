//! NATS client wrapper and connection management.
//!
//! The `NatsClient` wraps the `async-nats` client, which multiplexes every
//! operation over a single TCP connection. Cloning is cheap (an `Arc` clone)
//! and clones may be used concurrently from any number of tasks, which is how
//! the transfer workers share the session and the object store handle.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, jetstream};
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use super::tls::TlsMaterial;
use crate::object::{BucketConfig, ObjectStore};
use crate::stream::{UploadStream, UploadStreamConfig};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// Deadline applied to JetStream management requests made by the client.
const MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// NATS client wrapper with connection management.
///
/// This wrapper is cheaply cloneable and thread-safe.
/// Multiple clones share the same underlying TCP connection via multiplexing.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

/// Inner data for NATS client
#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Connects to NATS over mutually authenticated TLS.
    #[tracing::instrument(skip(config, tls), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: &NatsConfig, tls: &TlsMaterial) -> Result<Self> {
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = ?config.servers(),
            client_name = config.name(),
            "Connecting to NATS"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(config.name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout())
            .require_tls(true)
            .add_root_certificates(tls.ca().to_path_buf())
            .add_client_certificate(tls.cert().to_path_buf(), tls.key().to_path_buf())
            .event_callback(|event| async move {
                tracing::info!(
                    target: TRACING_TARGET_CONNECTION,
                    event = %event,
                    "NATS connection event"
                );
            });

        // Set reconnection options
        if let Some(max_reconnects) = config.max_reconnects_option() {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }
        let reconnect_delay_ms = config.reconnect_delay().as_millis().min(u64::MAX as u128) as u64;
        connect_opts = connect_opts.reconnect_delay_callback(move |attempts| {
            Duration::from_millis(std::cmp::min(
                reconnect_delay_ms * 2_u64.pow(attempts.min(32) as u32),
                30_000, // Max 30 seconds
            ))
        });

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            max_payload = server_info.max_payload,
            "Successfully connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
            }),
        })
    }

    /// Confirms that JetStream is enabled for this account.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn verify_jetstream(&self) -> Result<()> {
        let account = timeout(MANAGEMENT_TIMEOUT, self.inner.jetstream.query_account())
            .await
            .map_err(|_| Error::timeout(MANAGEMENT_TIMEOUT))?
            .map_err(|e| Error::JetStreamUnavailable(e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            streams = account.streams,
            consumers = account.consumers,
            "JetStream available"
        );
        Ok(())
    }

    /// Drains the connection, flushing pending acknowledgements before closing.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn drain(&self) -> Result<()> {
        timeout(MANAGEMENT_TIMEOUT, self.inner.client.drain())
            .await
            .map_err(|_| Error::timeout(MANAGEMENT_TIMEOUT))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        tracing::info!(target: TRACING_TARGET_CONNECTION, "NATS connection drained");
        Ok(())
    }
}

// Topology getters
impl NatsClient {
    /// Ensures the upload stream exists and returns a handle to it.
    #[tracing::instrument(skip(self, config), target = TRACING_TARGET_CLIENT)]
    pub async fn upload_stream(&self, config: &UploadStreamConfig) -> Result<UploadStream> {
        timeout(
            MANAGEMENT_TIMEOUT,
            UploadStream::ensure(&self.inner.jetstream, config),
        )
        .await
        .map_err(|_| Error::timeout(MANAGEMENT_TIMEOUT))?
    }

    /// Ensures the object store bucket exists and returns a handle to it.
    #[tracing::instrument(skip(self, config), target = TRACING_TARGET_CLIENT)]
    pub async fn object_store(&self, config: &BucketConfig) -> Result<ObjectStore> {
        timeout(
            MANAGEMENT_TIMEOUT,
            ObjectStore::ensure(&self.inner.jetstream, config),
        )
        .await
        .map_err(|_| Error::timeout(MANAGEMENT_TIMEOUT))?
    }
}

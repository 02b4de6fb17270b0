//! Startup stages and the consumption session.
//!
//! Each stage fails fast with its own [`StartupError`] variant, and therefore
//! its own exit code. Once every stage has succeeded the worker runs until a
//! shutdown signal or a subscription failure, and the connection is drained
//! before returning.

mod error;
mod shutdown;

use std::time::Instant;

pub use error::{StartupError, StartupResult};
use puller_nats::{NatsClient, TlsMaterial};
use puller_worker::{Worker, WorkerState};
use shutdown::shutdown_signal;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;
use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};

/// Provisions the broker topology and runs the worker until shutdown.
pub async fn run(cli: Cli) -> StartupResult<()> {
    let start_time = Instant::now();

    let tls = TlsMaterial::load(&cli.nats.nats_ca, &cli.nats.nats_key, &cli.nats.nats_cert)
        .await
        .map_err(StartupError::Tls)?;

    let client = NatsClient::connect(&cli.nats, &tls)
        .await
        .map_err(StartupError::Connect)?;

    client
        .verify_jetstream()
        .await
        .map_err(StartupError::JetStream)?;

    let stream = client
        .upload_stream(&cli.stream)
        .await
        .map_err(StartupError::Stream)?;

    let subscriber = stream.subscriber().await.map_err(StartupError::Consumer)?;

    let store = client
        .object_store(&cli.bucket)
        .await
        .map_err(StartupError::ObjectStore)?;

    let messages = subscriber
        .messages(cli.worker.max_concurrent_transfers)
        .await
        .map_err(|e| StartupError::Subscription(e.into()))?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        stream = %cli.stream.stream_name,
        consumer = %cli.stream.consumer_name,
        bucket = store.bucket(),
        startup_ms = start_time.elapsed().as_millis() as u64,
        "Topology ready, consuming upload notifications"
    );

    let state = WorkerState::new(store, cli.worker.clone());
    let handle = Worker::new(state, CancellationToken::new()).spawn(Box::pin(messages));

    let result = handle
        .run_until(shutdown_signal(), cli.runtime.shutdown_timeout())
        .await;

    if let Err(e) = client.drain().await {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %e,
            "Failed to drain NATS connection"
        );
    }

    match result {
        Ok(drained) => {
            tracing::info!(
                target: TRACING_TARGET_SHUTDOWN,
                drained,
                uptime_secs = start_time.elapsed().as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(e) => Err(StartupError::Subscription(e)),
    }
}

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, TLS material loading, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "puller_nats::client";

/// Tracing target for NATS object store operations.
///
/// Use this target for logging bucket provisioning, object reads, and object deletions.
pub const TRACING_TARGET_OBJECT: &str = "puller_nats::object";

/// Tracing target for NATS JetStream operations.
///
/// Use this target for logging stream and consumer provisioning and message acknowledgements.
pub const TRACING_TARGET_STREAM: &str = "puller_nats::stream";

/// Tracing target for NATS connection operations.
///
/// Use this target for logging connection establishment, reconnection, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "puller_nats::connection";

mod client;
mod error;
pub mod object;
pub mod stream;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use client::{NatsClient, NatsConfig, TlsMaterial};
pub use error::{Error, Result};

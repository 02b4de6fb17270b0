//! NATS client, connection configuration, and mutual TLS material.

mod nats_client;
mod nats_config;
mod tls;

pub use nats_client::NatsClient;
pub use nats_config::NatsConfig;
pub use tls::TlsMaterial;

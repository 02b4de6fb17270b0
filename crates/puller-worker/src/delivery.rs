//! Acknowledgement seam between the consumer loop and the broker.

use std::time::Duration;

use async_trait::async_trait;
use puller_nats::stream::{DeliveryInfo, UploadMessage};

/// A received upload notification awaiting exactly one terminal signal.
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Returns the raw payload.
    fn payload(&self) -> &[u8];

    /// Returns the broker delivery metadata.
    fn info(&self) -> &DeliveryInfo;

    /// Acknowledges the notification and waits for the broker to confirm it.
    async fn ack(&self, deadline: Duration) -> puller_nats::Result<()>;

    /// Asks the broker to redeliver the notification after `delay`.
    async fn nak(&self, delay: Duration, deadline: Duration) -> puller_nats::Result<()>;

    /// Tells the broker never to redeliver the notification.
    async fn term(&self, deadline: Duration) -> puller_nats::Result<()>;
}

#[async_trait]
impl Delivery for UploadMessage {
    fn payload(&self) -> &[u8] {
        UploadMessage::payload(self)
    }

    fn info(&self) -> &DeliveryInfo {
        UploadMessage::info(self)
    }

    async fn ack(&self, deadline: Duration) -> puller_nats::Result<()> {
        UploadMessage::ack(self, deadline).await
    }

    async fn nak(&self, delay: Duration, deadline: Duration) -> puller_nats::Result<()> {
        UploadMessage::nak(self, delay, deadline).await
    }

    async fn term(&self, deadline: Duration) -> puller_nats::Result<()> {
        UploadMessage::term(self, deadline).await
    }
}

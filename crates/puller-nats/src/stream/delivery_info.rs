//! Broker-assigned delivery metadata.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Delivery metadata attached to a notification by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    /// Number of times this notification has been delivered, starting at 1.
    pub delivered: u64,
    /// Sequence of the notification in the stream.
    pub stream_sequence: u64,
    /// Notifications still pending for the consumer at delivery time.
    pub pending: u64,
    /// When the notification was published, if known.
    pub published: Option<Timestamp>,
    /// When this process received the notification.
    pub received_at: Timestamp,
    /// When the broker will redeliver unless a terminal signal is received.
    pub redelivery_deadline: Option<Timestamp>,
}

impl DeliveryInfo {
    /// Creates delivery metadata received now, with the deadline derived from `ack_wait`.
    pub fn new(delivered: u64, stream_sequence: u64, ack_wait: Duration) -> Self {
        let received_at = Timestamp::now();
        Self {
            delivered,
            stream_sequence,
            pending: 0,
            published: None,
            received_at,
            redelivery_deadline: received_at.checked_add(ack_wait).ok(),
        }
    }

    /// Sets the publish time.
    #[must_use]
    pub fn with_published(mut self, published: Option<Timestamp>) -> Self {
        self.published = published;
        self
    }

    /// Sets the pending count.
    #[must_use]
    pub fn with_pending(mut self, pending: u64) -> Self {
        self.pending = pending;
        self
    }

    /// Returns true if the broker has delivered this notification before.
    #[inline]
    pub fn is_redelivery(&self) -> bool {
        self.delivered > 1
    }
}

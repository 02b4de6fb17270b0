//! A single upload notification and its acknowledgement signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_nats::jetstream::{self, AckKind};
use jiff::Timestamp;
use tokio::time::timeout;

use super::delivery_info::DeliveryInfo;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// One upload notification received from the durable consumer.
///
/// Exactly one terminal signal (ack, nak, or term) is sent per message. Once a
/// signal has been attempted every further signal is refused, so a failed
/// acknowledgement is never followed by a second one.
#[derive(Debug)]
pub struct UploadMessage {
    message: jetstream::Message,
    info: DeliveryInfo,
    settlement: Settlement,
}

impl UploadMessage {
    pub(crate) fn new(message: jetstream::Message, ack_wait: Duration) -> Self {
        let info = match message.info() {
            Ok(meta) => DeliveryInfo::new(
                u64::try_from(meta.delivered).unwrap_or(1),
                meta.stream_sequence,
                ack_wait,
            )
            .with_pending(meta.pending)
            .with_published(Timestamp::from_nanosecond(meta.published.unix_timestamp_nanos()).ok()),
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET_STREAM,
                    subject = %message.subject,
                    error = %e,
                    "Notification carries no delivery metadata"
                );
                DeliveryInfo::new(1, 0, ack_wait)
            }
        };

        Self {
            message,
            info,
            settlement: Settlement::default(),
        }
    }

    /// Returns the raw payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    /// Returns the broker delivery metadata.
    #[inline]
    pub fn info(&self) -> &DeliveryInfo {
        &self.info
    }

    /// Acknowledges the notification and waits for the broker to confirm it.
    pub async fn ack(&self, deadline: Duration) -> Result<()> {
        self.settlement.claim("ack")?;
        timeout(deadline, self.message.double_ack())
            .await
            .map_err(|_| Error::timeout(deadline))?
            .map_err(|e| Error::Ack(e.to_string()))
    }

    /// Negatively acknowledges the notification, asking for redelivery after `delay`.
    pub async fn nak(&self, delay: Duration, deadline: Duration) -> Result<()> {
        self.settlement.claim("nak")?;
        timeout(deadline, self.message.ack_with(AckKind::Nak(Some(delay))))
            .await
            .map_err(|_| Error::timeout(deadline))?
            .map_err(|e| Error::Ack(e.to_string()))
    }

    /// Terminates the notification; the broker will not redeliver it.
    pub async fn term(&self, deadline: Duration) -> Result<()> {
        self.settlement.claim("term")?;
        timeout(deadline, self.message.ack_with(AckKind::Term))
            .await
            .map_err(|_| Error::timeout(deadline))?
            .map_err(|e| Error::Ack(e.to_string()))
    }
}

/// Admits the first terminal signal of a notification and refuses the rest.
///
/// The signal is claimed before it is sent, so a signal that failed in
/// transit still counts.
#[derive(Debug, Default)]
struct Settlement {
    settled: AtomicBool,
}

impl Settlement {
    fn claim(&self, signal: &str) -> Result<()> {
        if self.settled.swap(true, Ordering::AcqRel) {
            return Err(Error::Ack(format!(
                "notification already settled, refusing {}",
                signal
            )));
        }
        Ok(())
    }
}

//! Durable pull consumer for upload notifications.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_nats::jetstream::consumer::{PullConsumer, pull};
use futures::Stream;
use pin_project_lite::pin_project;

use super::upload_message::UploadMessage;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Subscriber bound to the durable upload consumer.
#[derive(Debug, Clone)]
pub struct UploadSubscriber {
    consumer: PullConsumer,
    ack_wait: Duration,
}

impl UploadSubscriber {
    pub(crate) fn new(consumer: PullConsumer, ack_wait: Duration) -> Self {
        Self { consumer, ack_wait }
    }

    /// Opens a continuous message stream pulling at most `batch` notifications at a time.
    ///
    /// Keeping `batch` at the transfer concurrency bounds how long a pulled
    /// notification can wait locally while its ack wait is already running.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STREAM)]
    pub async fn messages(&self, batch: usize) -> Result<UploadMessages> {
        let consumer_name = self
            .consumer
            .cached_info()
            .config
            .durable_name
            .clone()
            .unwrap_or_default();

        let inner = self
            .consumer
            .stream()
            .max_messages_per_batch(batch.max(1))
            .messages()
            .await
            .map_err(|e| Error::consumer_error(&consumer_name, e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            consumer = %consumer_name,
            batch = batch,
            "Subscribed to upload notifications"
        );

        Ok(UploadMessages {
            inner,
            consumer_name,
            ack_wait: self.ack_wait,
        })
    }
}

pin_project! {
    /// Stream of upload notifications.
    ///
    /// An `Err` item is a subscription-level failure, distinct from the
    /// failure of any single notification.
    pub struct UploadMessages {
        #[pin]
        inner: pull::Stream,
        consumer_name: String,
        ack_wait: Duration,
    }
}

impl Stream for UploadMessages {
    type Item = Result<UploadMessage>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(message))) => {
                Poll::Ready(Some(Ok(UploadMessage::new(message, *this.ack_wait))))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(Error::consumer_error(
                this.consumer_name.as_str(),
                e.to_string(),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

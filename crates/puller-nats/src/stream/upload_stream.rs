//! Upload notification stream and durable consumer provisioning.

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{AckPolicy, DeliverPolicy, ReplayPolicy, pull};
use async_nats::jetstream::stream::{self, RetentionPolicy, StorageType};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::upload_subscriber::UploadSubscriber;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Description attached to the durable consumer.
const CONSUMER_DESCRIPTION: &str = "filepuller";

/// Default acknowledgement wait before the broker redelivers a notification.
pub const DEFAULT_ACK_WAIT_SECS: u64 = 300;

/// Declared policies for the upload stream and its durable consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct UploadStreamConfig {
    /// Name of the durable work-queue stream
    #[cfg_attr(feature = "config", arg(long = "stream", env = "PULLER_STREAM"))]
    pub stream_name: String,

    /// Subject namespace prefix; the stream captures `<topic-base>.>`
    #[cfg_attr(feature = "config", arg(long = "topic-base", env = "PULLER_TOPICBASE"))]
    pub topic_base: String,

    /// Name of the durable consumer
    #[cfg_attr(feature = "config", arg(long = "consumer", env = "PULLER_CONSUMER"))]
    pub consumer_name: String,

    /// Seconds the broker waits for an acknowledgement before redelivering
    #[cfg_attr(
        feature = "config",
        arg(long = "ack-wait-secs", env = "PULLER_ACK_WAIT_SECS", default_value_t = DEFAULT_ACK_WAIT_SECS)
    )]
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,
}

fn default_ack_wait_secs() -> u64 {
    DEFAULT_ACK_WAIT_SECS
}

impl UploadStreamConfig {
    /// Creates a configuration with the default acknowledgement wait.
    pub fn new(
        stream_name: impl Into<String>,
        topic_base: impl Into<String>,
        consumer_name: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            topic_base: topic_base.into(),
            consumer_name: consumer_name.into(),
            ack_wait_secs: DEFAULT_ACK_WAIT_SECS,
        }
    }

    /// Set the acknowledgement wait in seconds.
    #[must_use]
    pub fn with_ack_wait_secs(mut self, secs: u64) -> Self {
        self.ack_wait_secs = secs;
        self
    }

    /// Returns the acknowledgement wait as a Duration.
    #[inline]
    pub fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_secs)
    }

    /// Subject pattern captured by the stream.
    pub fn stream_subject(&self) -> String {
        format!("{}.>", self.topic_base)
    }

    /// Subject the consumer filters on.
    pub fn filter_subject(&self) -> String {
        format!("{}.upload", self.topic_base)
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let names = [
            ("Stream name", &self.stream_name),
            ("Consumer name", &self.consumer_name),
        ];
        for (label, name) in names {
            if name.is_empty() {
                return Err(format!("{} cannot be empty", label));
            }
            if name.contains(['.', '*', '>', ' ']) {
                return Err(format!("{} '{}' contains reserved characters", label, name));
            }
        }

        if self.topic_base.is_empty() {
            return Err("Topic base cannot be empty".to_string());
        }
        if self.topic_base.contains(['*', '>', ' ']) || self.topic_base.ends_with('.') {
            return Err(format!("Invalid topic base: {}", self.topic_base));
        }

        if self.ack_wait_secs == 0 {
            return Err("Acknowledgement wait must be at least one second".to_string());
        }
        Ok(())
    }

    fn stream_config(&self) -> stream::Config {
        stream::Config {
            name: self.stream_name.clone(),
            subjects: vec![self.stream_subject()],
            retention: RetentionPolicy::WorkQueue,
            storage: StorageType::File,
            ..Default::default()
        }
    }

    fn consumer_config(&self) -> pull::Config {
        pull::Config {
            name: Some(self.consumer_name.clone()),
            durable_name: Some(self.consumer_name.clone()),
            description: Some(CONSUMER_DESCRIPTION.to_string()),
            deliver_policy: DeliverPolicy::All,
            ack_policy: AckPolicy::Explicit,
            ack_wait: self.ack_wait(),
            filter_subject: self.filter_subject(),
            replay_policy: ReplayPolicy::Instant,
            ..Default::default()
        }
    }
}

/// Handle to the provisioned upload stream.
#[derive(Debug, Clone)]
pub struct UploadStream {
    stream: stream::Stream,
    config: UploadStreamConfig,
}

impl UploadStream {
    /// Creates the work-queue stream, or updates an existing one to the
    /// declared subjects, retention and storage.
    ///
    /// Changes the server cannot apply in place, such as retention, fail here
    /// instead of leaving a stream with different policies in use.
    #[tracing::instrument(skip(jetstream, config), fields(stream = %config.stream_name), target = TRACING_TARGET_STREAM)]
    pub(crate) async fn ensure(
        jetstream: &jetstream::Context,
        config: &UploadStreamConfig,
    ) -> Result<Self> {
        let failed = |e: &dyn std::fmt::Display| {
            tracing::error!(
                target: TRACING_TARGET_STREAM,
                stream = %config.stream_name,
                error = %e,
                "Failed to ensure upload stream"
            );
            Error::stream_error(&config.stream_name, e.to_string())
        };

        let info = jetstream
            .create_or_update_stream(config.stream_config())
            .await
            .map_err(|e| failed(&e))?;

        let stream = jetstream
            .get_stream(&info.config.name)
            .await
            .map_err(|e| failed(&e))?;

        tracing::info!(
            target: TRACING_TARGET_STREAM,
            stream = %config.stream_name,
            subject = %config.stream_subject(),
            messages = info.state.messages,
            "Upload stream ready"
        );

        Ok(Self {
            stream,
            config: config.clone(),
        })
    }

    /// Creates or updates the durable consumer and returns a subscriber for it.
    #[tracing::instrument(skip(self), fields(consumer = %self.config.consumer_name), target = TRACING_TARGET_STREAM)]
    pub async fn subscriber(&self) -> Result<UploadSubscriber> {
        let consumer_name = &self.config.consumer_name;

        let consumer = self
            .stream
            .create_consumer(self.config.consumer_config())
            .await
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET_STREAM,
                    consumer = %consumer_name,
                    error = %e,
                    "Failed to ensure durable consumer"
                );
                Error::consumer_error(consumer_name, e.to_string())
            })?;

        tracing::info!(
            target: TRACING_TARGET_STREAM,
            consumer = %consumer_name,
            stream = %self.config.stream_name,
            filter_subject = %self.config.filter_subject(),
            ack_wait_secs = self.config.ack_wait_secs,
            "Durable consumer ready"
        );

        Ok(UploadSubscriber::new(consumer, self.config.ack_wait()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UploadStreamConfig {
        UploadStreamConfig::new("UPLOADS", "files", "puller")
    }

    #[test]
    fn test_subjects() {
        let config = config();
        assert_eq!(config.stream_subject(), "files.>");
        assert_eq!(config.filter_subject(), "files.upload");
    }

    #[test]
    fn test_stream_config_is_work_queue() {
        let stream = config().stream_config();
        assert_eq!(stream.name, "UPLOADS");
        assert_eq!(stream.subjects, vec!["files.>".to_string()]);
        assert_eq!(stream.retention, RetentionPolicy::WorkQueue);
        assert_eq!(stream.storage, StorageType::File);
    }

    #[test]
    fn test_consumer_config_policies() {
        let consumer = config().consumer_config();
        assert_eq!(consumer.durable_name.as_deref(), Some("puller"));
        assert_eq!(consumer.name.as_deref(), Some("puller"));
        assert_eq!(consumer.description.as_deref(), Some("filepuller"));
        assert_eq!(consumer.ack_policy, AckPolicy::Explicit);
        assert_eq!(consumer.deliver_policy, DeliverPolicy::All);
        assert_eq!(consumer.replay_policy, ReplayPolicy::Instant);
        assert_eq!(consumer.ack_wait, Duration::from_secs(300));
        assert_eq!(consumer.filter_subject, "files.upload");
    }

    #[test]
    fn test_validation() {
        assert!(config().validate().is_ok());

        let mut dotted = config();
        dotted.stream_name = "UP.LOADS".to_string();
        assert!(dotted.validate().is_err());

        let mut wildcard = config();
        wildcard.topic_base = "files.>".to_string();
        assert!(wildcard.validate().is_err());

        let mut empty_consumer = config();
        empty_consumer.consumer_name = String::new();
        assert!(empty_consumer.validate().is_err());

        assert!(config().with_ack_wait_secs(0).validate().is_err());
    }
}

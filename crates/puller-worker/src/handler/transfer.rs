//! Per-notification transfer sequence.

use jiff::Timestamp;
use puller_nats::object::DeleteOutcome;
use tokio::time::timeout;

use super::Outcome;
use crate::retrieve::retrieve;
use crate::{
    Delivery, FailureClass, ObjectKey, ObjectSource, TRACING_TARGET_WORKER, WorkerError,
    WorkerState,
};

/// Handles one notification: retrieve, acknowledge, then remove the object.
///
/// The steps run strictly in that order. Nothing is acknowledged before the
/// destination file is durably in place, and the object is removed only after
/// the broker confirmed the acknowledgement.
pub async fn process<S, D>(state: &WorkerState<S>, delivery: &D) -> Outcome
where
    S: ObjectSource,
    D: Delivery,
{
    let config = &state.config;
    let info = delivery.info();

    let key = match ObjectKey::from_payload(delivery.payload()) {
        Ok(key) => key,
        Err(err) => return settle_failure(state, delivery, None, err).await,
    };

    let destination = match key.destination(&config.destination, config.keep_destination_quotes)
    {
        Ok(path) => path,
        Err(err) => return settle_failure(state, delivery, Some(&key), err).await,
    };

    let Some(_claim) = state.inflight.try_claim(key.name()) else {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            object_key = %key,
            delivered = info.delivered,
            "Object already being transferred, deferring notification"
        );
        nak(state, delivery, key.name()).await;
        return Outcome::Deferred;
    };

    tracing::info!(
        target: TRACING_TARGET_WORKER,
        object_key = %key,
        delivered = info.delivered,
        stream_sequence = info.stream_sequence,
        pending = info.pending,
        published = ?info.published,
        redelivery_deadline = ?info.redelivery_deadline,
        destination = %destination.display(),
        "Processing upload notification"
    );

    let bytes = match retrieve(&state.source, &key, &destination, &config.retrieve_options()).await
    {
        Ok(bytes) => bytes,
        Err(err) => return settle_failure(state, delivery, Some(&key), err).await,
    };

    if let Err(err) = delivery.ack(config.ack_timeout()).await {
        tracing::error!(
            target: TRACING_TARGET_WORKER,
            object_key = %key,
            error = %err,
            "Failed to acknowledge notification, leaving redelivery to the broker"
        );
        return Outcome::AckFailed;
    }

    tracing::debug!(
        target: TRACING_TARGET_WORKER,
        object_key = %key,
        bytes,
        "Notification acknowledged"
    );

    match timeout(config.delete_timeout(), state.source.remove(key.name())).await {
        Ok(Ok(DeleteOutcome::Removed)) => {
            tracing::info!(
                target: TRACING_TARGET_WORKER,
                object_key = %key,
                bytes,
                elapsed_ms = elapsed_ms(info.received_at),
                "Transfer completed"
            );
            Outcome::Transferred
        }
        Ok(Ok(DeleteOutcome::AlreadyAbsent)) => {
            tracing::debug!(
                target: TRACING_TARGET_WORKER,
                object_key = %key,
                "Object already absent from the store"
            );
            Outcome::Transferred
        }
        Ok(Err(err)) => {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                object_key = %key,
                error = %err,
                "Failed to delete transferred object"
            );
            Outcome::TransferredObjectRetained
        }
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                object_key = %key,
                timeout_secs = config.delete_timeout_secs,
                "Timed out deleting transferred object"
            );
            Outcome::TransferredObjectRetained
        }
    }
}

/// Milliseconds since the notification was received.
fn elapsed_ms(received_at: Timestamp) -> i64 {
    let elapsed = Timestamp::now().duration_since(received_at).as_millis();
    i64::try_from(elapsed).unwrap_or(i64::MAX)
}

async fn settle_failure<S, D>(
    state: &WorkerState<S>,
    delivery: &D,
    key: Option<&ObjectKey>,
    err: WorkerError,
) -> Outcome
where
    S: ObjectSource,
    D: Delivery,
{
    let object_key = key.map(ObjectKey::name).unwrap_or_default();
    let info = delivery.info();

    match err.class() {
        FailureClass::Permanent => {
            tracing::error!(
                target: TRACING_TARGET_WORKER,
                object_key,
                delivered = info.delivered,
                error = %err,
                "Rejecting notification"
            );
            if let Err(e) = delivery.term(state.config.ack_timeout()).await {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    object_key,
                    error = %e,
                    "Failed to terminate notification"
                );
            }
            Outcome::Rejected
        }
        FailureClass::Transient => {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                object_key,
                delivered = info.delivered,
                absent = err.is_absent_object(),
                error = %err,
                "Retrieval failed, requesting redelivery"
            );
            nak(state, delivery, object_key).await;
            Outcome::Retrying
        }
    }
}

async fn nak<S, D>(state: &WorkerState<S>, delivery: &D, object_key: &str)
where
    S: ObjectSource,
    D: Delivery,
{
    let delay = state.config.redelivery_delay();
    if let Err(err) = delivery.nak(delay, state.config.ack_timeout()).await {
        tracing::error!(
            target: TRACING_TARGET_WORKER,
            object_key,
            error = %err,
            "Failed to request redelivery"
        );
    }
}

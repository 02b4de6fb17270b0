//! Notification consumer loop.

use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::process;
use crate::{Delivery, ObjectSource, Result, TRACING_TARGET_WORKER, WorkerError, WorkerState};

/// Upload notification worker.
///
/// Pulls notifications from a message stream, transfers each one on a
/// tracked task with semaphore-based concurrency limiting, and drains on
/// cancellation or subscription failure: pulling stops, transfers already
/// started run their full sequence, then the loop returns.
pub struct Worker<S> {
    state: WorkerState<S>,
    cancel_token: CancellationToken,
    tracker: TaskTracker,
}

impl<S: ObjectSource> Worker<S> {
    /// Creates a new worker.
    pub fn new(state: WorkerState<S>, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            cancel_token,
            tracker: TaskTracker::new(),
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn<M, D>(self, messages: M) -> WorkerHandle
    where
        M: Stream<Item = puller_nats::Result<D>> + Send + Unpin + 'static,
        D: Delivery,
    {
        let cancel_token = self.cancel_token.clone();
        let task = tokio::spawn(self.run(messages));
        WorkerHandle { cancel_token, task }
    }

    /// Runs the worker loop until cancelled or the subscription fails.
    pub async fn run<M, D>(self, mut messages: M) -> Result<()>
    where
        M: Stream<Item = puller_nats::Result<D>> + Send + Unpin,
        D: Delivery,
    {
        let semaphore = self.state.create_semaphore();

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            destination = %self.state.config.destination.display(),
            max_concurrent_transfers = self.state.config.max_concurrent_transfers,
            "Starting upload worker"
        );

        let result = loop {
            let permit = tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => break Ok(()),
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Ok(()),
                },
            };

            let next = tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => break Ok(()),
                next = messages.next() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(err)) => {
                    tracing::error!(
                        target: TRACING_TARGET_WORKER,
                        error = %err,
                        "Subscription failed, draining"
                    );
                    break Err(WorkerError::Subscription(err));
                }
                None => {
                    tracing::error!(
                        target: TRACING_TARGET_WORKER,
                        "Subscription ended, draining"
                    );
                    break Err(WorkerError::SubscriptionClosed);
                }
            };

            let state = self.state.clone();
            self.tracker.spawn(async move {
                // Hold permit until the transfer completes
                let _permit = permit;
                let outcome = process(&state, &delivery).await;
                tracing::debug!(
                    target: TRACING_TARGET_WORKER,
                    stream_sequence = delivery.info().stream_sequence,
                    %outcome,
                    "Notification handled"
                );
            });
        };

        if result.is_ok() {
            tracing::info!(
                target: TRACING_TARGET_WORKER,
                "Shutdown requested, no longer accepting notifications"
            );
        }

        drop(messages);
        self.drain().await;
        result
    }

    async fn drain(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_WORKER,
                in_flight = self.tracker.len(),
                "Waiting for in-flight transfers"
            );
        }
        self.tracker.wait().await;
        tracing::info!(target: TRACING_TARGET_WORKER, "Upload worker drained");
    }
}

/// Handle to a spawned [`Worker`].
#[derive(Debug)]
pub struct WorkerHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl WorkerHandle {
    /// Asks the worker to stop pulling notifications.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Waits for the worker to return on its own.
    pub async fn join(self) -> Result<()> {
        flatten(self.task.await)
    }

    /// Runs until the worker returns or `signal` resolves.
    ///
    /// On signal the worker is asked to stop and given `grace` to drain. Returns
    /// `Ok(false)` if the grace period elapsed with transfers still running.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()>,
        grace: Duration,
    ) -> Result<bool> {
        let Self {
            cancel_token,
            mut task,
        } = self;

        tokio::select! {
            joined = &mut task => return flatten(joined).map(|()| true),
            () = signal => {}
        }

        cancel_token.cancel();
        match tokio::time::timeout(grace, &mut task).await {
            Ok(joined) => flatten(joined).map(|()| true),
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET_WORKER,
                    grace_secs = grace.as_secs(),
                    "Grace period elapsed with transfers in flight"
                );
                task.abort();
                Ok(false)
            }
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| WorkerError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::{Semaphore, mpsc};
    use tokio_stream::wrappers::ReceiverStream;

    use super::*;
    use crate::WorkerConfig;
    use crate::testing::{FakeDelivery, MemorySource, Signal};

    type Feed = mpsc::Sender<puller_nats::Result<FakeDelivery>>;

    fn spawn_worker(source: MemorySource, root: &std::path::Path) -> (Feed, WorkerHandle) {
        let (tx, rx) = mpsc::channel(8);
        let state = WorkerState::new(source, WorkerConfig::new(root));
        let handle = Worker::new(state, CancellationToken::new()).spawn(ReceiverStream::new(rx));
        (tx, handle)
    }

    #[tokio::test]
    async fn test_transfers_notifications_until_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new()
            .with_object("a.csv", b"aaaa")
            .with_object("b.csv", b"bbbbbb");
        let (tx, handle) = spawn_worker(source.clone(), dir.path());

        let a = FakeDelivery::new("a.csv");
        let b = FakeDelivery::new("\"b.csv\"");
        tx.send(Ok(a.clone())).await.unwrap();
        tx.send(Ok(b.clone())).await.unwrap();

        while source.removed().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown();
        handle.join().await.unwrap();

        assert_eq!(a.signals(), vec![Signal::Ack]);
        assert_eq!(b.signals(), vec![Signal::Ack]);
        assert_eq!(std::fs::read(dir.path().join("a.csv")).unwrap(), b"aaaa");
        assert_eq!(std::fs::read(dir.path().join("b.csv")).unwrap(), b"bbbbbb");
    }

    #[tokio::test]
    async fn test_shutdown_lets_inflight_transfer_finish() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let source = MemorySource::new()
            .with_gated_object("slow.csv", b"0123456789", gate.clone())
            .with_object("late.csv", b"late");
        let (tx, handle) = spawn_worker(source.clone(), dir.path());

        let slow = FakeDelivery::new("slow.csv");
        tx.send(Ok(slow.clone())).await.unwrap();
        source.wait_opened().await;

        handle.shutdown();
        let late = FakeDelivery::new("late.csv");
        let _ = tx.send(Ok(late.clone())).await;
        gate.add_permits(1);

        handle.join().await.unwrap();

        assert_eq!(slow.signals(), vec![Signal::Ack]);
        assert_eq!(
            std::fs::read(dir.path().join("slow.csv")).unwrap(),
            b"0123456789"
        );
        assert!(!source.contains("slow.csv"));

        assert!(late.signals().is_empty());
        assert!(!dir.path().join("late.csv").exists());
        assert!(source.contains("late.csv"));
    }

    #[tokio::test]
    async fn test_subscription_error_drains_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let source = MemorySource::new().with_gated_object("a.csv", b"0123", gate.clone());
        let (tx, handle) = spawn_worker(source.clone(), dir.path());

        let a = FakeDelivery::new("a.csv");
        tx.send(Ok(a.clone())).await.unwrap();
        source.wait_opened().await;
        tx.send(Err(puller_nats::Error::consumer_error("puller", "heartbeat missed")))
            .await
            .unwrap();

        let release = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.add_permits(1);
        };
        let (result, ()) = tokio::join!(handle.join(), release);

        assert!(matches!(result, Err(WorkerError::Subscription(_))));
        assert_eq!(a.signals(), vec![Signal::Ack]);
        assert!(dir.path().join("a.csv").exists());
    }

    #[tokio::test]
    async fn test_closed_subscription_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, handle) = spawn_worker(MemorySource::new(), dir.path());
        drop(tx);

        let result = handle.join().await;
        assert!(matches!(result, Err(WorkerError::SubscriptionClosed)));
    }

    #[tokio::test]
    async fn test_run_until_signal_drains() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, handle) = spawn_worker(MemorySource::new(), dir.path());

        let drained = handle
            .run_until(std::future::ready(()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(drained);
    }

    #[tokio::test]
    async fn test_run_until_reports_elapsed_grace() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_stalled_object("stuck.bin", b"0123");
        let (tx, handle) = spawn_worker(source.clone(), dir.path());
        tx.send(Ok(FakeDelivery::new("stuck.bin"))).await.unwrap();
        source.wait_opened().await;

        let drained = handle
            .run_until(std::future::ready(()), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!drained);
    }
}

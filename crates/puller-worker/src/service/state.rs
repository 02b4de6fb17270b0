//! Worker application state.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::WorkerConfig;
use crate::{InFlightKeys, ObjectSource};

/// Shared context of one consumption session.
///
/// Holds the object source, the transfer configuration, and the registry of
/// keys currently being transferred. Cloning is cheap; every spawned transfer
/// gets its own clone.
#[derive(Clone)]
pub struct WorkerState<S> {
    /// Where uploaded objects are read from.
    pub source: S,
    /// Transfer behavior.
    pub config: Arc<WorkerConfig>,
    /// Keys with a transfer in progress.
    pub inflight: InFlightKeys,
}

impl<S: ObjectSource> WorkerState<S> {
    /// Creates a new worker state.
    pub fn new(source: S, config: WorkerConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
            inflight: InFlightKeys::new(),
        }
    }

    /// Creates a semaphore for limiting concurrent transfers.
    pub(crate) fn create_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.config.max_concurrent_transfers.max(1)))
    }
}

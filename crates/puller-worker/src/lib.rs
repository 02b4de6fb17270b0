#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the notification consumer loop.
///
/// Use this target for logging loop lifecycle, per-notification outcomes, and acknowledgement signals.
pub const TRACING_TARGET_WORKER: &str = "puller_worker::worker";

/// Tracing target for object retrieval.
///
/// Use this target for logging object downloads, integrity checks, and destination file commits.
pub const TRACING_TARGET_RETRIEVE: &str = "puller_worker::retrieve";

mod delivery;
mod error;
pub mod handler;
mod inflight;
mod key;
pub mod retrieve;
pub mod service;
mod source;

#[cfg(test)]
mod testing;

pub use delivery::Delivery;
pub use error::{FailureClass, Result, WorkerError};
pub use handler::{Outcome, Worker, WorkerHandle};
pub use inflight::{InFlightGuard, InFlightKeys};
pub use key::ObjectKey;
pub use service::{WorkerConfig, WorkerState};
pub use source::{FetchedObject, ObjectSource};

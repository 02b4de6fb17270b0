//! Worker state and configuration.

mod config;
mod state;

pub use config::{
    DEFAULT_ACK_TIMEOUT_SECS, DEFAULT_DELETE_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENT_TRANSFERS, DEFAULT_REDELIVERY_DELAY_SECS, WorkerConfig,
};
pub use state::WorkerState;

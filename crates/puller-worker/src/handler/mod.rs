//! Upload notification handling.
//!
//! [`Worker`] owns the consumption loop; [`process`] runs the transfer
//! sequence for a single notification and reports an [`Outcome`].

mod outcome;
mod transfer;
mod worker;

pub use outcome::Outcome;
pub use transfer::process;
pub use worker::{Worker, WorkerHandle};

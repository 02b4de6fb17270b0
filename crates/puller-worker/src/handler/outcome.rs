//! Result of handling one notification.

use derive_more::Display;

/// How a notification ended.
///
/// Outcomes are reported for logging and carry no control flow back to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Outcome {
    /// File written, notification acknowledged, object removed or already gone.
    #[display("transferred")]
    Transferred,
    /// File written and notification acknowledged, but the object could not be removed.
    #[display("transferred, object retained")]
    TransferredObjectRetained,
    /// Retrieval failed; redelivery was requested.
    #[display("retrying")]
    Retrying,
    /// The notification can never succeed and was terminated.
    #[display("rejected")]
    Rejected,
    /// File written, but the broker did not confirm the acknowledgement.
    #[display("ack failed")]
    AckFailed,
    /// The same key was already being transferred; redelivery was requested.
    #[display("deferred")]
    Deferred,
}

impl Outcome {
    /// Returns true if the destination file was written and acknowledged.
    pub fn is_transferred(&self) -> bool {
        matches!(self, Self::Transferred | Self::TransferredObjectRetained)
    }
}

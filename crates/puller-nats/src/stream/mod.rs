//! JetStream upload notifications: stream and consumer provisioning plus
//! message acknowledgement.
//!
//! - [`UploadStreamConfig`] - declared stream and durable consumer policies
//! - [`UploadStream`] - handle to the provisioned work-queue stream
//! - [`UploadSubscriber`] - durable pull consumer yielding [`UploadMessage`]s
//! - [`UploadMessage`] - one notification with ack, nak-with-delay and term

mod delivery_info;
mod upload_message;
mod upload_stream;
mod upload_subscriber;

pub use delivery_info::DeliveryInfo;
pub use upload_message::UploadMessage;
pub use upload_stream::{UploadStream, UploadStreamConfig};
pub use upload_subscriber::{UploadMessages, UploadSubscriber};

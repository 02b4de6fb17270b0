//! Object storage for uploaded files using NATS JetStream.
//!
//! - [`BucketConfig`] - declared bucket policies (storage, compression, size)
//! - [`ObjectStore`] - bucket handle with reads that treat deleted objects as absent and idempotent deletes
//! - [`GetResult`] - streaming reader plus the recorded size and digest
//! - [`HashingReader`] - computes SHA-256 while streaming

mod bucket_config;
mod hashing_reader;
mod object_data;
mod object_store;

pub use bucket_config::BucketConfig;
pub use hashing_reader::HashingReader;
pub use object_data::{DeleteOutcome, GetResult, ObjectDigest};
pub use object_store::ObjectStore;

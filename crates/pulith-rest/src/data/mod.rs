//! Immutable data types for REST transfers.
//!
//! Configuration, per-call options, message metadata, progress snapshots and the
//! result envelope. Nothing here performs I/O.

pub mod config;
pub mod message;
pub mod options;
pub mod progress;
pub mod result;

pub use config::{Codec, ContentEncoding, DEFAULT_TRANSFER_BUFFER_SIZE, LengthResolver, TransferConfig};
pub use message::{HeaderValue, Headers, Method, ReadMode, ResponseHead};
pub use options::CallOptions;
pub use progress::{Progress, ProgressCallback, ProgressTracker};
pub use result::{ResponseEnvelope, TransferResult};

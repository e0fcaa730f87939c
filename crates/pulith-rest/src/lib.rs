//! Typed REST transfers over a pluggable HTTP transport.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration, options and result types
//! - `core` - Pure transformations (status classification, multipart framing)
//! - `effects` - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Total operations**: every call resolves to a [`ResponseEnvelope`] classified by
//!   a closed [`TransferResult`]; failures are never raised to the caller
//! - **Streaming**: downloads and uploads move bytes in fixed-size chunks with
//!   progress callbacks and cooperative cancellation
//! - **Compression**: POST bodies may be gzip or raw-deflate encoded on the fly
//! - **Multipart uploads**: text fields plus streamed entries, each optionally routed
//!   through an [`UploadFilter`]
//!
//! # Example
//!
//! ```no_run
//! use pulith_rest::{CallOptions, ReqwestClient, RestClient, TransferResult};
//!
//! # async fn run() {
//! let rest = RestClient::new(ReqwestClient::new("https://files.example.com"));
//! let envelope = rest
//!     .download_to_file("/archive.tar.gz", "archive.tar.gz", CallOptions::default())
//!     .await;
//! assert_eq!(envelope.result(), TransferResult::Success);
//! # }
//! ```

mod core;
mod data;
mod effects;
mod error;
mod serializer;

pub use self::core::is_success_status;
pub use self::data::{
    CallOptions, Codec, ContentEncoding, DEFAULT_TRANSFER_BUFFER_SIZE, HeaderValue, Headers,
    LengthResolver, Method, Progress, ProgressCallback, ProgressTracker, ReadMode,
    ResponseEnvelope, ResponseHead, TransferConfig, TransferResult,
};
pub use self::effects::{
    BodyWriter, BoxReader, BytesContent, CompressedContent, Content, CopyDestination,
    CopySource, Copier, HttpClient, Request, Response, RestClient, Sha256Filter,
    TransferEntry, UploadContent, UploadFilter,
};
pub use self::error::{BoxError, Cancelled, Error, Result, SerializeError};
pub use self::serializer::{JsonSerializer, JsonSerializerConfig, Serializer};

#[cfg(feature = "postcard")]
pub use self::serializer::PostcardSerializer;

#[cfg(feature = "reqwest")]
pub use self::effects::{ReqwestClient, ReqwestError};

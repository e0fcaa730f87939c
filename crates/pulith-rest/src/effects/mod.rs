//! I/O side of REST transfers.
//!
//! Transport abstraction, request bodies (plain, compressed, multipart), the
//! progress-tracking copy and the transfer operations built on them.

mod client;
mod compress;
mod content;
mod copy;
mod filter;
mod http;
mod upload;

pub use client::RestClient;
pub use compress::CompressedContent;
pub use content::{BodyWriter, BytesContent, Content};
pub use copy::{CopyDestination, CopySource, Copier};
pub use filter::Sha256Filter;
pub use http::{BoxReader, HttpClient, Request, Response};
pub use upload::{TransferEntry, UploadContent, UploadFilter};

#[cfg(feature = "reqwest")]
pub use http::{ReqwestClient, ReqwestError};

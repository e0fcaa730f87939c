//! Error types for pulith-rest.
//!
//! [`Error`] is the internal failure type threaded through every transfer with `?`.
//! It never reaches callers as an `Err`: each public operation converts it into a
//! [`ResponseEnvelope`](crate::ResponseEnvelope) at a single boundary, using
//! [`Error::classify`] to pick the [`TransferResult`].

use std::io;

use thiserror::Error;

use crate::data::TransferResult;

/// Boxed error produced by an [`HttpClient`](crate::HttpClient) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed before a response was received.
    #[error("request failed: {0}")]
    Request(#[source] BoxError),

    /// The caller's cancellation token fired.
    #[error("transfer cancelled")]
    Cancelled,

    /// A body could not be encoded or decoded.
    ///
    /// `status` is the response status when one was received, otherwise 0.
    #[error("serialization failed (status {status}): {source}")]
    Serialize {
        status: u16,
        #[source]
        source: SerializeError,
    },

    /// Local stream or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    /// Map this failure onto the closed result taxonomy.
    ///
    /// The mapping depends only on the variant, so classifying the same error
    /// any number of times yields the same result.
    #[must_use]
    pub fn classify(&self) -> TransferResult {
        match self {
            Error::Request(_) => TransferResult::RequestError,
            Error::Cancelled => TransferResult::Cancelled,
            Error::Serialize { .. } => TransferResult::SerializeError,
            Error::Io(_) => TransferResult::Unknown,
        }
    }

    /// Status code carried by the error itself, if any.
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Error::Serialize { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Wrap a transport failure, recognising cancellation raised inside a request body.
    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if is_cancellation(&err) {
            Error::Cancelled
        } else {
            Error::Request(Box::new(err))
        }
    }

    pub(crate) fn serialize(status: u16, source: impl Into<SerializeError>) -> Self {
        Error::Serialize {
            status,
            source: source.into(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if is_cancellation(&e) {
            Error::Cancelled
        } else {
            Error::Io(e)
        }
    }
}

/// Failure of a [`Serializer`](crate::Serializer) backend.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "postcard")]
    #[error("postcard: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("body I/O: {0}")]
    Io(#[from] io::Error),
}

/// Marker carried inside [`io::Error`]s raised when a copy observes cancellation.
///
/// Transports see these as ordinary I/O failures of the request body; the marker lets
/// the classifier recover the cancellation from the error chain by type.
#[derive(Debug, Clone, Copy, Error)]
#[error("transfer cancelled")]
pub struct Cancelled;

pub(crate) fn cancelled_io() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, Cancelled)
}

/// Walk an error chain looking for the [`Cancelled`] marker.
pub(crate) fn is_cancellation(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<Cancelled>() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<io::Error>()
            && io.get_ref().is_some_and(|inner| inner.is::<Cancelled>())
        {
            return true;
        }
        current = e.source();
    }
    false
}

pub type Result<T> = std::result::Result<T, Error>;

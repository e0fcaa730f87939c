use std::fmt;

use crate::error::Error;

/// Outcome of a single transfer call.
///
/// Exactly one value describes every completed call. Callers branch on this; the
/// status code and error attached to the [`ResponseEnvelope`] are diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferResult {
    /// The server answered with a 2xx status and any requested body was decoded.
    Success,

    /// The server answered with a non-2xx status. Not an error value.
    HttpError,

    /// The transport failed before a response was received.
    RequestError,

    /// The request body could not be encoded or the response body decoded.
    SerializeError,

    /// The caller's cancellation token fired.
    Cancelled,

    /// Any other failure.
    Unknown,
}

impl fmt::Display for TransferResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferResult::Success => write!(f, "Success"),
            TransferResult::HttpError => write!(f, "HttpError"),
            TransferResult::RequestError => write!(f, "RequestError"),
            TransferResult::SerializeError => write!(f, "SerializeError"),
            TransferResult::Cancelled => write!(f, "Cancelled"),
            TransferResult::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of a transfer call: classification, status code, optional error and payload.
///
/// `payload` is only ever present on [`TransferResult::Success`], `error` only on
/// failures other than [`TransferResult::HttpError`]; the two are never both set.
/// `status_code` is 0 when no response was received.
#[derive(Debug)]
pub struct ResponseEnvelope<T> {
    result: TransferResult,
    status_code: u16,
    error: Option<Error>,
    payload: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub(crate) fn success(status_code: u16, payload: Option<T>) -> Self {
        Self {
            result: TransferResult::Success,
            status_code,
            error: None,
            payload,
        }
    }

    pub(crate) fn http_error(status_code: u16) -> Self {
        Self {
            result: TransferResult::HttpError,
            status_code,
            error: None,
            payload: None,
        }
    }

    /// Build the envelope for a failed call. A status carried by the error wins over
    /// the last status observed on the wire.
    pub(crate) fn failure(error: Error, observed_status: u16) -> Self {
        Self {
            result: error.classify(),
            status_code: error.status().unwrap_or(observed_status),
            error: Some(error),
            payload: None,
        }
    }

    pub fn result(&self) -> TransferResult {
        self.result
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Returns `true` if the call completed with [`TransferResult::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == TransferResult::Success
    }

    /// Split into the error (if any) and the payload (if any).
    pub fn into_parts(self) -> (TransferResult, u16, Option<Error>, Option<T>) {
        (self.result, self.status_code, self.error, self.payload)
    }

    /// Transform the payload, keeping classification and diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            result: self.result,
            status_code: self.status_code,
            error: self.error,
            payload: self.payload.map(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_carries_payload_only() {
        let envelope = ResponseEnvelope::success(200, Some(7u32));
        assert!(envelope.is_success());
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.payload(), Some(&7));
        assert!(envelope.error().is_none());
    }

    #[test]
    fn test_http_error_has_neither_error_nor_payload() {
        let envelope = ResponseEnvelope::<u32>::http_error(404);
        assert_eq!(envelope.result(), TransferResult::HttpError);
        assert_eq!(envelope.status_code(), 404);
        assert!(envelope.error().is_none());
        assert!(envelope.payload().is_none());
    }

    #[test]
    fn test_failure_prefers_error_status() {
        let json = serde_json::from_str::<u32>("x").unwrap_err();
        let envelope = ResponseEnvelope::<u32>::failure(Error::serialize(0, json), 200);
        assert_eq!(envelope.result(), TransferResult::SerializeError);
        assert_eq!(envelope.status_code(), 0);

        let envelope = ResponseEnvelope::<u32>::failure(Error::Cancelled, 200);
        assert_eq!(envelope.result(), TransferResult::Cancelled);
        assert_eq!(envelope.status_code(), 200);
        assert!(envelope.payload().is_none());
    }

    #[test]
    fn test_map_keeps_classification() {
        let envelope = ResponseEnvelope::success(201, Some(2u32)).map(|v| v * 10);
        assert_eq!(envelope.status_code(), 201);
        assert_eq!(envelope.into_payload(), Some(20));
    }
}

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::message::{HeaderValue, Headers};
use super::progress::{Progress, ProgressCallback};

/// Per-call settings for a transfer operation.
///
/// # Examples
///
/// ```
/// use pulith_rest::{CallOptions, Progress};
/// use std::sync::Arc;
///
/// let options = CallOptions::default()
///     .header("Authorization", "Bearer token")
///     .header("Accept", ["application/json", "text/plain"])
///     .parameter("folder", "inbox")
///     .compress(true)
///     .on_progress(Arc::new(|progress: &Progress| {
///         if let Some(pct) = progress.percent {
///             println!("{pct}%");
///         }
///     }));
/// assert!(options.compress);
/// ```
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Extra request headers, sent in insertion order.
    pub headers: Headers,

    /// Flat form fields added as text parts to uploads, in insertion order.
    ///
    /// Ignored by every other operation.
    pub parameters: Vec<(String, String)>,

    /// Compress POST bodies with the config's [`ContentEncoding`](crate::ContentEncoding).
    ///
    /// Default: false
    pub compress: bool,

    /// Progress callback for downloads and uploads.
    ///
    /// Invoked after every chunk written. Snapshots carry a percentage only when the
    /// total size is known.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,

    /// Cooperative cancellation, observed at every send, read, write and flush.
    pub cancel: CancellationToken,
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .field("compress", &self.compress)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .field("cancel", &self.cancel.is_cancelled())
            .finish()
    }
}

impl CallOptions {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.parameters.push((name.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    #[must_use]
    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

use std::fmt;
use std::future::Future;

use tokio::io::AsyncRead;

use crate::data::{Method, ReadMode, ResponseHead};
use crate::effects::content::Content;

/// Readable response body.
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Request handed to an [`HttpClient`].
pub struct Request {
    pub method: Method,

    /// Path or absolute URL; resolution against a base is up to the client.
    pub path: String,

    /// Request headers in order; repeated names are sent once per value.
    pub headers: Vec<(String, String)>,

    pub body: Option<Box<dyn Content>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Box<dyn Content>) -> Self {
        self.body = Some(body);
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| b.content_length()))
            .finish()
    }
}

/// Response returned by an [`HttpClient`].
pub struct Response {
    pub head: ResponseHead,
    pub body: BoxReader,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP transport.
///
/// The only capability the transfer operations need: send one request, get one
/// response. Implementations own connection pooling, TLS and redirects.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for transport failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send `request` and return the response.
    ///
    /// When the request has a body, the implementation drives
    /// [`Content::write_to`] to produce it and reports a failure of that call as
    /// its own error, keeping the I/O error in the source chain.
    ///
    /// With [`ReadMode::HeadersOnly`] the future must resolve once headers arrive
    /// and the body must be read lazily from the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained (DNS failure, refused
    /// connection, broken request body, ...). Non-2xx statuses are responses,
    /// not errors.
    fn send(
        &self,
        request: Request,
        mode: ReadMode,
    ) -> impl Future<Output = std::result::Result<Response, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::io;

    use bytes::Bytes;
    use futures_util::{StreamExt, TryStreamExt, stream};
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::sync::oneshot;
    use tokio_util::io::{ReaderStream, StreamReader};

    use super::*;
    use crate::error::is_cancellation;

    const BODY_PIPE_CAPACITY: usize = 64 * 1024;

    /// Errors raised by [`ReqwestClient`].
    #[derive(Debug, thiserror::Error)]
    pub enum ReqwestError {
        #[error(transparent)]
        Http(#[from] reqwest::Error),

        #[error("failed to stream request body: {0}")]
        Body(#[source] io::Error),
    }

    type BodyOutcome = oneshot::Sender<io::Result<()>>;

    /// Request body fed from a pipe. The stream only ends cleanly once the
    /// producer reports success; otherwise it yields the producer's error and
    /// hyper aborts the request instead of sending the final chunk.
    fn body_pipe() -> (reqwest::Body, (DuplexStream, BodyOutcome)) {
        let (writer, reader) = tokio::io::duplex(BODY_PIPE_CAPACITY);
        let (tx, rx) = oneshot::channel::<io::Result<()>>();
        let outcome = stream::once(rx).filter_map(|outcome| async move {
            match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(Err::<Bytes, _>(e)),
                Err(_) => Some(Err(io::Error::other("request body producer dropped"))),
            }
        });
        let body = ReaderStream::new(reader).chain(outcome);
        (reqwest::Body::wrap_stream(body), (writer, tx))
    }

    async fn produce_body(
        content: &mut dyn Content,
        (mut writer, outcome): (DuplexStream, BodyOutcome),
    ) -> io::Result<()> {
        let produced = match content.write_to(&mut writer).await {
            Ok(()) => writer.shutdown().await,
            Err(e) => Err(e),
        };
        drop(writer);
        let reported = match &produced {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = outcome.send(reported);
        produced
    }

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
        base_url: String,
    }

    impl ReqwestClient {
        /// Create a client resolving request paths against `base_url`.
        pub fn new(base_url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        /// Wrap an existing reqwest client.
        pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
            Self {
                client,
                base_url: base_url.into(),
            }
        }

        fn url(&self, path: &str) -> String {
            let absolute = path.starts_with("http://") || path.starts_with("https://");
            if absolute || self.base_url.is_empty() {
                return path.to_string();
            }
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = ReqwestError;

        async fn send(&self, request: Request, mode: ReadMode) -> Result<Response, Self::Error> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };
            let mut builder = self.client.request(method, self.url(&request.path));
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = match request.body {
                None => builder.send().await?,
                Some(mut content) => {
                    for (name, value) in content.headers() {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    if let Some(length) = content.content_length() {
                        builder = builder.header(reqwest::header::CONTENT_LENGTH, length);
                    }

                    let (body, outcome) = body_pipe();
                    let builder = builder.body(body);
                    let produce = produce_body(content.as_mut(), outcome);

                    match tokio::join!(builder.send(), produce) {
                        (Ok(response), Ok(())) => response,
                        (_, Err(e)) if is_cancellation(&e) => return Err(ReqwestError::Body(e)),
                        (Err(e), Err(body)) if body.kind() == io::ErrorKind::BrokenPipe => {
                            return Err(e.into());
                        }
                        (_, Err(e)) => return Err(ReqwestError::Body(e)),
                        (Err(e), Ok(())) => return Err(e.into()),
                    }
                }
            };

            let head = ResponseHead {
                status: response.status().as_u16(),
                headers: response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect(),
                content_length: response.content_length(),
            };

            let body: BoxReader = match mode {
                ReadMode::Buffered => Box::new(io::Cursor::new(response.bytes().await?)),
                ReadMode::HeadersOnly => Box::new(StreamReader::new(Box::pin(
                    response.bytes_stream().map_err(io::Error::other),
                ))),
            };

            Ok(Response { head, body })
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{ReqwestClient, ReqwestError};

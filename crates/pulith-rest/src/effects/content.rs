use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Destination a request body is written into by the transport.
pub type BodyWriter<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Outbound request body.
///
/// The transport reads the headers and declared length first, then drives
/// [`write_to`](Content::write_to) exactly once with the connection's body sink.
/// Implementations stream: they never require the whole payload in memory.
#[async_trait]
pub trait Content: Send {
    /// Entity headers describing the body, e.g. `Content-Type`.
    fn headers(&self) -> &[(String, String)];

    /// Exact body length when it is known up front. `None` forces chunked encoding.
    fn content_length(&self) -> Option<u64>;

    /// Write the body into `dest`. Must not close `dest`.
    async fn write_to(&mut self, dest: BodyWriter<'_>) -> io::Result<()>;
}

/// In-memory body of known length.
#[derive(Debug, Clone)]
pub struct BytesContent {
    headers: Vec<(String, String)>,
    data: Bytes,
}

impl BytesContent {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            headers: Vec::new(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

#[async_trait]
impl Content for BytesContent {
    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    async fn write_to(&mut self, dest: BodyWriter<'_>) -> io::Result<()> {
        dest.write_all(&self.data).await?;
        dest.flush().await
    }
}

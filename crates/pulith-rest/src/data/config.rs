use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::data::message::ResponseHead;
use crate::serializer::{JsonSerializer, JsonSerializerConfig, Serializer};

/// Default size of the buffer used to move body bytes, in bytes.
pub const DEFAULT_TRANSFER_BUFFER_SIZE: usize = 16 * 1024;

/// Encoding applied to outbound bodies when a call asks for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    /// Bodies are sent as-is even when compression is requested.
    None,
    #[default]
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// The codec to compress with, or `None` for [`ContentEncoding::None`].
    pub fn codec(self) -> Option<Codec> {
        match self {
            ContentEncoding::None => None,
            ContentEncoding::Gzip => Some(Codec::Gzip),
            ContentEncoding::Deflate => Some(Codec::Deflate),
        }
    }
}

/// Streaming compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,

    /// Raw DEFLATE (RFC 1951) without a zlib wrapper.
    Deflate,
}

impl Codec {
    /// Token placed in the `Content-Encoding` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback used to discover a download's size when `Content-Length` is absent.
pub type LengthResolver = Arc<dyn Fn(&ResponseHead) -> Option<u64> + Send + Sync>;

static SHARED: Lazy<Arc<TransferConfig>> = Lazy::new(|| Arc::new(TransferConfig::default()));

/// Settings read by every transfer call.
///
/// A config is never mutated by the calls that read it; share it with `Arc` and build
/// a new one to change settings.
///
/// # Examples
///
/// ```
/// use pulith_rest::{ContentEncoding, ResponseHead, TransferConfig};
/// use std::sync::Arc;
///
/// let config = TransferConfig::default()
///     .with_encoding(ContentEncoding::Deflate)
///     .with_buffer_size(64 * 1024)
///     .with_length_resolver(Arc::new(|head: &ResponseHead| {
///         head.header("X-Total-Length").and_then(|v| v.parse().ok())
///     }));
/// assert_eq!(config.transfer_buffer_size, 64 * 1024);
/// ```
#[derive(Clone)]
pub struct TransferConfig<S = JsonSerializer> {
    /// Body serializer; also supplies the outbound `Content-Type`.
    pub serializer: S,

    /// Codec used when a call requests compression.
    ///
    /// Default: [`ContentEncoding::Gzip`]
    pub content_encoding: ContentEncoding,

    /// Chunk size for streaming copies.
    ///
    /// Default: 16 KiB
    pub transfer_buffer_size: usize,

    /// Consulted for the download size when the response has no `Content-Length`.
    ///
    /// Default: None
    pub length_resolver: Option<LengthResolver>,
}

impl Default for TransferConfig<JsonSerializer> {
    fn default() -> Self {
        Self::new(JsonSerializer::default())
    }
}

impl TransferConfig<JsonSerializer> {
    /// The process-wide default config.
    ///
    /// Built lazily on first use and never mutated afterwards.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Replace the serializer with a JSON serializer built from `config`.
    #[must_use]
    pub fn use_json_serializer(self, config: JsonSerializerConfig) -> Self {
        self.with_serializer(JsonSerializer::new(config))
    }
}

impl<S: Serializer> TransferConfig<S> {
    pub fn new(serializer: S) -> Self {
        Self {
            serializer,
            content_encoding: ContentEncoding::default(),
            transfer_buffer_size: DEFAULT_TRANSFER_BUFFER_SIZE,
            length_resolver: None,
        }
    }

    #[must_use]
    pub fn with_serializer<T: Serializer>(self, serializer: T) -> TransferConfig<T> {
        TransferConfig {
            serializer,
            content_encoding: self.content_encoding,
            transfer_buffer_size: self.transfer_buffer_size,
            length_resolver: self.length_resolver,
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, content_encoding: ContentEncoding) -> Self {
        self.content_encoding = content_encoding;
        self
    }

    /// Set the copy chunk size. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.transfer_buffer_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_length_resolver(mut self, resolver: LengthResolver) -> Self {
        self.length_resolver = Some(resolver);
        self
    }

    /// Expected body size: `Content-Length` first, then the resolver.
    pub fn resolve_length(&self, head: &ResponseHead) -> Option<u64> {
        head.content_length.or_else(|| {
            self.length_resolver
                .as_ref()
                .and_then(|resolve| resolve(head))
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for TransferConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferConfig")
            .field("serializer", &self.serializer)
            .field("content_encoding", &self.content_encoding)
            .field("transfer_buffer_size", &self.transfer_buffer_size)
            .field(
                "length_resolver",
                &self.length_resolver.as_ref().map(|_| "{ ... }"),
            )
            .finish()
    }
}

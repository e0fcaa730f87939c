//! Streaming compression of outbound bodies.

use std::io::{self, Write};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::trace;

use crate::data::Codec;
use crate::effects::content::{BodyWriter, Content};
use crate::error::is_cancellation;

const PIPE_CAPACITY: usize = 64 * 1024;
const CHUNK_SIZE: usize = 16 * 1024;

/// Wraps another body and compresses it on the fly.
///
/// Carries every header of the wrapped body plus `Content-Encoding`. The
/// compressed length is never known in advance.
pub struct CompressedContent {
    inner: Box<dyn Content>,
    codec: Codec,
    headers: Vec<(String, String)>,
}

impl CompressedContent {
    pub fn new(inner: Box<dyn Content>, codec: Codec) -> Self {
        let mut headers = inner.headers().to_vec();
        headers.push(("Content-Encoding".to_string(), codec.as_str().to_string()));
        Self {
            inner,
            codec,
            headers,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }
}

impl std::fmt::Debug for CompressedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedContent")
            .field("codec", &self.codec)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Content for CompressedContent {
    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    async fn write_to(&mut self, dest: BodyWriter<'_>) -> io::Result<()> {
        let (mut writer, mut reader) = tokio::io::duplex(PIPE_CAPACITY);
        let codec = self.codec;
        let inner = &mut self.inner;

        // A failed producer drops the pipe without shutting it down.
        let produce = async move {
            inner.write_to(&mut writer).await?;
            writer.shutdown().await
        };

        let sink = &mut *dest;
        let compress = async move {
            let mut encoder = Encoder::new(codec);
            let mut chunk = vec![0u8; CHUNK_SIZE];
            let mut emitted = 0u64;
            loop {
                let read = reader.read(&mut chunk).await?;
                if read == 0 {
                    break;
                }
                encoder.write_all(&chunk[..read])?;
                let output = encoder.take_output();
                if !output.is_empty() {
                    sink.write_all(&output).await?;
                    emitted += output.len() as u64;
                }
            }
            Ok::<_, io::Error>((encoder, emitted))
        };

        // The trailer is only written once the whole inner body made it through.
        let (encoder, emitted) = match tokio::join!(produce, compress) {
            (Err(e), _) if is_cancellation(&e) => return Err(e),
            (_, Err(e)) | (Err(e), Ok(_)) => return Err(e),
            (Ok(()), Ok(state)) => state,
        };
        let tail = encoder.finish()?;
        dest.write_all(&tail).await?;
        trace!(%codec, emitted = emitted + tail.len() as u64, "compressed body written");
        dest.flush().await
    }
}

// Compressed bytes accumulate in the Vec and are drained after every write.
enum Encoder {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(DeflateEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(codec: Codec) -> Self {
        match codec {
            Codec::Gzip => Encoder::Gzip(GzEncoder::new(Vec::new(), Compression::default())),
            Codec::Deflate => {
                Encoder::Deflate(DeflateEncoder::new(Vec::new(), Compression::default()))
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Encoder::Gzip(e) => e.write_all(data),
            Encoder::Deflate(e) => e.write_all(data),
        }
    }

    fn take_output(&mut self) -> Vec<u8> {
        match self {
            Encoder::Gzip(e) => std::mem::take(e.get_mut()),
            Encoder::Deflate(e) => std::mem::take(e.get_mut()),
        }
    }

    fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Encoder::Gzip(e) => e.finish(),
            Encoder::Deflate(e) => e.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::content::BytesContent;
    use flate2::read::{DeflateDecoder, GzDecoder};
    use std::io::Read;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_headers_extend_inner() {
        let inner = BytesContent::new(&b"{}"[..]).with_header("Content-Type", "application/json");
        let content = CompressedContent::new(Box::new(inner), Codec::Gzip);

        assert_eq!(content.content_length(), None);
        assert_eq!(
            content.headers(),
            &[
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Content-Encoding".to_string(), "gzip".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_gzip_round_trip() {
        let data = sample(200_000);
        let mut content =
            CompressedContent::new(Box::new(BytesContent::new(data.clone())), Codec::Gzip);

        let mut compressed = Vec::new();
        content.write_to(&mut compressed).await.unwrap();
        assert!(compressed.len() < data.len());

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, data);
    }

    #[tokio::test]
    async fn test_deflate_is_raw() {
        let data = sample(5_000);
        let mut content =
            CompressedContent::new(Box::new(BytesContent::new(data.clone())), Codec::Deflate);
        assert_eq!(content.headers()[0], ("Content-Encoding".into(), "deflate".into()));

        let mut compressed = Vec::new();
        content.write_to(&mut compressed).await.unwrap();

        let mut decoded = Vec::new();
        DeflateDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, data);
    }

    struct BrokenAfter(&'static [u8]);

    #[async_trait]
    impl Content for BrokenAfter {
        fn headers(&self) -> &[(String, String)] {
            &[]
        }

        fn content_length(&self) -> Option<u64> {
            None
        }

        async fn write_to(&mut self, dest: BodyWriter<'_>) -> io::Result<()> {
            dest.write_all(self.0).await?;
            Err(io::Error::other("source went away"))
        }
    }

    #[tokio::test]
    async fn test_failed_inner_body_leaves_stream_unterminated() {
        for codec in [Codec::Gzip, Codec::Deflate] {
            let mut content = CompressedContent::new(Box::new(BrokenAfter(b"hello")), codec);

            let mut compressed = Vec::new();
            let err = content.write_to(&mut compressed).await.unwrap_err();
            assert_eq!(err.to_string(), "source went away");

            let mut decoded = Vec::new();
            let decodable = match codec {
                Codec::Gzip => GzDecoder::new(&compressed[..]).read_to_end(&mut decoded),
                Codec::Deflate => DeflateDecoder::new(&compressed[..]).read_to_end(&mut decoded),
            };
            assert!(decodable.is_err() || decoded.is_empty(), "{codec}: {decoded:?}");
        }
    }

    #[tokio::test]
    async fn test_empty_body_still_produces_valid_stream() {
        let mut content =
            CompressedContent::new(Box::new(BytesContent::new(Vec::new())), Codec::Gzip);

        let mut compressed = Vec::new();
        content.write_to(&mut compressed).await.unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert!(decoded.is_empty());
    }
}

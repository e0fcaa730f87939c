use std::io;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, ReadBuf};

use crate::effects::copy::{Copier, CopyDestination, CopySource};
use crate::effects::upload::UploadFilter;

/// Upload filter that computes the SHA-256 of an entry while it is sent.
///
/// Bytes pass through unchanged and are still copied by the call's [`Copier`], so
/// progress and cancellation behave as for an unfiltered entry. The digest is
/// available once the upload has written the entry; sharing one filter across
/// several entries keeps the digest of the last one written.
///
/// # Examples
///
/// ```no_run
/// use pulith_rest::{Sha256Filter, TransferEntry};
/// use std::sync::Arc;
///
/// let checksum = Arc::new(Sha256Filter::new());
/// let entry = TransferEntry::from_bytes(&b"payload"[..], "file", "payload.bin")
///     .filter(checksum.clone());
/// // ... upload `entry`, then:
/// println!("{:?}", checksum.digest());
/// ```
#[derive(Debug, Default)]
pub struct Sha256Filter {
    digest: Mutex<Option<String>>,
}

impl Sha256Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower-case hex digest of the last entry written, if any.
    pub fn digest(&self) -> Option<String> {
        self.digest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl UploadFilter for Sha256Filter {
    async fn apply(
        &self,
        source: CopySource<'_>,
        destination: CopyDestination<'_>,
        copier: &mut Copier<'_>,
    ) -> io::Result<()> {
        let mut reader = HashingReader::new(source);
        copier.copy(&mut reader, destination).await?;

        let digest = hex::encode(reader.finalize());
        *self.digest.lock().unwrap_or_else(PoisonError::into_inner) = Some(digest);
        Ok(())
    }
}

/// Reader that hashes data as it passes through.
struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finalize(self) -> Vec<u8> {
        self.hasher.finalize().to_vec()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for HashingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.hasher.update(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}

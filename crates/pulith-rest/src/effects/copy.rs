//! Chunked, cancellable, progress-reporting stream copy.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::data::ProgressTracker;
use crate::error::cancelled_io;

/// Readable side of a copy.
pub type CopySource<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Writable side of a copy.
pub type CopyDestination<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Await `fut` unless `cancel` fires first.
///
/// Cancellation surfaces as an [`io::Error`] carrying the
/// [`Cancelled`](crate::error::Cancelled) marker.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled_io()),
        result = fut => result,
    }
}

/// The copy primitive shared by downloads, uploads and upload filters.
///
/// Owns one reusable buffer of the configured transfer size. Every chunk is read,
/// written in full, then reported to the tracker (if any). The destination is
/// flushed once when the source is exhausted. Cancellation is checked at every
/// read, write and flush; a cancelled copy leaves the destination partially
/// written.
pub struct Copier<'a> {
    buffer: Vec<u8>,
    tracker: Option<&'a mut ProgressTracker>,
    cancel: &'a CancellationToken,
}

impl<'a> Copier<'a> {
    pub fn new(
        buffer_size: usize,
        tracker: Option<&'a mut ProgressTracker>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            buffer: vec![0; buffer_size.max(1)],
            tracker,
            cancel,
        }
    }

    /// Copy `source` to `destination` until end of stream.
    ///
    /// Returns the number of bytes copied by this call.
    pub async fn copy(
        &mut self,
        source: CopySource<'_>,
        destination: CopyDestination<'_>,
    ) -> io::Result<u64> {
        let Self {
            buffer,
            tracker,
            cancel,
        } = self;
        let mut copied = 0u64;

        loop {
            let read = cancellable(cancel, source.read(buffer)).await?;
            if read == 0 {
                break;
            }

            cancellable(cancel, destination.write_all(&buffer[..read])).await?;
            copied += read as u64;
            trace!(chunk = read, copied, "copied chunk");

            if let Some(tracker) = tracker.as_deref_mut() {
                tracker.advance(read as u64);
            }
        }

        cancellable(cancel, destination.flush()).await?;
        Ok(copied)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for Copier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Copier")
            .field("buffer_size", &self.buffer.len())
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

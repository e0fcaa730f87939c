//! Multi-part upload bodies.
//!
//! [`UploadContent`] streams `multipart/form-data`: text fields first, then one part
//! per [`TransferEntry`], each copied through a single [`Copier`] so progress is
//! reported for the upload as a whole.

use std::fmt;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{
    PART_TERMINATOR, closing_delimiter, field_part_header, file_part_header, generate_boundary,
};
use crate::data::{ProgressCallback, ProgressTracker};
use crate::effects::content::{BodyWriter, Content};
use crate::effects::copy::{Copier, CopyDestination, CopySource, cancellable};
use crate::effects::http::BoxReader;

/// Transformation applied to an entry's bytes on their way into the request.
///
/// The filter owns the routing: it may wrap `source` or `destination`, and calls
/// [`Copier::copy`] to move the bytes so chunking, progress and cancellation keep
/// working. Filters that bypass the copier still upload, but report no progress.
#[async_trait]
pub trait UploadFilter: Send + Sync {
    async fn apply(
        &self,
        source: CopySource<'_>,
        destination: CopyDestination<'_>,
        copier: &mut Copier<'_>,
    ) -> io::Result<()>;
}

/// One streamed part of an upload.
///
/// The entry owns its source; it is read once, during the call it is passed to.
pub struct TransferEntry {
    source: BoxReader,
    length: Option<u64>,
    field_name: String,
    file_name: String,
    filter: Option<Arc<dyn UploadFilter>>,
}

impl TransferEntry {
    /// Entry of unknown length. Use [`with_length`](Self::with_length) when the size is
    /// known.
    pub fn new(
        source: impl AsyncRead + Send + Unpin + 'static,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            source: Box::new(source),
            length: None,
            field_name: field_name.into(),
            file_name: file_name.into(),
            filter: None,
        }
    }

    /// Declare the exact number of bytes `source` will yield.
    #[must_use]
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Entry backed by an in-memory buffer.
    pub fn from_bytes(
        data: impl Into<Bytes>,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let data = data.into();
        let length = data.len() as u64;
        Self::new(io::Cursor::new(data), field_name, file_name).with_length(length)
    }

    /// Entry over a seekable reader.
    ///
    /// The remaining length is probed by seeking to the end; the starting position
    /// is restored before the entry is returned.
    pub async fn seekable<R>(
        mut source: R,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> io::Result<Self>
    where
        R: AsyncRead + AsyncSeek + Send + Unpin + 'static,
    {
        let position = source.stream_position().await?;
        let end = source.seek(SeekFrom::End(0)).await?;
        source.seek(SeekFrom::Start(position)).await?;

        Ok(Self::new(source, field_name, file_name).with_length(end.saturating_sub(position)))
    }

    /// Entry reading the file at `path`. The part's file name is the path's final
    /// component.
    pub async fn open(path: impl AsRef<Path>, field_name: impl Into<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no file name in {}", path.display()),
                )
            })?;

        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        Ok(Self::new(file, field_name, file_name).with_length(length))
    }

    /// Route this entry's bytes through `filter`.
    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn UploadFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Source length if known without consuming it. Counts toward the progress total
    /// even when the entry is filtered.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Part length as announced to the transport: unknown once a filter may change
    /// the byte count.
    pub fn declared_length(&self) -> Option<u64> {
        match self.filter {
            Some(_) => None,
            None => self.length,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Debug for TransferEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEntry")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("length", &self.length)
            .field("filter", &self.filter.as_ref().map(|_| "{ ... }"))
            .finish_non_exhaustive()
    }
}

/// Streaming `multipart/form-data` body.
pub struct UploadContent {
    boundary: String,
    headers: Vec<(String, String)>,
    fields: Vec<(String, String)>,
    entries: Vec<TransferEntry>,
    buffer_size: usize,
    on_progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl UploadContent {
    pub fn new(
        fields: Vec<(String, String)>,
        entries: Vec<TransferEntry>,
        buffer_size: usize,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Self {
        let boundary = generate_boundary();
        let headers = vec![(
            "Content-Type".to_string(),
            format!("multipart/form-data; boundary={boundary}"),
        )];
        Self {
            boundary,
            headers,
            fields,
            entries,
            buffer_size,
            on_progress,
            cancel,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Progress total: the sum of every entry length, or `None` if any is unknown.
    pub fn total_size(&self) -> Option<u64> {
        self.entries.iter().map(TransferEntry::length).sum()
    }
}

impl fmt::Debug for UploadContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadContent")
            .field("boundary", &self.boundary)
            .field("fields", &self.fields)
            .field("entries", &self.entries)
            .field("buffer_size", &self.buffer_size)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Content for UploadContent {
    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn content_length(&self) -> Option<u64> {
        let terminator = PART_TERMINATOR.len() as u64;
        let mut total = closing_delimiter(&self.boundary).len() as u64;

        for (name, value) in &self.fields {
            total += field_part_header(&self.boundary, name).len() as u64;
            total += value.len() as u64 + terminator;
        }
        for entry in &self.entries {
            total += file_part_header(&self.boundary, &entry.field_name, &entry.file_name).len()
                as u64;
            total += entry.declared_length()? + terminator;
        }
        Some(total)
    }

    async fn write_to(&mut self, dest: BodyWriter<'_>) -> io::Result<()> {
        let total = self.total_size();
        let Self {
            boundary,
            fields,
            entries,
            buffer_size,
            on_progress,
            cancel,
            ..
        } = self;
        let cancel: &CancellationToken = cancel;
        debug!(
            fields = fields.len(),
            entries = entries.len(),
            total_bytes = ?total,
            "writing multipart body"
        );

        for (name, value) in fields.iter() {
            let part = format!("{}{value}{PART_TERMINATOR}", field_part_header(boundary, name));
            cancellable(cancel, dest.write_all(part.as_bytes())).await?;
        }

        let mut tracker = on_progress
            .clone()
            .map(|callback| ProgressTracker::new(callback, total));
        let mut copier = Copier::new(*buffer_size, tracker.as_mut(), cancel);

        for entry in entries.iter_mut() {
            let header = file_part_header(boundary, &entry.field_name, &entry.file_name);
            cancellable(cancel, dest.write_all(header.as_bytes())).await?;

            match &entry.filter {
                Some(filter) => filter.apply(&mut *entry.source, &mut *dest, &mut copier).await?,
                None => {
                    copier.copy(&mut *entry.source, &mut *dest).await?;
                }
            }

            cancellable(cancel, dest.write_all(PART_TERMINATOR.as_bytes())).await?;
        }

        let closing = closing_delimiter(boundary);
        cancellable(cancel, dest.write_all(closing.as_bytes())).await?;
        cancellable(cancel, dest.flush()).await
    }
}

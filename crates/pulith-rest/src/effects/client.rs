use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::data::{
    CallOptions, Method, ProgressTracker, ReadMode, ResponseEnvelope, TransferConfig,
};
use crate::effects::compress::CompressedContent;
use crate::effects::content::{BytesContent, Content};
use crate::effects::copy::{Copier, cancellable};
use crate::effects::http::{BoxReader, HttpClient, Request, Response};
use crate::effects::upload::{TransferEntry, UploadContent, UploadFilter};
use crate::error::{Error, Result, is_cancellation};
use crate::serializer::{JsonSerializer, Serializer};

/// REST transfer operations over an [`HttpClient`].
///
/// Every operation is total: it resolves to a [`ResponseEnvelope`] and never
/// returns `Err`. Branch on [`ResponseEnvelope::result`].
///
/// # Examples
///
/// ```no_run
/// use pulith_rest::{CallOptions, ReqwestClient, RestClient, TransferResult};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Item {
///     id: u32,
/// }
///
/// # async fn run() {
/// let rest = RestClient::new(ReqwestClient::new("https://api.example.com"));
/// let envelope = rest.get::<Item>("/items/1", CallOptions::default()).await;
/// if envelope.result() == TransferResult::Success {
///     println!("{}", envelope.payload().map(|i| i.id).unwrap_or_default());
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RestClient<C, S = JsonSerializer> {
    client: C,
    config: Arc<TransferConfig<S>>,
}

impl<C: HttpClient> RestClient<C> {
    /// Use the process-wide default config.
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: TransferConfig::shared(),
        }
    }
}

impl<C: HttpClient, S: Serializer> RestClient<C, S> {
    pub fn with_config(client: C, config: Arc<TransferConfig<S>>) -> Self {
        Self { client, config }
    }

    /// The same transport under a different config.
    pub fn configured<S2: Serializer>(&self, config: Arc<TransferConfig<S2>>) -> RestClient<C, S2>
    where
        C: Clone,
    {
        RestClient {
            client: self.client.clone(),
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &TransferConfig<S> {
        &self.config
    }

    /// GET `path` and decode the response body as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> ResponseEnvelope<T> {
        let mut status = 0;
        let outcome = self.run_get(path, &options, &mut status).await;
        finish(Method::Get, path, outcome, status)
    }

    /// POST `body` to `path`, ignoring the response body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: CallOptions,
    ) -> ResponseEnvelope<()> {
        let mut status = 0;
        let outcome = self.run_post(path, body, &options, &mut status).await;
        finish(Method::Post, path, outcome, status)
    }

    /// POST `body` to `path` and decode the response body as `T`.
    pub async fn post_for<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: CallOptions,
    ) -> ResponseEnvelope<T> {
        let mut status = 0;
        let outcome = self.run_post_for(path, body, &options, &mut status).await;
        finish(Method::Post, path, outcome, status)
    }

    /// Stream the body of `path` into `destination`.
    ///
    /// The response is read as it arrives. Non-2xx responses leave `destination`
    /// untouched. On failure `destination` may hold a partial body.
    pub async fn download<W>(
        &self,
        path: &str,
        destination: &mut W,
        options: CallOptions,
    ) -> ResponseEnvelope<()>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let mut status = 0;
        let outcome = self
            .run_download(path, destination, &options, &mut status)
            .await;
        finish(Method::Get, path, outcome, status)
    }

    /// Download `path` into a newly created file at `file`.
    ///
    /// The file is removed again unless the call ends in
    /// [`Success`](crate::TransferResult::Success), including when the returned
    /// future is dropped before completion.
    pub async fn download_to_file(
        &self,
        path: &str,
        file: impl AsRef<Path>,
        options: CallOptions,
    ) -> ResponseEnvelope<()> {
        let target = file.as_ref();
        // Declared before the file so the handle is closed before removal.
        let mut partial = PartialFile::new(target);
        // Created synchronously: the guard is armed before the first await.
        let mut output = match std::fs::File::create(target) {
            Ok(output) => tokio::fs::File::from_std(output),
            Err(e) => return finish(Method::Get, path, Err(e.into()), 0),
        };
        partial.remove = true;

        let envelope = self.download(path, &mut output, options).await;
        drop(output);

        partial.remove = !envelope.is_success();
        envelope
    }

    /// Upload a single entry as `multipart/form-data`.
    pub async fn upload(
        &self,
        path: &str,
        entry: TransferEntry,
        options: CallOptions,
    ) -> ResponseEnvelope<()> {
        self.upload_entries(path, vec![entry], options).await
    }

    /// Upload the file at `file` under `field_name`, optionally through `filter`.
    pub async fn upload_file(
        &self,
        path: &str,
        file: impl AsRef<Path>,
        field_name: &str,
        filter: Option<Arc<dyn UploadFilter>>,
        options: CallOptions,
    ) -> ResponseEnvelope<()> {
        let entry = match TransferEntry::open(file, field_name).await {
            Ok(entry) => entry,
            Err(e) => return finish(Method::Post, path, Err(e.into()), 0),
        };
        let entry = match filter {
            Some(filter) => entry.filter(filter),
            None => entry,
        };
        self.upload(path, entry, options).await
    }

    /// Upload every entry as one `multipart/form-data` body, preceded by
    /// [`CallOptions::parameters`] as text fields.
    pub async fn upload_entries(
        &self,
        path: &str,
        entries: Vec<TransferEntry>,
        options: CallOptions,
    ) -> ResponseEnvelope<()> {
        let mut status = 0;
        let outcome = self
            .run_upload(path, entries, &options, &mut status)
            .await;
        finish(Method::Post, path, outcome, status)
    }

    async fn run_get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &CallOptions,
        status: &mut u16,
    ) -> Result<ResponseEnvelope<T>> {
        let request = build_request(Method::Get, path, options);
        let response = self
            .dispatch(request, ReadMode::Buffered, &options.cancel)
            .await?;

        *status = response.head.status;
        if !response.head.is_success() {
            return Ok(ResponseEnvelope::http_error(*status));
        }

        let value = self
            .read_payload(response.body, *status, &options.cancel)
            .await?;
        Ok(ResponseEnvelope::success(*status, Some(value)))
    }

    async fn run_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: &CallOptions,
        status: &mut u16,
    ) -> Result<ResponseEnvelope<()>> {
        let response = self.send_post(path, body, options).await?;

        *status = response.head.status;
        if !response.head.is_success() {
            return Ok(ResponseEnvelope::http_error(*status));
        }
        Ok(ResponseEnvelope::success(*status, None))
    }

    async fn run_post_for<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: &CallOptions,
        status: &mut u16,
    ) -> Result<ResponseEnvelope<T>> {
        let response = self.send_post(path, body, options).await?;

        *status = response.head.status;
        if !response.head.is_success() {
            return Ok(ResponseEnvelope::http_error(*status));
        }

        let value = self
            .read_payload(response.body, *status, &options.cancel)
            .await?;
        Ok(ResponseEnvelope::success(*status, Some(value)))
    }

    async fn run_download<W>(
        &self,
        path: &str,
        destination: &mut W,
        options: &CallOptions,
        status: &mut u16,
    ) -> Result<ResponseEnvelope<()>>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let request = build_request(Method::Get, path, options);
        let mut response = self
            .dispatch(request, ReadMode::HeadersOnly, &options.cancel)
            .await?;

        *status = response.head.status;
        if !response.head.is_success() {
            return Ok(ResponseEnvelope::http_error(*status));
        }

        let total = self.config.resolve_length(&response.head);
        let mut tracker = options
            .on_progress
            .clone()
            .map(|callback| ProgressTracker::new(callback, total));
        let copied = Copier::new(
            self.config.transfer_buffer_size,
            tracker.as_mut(),
            &options.cancel,
        )
        .copy(&mut *response.body, destination)
        .await?;

        debug!(path, copied, total_bytes = ?total, "download finished");
        Ok(ResponseEnvelope::success(*status, None))
    }

    async fn run_upload(
        &self,
        path: &str,
        entries: Vec<TransferEntry>,
        options: &CallOptions,
        status: &mut u16,
    ) -> Result<ResponseEnvelope<()>> {
        let content = UploadContent::new(
            options.parameters.clone(),
            entries,
            self.config.transfer_buffer_size,
            options.on_progress.clone(),
            options.cancel.clone(),
        );
        let request = build_request(Method::Post, path, options).with_body(Box::new(content));
        let response = self
            .dispatch(request, ReadMode::Buffered, &options.cancel)
            .await?;

        *status = response.head.status;
        if !response.head.is_success() {
            return Ok(ResponseEnvelope::http_error(*status));
        }
        Ok(ResponseEnvelope::success(*status, None))
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: &CallOptions,
    ) -> Result<Response> {
        let serializer = &self.config.serializer;
        let mut payload = Vec::new();
        serializer
            .serialize(&mut payload, body)
            .map_err(|e| Error::serialize(0, e))?;

        let content = BytesContent::new(payload).with_header("Content-Type", serializer.content_type());
        let content: Box<dyn Content> = match self.config.content_encoding.codec() {
            Some(codec) if options.compress => {
                Box::new(CompressedContent::new(Box::new(content), codec))
            }
            _ => Box::new(content),
        };

        let request = build_request(Method::Post, path, options).with_body(content);
        self.dispatch(request, ReadMode::Buffered, &options.cancel)
            .await
    }

    async fn dispatch(
        &self,
        request: Request,
        mode: ReadMode,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        debug!(method = %request.method, path = %request.path, ?mode, "dispatching request");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.client.send(request, mode) => result.map_err(Error::transport),
        }
    }

    async fn read_payload<T: DeserializeOwned>(
        &self,
        mut body: BoxReader,
        status: u16,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let mut bytes = Vec::new();
        cancellable(cancel, body.read_to_end(&mut bytes))
            .await
            .map_err(|e| {
                if is_cancellation(&e) {
                    Error::Cancelled
                } else {
                    Error::serialize(status, e)
                }
            })?;

        self.config
            .serializer
            .deserialize(&bytes)
            .map_err(|e| Error::serialize(status, e))
    }
}

fn build_request(method: Method, path: &str, options: &CallOptions) -> Request {
    Request::new(method, path).with_headers(options.headers.to_pairs())
}

// Single conversion point from the internal error flow to the caller's envelope.
fn finish<T>(
    method: Method,
    path: &str,
    outcome: Result<ResponseEnvelope<T>>,
    observed_status: u16,
) -> ResponseEnvelope<T> {
    let envelope = match outcome {
        Ok(envelope) => envelope,
        Err(error) => ResponseEnvelope::failure(error, observed_status),
    };
    match envelope.error() {
        Some(error) => debug!(
            %method, path,
            status = envelope.status_code(),
            result = %envelope.result(),
            %error,
            "call failed"
        ),
        None => debug!(
            %method, path,
            status = envelope.status_code(),
            result = %envelope.result(),
            "call completed"
        ),
    }
    envelope
}

/// Removes a download target on drop while `remove` is set.
struct PartialFile<'a> {
    path: &'a Path,
    remove: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            remove: false,
        }
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.remove {
            return;
        }
        if let Err(e) = std::fs::remove_file(self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove partial download");
        }
    }
}

use std::sync::Arc;

/// Snapshot of a streaming transfer, passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes moved so far across the whole call.
    pub processed_bytes: u64,

    /// Total expected bytes, if known.
    ///
    /// Unknown when the response carries no usable length or an upload entry
    /// cannot report its size without being consumed.
    pub total_bytes: Option<u64>,

    /// `processed_bytes * 100 / total_bytes`, truncated and capped at 100.
    /// `None` whenever `total_bytes` is unknown.
    pub percent: Option<u64>,
}

impl Progress {
    #[must_use]
    pub fn new(processed_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            processed_bytes,
            total_bytes,
            percent: total_bytes.map(|total| percent(processed_bytes, total)),
        }
    }

    /// Returns `true` once every expected byte has been moved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_bytes == Some(self.processed_bytes)
    }
}

fn percent(processed: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    let raw = u128::from(processed) * 100 / u128::from(total);
    raw.min(100) as u64
}

/// Callback invoked after every chunk moved by a transfer.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Running byte counter for one call, shared by every part of that call.
pub struct ProgressTracker {
    callback: ProgressCallback,
    total_bytes: Option<u64>,
    processed_bytes: u64,
}

impl ProgressTracker {
    pub fn new(callback: ProgressCallback, total_bytes: Option<u64>) -> Self {
        Self {
            callback,
            total_bytes,
            processed_bytes: 0,
        }
    }

    /// Account for `bytes` more bytes and notify the callback.
    pub fn advance(&mut self, bytes: u64) {
        self.processed_bytes += bytes;
        (self.callback)(&Progress::new(self.processed_bytes, self.total_bytes));
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_bytes", &self.total_bytes)
            .field("processed_bytes", &self.processed_bytes)
            .field("callback", &"{ ... }")
            .finish()
    }
}

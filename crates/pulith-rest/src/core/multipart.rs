//! `multipart/form-data` framing (RFC 7578).
//!
//! A body is a sequence of parts, each introduced by `--boundary` and a header block,
//! followed by the part bytes and [`PART_TERMINATOR`], and closed by
//! [`closing_delimiter`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Bytes written after every part's content.
pub const PART_TERMINATOR: &str = "\r\n";

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Produce a boundary unlikely to occur inside any part.
///
/// Unique per call within a process.
pub fn generate_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let sequence = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("pulith-{nanos:016x}-{sequence:08x}")
}

/// Header block for a literal text field.
pub fn field_part_header(boundary: &str, name: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
        escape_quoted(name)
    )
}

/// Header block for a streamed file part.
pub fn file_part_header(boundary: &str, name: &str, file_name: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        escape_quoted(name),
        escape_quoted(file_name)
    )
}

/// Final delimiter ending the body.
pub fn closing_delimiter(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

// Percent-encode the characters that would break a quoted-string parameter,
// the same set HTML form submission escapes.
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("%22"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            other => escaped.push(other),
        }
    }
    escaped
}

//! Body serializers.
//!
//! A [`Serializer`] turns request values into bytes and response bytes into values,
//! and names the `Content-Type` of what it produces.

mod json;
#[cfg(feature = "postcard")]
mod binary;

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SerializeError;

pub use json::{JsonSerializer, JsonSerializerConfig};
#[cfg(feature = "postcard")]
pub use binary::PostcardSerializer;

/// Encoding contract between transfer operations and a body format.
pub trait Serializer: Send + Sync + 'static {
    /// Media type sent as `Content-Type` for serialized request bodies.
    fn content_type(&self) -> &str;

    /// Write `value` to `writer`.
    fn serialize<W, T>(&self, writer: W, value: &T) -> Result<(), SerializeError>
    where
        W: io::Write,
        T: Serialize + ?Sized;

    /// Decode a complete body.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned;
}

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Serializer;
use crate::error::SerializeError;

/// Compact binary bodies through `postcard`.
#[derive(Debug, Clone, Default)]
pub struct PostcardSerializer;

impl Serializer for PostcardSerializer {
    fn content_type(&self) -> &str {
        "application/octet-stream"
    }

    fn serialize<W, T>(&self, mut writer: W, value: &T) -> Result<(), SerializeError>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        let bytes = postcard::to_stdvec(value)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned,
    {
        Ok(postcard::from_bytes(bytes)?)
    }
}

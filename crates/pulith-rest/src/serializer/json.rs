use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Serializer;
use crate::error::SerializeError;

/// Settings for [`JsonSerializer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSerializerConfig {
    /// Default: `application/json`
    pub content_type: String,

    /// Emit indented JSON.
    ///
    /// Default: false
    pub pretty: bool,
}

impl Default for JsonSerializerConfig {
    fn default() -> Self {
        Self {
            content_type: "application/json".to_string(),
            pretty: false,
        }
    }
}

impl JsonSerializerConfig {
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// JSON bodies through `serde_json`.
///
/// Field naming follows the types' own serde attributes, e.g.
/// `#[serde(rename_all = "camelCase")]`.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    config: JsonSerializerConfig,
}

impl JsonSerializer {
    pub fn new(config: JsonSerializerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JsonSerializerConfig {
        &self.config
    }
}

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &str {
        &self.config.content_type
    }

    fn serialize<W, T>(&self, writer: W, value: &T) -> Result<(), SerializeError>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        if self.config.pretty {
            serde_json::to_writer_pretty(writer, value)?;
        } else {
            serde_json::to_writer(writer, value)?;
        }
        Ok(())
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }
}

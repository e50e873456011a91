//! Conversion of complete, buffered JSON values into caller types.
//!
//! The reader only ever hands a decoder the raw bytes of one complete value
//! (a container it has verified is fully buffered, or a scalar the cheap
//! probe could not convert). Which strategy performs the conversion is chosen
//! when the reader is constructed.

use serde::de::DeserializeOwned;

/// Converts the raw bytes of one complete JSON value into `T`.
pub trait TypeDecoder {
    /// # Errors
    ///
    /// Returns the decoder's error when the bytes do not describe a `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error>;
}

/// Decodes straight from the bytes with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeDecoder;

impl TypeDecoder for SerdeDecoder {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Decodes through an intermediate [`serde_json::Value`] tree.
///
/// Slower than [`SerdeDecoder`], but the value is fully validated before `T`
/// sees any of it, and types relying on `deserialize_any` see exactly the
/// same shapes as when converting a [`JsonToken`](crate::JsonToken).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueDecoder;

impl TypeDecoder for ValueDecoder {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        serde_json::from_value(value)
    }
}

use futures::io::AsyncRead;
use serde::Deserialize;

use super::{ResponseAttributes, StreamingResult};
use crate::{
    decoder::{SerdeDecoder, TypeDecoder},
    error::Error,
    reader::JsonStreamReader,
    value::{ScalarValue, ValueKind},
};

/// Attributes of a view response.
///
/// Successful responses carry `total_rows`; error documents carry `error`
/// and `reason` instead of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewMetaData {
    /// Rows in the whole view, not only the ones returned.
    pub total_rows: Option<u64>,
    /// Error name of an error document.
    pub error: Option<String>,
    /// Explanation accompanying `error`.
    pub reason: Option<String>,
}

impl ResponseAttributes for ViewMetaData {
    fn rows_property(&self) -> &str {
        "rows"
    }

    async fn read_attribute<R, D>(
        &mut self,
        path: &str,
        reader: &mut JsonStreamReader<R, D>,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
        D: TypeDecoder,
    {
        match (path, reader.current_value_kind()) {
            ("total_rows", Some(ValueKind::Integer)) => {
                // Left in place; a count outside `u64` is ignored.
                self.total_rows = reader.current_value()?.as_ref().and_then(ScalarValue::as_u64);
                if self.total_rows.is_none() {
                    log::debug!("ignoring out-of-range total_rows");
                }
            }
            ("error", Some(ValueKind::String)) => {
                self.error = Some(reader.read_object_or_scalar().await?);
            }
            ("reason", Some(ValueKind::String)) => {
                self.reason = Some(reader.read_object_or_scalar().await?);
            }
            _ => {}
        }
        Ok(())
    }
}

/// One row of a view response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewRow<K, V> {
    /// Id of the emitting document; absent for reduced rows.
    pub id: Option<String>,
    /// Key emitted by the map function.
    pub key: Option<K>,
    /// Value emitted by the map or reduce function.
    pub value: Option<V>,
}

/// A streamed view response with rows keyed by `K` carrying `V`.
pub type ViewResult<'r, R, K, V, D = SerdeDecoder> =
    StreamingResult<'r, R, D, ViewMetaData, ViewRow<K, V>>;

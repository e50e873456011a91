use futures::executor::block_on;

use crate::{
    Error, JsonStreamReader, ReaderOptions, ValueKind, chunk_utils::ChunkedReader,
    decoder::TypeDecoder,
};

/// A reader over `json` served `chunk_size` bytes at a time into a buffer
/// starting at `buffer_size` bytes.
pub(crate) fn chunked_reader(
    json: &[u8],
    chunk_size: usize,
    buffer_size: usize,
) -> JsonStreamReader<ChunkedReader> {
    JsonStreamReader::new(
        ChunkedReader::new(json, chunk_size),
        ReaderOptions {
            buffer_size,
            ..Default::default()
        },
    )
}

/// Every property path in document order, with the kind of the value that
/// follows it.
pub(crate) fn property_trace<D: TypeDecoder>(
    reader: &mut JsonStreamReader<ChunkedReader, D>,
) -> Result<Vec<(String, Option<ValueKind>)>, Error> {
    block_on(async {
        reader.initialize().await?;
        let mut trace = Vec::new();
        while let Some(path) = reader.read_to_next_property().await? {
            let path = path.to_owned();
            trace.push((path, reader.current_value_kind()));
        }
        Ok(trace)
    })
}

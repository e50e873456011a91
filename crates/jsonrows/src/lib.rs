//! Incremental JSON reading for large row-oriented responses.
//!
//! Query and view services answer with one JSON object holding a few
//! attributes and one potentially huge array of rows. This crate reads such
//! documents straight off an asynchronous byte source, hands out rows one at
//! a time as soon as their bytes have arrived, and never buffers more than
//! the largest single value it is asked to decode.
//!
//! The layers, bottom-up:
//!
//! - [`Tokenizer`] is a restartable tokenizer over a window of bytes. When it
//!   runs out of input it says so without changing its committed
//!   [`ReaderState`].
//! - [`JsonStreamReader`] owns a pooled, growable buffer, keeps the
//!   [`PathSegment`] stack of where it is in the document, and offers
//!   pull-style operations: jump to the next property, read a value into a
//!   type, enumerate an array lazily.
//! - [`StreamingResult`] implements the response protocol on top: leading
//!   attributes, rows, trailing attributes. [`ViewMetaData`] and
//!   [`QueryMetaData`] know the attributes of view and query responses.
//!
//! ```rust
//! use futures::{executor::block_on, io::Cursor};
//! use jsonrows::{JsonStreamReader, ReaderOptions, ViewResult};
//!
//! let body = br#"{"total_rows": 2, "rows": [
//!     {"id": "a", "key": 1, "value": null},
//!     {"id": "b", "key": 2, "value": null}
//! ]}"#;
//! let mut reader = JsonStreamReader::new(Cursor::new(&body[..]), ReaderOptions::default());
//! let mut result = ViewResult::<_, u32, ()>::new(&mut reader);
//!
//! block_on(async {
//!     result.initialize().await?;
//!     assert_eq!(result.metadata().total_rows, Some(2));
//!     let mut rows = result.rows()?;
//!     while let Some(row) = rows.next().await? {
//!         println!("{:?} => {:?}", row.id, row.key);
//!     }
//!     assert!(result.is_finished());
//!     Ok::<_, jsonrows::ResultError>(())
//! })
//! .unwrap();
//! ```

mod buffer;
mod decoder;
mod error;
mod escape;
mod options;
mod path;
mod pool;
mod reader;
mod result;
mod token;
mod tokenizer;
mod value;

/// Chunked byte sources for tests, benchmarks and fuzzing.
#[doc(hidden)]
pub mod chunk_utils;

#[cfg(test)]
mod tests;

pub use decoder::{SerdeDecoder, TypeDecoder, ValueDecoder};
pub use error::{Error, ErrorKind, ResultError, SyntaxError};
pub use options::{
    CommentHandling, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT, ReaderOptions,
};
pub use path::{PathSegment, PathTracker};
pub use pool::{BufferPool, PooledBuffer};
pub use reader::{ArrayReader, ElementReader, JsonStreamReader, ReadObject, ReadToken};
pub use result::{
    Attributes, QueryMetaData, QueryMetrics, QueryProblem, QueryResult, QueryStatus,
    ResponseAttributes, Rows, StreamingResult, UnknownStatus, ViewMetaData, ViewResult, ViewRow,
};
pub use token::JsonToken;
pub use tokenizer::{ReaderState, TokenKind, TokenizeError, Tokenizer};
pub use value::{ScalarValue, ValueKind};

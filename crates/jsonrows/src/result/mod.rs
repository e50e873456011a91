//! Streaming consumers for responses shaped as leading attributes, one large
//! row array, and trailing attributes.
//!
//! A [`StreamingResult`] reads the attributes in front of the row array on
//! [`initialize`](StreamingResult::initialize), hands out the rows lazily
//! through [`Rows`], and reads the attributes behind the array once the last
//! row has been read. The attribute set is pluggable through
//! [`ResponseAttributes`]; [`ViewMetaData`], [`QueryMetaData`] and
//! [`Attributes`] cover view responses, query responses and ad-hoc shapes.

mod attributes;
mod query;
mod view;

use std::marker::PhantomData;

use futures::io::AsyncRead;
use serde::de::DeserializeOwned;

pub use self::{
    attributes::Attributes,
    query::{
        QueryMetaData, QueryMetrics, QueryProblem, QueryResult, QueryStatus, UnknownStatus,
    },
    view::{ViewMetaData, ViewResult, ViewRow},
};
use crate::{
    decoder::TypeDecoder,
    error::{Error, ResultError},
    reader::{ArrayProgress, JsonStreamReader, ReadObject},
};

/// The attributes of a response outside its row array.
pub trait ResponseAttributes {
    /// Name of the top-level property holding the rows.
    fn rows_property(&self) -> &str;

    /// Called with the reader positioned on the property at `path`, before
    /// its value. The value may be consumed; if it is left in place, the
    /// reader walks into it on the next property search.
    ///
    /// # Errors
    ///
    /// Any reader error while consuming the value.
    #[expect(async_fn_in_trait)]
    async fn read_attribute<R, D>(
        &mut self,
        path: &str,
        reader: &mut JsonStreamReader<R, D>,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
        D: TypeDecoder;
}

/// A response read as leading attributes, rows, trailing attributes.
///
/// Rows can be enumerated at most once. When the document has no row array
/// at all, the result is finished after initialization and enumerates zero
/// rows.
#[derive(Debug)]
pub struct StreamingResult<'r, R, D, M, T> {
    reader: &'r mut JsonStreamReader<R, D>,
    metadata: M,
    initialized: bool,
    has_entered_rows: bool,
    has_consumed_rows: bool,
    has_finished: bool,
    has_failed: bool,
    rows: PhantomData<fn() -> T>,
}

impl<'r, R, D, M, T> StreamingResult<'r, R, D, M, T>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
    M: ResponseAttributes,
    T: DeserializeOwned,
{
    /// Creates a result over `reader` with default attributes.
    pub fn new(reader: &'r mut JsonStreamReader<R, D>) -> Self
    where
        M: Default,
    {
        Self::with_metadata(reader, M::default())
    }

    /// Creates a result over `reader` filling in `metadata`.
    pub fn with_metadata(reader: &'r mut JsonStreamReader<R, D>, metadata: M) -> Self {
        Self {
            reader,
            metadata,
            initialized: false,
            has_entered_rows: false,
            has_consumed_rows: false,
            has_finished: false,
            has_failed: false,
            rows: PhantomData,
        }
    }

    /// Initializes the reader and reads the attributes in front of the rows.
    ///
    /// # Errors
    ///
    /// Fails with [`ResultError::AlreadyInitialized`] on a second call and
    /// with [`ResultError::DecodeFailure`] for malformed or truncated input.
    pub async fn initialize(&mut self) -> Result<(), ResultError> {
        if self.initialized {
            return Err(ResultError::AlreadyInitialized);
        }
        self.initialized = true;
        let read = self.read_leading().await;
        self.has_failed = read.is_err();
        read
    }

    async fn read_leading(&mut self) -> Result<(), ResultError> {
        if !self.reader.initialize().await? {
            log::debug!("empty response");
            self.has_finished = true;
            return Ok(());
        }
        self.read_attributes().await
    }

    /// The rows, as a forward-only enumeration.
    ///
    /// # Errors
    ///
    /// Fails with [`ResultError::StreamAlreadyRead`] when called a second
    /// time, with [`ResultError::NotInitialized`] before
    /// [`initialize`](Self::initialize), and with [`ResultError::Failed`]
    /// after a failed read.
    pub fn rows(&mut self) -> Result<Rows<'_, 'r, R, D, M, T>, ResultError> {
        if self.has_failed {
            return Err(ResultError::Failed);
        }
        if self.has_consumed_rows {
            return Err(ResultError::StreamAlreadyRead);
        }
        let progress = if self.has_finished {
            ArrayProgress::Done
        } else if self.has_entered_rows {
            ArrayProgress::Start
        } else {
            return Err(ResultError::NotInitialized);
        };
        self.has_consumed_rows = true;
        Ok(Rows {
            result: self,
            progress,
        })
    }

    /// The attributes read so far.
    #[must_use]
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Consumes the result, returning its attributes.
    #[must_use]
    pub fn into_metadata(self) -> M {
        self.metadata
    }

    /// Whether the whole response has been read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.has_finished
    }

    /// Reads attributes until the row array or the end of the document.
    async fn read_attributes(&mut self) -> Result<(), ResultError> {
        while let Some(path) = self
            .reader
            .read_to_next_property()
            .await?
            .map(str::to_owned)
        {
            if !self.has_entered_rows && path == self.metadata.rows_property() {
                log::debug!("entering row array '{path}'");
                self.has_entered_rows = true;
                return Ok(());
            }
            self.metadata
                .read_attribute(&path, &mut *self.reader)
                .await?;
        }
        self.has_finished = true;
        Ok(())
    }
}

/// Forward-only enumeration of the rows of a [`StreamingResult`].
///
/// When the row array ends, the trailing attributes are read before `None`
/// is returned.
#[derive(Debug)]
pub struct Rows<'a, 'r, R, D, M, T> {
    result: &'a mut StreamingResult<'r, R, D, M, T>,
    progress: ArrayProgress,
}

impl<R, D, M, T> Rows<'_, '_, R, D, M, T>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
    M: ResponseAttributes,
    T: DeserializeOwned,
{
    /// The next row, or `None` once every row and the trailing attributes
    /// have been read.
    ///
    /// # Errors
    ///
    /// Fails with [`ResultError::DecodeFailure`] for malformed or truncated
    /// input and passes other reader errors through. Once a call has failed,
    /// every later call fails with [`ResultError::Failed`].
    pub async fn next(&mut self) -> Result<Option<T>, ResultError> {
        if self.result.has_failed {
            return Err(ResultError::Failed);
        }
        let next = self.read_next().await;
        self.result.has_failed = next.is_err();
        next
    }

    async fn read_next(&mut self) -> Result<Option<T>, ResultError> {
        if self.result.has_finished {
            return Ok(None);
        }
        let row = self
            .result
            .reader
            .next_element(&mut self.progress, &mut ReadObject::<T>::new())
            .await?;
        if row.is_none() {
            log::debug!("row array finished, reading trailing attributes");
            self.result.read_attributes().await?;
        }
        Ok(row)
    }

    /// Reads every remaining row.
    ///
    /// # Errors
    ///
    /// Stops at the first error.
    pub async fn try_collect(mut self) -> Result<Vec<T>, ResultError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

use std::marker::PhantomData;

use futures::io::AsyncRead;
use serde::de::DeserializeOwned;

use super::{JsonStreamReader, Result};
use crate::{decoder::TypeDecoder, token::JsonToken, tokenizer::TokenKind};

/// Reads one array element from a reader positioned before it.
#[expect(async_fn_in_trait)]
pub trait ElementReader<R, D> {
    /// What one element decodes to.
    type Output;

    /// Reads the element at the cursor.
    ///
    /// # Errors
    ///
    /// Any error of the underlying read.
    async fn read_element(&mut self, reader: &mut JsonStreamReader<R, D>) -> Result<Self::Output>;
}

/// Decodes each element into `T` with
/// [`read_object_or_scalar`](JsonStreamReader::read_object_or_scalar).
pub struct ReadObject<T>(PhantomData<fn() -> T>);

impl<T> ReadObject<T> {
    /// Creates the element reader.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ReadObject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ReadObject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReadObject")
    }
}

impl<R, D, T> ElementReader<R, D> for ReadObject<T>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
    T: DeserializeOwned,
{
    type Output = T;

    async fn read_element(&mut self, reader: &mut JsonStreamReader<R, D>) -> Result<T> {
        reader.read_object_or_scalar().await
    }
}

/// Reads each element as a [`JsonToken`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadToken;

impl<R, D> ElementReader<R, D> for ReadToken
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
{
    type Output = JsonToken;

    async fn read_element(&mut self, reader: &mut JsonStreamReader<R, D>) -> Result<JsonToken> {
        reader.read_token().await
    }
}

/// Progress through one array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ArrayProgress {
    #[default]
    Start,
    Elements,
    Done,
}

impl<R, D> JsonStreamReader<R, D>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
{
    /// Reads the next element of the array tracked by `progress`, consuming
    /// the `[` first if needed. Returns `None` once the next token is `]`,
    /// which is left for the following read.
    pub(crate) async fn next_element<E>(
        &mut self,
        progress: &mut ArrayProgress,
        element_reader: &mut E,
    ) -> Result<Option<E::Output>>
    where
        E: ElementReader<R, D>,
    {
        match *progress {
            ArrayProgress::Done => return Ok(None),
            ArrayProgress::Start => {
                self.read_array_start().await?;
                *progress = ArrayProgress::Elements;
            }
            ArrayProgress::Elements => self.ensure_usable()?,
        }
        let (next, _) = self.peek().await?;
        if next == TokenKind::EndArray {
            *progress = ArrayProgress::Done;
            return Ok(None);
        }
        element_reader.read_element(self).await.map(Some)
    }
}

/// A lazy, forward-only enumeration of the elements of one array.
///
/// Obtained from [`JsonStreamReader::read_array`]. Elements are read on
/// demand; tokens are consumed as they are read, so an array can be
/// enumerated only once.
#[derive(Debug)]
pub struct ArrayReader<'r, R, D, E> {
    reader: &'r mut JsonStreamReader<R, D>,
    element_reader: E,
    progress: ArrayProgress,
}

impl<'r, R, D, E> ArrayReader<'r, R, D, E>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
    E: ElementReader<R, D>,
{
    pub(crate) fn new(reader: &'r mut JsonStreamReader<R, D>, element_reader: E) -> Self {
        Self {
            reader,
            element_reader,
            progress: ArrayProgress::Start,
        }
    }

    /// The next element, or `None` at the end of the array.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotAtArrayStart`](crate::Error::NotAtArrayStart)
    /// when the reader is not positioned before an array, and with any error
    /// of reading an element.
    pub async fn next(&mut self) -> Result<Option<E::Output>> {
        self.reader
            .next_element(&mut self.progress, &mut self.element_reader)
            .await
    }

    /// Reads every remaining element.
    ///
    /// # Errors
    ///
    /// Stops at the first error.
    pub async fn try_collect(mut self) -> Result<Vec<E::Output>> {
        let mut out = Vec::new();
        while let Some(element) = self.next().await? {
            out.push(element);
        }
        Ok(out)
    }

    /// Whether the closing `]` has been reached.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.progress == ArrayProgress::Done
    }

    /// The underlying reader, e.g. to inspect the path between elements.
    pub fn reader_mut(&mut self) -> &mut JsonStreamReader<R, D> {
        self.reader
    }
}

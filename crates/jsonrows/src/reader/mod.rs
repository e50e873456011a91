//! The incremental token reader.
//!
//! [`JsonStreamReader`] pulls bytes from an [`AsyncRead`] source into a
//! [`SliceBuffer`] and tokenizes whatever is buffered. Every operation builds
//! a fresh [`Tokenizer`] from the buffered bytes and the last committed
//! [`ReaderState`]. When the tokenizer runs out of bytes before the operation
//! can finish, nothing of that attempt is committed: the buffer is refilled
//! and the attempt starts over from the same state.

mod array;

use std::{any::type_name, sync::Arc};

use bstr::ByteSlice;
use futures::io::AsyncRead;
use serde::de::DeserializeOwned;

pub(crate) use self::array::ArrayProgress;
pub use self::array::{ArrayReader, ElementReader, ReadObject, ReadToken};
use crate::{
    buffer::SliceBuffer,
    decoder::{SerdeDecoder, TypeDecoder},
    error::{Error, SyntaxError},
    options::ReaderOptions,
    path::PathTracker,
    pool::BufferPool,
    token::JsonToken,
    tokenizer::{ReaderState, TokenKind, TokenizeError, Tokenizer},
    value::{ScalarValue, ValueKind},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Uninitialized,
    Ready,
    /// A fill is awaiting the source. Observed at the start of an operation,
    /// it means that fill was cancelled.
    Filling,
    Failed,
}

/// What a successful tokenizer pass leaves behind.
#[derive(Debug, Clone, Copy)]
struct Commit {
    state: ReaderState,
    token: TokenKind,
    depth: usize,
    consumed: usize,
}

impl Commit {
    fn of(tokenizer: &Tokenizer<'_>) -> Self {
        Self {
            state: tokenizer.state(),
            token: tokenizer.token_kind(),
            depth: tokenizer.current_depth(),
            consumed: tokenizer.bytes_consumed(),
        }
    }
}

fn tokenize(buffer: &SliceBuffer, state: ReaderState) -> Tokenizer<'_> {
    Tokenizer::new(
        buffer.current_segment(),
        buffer.is_source_exhausted(),
        state,
    )
}

fn syntax(err: TokenizeError, path: &PathTracker) -> Error {
    let path = path.current_path().to_owned();
    match err.kind {
        SyntaxError::UnexpectedEndOfInput => Error::UnexpectedEnd {
            position: err.position,
            path,
        },
        source => Error::Syntax {
            source,
            position: err.position,
            path,
        },
    }
}

/// Pull-based reader over a JSON document arriving from an asynchronous byte
/// source.
///
/// # Examples
///
/// ```rust
/// use futures::{executor::block_on, io::Cursor};
/// use jsonrows::{JsonStreamReader, ReaderOptions};
///
/// let json = br#"{"total_rows": 2, "rows": [{"id": "a"}, {"id": "b"}]}"#;
/// let mut reader = JsonStreamReader::new(Cursor::new(&json[..]), ReaderOptions::default());
///
/// block_on(async {
///     assert!(reader.initialize().await?);
///     assert_eq!(reader.read_to_next_property().await?, Some("total_rows"));
///     assert_eq!(reader.read_object_or_scalar::<u64>().await?, 2);
///     assert_eq!(reader.read_to_next_property().await?, Some("rows"));
///
///     let mut rows = reader.read_tokens();
///     while let Some(row) = rows.next().await? {
///         println!("{}", row["id"]);
///     }
///     assert_eq!(reader.read_to_next_property().await?, None);
///     Ok::<_, jsonrows::Error>(())
/// })
/// .unwrap();
/// ```
#[derive(Debug)]
pub struct JsonStreamReader<R, D = SerdeDecoder> {
    source: R,
    decoder: D,
    buffer: SliceBuffer,
    state: ReaderState,
    path: PathTracker,
    token: TokenKind,
    depth: usize,
    next_value: Option<ValueKind>,
    status: Status,
}

impl<R> JsonStreamReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader decoding containers with [`SerdeDecoder`] and
    /// renting its buffer from the shared pool.
    #[must_use]
    pub fn new(source: R, options: ReaderOptions) -> Self {
        Self::with_decoder(source, SerdeDecoder, options)
    }
}

impl<R, D> JsonStreamReader<R, D>
where
    R: AsyncRead + Unpin,
    D: TypeDecoder,
{
    /// Creates a reader decoding containers with `decoder` and renting its
    /// buffer from the shared pool.
    #[must_use]
    pub fn with_decoder(source: R, decoder: D, options: ReaderOptions) -> Self {
        Self::with_pool(source, decoder, options, &BufferPool::shared())
    }

    /// Creates a reader renting its buffer from `pool`.
    #[must_use]
    pub fn with_pool(source: R, decoder: D, options: ReaderOptions, pool: &Arc<BufferPool>) -> Self {
        Self {
            source,
            decoder,
            buffer: SliceBuffer::new(pool, options.buffer_size),
            state: ReaderState::new(&options),
            path: PathTracker::default(),
            token: TokenKind::None,
            depth: 0,
            next_value: None,
            status: Status::Uninitialized,
        }
    }

    /// Performs the first fill. Returns whether the source produced any
    /// bytes at all.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyInitialized`] on a second call, and with
    /// [`Error::Io`] when the source fails.
    pub async fn initialize(&mut self) -> Result<bool> {
        match self.status {
            Status::Uninitialized => {}
            Status::Ready => return Err(Error::AlreadyInitialized),
            Status::Filling => return Err(Error::Cancelled),
            Status::Failed => return Err(Error::Failed),
        }
        self.fill().await?;
        log::debug!(
            "reader initialized with {} bytes buffered",
            self.buffer.used_bytes()
        );
        Ok(self.buffer.used_bytes() > 0)
    }

    /// Advances to the next property name anywhere in the document, skipping
    /// whatever lies in between, and returns its path. Returns `None` at the
    /// end of the document.
    ///
    /// After a property is found, the kind of the value that follows is
    /// available from [`current_value_kind`](Self::current_value_kind) and
    /// the value itself from [`current_value`](Self::current_value).
    ///
    /// # Errors
    ///
    /// Fails on malformed input, on a premature end of the stream, and when
    /// the reader is not usable.
    pub async fn read_to_next_property(&mut self) -> Result<Option<&str>> {
        self.ensure_usable()?;
        self.next_value = None;
        while !self.advance_to_property()? {
            if self.buffer.is_source_exhausted() {
                return Ok(None);
            }
            self.fill().await?;
        }
        let (kind, is_fractional) = self.peek().await?;
        self.next_value = ValueKind::of_token(kind, is_fractional);
        log::trace!("at property {}", self.path.current_path());
        Ok(Some(self.path.current_path()))
    }

    /// Reads the next value into `T`.
    ///
    /// A scalar is converted directly when `T` accepts that kind of scalar,
    /// otherwise it goes through the decoder. A container is only decoded
    /// once it is fully buffered.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and premature end of the stream. Returns
    /// [`Error::UnsupportedConversion`] or [`Error::Decode`] when the value
    /// does not convert into `T`; the reader has then still moved past the
    /// value. Returns [`Error::NotAtValue`] when the next token ends a
    /// container.
    pub async fn read_object_or_scalar<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.ensure_usable()?;
        self.next_value = None;
        loop {
            if let Some(value) = self.try_read_value()? {
                return Ok(value);
            }
            self.fill().await?;
        }
    }

    /// Reads the next value as an untyped [`JsonToken`].
    ///
    /// # Errors
    ///
    /// As for [`read_object_or_scalar`](Self::read_object_or_scalar).
    pub async fn read_token(&mut self) -> Result<JsonToken> {
        self.read_object_or_scalar::<JsonToken>().await
    }

    /// Enumerates the array that starts at the next token, reading each
    /// element with `element_reader`.
    ///
    /// The array start is read by the first call to
    /// [`ArrayReader::next`]. Enumeration stops before the closing `]`,
    /// which the next read operation consumes.
    pub fn read_array<E>(&mut self, element_reader: E) -> ArrayReader<'_, R, D, E>
    where
        E: ElementReader<R, D>,
    {
        ArrayReader::new(self, element_reader)
    }

    /// [`read_array`](Self::read_array) decoding each element into `T`.
    pub fn read_objects<T: DeserializeOwned>(&mut self) -> ArrayReader<'_, R, D, ReadObject<T>> {
        self.read_array(ReadObject::new())
    }

    /// [`read_array`](Self::read_array) reading each element as a
    /// [`JsonToken`].
    pub fn read_tokens(&mut self) -> ArrayReader<'_, R, D, ReadToken> {
        self.read_array(ReadToken)
    }

    /// The scalar at the cursor, if the next token is a scalar. Does not
    /// advance the reader.
    ///
    /// # Errors
    ///
    /// Fails when the scalar is malformed.
    pub fn current_value(&self) -> Result<Option<ScalarValue>> {
        let mut tokenizer = tokenize(&self.buffer, self.state);
        if !tokenizer.read().map_err(|e| syntax(e, &self.path))? {
            return Ok(None);
        }
        ScalarValue::from_token(&tokenizer).map_err(|e| syntax(e, &self.path))
    }

    /// Kind of the value following the property last returned by
    /// [`read_to_next_property`](Self::read_to_next_property); `None` for
    /// containers and after any other read.
    #[must_use]
    pub fn current_value_kind(&self) -> Option<ValueKind> {
        self.next_value
    }

    /// Nesting depth of the last committed token.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Kind of the last committed token.
    #[must_use]
    pub fn token_kind(&self) -> TokenKind {
        self.token
    }

    /// Path at the cursor.
    #[must_use]
    pub fn current_path(&self) -> &str {
        self.path.current_path()
    }

    /// Bytes of the stream consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.state.position()
    }

    /// The container decoder.
    #[must_use]
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Gives the byte source back. The buffer returns to its pool.
    pub fn into_source(self) -> R {
        self.source
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.status {
            Status::Ready => Ok(()),
            Status::Uninitialized => Err(Error::NotInitialized),
            Status::Filling => Err(Error::Cancelled),
            Status::Failed => Err(Error::Failed),
        }
    }

    fn commit(&mut self, commit: Commit) {
        if commit.consumed == 0 {
            return;
        }
        self.state = commit.state;
        self.token = commit.token;
        self.depth = commit.depth;
        self.buffer.consume(commit.consumed);
    }

    async fn fill(&mut self) -> Result<()> {
        if self.buffer.is_source_exhausted() {
            return Err(Error::UnexpectedEnd {
                position: self.state.position() + self.buffer.used_bytes() as u64,
                path: self.path.current_path().to_owned(),
            });
        }
        self.status = Status::Filling;
        match self.buffer.fill_from(&mut self.source).await {
            Ok(appended) => {
                self.status = Status::Ready;
                log::trace!(
                    "filled {appended} bytes, {} buffered of {}",
                    self.buffer.used_bytes(),
                    self.buffer.capacity()
                );
                Ok(())
            }
            Err(e) => {
                self.status = Status::Failed;
                Err(Error::Io(e))
            }
        }
    }

    /// Reads tokens up to and including the next property name, committing
    /// every complete token. Returns `false` when the buffer ran out first.
    fn advance_to_property(&mut self) -> Result<bool> {
        let mut tokenizer = tokenize(&self.buffer, self.state);
        let outcome = loop {
            match tokenizer.read() {
                Ok(true) => {
                    if let Err(e) = self.path.apply_token(&tokenizer) {
                        break Err(e);
                    }
                    if tokenizer.token_kind() == TokenKind::PropertyName {
                        break Ok(true);
                    }
                }
                Ok(false) => break Ok(false),
                Err(e) => break Err(e),
            }
        };
        let commit = Commit::of(&tokenizer);
        self.commit(commit);
        outcome.map_err(|e| syntax(e, &self.path))
    }

    /// Kind of the next token, without consuming it.
    async fn peek(&mut self) -> Result<(TokenKind, bool)> {
        loop {
            let mut tokenizer = tokenize(&self.buffer, self.state);
            if tokenizer.read().map_err(|e| syntax(e, &self.path))? {
                return Ok((tokenizer.token_kind(), tokenizer.is_fractional()));
            }
            self.fill().await?;
        }
    }

    /// Consumes the `[` of an array.
    async fn read_array_start(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.next_value = None;
        loop {
            let mut tokenizer = tokenize(&self.buffer, self.state);
            if tokenizer.read().map_err(|e| syntax(e, &self.path))? {
                let found = tokenizer.token_kind();
                if found != TokenKind::StartArray {
                    return Err(Error::NotAtArrayStart {
                        found,
                        path: self.path.current_path().to_owned(),
                    });
                }
                let commit = Commit::of(&tokenizer);
                self.path.apply(TokenKind::StartArray);
                self.commit(commit);
                return Ok(());
            }
            self.fill().await?;
        }
    }

    /// One attempt at reading a whole value. `Ok(None)` means the value is
    /// not fully buffered and nothing was committed.
    fn try_read_value<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let mut tokenizer = tokenize(&self.buffer, self.state);
        if !tokenizer.read().map_err(|e| syntax(e, &self.path))? {
            return Ok(None);
        }
        let kind = tokenizer.token_kind();

        if kind.is_container_start() {
            let mut trial = tokenizer.clone();
            // Decoders only accept strict JSON.
            let mut strict = Vec::new();
            let complete = if self.state.is_lenient() {
                trial.try_copy_strict(&mut strict)
            } else {
                trial.try_skip()
            };
            if !complete.map_err(|e| syntax(e, &self.path))? {
                log::trace!(
                    "container at {} is not fully buffered yet",
                    self.path.current_path()
                );
                return Ok(None);
            }
            let bytes = if self.state.is_lenient() {
                &strict[..]
            } else {
                &self.buffer.current_segment()[tokenizer.token_offset()..trial.bytes_consumed()]
            };
            let decoded = self.decoder.decode::<T>(bytes).map_err(|source| Error::Decode {
                source,
                path: self.path.current_path().to_owned(),
            });
            let commit = Commit::of(&trial);
            self.path.value_consumed();
            self.commit(commit);
            return decoded.map(Some);
        }

        let Some(scalar) = ScalarValue::from_token(&tokenizer).map_err(|e| syntax(e, &self.path))?
        else {
            return Err(Error::NotAtValue {
                found: kind,
                path: self.path.current_path().to_owned(),
            });
        };
        let converted = scalar.probe::<T>().or_else(|_| {
            self.decoder
                .decode::<T>(tokenizer.raw())
                .map_err(|source| Error::UnsupportedConversion {
                    kind: scalar.kind(),
                    target: type_name::<T>(),
                    path: self.path.current_path().to_owned(),
                    source,
                })
        });
        if converted.is_err() {
            log::debug!(
                "cannot convert {} to {}",
                tokenizer.raw().as_bstr(),
                type_name::<T>()
            );
        }
        let commit = Commit::of(&tokenizer);
        self.path.value_consumed();
        self.commit(commit);
        converted.map(Some)
    }
}


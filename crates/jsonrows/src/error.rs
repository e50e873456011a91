use thiserror::Error;

use crate::{tokenizer::TokenKind, value::ValueKind};

/// What was wrong with malformed input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    /// A byte that cannot start or continue a token.
    #[error("invalid character '{}'", .0.escape_ascii())]
    InvalidCharacter(u8),
    /// A structural byte other than the ones allowed at this point.
    #[error("expected {expected}, found '{}'", .found.escape_ascii())]
    Expected {
        /// Description of what was allowed.
        expected: &'static str,
        /// The byte found instead.
        found: u8,
    },
    /// A backslash followed by something other than a JSON escape.
    #[error("invalid escape sequence '\\{}'", .0.escape_ascii())]
    InvalidEscape(u8),
    /// A non-hex digit inside `\uXXXX`.
    #[error("invalid unicode escape sequence at character: '{}'", .0.escape_ascii())]
    InvalidUnicodeEscapeChar(u8),
    /// A `\uXXXX` escape that is not a scalar value, such as a lone
    /// surrogate.
    #[error("invalid unicode escape sequence \\u{0:04X}")]
    InvalidUnicodeEscapeSequence(u32),
    /// A raw control byte inside a string.
    #[error("unescaped control character 0x{0:02X} in string")]
    ControlCharacter(u8),
    /// String bytes that are not UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,
    /// A malformed number lexeme.
    #[error("invalid number")]
    InvalidNumber,
    /// Containers nest deeper than the configured maximum.
    #[error("nesting depth exceeds the maximum of {0}")]
    DepthExceeded(usize),
    /// Non-whitespace after the root value.
    #[error("unexpected data after the end of the document")]
    TrailingData,
    /// The final window ended inside a value.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}

/// Errors produced by [`JsonStreamReader`](crate::JsonStreamReader).
#[derive(Debug, Error)]
pub enum Error {
    /// The byte stream is not well-formed JSON at `position`.
    #[error("malformed JSON at byte {position} (path '{path}'): {source}")]
    Syntax {
        /// What was malformed.
        source: SyntaxError,
        /// Absolute byte offset in the stream.
        position: u64,
        /// Path at the cursor when the error was found.
        path: String,
    },
    /// The byte source ended inside a value or container.
    #[error("unexpected end of stream at byte {position} (path '{path}')")]
    UnexpectedEnd {
        /// Absolute byte offset where the stream ended.
        position: u64,
        /// Path at the cursor.
        path: String,
    },
    /// A scalar could not be converted to the requested type. The reader has
    /// still moved past the scalar.
    #[error("cannot convert {kind} value at '{path}' to {target}")]
    UnsupportedConversion {
        /// Kind of the scalar in the stream.
        kind: ValueKind,
        /// Name of the requested type.
        target: &'static str,
        /// Path of the scalar.
        path: String,
        /// The decoder's rejection.
        source: serde_json::Error,
    },
    /// The value decoder rejected a complete container. The reader has still
    /// moved past the container.
    #[error("failed to decode value at '{path}': {source}")]
    Decode {
        /// The decoder's rejection.
        source: serde_json::Error,
        /// Path of the container.
        path: String,
    },
    /// A read was attempted before
    /// [`initialize`](crate::JsonStreamReader::initialize).
    #[error("the reader has not been initialized")]
    NotInitialized,
    /// [`initialize`](crate::JsonStreamReader::initialize) was called twice.
    #[error("the reader can only be initialized once")]
    AlreadyInitialized,
    /// An array read found another token.
    #[error("expected the start of an array at '{path}', found {found}")]
    NotAtArrayStart {
        /// The token found instead of `[`.
        found: TokenKind,
        /// Path at the cursor.
        path: String,
    },
    /// A value read found the end of a container.
    #[error("expected a value at '{path}', found {found}")]
    NotAtValue {
        /// The end token found.
        found: TokenKind,
        /// Path at the cursor.
        path: String,
    },
    /// A fill from the byte source was cancelled; the reader cannot be used
    /// again.
    #[error("a read was cancelled while waiting for more bytes; the reader is no longer usable")]
    Cancelled,
    /// An earlier I/O failure left the reader unusable.
    #[error("the reader failed earlier and is no longer usable")]
    Failed,
    /// The byte source failed.
    #[error("I/O error while reading the byte source: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not well-formed JSON.
    Malformed,
    /// The input ended inside a value.
    UnexpectedEnd,
    /// A value could not be converted or decoded to the requested type.
    UnsupportedConversion,
    /// The reader was used out of order.
    ProtocolMisuse,
    /// A fill was cancelled.
    Cancelled,
    /// The byte source failed.
    Io,
}

impl Error {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Malformed,
            Self::UnexpectedEnd { .. } => ErrorKind::UnexpectedEnd,
            Self::UnsupportedConversion { .. } | Self::Decode { .. } => {
                ErrorKind::UnsupportedConversion
            }
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::NotAtArrayStart { .. }
            | Self::NotAtValue { .. } => ErrorKind::ProtocolMisuse,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) | Self::Failed => ErrorKind::Io,
        }
    }

    /// Returns `true` for malformed input and premature end of stream.
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::Malformed | ErrorKind::UnexpectedEnd)
    }
}

/// Errors produced by [`StreamingResult`](crate::StreamingResult).
#[derive(Debug, Error)]
pub enum ResultError {
    /// The response was malformed or ended early.
    #[error("failed to decode the response at byte {position} (path '{path}')")]
    DecodeFailure {
        /// Absolute byte offset of the failure.
        position: u64,
        /// Path at the cursor.
        path: String,
        /// The underlying reader error.
        source: Error,
    },
    /// The rows were requested before
    /// [`initialize`](crate::StreamingResult::initialize).
    #[error("the result has not been initialized, call initialize first")]
    NotInitialized,
    /// [`initialize`](crate::StreamingResult::initialize) was called twice.
    #[error("the result can only be initialized once")]
    AlreadyInitialized,
    /// The rows were already enumerated; they cannot be read twice.
    #[error("the rows of this result have already been read")]
    StreamAlreadyRead,
    /// An earlier read of this result failed; the result is no longer
    /// usable.
    #[error("an earlier read of this result failed")]
    Failed,
    /// Any other reader error.
    #[error(transparent)]
    Reader(Error),
}

impl From<Error> for ResultError {
    fn from(err: Error) -> Self {
        let (position, path) = match &err {
            Error::Syntax { position, path, .. } | Error::UnexpectedEnd { position, path } => {
                (*position, path.clone())
            }
            _ => return Self::Reader(err),
        };
        Self::DecodeFailure {
            position,
            path,
            source: err,
        }
    }
}

//! A restartable JSON tokenizer over a window of bytes.
//!
//! A [`Tokenizer`] is constructed from a byte window, a flag saying whether
//! the window holds the rest of the stream, and a [`ReaderState`] snapshot.
//! Each call to [`Tokenizer::read`] either produces one complete token or
//! reports that more data is needed; in the latter case nothing observable
//! changes, so the caller can refill the window and rebuild the tokenizer
//! from the same snapshot.
//!
//! Commas are consumed together with the token that follows them, and a
//! property name token includes its `:` separator. After a successful read,
//! [`Tokenizer::bytes_consumed`] is the offset just past the token.

use std::{borrow::Cow, fmt};

use crate::{
    error::SyntaxError,
    escape,
    options::{CommentHandling, ReaderOptions},
};

/// The kind of the most recently read token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TokenKind {
    /// No token has been read yet.
    #[default]
    None,
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// A property name with its `:`.
    PropertyName,
    /// A string value.
    String,
    /// A number value.
    Number,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

impl TokenKind {
    /// Returns `true` for strings, numbers, booleans and null.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::True | Self::False | Self::Null
        )
    }

    /// Returns `true` for `{` and `[`.
    #[must_use]
    pub fn is_container_start(self) -> bool {
        matches!(self, Self::StartObject | Self::StartArray)
    }

    /// Returns `true` for `}` and `]`.
    #[must_use]
    pub fn is_container_end(self) -> bool {
        matches!(self, Self::EndObject | Self::EndArray)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "nothing",
            Self::StartObject => "'{'",
            Self::EndObject => "'}'",
            Self::StartArray => "'['",
            Self::EndArray => "']'",
            Self::PropertyName => "a property name",
            Self::String => "a string",
            Self::Number => "a number",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
        })
    }
}

/// Open containers as a bit stack; a set bit is an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ContainerStack {
    bits: u128,
    depth: u8,
}

impl ContainerStack {
    fn depth(self) -> usize {
        usize::from(self.depth)
    }

    /// `Some(true)` inside an object, `Some(false)` inside an array.
    fn top(self) -> Option<bool> {
        (self.depth > 0).then_some(self.bits & 1 == 1)
    }

    fn push(&mut self, is_object: bool) {
        self.bits = (self.bits << 1) | u128::from(is_object);
        self.depth += 1;
    }

    fn pop(&mut self) {
        self.bits >>= 1;
        self.depth -= 1;
    }
}

/// Everything the tokenizer needs to resume where a previous one stopped.
///
/// The state is a small `Copy` value; the reader stores the snapshot taken
/// after the last committed token and hands it to the next tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderState {
    stack: ContainerStack,
    last: TokenKind,
    consumed: u64,
    max_depth: u8,
    allow_trailing_commas: bool,
    skip_comments: bool,
}

impl ReaderState {
    /// A state positioned before the first token of a document.
    #[must_use]
    pub fn new(options: &ReaderOptions) -> Self {
        Self {
            stack: ContainerStack::default(),
            last: TokenKind::None,
            consumed: 0,
            max_depth: u8::try_from(options.effective_max_depth()).unwrap_or(u8::MAX),
            allow_trailing_commas: options.allow_trailing_commas,
            skip_comments: options.comment_handling == CommentHandling::Skip,
        }
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Kind of the last committed token.
    #[must_use]
    pub fn last_token(&self) -> TokenKind {
        self.last
    }

    /// Total bytes of the stream consumed by committed tokens.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Whether comments or trailing commas are accepted.
    #[must_use]
    pub fn is_lenient(&self) -> bool {
        self.allow_trailing_commas || self.skip_comments
    }
}

impl Default for ReaderState {
    fn default() -> Self {
        Self::new(&ReaderOptions::default())
    }
}

/// A syntax error at an absolute stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizeError {
    /// What was malformed.
    pub kind: SyntaxError,
    /// Absolute byte offset in the stream.
    pub position: u64,
}

type Scan<T> = Result<Option<T>, TokenizeError>;

/// Tokenizer over one byte window. Cheap to clone for trial reads.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    is_final: bool,
    base: u64,
    pos: usize,
    state: ReaderState,
    token: TokenKind,
    token_start: usize,
    token_end: usize,
    token_depth: usize,
    has_escapes: bool,
    is_fractional: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over `bytes`, resuming from `state`.
    ///
    /// `bytes` must start at the first byte after the token `state` was
    /// taken at. When `is_final` is set the window holds the remainder of the
    /// stream, so incomplete input is an error rather than a request for more
    /// data.
    #[must_use]
    pub fn new(bytes: &'a [u8], is_final: bool, state: ReaderState) -> Self {
        Self {
            bytes,
            is_final,
            base: state.consumed,
            pos: 0,
            state,
            token: state.last,
            token_start: 0,
            token_end: 0,
            token_depth: state.depth(),
            has_escapes: false,
            is_fractional: false,
        }
    }

    /// Snapshot of the state after the last token read by this tokenizer.
    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Offset into the window just past the last token read.
    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    /// Kind of the current token.
    #[must_use]
    pub fn token_kind(&self) -> TokenKind {
        self.token
    }

    /// Depth of the current token. Start tokens report the depth outside
    /// the container they open; end tokens report the depth after closing.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.token_depth
    }

    /// Raw bytes of the current token, quotes included for strings.
    #[must_use]
    pub fn raw(&self) -> &'a [u8] {
        &self.bytes[self.token_start..self.token_end]
    }

    /// Offset into the window of the current token's first byte.
    #[must_use]
    pub fn token_offset(&self) -> usize {
        self.token_start
    }

    /// Absolute stream position of the current token's first byte.
    #[must_use]
    pub fn token_position(&self) -> u64 {
        self.base + self.token_start as u64
    }

    /// Whether the current string token contains backslash escapes.
    #[must_use]
    pub fn has_escapes(&self) -> bool {
        self.has_escapes
    }

    /// Whether the current number token has a fraction or an exponent.
    #[must_use]
    pub fn is_fractional(&self) -> bool {
        self.is_fractional
    }

    /// Decodes the current string or property name token.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid escapes, unpaired surrogates or invalid
    /// UTF-8.
    pub fn decode_string(&self) -> Result<Cow<'a, str>, TokenizeError> {
        let content = &self.bytes[self.token_start + 1..self.token_end - 1];
        let at = |offset: usize| self.base + (self.token_start + 1 + offset) as u64;
        if self.has_escapes {
            escape::unescape(content)
                .map(Cow::Owned)
                .map_err(|(kind, offset)| TokenizeError {
                    kind,
                    position: at(offset),
                })
        } else {
            std::str::from_utf8(content)
                .map(Cow::Borrowed)
                .map_err(|e| TokenizeError {
                    kind: SyntaxError::InvalidUtf8,
                    position: at(e.valid_up_to()),
                })
        }
    }

    /// Reads the next token.
    ///
    /// Returns `Ok(false)` when the window does not hold a complete token;
    /// the tokenizer is then unchanged. At the end of a final window after
    /// the root value has closed, also returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input, or for input that ends inside a
    /// value when the window is final.
    pub fn read(&mut self) -> Result<bool, TokenizeError> {
        let Some(pos) = self.skip_insignificant(self.pos)? else {
            return Ok(false);
        };
        let Some(&byte) = self.bytes.get(pos) else {
            return self.end_of_window(pos);
        };
        match self.state.last {
            TokenKind::None | TokenKind::PropertyName => self.read_value(pos, byte),
            TokenKind::StartObject => match byte {
                b'}' => Ok(self.close(pos, true)),
                b'"' => self.read_property_name(pos),
                found => Err(self.error(
                    SyntaxError::Expected {
                        expected: "a property name or '}'",
                        found,
                    },
                    pos,
                )),
            },
            TokenKind::StartArray => {
                if byte == b']' {
                    Ok(self.close(pos, false))
                } else {
                    self.read_value(pos, byte)
                }
            }
            _ => self.read_after_value(pos, byte),
        }
    }

    /// Skips the current value. On a property name the value that follows
    /// is skipped; on a container start the tokenizer moves to the matching
    /// end token. Scalars and end tokens are already complete.
    ///
    /// Returns `Ok(false)` when the window ends before the value does.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error inside the skipped value.
    pub fn try_skip(&mut self) -> Result<bool, TokenizeError> {
        self.skip_value(None)
    }

    /// [`try_skip`](Self::try_skip), also writing the skipped value to `out`
    /// as strict JSON: comments and trailing commas are dropped and
    /// insignificant whitespace is removed.
    ///
    /// When the window ends first, `out` holds a partial copy.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error inside the skipped value.
    pub fn try_copy_strict(&mut self, out: &mut Vec<u8>) -> Result<bool, TokenizeError> {
        self.skip_value(Some(out))
    }

    fn skip_value(&mut self, mut out: Option<&mut Vec<u8>>) -> Result<bool, TokenizeError> {
        if self.token == TokenKind::PropertyName && !self.read()? {
            return Ok(false);
        }
        if let Some(out) = out.as_deref_mut() {
            out.extend_from_slice(self.raw());
        }
        if !self.token.is_container_start() {
            return Ok(true);
        }
        let target = self.token_depth;
        loop {
            let previous = self.token;
            if !self.read()? {
                return Ok(false);
            }
            if let Some(out) = out.as_deref_mut() {
                let follows_value = !matches!(
                    previous,
                    TokenKind::StartObject | TokenKind::StartArray | TokenKind::PropertyName
                );
                if follows_value && !self.token.is_container_end() {
                    out.push(b',');
                }
                out.extend_from_slice(self.raw());
                if self.token == TokenKind::PropertyName {
                    out.push(b':');
                }
            }
            if self.token.is_container_end() && self.token_depth == target {
                return Ok(true);
            }
        }
    }

    fn error(&self, kind: SyntaxError, at: usize) -> TokenizeError {
        TokenizeError {
            kind,
            position: self.base + at as u64,
        }
    }

    fn need_more<T>(&self, at: usize) -> Scan<T> {
        if self.is_final {
            Err(self.error(SyntaxError::UnexpectedEndOfInput, at))
        } else {
            Ok(None)
        }
    }

    fn end_of_window(&self, at: usize) -> Result<bool, TokenizeError> {
        let inside_document =
            self.state.stack.depth() > 0 || self.state.last == TokenKind::PropertyName;
        if self.is_final && inside_document {
            Err(self.error(SyntaxError::UnexpectedEndOfInput, at))
        } else {
            Ok(false)
        }
    }

    fn commit(&mut self, kind: TokenKind, start: usize, end: usize, next: usize, depth: usize) {
        self.token = kind;
        self.token_start = start;
        self.token_end = end;
        self.token_depth = depth;
        self.pos = next;
        self.state.last = kind;
        self.state.consumed = self.base + next as u64;
    }

    /// Handles the `,` or closing bracket that must follow a complete value.
    fn read_after_value(&mut self, pos: usize, byte: u8) -> Result<bool, TokenizeError> {
        let Some(is_object) = self.state.stack.top() else {
            return Err(self.error(SyntaxError::TrailingData, pos));
        };
        let close = if is_object { b'}' } else { b']' };
        if byte == close {
            return Ok(self.close(pos, is_object));
        }
        if byte != b',' {
            let expected = if is_object { "',' or '}'" } else { "',' or ']'" };
            return Err(self.error(SyntaxError::Expected { expected, found: byte }, pos));
        }
        let Some(next) = self.skip_insignificant(pos + 1)? else {
            return Ok(false);
        };
        let Some(&byte) = self.bytes.get(next) else {
            return Ok(self.need_more::<()>(next)?.is_some());
        };
        if byte == close && self.state.allow_trailing_commas {
            return Ok(self.close(next, is_object));
        }
        if !is_object {
            return self.read_value(next, byte);
        }
        if byte == b'"' {
            self.read_property_name(next)
        } else {
            Err(self.error(
                SyntaxError::Expected {
                    expected: "a property name",
                    found: byte,
                },
                next,
            ))
        }
    }

    fn close(&mut self, pos: usize, is_object: bool) -> bool {
        self.state.stack.pop();
        let kind = if is_object {
            TokenKind::EndObject
        } else {
            TokenKind::EndArray
        };
        let depth = self.state.stack.depth();
        self.commit(kind, pos, pos + 1, pos + 1, depth);
        true
    }

    fn open(&mut self, pos: usize, is_object: bool) -> Result<bool, TokenizeError> {
        let depth = self.state.stack.depth();
        let max_depth = usize::from(self.state.max_depth);
        if depth >= max_depth {
            return Err(self.error(SyntaxError::DepthExceeded(max_depth), pos));
        }
        self.state.stack.push(is_object);
        let kind = if is_object {
            TokenKind::StartObject
        } else {
            TokenKind::StartArray
        };
        self.commit(kind, pos, pos + 1, pos + 1, depth);
        Ok(true)
    }

    fn read_value(&mut self, pos: usize, byte: u8) -> Result<bool, TokenizeError> {
        let depth = self.state.stack.depth();
        match byte {
            b'{' => self.open(pos, true),
            b'[' => self.open(pos, false),
            b'"' => {
                let Some((end, has_escapes)) = self.scan_string(pos)? else {
                    return Ok(false);
                };
                self.has_escapes = has_escapes;
                self.commit(TokenKind::String, pos, end, end, depth);
                Ok(true)
            }
            b'-' | b'0'..=b'9' => {
                let Some((end, is_fractional)) = self.scan_number(pos)? else {
                    return Ok(false);
                };
                self.is_fractional = is_fractional;
                self.commit(TokenKind::Number, pos, end, end, depth);
                Ok(true)
            }
            b't' => self.read_literal(pos, b"true", TokenKind::True),
            b'f' => self.read_literal(pos, b"false", TokenKind::False),
            b'n' => self.read_literal(pos, b"null", TokenKind::Null),
            found => Err(self.error(SyntaxError::InvalidCharacter(found), pos)),
        }
    }

    fn read_property_name(&mut self, pos: usize) -> Result<bool, TokenizeError> {
        let Some((end, has_escapes)) = self.scan_string(pos)? else {
            return Ok(false);
        };
        let Some(colon) = self.skip_insignificant(end)? else {
            return Ok(false);
        };
        match self.bytes.get(colon) {
            None => Ok(self.need_more::<()>(colon)?.is_some()),
            Some(b':') => {
                self.has_escapes = has_escapes;
                let depth = self.state.stack.depth();
                self.commit(TokenKind::PropertyName, pos, end, colon + 1, depth);
                Ok(true)
            }
            Some(&found) => Err(self.error(
                SyntaxError::Expected {
                    expected: "':'",
                    found,
                },
                colon,
            )),
        }
    }

    fn read_literal(
        &mut self,
        pos: usize,
        literal: &'static [u8],
        kind: TokenKind,
    ) -> Result<bool, TokenizeError> {
        let available = &self.bytes[pos..self.bytes.len().min(pos + literal.len())];
        if let Some(i) = available.iter().zip(literal).position(|(a, b)| a != b) {
            return Err(self.error(SyntaxError::InvalidCharacter(available[i]), pos + i));
        }
        if available.len() < literal.len() {
            return Ok(self.need_more::<()>(pos + available.len())?.is_some());
        }
        let end = pos + literal.len();
        if let Some(&next) = self.bytes.get(end) {
            if !is_delimiter(next) {
                return Err(self.error(SyntaxError::InvalidCharacter(next), end));
            }
        }
        let depth = self.state.stack.depth();
        self.commit(kind, pos, end, end, depth);
        Ok(true)
    }

    /// Scans a string starting at the opening quote. Returns the offset past
    /// the closing quote and whether any escapes were seen.
    fn scan_string(&self, pos: usize) -> Scan<(usize, bool)> {
        let bytes = self.bytes;
        let mut has_escapes = false;
        let mut i = pos + 1;
        while let Some(&byte) = bytes.get(i) {
            match byte {
                b'"' => return Ok(Some((i + 1, has_escapes))),
                b'\\' => {
                    has_escapes = true;
                    let Some(&escape) = bytes.get(i + 1) else {
                        break;
                    };
                    match escape {
                        b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => i += 2,
                        b'u' => {
                            let digits = &bytes[(i + 2).min(bytes.len())..bytes.len().min(i + 6)];
                            if let Some(bad) = digits.iter().position(|d| !d.is_ascii_hexdigit()) {
                                return Err(self.error(
                                    SyntaxError::InvalidUnicodeEscapeChar(digits[bad]),
                                    i + 2 + bad,
                                ));
                            }
                            if digits.len() < 4 {
                                break;
                            }
                            i += 6;
                        }
                        other => {
                            return Err(self.error(SyntaxError::InvalidEscape(other), i + 1));
                        }
                    }
                }
                control if control < 0x20 => {
                    return Err(self.error(SyntaxError::ControlCharacter(control), i));
                }
                _ => i += 1,
            }
        }
        self.need_more(bytes.len())
    }

    /// Scans a number. Returns the offset past its last byte and whether it
    /// has a fraction or exponent.
    ///
    /// A number that runs to the end of a non-final window is incomplete,
    /// since more digits may follow.
    fn scan_number(&self, pos: usize) -> Scan<(usize, bool)> {
        let bytes = self.bytes;
        let at = |i: usize| bytes.get(i).copied();
        let digits_from = |mut i: usize| {
            while at(i).is_some_and(|b| b.is_ascii_digit()) {
                i += 1;
            }
            i
        };

        let mut i = pos;
        if at(i) == Some(b'-') {
            i += 1;
        }
        match at(i) {
            None => return self.need_more(i),
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => i = digits_from(i + 1),
            Some(_) => return Err(self.error(SyntaxError::InvalidNumber, i)),
        }

        let mut is_fractional = false;
        if at(i) == Some(b'.') {
            is_fractional = true;
            i += 1;
            match at(i) {
                None => return self.need_more(i),
                Some(b) if b.is_ascii_digit() => i = digits_from(i),
                Some(_) => return Err(self.error(SyntaxError::InvalidNumber, i)),
            }
        }
        if matches!(at(i), Some(b'e' | b'E')) {
            is_fractional = true;
            i += 1;
            if matches!(at(i), Some(b'+' | b'-')) {
                i += 1;
            }
            match at(i) {
                None => return self.need_more(i),
                Some(b) if b.is_ascii_digit() => i = digits_from(i),
                Some(_) => return Err(self.error(SyntaxError::InvalidNumber, i)),
            }
        }

        match at(i) {
            None if self.is_final => Ok(Some((i, is_fractional))),
            None => Ok(None),
            Some(b) if is_delimiter(b) => Ok(Some((i, is_fractional))),
            Some(_) => Err(self.error(SyntaxError::InvalidNumber, i)),
        }
    }

    /// Skips whitespace and, when enabled, comments. Returns the offset of the
    /// next significant byte (or the window length), or `None` when a comment
    /// is cut off by the end of a non-final window.
    fn skip_insignificant(&self, pos: usize) -> Scan<usize> {
        let bytes = self.bytes;
        let mut i = pos;
        loop {
            match bytes.get(i) {
                Some(b' ' | b'\t' | b'\n' | b'\r') => i += 1,
                Some(b'/') if self.state.skip_comments => match bytes.get(i + 1) {
                    None => return self.need_more(i + 1),
                    Some(b'/') => match find(bytes, i + 2, b"\n") {
                        Some(newline) => i = newline + 1,
                        None if self.is_final => i = bytes.len(),
                        None => return Ok(None),
                    },
                    Some(b'*') => match find(bytes, i + 2, b"*/") {
                        Some(end) => i = end + 2,
                        None => return self.need_more(bytes.len()),
                    },
                    Some(&other) => {
                        return Err(self.error(SyntaxError::InvalidCharacter(other), i + 1));
                    }
                },
                _ => return Ok(Some(i)),
            }
        }
    }
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t' | b'\n' | b'\r' | b',' | b'}' | b']' | b'/'
    )
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn tokens(input: &str, options: &ReaderOptions) -> Result<Vec<(TokenKind, usize, String)>, TokenizeError> {
        let mut tokenizer = Tokenizer::new(input.as_bytes(), true, ReaderState::new(options));
        let mut out = Vec::new();
        while tokenizer.read()? {
            let raw = String::from_utf8_lossy(tokenizer.raw()).into_owned();
            out.push((tokenizer.token_kind(), tokenizer.current_depth(), raw));
        }
        Ok(out)
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokens(input, &ReaderOptions::default())
            .unwrap()
            .into_iter()
            .map(|(kind, ..)| kind)
            .collect()
    }

    fn syntax_error(input: &str) -> SyntaxError {
        tokens(input, &ReaderOptions::default()).unwrap_err().kind
    }

    #[test]
    fn tokens_and_depths() {
        let out = tokens(r#"{"a": [1, "x"], "b": {}}"#, &ReaderOptions::default()).unwrap();
        let expected = [
            (TokenKind::StartObject, 0, "{"),
            (TokenKind::PropertyName, 1, "\"a\""),
            (TokenKind::StartArray, 1, "["),
            (TokenKind::Number, 2, "1"),
            (TokenKind::String, 2, "\"x\""),
            (TokenKind::EndArray, 1, "]"),
            (TokenKind::PropertyName, 1, "\"b\""),
            (TokenKind::StartObject, 1, "{"),
            (TokenKind::EndObject, 1, "}"),
            (TokenKind::EndObject, 0, "}"),
        ];
        assert_eq!(out.len(), expected.len());
        for (actual, (kind, depth, raw)) in out.iter().zip(expected) {
            assert_eq!((actual.0, actual.1, actual.2.as_str()), (kind, depth, raw));
        }
    }

    #[test]
    fn scalar_roots() {
        assert_eq!(kinds(" 42 "), [TokenKind::Number]);
        assert_eq!(kinds("true"), [TokenKind::True]);
        assert_eq!(kinds("\"s\""), [TokenKind::String]);
        assert!(kinds("   ").is_empty());
    }

    #[rstest]
    #[case("{\"a\"", 1)]
    #[case("{\"a\":", 2)]
    #[case("[1, 2", 2)]
    #[case("[12", 1)]
    #[case("[\"abc", 1)]
    #[case("[tr", 1)]
    #[case("[1,", 2)]
    fn partial_window_needs_more_data(#[case] input: &str, #[case] complete_tokens: usize) {
        let mut tokenizer = Tokenizer::new(input.as_bytes(), false, ReaderState::default());
        for _ in 0..complete_tokens {
            assert!(tokenizer.read().unwrap());
        }
        let before = tokenizer.state();
        let consumed = tokenizer.bytes_consumed();
        assert!(!tokenizer.read().unwrap());
        assert_eq!(tokenizer.state(), before);
        assert_eq!(tokenizer.bytes_consumed(), consumed);
    }

    #[rstest]
    #[case("[12")]
    #[case("{\"a\":")]
    #[case("[\"abc")]
    #[case("[nul")]
    #[case("[1.")]
    fn final_window_reports_unexpected_end(#[case] input: &str) {
        assert_eq!(syntax_error(input), SyntaxError::UnexpectedEndOfInput);
    }

    #[test]
    fn resumes_from_state_snapshot() {
        let input = br#"{"total_rows": 12345, "rows": []}"#;
        let mut first = Tokenizer::new(&input[..18], false, ReaderState::default());
        assert!(first.read().unwrap());
        assert!(first.read().unwrap());
        assert!(!first.read().unwrap());
        let consumed = first.bytes_consumed();
        let state = first.state();
        assert_eq!(state.position(), consumed as u64);

        let mut second = Tokenizer::new(&input[consumed..], true, state);
        assert!(second.read().unwrap());
        assert_eq!(second.token_kind(), TokenKind::Number);
        assert_eq!(second.raw(), b"12345");
        assert_eq!(second.token_position(), 15);
    }

    #[test]
    fn fractional_numbers() {
        for (input, fractional) in [("1", false), ("-0", false), ("1.5", true), ("2e3", true), ("2E-3", true)] {
            let mut tokenizer = Tokenizer::new(input.as_bytes(), true, ReaderState::default());
            assert!(tokenizer.read().unwrap());
            assert_eq!(tokenizer.is_fractional(), fractional, "{input}");
        }
    }

    #[rstest]
    #[case("[01]", SyntaxError::InvalidNumber)]
    #[case("[-x]", SyntaxError::InvalidNumber)]
    #[case("[1.e]", SyntaxError::InvalidNumber)]
    #[case("[truex]", SyntaxError::InvalidCharacter(b'x'))]
    #[case("[nulL]", SyntaxError::InvalidCharacter(b'L'))]
    #[case("{1}", SyntaxError::Expected { expected: "a property name or '}'", found: b'1' })]
    #[case("{\"a\" 1}", SyntaxError::Expected { expected: "':'", found: b'1' })]
    #[case("[1 2]", SyntaxError::Expected { expected: "',' or ']'", found: b'2' })]
    #[case("[1,]", SyntaxError::InvalidCharacter(b']'))]
    #[case("{\"a\":1,}", SyntaxError::Expected { expected: "a property name", found: b'}' })]
    #[case("[\"a\\x\"]", SyntaxError::InvalidEscape(b'x'))]
    #[case("[\"\\u12G4\"]", SyntaxError::InvalidUnicodeEscapeChar(b'G'))]
    #[case("[\"a\nb\"]", SyntaxError::ControlCharacter(b'\n'))]
    #[case("{} {}", SyntaxError::TrailingData)]
    #[case("[/* c */]", SyntaxError::InvalidCharacter(b'/'))]
    fn malformed_input(#[case] input: &str, #[case] expected: SyntaxError) {
        assert_eq!(syntax_error(input), expected);
    }

    #[test]
    fn error_positions_are_absolute() {
        let input = br#"{"a": tru!}"#;
        let mut head = Tokenizer::new(&input[..6], false, ReaderState::default());
        assert!(head.read().unwrap());
        assert!(head.read().unwrap());
        let mut tokenizer = Tokenizer::new(&input[head.bytes_consumed()..], true, head.state());
        let err = tokenizer.read().unwrap_err();
        assert_eq!(err.position, 9);
    }

    #[test]
    fn trailing_commas_when_allowed() {
        let options = ReaderOptions {
            allow_trailing_commas: true,
            ..Default::default()
        };
        let out = tokens(r#"{"a": [1, 2,], }"#, &options).unwrap();
        assert_eq!(out.last().map(|t| t.0), Some(TokenKind::EndObject));
    }

    #[test]
    fn comments_when_skipped() {
        let options = ReaderOptions {
            comment_handling: CommentHandling::Skip,
            ..Default::default()
        };
        let out = tokens("// head\n[1 /* one */, 2] // tail", &options).unwrap();
        let kinds: Vec<_> = out.iter().map(|t| t.0).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::StartArray,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::EndArray
            ]
        );

        let mut cut = Tokenizer::new(b"[1, /* unfinished", false, ReaderState::new(&options));
        assert!(cut.read().unwrap());
        assert!(cut.read().unwrap());
        assert!(!cut.read().unwrap());
    }

    #[test]
    fn depth_limit() {
        let options = ReaderOptions {
            max_depth: 2,
            ..Default::default()
        };
        assert!(tokens("[[1]]", &options).is_ok());
        assert_eq!(
            tokens("[[[1]]]", &options).unwrap_err().kind,
            SyntaxError::DepthExceeded(2)
        );
    }

    #[test]
    fn try_skip_moves_to_matching_end() {
        let input = br#"{"a": {"b": [1, {"c": 2}]}, "d": 3}"#;
        let mut tokenizer = Tokenizer::new(input, true, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.try_skip().unwrap());
        assert_eq!(tokenizer.token_kind(), TokenKind::EndObject);
        assert_eq!(tokenizer.current_depth(), 1);
        assert!(tokenizer.read().unwrap());
        assert_eq!(tokenizer.decode_string().unwrap(), "d");
    }

    #[test]
    fn try_skip_on_partial_container() {
        let input = br#"{"a": {"b": [1, 2"#;
        let mut tokenizer = Tokenizer::new(input, false, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.read().unwrap());
        let mut trial = tokenizer.clone();
        assert!(!trial.try_skip().unwrap());
        assert_eq!(tokenizer.token_kind(), TokenKind::PropertyName);
    }

    #[test]
    fn strict_copy_drops_comments_and_trailing_commas() {
        let options = ReaderOptions {
            allow_trailing_commas: true,
            comment_handling: CommentHandling::Skip,
            ..Default::default()
        };
        let input = "[{\"id\": \"a\" /* c */, \"v\": [1, 2,],}, // x\n true,]";
        let mut tokenizer = Tokenizer::new(input.as_bytes(), true, ReaderState::new(&options));
        assert!(tokenizer.read().unwrap());
        let mut out = Vec::new();
        assert!(tokenizer.try_copy_strict(&mut out).unwrap());
        assert_eq!(out, br#"[{"id":"a","v":[1,2]},true]"#);
        assert_eq!(tokenizer.token_kind(), TokenKind::EndArray);
    }

    #[test]
    fn decode_string_borrows_without_escapes() {
        let mut tokenizer = Tokenizer::new(br#"["plain", "a\tb"]"#, true, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.read().unwrap());
        assert!(matches!(tokenizer.decode_string().unwrap(), Cow::Borrowed("plain")));
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.has_escapes());
        assert_eq!(tokenizer.decode_string().unwrap(), "a\tb");
    }

    #[test]
    fn property_name_includes_colon() {
        let mut tokenizer = Tokenizer::new(br#"{"key"  :  1}"#, true, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        assert!(tokenizer.read().unwrap());
        assert_eq!(tokenizer.raw(), b"\"key\"");
        assert_eq!(tokenizer.bytes_consumed(), 9);
    }
}

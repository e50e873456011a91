use serde::Deserialize;

/// Default initial buffer capacity in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Largest nesting depth the tokenizer can track.
pub const MAX_DEPTH_LIMIT: usize = 128;

/// How comments inside the JSON document are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentHandling {
    /// Comments are malformed input.
    #[default]
    Disallow,
    /// `// line` and `/* block */` comments are skipped like whitespace.
    Skip,
}

/// Configuration options for [`JsonStreamReader`](crate::JsonStreamReader).
///
/// These options control the initial buffer size and the leniency of the
/// tokenizer. They can be embedded in a larger client configuration, every
/// missing field falls back to its default.
///
/// # Examples
///
/// ```rust
/// use jsonrows::{CommentHandling, ReaderOptions};
///
/// let options = ReaderOptions {
///     buffer_size: 4096,
///     comment_handling: CommentHandling::Skip,
///     ..Default::default()
/// };
/// assert_eq!(options.max_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Initial capacity of the read buffer in bytes.
    ///
    /// The buffer is rented from a pool and rounded up to the pool's size
    /// class (at least 16 bytes). It grows on demand when a single value does
    /// not fit.
    ///
    /// # Default
    ///
    /// `16384`
    pub buffer_size: usize,

    /// Maximum nesting depth of objects and arrays.
    ///
    /// Zero selects the default; values above 128 are clamped to 128.
    ///
    /// # Default
    ///
    /// `64`
    pub max_depth: usize,

    /// Whether a comma may follow the last member of an object or the last
    /// element of an array.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_trailing_commas: bool,

    /// How comments are handled.
    ///
    /// # Default
    ///
    /// [`CommentHandling::Disallow`]
    pub comment_handling: CommentHandling,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_commas: false,
            comment_handling: CommentHandling::Disallow,
        }
    }
}

impl ReaderOptions {
    /// The effective maximum depth after applying the default and the limit.
    #[must_use]
    pub fn effective_max_depth(&self) -> usize {
        match self.max_depth {
            0 => DEFAULT_MAX_DEPTH,
            depth => depth.min(MAX_DEPTH_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_configuration() {
        let options: ReaderOptions =
            serde_json::from_str(r#"{"buffer_size": 512, "comment_handling": "skip"}"#).unwrap();
        assert_eq!(
            options,
            ReaderOptions {
                buffer_size: 512,
                comment_handling: CommentHandling::Skip,
                ..Default::default()
            }
        );
    }

    #[test]
    fn max_depth_defaults_and_clamps() {
        let zero = ReaderOptions {
            max_depth: 0,
            ..Default::default()
        };
        assert_eq!(zero.effective_max_depth(), DEFAULT_MAX_DEPTH);

        let huge = ReaderOptions {
            max_depth: 1000,
            ..Default::default()
        };
        assert_eq!(huge.effective_max_depth(), MAX_DEPTH_LIMIT);
    }
}

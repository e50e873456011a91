use crate::tokenizer::{TokenKind, TokenizeError, Tokenizer};

/// One level of the path stack.
///
/// `path` is the full path string up to and including this level; only the
/// level that changes is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Full path up to and including this level.
    pub path: String,
    /// Index of the current element when this level is an array element.
    pub array_index: Option<usize>,
}

/// Tracks the dotted/indexed path of the token under the cursor.
///
/// Objects push `"parent."` (nothing at the root), arrays push
/// `"parent[0]"`, property names push `"parent.name"`. Reading a value pops
/// its segment; a popped array element is replaced by the next index.
#[derive(Debug, Default, Clone)]
pub struct PathTracker {
    stack: Vec<PathSegment>,
}

impl PathTracker {
    /// Path of the innermost segment, empty at the root.
    #[must_use]
    pub fn current_path(&self) -> &str {
        self.stack.last().map_or("", |segment| segment.path.as_str())
    }

    /// The stack, outermost segment first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.stack
    }

    /// Updates the stack for the token the tokenizer just produced.
    ///
    /// # Errors
    ///
    /// Fails only when a property name cannot be decoded.
    pub fn apply_token(&mut self, tokenizer: &Tokenizer<'_>) -> Result<(), TokenizeError> {
        match tokenizer.token_kind() {
            TokenKind::PropertyName => {
                let name = tokenizer.decode_string()?;
                self.push_property(&name);
            }
            kind => self.apply(kind),
        }
        Ok(())
    }

    /// Updates the stack for any token other than a property name.
    pub fn apply(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::StartObject => {
                let mut path = self.current_path().to_owned();
                if !path.is_empty() {
                    path.push('.');
                }
                self.stack.push(PathSegment {
                    path,
                    array_index: None,
                });
            }
            TokenKind::StartArray => {
                let path = format!("{}[0]", self.current_path());
                self.stack.push(PathSegment {
                    path,
                    array_index: Some(0),
                });
            }
            TokenKind::EndObject | TokenKind::EndArray => {
                self.stack.pop();
                if !self.stack.is_empty() {
                    self.value_consumed();
                }
            }
            TokenKind::String
            | TokenKind::Number
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => self.value_consumed(),
            TokenKind::PropertyName | TokenKind::None => {}
        }
    }

    /// Pushes the segment for property `name` under the current path.
    pub fn push_property(&mut self, name: &str) {
        let path = format!("{}{name}", self.current_path());
        self.stack.push(PathSegment {
            path,
            array_index: None,
        });
    }

    /// Pops the segment of the value just read; an array element advances
    /// to the next index.
    pub fn value_consumed(&mut self) {
        let Some(segment) = self.stack.pop() else {
            return;
        };
        if let Some(index) = segment.array_index {
            let next = index + 1;
            let path = format!("{}[{next}]", self.current_path());
            self.stack.push(PathSegment {
                path,
                array_index: Some(next),
            });
        }
    }
}

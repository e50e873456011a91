use std::collections::BTreeMap;

use futures::io::AsyncRead;

use super::ResponseAttributes;
use crate::{decoder::TypeDecoder, error::Error, reader::JsonStreamReader, value::ScalarValue};

/// Captures every scalar outside the row array, keyed by path.
///
/// Containers are walked, so nested scalars show up under their full path
/// (`metrics.resultCount`, `errors[0].code`).
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    rows_property: String,
    values: BTreeMap<String, ScalarValue>,
}

impl Attributes {
    /// An empty set for responses whose rows are under `rows_property`.
    #[must_use]
    pub fn new(rows_property: impl Into<String>) -> Self {
        Self {
            rows_property: rows_property.into(),
            values: BTreeMap::new(),
        }
    }

    /// The scalar captured at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ScalarValue> {
        self.values.get(path)
    }

    /// Captured attributes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.values.iter().map(|(path, value)| (path.as_str(), value))
    }

    /// Number of captured attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ResponseAttributes for Attributes {
    fn rows_property(&self) -> &str {
        &self.rows_property
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
        // Left in place; the next property search steps over it.
        if let Some(value) = reader.current_value()? {
            self.values.insert(path.to_owned(), value);
        }
        Ok(())
    }
}

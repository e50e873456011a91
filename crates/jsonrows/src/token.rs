use std::ops::Index;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::value::ValueKind;

/// A complete JSON value read without committing to a target type.
///
/// Index it like a [`serde_json::Value`] (missing keys and out-of-range
/// indices yield `null`) and convert it, or parts of it, later:
///
/// ```rust
/// use jsonrows::JsonToken;
///
/// let token = JsonToken::from(serde_json::json!({"name": "id", "type": "string"}));
/// assert_eq!(token["name"], "id");
/// assert_eq!(token.value::<String>("type").unwrap(), "string");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonToken(Value);

impl JsonToken {
    /// Looks up a member of an object or an element of an array.
    #[must_use]
    pub fn get<I: serde_json::value::Index>(&self, index: I) -> Option<&Value> {
        self.0.get(index)
    }

    /// Converts the member `key` into `T`.
    ///
    /// # Errors
    ///
    /// Fails when the member does not describe a `T`. A missing member is
    /// `null`, so it converts only into types accepting `null`.
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0[key])
    }

    /// Converts the whole token into `T`.
    ///
    /// # Errors
    ///
    /// Fails when the token does not describe a `T`.
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }

    /// Scalar kind of the token, `None` for objects and arrays.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match &self.0 {
            Value::Null => Some(ValueKind::Null),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Number(n) if n.is_f64() => Some(ValueKind::Float),
            Value::Number(_) => Some(ValueKind::Integer),
            Value::String(_) => Some(ValueKind::String),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The underlying [`Value`].
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the underlying [`Value`].
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for JsonToken {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl<I: serde_json::value::Index> Index<I> for JsonToken {
    type Output = Value;

    fn index(&self, index: I) -> &Value {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn indexing_and_conversion() {
        let token = JsonToken::from(json!({"a": [10, 20], "b": {"c": true}}));
        assert_eq!(token["a"][1], 20);
        assert_eq!(token["missing"], Value::Null);
        assert_eq!(token.get("b").and_then(|b| b.get("c")), Some(&Value::Bool(true)));
        assert_eq!(token.value::<Vec<u32>>("a").unwrap(), [10, 20]);
        assert!(token.value::<u32>("missing").is_err());
        assert_eq!(token.value::<Option<u32>>("missing").unwrap(), None);
    }

    #[test]
    fn kinds() {
        assert_eq!(JsonToken::from(json!(1.5)).kind(), Some(ValueKind::Float));
        assert_eq!(JsonToken::from(json!(-3)).kind(), Some(ValueKind::Integer));
        assert_eq!(JsonToken::from(json!([])).kind(), None);
    }

    #[test]
    fn deserializes_transparently() {
        let token: JsonToken = serde_json::from_str(r#"{"x": 1}"#).unwrap();
        assert_eq!(token.to_object::<std::collections::HashMap<String, i32>>().unwrap()["x"], 1);
        let indexed = JsonToken::from(json!([1, 2]));
        assert_eq!(indexed[0], 1);
    }
}

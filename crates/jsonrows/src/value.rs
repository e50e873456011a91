use std::fmt;

use bstr::ByteSlice;
use serde::de::{DeserializeOwned, IntoDeserializer, value::Error as ProbeError};

use crate::{
    error::SyntaxError,
    tokenizer::{TokenKind, Tokenizer, TokenizeError},
};

/// Classification of a scalar, as reported for the value after a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A string.
    String,
    /// A number without fraction or exponent.
    Integer,
    /// A number with a fraction or exponent.
    Float,
    /// `true` or `false`.
    Bool,
    /// `null`.
    Null,
}

impl ValueKind {
    /// Kind of a scalar token, `None` for structural tokens.
    #[must_use]
    pub fn of_token(kind: TokenKind, is_fractional: bool) -> Option<Self> {
        match kind {
            TokenKind::String => Some(Self::String),
            TokenKind::Number if is_fractional => Some(Self::Float),
            TokenKind::Number => Some(Self::Integer),
            TokenKind::True | TokenKind::False => Some(Self::Bool),
            TokenKind::Null => Some(Self::Null),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::Null => "null",
        })
    }
}

/// A decoded JSON scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// An integer that fits in `i64`.
    I64(i64),
    /// A positive integer above `i64::MAX`.
    U64(u64),
    /// A number with a fraction or exponent.
    F64(f64),
    /// A string with its escapes resolved.
    String(String),
}

impl ScalarValue {
    /// Kind of this scalar.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::I64(_) | Self::U64(_) => ValueKind::Integer,
            Self::F64(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
        }
    }

    /// The string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if it fits in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I64(n) => Some(n),
            Self::U64(n) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    /// The integer, if it fits in `u64`.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::I64(n) => u64::try_from(n).ok(),
            Self::U64(n) => Some(n),
            _ => None,
        }
    }

    /// Any number as `f64`; large integers lose precision.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::I64(n) => Some(n as f64),
            Self::U64(n) => Some(n as f64),
            Self::F64(n) => Some(n),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Whether this is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Decodes the scalar token the tokenizer is positioned on. Returns
    /// `None` for structural tokens.
    pub(crate) fn from_token(tokenizer: &Tokenizer<'_>) -> Result<Option<Self>, TokenizeError> {
        Ok(Some(match tokenizer.token_kind() {
            TokenKind::String => Self::String(tokenizer.decode_string()?.into_owned()),
            TokenKind::Number => parse_number(tokenizer.raw(), tokenizer.is_fractional()).map_err(
                |kind| TokenizeError {
                    kind,
                    position: tokenizer.token_position(),
                },
            )?,
            TokenKind::True => Self::Bool(true),
            TokenKind::False => Self::Bool(false),
            TokenKind::Null => Self::Null,
            _ => return Ok(None),
        }))
    }

    /// Converts the scalar straight into `T` without going back through a
    /// JSON decoder. Fails when `T` does not accept this kind of scalar, in
    /// which case the caller falls back to a full decode of the raw token.
    pub(crate) fn probe<T: DeserializeOwned>(&self) -> Result<T, ProbeError> {
        match self {
            Self::Null => probe_from(()),
            Self::Bool(b) => probe_from(*b),
            Self::I64(n) => probe_from(*n),
            Self::U64(n) => probe_from(*n),
            Self::F64(n) => probe_from(*n),
            Self::String(s) => probe_from(s.as_str()),
        }
    }
}

fn probe_from<'a, T, V>(value: V) -> Result<T, ProbeError>
where
    T: DeserializeOwned,
    V: IntoDeserializer<'a, ProbeError>,
{
    T::deserialize(value.into_deserializer())
}

fn parse_number(lexeme: &[u8], is_fractional: bool) -> Result<ScalarValue, SyntaxError> {
    let text = lexeme.to_str().map_err(|_| SyntaxError::InvalidNumber)?;
    if !is_fractional {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(ScalarValue::I64(n));
        }
        if let Ok(n) = text.parse::<u64>() {
            return Ok(ScalarValue::U64(n));
        }
    }
    text.parse::<f64>()
        .map(ScalarValue::F64)
        .map_err(|_| SyntaxError::InvalidNumber)
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::I64(n) => write!(f, "{n}"),
            Self::U64(n) => write!(f, "{n}"),
            Self::F64(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<ScalarValue> for serde_json::Value {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Null => Self::Null,
            ScalarValue::Bool(b) => Self::Bool(b),
            ScalarValue::I64(n) => Self::from(n),
            ScalarValue::U64(n) => Self::from(n),
            ScalarValue::F64(n) => serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number),
            ScalarValue::String(s) => Self::String(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde::Deserialize;

    use super::*;
    use crate::tokenizer::ReaderState;

    fn scalar(input: &str) -> ScalarValue {
        let mut tokenizer = Tokenizer::new(input.as_bytes(), true, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        ScalarValue::from_token(&tokenizer).unwrap().unwrap()
    }

    #[rstest]
    #[case("116", ScalarValue::I64(116))]
    #[case("-7", ScalarValue::I64(-7))]
    #[case("18446744073709551615", ScalarValue::U64(u64::MAX))]
    #[case("1.5", ScalarValue::F64(1.5))]
    #[case("2e2", ScalarValue::F64(200.0))]
    #[case("true", ScalarValue::Bool(true))]
    #[case("null", ScalarValue::Null)]
    #[case(r#""a\nb""#, ScalarValue::String("a\nb".into()))]
    fn decodes_scalars(#[case] input: &str, #[case] expected: ScalarValue) {
        assert_eq!(scalar(input), expected);
    }

    #[test]
    fn huge_integers_fall_back_to_float() {
        assert_eq!(scalar("123456789012345678901234567890").kind(), ValueKind::Float);
    }

    #[test]
    fn containers_are_not_scalars() {
        let mut tokenizer = Tokenizer::new(b"[1]", true, ReaderState::default());
        assert!(tokenizer.read().unwrap());
        assert_eq!(ScalarValue::from_token(&tokenizer).unwrap(), None);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Status {
        Success,
        Errors,
    }

    #[test]
    fn probe_converts_matching_kinds() {
        assert_eq!(ScalarValue::I64(5).probe::<u32>().unwrap(), 5);
        assert_eq!(ScalarValue::I64(5).probe::<f64>().unwrap(), 5.0);
        assert_eq!(ScalarValue::String("x".into()).probe::<String>().unwrap(), "x");
        assert_eq!(ScalarValue::String("errors".into()).probe::<Status>().unwrap(), Status::Errors);
        assert_eq!(
            ScalarValue::Bool(true).probe::<serde_json::Value>().unwrap(),
            serde_json::Value::Bool(true)
        );
    }

    #[test]
    fn probe_rejects_mismatched_kinds() {
        assert!(ScalarValue::Bool(true).probe::<String>().is_err());
        assert!(ScalarValue::I64(-1).probe::<u64>().is_err());
        assert!(ScalarValue::String("1".into()).probe::<i64>().is_err());
    }

    #[test]
    fn into_json_value() {
        assert_eq!(serde_json::Value::from(ScalarValue::F64(f64::NAN)), serde_json::Value::Null);
        assert_eq!(serde_json::Value::from(ScalarValue::I64(3)), serde_json::json!(3));
    }
}

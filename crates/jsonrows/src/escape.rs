//! Decoding of backslash escapes inside JSON strings.
//!
//! The tokenizer only checks that escapes are well-formed while scanning.
//! Property names and string values that are actually materialized go
//! through [`unescape`], which resolves simple escapes and `\uXXXX` code
//! units, pairing UTF-16 surrogates into a single scalar value.

use crate::error::SyntaxError;

/// Accumulates the four hexadecimal digits of a `\uXXXX` escape.
#[derive(Debug, Default)]
pub(crate) struct UnicodeEscapeBuffer {
    code: u16,
    len: u8,
}

impl UnicodeEscapeBuffer {
    /// Feeds one ASCII hex digit. Returns the UTF-16 code unit once four
    /// digits have been seen, resetting for the next escape.
    pub(crate) fn feed(&mut self, digit: u8) -> Result<Option<u16>, SyntaxError> {
        let nibble = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            b'A'..=b'F' => digit - b'A' + 10,
            _ => return Err(SyntaxError::InvalidUnicodeEscapeChar(digit)),
        };
        self.code = (self.code << 4) | u16::from(nibble);
        self.len += 1;
        if self.len < 4 {
            return Ok(None);
        }
        let code = self.code;
        *self = Self::default();
        Ok(Some(code))
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..0xE000).contains(&unit)
}

/// Reads the four digits following `\u` at `bytes[at..]`.
fn code_unit_at(bytes: &[u8], at: usize) -> Result<u16, (SyntaxError, usize)> {
    let mut buffer = UnicodeEscapeBuffer::default();
    for i in at..at + 4 {
        let digit = *bytes
            .get(i)
            .ok_or((SyntaxError::UnexpectedEndOfInput, i))?;
        if let Some(unit) = buffer.feed(digit).map_err(|e| (e, i))? {
            return Ok(unit);
        }
    }
    Err((SyntaxError::UnexpectedEndOfInput, at + 4))
}

/// Resolves every escape in `content`, the bytes between a string's quotes.
///
/// On failure returns the error together with the offset into `content`.
pub(crate) fn unescape(content: &[u8]) -> Result<String, (SyntaxError, usize)> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        let Some(rel) = content[i..].iter().position(|&b| b == b'\\') else {
            out.extend_from_slice(&content[i..]);
            break;
        };
        out.extend_from_slice(&content[i..i + rel]);
        i += rel;
        let escape = *content
            .get(i + 1)
            .ok_or((SyntaxError::UnexpectedEndOfInput, i + 1))?;
        let simple = match escape {
            b'"' => Some(b'"'),
            b'\\' => Some(b'\\'),
            b'/' => Some(b'/'),
            b'b' => Some(0x08),
            b'f' => Some(0x0C),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'u' => None,
            other => return Err((SyntaxError::InvalidEscape(other), i + 1)),
        };
        if let Some(byte) = simple {
            out.push(byte);
            i += 2;
            continue;
        }

        let unit = code_unit_at(content, i + 2)?;
        let (scalar, consumed) = if is_high_surrogate(unit) {
            let low_at = i + 6;
            if content.get(low_at..low_at + 2) != Some(b"\\u".as_slice()) {
                return Err((
                    SyntaxError::InvalidUnicodeEscapeSequence(u32::from(unit)),
                    i,
                ));
            }
            let low = code_unit_at(content, low_at + 2)?;
            if !is_low_surrogate(low) {
                return Err((
                    SyntaxError::InvalidUnicodeEscapeSequence(u32::from(low)),
                    low_at,
                ));
            }
            let high = u32::from(unit - 0xD800);
            let low = u32::from(low - 0xDC00);
            (0x1_0000 + (high << 10) + low, 12)
        } else if is_low_surrogate(unit) {
            return Err((
                SyntaxError::InvalidUnicodeEscapeSequence(u32::from(unit)),
                i,
            ));
        } else {
            (u32::from(unit), 6)
        };
        let ch = char::from_u32(scalar).ok_or((
            SyntaxError::InvalidUnicodeEscapeSequence(scalar),
            i,
        ))?;
        let mut utf8 = [0; 4];
        out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        i += consumed;
    }
    String::from_utf8(out).map_err(|e| (SyntaxError::InvalidUtf8, e.utf8_error().valid_up_to()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_decodes_after_four_digits() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(buf.feed(b'0').unwrap(), None);
        assert_eq!(buf.feed(b'0').unwrap(), None);
        assert_eq!(buf.feed(b'4').unwrap(), None);
        assert_eq!(buf.feed(b'1').unwrap(), Some(0x41));
        assert_eq!(buf.feed(b'A').unwrap(), None);
    }

    #[test]
    fn feed_rejects_non_hex() {
        let mut buf = UnicodeEscapeBuffer::default();
        assert_eq!(
            buf.feed(b'g'),
            Err(SyntaxError::InvalidUnicodeEscapeChar(b'g'))
        );
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(
            unescape(br#"a\"b\\c\/d\b\f\n\r\t"#).unwrap(),
            "a\"b\\c/d\u{8}\u{c}\n\r\t"
        );
    }

    #[test]
    fn unicode_escapes_and_surrogate_pairs() {
        assert_eq!(unescape(br"\u00e9t\u00E9").unwrap(), "\u{e9}t\u{e9}");
        assert_eq!(unescape(br"\ud83d\ude00!").unwrap(), "\u{1F600}!");
    }

    #[test]
    fn lone_surrogates_are_rejected() {
        assert_eq!(
            unescape(br"\ud83dx"),
            Err((SyntaxError::InvalidUnicodeEscapeSequence(0xD83D), 0))
        );
        assert_eq!(
            unescape(br"ab\ude00"),
            Err((SyntaxError::InvalidUnicodeEscapeSequence(0xDE00), 2))
        );
    }

    #[test]
    fn invalid_escape_reports_offset() {
        assert_eq!(unescape(br"ab\q"), Err((SyntaxError::InvalidEscape(b'q'), 3)));
    }

    #[quickcheck_macros::quickcheck]
    fn unescapes_what_serde_json_escapes(text: String) -> bool {
        let quoted = serde_json::to_string(&text).unwrap();
        unescape(&quoted.as_bytes()[1..quoted.len() - 1]) == Ok(text)
    }

    #[test]
    fn raw_utf8_passes_through() {
        assert_eq!(unescape("naïve \\n".as_bytes()).unwrap(), "naïve \n");
        assert_eq!(unescape(b"\xff\\n").unwrap_err().0, SyntaxError::InvalidUtf8);
    }
}

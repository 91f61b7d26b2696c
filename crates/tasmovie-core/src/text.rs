//! Field reader for the controller frame text format.
//!
//! A serialized frame is a single line of `|`-separated fields. Every field
//! ends at `|`, CR, LF, NUL or the end of the input; running off the end of
//! the slice reads as NUL.

use crate::error::{Error, Result};

#[inline]
pub(crate) fn is_terminator(ch: u8) -> bool {
    matches!(ch, b'|' | b'\r' | b'\n' | 0)
}

#[inline]
fn is_blank(ch: u8) -> bool {
    ch == b' ' || ch == b'\t'
}

pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn rest(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or(&[])
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    #[inline]
    pub(crate) fn peek(&self) -> u8 {
        self.buf.get(self.pos).copied().unwrap_or(0)
    }

    pub(crate) fn at_terminator(&self) -> bool {
        is_terminator(self.peek())
    }

    /// Consumes a `|` if one is next.
    pub(crate) fn eat_pipe(&mut self) -> bool {
        if self.peek() == b'|' {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while is_blank(self.peek()) {
            self.pos += 1;
        }
    }

    /// Reads one button character. `.`, space and tab are released; any
    /// other non-terminator is pressed. Terminators are not consumed.
    pub(crate) fn read_button(&mut self) -> bool {
        let ch = self.peek();
        if is_terminator(ch) {
            return false;
        }
        self.pos += 1;
        ch != b'.' && !is_blank(ch)
    }

    /// Reads an optionally signed decimal axis value. A field that ends
    /// before the number starts reads as 0.
    pub(crate) fn read_axis(&mut self) -> Result<i16> {
        self.skip_whitespace();
        if self.at_terminator() {
            return Ok(0);
        }
        let negative = match self.peek() {
            b'-' => {
                self.pos += 1;
                true
            }
            b'+' => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        let start = self.pos;
        let mut value: i32 = 0;
        while self.peek().is_ascii_digit() {
            value = value * 10 + i32::from(self.peek() - b'0');
            if value > 32768 {
                return Err(Error::BadSerialization(format!(
                    "axis value out of range at offset {start}"
                )));
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::BadSerialization(format!(
                "expected digits at offset {start}"
            )));
        }
        let next = self.peek();
        if !is_terminator(next) && !is_blank(next) {
            return Err(Error::BadSerialization(format!(
                "unterminated numeric field at offset {}",
                self.pos
            )));
        }
        let value = if negative { -value } else { value };
        i16::try_from(value).map_err(|_| {
            Error::BadSerialization(format!("axis value out of range at offset {start}"))
        })
    }

    /// Ends the current field: only whitespace may remain before the
    /// terminator. With `include_pipe` a following `|` is consumed too.
    pub(crate) fn finish_field(&mut self, include_pipe: bool) -> Result<()> {
        self.skip_whitespace();
        if !self.at_terminator() {
            return Err(Error::BadSerialization(format!(
                "unexpected character {:?} at offset {}",
                char::from(self.peek()),
                self.pos
            )));
        }
        if include_pipe {
            self.eat_pipe();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_stop_at_terminators() {
        let mut reader = FieldReader::new(b"A.|B");
        assert!(reader.read_button());
        assert!(!reader.read_button());
        assert!(!reader.read_button());
        assert_eq!(reader.pos(), 2);
        assert!(reader.eat_pipe());
        assert!(reader.read_button());
        assert!(!reader.read_button());
    }

    #[test]
    fn axes_parse_signs_and_missing_values() {
        let mut reader = FieldReader::new(b" -12 +7 300|");
        assert_eq!(reader.read_axis().expect("axis"), -12);
        assert_eq!(reader.read_axis().expect("axis"), 7);
        assert_eq!(reader.read_axis().expect("axis"), 300);
        assert_eq!(reader.read_axis().expect("missing axis"), 0);
        assert_eq!(reader.peek(), b'|');
    }

    #[test]
    fn axis_extremes() {
        let mut reader = FieldReader::new(b"-32768 32767");
        assert_eq!(reader.read_axis().expect("min"), i16::MIN);
        assert_eq!(reader.read_axis().expect("max"), i16::MAX);
        assert!(FieldReader::new(b"32768").read_axis().is_err());
        assert!(FieldReader::new(b"99999999999").read_axis().is_err());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            FieldReader::new(b"12x").read_axis(),
            Err(Error::BadSerialization(_))
        ));
        assert!(matches!(
            FieldReader::new(b"- 3").read_axis(),
            Err(Error::BadSerialization(_))
        ));
    }

    #[test]
    fn finish_field_rejects_trailing_garbage() {
        let mut reader = FieldReader::new(b"  |x");
        reader.finish_field(true).expect("only whitespace");
        assert_eq!(reader.peek(), b'x');
        assert!(reader.finish_field(false).is_err());
    }
}

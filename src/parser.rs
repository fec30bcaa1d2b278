//! implements a parser for RESP reply header lines.
use std::fmt;

use bytes::Bytes;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsingError {
    BadFormat,
    UnknownReplyType,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::BadFormat => "bad format",
            Self::UnknownReplyType => "unknown reply type",
        })
    }
}

impl std::error::Error for ParsingError {}

/// The first line of a reply, with its CRLF already removed. Bulk and array
/// headers announce what follows; the others are complete replies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyHeader {
    /// On the wire: `+<text>`
    Status(Bytes),
    /// On the wire: `-<reason>`
    Error(String),
    /// On the wire: `:<n>`
    Integer(i64),
    /// On the wire: `$<len>`, or `$-1` for nil.
    Bulk(Option<usize>),
    /// On the wire: `*<n>`, or `*-1` for nil.
    Array(Option<usize>),
}

/// Provides a custom, minimal, zero-copy parser of byte slices.
struct ParseState<'a> {
    from: &'a [u8],
}

impl ParseState<'_> {
    /// Consumes the rest of the input, expecting a signed decimal i64 and
    /// nothing else.
    fn expect_i64(&mut self) -> Result<i64, ParsingError> {
        let (negative, digits) = match self.from {
            [b'-', rest @ ..] => (true, rest),
            rest => (false, rest),
        };

        if digits.is_empty() {
            return Err(ParsingError::BadFormat);
        }

        // Accumulate negatively so i64::MIN parses without overflow.
        let mut r = 0i64;
        for v in digits {
            match v {
                b'0'..=b'9' => {
                    r = r
                        .checked_mul(10)
                        .ok_or(ParsingError::BadFormat)?
                        .checked_sub((*v - b'0') as i64)
                        .ok_or(ParsingError::BadFormat)?
                },
                _ => return Err(ParsingError::BadFormat),
            };
        }

        self.from = &[];

        if negative {
            Ok(r)
        } else {
            r.checked_neg().ok_or(ParsingError::BadFormat)
        }
    }

    /// Consumes the rest of the input, expecting a length: -1 for nil or a
    /// non-negative count.
    fn expect_length(&mut self) -> Result<Option<usize>, ParsingError> {
        match self.expect_i64()? {
            -1 => Ok(None),
            n => usize::try_from(n)
                .map(Some)
                .map_err(|_| ParsingError::BadFormat),
        }
    }

    /// Consumes the rest of the input as text.
    fn take_rest(&mut self) -> &[u8] {
        let rest = self.from;
        self.from = &[];
        rest
    }
}

impl<'a> From<&'a [u8]> for ParseState<'a> {
    fn from(from: &'a [u8]) -> Self {
        ParseState { from }
    }
}

impl TryFrom<&[u8]> for ReplyHeader {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, ParsingError> {
        use ReplyHeader::*;

        let (kind, rest) = value.split_first().ok_or(ParsingError::BadFormat)?;
        let mut ps: ParseState = rest.into();

        Ok(match kind {
            b'+' => Status(Bytes::copy_from_slice(ps.take_rest())),
            b'-' => Error(String::from_utf8_lossy(ps.take_rest()).into_owned()),
            b':' => Integer(ps.expect_i64()?),
            b'$' => Bulk(ps.expect_length()?),
            b'*' => Array(ps.expect_length()?),
            _ => return Err(ParsingError::UnknownReplyType),
        })
    }
}

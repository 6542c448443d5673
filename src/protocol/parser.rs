//! Incremental RESP Frame Parser
//!
//! Turns the bytes buffered from a connection into [`RespValue`] frames by
//! reading declared lengths, never by assuming where a line sits.
//!
//! ## Contract
//!
//! [`RespParser::parse`] returns:
//! - `Ok(Some((value, consumed)))` when a full frame starts at `buf[0]`;
//!   the caller advances its buffer by `consumed`
//! - `Ok(None)` when the frame is incomplete and more bytes are needed
//! - `Err(ParseError)` when the bytes can never form a valid frame
//!
//! A frame may therefore arrive split over any number of reads, and one read
//! may carry several frames.
//!
//! Lines that do not start with a RESP type prefix are parsed as inline
//! commands (`PING\r\n`, `SET foo bar\r\n`), the form telnet and `redis-cli`
//! fall back to.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A length or integer field is not a decimal number
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Simple string or error line is not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid multibulk length: {0}")]
    InvalidArrayLength(i64),

    /// Bulk payload not followed by CRLF
    #[error("expected CRLF after bulk string payload")]
    MissingCrlf,

    /// Arrays nested deeper than the parser allows
    #[error("nesting depth exceeds {0}")]
    TooDeep(usize),

    /// The declared bulk length exceeds the configured maximum
    #[error("bulk string too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// An inline command line runs past the limit without a CRLF
    #[error("too big inline request (max: {0} bytes)")]
    InlineTooLong(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum number of elements in one array (same as Redis)
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Maximum length of an inline command line (64 KB, same as Redis)
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// A stateless, incremental RESP parser.
///
/// # Example
///
/// ```
/// use respkv::protocol::{RespParser, RespValue};
///
/// let parser = RespParser::new();
/// let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
/// let (frame, consumed) = parser.parse(buf).unwrap().unwrap();
///
/// assert_eq!(consumed, buf.len());
/// assert_eq!(
///     frame,
///     RespValue::Array(vec![RespValue::bulk_string("GET"), RespValue::bulk_string("foo")])
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RespParser {
    max_bulk_size: usize,
    max_depth: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a parser with the default limits.
    pub fn new() -> Self {
        Self {
            max_bulk_size: MAX_BULK_SIZE,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Overrides the largest accepted bulk string.
    pub fn with_max_bulk_size(mut self, max: usize) -> Self {
        self.max_bulk_size = max;
        self
    }

    /// Attempts to parse one frame from the start of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.parse_value(buf, 0)
    }

    fn parse_value(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING | prefix::ERROR | prefix::INTEGER => parse_single_line(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf, depth),
            _ => self.parse_inline(buf, depth),
        }
    }

    /// `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some((header, header_len)) = read_line(buf) else {
            return Ok(None);
        };

        let length = parse_decimal(header)?;
        if length == -1 {
            return Ok(Some((RespValue::Null, header_len)));
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }

        let length = length as usize;
        if length > self.max_bulk_size {
            return Err(ParseError::TooLarge {
                size: length,
                max: self.max_bulk_size,
            });
        }

        let end = header_len + length;
        if buf.len() < end + CRLF.len() {
            return Ok(None);
        }
        if &buf[end..end + CRLF.len()] != CRLF {
            return Err(ParseError::MissingCrlf);
        }

        let data = Bytes::copy_from_slice(&buf[header_len..end]);
        Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
    }

    /// `*<count>\r\n<element>...`
    fn parse_array(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        if depth >= self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth));
        }

        let Some((header, mut consumed)) = read_line(buf) else {
            return Ok(None);
        };

        let count = parse_decimal(header)?;
        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if !(0..=MAX_ARRAY_LEN).contains(&count) {
            return Err(ParseError::InvalidArrayLength(count));
        }

        // Cap the pre-allocation; the count is client controlled.
        let mut elements = Vec::with_capacity((count as usize).min(64));
        for _ in 0..count {
            match self.parse_value(&buf[consumed..], depth + 1)? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(elements), consumed)))
    }

    /// A whitespace separated command line without RESP framing.
    ///
    /// Blank and whitespace-only lines before the command are consumed
    /// along with it.
    fn parse_inline(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        let mut start = 0;
        loop {
            start += skip_blank_lines(&buf[start..]);
            let line = &buf[start..];

            if line.first().is_some_and(|&b| is_type_prefix(b)) {
                return Ok(self
                    .parse_value(line, depth)?
                    .map(|(value, used)| (value, start + used)));
            }

            let window = &line[..line.len().min(MAX_INLINE_SIZE + CRLF.len())];
            let Some(pos) = find_crlf(window) else {
                if line.len() > MAX_INLINE_SIZE {
                    return Err(ParseError::InlineTooLong(MAX_INLINE_SIZE));
                }
                return Ok(None);
            };
            let line_len = pos + CRLF.len();

            let words: Vec<RespValue> = line[..pos]
                .split(|b| b.is_ascii_whitespace())
                .filter(|word| !word.is_empty())
                .map(|word| RespValue::BulkString(Bytes::copy_from_slice(word)))
                .collect();

            if words.is_empty() {
                start += line_len;
                continue;
            }

            return Ok(Some((RespValue::Array(words), start + line_len)));
        }
    }
}

/// Number of leading bytes of `buf` taken up by complete lines holding
/// nothing but spaces or tabs.
pub fn skip_blank_lines(buf: &[u8]) -> usize {
    let mut start = 0;
    loop {
        let rest = &buf[start..];
        let pad = rest
            .iter()
            .take(MAX_INLINE_SIZE)
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        if !rest[pad..].starts_with(CRLF) {
            return start;
        }
        start += pad + CRLF.len();
    }
}

fn is_type_prefix(b: u8) -> bool {
    matches!(
        b,
        prefix::SIMPLE_STRING
            | prefix::ERROR
            | prefix::INTEGER
            | prefix::BULK_STRING
            | prefix::ARRAY
    )
}

/// `+<text>\r\n`, `-<text>\r\n` or `:<n>\r\n`
fn parse_single_line(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((line, used)) = read_line(buf) else {
        return Ok(None);
    };

    let value = match buf[0] {
        prefix::SIMPLE_STRING => RespValue::SimpleString(utf8(line, "simple string")?.to_string()),
        prefix::ERROR => RespValue::Error(utf8(line, "error")?.to_string()),
        _ => RespValue::Integer(parse_decimal(line)?),
    };

    Ok(Some((value, used)))
}

/// Splits off the header line of a prefixed element.
///
/// Returns the line content without its prefix byte and CRLF, plus the
/// number of bytes the whole line occupies.
#[inline]
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    find_crlf(&buf[1..]).map(|pos| (&buf[1..1 + pos], 1 + pos + CRLF.len()))
}

/// Position of the first CRLF in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn parse_decimal(line: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

fn utf8<'a>(line: &'a [u8], what: &'static str) -> ParseResult<&'a str> {
    std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8(what))
}

/// Parses a single frame with a default parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::BulkString(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = parse_message(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_error() {
        let (value, consumed) = parse_message(b"-ERR boom\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Error("ERR boom".to_string()));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_integer() {
        let (value, consumed) = parse_message(b":-42\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(-42));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_bulk_string() {
        let (value, consumed) = parse_message(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(value, bulk("hello"));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_bulk_string_with_crlf_inside() {
        // The declared length wins over any CRLF in the payload.
        let (value, consumed) = parse_message(b"$4\r\na\r\nb\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from_static(b"a\r\nb")));
        assert_eq!(consumed, 10);
    }

    #[test]
    fn test_parse_null_and_empty_bulk() {
        assert_eq!(
            parse_message(b"$-1\r\n").unwrap(),
            Some((RespValue::Null, 5))
        );
        assert_eq!(parse_message(b"$0\r\n\r\n").unwrap(), Some((bulk(""), 6)));
    }

    #[test]
    fn test_parse_set_with_px() {
        let input = b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$3\r\n100\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                bulk("SET"),
                bulk("foo"),
                bulk("bar"),
                bulk("PX"),
                bulk("100")
            ])
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_incomplete_frames() {
        let full = b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n";
        for cut in 0..full.len() {
            assert_eq!(
                parse_message(&full[..cut]).unwrap(),
                None,
                "prefix of length {} should be incomplete",
                cut
            );
        }
        assert!(parse_message(full).unwrap().is_some());
    }

    #[test]
    fn test_parse_two_frames_in_one_buffer() {
        let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let (first, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(first, RespValue::Array(vec![bulk("PING")]));
        assert_eq!(consumed, 14);

        let (second, rest) = parse_message(&input[consumed..]).unwrap().unwrap();
        assert_eq!(second, first);
        assert_eq!(consumed + rest, input.len());
    }

    #[test]
    fn test_parse_nested_array() {
        let (value, _) = parse_message(b"*2\r\n:1\r\n*1\r\n+x\r\n").unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::SimpleString("x".to_string())]),
            ])
        );
    }

    #[test]
    fn test_parse_inline_command() {
        let (value, consumed) = parse_message(b"SET  foo bar\r\n").unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![bulk("SET"), bulk("foo"), bulk("bar")])
        );
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_parse_inline_skips_blank_lines() {
        let (value, consumed) = parse_message(b"\r\n\r\nPING\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("PING")]));
        assert_eq!(consumed, 10);

        assert_eq!(parse_message(b"\r\n").unwrap(), None);
    }

    #[test]
    fn test_parse_blank_lines_before_resp_frame() {
        let (value, consumed) = parse_message(b"\r\n \r\n*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("PING")]));
        assert_eq!(consumed, 19);
    }

    #[test]
    fn test_parse_long_run_of_blank_lines() {
        let blank = "\r\n".repeat(512 * 1024);
        let input = format!("{}PING\r\n", blank);
        let (value, consumed) = parse_message(input.as_bytes()).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("PING")]));
        assert_eq!(consumed, input.len());

        let spaces = " \t \r\n".repeat(256 * 1024);
        let input = format!("{}ECHO hi\r\n", spaces);
        let (value, consumed) = parse_message(input.as_bytes()).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("ECHO"), bulk("hi")]));
        assert_eq!(consumed, input.len());

        assert_eq!(parse_message(blank.as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_skip_blank_lines() {
        assert_eq!(skip_blank_lines(b""), 0);
        assert_eq!(skip_blank_lines(b"\r\n\r\nPING\r\n"), 4);
        assert_eq!(skip_blank_lines(b"  \r\n\t\r\n*1\r\n"), 7);
        assert_eq!(skip_blank_lines(b"  PING\r\n"), 0);
        assert_eq!(skip_blank_lines(b"\r\n\r"), 2);
    }

    #[test]
    fn test_parse_inline_too_long() {
        let mut line = vec![b'a'; MAX_INLINE_SIZE];
        assert_eq!(parse_message(&line).unwrap(), None);

        line.push(b'a');
        assert_eq!(
            parse_message(&line),
            Err(ParseError::InlineTooLong(MAX_INLINE_SIZE))
        );

        let mut at_limit = vec![b'a'; MAX_INLINE_SIZE];
        at_limit.extend_from_slice(b"\r\n");
        let (value, consumed) = parse_message(&at_limit).unwrap().unwrap();
        assert_eq!(consumed, at_limit.len());
        assert!(matches!(value, RespValue::Array(words) if words.len() == 1));
    }

    #[test]
    fn test_parse_array_length_limit() {
        let input = format!("*{}\r\n", MAX_ARRAY_LEN + 1);
        assert_eq!(
            parse_message(input.as_bytes()),
            Err(ParseError::InvalidArrayLength(MAX_ARRAY_LEN + 1))
        );
    }

    #[test]
    fn test_parse_invalid_lengths() {
        assert!(matches!(
            parse_message(b"*x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            parse_message(b"$-2\r\n"),
            Err(ParseError::InvalidBulkLength(-2))
        );
        assert_eq!(
            parse_message(b"*-5\r\n"),
            Err(ParseError::InvalidArrayLength(-5))
        );
    }

    #[test]
    fn test_parse_missing_trailing_crlf() {
        assert_eq!(
            parse_message(b"$3\r\nfooXY"),
            Err(ParseError::MissingCrlf)
        );
    }

    #[test]
    fn test_parse_too_large() {
        let parser = RespParser::new().with_max_bulk_size(4);
        assert_eq!(
            parser.parse(b"$5\r\nhello\r\n"),
            Err(ParseError::TooLarge { size: 5, max: 4 })
        );
    }

    #[test]
    fn test_parse_too_deep() {
        let input = "*1\r\n".repeat(MAX_NESTING_DEPTH + 1);
        assert_eq!(
            parse_message(input.as_bytes()),
            Err(ParseError::TooDeep(MAX_NESTING_DEPTH))
        );
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let (value, _) = parse_message(b"$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from(&b"hel\x00o"[..])));
    }
}

//! RESP Value Types
//!
//! The subset of RESP this server reads and writes:
//!
//! - `+` Simple String: `+OK\r\n`
//! - `-` Error: `-ERR unknown option\r\n`
//! - `:` Integer: `:42\r\n` (accepted inside requests only)
//! - `$` Bulk String: `$5\r\nhello\r\n`, null as `$-1\r\n`
//! - `*` Array: `*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n`
//!
//! Every element is terminated with CRLF. Bulk string lengths are byte
//! counts, so multi-byte UTF-8 payloads are framed correctly.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP value, either decoded from a request or built as a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<text>\r\n`. Must not contain CR or LF.
    SimpleString(String),

    /// `-<message>\r\n`
    Error(String),

    /// `:<n>\r\n`
    Integer(i64),

    /// `$<len>\r\n<bytes>\r\n`, binary safe.
    BulkString(Bytes),

    /// Null bulk string (`$-1\r\n`). A null array in a request also decodes here.
    Null,

    /// `*<count>\r\n` followed by the elements.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a simple string reply.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::types::RespValue;
    /// assert_eq!(RespValue::simple_string("OK").serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a bulk string reply.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::types::RespValue;
    /// let bulk = RespValue::bulk_string("héllo");
    /// assert_eq!(bulk.serialize(), "$6\r\nhéllo\r\n".as_bytes());
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null bulk string reply.
    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value into its wire representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value, appending to `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Returns the payload of a string-like value.
    ///
    /// Integers are rendered in decimal so that `SET n 1` sent with an
    /// integer element still yields the argument `"1"`.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            RespValue::BulkString(b) => Some(b.clone()),
            RespValue::SimpleString(s) => Some(Bytes::from(s.clone())),
            RespValue::Integer(n) => Some(Bytes::from(n.to_string())),
            _ => None,
        }
    }
}

#[inline]
fn write_line(buf: &mut Vec<u8>, prefix: u8, content: &[u8]) {
    buf.push(prefix);
    buf.extend_from_slice(content);
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR wrong number of arguments for 'get' command");
        assert_eq!(
            value.serialize(),
            b"-ERR wrong number of arguments for 'get' command\r\n"
        );
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_bulk_string_uses_byte_length() {
        // 2 characters, 6 bytes
        let value = RespValue::bulk_string("日本");
        assert_eq!(value.serialize(), "$6\r\n日本\r\n".as_bytes());
    }

    #[test]
    fn test_empty_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::new());
        assert_eq!(value.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::Array(vec![
            RespValue::bulk_string("GET"),
            RespValue::bulk_string("foo"),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(
            RespValue::bulk_string("k").to_bytes(),
            Some(Bytes::from("k"))
        );
        assert_eq!(
            RespValue::Integer(-7).to_bytes(),
            Some(Bytes::from("-7"))
        );
        assert_eq!(RespValue::Null.to_bytes(), None);
        assert_eq!(RespValue::Array(vec![]).to_bytes(), None);
    }
}

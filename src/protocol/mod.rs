//! RESP Protocol
//!
//! Framing for the REdis Serialization Protocol subset the server speaks.
//!
//! - `types`: the `RespValue` enum and its wire encoding
//! - `parser`: an incremental, length-driven frame parser
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_message, RespValue};
//!
//! let (frame, _) = parse_message(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
//! assert_eq!(frame, RespValue::Array(vec![RespValue::bulk_string("PING")]));
//!
//! assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, skip_blank_lines, ParseError, ParseResult, RespParser};
pub use types::RespValue;

//! Command Decoding
//!
//! Turns a parsed RESP frame into a typed [`Command`]. The frame must be an
//! array of strings; the first element names the command (case-insensitive).

use crate::protocol::RespValue;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Reasons a frame cannot be turned into a command.
///
/// The `Display` text is sent to the client verbatim as a RESP error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR invalid command format, expected an array of strings")]
    NotAnArray,

    #[error("ERR empty command")]
    Empty,

    #[error("ERR invalid argument, expected a string")]
    InvalidArgument,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING [message]`
    Ping(Option<Bytes>),

    /// `ECHO message`
    Echo(Bytes),

    /// `SET key value [PX milliseconds | EX seconds]`
    Set {
        key: Bytes,
        value: Bytes,
        ttl: Option<Duration>,
    },

    /// `GET key`
    Get(Bytes),

    /// `INFO [section]`, section lower-cased
    Info(Option<String>),

    /// Anything else, answered like `PING`.
    Unknown(String),
}

impl Command {
    /// Decodes a request frame.
    ///
    /// # Example
    ///
    /// ```
    /// use respkv::commands::Command;
    /// use respkv::protocol::RespValue;
    ///
    /// let frame = RespValue::Array(vec![
    ///     RespValue::bulk_string("get"),
    ///     RespValue::bulk_string("foo"),
    /// ]);
    /// assert_eq!(Command::from_frame(frame), Ok(Command::Get("foo".into())));
    /// ```
    pub fn from_frame(frame: RespValue) -> Result<Command, CommandError> {
        let RespValue::Array(items) = frame else {
            return Err(CommandError::NotAnArray);
        };

        let mut args = items
            .iter()
            .map(|item| item.to_bytes().ok_or(CommandError::InvalidArgument))
            .collect::<Result<Vec<Bytes>, _>>()?
            .into_iter();

        let name = args.next().ok_or(CommandError::Empty)?;
        let name = String::from_utf8_lossy(&name).to_ascii_lowercase();
        let args: Vec<Bytes> = args.collect();

        match name.as_str() {
            "ping" if args.is_empty() => Ok(Command::Ping(None)),
            "ping" => single(args, "ping").map(|msg| Command::Ping(Some(msg))),
            "echo" => single(args, "echo").map(Command::Echo),
            "get" => single(args, "get").map(Command::Get),
            "set" => parse_set(args),
            "info" => Ok(Command::Info(
                args.first()
                    .map(|section| String::from_utf8_lossy(section).to_ascii_lowercase()),
            )),
            _ => Ok(Command::Unknown(name)),
        }
    }

    /// Lower-case command name, for logging.
    pub fn name(&self) -> &str {
        match self {
            Command::Ping(_) => "ping",
            Command::Echo(_) => "echo",
            Command::Set { .. } => "set",
            Command::Get(_) => "get",
            Command::Info(_) => "info",
            Command::Unknown(name) => name.as_str(),
        }
    }
}

fn single(args: Vec<Bytes>, name: &'static str) -> Result<Bytes, CommandError> {
    let [arg]: [Bytes; 1] = args.try_into().map_err(|_| CommandError::WrongArity(name))?;
    Ok(arg)
}

fn parse_set(args: Vec<Bytes>) -> Result<Command, CommandError> {
    let mut args = args.into_iter();
    let (Some(key), Some(value)) = (args.next(), args.next()) else {
        return Err(CommandError::WrongArity("set"));
    };

    let mut ttl = None;
    while let Some(option) = args.next() {
        let unit: fn(u64) -> Duration = if option.eq_ignore_ascii_case(b"px") {
            Duration::from_millis
        } else if option.eq_ignore_ascii_case(b"ex") {
            Duration::from_secs
        } else {
            continue;
        };

        // An unparsable or zero amount means "no expiry", not an error.
        ttl = args
            .next()
            .and_then(|amount| parse_u64(&amount))
            .filter(|&n| n > 0)
            .map(unit);
    }

    Ok(Command::Set { key, value, ttl })
}

fn parse_u64(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

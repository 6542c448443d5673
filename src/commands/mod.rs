//! Commands
//!
//! ```text
//! RespValue frame ──► Command::from_frame ──► CommandHandler::dispatch ──► RespValue reply
//!                      (command.rs)            (handler.rs)
//!                                                 │
//!                                                 ├── Store
//!                                                 └── ReplicationInfo
//! ```
//!
//! Supported: `PING [message]`, `ECHO message`, `SET key value [PX ms | EX s]`,
//! `GET key`, `INFO [section]`. Other command names are answered with `+PONG`.

pub mod command;
pub mod handler;

pub use command::{Command, CommandError};
pub use handler::CommandHandler;

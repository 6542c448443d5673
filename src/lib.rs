//! # respkv
//!
//! A small in-memory key-value server speaking a subset of RESP (the Redis
//! serialization protocol) over TCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TcpListener (main.rs) ── one tokio task per accepted connection  │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼
//!                   ┌──────────────────────────┐
//!                   │    ConnectionHandler     │  read ─► parse ─► execute ─► write
//!                   └─────────────┬────────────┘
//!                                 │ RespValue frames
//!                                 ▼
//!   ┌────────────┐  ┌──────────────────────────┐
//!   │ RespParser │  │      CommandHandler      │
//!   └────────────┘  └──────┬─────────────┬─────┘
//!                          ▼             ▼
//!              ┌────────────────┐ ┌─────────────────┐
//!              │     Store      │ │ ReplicationInfo │
//!              │ Mutex<HashMap> │ │ (static)        │
//!              └────────────────┘ └─────────────────┘
//! ```
//!
//! ## Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [PX milliseconds | EX seconds]`
//! - `GET key`
//! - `INFO [replication]`
//!
//! Any other command name is answered with `+PONG`.
//!
//! ## Embedding
//!
//! ```ignore
//! use respkv::{handle_connection, CommandHandler, ConnectionStats, ReplicationInfo, Store};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! let storage = Arc::new(Store::new());
//! let replication = Arc::new(ReplicationInfo::master());
//! let stats = Arc::new(ConnectionStats::new());
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     let handler = CommandHandler::new(Arc::clone(&storage), Arc::clone(&replication));
//!     tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//! }
//! ```
//!
//! ## Expiry
//!
//! Keys written with `PX` are expired lazily: the entry is removed the next
//! time a `GET` finds it past its deadline. A background sweep can be turned
//! on with `--sweep-interval-ms`.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod replication;
pub mod storage;

pub use commands::{Command, CommandHandler};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use replication::{ReplicationInfo, Role};
pub use storage::{ExpirySweeper, Store};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Connections
//!
//! Each accepted client runs [`handle_connection`] in its own tokio task. The
//! handler is generic over the stream, so anything implementing
//! `AsyncRead + AsyncWrite + Unpin` can be served: a `TcpStream` in
//! production, an in-memory mock in tests.
//!
//! ```ignore
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&storage), Arc::clone(&replication));
//! tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};

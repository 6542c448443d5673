//! Session Loop
//!
//! One `ConnectionHandler` per accepted client, running in its own task:
//!
//! ```text
//! ┌──────────► read bytes into buffer ──── 0 bytes ──► close
//! │                    │
//! │                    ▼
//! │          parse frames from buffer ──── protocol error ──► -ERR, close
//! │                    │
//! │                    ▼  (for each complete frame, in order)
//! │          execute, write reply, flush
//! │                    │
//! └────────────────────┘
//! ```
//!
//! A frame split across reads waits in the buffer until it is complete, and
//! several frames delivered by one read are answered in order. The stream is
//! owned by the handler and closed when it is dropped, whichever way the loop
//! ends.

use crate::commands::CommandHandler;
use crate::protocol::{skip_blank_lines, ParseError, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Largest amount of unparsed data held for one client (8 MB)
const MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Largest bulk string accepted from a client (4 MB)
const MAX_BULK_SIZE: usize = 4 * 1024 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters shared by every session.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Sessions accepted since startup
    pub connections_accepted: AtomicU64,
    /// Sessions currently open
    pub active_connections: AtomicU64,
    /// Frames executed, including ones answered with an error
    pub commands_processed: AtomicU64,
    /// Bytes received from clients
    pub bytes_read: AtomicU64,
    /// Bytes of replies written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// Peer closed the stream in the middle of a frame
    #[error("connection closed with {0} unparsed bytes")]
    UnexpectedEof(usize),

    #[error("request exceeds the 8 MB buffer limit")]
    BufferFull,
}

/// Drives one client session over any duplex byte stream.
pub struct ConnectionHandler<S> {
    /// Client stream, with replies buffered until flushed
    stream: BufWriter<S>,

    /// Peer address, for logging
    addr: SocketAddr,

    /// Bytes read but not yet parsed
    buffer: BytesMut,

    /// Dispatcher over the shared store
    command_handler: CommandHandler,

    /// Frame parser with this session's bulk size limit
    parser: RespParser,

    /// Counters shared with every other session
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new().with_max_bulk_size(MAX_BULK_SIZE),
            stats,
        }
    }

    /// Runs the session until the peer disconnects or an error occurs.
    ///
    /// A clean disconnect between requests returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            loop {
                let frame = match self.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => {
                        // The stream cannot be resynchronized after a bad frame.
                        let reply = RespValue::error(format!("ERR Protocol error: {}", e));
                        self.send_response(&reply).await?;
                        return Err(e.into());
                    }
                };

                let response = self.command_handler.execute(frame);
                self.stats.command_processed();
                self.send_response(&response).await?;
            }

            if !self.read_more_data().await? {
                return Ok(());
            }
        }
    }

    /// Takes one complete frame off the front of the buffer.
    fn next_frame(&mut self) -> Result<Option<RespValue>, ParseError> {
        // Blank lines are dropped once so they are not rescanned on every read.
        let blank = skip_blank_lines(&self.buffer);
        self.buffer.advance(blank);

        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((frame, consumed)) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed frame"
                );
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Reads from the socket. Returns `false` on a clean end of stream.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return if self.buffer.is_empty() {
                Ok(false)
            } else {
                Err(ConnectionError::UnexpectedEof(self.buffer.len()))
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(true)
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            reply = %response,
            "Sent response"
        );
        Ok(())
    }
}

/// Runs a session to completion, logging how it ended.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Session ended with error");
    }
}

//! Command-Line Configuration

use crate::replication::{ReplicaOf, ReplicationInfo};
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// A small in-memory key-value server speaking RESP.
#[derive(Debug, Clone, Parser)]
#[command(name = "respkv", version)]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Report the replica role for the given master, e.g. "localhost 6379".
    /// The master is never contacted.
    #[arg(long, value_name = "HOST PORT")]
    pub replicaof: Option<ReplicaOf>,

    /// Also expire unread keys in the background every N milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_ms: Option<u64>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn replication(&self) -> ReplicationInfo {
        ReplicationInfo::from_replica_of(self.replicaof.clone())
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }
}

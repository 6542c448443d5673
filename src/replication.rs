//! Replication Metadata
//!
//! A static description of this node's replication role, reported by
//! `INFO replication`. No replication stream exists: the offset stays at 0
//! and a configured master is never contacted.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Replication id reported by every node. 40 lowercase hex characters.
pub const DEFAULT_REPL_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

/// The role this node was started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Replica,
}

impl Role {
    /// The name used in `INFO` output. Replicas report `slave`, as Redis does.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Replica => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream address given with `--replicaof "<host> <port>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplicaOfError {
    #[error("expected \"<host> <port>\", got {0:?}")]
    Format(String),

    #[error("invalid master port {0:?}")]
    Port(String),
}

impl FromStr for ReplicaOf {
    type Err = ReplicaOfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ReplicaOfError::Format(s.to_string()));
        };

        let port = port
            .parse()
            .map_err(|_| ReplicaOfError::Port(port.to_string()))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ReplicaOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Role, id and offset, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationInfo {
    role: Role,
    master: Option<ReplicaOf>,
    repl_id: String,
    repl_offset: u64,
}

impl ReplicationInfo {
    pub fn master() -> Self {
        Self::from_replica_of(None)
    }

    pub fn replica(master: ReplicaOf) -> Self {
        Self::from_replica_of(Some(master))
    }

    /// Derives the role from whether an upstream was configured.
    pub fn from_replica_of(master: Option<ReplicaOf>) -> Self {
        let role = if master.is_some() {
            Role::Replica
        } else {
            Role::Master
        };

        Self {
            role,
            master,
            repl_id: DEFAULT_REPL_ID.to_string(),
            repl_offset: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn master_addr(&self) -> Option<&ReplicaOf> {
        self.master.as_ref()
    }

    pub fn repl_id(&self) -> &str {
        &self.repl_id
    }

    pub fn repl_offset(&self) -> u64 {
        self.repl_offset
    }

    /// Body of the `INFO replication` section.
    ///
    /// ```
    /// use respkv::replication::ReplicationInfo;
    ///
    /// let info = ReplicationInfo::master().render();
    /// assert!(info.starts_with("role:master\r\n"));
    /// ```
    pub fn render(&self) -> String {
        format!(
            "role:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}",
            self.role, self.repl_id, self.repl_offset
        )
    }
}

//! Command Dispatcher
//!
//! Executes decoded commands against the shared [`Store`] and the node's
//! [`ReplicationInfo`], producing the RESP reply.
//!
//! | Command                  | Reply                                   |
//! |--------------------------|-----------------------------------------|
//! | `PING`, unknown commands | `+PONG`                                 |
//! | `PING msg`, `ECHO msg`   | bulk string `msg`                       |
//! | `SET key value [PX ms]`  | `+OK`                                   |
//! | `GET key`                | bulk string, or `$-1` when absent       |
//! | `INFO replication`       | bulk string with role, replid, offset   |
//! | `INFO` (other sections)  | empty bulk string                       |
//!
//! A frame that does not decode to a command gets a `-ERR` reply.

use crate::commands::{Command, CommandError};
use crate::protocol::RespValue;
use crate::replication::ReplicationInfo;
use crate::storage::Store;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Dispatches commands. Cheap to clone: one per connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<Store>,
    replication: Arc<ReplicationInfo>,
}

impl CommandHandler {
    pub fn new(storage: Arc<Store>, replication: Arc<ReplicationInfo>) -> Self {
        Self {
            storage,
            replication,
        }
    }

    /// Decodes and executes one request frame.
    pub fn execute(&self, frame: RespValue) -> RespValue {
        match Command::from_frame(frame) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                debug!(error = %e, "Rejected request");
                error_reply(&e)
            }
        }
    }

    /// Executes an already decoded command.
    pub fn dispatch(&self, command: Command) -> RespValue {
        debug!(command = command.name(), "Executing command");

        match command {
            Command::Ping(None) | Command::Unknown(_) => RespValue::pong(),
            Command::Ping(Some(message)) | Command::Echo(message) => {
                RespValue::bulk_string(message)
            }
            Command::Set { key, value, ttl } => {
                self.storage.set(key, value, ttl);
                RespValue::ok()
            }
            Command::Get(key) => match self.storage.get(&key) {
                Some(value) => RespValue::bulk_string(value),
                None => RespValue::null(),
            },
            Command::Info(section) => self.cmd_info(section.as_deref()),
        }
    }

    /// INFO [section]
    fn cmd_info(&self, section: Option<&str>) -> RespValue {
        match section {
            Some("replication") => RespValue::bulk_string(self.replication.render()),
            _ => RespValue::bulk_string(Bytes::new()),
        }
    }
}

fn error_reply(error: &CommandError) -> RespValue {
    RespValue::error(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::ReplicaOf;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(Store::new()), Arc::new(ReplicationInfo::master()))
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::Array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    fn wire(handler: &CommandHandler, args: &[&str]) -> Vec<u8> {
        handler.execute(make_command(args)).serialize()
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["PING"]), b"+PONG\r\n");
        assert_eq!(wire(&handler, &["PING", "hello"]), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_unknown_command_answers_pong() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["FLUSHALL"]), b"+PONG\r\n");
        assert_eq!(wire(&handler, &["COMMAND", "DOCS"]), b"+PONG\r\n");
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["ECHO", "hello"]), b"$5\r\nhello\r\n");
        assert_eq!(wire(&handler, &["ECHO", ""]), b"$0\r\n\r\n");
        assert_eq!(
            wire(&handler, &["ECHO", "héllo"]),
            "$6\r\nhéllo\r\n".as_bytes()
        );
    }

    #[test]
    fn test_echo_binary_payload() {
        let handler = create_handler();
        let payload = Bytes::from_static(b"\x00\xff\r\n");

        let response = handler.execute(RespValue::Array(vec![
            RespValue::bulk_string("ECHO"),
            RespValue::bulk_string(payload.clone()),
        ]));
        assert_eq!(response, RespValue::bulk_string(payload));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["SET", "foo", "bar"]), b"+OK\r\n");
        assert_eq!(wire(&handler, &["GET", "foo"]), b"$3\r\nbar\r\n");

        // Overwrite still replies OK
        assert_eq!(wire(&handler, &["SET", "foo", "baz"]), b"+OK\r\n");
        assert_eq!(wire(&handler, &["GET", "foo"]), b"$3\r\nbaz\r\n");
    }

    #[test]
    fn test_get_missing() {
        let handler = create_handler();
        assert_eq!(wire(&handler, &["GET", "missing"]), b"$-1\r\n");
    }

    #[test]
    fn test_set_px_expires() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["SET", "foo", "bar", "PX", "50"]), b"+OK\r\n");
        assert_eq!(wire(&handler, &["GET", "foo"]), b"$3\r\nbar\r\n");

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(wire(&handler, &["GET", "foo"]), b"$-1\r\n");
    }

    #[test]
    fn test_set_bad_px_keeps_key() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["SET", "foo", "bar", "PX", "nope"]), b"+OK\r\n");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(wire(&handler, &["GET", "foo"]), b"$3\r\nbar\r\n");
    }

    #[test]
    fn test_handlers_share_store() {
        let storage = Arc::new(Store::new());
        let replication = Arc::new(ReplicationInfo::master());
        let a = CommandHandler::new(Arc::clone(&storage), Arc::clone(&replication));
        let b = CommandHandler::new(storage, replication);

        wire(&a, &["SET", "shared", "1"]);
        assert_eq!(wire(&b, &["GET", "shared"]), b"$1\r\n1\r\n");
    }

    #[test]
    fn test_info_replication_master() {
        let handler = create_handler();

        let expected = "role:master\r\nmaster_replid:8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb\r\nmaster_repl_offset:0";
        assert_eq!(
            handler.execute(make_command(&["INFO", "replication"])),
            RespValue::bulk_string(expected)
        );
        assert_eq!(
            handler.execute(make_command(&["info", "REPLICATION"])),
            RespValue::bulk_string(expected)
        );
    }

    #[test]
    fn test_info_replication_replica() {
        let replication = ReplicationInfo::replica(ReplicaOf {
            host: "localhost".to_string(),
            port: 6379,
        });
        let handler = CommandHandler::new(Arc::new(Store::new()), Arc::new(replication));

        let response = handler.execute(make_command(&["INFO", "replication"]));
        let RespValue::BulkString(body) = response else {
            panic!("expected bulk string, got {:?}", response);
        };
        assert!(body.starts_with(b"role:slave\r\n"));
    }

    #[test]
    fn test_info_other_sections_empty() {
        let handler = create_handler();

        assert_eq!(wire(&handler, &["INFO"]), b"$0\r\n\r\n");
        assert_eq!(wire(&handler, &["INFO", "server"]), b"$0\r\n\r\n");
    }

    #[test]
    fn test_wrong_arity_is_error_reply() {
        let handler = create_handler();

        assert_eq!(
            wire(&handler, &["GET"]),
            b"-ERR wrong number of arguments for 'get' command\r\n"
        );
        assert!(handler.execute(make_command(&["SET", "k"])).is_error());
        assert!(handler.execute(make_command(&["ECHO"])).is_error());
    }

    #[test]
    fn test_non_array_frame_is_error_reply() {
        let handler = create_handler();
        assert!(handler.execute(RespValue::Integer(1)).is_error());
    }
}

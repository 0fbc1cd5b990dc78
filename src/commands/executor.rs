use super::{Command, CommandParser, Reply, ScanArgs};
use crate::protocol::Frame;
use crate::storage::Keyspace;

pub trait CommandExecutor {
    fn execute(&self, command: Command) -> Reply;

    /// Parse and execute one frame. Never fails: rejected frames become
    /// error replies.
    fn dispatch(&self, frame: Frame) -> Reply {
        match CommandParser::parse(frame) {
            Ok(command) => self.execute(command),
            Err(err) => {
                log::debug!("Rejected command: {}", err);
                err.into()
            }
        }
    }
}

/// Executes commands against a shared [`Keyspace`].
#[derive(Debug, Clone, Default)]
pub struct KeyspaceExecutor {
    keyspace: Keyspace,
}

impl KeyspaceExecutor {
    pub fn new(keyspace: Keyspace) -> Self {
        Self { keyspace }
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    // The next cursor is derived from the raw window, before MATCH filtering,
    // so a filtered-out tail still advances the iteration.
    fn scan(&self, args: ScanArgs) -> Reply {
        let (window, size) = self.keyspace.scan_window(args.cursor, args.count);

        let next = args.cursor.saturating_add(window.len());
        let next_cursor = if next >= size { 0 } else { next };

        let keys = window
            .into_iter()
            .filter(|key| args.pattern.as_ref().map_or(true, |p| p.is_match(key)))
            .map(Reply::Bulk)
            .collect();

        Reply::Array(vec![Reply::bulk(next_cursor.to_string()), Reply::Array(keys)])
    }

    fn hello() -> Reply {
        Reply::Array(vec![
            Reply::bulk("server"),
            Reply::bulk("redis"),
            Reply::bulk("version"),
            Reply::bulk("6.0.0"),
            Reply::bulk("proto"),
            Reply::Integer(3),
            Reply::bulk("id"),
            Reply::Integer(1),
            Reply::bulk("mode"),
            Reply::bulk("standalone"),
            Reply::bulk("role"),
            Reply::bulk("master"),
            Reply::bulk("modules"),
            Reply::Array(vec![]),
        ])
    }
}

impl CommandExecutor for KeyspaceExecutor {
    fn execute(&self, command: Command) -> Reply {
        log::trace!("Executing command: {:?}", command);

        match command {
            Command::Get(key) => match self.keyspace.get(&key) {
                Some(value) => Reply::Bulk(value),
                None => Reply::Null,
            },
            Command::Set(key, value) => {
                self.keyspace.set(key, value);
                Reply::ok()
            }
            Command::Del(keys) => Reply::integer(self.keyspace.delete(&keys)),
            Command::Exists(keys) => Reply::integer(self.keyspace.exists(&keys)),
            Command::Strlen(key) => Reply::integer(self.keyspace.strlen(&key)),
            Command::Scan(args) => self.scan(args),
            Command::Ping => Reply::pong(),
            Command::Hello => Self::hello(),
            Command::Cluster => Reply::error("ERR This instance has cluster support disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn run(executor: &KeyspaceExecutor, parts: &[&[u8]]) -> Reply {
        executor.dispatch(parts.iter().map(|p| Bytes::copy_from_slice(p)).collect())
    }

    fn scan_reply(cursor: &str, keys: &[&str]) -> Reply {
        Reply::Array(vec![
            Reply::bulk(cursor.to_string()),
            Reply::Array(keys.iter().map(|k| Reply::bulk(k.to_string())).collect()),
        ])
    }

    fn with_keys(keys: &[&str]) -> KeyspaceExecutor {
        let executor = KeyspaceExecutor::default();
        for key in keys {
            run(&executor, &[b"SET", key.as_bytes(), b"v"]);
        }
        executor
    }

    #[test]
    fn set_get_round_trip_is_binary_safe() {
        let executor = KeyspaceExecutor::default();
        let key: &[u8] = b"\x00key\xff";
        let value: &[u8] = b"\x80\x00\r\nvalue";
        assert_eq!(run(&executor, &[b"SET", key, value]), Reply::ok());
        assert_eq!(
            run(&executor, &[b"GET", key]),
            Reply::Bulk(Bytes::copy_from_slice(value))
        );
        assert_eq!(run(&executor, &[b"get", b"missing"]), Reply::Null);
    }

    #[test]
    fn del_counts_removed_keys() {
        let executor = with_keys(&["a", "b"]);
        assert_eq!(run(&executor, &[b"DEL", b"a", b"b", b"c"]), Reply::Integer(2));
        assert_eq!(run(&executor, &[b"DEL", b"a", b"b"]), Reply::Integer(0));
        assert_eq!(run(&executor, &[b"DEL"]), Reply::Integer(0));
    }

    #[test]
    fn exists_counts_occurrences() {
        let executor = with_keys(&["k1", "k2"]);
        assert_eq!(run(&executor, &[b"EXISTS", b"k1", b"nope"]), Reply::Integer(1));
        assert_eq!(run(&executor, &[b"EXISTS", b"k1", b"k2"]), Reply::Integer(2));
        assert_eq!(run(&executor, &[b"EXISTS", b"k1", b"k1"]), Reply::Integer(2));
    }

    #[test]
    fn strlen_counts_bytes() {
        let executor = KeyspaceExecutor::default();
        run(&executor, &[b"SET", b"k", "ünïcode".as_bytes()]);
        assert_eq!(run(&executor, &[b"STRLEN", b"k"]), Reply::Integer(9));
        assert_eq!(run(&executor, &[b"STRLEN", b"absent"]), Reply::Integer(0));
    }

    #[test]
    fn scan_walks_table_in_insertion_order() {
        let executor = with_keys(&["a", "b", "c", "d", "e"]);
        assert_eq!(
            run(&executor, &[b"SCAN", b"0", b"COUNT", b"2"]),
            scan_reply("2", &["a", "b"])
        );
        assert_eq!(
            run(&executor, &[b"SCAN", b"2", b"COUNT", b"2"]),
            scan_reply("4", &["c", "d"])
        );
        assert_eq!(
            run(&executor, &[b"SCAN", b"4", b"COUNT", b"2"]),
            scan_reply("0", &["e"])
        );
    }

    #[test]
    fn scan_cursor_wraps_when_window_reaches_end() {
        let executor = with_keys(&["a", "b"]);
        assert_eq!(
            run(&executor, &[b"SCAN", b"0", b"COUNT", b"2"]),
            scan_reply("0", &["a", "b"])
        );
        assert_eq!(run(&executor, &[b"SCAN", b"7"]), scan_reply("0", &[]));
        assert_eq!(
            run(&KeyspaceExecutor::default(), &[b"SCAN", b"0"]),
            scan_reply("0", &[])
        );
    }

    #[test]
    fn scan_match_filters_window_after_cursor_is_computed() {
        let executor = with_keys(&["user:1", "job:1", "job:2", "user:2", "job:3"]);
        // window [user:1, job:1] advances the cursor by two even though one key is dropped
        assert_eq!(
            run(&executor, &[b"SCAN", b"0", b"MATCH", b"user:*", b"COUNT", b"2"]),
            scan_reply("2", &["user:1"])
        );
        // a window with no matches still moves on
        assert_eq!(
            run(&executor, &[b"SCAN", b"1", b"MATCH", b"user:*", b"COUNT", b"2"]),
            scan_reply("3", &[])
        );
        assert_eq!(
            run(&executor, &[b"SCAN", b"3", b"MATCH", b"user:*", b"COUNT", b"2"]),
            scan_reply("0", &["user:2"])
        );
    }

    #[test]
    fn fixed_replies() {
        let executor = KeyspaceExecutor::default();
        assert_eq!(run(&executor, &[b"PING"]).to_resp(), &b"+PONG\r\n"[..]);
        assert_eq!(
            run(&executor, &[b"CLUSTER", b"NODES"]).to_resp(),
            &b"-ERR This instance has cluster support disabled\r\n"[..]
        );

        let Reply::Array(hello) = run(&executor, &[b"HELLO", b"3"]) else {
            panic!("HELLO must reply with an array");
        };
        assert_eq!(hello.len(), 14);
        assert_eq!(hello[5], Reply::Integer(3));
        assert_eq!(hello[13], Reply::Array(vec![]));
    }

    #[test]
    fn bad_commands_become_error_replies() {
        let executor = KeyspaceExecutor::default();
        for parts in [&[&b"NOPE"[..]][..], &[b"GET"], &[b"STRLEN"], &[b"SCAN", b"x"]] {
            assert!(matches!(run(&executor, parts), Reply::Error(_)), "{:?}", parts);
        }
        assert!(matches!(executor.dispatch(vec![]), Reply::Error(_)));
    }

    // Under-arity SET is rejected before anything is written; the table
    // must not gain a key with a missing value.
    #[test]
    fn set_with_missing_value_stores_nothing() {
        let executor = KeyspaceExecutor::default();
        assert_eq!(
            run(&executor, &[b"SET", b"k"]),
            Reply::error("ERR wrong number of arguments for 'set' command")
        );
        assert_eq!(run(&executor, &[b"EXISTS", b"k"]), Reply::Integer(0));
        assert!(executor.keyspace().is_empty());
    }
}

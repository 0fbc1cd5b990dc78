pub mod executor;
pub mod parser;
pub mod pattern;
pub mod response;

use bytes::Bytes;

pub use executor::{CommandExecutor, KeyspaceExecutor};
pub use parser::CommandParser;
pub use pattern::GlobPattern;
pub use response::Reply;

/// The closed set of commands this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Get,
    Set,
    Del,
    Exists,
    Strlen,
    Scan,
    Ping,
    Hello,
    Cluster,
}

impl CommandKind {
    pub const ALL: [CommandKind; 9] = [
        CommandKind::Get,
        CommandKind::Set,
        CommandKind::Del,
        CommandKind::Exists,
        CommandKind::Strlen,
        CommandKind::Scan,
        CommandKind::Ping,
        CommandKind::Hello,
        CommandKind::Cluster,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Get => "get",
            CommandKind::Set => "set",
            CommandKind::Del => "del",
            CommandKind::Exists => "exists",
            CommandKind::Strlen => "strlen",
            CommandKind::Scan => "scan",
            CommandKind::Ping => "ping",
            CommandKind::Hello => "hello",
            CommandKind::Cluster => "cluster",
        }
    }

    /// Case-insensitive lookup of a command name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.eq_ignore_ascii_case(kind.name().as_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanArgs {
    pub cursor: usize,
    pub pattern: Option<GlobPattern>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(Bytes),
    Set(Bytes, Bytes),
    Del(Vec<Bytes>),
    Exists(Vec<Bytes>),
    Strlen(Bytes),
    Scan(ScanArgs),
    Ping,
    Hello,
    Cluster,
}

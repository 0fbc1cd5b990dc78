use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::CommandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Null,
    Status(&'static str),
    Bulk(Bytes),
    Integer(i64),
    Array(Vec<Reply>),
    Error(String),
}

impl Reply {
    /// Append the wire form of this reply to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Reply::Null => out.put_slice(b"$-1\r\n"),
            Reply::Status(s) => put_line(out, b'+', s.as_bytes()),
            Reply::Bulk(data) => {
                put_line(out, b'$', data.len().to_string().as_bytes());
                out.put_slice(data);
                out.put_slice(b"\r\n");
            }
            Reply::Integer(i) => put_line(out, b':', i.to_string().as_bytes()),
            Reply::Array(items) => {
                put_line(out, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(out);
                }
            }
            Reply::Error(e) => put_line(out, b'-', e.as_bytes()),
        }
    }

    pub fn to_resp(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.encode(&mut out);
        out.freeze()
    }

    pub fn ok() -> Self {
        Reply::Status("OK")
    }

    pub fn pong() -> Self {
        Reply::Status("PONG")
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    pub fn integer(n: usize) -> Self {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::Error(err.to_string())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_resp().escape_ascii())
    }
}

// Simple lines cannot carry CR or LF, so those become spaces.
fn put_line(out: &mut BytesMut, marker: u8, line: &[u8]) {
    out.reserve(line.len() + 3);
    out.put_u8(marker);
    for &b in line {
        out.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
    }
    out.put_slice(b"\r\n");
}

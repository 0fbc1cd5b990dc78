use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// A frame that can never become valid, however many more bytes arrive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("expected '{expected}', got byte 0x{found:02x}")]
    UnexpectedByte { expected: char, found: u8 },

    #[error("invalid length field: {0}")]
    InvalidLength(String),

    #[error("bulk string of {0} bytes exceeds the limit")]
    BulkTooLarge(i64),

    #[error("array of {0} elements exceeds the limit")]
    ArrayTooLarge(i64),

    #[error("bulk string not terminated by CRLF")]
    MissingTerminator,
}

/// Reasons a decoded frame is rejected. The display text is sent to the
/// client verbatim as the error line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERR empty command")]
    Empty,

    #[error("ERR unknown command '{0}'")]
    Unknown(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR invalid cursor")]
    InvalidCursor,

    #[error("ERR value is not an integer or out of range")]
    InvalidCount,

    #[error("ERR invalid pattern")]
    InvalidPattern,

    #[error("ERR syntax error")]
    Syntax,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Frame(#[from] FrameError),

    #[error("client read buffer exceeded {limit} bytes")]
    BufferLimit { limit: usize },
}

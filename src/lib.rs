pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{Command, CommandExecutor, KeyspaceExecutor, Reply};
pub use config::ServerConfig;
pub use error::{CommandError, FrameError, Result, ServerError};
pub use protocol::resp::RespParser;
pub use server::event_loop_handle::EventLoopHandle;
pub use server::RedisServer;
pub use storage::Keyspace;

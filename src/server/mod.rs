pub mod client;
pub mod event_loop;
pub mod event_loop_handle;

use event_loop::EventLoop;
use event_loop_handle::EventLoopHandle;
use mio::net::TcpListener;
use std::net::SocketAddr;

use crate::commands::{CommandExecutor, KeyspaceExecutor};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::storage::Keyspace;

pub struct RedisServer<E = KeyspaceExecutor> {
    event_loop: EventLoop<E>,
}

impl RedisServer<KeyspaceExecutor> {
    /// Bind the listening socket with a fresh, empty keyspace.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_keyspace(config, Keyspace::new())
    }

    pub fn with_keyspace(config: ServerConfig, keyspace: Keyspace) -> Result<Self> {
        Self::with_executor(config, KeyspaceExecutor::new(keyspace))
    }
}

impl<E: CommandExecutor> RedisServer<E> {
    /// Bind the listening socket and answer every frame with `executor`.
    pub fn with_executor(config: ServerConfig, executor: E) -> Result<Self> {
        let listener = TcpListener::bind(config.addr())?;
        let event_loop = EventLoop::new(listener, executor, config)?;
        log::info!("Server listening on {}", event_loop.local_addr());

        Ok(Self { event_loop })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.event_loop.local_addr()
    }

    pub fn handle(&self) -> EventLoopHandle {
        self.event_loop.get_handle()
    }

    /// Serve clients until [`EventLoopHandle::shutdown`] is called.
    pub fn run(&mut self) -> Result<()> {
        self.event_loop.run()
    }
}

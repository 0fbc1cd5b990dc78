use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::protocol::MAX_BULK_LEN;

pub const DEFAULT_PORT: u16 = 6379;

/// Upper bound on unconsumed bytes held for one client: one maximal bulk
/// string plus room for its frame headers.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = MAX_BULK_LEN as usize + 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Log every decoded command.
    pub debug: bool,
    pub max_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            debug: false,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

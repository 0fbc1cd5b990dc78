//! Shared helpers: a server on an ephemeral port and a blocking RESP client.

#![allow(dead_code)]

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use respkv::{CommandExecutor, EventLoopHandle, Keyspace, KeyspaceExecutor, RedisServer, ServerConfig};

pub struct TestServer {
    pub addr: SocketAddr,
    pub keyspace: Keyspace,
    handle: EventLoopHandle,
    thread: Option<JoinHandle<respkv::Result<()>>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(local_config())
    }

    pub fn start_with(config: ServerConfig) -> Self {
        let keyspace = Keyspace::new();
        Self::start_with_executor(config, KeyspaceExecutor::new(keyspace.clone()), keyspace)
    }

    /// Serve with a custom executor; `keyspace` is whatever it writes to.
    pub fn start_with_executor<E>(config: ServerConfig, executor: E, keyspace: Keyspace) -> Self
    where
        E: CommandExecutor + Send + 'static,
    {
        let mut server = RedisServer::with_executor(config, executor)
            .expect("server should bind an ephemeral port");
        let addr = server.local_addr();
        let handle = server.handle();
        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            keyspace,
            handle,
            thread: Some(thread),
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient::connect(self.addr)
    }

    /// Stop the server and return what `run` returned.
    pub fn stop(mut self) -> respkv::Result<()> {
        self.handle.shutdown();
        self.thread
            .take()
            .expect("server thread present")
            .join()
            .expect("server thread panicked")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.handle.shutdown();
            let _ = thread.join();
        }
    }
}

/// Loopback on an ephemeral port.
pub fn local_config() -> ServerConfig {
    ServerConfig::new().bind(Ipv4Addr::LOCALHOST.into()).port(0)
}

pub struct TestClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.set_nodelay(true).unwrap();
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("write to server");
    }

    pub fn command(&mut self, parts: &[&[u8]]) -> Vec<u8> {
        self.send_raw(&encode(parts));
        self.read_reply()
    }

    pub fn read_reply(&mut self) -> Vec<u8> {
        loop {
            if let Some(len) = reply_len(&self.buffer) {
                return self.buffer.drain(..len).collect();
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).expect("read from server");
            assert!(n > 0, "server closed the connection mid-reply");
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// True if the server has closed the connection and nothing is left to read.
    pub fn is_closed(&mut self) -> bool {
        let mut chunk = [0u8; 64];
        match self.stream.read(&mut chunk) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) => matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted),
        }
    }
}

/// Encode a command the way a client library would.
pub fn encode(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Length of the first complete reply in `buf`, if there is one.
pub fn reply_len(buf: &[u8]) -> Option<usize> {
    let line_end = buf.windows(2).position(|w| w == b"\r\n")?;
    let after = line_end + 2;
    let header = || std::str::from_utf8(&buf[1..line_end]).ok()?.parse::<i64>().ok();

    match buf.first()? {
        b'+' | b'-' | b':' => Some(after),
        b'$' => {
            let len = header()?;
            if len < 0 {
                return Some(after);
            }
            let end = after + len as usize + 2;
            (buf.len() >= end).then_some(end)
        }
        b'*' => {
            let mut pos = after;
            for _ in 0..header()?.max(0) {
                pos += reply_len(&buf[pos..])?;
            }
            Some(pos)
        }
        _ => None,
    }
}

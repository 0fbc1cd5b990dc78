use bytes::{Buf, BytesMut};
use mio::{net::TcpStream, Interest, Token};
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;

use crate::commands::Reply;
use crate::error::{FrameError, Result, ServerError};
use crate::protocol::{Frame, FrameDecoder};

const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Once this much output is waiting on the socket, no further commands are
/// decoded for the client until it catches up.
pub const WRITE_HIGH_WATER_MARK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Reading,
    /// No more input is accepted; close once pending replies are written.
    Closing,
    Closed,
}

pub struct Client {
    pub socket: TcpStream,
    pub token: Token,
    pub addr: SocketAddr,
    read_buffer: BytesMut,
    decoder: FrameDecoder,
    write_buffer: BytesMut,
    interest: Interest,
    state: ClientState,
}

impl Client {
    pub fn new(socket: TcpStream, token: Token, addr: SocketAddr) -> Self {
        Self {
            socket,
            token,
            addr,
            read_buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            decoder: FrameDecoder::new(),
            write_buffer: BytesMut::new(),
            interest: Interest::READABLE,
            state: ClientState::Reading,
        }
    }

    /// Read at most one chunk from the socket. Returns whether any bytes
    /// arrived; `false` means the socket would block or the peer hung up.
    ///
    /// The cap applies to input that is not yet part of a complete frame, so
    /// callers decode everything buffered before reading again.
    pub fn read_chunk(&mut self, max_buffer_size: usize) -> Result<bool> {
        if self.state != ClientState::Reading {
            return Ok(false);
        }

        let unconsumed = self.read_buffer.len() + self.decoder.buffered_len();
        let room = max_buffer_size.saturating_sub(unconsumed);
        if room == 0 {
            return Err(ServerError::BufferLimit {
                limit: max_buffer_size,
            });
        }

        let mut temp_buffer = [0u8; READ_CHUNK_SIZE];
        let len = room.min(READ_CHUNK_SIZE);

        loop {
            match self.socket.read(&mut temp_buffer[..len]) {
                Ok(0) => {
                    log::debug!("Client {} closed its side of the connection", self.token.0);
                    self.close_after_flush();
                    return Ok(false);
                }
                Ok(n) => {
                    self.read_buffer.extend_from_slice(&temp_buffer[..n]);
                    log::trace!("Read {} bytes from client {}", n, self.token.0);
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decode the next complete frame out of the read buffer.
    pub fn next_frame(&mut self) -> std::result::Result<Option<Frame>, FrameError> {
        self.decoder.decode(&mut self.read_buffer)
    }

    /// Write as much of the pending output as the socket accepts.
    pub fn write_data(&mut self) -> io::Result<usize> {
        let mut total_written = 0;

        while !self.write_buffer.is_empty() {
            match self.socket.write(&self.write_buffer) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.write_buffer.advance(n);
                    total_written += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        log::trace!("Wrote {} bytes to client {}", total_written, self.token.0);
        Ok(total_written)
    }

    pub fn add_reply(&mut self, reply: &Reply) {
        reply.encode(&mut self.write_buffer);
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_buffer.is_empty()
    }

    /// True while the client may have further commands executed: it is
    /// still reading and its unsent output is below the high-water mark.
    pub fn accepts_commands(&self) -> bool {
        self.state == ClientState::Reading && self.write_buffer.len() < WRITE_HIGH_WATER_MARK
    }

    /// The readiness this client should be registered for right now, if it
    /// differs from the current registration.
    ///
    /// A client that cannot take more commands is only polled for
    /// writability, which leaves its unread requests in the kernel.
    pub fn interest_change(&mut self) -> Option<Interest> {
        let wanted = match (self.accepts_commands(), self.has_pending_writes()) {
            (true, false) => Interest::READABLE,
            (true, true) => Interest::READABLE | Interest::WRITABLE,
            (false, _) => Interest::WRITABLE,
        };
        if wanted == self.interest {
            return None;
        }
        self.interest = wanted;
        Some(wanted)
    }

    /// Stop taking input; the connection closes once pending replies are
    /// written. Anything not yet decoded is dropped.
    pub fn close_after_flush(&mut self) {
        if self.state == ClientState::Reading {
            self.state = ClientState::Closing;
        }
        self.read_buffer.clear();
        self.decoder = FrameDecoder::new();
    }

    pub fn mark_closed(&mut self) {
        self.state = ClientState::Closed;
    }

    /// True once nothing more will be read or written on this connection.
    pub fn is_finished(&self) -> bool {
        match self.state {
            ClientState::Reading => false,
            ClientState::Closing => !self.has_pending_writes(),
            ClientState::Closed => true,
        }
    }
}

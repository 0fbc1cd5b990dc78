use super::client::Client;
use super::event_loop_handle::{EventLoopHandle, EventLoopMessage};
use crate::commands::{CommandExecutor, Reply};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::Frame;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

const SERVER_TOKEN: Token = Token(0);
const WAKER_TOKEN: Token = Token(usize::MAX);

/// Single-threaded readiness loop owning the listener and every client.
///
/// Frames are executed one at a time in the order they are decoded, which
/// makes each command atomic with respect to all other connections.
pub struct EventLoop<E> {
    poll: Poll,
    events: Events,
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: HashMap<Token, Client>,
    executor: E,
    config: ServerConfig,
    next_token: usize,

    // Kept alive for as long as handles may call `wake`
    #[allow(dead_code)]
    waker: Arc<Waker>,

    message_receiver: Receiver<EventLoopMessage>,
    event_loop_handle: EventLoopHandle,
}

impl<E: CommandExecutor> EventLoop<E> {
    pub fn new(
        mut listener: TcpListener,
        executor: E,
        config: ServerConfig,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        let events = Events::with_capacity(128);
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);

        let (sender, receiver) = mpsc::channel();
        let handle = EventLoopHandle::new(sender, Arc::clone(&waker));

        poll.registry()
            .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;
        let local_addr = listener.local_addr()?;

        Ok(EventLoop {
            poll,
            events,
            listener: Some(listener),
            local_addr,
            clients: HashMap::new(),
            executor,
            config,
            next_token: 1, // 0 is reserved for the listener
            waker,
            message_receiver: receiver,
            event_loop_handle: handle,
        })
    }

    pub fn get_handle(&self) -> EventLoopHandle {
        self.event_loop_handle.clone()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until a shutdown message arrives.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Event loop started");

        loop {
            if let Err(e) = self.poll.poll(&mut self.events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            // Collect events to avoid borrowing conflicts
            let events_to_process: Vec<_> = self
                .events
                .iter()
                .map(|event| event.token())
                .collect();

            for token in events_to_process {
                match token {
                    SERVER_TOKEN => self.handle_new_connections()?,
                    WAKER_TOKEN => {}
                    token => self.handle_client_event(token),
                }
            }

            if self.shutdown_requested() {
                break;
            }
        }

        self.shutdown()
    }

    fn shutdown_requested(&self) -> bool {
        let mut requested = false;
        while let Ok(message) = self.message_receiver.try_recv() {
            match message {
                EventLoopMessage::Shutdown => requested = true,
            }
        }
        requested
    }

    fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down, closing {} client(s)", self.clients.len());

        if let Some(mut listener) = self.listener.take() {
            self.poll.registry().deregister(&mut listener)?;
            log::info!("Stopped listening on {}", self.local_addr);
        }
        let tokens: Vec<Token> = self.clients.keys().copied().collect();
        for token in tokens {
            self.close_client(token);
        }
        Ok(())
    }

    fn handle_new_connections(&mut self) -> io::Result<()> {
        let Some(listener) = &self.listener else {
            return Ok(());
        };

        loop {
            match listener.accept() {
                Ok((mut socket, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    self.poll
                        .registry()
                        .register(&mut socket, token, Interest::READABLE)?;

                    log::info!("New client connection from {} with token {}", addr, token.0);
                    self.clients.insert(token, Client::new(socket, token, addr));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // e.g. out of file descriptors; keep serving existing clients
                    log::error!("Error accepting connection: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_client_event(&mut self, token: Token) {
        if !self.clients.contains_key(&token) {
            return;
        }

        if let Err(e) = self.serve_client(token) {
            log::warn!("Closing client {}: {}", token.0, e);
            if let Some(client) = self.clients.get_mut(&token) {
                client.mark_closed();
            }
        }

        if self.clients.get(&token).is_some_and(Client::is_finished) {
            self.close_client(token);
        } else if let Err(e) = self.update_interest(token) {
            log::warn!("Closing client {}: {}", token.0, e);
            self.close_client(token);
        }
    }

    /// Alternate between running buffered commands, flushing replies and
    /// reading more input, until the socket runs dry or the client's unsent
    /// output reaches the high-water mark.
    fn serve_client(&mut self, token: Token) -> Result<()> {
        let max_buffer_size = self.config.max_buffer_size;

        loop {
            let input_exhausted = self.process_client_commands(token);
            self.flush_client(token)?;

            let Some(client) = self.clients.get_mut(&token) else {
                return Ok(());
            };
            if !client.accepts_commands() {
                return Ok(());
            }
            if !input_exhausted {
                continue;
            }

            match client.read_chunk(max_buffer_size) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    client.add_reply(&Reply::error(format!("ERR {}", e)));
                    client.close_after_flush();
                    let _ = client.write_data();
                    return Err(e);
                }
            }
        }
    }

    /// Execute complete frames while the client accepts commands. Returns
    /// true when it stopped because the buffered input ran out.
    fn process_client_commands(&mut self, token: Token) -> bool {
        let Some(client) = self.clients.get_mut(&token) else {
            return false;
        };

        while client.accepts_commands() {
            let frame = match client.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return true,
                Err(e) => {
                    // The stream is desynchronized; there is no safe point to resume from
                    log::warn!("Protocol error from client {}: {}", token.0, e);
                    client.add_reply(&Reply::error(format!("ERR Protocol error: {}", e)));
                    client.close_after_flush();
                    return false;
                }
            };

            if self.config.debug {
                log::debug!("Client {} command: {}", token.0, describe(&frame));
            }

            let executor = &self.executor;
            match panic::catch_unwind(AssertUnwindSafe(|| executor.dispatch(frame))) {
                Ok(reply) => {
                    log::trace!("Reply to client {}: {}", token.0, reply);
                    client.add_reply(&reply);
                }
                Err(_) => {
                    log::error!("Command from client {} panicked, closing connection", token.0);
                    client.mark_closed();
                    return false;
                }
            }
        }

        false
    }

    fn flush_client(&mut self, token: Token) -> Result<()> {
        if let Some(client) = self.clients.get_mut(&token) {
            client.write_data()?;
        }
        Ok(())
    }

    fn update_interest(&mut self, token: Token) -> io::Result<()> {
        let Some(client) = self.clients.get_mut(&token) else {
            return Ok(());
        };

        if let Some(interest) = client.interest_change() {
            self.poll
                .registry()
                .reregister(&mut client.socket, token, interest)?;
        }
        Ok(())
    }

    fn close_client(&mut self, token: Token) {
        if let Some(mut client) = self.clients.remove(&token) {
            log::info!("Closing client connection {} ({})", token.0, client.addr);
            let _ = self.poll.registry().deregister(&mut client.socket);
        }
    }
}

fn describe(frame: &Frame) -> String {
    frame
        .iter()
        .map(|arg| arg.escape_ascii().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

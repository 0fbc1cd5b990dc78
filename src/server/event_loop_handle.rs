use mio::Waker;
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[derive(Debug)]
pub enum EventLoopMessage {
    Shutdown,
}

/// Cloneable, thread-safe way to reach a running event loop from outside,
/// e.g. from a signal handler.
#[derive(Debug, Clone)]
pub struct EventLoopHandle {
    sender: Sender<EventLoopMessage>,
    waker: Arc<Waker>,
}

impl EventLoopHandle {
    pub fn new(sender: Sender<EventLoopMessage>, waker: Arc<Waker>) -> Self {
        EventLoopHandle { sender, waker }
    }

    /// Ask the event loop to stop accepting, close every connection and
    /// return from `run`.
    pub fn shutdown(&self) {
        self.send(EventLoopMessage::Shutdown);
    }

    fn send(&self, message: EventLoopMessage) {
        if let Err(e) = self.sender.send(message) {
            log::debug!("Event loop already stopped: {}", e);
            return;
        }

        if let Err(e) = self.waker.wake() {
            log::error!("Failed to wake event loop: {}", e);
        }
    }
}

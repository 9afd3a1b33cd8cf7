//! Fan-out channel shared by log streaming and dataset change events.

use tokio::sync::broadcast;

/// Default number of buffered messages per subscriber.
pub const DEFAULT_CAPACITY: usize = 100;

/// Broadcasts cloneable messages to every live subscriber.
///
/// Sending never blocks and never fails: with no subscribers the message is
/// dropped, and slow subscribers skip messages once they lag past capacity.
#[derive(Debug, Clone)]
pub struct Broadcaster<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Broadcaster<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send to all subscribers (ignored if there are none)
    pub fn send(&self, message: T) {
        let _ = self.sender.send(message);
    }

    /// Get a receiver for streaming
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

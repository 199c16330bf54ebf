//! Broadcast fan-out of [`ScriptEvent`]s.
//!
//! The interpreter records events synchronously; the bus forwards each one to
//! every live subscriber over a tokio broadcast channel. Recording with no
//! subscribers is not an error.

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

use super::diagnostics::{DiagnosticsSink, ScriptEvent};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Receiver lagged behind by {count} events")]
    Lagged { count: u64 },
    #[error("Failed to receive event: {message}")]
    ReceiveFailed { message: String },
}

pub type EventResult<T> = Result<T, EventError>;

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScriptEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: ScriptEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                trace!("no subscribers for script event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl DiagnosticsSink for EventBus {
    fn record(&self, event: &ScriptEvent) {
        self.publish(event.clone());
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<ScriptEvent>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<ScriptEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event. After a lag the receiver skips ahead to the
    /// newest events and reports how many were dropped.
    pub async fn recv(&mut self) -> EventResult<ScriptEvent> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                self.receiver = self.receiver.resubscribe();
                Err(EventError::Lagged { count: n })
            }
            Err(e) => Err(EventError::ReceiveFailed {
                message: e.to_string(),
            }),
        }
    }

    /// Non-blocking variant; `None` when no event is queued.
    pub fn try_recv(&mut self) -> Option<ScriptEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

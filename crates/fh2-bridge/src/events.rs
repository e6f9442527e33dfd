//! Log-style events for the panel.
//!
//! Every send, every inbound line and every failure is published as a
//! [`BridgeEvent`]. Subscribers each get their own unbounded channel so a
//! slow consumer never stalls the read loop.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::state::StateChange;

/// Something the panel may want to show in its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A command was written.
    Sent(String),
    /// An empty command was requested; nothing was written.
    NoCommand,
    /// A command could not be written.
    SendFailed {
        /// The command text.
        command: String,
        /// Transport error description.
        error: String,
    },
    /// A raw line arrived.
    Received(String),
    /// A state field was updated.
    Applied(StateChange),
    /// A known response carried an unusable value.
    Ignored {
        /// The raw line.
        line: String,
        /// Why it was dropped.
        reason: String,
    },
    /// A line matched no known response.
    Unrecognized(String),
    /// The transport failed while reading.
    ReadFailed(String),
    /// The bridge reached its terminal state.
    Closed,
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeEvent::Sent(command) => write!(f, "Sent: {}", command),
            BridgeEvent::NoCommand => f.write_str("No command assigned to button."),
            BridgeEvent::SendFailed { command, error } => {
                write!(f, "Error sending {}: {}", command, error)
            }
            BridgeEvent::Received(line) => write!(f, "Received: {}", line),
            BridgeEvent::Applied(change) => write!(
                f,
                "{} updated by {}",
                change.field.as_str(),
                change.source.as_str()
            ),
            BridgeEvent::Ignored { line, reason } => write!(f, "Ignored {}: {}", line, reason),
            BridgeEvent::Unrecognized(line) => write!(f, "Unhandled: {}", line),
            BridgeEvent::ReadFailed(error) => write!(f, "Serial read error: {}", error),
            BridgeEvent::Closed => f.write_str("Connection closed."),
        }
    }
}

/// Callback run on every state change.
pub type StateCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Fan-out of events and state-change callbacks.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<BridgeEvent>>>,
    callbacks: Mutex<Vec<StateCallback>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> Receiver<BridgeEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn on_state_change(&self, callback: StateCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Publish to all live subscribers, dropping those that hung up.
    pub(crate) fn emit(&self, event: BridgeEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Publish a state change to callbacks and subscribers.
    pub(crate) fn state_changed(&self, change: StateChange) {
        // Snapshot so a callback may register further callbacks.
        let callbacks: Vec<StateCallback> = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(&change);
        }
        self.emit(BridgeEvent::Applied(change));
    }
}

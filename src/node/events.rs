//! Fire-and-forget event notification
//!
//! The node pushes ledger events into a broadcast channel for whatever
//! transport collaborator cares to listen. No retry, no delivery
//! guarantee; send errors (no subscribers) are ignored.

use crate::core::{Block, Transaction};
use serde::Serialize;
use tokio::sync::broadcast;

/// Maximum number of events buffered per subscriber
const BROADCAST_CAPACITY: usize = 100;

/// Events observable from outside the node
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum NodeEvent {
    /// A block passed validation and was appended
    BlockAccepted { block: Block },
    /// A transaction was admitted to the pool
    TransactionSubmitted { transaction: Transaction },
}

/// Broadcaster for node events
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Notify all subscribers, ignoring the absence of any
    pub fn notify(&self, event: NodeEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! Event bus.
//!
//! Components keep their own event logs; the daemon drains them after every
//! call and republishes the events here, stamped with a sequence number and
//! the ledger they came from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Ledger an event was emitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ledger {
    Source,
    Destination,
}

/// An event as published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Position in the bus, starting at 1.
    pub sequence: u64,
    pub ledger: Ledger,
    /// Ledger time of the call that emitted the event.
    pub timestamp: u32,
    pub event: tidal_types::Event,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish a batch of drained component events.
    pub fn publish(&self, ledger: Ledger, timestamp: u32, events: Vec<tidal_types::Event>) {
        for event in events {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            // Ignore send errors (no subscribers)
            let _ = self.sender.send(BusEvent {
                sequence,
                ledger,
                timestamp,
                event,
            });
        }
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

//! # Per-tree event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Every zone of a tree shares the
//! root's bus and publishes bookkeeping events on it from whatever thread the
//! operation runs on.
//!
//! ```text
//! Zone ops (any thread) ──publish(Event)──► Bus ──► Observer ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never needs a runtime; with no receivers the
//!   event is simply dropped.
//! - A single ring buffer of `capacity` events is shared by all receivers;
//!   receivers that fall behind observe `RecvError::Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for zone events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Returns `true` when somebody listens; lets publishers skip building events.
    #[inline]
    pub fn has_receivers(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

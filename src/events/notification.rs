//! # Synchronous zone notifications.
//!
//! A [`Notification`] is an [`Event`] in flight through a zone's listeners.
//! Unlike bus events (fire-and-forget, observed later by subscribers),
//! notifications are delivered synchronously on the thread that raised them
//! and can influence what happens next:
//!
//! - [`prevent_default`](Notification::prevent_default) suppresses the
//!   default action of an error (diagnostic + [`ErrorPolicy`](crate::ErrorPolicy));
//! - [`stop_propagation`](Notification::stop_propagation) stops bubbling
//!   toward the root after the current zone's listeners.
//!
//! ```text
//! dispatch(n) on zone Z:
//!   Z.spec hook ─► Z listeners (registration order)
//!     └─ bubbles && !stopped ─► parent(Z).spec hook ─► parent listeners ─► ... root
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::Zone;
use crate::error::TaskError;
use crate::events::{Event, EventKind};

/// Event being dispatched to zone listeners.
pub struct Notification {
    event: Event,
    target: Zone,
    default_prevented: AtomicBool,
    propagation_stopped: AtomicBool,
}

impl Notification {
    pub(crate) fn new(target: Zone, event: Event) -> Self {
        Self {
            event,
            target,
            default_prevented: AtomicBool::new(false),
            propagation_stopped: AtomicBool::new(false),
        }
    }

    /// Event classification (`ZoneFinished` or `ZoneError`).
    #[inline]
    pub fn kind(&self) -> EventKind {
        self.event.kind
    }

    /// Underlying event data.
    #[inline]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Failure carried by error notifications.
    #[inline]
    pub fn error(&self) -> Option<&TaskError> {
        self.event.error.as_ref()
    }

    /// Zone the notification was raised on.
    #[inline]
    pub fn target(&self) -> &Zone {
        &self.target
    }

    /// Whether the notification propagates toward the root.
    #[inline]
    pub fn bubbles(&self) -> bool {
        self.event.kind.bubbles()
    }

    /// Marks the notification handled: the default action is skipped.
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once any listener called [`prevent_default`](Self::prevent_default).
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }

    /// Stops bubbling after the current zone's listeners.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once any listener called [`stop_propagation`](Self::stop_propagation).
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("kind", &self.event.kind)
            .field("target", &self.target.label())
            .field("default_prevented", &self.default_prevented())
            .field("propagation_stopped", &self.propagation_stopped())
            .finish()
    }
}

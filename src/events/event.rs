//! # Runtime events emitted by zones.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Bookkeeping events**: registry traffic (tasks added, removed, cancelled)
//! - **Zone notifications**: finish/error, also dispatched to zone listeners
//! - **Subscriber events**: delivery problems of the observer fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, zone
//! label, task address and errors.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskzone::{Category, Event, EventKind, TaskId};
//!
//! let ev = Event::new(EventKind::TaskAdded)
//!     .with_zone_label("worker")
//!     .with_task(Category::TIMER, TaskId::new(3));
//!
//! assert_eq!(ev.kind, EventKind::TaskAdded);
//! assert_eq!(ev.zone.as_deref(), Some("worker"));
//! assert_eq!(ev.task, Some(TaskId::new(3)));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::TaskError;
use crate::tasks::{Category, TaskId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Tree events ===
    /// A child zone was created.
    ///
    /// Sets:
    /// - `zone`, `zone_id`: the new zone
    /// - `reason`: parent label
    ZoneSpawned,

    /// A zone got a new parent (`append_child`/`insert_before` from another
    /// parent or from being a root). Reordering among siblings is silent.
    ///
    /// Sets:
    /// - `zone`, `zone_id`: the moved zone
    /// - `reason`: new parent label
    ZoneMoved,

    // === Registry events ===
    /// A task was registered.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    /// - `category`, `task`: task address
    TaskAdded,

    /// A task left its registry (completion or cancellation).
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    /// - `category`, `task`: task address
    TaskRemoved,

    /// A task's cancellation callback was invoked.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    /// - `category`, `task`: task address
    TaskCancelled,

    /// A zone cancellation (whole subtree) was requested.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    CancelRequested,

    // === Zone notifications (also dispatched to listeners) ===
    /// The zone went fully idle. Does not bubble.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    ZoneFinished,

    /// Caller-supplied code failed inside the zone. Bubbles toward the root.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    /// - `error`: the failure
    ZoneError,

    /// A `ZoneError` reached the end of dispatch without being handled.
    ///
    /// Sets:
    /// - `zone`, `zone_id`
    /// - `error`: the failure
    ErrorUnhandled,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `zone`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `zone`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

impl EventKind {
    /// Whether the notification propagates toward the root after the
    /// originating zone's listeners ran.
    #[inline]
    pub fn bubbles(self) -> bool {
        matches!(self, EventKind::ZoneError)
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Diagnostic label of the zone (or subscriber name for subscriber events).
    pub zone: Option<Arc<str>>,
    /// Raw id of the zone, if applicable.
    pub zone_id: Option<u64>,
    /// Registry category of the task, if applicable.
    pub category: Option<Category>,
    /// Task id, if applicable.
    pub task: Option<TaskId>,
    /// Failure carried by error events.
    pub error: Option<TaskError>,
    /// Human-readable reason (overflow details, parent label, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            zone: None,
            zone_id: None,
            category: None,
            task: None,
            error: None,
            reason: None,
        }
    }

    /// Attaches a zone label.
    #[inline]
    pub fn with_zone_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.zone = Some(label.into());
        self
    }

    /// Attaches a raw zone id.
    #[inline]
    pub fn with_zone_id(mut self, id: u64) -> Self {
        self.zone_id = Some(id);
        self
    }

    /// Attaches a task address.
    #[inline]
    pub fn with_task(mut self, category: Category, id: TaskId) -> Self {
        self.category = Some(category);
        self.task = Some(id);
        self
    }

    /// Attaches a failure.
    #[inline]
    pub fn with_error(mut self, error: TaskError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_zone_label(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_zone_label(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

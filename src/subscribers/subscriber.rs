//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for consuming the bookkeeping events a
//! zone tree publishes on its [`Bus`](crate::events::Bus).
//!
//! Each subscriber attached through [`Zone::observe`](crate::Zone::observe) gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ```text
//! Bus ──► Observer ──► SubscriberSet ──► [bounded queue] ──► worker ──► on_event()
//!                                                              └─► panic → SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only** and publishes
//!   `EventKind::SubscriberOverflow`.
//! - Events are processed sequentially (FIFO) per subscriber.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use taskzone::{Event, EventKind, Subscribe};
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl Subscribe for Idle {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ZoneFinished {
//!             // zone `ev.zone` has no outstanding work left
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "idle"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}

//! Zone events: data model, synchronous notifications and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Notification`] an event being dispatched to zone listeners (bubbling,
//!   `prevent_default`, `stop_propagation`)
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`, one per zone tree
//!
//! ## Quick reference
//! - **Publishers**: every zone operation (spawn, add/delete, cancel, finish, error).
//! - **Synchronous consumers**: zone listeners and `ZoneSpec` hooks (finish/error only).
//! - **Asynchronous consumers**: `Observer` → `SubscriberSet` → `Subscribe` impls.

mod bus;
mod event;
mod notification;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use notification::Notification;

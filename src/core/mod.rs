//! Zone runtime core: bookkeeping, ambient context and coordination.
//!
//! Public API from this module is [`Zone`] and the types its operations
//! return; everything else is internal.
//!
//! Internal modules:
//! - [`registry`]: keyed task collection of one `(zone, category)`;
//! - [`zone`]: the zone node, liveness propagation and cancellation;
//! - [`context`]: per-thread ambient zone stack;
//! - [`binder`]: `run`, `bind`, `in_zone`;
//! - [`join`]: `exec` and its completion future;
//! - [`tree`]: parent/child links and reparenting;
//! - [`observer`]: forwards the tree's bus to subscribers.

mod binder;
mod context;
mod join;
mod listeners;
mod observer;
mod registry;
mod spec;
mod tree;
mod zone;

pub use binder::InZone;
pub use context::{current, ContextStack};
pub use join::{exec, Join};
pub use listeners::ListenerId;
pub use observer::Observer;
pub use registry::{CancelAll, TaskRegistry};
pub use spec::ZoneSpec;
pub use tree::TreeNode;
pub use zone::{Zone, ZoneId};

pub(crate) use zone::ErrorSource;

//! # taskzone
//!
//! **Taskzone** attributes asynchronous work to a tree of *zones*, tracks
//! what is still outstanding, and cancels whole subtrees on demand.
//!
//! A zone is live while it, or any descendant, has a registered task. A live
//! zone is itself registered as a task of its parent, so liveness always
//! reaches the root, and every zone learns exactly when its subtree went idle.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                         ┌───────────────────────────────┐
//!                         │ Zone (root)                   │
//!                         │  registries: "zone" ─► [A, B] │
//!                         │  live count = 2               │
//!                         └──────┬──────────────────┬─────┘
//!                                ▼                  ▼
//!             ┌────────────────────────┐  ┌────────────────────────┐
//!             │ Zone A                 │  │ Zone B                 │
//!             │  "timer"   ─► [t0]     │  │  "default" ─► [t0, t1] │
//!             │  "future"  ─► [t0]     │  │  live count = 2        │
//!             │  live count = 2        │  └────────────────────────┘
//!             └────────────────────────┘
//!
//!  producers (set_timeout, spawn, ...) ── Zone::current() ──► add(task)
//!  zone ops ── publish(Event) ──► Bus ──► Observer ──► SubscriberSet ──► Subscribe::on_event
//!  ZoneFinished / ZoneError ──► spec hook ──► listeners ──► (bubbling) parent ...
//! ```
//!
//! ### Lifecycle of one task
//! ```text
//! add(task) in Z
//!   ├─ Z was idle ─► Z registers in parent "zone" registry (recursively upward)
//!   ▼
//! ... work outstanding ...
//!   │
//!   ├─ completes ─► delete(id)            ┐
//!   └─ cancelled ─► removed, cancel() run ┘─► Z idle? ─► Z leaves parent ─► ZoneFinished on Z
//!                                                        (then on each ancestor that went idle)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                     |
//! |-------------------|---------------------------------------------------------------|----------------------------------------|
//! | **Zones**         | Tree of contexts with liveness tracking and cancellation.     | [`Zone`], [`ZoneSpec`]                 |
//! | **Tasks**         | Capability trait for registry entries and ready descriptors.  | [`Task`], [`TaskRef`], [`TaskFn`]      |
//! | **Ambient zone**  | Per-thread current zone, binding of callbacks and futures.    | [`Zone::run`], [`Zone::bind`], [`InZone`] |
//! | **Coordination**  | Await a whole subtree going idle.                             | [`Zone::exec`], [`Join`]               |
//! | **Notifications** | Synchronous finish/error listeners with bubbling.             | [`Notification`], [`ErrorPolicy`]      |
//! | **Subscriber API**| Asynchronous consumers of bookkeeping events.                 | [`Subscribe`], [`Observer`]            |
//! | **Producers**     | Zone-attributed timers and spawned futures.                   | [`producers`]                          |
//! | **Errors**        | Typed structural errors and caller-code failures.             | [`ZoneError`], [`TaskError`]           |
//!
//! ## Optional features
//! - `logging`: exports a `tracing`-backed [`LogWriter`] subscriber _(reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskzone::{producers, Config, Zone};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let app = Zone::new_root("app", Config::default());
//!
//!     // Resolves once every timer and future started inside has completed.
//!     let out = app
//!         .exec(|| {
//!             producers::set_timeout(Duration::from_millis(10), || {
//!                 producers::spawn(async { Ok(()) });
//!                 Ok(())
//!             });
//!             Ok("started")
//!         })
//!         .await;
//!
//!     assert_eq!(out, Ok("started"));
//!     assert!(!app.is_live());
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

pub mod producers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    current, exec, CancelAll, ContextStack, InZone, Join, ListenerId, Observer, TaskRegistry,
    TreeNode, Zone, ZoneId, ZoneSpec,
};
pub use error::{TaskError, ZoneError};
pub use events::{Bus, Event, EventKind, Notification};
pub use policies::ErrorPolicy;
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{CancelFuture, Category, Task, TaskFn, TaskId, TaskRef, TokenTask};

// Optional: expose a simple built-in logger subscriber (reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

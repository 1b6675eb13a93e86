//! # Task producers.
//!
//! Helpers that create zone-attributed work on the tokio runtime. Each one
//! registers a task in the **current** zone, keeps it registered while the
//! work is outstanding and deletes it exactly once on completion.
//!
//! | Producer                    | Category  | Cancellation               |
//! |-----------------------------|-----------|----------------------------|
//! | [`set_timeout`]             | `"timer"` | timer never fires          |
//! | [`set_interval`]            | `"timer"` | no further ticks           |
//! | [`spawn`]                   | `"future"`| future dropped at next poll |
//!
//! Callbacks and futures run inside the zone that was current when they were
//! created. All producers need a tokio runtime.

mod spawn;
mod timer;

pub use spawn::spawn;
pub use timer::{clear_interval, clear_timeout, set_interval, set_timeout};

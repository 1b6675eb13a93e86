//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - capability trait for registry entries (`cancel`, `is_live`)
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`CancelFuture`] - uniform cancellation outcome
//! - [`TaskFn`], [`TokenTask`] - ready-made descriptors
//! - [`TaskId`], [`Category`] - addressing within a zone

mod id;
mod task;
mod task_fn;

pub(crate) use task::invoke_cancel;

pub use id::{Category, TaskId};
pub use task::{CancelFuture, Task, TaskRef};
pub use task_fn::{TaskFn, TokenTask};

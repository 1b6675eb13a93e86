//! # Task capability shared by task descriptors and zones.
//!
//! This module defines the [`Task`] trait: the small capability a registry
//! entry must provide (`cancel`, `is_live`). Both task descriptors
//! ([`TaskFn`](crate::TaskFn)) and zones implement it, which is what lets a
//! zone register *itself* in its parent's registry while it is live.
//!
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>`.
//!
//! ## Cancellation outcome
//! [`Task::cancel`] is called synchronously (the cancellation is *initiated*
//! at call time) and returns a [`CancelFuture`] describing its completion.
//! Trivially synchronous cancellations return an already-ready future, so
//! callers always wait on a uniform type.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use crate::error::TaskError;

/// Completion of a cancellation request.
pub type CancelFuture = BoxFuture<'static, Result<(), TaskError>>;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Outstanding unit of work registered with a zone.
///
/// The payload of a task is opaque to the runtime; only the cancellation
/// capability is interpreted.
///
/// # Example
/// ```
/// use futures::future;
/// use taskzone::{CancelFuture, Task};
///
/// struct Socket;
///
/// impl Task for Socket {
///     fn name(&self) -> &str { "socket" }
///
///     fn cancel(&self) -> CancelFuture {
///         // close the socket...
///         Box::pin(future::ready(Ok(())))
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a human-readable task name (diagnostics only).
    fn name(&self) -> &str;

    /// Initiates cancellation and returns its completion.
    ///
    /// By the time this is called the task has already been removed from its
    /// registry, so a re-entrant cancel of the same id is a no-op.
    ///
    /// Default: nothing to interrupt, completes immediately.
    fn cancel(&self) -> CancelFuture {
        Box::pin(future::ready(Ok(())))
    }

    /// Reports whether the task still has outstanding work.
    fn is_live(&self) -> bool {
        true
    }
}

/// Invokes `task.cancel()`, isolating panics from both the call and the
/// returned future.
pub(crate) fn invoke_cancel(task: &TaskRef) -> CancelFuture {
    match catch_unwind(AssertUnwindSafe(|| task.cancel())) {
        Ok(fut) => AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|res| res.unwrap_or_else(|panic| Err(TaskError::from_panic(panic))))
            .boxed(),
        Err(panic) => future::ready(Err(TaskError::from_panic(panic))).boxed(),
    }
}

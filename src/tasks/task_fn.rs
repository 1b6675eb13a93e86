//! # Function-backed task descriptors (`TaskFn`, `TokenTask`)
//!
//! [`TaskFn`] wraps a closure `F: Fn() -> Fut` that is invoked when the task
//! is cancelled; the returned future is the cancellation outcome.
//! [`TokenTask`] cancels a [`CancellationToken`] owned by the producer.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use taskzone::{TaskError, TaskFn, TaskRef};
//!
//! let stopped = Arc::new(AtomicBool::new(false));
//! let flag = stopped.clone();
//! let t: TaskRef = TaskFn::arc("worker", move || {
//!     flag.store(true, Ordering::SeqCst);
//!     async { Ok::<_, TaskError>(()) }
//! });
//!
//! assert_eq!(t.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, Ready};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{CancelFuture, Task};

/// Function-backed task descriptor.
///
/// The closure runs synchronously when the task is cancelled; the future it
/// returns is awaited as the cancellation outcome.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

fn ready_ok() -> Ready<Result<(), TaskError>> {
    future::ready(Ok(()))
}

impl TaskFn<fn() -> Ready<Result<(), TaskError>>> {
    /// A descriptor with nothing to interrupt: cancelling it only removes it.
    ///
    /// ```rust
    /// use taskzone::{Task, TaskFn};
    ///
    /// let marker = TaskFn::noop("marker");
    /// assert_eq!(marker.name(), "marker");
    /// ```
    pub fn noop(name: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Self::arc(name, ready_ok as fn() -> Ready<Result<(), TaskError>>)
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn cancel(&self) -> CancelFuture {
        (self.f)().boxed()
    }
}

/// Descriptor whose cancellation cancels a [`CancellationToken`].
///
/// The producer keeps a clone of the token and stops cooperatively once it
/// observes `is_cancelled()`.
#[derive(Debug, Clone)]
pub struct TokenTask {
    name: Cow<'static, str>,
    token: CancellationToken,
}

impl TokenTask {
    /// Creates the descriptor as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            token,
        })
    }

    /// Returns the token this descriptor cancels.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Task for TokenTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn cancel(&self) -> CancelFuture {
        self.token.cancel();
        ready_ok().boxed()
    }

    fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }
}

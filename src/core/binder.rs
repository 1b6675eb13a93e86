//! # Execution binder.
//!
//! Runs code with a zone as the ambient context of the calling thread.
//!
//! - [`Zone::run`]: enter, call `on_enter`, run the entry, leave, call
//!   `on_leave`, then raise `ZoneFinished` if the zone is idle.
//! - [`Zone::bind`] / [`Zone::bind_with`]: capture the zone in a callable, so
//!   deferred callbacks resume in the zone that created them.
//! - [`Zone::in_zone`]: the same for futures; every poll runs inside the zone.
//!
//! ```text
//! run(entry)
//!   ├─ zone already current ──► entry()                  (no push/pop, no hooks)
//!   └─ otherwise
//!        enter ─► on_enter ─► entry() ─► leave ─► on_leave ─► idle? ─► ZoneFinished
//!                               │
//!                               └─ Err / panic ─► ZoneError notification (bubbles)
//! ```
//!
//! Failures of the entry are never re-thrown: they become a `ZoneError`
//! notification and `run` returns `None`.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tracing::warn;

use crate::core::context;
use crate::core::spec::ZoneHook;
use crate::core::zone::ErrorSource;
use crate::core::Zone;
use crate::error::TaskError;

impl Zone {
    /// Runs `entry` with this zone as the ambient zone.
    ///
    /// Returns `None` when the entry failed or panicked; the failure was
    /// raised as a `ZoneError` notification on this zone.
    pub fn run<T>(&self, entry: impl FnOnce() -> Result<T, TaskError>) -> Option<T> {
        let Some(guard) = context::enter(self) else {
            return self.invoke(entry);
        };

        let epoch = self.finish_epoch();
        self.call_hook(self.inner.spec.on_enter.as_ref(), "on_enter");
        let out = self.invoke(entry);
        drop(guard);
        self.call_hook(self.inner.spec.on_leave.as_ref(), "on_leave");

        // a transition to idle during the entry already notified
        if self.size() == 0 && self.finish_epoch() == epoch {
            self.notify_finish();
        }
        out
    }

    /// Wraps `f` so that every call runs inside this zone.
    ///
    /// The captured zone, not the caller's ambient zone, decides attribution.
    ///
    /// ```rust
    /// use taskzone::{Config, Zone};
    ///
    /// let zone = Zone::new_root("bound", Config::default());
    /// let which_zone = zone.bind(|| Ok(Zone::current()));
    ///
    /// let other = Zone::new_root("other", Config::default());
    /// let seen = other.run(|| Ok(which_zone())).flatten();
    /// assert_eq!(seen, Some(zone));
    /// ```
    pub fn bind<T, F>(&self, f: F) -> impl Fn() -> Option<T> + Send + Sync + 'static
    where
        F: Fn() -> Result<T, TaskError> + Send + Sync + 'static,
        T: 'static,
    {
        let zone = self.clone();
        move || zone.run(&f)
    }

    /// Like [`Zone::bind`], for callbacks that take an argument.
    pub fn bind_with<A, T, F>(&self, f: F) -> impl Fn(A) -> Option<T> + Send + Sync + 'static
    where
        F: Fn(A) -> Result<T, TaskError> + Send + Sync + 'static,
        A: 'static,
        T: 'static,
    {
        let zone = self.clone();
        move |arg| zone.run(|| f(arg))
    }

    /// Wraps `fut` so that each poll runs with this zone as the ambient zone.
    pub fn in_zone<F: Future>(&self, fut: F) -> InZone<F> {
        InZone {
            zone: self.clone(),
            inner: fut,
        }
    }

    fn invoke<T>(&self, entry: impl FnOnce() -> Result<T, TaskError>) -> Option<T> {
        let err = match catch_unwind(AssertUnwindSafe(entry)) {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(panic) => TaskError::from_panic(panic),
        };
        self.raise_error(err, ErrorSource::Run);
        None
    }

    fn call_hook(&self, hook: Option<&ZoneHook>, which: &'static str) {
        let Some(hook) = hook else { return };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| hook(self))) {
            warn!(
                zone = %self.label(),
                hook = which,
                info = %TaskError::from_panic(panic),
                "zone hook panicked"
            );
        }
    }
}

/// Future that re-enters its zone around every poll.
///
/// Created by [`Zone::in_zone`].
#[pin_project]
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct InZone<F> {
    zone: Zone,
    #[pin]
    inner: F,
}

impl<F> InZone<F> {
    /// The zone polls are attributed to.
    pub fn zone(&self) -> &Zone {
        &self.zone
    }
}

impl<F: Future> Future for InZone<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = context::enter(this.zone);
        this.inner.poll(cx)
    }
}

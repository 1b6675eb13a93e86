//! # Exec coordinator.
//!
//! [`Zone::exec`] runs an entry function in a fresh child zone and returns a
//! [`Join`] that resolves once the child's whole subtree is idle.
//!
//! ```text
//! exec(entry)
//!   spawn child ─► install error listener ─► child.run(entry)
//!       │
//!       ├─ error recorded        ──► Join ready: Err(error)
//!       ├─ child idle            ──► Join ready: Ok(value)
//!       └─ child live            ──► Join pending
//!                                     ├─ ZoneFinished on child ──► Ok(value)
//!                                     └─ ZoneError reaching child ──► Err(error)
//! ```
//!
//! Errors reaching the child are marked handled (`prevent_default`), and the
//! child is cancelled so the join does not wait on work whose result is moot.

use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::zone::spawn_detached;
use crate::core::{Zone, ZoneSpec};
use crate::error::TaskError;

type Signal = Arc<Mutex<Option<oneshot::Sender<Result<(), TaskError>>>>>;

impl Zone {
    /// Runs `entry` in a new child zone; the returned [`Join`] completes when
    /// the child and every descendant have gone idle.
    ///
    /// An entry that registers nothing yields an already-completed join:
    ///
    /// ```rust
    /// use futures::FutureExt;
    /// use taskzone::{Config, Zone};
    ///
    /// let zone = Zone::new_root("app", Config::default());
    /// let out = zone.exec(|| Ok(6 * 7)).now_or_never();
    /// assert_eq!(out, Some(Ok(42)));
    /// ```
    pub fn exec<T, F>(&self, entry: F) -> Join<T>
    where
        F: FnOnce() -> Result<T, TaskError>,
    {
        let child = self.spawn(ZoneSpec::new(type_name::<F>()));
        let (tx, rx) = oneshot::channel();
        let signal: Signal = Arc::new(Mutex::new(Some(tx)));
        let failure: Arc<Mutex<Option<TaskError>>> = Arc::new(Mutex::new(None));

        let weak = child.downgrade();
        let (s, f) = (Arc::clone(&signal), Arc::clone(&failure));
        child.on_error(move |n| {
            n.prevent_default();
            let err = n.error().cloned().unwrap_or(TaskError::Canceled);
            {
                let mut first = f.lock();
                if first.is_some() {
                    return;
                }
                *first = Some(err.clone());
            }
            if let Some(tx) = s.lock().take() {
                let _ = tx.send(Err(err));
            }
            if let Some(zone) = weak.upgrade() {
                spawn_detached(zone.cancel());
            }
        });

        let out = child.run(entry);
        if let Some(err) = failure.lock().clone() {
            return Join::done(child, Err(err));
        }
        if !child.is_live() {
            return Join::done(child, out.ok_or(TaskError::Canceled));
        }

        let s = Arc::clone(&signal);
        child.on_finish(move |_| {
            if let Some(tx) = s.lock().take() {
                let _ = tx.send(Ok(()));
            }
        });
        if !child.is_live() {
            return Join::done(child, out.ok_or(TaskError::Canceled));
        }

        Join {
            zone: child,
            state: JoinState::Waiting { value: out, rx },
        }
    }
}

/// Runs `entry` in a child of the current zone. See [`Zone::exec`].
pub fn exec<T, F>(entry: F) -> Join<T>
where
    F: FnOnce() -> Result<T, TaskError>,
{
    Zone::current().exec(entry)
}

enum JoinState<T> {
    Done(Option<Result<T, TaskError>>),
    Waiting {
        value: Option<T>,
        rx: oneshot::Receiver<Result<(), TaskError>>,
    },
}

/// Completion of an [`exec`](Zone::exec) call.
///
/// Resolves to the entry's value once the child zone is idle, or to the first
/// error that reached the child. Polling after completion yields
/// `Err(TaskError::Canceled)`.
#[must_use = "futures do nothing unless polled"]
pub struct Join<T> {
    zone: Zone,
    state: JoinState<T>,
}

impl<T> Join<T> {
    fn done(zone: Zone, out: Result<T, TaskError>) -> Self {
        Join {
            zone,
            state: JoinState::Done(Some(out)),
        }
    }

    /// The child zone the entry ran in.
    pub fn zone(&self) -> &Zone {
        &self.zone
    }
}

impl<T> Unpin for Join<T> {}

impl<T> Future for Join<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let out = match &mut this.state {
            JoinState::Done(out) => out.take().unwrap_or(Err(TaskError::Canceled)),
            JoinState::Waiting { value, rx } => match ready!(Pin::new(rx).poll(cx)) {
                Ok(Ok(())) => value.take().ok_or(TaskError::Canceled),
                Ok(Err(err)) => Err(err),
                Err(_closed) => Err(TaskError::Canceled),
            },
        };
        this.state = JoinState::Done(None);
        Poll::Ready(out)
    }
}

impl<T> std::fmt::Debug for Join<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            JoinState::Done(_) => "done",
            JoinState::Waiting { .. } => "waiting",
        };
        f.debug_struct("Join")
            .field("zone", &self.zone.label())
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;
    use crate::config::Config;
    use crate::core::zone::ErrorSource;
    use crate::tasks::{Category, TaskFn, TaskId};

    fn root() -> Zone {
        Zone::new_root("root", Config::default())
    }

    #[test]
    fn sync_entry_resolves_immediately_without_outside_notifications() {
        let r = root();
        let outside = Arc::new(AtomicUsize::new(0));
        let (a, b) = (outside.clone(), outside.clone());
        r.on_finish(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        r.on_error(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        let join = r.exec(|| Ok("value"));
        assert!(!r.has_in(&Category::ZONES, join.zone().key()));
        assert_eq!(join.now_or_never(), Some(Ok("value")));
        assert_eq!(outside.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resolves_only_when_the_registered_task_completes() {
        let r = root();
        let slot: Arc<Mutex<Option<(Zone, TaskId)>>> = Arc::new(Mutex::new(None));
        let s = slot.clone();
        let mut join = r.exec(move || {
            let z = Zone::current();
            let id = z.add(TaskFn::noop("pending"));
            *s.lock() = Some((z, id));
            Ok(5)
        });

        assert!((&mut join).now_or_never().is_none());
        let (z, id) = slot.lock().take().expect("entry ran");
        assert_eq!(&z, join.zone());
        assert!(r.is_live());

        assert!(z.delete(id));
        assert_eq!(join.now_or_never(), Some(Ok(5)));
        assert!(!r.is_live());
    }

    #[test]
    fn waits_for_grandchildren() {
        let r = root();
        let slot = Arc::new(Mutex::new(None));
        let s = slot.clone();
        let mut join = r.exec(move || {
            let grandchild = Zone::new("grandchild");
            let id = grandchild.add(TaskFn::noop("deep"));
            *s.lock() = Some((grandchild, id));
            Ok(())
        });

        let (gc, id) = slot.lock().take().expect("entry ran");
        assert!((&mut join).now_or_never().is_none());
        gc.delete(id);
        assert_eq!(join.now_or_never(), Some(Ok(())));
    }

    #[test]
    fn entry_error_rejects_and_cancels_child_work() {
        let r = root();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c = cancelled.clone();
        let join: Join<()> = r.exec(move || {
            Zone::current().add(TaskFn::arc("orphan", move || {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            }));
            Err(TaskError::fail("entry failed"))
        });

        assert_eq!(join.now_or_never(), Some(Err(TaskError::fail("entry failed"))));
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert!(!r.is_live());
    }

    #[test]
    fn later_error_rejects_pending_join() {
        let r = root();
        let slot = Arc::new(Mutex::new(None));
        let s = slot.clone();
        let mut join = r.exec(move || {
            let z = Zone::current();
            z.add(TaskFn::noop("stuck"));
            *s.lock() = Some(z);
            Ok(1)
        });
        assert!((&mut join).now_or_never().is_none());

        let child = slot.lock().take().expect("entry ran");
        assert!(child.raise_error(TaskError::fail("late"), ErrorSource::Task));
        assert_eq!(join.now_or_never(), Some(Err(TaskError::fail("late"))));
        assert!(!child.is_live());
    }

    #[test]
    fn polling_twice_yields_canceled() {
        let mut join = root().exec(|| Ok(1));
        assert_eq!((&mut join).now_or_never(), Some(Ok(1)));
        assert_eq!(join.now_or_never(), Some(Err(TaskError::Canceled)));
    }

    #[tokio::test]
    async fn free_exec_uses_the_ambient_zone() {
        let r = root();
        let join = r.run(|| Ok(exec(|| Ok(())))).expect("run succeeds");
        assert_eq!(join.zone().parent(), Some(r));
        assert_eq!(join.await, Ok(()));
    }
}

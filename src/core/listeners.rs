//! Per-zone listener table.
//!
//! Listeners are stored with the [`EventKind`] they observe and called in
//! registration order. Dispatch works on a snapshot, so a listener may add or
//! remove listeners (including itself) without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{EventKind, Notification};

static LISTENER_SEQ: AtomicU64 = AtomicU64::new(0);

pub(crate) type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Handle returned by [`Zone::add_listener`](crate::Zone::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Mutex<Vec<(ListenerId, EventKind, Listener)>>,
}

impl Listeners {
    pub(crate) fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(LISTENER_SEQ.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, kind, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(lid, _, _)| *lid != id);
        entries.len() != before
    }

    pub(crate) fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| Arc::clone(l))
            .collect()
    }
}

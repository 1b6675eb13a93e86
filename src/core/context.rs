//! # Ambient zone stack.
//!
//! Each thread carries a [`ContextStack`]: the ambient ("current") zone plus
//! the zones it replaced. [`Zone::current`](crate::Zone::current) reads the
//! top; when nothing was entered it falls back to [`Zone::global`](crate::Zone::global).
//!
//! ```text
//! enter(A)          current = A   previous = [None]
//! enter(B)          current = B   previous = [None, A]
//! enter(B)          no-op (already current, no guard)
//! guard(B) dropped  current = A   previous = [None]
//! guard(A) dropped  current = -   previous = []
//! ```
//!
//! Entering is scoped through [`EnterGuard`], which restores the previous zone
//! on drop (panics included). Guards are `!Send`: a guard must be dropped on
//! the thread whose stack it modified.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::core::Zone;

thread_local! {
    static STACK: RefCell<ContextStack> = const { RefCell::new(ContextStack::new()) };
}

/// Stack of ambient zones for one thread.
#[derive(Debug, Default)]
pub struct ContextStack {
    current: Option<Zone>,
    previous: Vec<Option<Zone>>,
}

impl ContextStack {
    /// Creates an empty stack.
    pub const fn new() -> Self {
        Self {
            current: None,
            previous: Vec::new(),
        }
    }

    /// The entered zone, if any.
    pub fn current(&self) -> Option<&Zone> {
        self.current.as_ref()
    }

    /// Number of entered zones.
    pub fn depth(&self) -> usize {
        self.previous.len()
    }

    /// Returns `true` if `zone` is the entered zone.
    pub fn is_current(&self, zone: &Zone) -> bool {
        self.current.as_ref() == Some(zone)
    }

    /// Makes `zone` current, remembering the previous one.
    ///
    /// Returns `false` (and changes nothing) if `zone` already is current.
    pub fn enter(&mut self, zone: Zone) -> bool {
        if self.is_current(&zone) {
            return false;
        }
        let prev = self.current.replace(zone);
        self.previous.push(prev);
        true
    }

    /// Restores the zone replaced by the last `enter`; returns the zone left.
    pub fn leave(&mut self) -> Option<Zone> {
        let prev = self.previous.pop()?;
        std::mem::replace(&mut self.current, prev)
    }
}

/// Ambient zone of the calling thread.
pub fn current() -> Zone {
    STACK
        .try_with(|s| s.borrow().current.clone())
        .ok()
        .flatten()
        .unwrap_or_else(Zone::global)
}

/// Enters `zone` on this thread.
///
/// Returns `None` when `zone` already is current (re-entry) or the thread is
/// being torn down.
pub(crate) fn enter(zone: &Zone) -> Option<EnterGuard> {
    let entered = STACK
        .try_with(|s| s.borrow_mut().enter(zone.clone()))
        .unwrap_or(false);
    entered.then(|| EnterGuard {
        _not_send: PhantomData,
    })
}

/// Restores the previous ambient zone when dropped.
#[must_use = "the zone is left as soon as the guard is dropped"]
pub(crate) struct EnterGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        // the left zone is dropped outside the borrow
        let _left = STACK.try_with(|s| s.borrow_mut().leave()).ok().flatten();
    }
}

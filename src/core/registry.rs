//! # Task registry - keyed collection of outstanding tasks.
//!
//! A [`TaskRegistry`] holds the tasks of one `(zone, category)` pair:
//! - `add(task)` → auto-assigns the next free id
//! - `set(id, task)` → explicit id, [`ZoneError::DuplicateKey`] if occupied
//! - `delete(id)` → `false` when absent (absence is never an error)
//! - `cancel(id)` / `cancel_all()` → remove first, then invoke the callback
//! - `detach(id)` / `detach_all()` → move entries out without invoking anything,
//!   so a caller can cancel them after releasing its own locks
//!
//! ## Id assignment
//! ```text
//! ids:   0 1 2 _ 4          next = 5   (high-water mark)
//! add  → 5                  next = 6
//! delete(5)                 next = 5   (top freed → mark walks down to highest live + 1)
//! delete(2)                 next = 5   (holes below the mark stay free)
//! ```
//!
//! ## Rules
//! - `len()` always equals the number of registered tasks.
//! - An id is never handed out by `add` while it is registered.
//! - A task is removed **before** its cancellation callback runs, so a
//!   re-entrant cancel of the same id finds nothing.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use crate::error::{TaskError, ZoneError};
use crate::tasks::{invoke_cancel, CancelFuture, Category, TaskId, TaskRef};

/// Aggregate outcome of [`TaskRegistry::cancel_all`].
pub type CancelAll = BoxFuture<'static, Vec<(TaskId, Result<(), TaskError>)>>;

/// Keyed collection of tasks for one category.
pub struct TaskRegistry {
    category: Category,
    tasks: HashMap<TaskId, TaskRef>,
    /// One past the highest id handed out or set.
    next: u64,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new(category: Category) -> Self {
        Self {
            category,
            tasks: HashMap::new(),
            next: 0,
        }
    }

    /// Category this registry serves.
    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Number of registered tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no task is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Current high-water mark (the id `add` tries first).
    #[inline]
    pub fn next_id(&self) -> TaskId {
        TaskId::new(self.next)
    }

    /// Registers `task` under the next free id.
    pub fn add(&mut self, task: TaskRef) -> TaskId {
        let id = self.free_id();
        self.tasks.insert(id, task);
        self.bump(id);
        id
    }

    /// Registers `task` under `id`.
    ///
    /// Fails with [`ZoneError::DuplicateKey`] and leaves the registry
    /// unchanged when `id` is occupied.
    pub fn set(&mut self, id: TaskId, task: TaskRef) -> Result<(), ZoneError> {
        if self.tasks.contains_key(&id) {
            return Err(ZoneError::DuplicateKey {
                category: self.category.clone(),
                id,
            });
        }
        self.tasks.insert(id, task);
        self.bump(id);
        Ok(())
    }

    /// Returns the task registered under `id`.
    pub fn get(&self, id: TaskId) -> Option<&TaskRef> {
        self.tasks.get(&id)
    }

    /// Returns `true` if `id` is registered.
    pub fn has(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Removes `id`; returns `false` if it was not registered.
    pub fn delete(&mut self, id: TaskId) -> bool {
        self.remove(id).is_some()
    }

    /// Removes `id`, then invokes its cancellation callback.
    ///
    /// Returns `None` if `id` was not registered.
    pub fn cancel(&mut self, id: TaskId) -> Option<CancelFuture> {
        let task = self.remove(id)?;
        Some(invoke_cancel(&task))
    }

    /// Cancels every task registered at call time.
    ///
    /// All tasks are removed first; callbacks run afterwards, in id order.
    /// Tasks registered by a callback are not part of this cancellation.
    /// The returned future completes once every callback's outcome has.
    pub fn cancel_all(&mut self) -> CancelAll {
        let pending: Vec<(TaskId, CancelFuture)> = self
            .drain()
            .into_iter()
            .map(|(id, task)| (id, invoke_cancel(&task)))
            .collect();

        let (ids, futs): (Vec<TaskId>, Vec<CancelFuture>) = pending.into_iter().unzip();
        join_all(futs)
            .map(move |results| ids.into_iter().zip(results).collect())
            .boxed()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterates registered tasks in arbitrary order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRef> {
        self.tasks.values()
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    /// Moves every task into a new registry of the same category, leaving
    /// this one empty. No callback runs.
    pub fn detach_all(&mut self) -> TaskRegistry {
        let detached = TaskRegistry {
            category: self.category.clone(),
            tasks: mem::take(&mut self.tasks),
            next: self.next,
        };
        self.next = 0;
        detached
    }

    /// Moves `id` into a new registry of the same category. No callback runs.
    ///
    /// Returns `None` if `id` was not registered.
    pub fn detach(&mut self, id: TaskId) -> Option<TaskRegistry> {
        let task = self.remove(id)?;
        let mut detached = TaskRegistry::new(self.category.clone());
        detached.tasks.insert(id, task);
        detached.bump(id);
        Some(detached)
    }

    /// Removes `id`, lowering the high-water mark when the top id is freed.
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<TaskRef> {
        let task = self.tasks.remove(&id)?;
        if id.get().saturating_add(1) >= self.next {
            self.lower_mark();
        }
        Some(task)
    }

    /// Removes every task, in id order.
    pub(crate) fn drain(&mut self) -> Vec<(TaskId, TaskRef)> {
        let mut drained: Vec<(TaskId, TaskRef)> = self.tasks.drain().collect();
        drained.sort_unstable_by_key(|(id, _)| *id);
        self.next = 0;
        drained
    }

    fn free_id(&self) -> TaskId {
        let mut raw = self.next;
        if self.tasks.contains_key(&TaskId::new(raw)) {
            // Only reachable once the mark saturated at u64::MAX.
            raw = 0;
            while self.tasks.contains_key(&TaskId::new(raw)) {
                raw += 1;
            }
        }
        TaskId::new(raw)
    }

    /// Walks the mark down past freed ids. Each step is a constant-time
    /// lookup; a gap wider than the registry falls back to one scan.
    fn lower_mark(&mut self) {
        if self.next == u64::MAX && self.tasks.contains_key(&TaskId::new(u64::MAX)) {
            return;
        }
        let mut steps = 0;
        while self.next > 0 && !self.tasks.contains_key(&TaskId::new(self.next - 1)) {
            if steps > self.tasks.len() {
                self.next = self
                    .tasks
                    .keys()
                    .map(|k| k.get().saturating_add(1))
                    .max()
                    .unwrap_or(0);
                return;
            }
            self.next -= 1;
            steps += 1;
        }
    }

    #[inline]
    fn bump(&mut self, id: TaskId) {
        self.next = self.next.max(id.get().saturating_add(1));
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("category", &self.category)
            .field("len", &self.tasks.len())
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::tasks::TaskFn;

    fn registry() -> TaskRegistry {
        TaskRegistry::new(Category::DEFAULT)
    }

    fn counting(calls: &Arc<AtomicUsize>) -> TaskRef {
        let calls = calls.clone();
        TaskFn::arc("counting", move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
    }

    #[test]
    fn add_assigns_dense_ids() {
        let mut reg = registry();
        let a = reg.add(TaskFn::noop("a"));
        let b = reg.add(TaskFn::noop("b"));
        assert_eq!((a.get(), b.get()), (0, 1));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.next_id(), TaskId::new(2));
    }

    #[test]
    fn freeing_the_top_id_lowers_the_mark() {
        let mut reg = registry();
        for _ in 0..3 {
            reg.add(TaskFn::noop("t"));
        }
        assert!(reg.delete(TaskId::new(1)));
        assert_eq!(reg.next_id(), TaskId::new(3));

        assert!(reg.delete(TaskId::new(2)));
        assert_eq!(reg.next_id(), TaskId::new(1));
        assert_eq!(reg.add(TaskFn::noop("t")), TaskId::new(1));
    }

    #[test]
    fn lifo_deletes_walk_the_mark_down() {
        let mut reg = registry();
        let n = 50_000u64;
        for _ in 0..n {
            reg.add(TaskFn::noop("t"));
        }
        for raw in (0..n).rev() {
            assert!(reg.delete(TaskId::new(raw)));
            assert_eq!(reg.next_id(), TaskId::new(raw));
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn sparse_ids_lower_the_mark_to_the_highest_live_id() {
        let mut reg = registry();
        reg.set(TaskId::new(3), TaskFn::noop("low")).unwrap();
        reg.set(TaskId::new(1_000_000_000), TaskFn::noop("far")).unwrap();

        assert!(reg.delete(TaskId::new(1_000_000_000)));
        assert_eq!(reg.next_id(), TaskId::new(4));

        reg.set(TaskId::new(u64::MAX), TaskFn::noop("top")).unwrap();
        reg.set(TaskId::new(u64::MAX - 1), TaskFn::noop("below")).unwrap();
        assert!(reg.delete(TaskId::new(u64::MAX - 1)));
        assert_eq!(reg.next_id(), TaskId::new(u64::MAX));
        assert!(reg.delete(TaskId::new(u64::MAX)));
        assert_eq!(reg.next_id(), TaskId::new(4));
    }

    #[test]
    fn detach_moves_entries_without_cancelling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut reg = registry();
        let a = reg.add(counting(&calls));
        let b = reg.add(counting(&calls));

        let one = reg.detach(a).unwrap();
        assert!(!reg.has(a));
        assert!(one.has(a));
        assert!(reg.detach(a).is_none());

        let rest = reg.detach_all();
        assert!(reg.is_empty());
        assert_eq!(reg.next_id(), TaskId::new(0));
        assert_eq!(rest.ids(), vec![b]);
        assert_eq!(rest.category(), &Category::DEFAULT);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_set_leaves_registry_unchanged() {
        let mut reg = registry();
        let first = TaskFn::noop("first");
        reg.set(TaskId::new(7), first.clone()).unwrap();

        let err = reg.set(TaskId::new(7), TaskFn::noop("second")).unwrap_err();
        assert_eq!(
            err,
            ZoneError::DuplicateKey {
                category: Category::DEFAULT,
                id: TaskId::new(7)
            }
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(TaskId::new(7)).map(|t| t.name().to_string()), Some("first".into()));
    }

    #[test]
    fn delete_of_absent_id_returns_false() {
        let mut reg = registry();
        assert!(!reg.delete(TaskId::new(0)));
        assert!(reg.cancel(TaskId::new(0)).is_none());
    }

    #[test]
    fn saturated_mark_falls_back_to_lowest_free_id() {
        let mut reg = registry();
        reg.set(TaskId::new(u64::MAX), TaskFn::noop("top")).unwrap();
        reg.set(TaskId::new(0), TaskFn::noop("zero")).unwrap();
        assert_eq!(reg.add(TaskFn::noop("next")), TaskId::new(1));
    }

    #[tokio::test]
    async fn cancel_removes_before_invoking_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut reg = registry();
        let id = reg.add(counting(&calls));

        let fut = reg.cancel(id).unwrap();
        assert!(!reg.has(id));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fut.await, Ok(()));
        assert!(reg.cancel(id).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_all_collects_every_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut reg = registry();
        reg.add(counting(&calls));
        reg.add(TaskFn::arc("refuses", || async { Err(TaskError::fail("busy")) }));
        reg.add(counting(&calls));

        let outcomes = reg.cancel_all().await;
        assert!(reg.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1], (TaskId::new(1), Err(TaskError::fail("busy"))));
    }

    proptest! {
        #[test]
        fn len_tracks_membership(ops in proptest::collection::vec((any::<bool>(), 0u64..16), 0..64)) {
            let mut reg = registry();
            let mut live = std::collections::BTreeSet::new();

            for (is_add, raw) in ops {
                if is_add {
                    let id = reg.add(TaskFn::noop("p"));
                    prop_assert!(live.insert(id.get()), "add returned a live id {}", id);
                } else {
                    let removed = reg.delete(TaskId::new(raw));
                    prop_assert_eq!(removed, live.remove(&raw));
                }
                prop_assert_eq!(reg.len(), live.len());
                prop_assert!(live.iter().all(|id| *id < reg.next_id().get()));
            }
        }
    }
}

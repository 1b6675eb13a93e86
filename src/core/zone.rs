//! # Zone: a node of the execution-context tree.
//!
//! A [`Zone`] owns one [`TaskRegistry`] per [`Category`] (created lazily) and
//! a live count: the number of entries across all of its registries.
//!
//! ## Liveness propagation
//! ```text
//! add(task) on C      size 0 → 1 ──► parent.set(C.id, C, Category::ZONES)   (recursively upward)
//! delete(id) on C     size 1 → 0 ──► parent.delete(C.id, Category::ZONES)    (recursively upward)
//!                                └─► ZoneFinished on C (then on every ancestor that went idle)
//! ```
//! Invariant: `size() > 0` ⇔ the zone is registered in its parent's
//! `Category::ZONES` registry. Liveness therefore reaches the root
//! transitively, and a parent's live count includes one entry per live child.
//!
//! ## Locking
//! - One `parking_lot::Mutex` per zone guards its registries, live count and links.
//! - Locks are only ever taken child → parent, so liveness transitions of
//!   one zone are linearized without deadlocks.
//! - No caller-supplied code (cancel callbacks, listeners, hooks) runs under a
//!   zone lock. Finish notifications produced by a transition are queued and
//!   dispatched once every lock is released.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::core::context;
use crate::core::listeners::{Listener, ListenerId, Listeners};
use crate::core::registry::{CancelAll, TaskRegistry};
use crate::core::spec::ZoneSpec;
use crate::error::{TaskError, ZoneError};
use crate::events::{Bus, Event, EventKind, Notification};
use crate::tasks::{invoke_cancel, CancelFuture, Category, Task, TaskId, TaskRef};

static ZONE_SEQ: AtomicU64 = AtomicU64::new(0);
static GLOBAL: OnceLock<Zone> = OnceLock::new();

/// Process-unique zone identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Returns the raw id.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}

/// State shared by every zone of one tree.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) bus: Bus,
}

pub(crate) struct State {
    pub(crate) parent: Option<Zone>,
    pub(crate) children: Vec<Weak<Inner>>,
    registries: HashMap<Category, TaskRegistry>,
    size: usize,
    /// Number of idle transitions so far.
    finishes: u64,
}

impl State {
    fn registry_mut(&mut self, category: &Category) -> &mut TaskRegistry {
        self.registries
            .entry(category.clone())
            .or_insert_with(|| TaskRegistry::new(category.clone()))
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

pub(crate) struct Inner {
    id: ZoneId,
    label: Arc<str>,
    pub(crate) spec: ZoneSpec,
    pub(crate) shared: Arc<Shared>,
    pub(crate) state: Mutex<State>,
    listeners: Listeners,
}

/// Zones whose finish notification waits for every lock to be released.
pub(crate) type Finished = Vec<Zone>;

/// Where a captured error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorSource {
    /// An entry function passed to `run`.
    Run,
    /// A task's own logic (spawned future, timer callback).
    Task,
    /// A cancellation callback.
    Cancel,
}

impl ErrorSource {
    fn as_str(self) -> &'static str {
        match self {
            ErrorSource::Run => "run",
            ErrorSource::Task => "task",
            ErrorSource::Cancel => "cancel",
        }
    }
}

/// Handle to a zone. Cheap to clone; clones refer to the same zone.
#[derive(Clone)]
pub struct Zone {
    pub(crate) inner: Arc<Inner>,
}

impl Zone {
    /// Creates a zone as a child of the current ambient zone.
    pub fn new(spec: impl Into<ZoneSpec>) -> Zone {
        Zone::current().spawn(spec)
    }

    /// Creates the root of a new tree with its own config and event bus.
    pub fn new_root(spec: impl Into<ZoneSpec>, config: Config) -> Zone {
        let bus = Bus::new(config.bus_capacity_clamped());
        Self::build(spec.into(), None, Arc::new(Shared { config, bus }))
    }

    /// Process-wide root, created on first use with `Config::default()`.
    ///
    /// This is the ambient zone of any thread that has not entered another one.
    pub fn global() -> Zone {
        GLOBAL
            .get_or_init(|| Zone::new_root("global", Config::default()))
            .clone()
    }

    /// The ambient zone of the calling thread.
    pub fn current() -> Zone {
        context::current()
    }

    fn build(spec: ZoneSpec, parent: Option<Zone>, shared: Arc<Shared>) -> Zone {
        let id = ZoneId(ZONE_SEQ.fetch_add(1, Ordering::Relaxed));
        let label: Arc<str> = match spec.name() {
            Some(name) => Arc::from(name),
            None => Arc::from(id.to_string()),
        };
        Zone {
            inner: Arc::new(Inner {
                id,
                label,
                spec,
                shared,
                state: Mutex::new(State {
                    parent,
                    children: Vec::new(),
                    registries: HashMap::new(),
                    size: 0,
                    finishes: 0,
                }),
                listeners: Listeners::default(),
            }),
        }
    }

    /// Creates a child of this zone.
    ///
    /// The child is idle until a task is registered in it.
    pub fn spawn(&self, spec: impl Into<ZoneSpec>) -> Zone {
        let child = Self::build(spec.into(), Some(self.clone()), Arc::clone(&self.inner.shared));
        self.link_child(&child, None);
        debug!(zone = %child.label(), parent = %self.label(), "zone spawned");
        child.emit(|| Event::new(EventKind::ZoneSpawned).with_reason(self.label_arc()));
        child
    }

    /// Process-unique id.
    ///
    /// While live, the zone is registered in its parent's [`Category::ZONES`]
    /// registry under `TaskId::new(id.get())`.
    #[inline]
    pub fn id(&self) -> ZoneId {
        self.inner.id
    }

    /// Name given in the [`ZoneSpec`], if any.
    pub fn name(&self) -> Option<&str> {
        self.inner.spec.name()
    }

    /// Diagnostic label: the name, or `zone#<id>`.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    fn label_arc(&self) -> Arc<str> {
        Arc::clone(&self.inner.label)
    }

    /// Configuration of the tree this zone was created in.
    pub fn config(&self) -> &Config {
        &self.inner.shared.config
    }

    /// Event bus of the tree this zone was created in.
    pub fn bus(&self) -> &Bus {
        &self.inner.shared.bus
    }

    /// Live count: entries across all registries, live children included.
    pub fn size(&self) -> usize {
        self.inner.state.lock().size
    }

    /// Returns `true` while the zone or a descendant has outstanding work.
    pub fn is_live(&self) -> bool {
        self.size() > 0
    }

    /// Categories that have a registry in this zone.
    pub fn categories(&self) -> Vec<Category> {
        self.inner.state.lock().registries.keys().cloned().collect()
    }

    /// Registered ids of `category`, ascending.
    pub fn task_ids(&self, category: &Category) -> Vec<TaskId> {
        self.inner
            .state
            .lock()
            .registries
            .get(category)
            .map(TaskRegistry::ids)
            .unwrap_or_default()
    }

    // ---------------------------
    // Registry operations
    // ---------------------------

    /// Registers `task` in [`Category::DEFAULT`] under the next free id.
    pub fn add(&self, task: TaskRef) -> TaskId {
        self.insert_next(&Category::DEFAULT, task)
    }

    /// Registers `task` in `category` under the next free id.
    pub fn add_in(&self, category: &Category, task: TaskRef) -> Result<TaskId, ZoneError> {
        reject_reserved(category)?;
        Ok(self.insert_next(category, task))
    }

    /// Registers `task` in [`Category::DEFAULT`] under `id`.
    pub fn set(&self, id: TaskId, task: TaskRef) -> Result<(), ZoneError> {
        self.set_in(&Category::DEFAULT, id, task)
    }

    /// Registers `task` in `category` under `id`.
    ///
    /// Fails with [`ZoneError::DuplicateKey`] when the id is occupied; the
    /// zone is left unchanged.
    pub fn set_in(&self, category: &Category, id: TaskId, task: TaskRef) -> Result<(), ZoneError> {
        reject_reserved(category)?;
        self.insert_at(category, id, task)
    }

    /// Returns the task under `id` in [`Category::DEFAULT`].
    pub fn get(&self, id: TaskId) -> Option<TaskRef> {
        self.get_in(&Category::DEFAULT, id)
    }

    /// Returns the task under `id` in `category`.
    pub fn get_in(&self, category: &Category, id: TaskId) -> Option<TaskRef> {
        self.inner
            .state
            .lock()
            .registries
            .get(category)
            .and_then(|r| r.get(id).cloned())
    }

    /// Returns `true` if `id` is registered in [`Category::DEFAULT`].
    pub fn has(&self, id: TaskId) -> bool {
        self.has_in(&Category::DEFAULT, id)
    }

    /// Returns `true` if `id` is registered in `category`.
    pub fn has_in(&self, category: &Category, id: TaskId) -> bool {
        self.inner
            .state
            .lock()
            .registries
            .get(category)
            .is_some_and(|r| r.has(id))
    }

    /// Removes `id` from [`Category::DEFAULT`]. See [`Zone::delete_in`].
    pub fn delete(&self, id: TaskId) -> bool {
        self.delete_in(&Category::DEFAULT, id)
    }

    /// Removes `id` from `category` (natural completion of a task).
    ///
    /// Returns `false` when the id is not registered, including when the
    /// task was cancelled first. Child zones cannot be removed this way.
    pub fn delete_in(&self, category: &Category, id: TaskId) -> bool {
        if category.is_reserved() {
            return false;
        }
        let mut finished = Finished::new();
        let removed = self.remove_entry(category, id, &mut finished).is_some();
        Self::flush(finished);
        removed
    }

    // ---------------------------
    // Cancellation
    // ---------------------------

    /// Cancels the whole subtree.
    ///
    /// Live children are cancelled first (each leaves this zone's registry on
    /// its own way to idle), then every remaining task of every category is
    /// removed in one transition and its callback invoked. All callbacks have
    /// run when this returns; the future completes once every outcome has.
    ///
    /// Failed callbacks do not fail the cancellation: each failure is raised
    /// as a `ZoneError` notification on this zone once the poll that sees it
    /// completes. A child's failures are raised on the child, and the tasks
    /// of one category are reported together.
    pub fn cancel(&self) -> BoxFuture<'static, ()> {
        debug!(zone = %self.label(), size = self.size(), "cancel requested");
        self.emit(|| Event::new(EventKind::CancelRequested));

        let children: Vec<(TaskId, TaskRef)> = {
            let st = self.inner.state.lock();
            match st.registries.get(&Category::ZONES) {
                Some(r) => r
                    .ids()
                    .into_iter()
                    .filter_map(|id| r.get(id).map(|child| (id, Arc::clone(child))))
                    .collect(),
                None => Vec::new(),
            }
        };
        let mut outcomes: FuturesUnordered<CancelAll> = children
            .iter()
            .map(|(id, child)| {
                let id = *id;
                invoke_cancel(child).map(move |res| vec![(id, res)]).boxed()
            })
            .collect();

        let mut finished = Finished::new();
        let detached = self.detach_tasks(&mut finished);
        Self::flush(finished);

        for mut registry in detached {
            for id in registry.ids() {
                self.emit(|| Event::new(EventKind::TaskCancelled).with_task(registry.category().clone(), id));
            }
            outcomes.push(registry.cancel_all());
        }

        let zone = self.clone();
        async move {
            while let Some(batch) = outcomes.next().await {
                for (_, outcome) in batch {
                    if let Err(err) = outcome {
                        warn!(zone = %zone.label(), error = %err, "task cancellation failed");
                        zone.raise_error(err, ErrorSource::Cancel);
                    }
                }
            }
        }
        .boxed()
    }

    /// Cancels a single task.
    ///
    /// Returns `Ok(None)` when `id` is not registered and
    /// [`ZoneError::UnknownCategory`] when `category` has no registry.
    /// Cancelling an id of [`Category::ZONES`] cancels that child zone.
    pub fn cancel_task(&self, id: TaskId, category: &Category) -> Result<Option<CancelFuture>, ZoneError> {
        if !self.inner.state.lock().registries.contains_key(category) {
            return Err(ZoneError::UnknownCategory {
                category: category.clone(),
            });
        }
        if category.is_reserved() {
            return Ok(self.get_in(category, id).map(|child| invoke_cancel(&child)));
        }

        let mut finished = Finished::new();
        let detached = self.detach_entry(category, id, &mut finished);
        Self::flush(finished);

        Ok(detached.and_then(|mut registry| {
            self.emit(|| Event::new(EventKind::TaskCancelled).with_task(category.clone(), id));
            registry.cancel(id)
        }))
    }

    // ---------------------------
    // Listeners
    // ---------------------------

    /// Adds a listener for `kind` (`ZoneFinished` or `ZoneError`).
    pub fn add_listener(
        &self,
        kind: EventKind,
        f: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> ListenerId {
        let listener: Listener = Arc::new(f);
        self.inner.listeners.add(kind, listener)
    }

    /// Shorthand for `add_listener(EventKind::ZoneFinished, f)`.
    pub fn on_finish(&self, f: impl Fn(&Notification) + Send + Sync + 'static) -> ListenerId {
        self.add_listener(EventKind::ZoneFinished, f)
    }

    /// Shorthand for `add_listener(EventKind::ZoneError, f)`.
    pub fn on_error(&self, f: impl Fn(&Notification) + Send + Sync + 'static) -> ListenerId {
        self.add_listener(EventKind::ZoneError, f)
    }

    /// Removes a listener; returns `false` if it was not registered here.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    // ---------------------------
    // Bookkeeping internals
    // ---------------------------

    /// Key of this zone in its parent's `Category::ZONES` registry.
    #[inline]
    pub(crate) fn key(&self) -> TaskId {
        TaskId::new(self.inner.id.0)
    }

    pub(crate) fn insert_next(&self, category: &Category, task: TaskRef) -> TaskId {
        let mut st = self.inner.state.lock();
        let id = st.registry_mut(category).add(task);
        self.note_added(&mut st, category, id);
        id
    }

    fn insert_at(&self, category: &Category, id: TaskId, task: TaskRef) -> Result<(), ZoneError> {
        let mut st = self.inner.state.lock();
        st.registry_mut(category).set(id, task)?;
        self.note_added(&mut st, category, id);
        Ok(())
    }

    fn note_added(&self, st: &mut State, category: &Category, id: TaskId) {
        st.size += 1;
        if st.size == 1 {
            debug!(zone = %self.label(), "zone became live");
            if let Some(parent) = &st.parent {
                parent.attach_child(self);
            }
        }
        self.emit(|| Event::new(EventKind::TaskAdded).with_task(category.clone(), id));
    }

    /// Registers a live child in `Category::ZONES`. Caller holds the child's lock.
    pub(crate) fn attach_child(&self, child: &Zone) {
        let entry: TaskRef = Arc::new(child.clone());
        if let Err(err) = self.insert_at(&Category::ZONES, child.key(), entry) {
            warn!(zone = %self.label(), child = %child.label(), error = %err, "live child registered twice");
        }
    }

    pub(crate) fn remove_entry(
        &self,
        category: &Category,
        id: TaskId,
        finished: &mut Finished,
    ) -> Option<TaskRef> {
        let mut st = self.inner.state.lock();
        let task = st.registries.get_mut(category)?.remove(id)?;
        self.note_removed(&mut st, 1, finished);
        self.emit(|| Event::new(EventKind::TaskRemoved).with_task(category.clone(), id));
        Some(task)
    }

    fn note_removed(&self, st: &mut State, count: usize, finished: &mut Finished) {
        st.size = st.size.saturating_sub(count);
        if st.size == 0 {
            st.finishes += 1;
            debug!(zone = %self.label(), "zone went idle");
            finished.push(self.clone());
            if let Some(parent) = &st.parent {
                parent.remove_entry(&Category::ZONES, self.key(), finished);
            }
        }
    }

    /// Moves `id` out of its registry; the caller cancels it unlocked.
    fn detach_entry(&self, category: &Category, id: TaskId, finished: &mut Finished) -> Option<TaskRegistry> {
        let mut st = self.inner.state.lock();
        let detached = st.registries.get_mut(category)?.detach(id)?;
        self.note_removed(&mut st, 1, finished);
        self.emit(|| Event::new(EventKind::TaskRemoved).with_task(category.clone(), id));
        Some(detached)
    }

    /// Moves every non-zone task out in one transition.
    fn detach_tasks(&self, finished: &mut Finished) -> Vec<TaskRegistry> {
        let mut st = self.inner.state.lock();
        let detached: Vec<TaskRegistry> = st
            .registries
            .iter_mut()
            .filter(|(category, registry)| !category.is_reserved() && !registry.is_empty())
            .map(|(_, registry)| registry.detach_all())
            .collect();
        let count: usize = detached.iter().map(TaskRegistry::len).sum();
        if count > 0 {
            self.note_removed(&mut st, count, finished);
        }
        detached
    }

    pub(crate) fn finish_epoch(&self) -> u64 {
        self.inner.state.lock().finishes
    }

    pub(crate) fn downgrade(&self) -> WeakZone {
        WeakZone(Arc::downgrade(&self.inner))
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Zone {
        Zone { inner }
    }

    // ---------------------------
    // Notifications
    // ---------------------------

    /// Dispatches the queued finish notifications, child first.
    pub(crate) fn flush(finished: Finished) {
        for zone in finished {
            zone.notify_finish();
        }
    }

    pub(crate) fn notify_finish(&self) {
        let ev = self.stamp(Event::new(EventKind::ZoneFinished));
        self.bus().publish(ev.clone());
        self.dispatch(&Notification::new(self.clone(), ev));
    }

    /// Raises a `ZoneError` notification and applies the default action if
    /// nobody handled it. Returns `true` when a listener prevented the default.
    pub(crate) fn raise_error(&self, error: TaskError, source: ErrorSource) -> bool {
        let ev = self.stamp(Event::new(EventKind::ZoneError).with_error(error.clone()));
        self.bus().publish(ev.clone());

        let n = Notification::new(self.clone(), ev);
        self.dispatch(&n);
        if n.default_prevented() {
            return true;
        }

        error!(zone = %self.label(), source = source.as_str(), error = %error, "unhandled zone error");
        self.emit(|| Event::new(EventKind::ErrorUnhandled).with_error(error.clone()));
        if source != ErrorSource::Cancel && self.config().error_policy.cancels() {
            spawn_detached(self.cancel());
        }
        false
    }

    /// Delivers `n` to this zone, then toward the root while it bubbles.
    pub(crate) fn dispatch(&self, n: &Notification) {
        let kind = n.kind();
        let mut next = Some(self.clone());
        while let Some(zone) = next {
            let hook = match kind {
                EventKind::ZoneFinished => zone.inner.spec.on_finish.clone(),
                EventKind::ZoneError => zone.inner.spec.on_error.clone(),
                _ => None,
            };
            for listener in hook.into_iter().chain(zone.inner.listeners.snapshot(kind)) {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(n))) {
                    warn!(
                        zone = %zone.label(),
                        info = %TaskError::from_panic(panic),
                        "zone listener panicked"
                    );
                }
            }
            if !n.bubbles() || n.propagation_stopped() {
                break;
            }
            next = zone.parent();
        }
    }

    fn stamp(&self, ev: Event) -> Event {
        ev.with_zone_label(self.label_arc()).with_zone_id(self.inner.id.0)
    }

    /// Publishes a bookkeeping event, skipping construction when nobody listens.
    fn emit(&self, make: impl FnOnce() -> Event) {
        let bus = self.bus();
        if bus.has_receivers() {
            bus.publish(self.stamp(make()));
        }
    }
}

fn reject_reserved(category: &Category) -> Result<(), ZoneError> {
    if category.is_reserved() {
        return Err(ZoneError::ReservedCategory {
            category: category.clone(),
        });
    }
    Ok(())
}

/// Drives a cancellation outcome started from a synchronous context.
///
/// The outcome is polled once in place, so failures that are already known
/// are reported before this returns. Whatever is still pending continues on
/// the current tokio runtime; without one it is dropped with a warning.
pub(crate) fn spawn_detached(mut fut: BoxFuture<'static, ()>) {
    if (&mut fut).now_or_never().is_some() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => warn!("no tokio runtime; pending cancellation outcomes dropped"),
    }
}

/// Non-owning zone handle (used by listeners that must not keep their zone alive).
#[derive(Clone)]
pub(crate) struct WeakZone(Weak<Inner>);

impl WeakZone {
    pub(crate) fn upgrade(&self) -> Option<Zone> {
        self.0.upgrade().map(Zone::from_inner)
    }
}

/// A zone is a task of its parent while live.
impl Task for Zone {
    fn name(&self) -> &str {
        self.label()
    }

    fn cancel(&self) -> CancelFuture {
        Zone::cancel(self).map(Ok).boxed()
    }

    fn is_live(&self) -> bool {
        Zone::is_live(self)
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Zone {}

impl Hash for Zone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.inner.id)
            .field("label", &self.label())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::tasks::TaskFn;

    fn root() -> Zone {
        Zone::new_root("root", Config::default())
    }

    fn count_finishes(zone: &Zone) -> Arc<AtomicUsize> {
        let n = Arc::new(AtomicUsize::new(0));
        let c = n.clone();
        zone.on_finish(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        n
    }

    #[test]
    fn first_task_registers_zone_in_parent() {
        let r = root();
        let c = r.spawn("child");
        assert!(!r.has_in(&Category::ZONES, c.key()));

        let t1 = c.add(TaskFn::noop("t1"));
        assert!(r.has_in(&Category::ZONES, c.key()));
        assert_eq!(r.size(), 1);

        c.add(TaskFn::noop("t2"));
        assert_eq!(r.size(), 1, "second task must not re-register the zone");

        c.delete(t1);
        assert!(r.has_in(&Category::ZONES, c.key()));
    }

    #[test]
    fn last_delete_deregisters_and_finishes() {
        let r = root();
        let c = r.spawn("child");
        let finished = count_finishes(&c);
        let root_finished = count_finishes(&r);

        let t1 = c.add(TaskFn::noop("t1"));
        assert!(c.delete(t1));

        assert!(!r.has_in(&Category::ZONES, c.key()));
        assert_eq!(c.size(), 0);
        assert_eq!(r.size(), 0);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(root_finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delete_without_reaching_zero_is_silent() {
        let r = root();
        let finished = count_finishes(&r);
        let a = r.add(TaskFn::noop("a"));
        r.add(TaskFn::noop("b"));

        assert!(r.delete(a));
        assert!(!r.delete(a));
        assert_eq!(r.size(), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reserved_category_is_read_only() {
        let r = root();
        let err = r.add_in(&Category::ZONES, TaskFn::noop("x")).unwrap_err();
        assert_eq!(err.as_label(), "zone_reserved_category");

        let c = r.spawn("c");
        c.add(TaskFn::noop("t"));
        assert!(!r.delete_in(&Category::ZONES, c.key()));
        assert!(r.is_live());
    }

    #[test]
    fn duplicate_id_in_zone_is_rejected() {
        let r = root();
        r.set_in(&Category::TIMER, TaskId::new(4), TaskFn::noop("a")).unwrap();
        let err = r
            .set_in(&Category::TIMER, TaskId::new(4), TaskFn::noop("b"))
            .unwrap_err();
        assert!(matches!(err, ZoneError::DuplicateKey { .. }));
        assert_eq!(r.size(), 1);
    }

    #[test]
    fn unknown_category_cancel_is_typed_error() {
        let r = root();
        let err = r.cancel_task(TaskId::new(0), &Category::new("io")).err();
        assert_eq!(
            err,
            Some(ZoneError::UnknownCategory {
                category: Category::new("io")
            })
        );

        r.add(TaskFn::noop("a"));
        assert!(r.cancel_task(TaskId::new(9), &Category::DEFAULT).unwrap().is_none());
    }

    #[test]
    fn cancel_task_removes_then_invokes_once() {
        let r = root();
        let finished = count_finishes(&r);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = r.add(TaskFn::arc("single", move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }));

        let outcome = r.cancel_task(id, &Category::DEFAULT).unwrap().expect("task was registered");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!r.has(id));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.now_or_never(), Some(Ok(())));
        assert!(r.cancel_task(id, &Category::DEFAULT).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_reaches_every_task_once_and_finishes_each_zone_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = |calls: &Arc<AtomicUsize>| -> TaskRef {
            let calls = calls.clone();
            TaskFn::arc("counted", move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
        };

        let r = root();
        let child = r.spawn("child");
        r.add(counting(&calls));
        r.add_in(&Category::TIMER, counting(&calls)).unwrap();
        child.add(counting(&calls));

        let root_finished = count_finishes(&r);
        let child_finished = count_finishes(&child);

        r.cancel().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(r.size(), 0);
        assert_eq!(child.size(), 0);
        assert_eq!(root_finished.load(Ordering::SeqCst), 1);
        assert_eq!(child_finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_cancel_callback_is_reported_not_propagated() {
        let r = Zone::new_root(
            "root",
            Config {
                error_policy: crate::ErrorPolicy::ReportOnly,
                ..Config::default()
            },
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        r.on_error(move |n| {
            n.prevent_default();
            s.lock().push(n.error().cloned());
        });

        r.add(TaskFn::arc("stubborn", || async { Err(TaskError::fail("refused")) }));
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let c = ok_calls.clone();
        r.add(TaskFn::arc("polite", move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }));

        r.cancel().await;
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), vec![Some(TaskError::fail("refused"))]);
    }

    #[test]
    fn failing_cancel_is_reported_without_a_runtime() {
        let z = root();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        z.on_error(move |n| s.lock().push(n.error().cloned()));
        z.add(TaskFn::arc("stubborn", || async { Err(TaskError::fail("cannot stop")) }));

        let out: Option<()> = z.run(|| Err(TaskError::fail("entry failed")));
        assert_eq!(out, None);
        assert_eq!(z.size(), 0);
        assert_eq!(
            *seen.lock(),
            vec![
                Some(TaskError::fail("entry failed")),
                Some(TaskError::fail("cannot stop")),
            ]
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn pending_cancel_outcome_without_a_runtime_is_dropped_loudly() {
        let z = root();
        z.add(TaskFn::arc("slow", || futures::future::pending::<Result<(), TaskError>>()));

        let out: Option<()> = z.run(|| Err(TaskError::fail("entry failed")));
        assert_eq!(out, None);
        assert_eq!(z.size(), 0);
        assert!(logs_contain("pending cancellation outcomes dropped"));
    }

    #[test]
    fn error_notifications_bubble_until_stopped() {
        let r = root();
        let mid = r.spawn("mid");
        let leaf = mid.spawn("leaf");

        let hits = Arc::new(Mutex::new(Vec::new()));
        for (zone, stop) in [(&leaf, false), (&mid, true), (&r, false)] {
            let h = hits.clone();
            let label = zone.label().to_string();
            zone.on_error(move |n| {
                n.prevent_default();
                h.lock().push(label.clone());
                if stop {
                    n.stop_propagation();
                }
            });
        }

        assert!(leaf.raise_error(TaskError::fail("x"), ErrorSource::Task));
        assert_eq!(*hits.lock(), vec!["leaf".to_string(), "mid".to_string()]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn unhandled_error_is_logged_and_keeps_work_under_report_only() {
        let r = Zone::new_root(
            "root",
            Config {
                error_policy: crate::ErrorPolicy::ReportOnly,
                ..Config::default()
            },
        );
        let leaf = r.spawn("leaf");
        leaf.add(TaskFn::noop("t"));

        assert!(!leaf.raise_error(TaskError::fail("boom"), ErrorSource::Task));
        assert!(logs_contain("unhandled zone error"));
        assert!(leaf.is_live());
    }

    #[test]
    fn configured_hook_runs_before_listeners() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = order.clone();
        let r = root();
        let z = r.spawn(ZoneSpec::new("z").on_finish(move |_| o.lock().push("hook")));
        let o = order.clone();
        z.on_finish(move |_| o.lock().push("listener"));

        let id = z.add(TaskFn::noop("t"));
        z.delete(id);
        assert_eq!(*order.lock(), vec!["hook", "listener"]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let r = root();
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();
        let id = r.on_finish(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert!(r.remove_listener(id));
        assert!(!r.remove_listener(id));

        let t = r.add(TaskFn::noop("t"));
        r.delete(t);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_touch_zones_during_finish() {
        let r = root();
        let c = r.spawn("c");
        let c2 = c.clone();
        r.on_finish(move |_| {
            // re-entering the child from a parent's finish must not deadlock
            let id = c2.add(TaskFn::noop("late"));
            c2.delete(id);
        });

        let id = c.add(TaskFn::noop("t"));
        c.delete(id);
        assert_eq!(c.size(), 0);
    }
}

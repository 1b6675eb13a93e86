//! End-to-end behaviour of the zone tree through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use taskzone::{producers, Category, Config, TaskError, TaskFn, TaskId, TaskRef, Zone, ZoneError};

fn root(name: &str) -> Zone {
    Zone::new_root(name, Config::default())
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn counting_finish(zone: &Zone) -> Arc<AtomicUsize> {
    let n = counter();
    let c = n.clone();
    zone.on_finish(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    n
}

fn counting_task(calls: &Arc<AtomicUsize>) -> TaskRef {
    let calls = calls.clone();
    TaskFn::arc("counted", move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
}

#[test]
fn child_liveness_is_mirrored_in_root() {
    let r = root("R");
    let c = r.spawn("C");
    let finished = counting_finish(&c);

    let t1 = c.add(TaskFn::noop("T1"));
    assert!(r.task_ids(&Category::ZONES).len() == 1);
    assert!(r.is_live());

    assert!(c.delete(t1));
    assert!(r.task_ids(&Category::ZONES).is_empty());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[test]
fn liveness_invariant_holds_at_every_depth() {
    let r = root("r");
    let a = r.spawn("a");
    let b = a.spawn("b");
    let zones = [&r, &a, &b];

    // a live zone is registered in its parent under its own id
    let registered = |child: &Zone, parent: &Zone| {
        parent.has_in(&Category::ZONES, TaskId::new(child.id().get()))
    };

    let deep = b.add(TaskFn::noop("deep"));
    let mid = a.add(TaskFn::noop("mid"));
    for pair in zones.windows(2) {
        let (parent, child) = (pair[0], pair[1]);
        assert_eq!(child.is_live(), registered(child, parent));
    }

    b.delete(deep);
    assert!(!registered(&b, &a));
    assert!(registered(&a, &r));

    a.delete(mid);
    for pair in zones.windows(2) {
        let (parent, child) = (pair[0], pair[1]);
        assert!(!child.is_live());
        assert!(!registered(child, parent));
    }
}

#[tokio::test]
async fn cancelling_a_subtree_reaches_every_task_once() {
    let r = root("r");
    let child = r.spawn("child");
    let calls = counter();
    r.add(counting_task(&calls));
    r.add(counting_task(&calls));
    child.add(counting_task(&calls));

    let (rf, cf) = (counting_finish(&r), counting_finish(&child));
    r.cancel().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(rf.load(Ordering::SeqCst), 1);
    assert_eq!(cf.load(Ordering::SeqCst), 1);
    assert!(!r.is_live() && !child.is_live());
}

#[test]
fn exec_of_synchronous_entry_is_immediate_and_silent() {
    let r = root("r");
    let outside = counter();
    let (a, b) = (outside.clone(), outside.clone());
    r.on_finish(move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    });
    r.on_error(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(r.exec(|| Ok(1 + 1)).now_or_never(), Some(Ok(2)));
    assert_eq!(outside.load(Ordering::SeqCst), 0);
}

#[test]
fn exec_resolves_exactly_when_its_task_is_removed() {
    let r = root("r");
    let slot: Arc<Mutex<Option<(Zone, TaskId)>>> = Arc::new(Mutex::new(None));
    let s = slot.clone();
    let mut join = r.exec(move || {
        let zone = Zone::current();
        let id = zone.add(TaskFn::noop("later"));
        *s.lock() = Some((zone, id));
        Ok("done")
    });

    for _ in 0..3 {
        assert!((&mut join).now_or_never().is_none());
    }
    let (zone, id) = slot.lock().take().expect("entry ran");
    zone.delete(id);
    assert_eq!(join.now_or_never(), Some(Ok("done")));
}

#[test]
fn bind_uses_the_captured_zone_and_restores_the_caller() {
    let bound = root("bound");
    let other = root("other");
    let which_zone = bound.bind(|| Ok(Zone::current()));
    let outer_call = other.bind(move || Ok((Zone::current(), which_zone())));

    let before = Zone::current();
    let (outer, inner) = outer_call().expect("bound call succeeds");
    assert_eq!(outer, other);
    assert_eq!(inner, Some(bound));
    assert_eq!(Zone::current(), before);
}

#[test]
fn duplicate_id_fails_and_leaves_registry_unchanged() {
    let r = root("r");
    let id = TaskId::new(3);
    r.set(id, TaskFn::noop("first")).unwrap();

    let err = r.set(id, TaskFn::noop("second")).unwrap_err();
    assert_eq!(
        err,
        ZoneError::DuplicateKey {
            category: Category::DEFAULT,
            id
        }
    );
    assert_eq!(r.size(), 1);
    assert_eq!(r.get(id).map(|t| t.name().to_string()), Some("first".to_string()));
}

#[test]
fn unhandled_errors_reach_the_root_once() {
    let r = root("r");
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = errors.clone();
    r.on_error(move |n| {
        e.lock().push((n.target().label().to_string(), n.error().cloned()));
    });

    let leaf = r.spawn("mid").spawn("leaf");
    let out: Option<()> = leaf.run(|| Err(TaskError::fail("nope")));

    assert!(out.is_none());
    assert_eq!(
        *errors.lock(),
        vec![("leaf".to_string(), Some(TaskError::fail("nope")))]
    );
}

#[tokio::test(start_paused = true)]
async fn structured_exec_over_timers_and_futures() {
    let app = root("app");
    let order = Arc::new(Mutex::new(Vec::new()));
    let o = order.clone();

    let out = app
        .exec(move || {
            let o2 = o.clone();
            producers::set_timeout(Duration::from_millis(20), move || {
                o2.lock().push("timer");
                let o3 = o2.clone();
                producers::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    o3.lock().push("future");
                    Ok(())
                });
                Ok(())
            });
            o.lock().push("entry");
            Ok(())
        })
        .await;

    assert_eq!(out, Ok(()));
    assert_eq!(*order.lock(), vec!["entry", "timer", "future"]);
    assert!(!app.is_live());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_never_double_registers_the_zone() {
    let r = root("R");
    let c = r.spawn("C");
    let key = TaskId::new(c.id().get());

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let (r, c) = (r.clone(), c.clone());
            tokio::spawn(async move {
                for round in 0..500 {
                    let id = c.add(TaskFn::noop("churn"));
                    assert!(r.size() <= 1, "parent holds the child more than once");
                    assert!(r.has_in(&Category::ZONES, key), "live child missing from parent");
                    assert!(c.delete(id));
                    if round % 64 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.expect("worker panicked");
    }

    assert_eq!(c.size(), 0);
    assert_eq!(r.size(), 0);
    assert!(!r.has_in(&Category::ZONES, key));
}

//! Zone-attributed timers.
//!
//! ```text
//! set_timeout(d, f)
//!   zone.add("timer", TokenTask) ──► tokio task: select { token.cancelled, sleep(d) }
//!                                                     │
//!                            sleep elapsed, still registered ──► zone.run(f) ──► zone.delete("timer", id)
//! ```
//!
//! The callback runs while its timer is still registered, so work it
//! schedules keeps the zone live without an intermediate finish.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::Zone;
use crate::error::TaskError;
use crate::tasks::{Category, TaskId, TokenTask};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs `f` once after `delay`, inside the current zone.
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn set_timeout<F>(delay: Duration, f: F) -> TaskId
where
    F: FnOnce() -> Result<(), TaskError> + Send + 'static,
{
    let zone = Zone::current();
    let token = CancellationToken::new();
    let id = zone.insert_next(&Category::TIMER, TokenTask::arc("timeout", token.clone()));

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                if zone.has_in(&Category::TIMER, id) {
                    zone.run(f);
                    zone.delete_in(&Category::TIMER, id);
                }
            }
        }
    });
    id
}

/// Runs `f` every `period` (min 1ms), inside the current zone, until cleared
/// or cancelled. The first call happens one period from now.
///
/// # Panics
/// Panics when called outside a tokio runtime.
pub fn set_interval<F>(period: Duration, f: F) -> TaskId
where
    F: Fn() -> Result<(), TaskError> + Send + 'static,
{
    let period = period.max(MIN_PERIOD);
    let zone = Zone::current();
    let token = CancellationToken::new();
    let id = zone.insert_next(&Category::TIMER, TokenTask::arc("interval", token.clone()));

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !zone.has_in(&Category::TIMER, id) {
                        break;
                    }
                    zone.run(&f);
                }
            }
        }
    });
    id
}

/// Cancels a timeout of the current zone; `false` if it already fired or
/// was never registered there.
pub fn clear_timeout(id: TaskId) -> bool {
    clear(id)
}

/// Cancels an interval of the current zone; `false` if it is not registered there.
pub fn clear_interval(id: TaskId) -> bool {
    clear(id)
}

fn clear(id: TaskId) -> bool {
    matches!(Zone::current().cancel_task(id, &Category::TIMER), Ok(Some(_)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::Config;

    fn root() -> Zone {
        Zone::new_root("timers", Config::default())
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_inside_its_zone_then_deregisters() {
        let z = root();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let id = z
            .run(|| {
                Ok(set_timeout(Duration::from_millis(50), move || {
                    *s.lock() = Some(Zone::current());
                    Ok(())
                }))
            })
            .unwrap();
        assert!(z.has_in(&Category::TIMER, id));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(*seen.lock(), Some(z.clone()));
        assert!(!z.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timeout_never_fires() {
        let z = root();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let id = z
            .run(|| {
                Ok(set_timeout(Duration::from_millis(20), move || {
                    f.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            })
            .unwrap();

        assert_eq!(z.run(|| Ok(clear_timeout(id))), Some(true));
        assert_eq!(z.run(|| Ok(clear_timeout(id))), Some(false));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!z.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_until_cleared() {
        let z = root();
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        let id = z
            .run(|| {
                Ok(set_interval(Duration::from_millis(10), move || {
                    t.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(z.is_live());

        assert_eq!(z.run(|| Ok(clear_interval(id))), Some(true));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!z.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn exec_waits_for_timers() {
        let z = root();
        let join = z.exec(|| {
            set_timeout(Duration::from_millis(30), || Ok(()));
            Ok("late")
        });
        assert!(join.zone().is_live());
        assert_eq!(join.await, Ok("late"));
    }
}

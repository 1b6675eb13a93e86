//! # Observer: bus → subscribers bridge.
//!
//! [`Zone::observe`] subscribes to the tree's [`Bus`](crate::events::Bus) and
//! forwards every event to a [`SubscriberSet`] from a background task.
//!
//! ```text
//! Zone ops ── publish ──► Bus ──► listener task ──► SubscriberSet::emit
//!                                     │  Lagged(n) ──► SubscriberOverflow("observer", "lagged")
//!                                     └─ shutdown ──► drain pending ──► SubscriberSet::shutdown
//! ```
//!
//! Requires a tokio runtime. Only events published after `observe` returns
//! are seen.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::Zone;
use crate::events::Event;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Running bus listener; see [`Zone::observe`].
///
/// Dropping it stops forwarding; [`Observer::shutdown`] also waits until the
/// subscribers handled everything forwarded so far.
#[derive(Debug)]
pub struct Observer {
    listener: Option<JoinHandle<SubscriberSet>>,
    token: CancellationToken,
}

impl Zone {
    /// Forwards the events of this zone's tree to `subscribers`.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn observe(&self, subscribers: Vec<Arc<dyn Subscribe>>) -> Observer {
        let bus = self.bus().clone();
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(subscribers, bus);
        let token = CancellationToken::new();
        let stop = token.clone();

        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "observer lagged behind the event bus");
                            set.emit(Event::subscriber_overflow("observer", "lagged"));
                        }
                        Err(RecvError::Closed) => return set,
                    },
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set
        });

        Observer {
            listener: Some(listener),
            token,
        }
    }
}

impl Observer {
    /// Stops forwarding, then waits for every subscriber to drain its queue.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(listener) = self.listener.take() {
            if let Ok(set) = listener.await {
                set.shutdown().await;
            }
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

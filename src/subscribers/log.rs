//! # Tracing-backed event writer.
//!
//! [`LogWriter`] turns bus events into `tracing` records, one line per event.
//! Useful while developing or as a reference subscriber.
//!
//! ## Output format (fmt subscriber)
//! ```text
//! INFO taskzone: task-added zone=worker category=timer task=0
//! INFO taskzone: zone-finished zone=worker
//! WARN taskzone: zone-error zone=worker error="execution failed: refused"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let zone = e.zone.as_deref().unwrap_or("-");
        let category = e.category.as_ref().map(|c| c.as_str()).unwrap_or("-");
        let task = e.task.map(|t| t.get());
        match e.kind {
            EventKind::ZoneSpawned => {
                debug!(target: "taskzone", zone, parent = e.reason.as_deref(), "zone-spawned");
            }
            EventKind::ZoneMoved => {
                debug!(target: "taskzone", zone, parent = e.reason.as_deref(), "zone-moved");
            }
            EventKind::TaskAdded => {
                debug!(target: "taskzone", zone, category, task, "task-added");
            }
            EventKind::TaskRemoved => {
                debug!(target: "taskzone", zone, category, task, "task-removed");
            }
            EventKind::TaskCancelled => {
                info!(target: "taskzone", zone, category, task, "task-cancelled");
            }
            EventKind::CancelRequested => {
                info!(target: "taskzone", zone, "cancel-requested");
            }
            EventKind::ZoneFinished => {
                info!(target: "taskzone", zone, "zone-finished");
            }
            EventKind::ZoneError | EventKind::ErrorUnhandled => {
                let error = e.error.as_ref().map(|err| err.to_string());
                warn!(target: "taskzone", zone, error = error.as_deref(), unhandled = e.kind == EventKind::ErrorUnhandled, "zone-error");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: "taskzone", subscriber = zone, reason = e.reason.as_deref(), kind = ?e.kind, "subscriber-trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

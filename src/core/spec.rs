//! # Zone configuration: name and lifecycle hooks.
//!
//! Defines [`ZoneSpec`], the explicit set of recognized per-zone settings:
//! a diagnostic name and optional lifecycle hooks.
//!
//! A spec can be created:
//! - **Name only** with `ZoneSpec::new("name")`, or from `&str` / `String`
//! - **Anonymous** with `ZoneSpec::default()` (label falls back to `zone#<id>`)
//!
//! ## Hooks
//! | Hook        | Called                                                        |
//! |-------------|---------------------------------------------------------------|
//! | `on_enter`  | after the zone became the ambient zone in `run`               |
//! | `on_leave`  | after `run` restored the previous ambient zone                |
//! | `on_error`  | first, before listeners, for every error reaching this zone   |
//! | `on_finish` | first, before listeners, when this zone goes idle             |
//!
//! ## Example
//! ```rust
//! use taskzone::ZoneSpec;
//!
//! let spec = ZoneSpec::new("ingest")
//!     .on_error(|n| {
//!         // handled here: no diagnostic, no cancellation
//!         n.prevent_default();
//!     });
//! assert_eq!(spec.name(), Some("ingest"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::Zone;
use crate::events::Notification;

pub(crate) type ZoneHook = Arc<dyn Fn(&Zone) + Send + Sync>;
pub(crate) type NotificationHook = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Per-zone configuration: name and lifecycle hooks.
#[derive(Clone, Default)]
pub struct ZoneSpec {
    name: Option<Arc<str>>,
    pub(crate) on_enter: Option<ZoneHook>,
    pub(crate) on_leave: Option<ZoneHook>,
    pub(crate) on_error: Option<NotificationHook>,
    pub(crate) on_finish: Option<NotificationHook>,
}

impl ZoneSpec {
    /// Creates a spec with a diagnostic name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the diagnostic name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns a new spec with updated name.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the hook run when `run` enters the zone.
    pub fn on_enter(mut self, f: impl Fn(&Zone) + Send + Sync + 'static) -> Self {
        self.on_enter = Some(Arc::new(f));
        self
    }

    /// Sets the hook run when `run` leaves the zone.
    pub fn on_leave(mut self, f: impl Fn(&Zone) + Send + Sync + 'static) -> Self {
        self.on_leave = Some(Arc::new(f));
        self
    }

    /// Sets the error hook (may call `prevent_default` / `stop_propagation`).
    pub fn on_error(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the finish hook.
    pub fn on_finish(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Arc::new(f));
        self
    }
}

impl From<&str> for ZoneSpec {
    fn from(name: &str) -> Self {
        ZoneSpec::new(name)
    }
}

impl From<String> for ZoneSpec {
    fn from(name: String) -> Self {
        ZoneSpec::new(name)
    }
}

impl fmt::Debug for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneSpec")
            .field("name", &self.name)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

//! # Zone tree configuration.
//!
//! Provides [`Config`] centralized settings shared by every zone of one tree.
//!
//! Config is used in two ways:
//! 1. **Explicit roots**: `Zone::new_root(spec, config)`
//! 2. **Global root**: [`Zone::global`](crate::Zone::global) uses `Config::default()`
//!
//! Descendants never carry their own config; they inherit the root's.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by [`Config::bus_capacity_clamped`]

use crate::policies::ErrorPolicy;

/// Configuration shared by a zone tree.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped)
/// - `error_policy`: Default action for unhandled errors
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Observers that lag behind more than `bus_capacity` events skip older
    /// items.
    pub bus_capacity: usize,

    /// What happens after an unhandled error has been reported.
    pub error_policy: ErrorPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `error_policy = ErrorPolicy::CancelZone`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            error_policy: ErrorPolicy::default(),
        }
    }
}

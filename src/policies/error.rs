//! # Unhandled error policy.
//!
//! [`ErrorPolicy`] decides the default action taken when a `ZoneError`
//! notification finishes bubbling and no listener called
//! [`prevent_default`](crate::Notification::prevent_default).
//!
//! ```text
//! run(entry) ── Err / panic ──► ZoneError notification (bubbles to root)
//!                                   │
//!                       prevented? ─┴─ no ──► diagnostic sink (tracing::error!)
//!                                              ├─ ErrorPolicy::CancelZone  ─► zone.cancel()
//!                                              └─ ErrorPolicy::ReportOnly  ─► nothing else
//! ```
//!
//! Errors reported by a failing cancellation callback never trigger another
//! cancellation, whatever the policy: the zone is already being cancelled.

/// Default action for unhandled errors raised inside a zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the error, then cancel the faulting zone's outstanding work
    /// (fail-fast within the faulting subtree).
    #[default]
    CancelZone,
    /// Only report the error; outstanding work keeps running.
    ReportOnly,
}

impl ErrorPolicy {
    /// Returns `true` when unhandled errors cancel the faulting zone.
    #[inline]
    pub fn cancels(self) -> bool {
        matches!(self, ErrorPolicy::CancelZone)
    }
}

//! # Event subscribers.
//!
//! Consumers of the bookkeeping events published on a zone tree's
//! [`Bus`](crate::events::Bus).
//!
//! ```text
//! Zone ops ── publish(Event) ──► Bus ──► Observer ──► SubscriberSet
//!                                                        ├──► LogWriter
//!                                                        ├──► Metrics
//!                                                        └──► Custom ...
//! ```
//!
//! Subscribers see every zone of the tree; zone listeners
//! ([`Zone::on_finish`](crate::Zone::on_finish) and friends) are the synchronous,
//! per-zone alternative.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

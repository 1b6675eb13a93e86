//! Zone policies.
//!
//! - [`ErrorPolicy`]: default action for errors nobody handled.

mod error;

pub use error::ErrorPolicy;

//! # Task identifiers and registry categories.
//!
//! A task is addressed by `(zone, category, id)`:
//! - [`Category`] selects one of the zone's registries (created lazily);
//! - [`TaskId`] is unique within that registry while the task is live.

use std::borrow::Cow;
use std::fmt;

/// Identifier of a task within one `(zone, category)` registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw id.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Label selecting one of a zone's task registries.
///
/// The set of categories is open: any label may be used, and the registry
/// behind it is created on first use. A few labels are predefined:
///
/// | Category              | Used by                                        |
/// |-----------------------|------------------------------------------------|
/// | [`Category::DEFAULT`] | operations that do not name a category         |
/// | [`Category::TIMER`]   | [`set_timeout`](crate::producers::set_timeout) / [`set_interval`](crate::producers::set_interval) |
/// | [`Category::FUTURE`]  | [`spawn`](crate::producers::spawn)              |
/// | [`Category::ZONES`]   | live child zones (reserved, read-only for users) |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(Cow<'static, str>);

impl Category {
    /// Category used when none is given.
    pub const DEFAULT: Category = Category(Cow::Borrowed("default"));
    /// Timer tasks.
    pub const TIMER: Category = Category(Cow::Borrowed("timer"));
    /// Zone-attributed futures.
    pub const FUTURE: Category = Category(Cow::Borrowed("future"));
    /// Child zones registered in their parent while live.
    pub const ZONES: Category = Category(Cow::Borrowed("zone"));

    /// Creates a category from any label.
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self(label.into())
    }

    /// Returns the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub(crate) fn is_reserved(&self) -> bool {
        *self == Category::ZONES
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::DEFAULT
    }
}

impl From<&'static str> for Category {
    fn from(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self(Cow::Owned(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

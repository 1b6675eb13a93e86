//! Error types used by the zone runtime and by caller-supplied code.
//!
//! This module defines two main error enums:
//!
//! - [`ZoneError`] : structural violations of the zone/registry contract.
//!   These are programmer errors and abort the offending call.
//! - [`TaskError`] : failures of caller-supplied code (entry functions,
//!   cancellation callbacks, spawned futures). These never abort a zone
//!   operation; they are captured and turned into `ZoneError` notifications.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;

use thiserror::Error;

use crate::tasks::{Category, TaskId};

/// # Errors produced by zone and registry operations.
///
/// Absent task ids are **not** errors: `delete` returns `false`, `get`
/// returns `None`. The only "not found" condition reported here concerns
/// tree membership ([`ZoneError::NotAChild`]).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// A task with the same id is already registered in this category.
    #[error("task {id} already registered in category {category}")]
    DuplicateKey {
        /// Category of the registry that rejected the task.
        category: Category,
        /// The occupied id.
        id: TaskId,
    },

    /// The category has never been used in this zone.
    #[error("no registry for category {category}")]
    UnknownCategory {
        /// The missing category.
        category: Category,
    },

    /// User tasks cannot be written into the category holding child zones.
    #[error("category {category} is reserved for child zones")]
    ReservedCategory {
        /// The reserved category.
        category: Category,
    },

    /// Only zones can be attached as children of a zone.
    #[error("node is not a zone")]
    NotAZone,

    /// The node is not a child of this zone.
    #[error("node is not a child of this zone")]
    NotAChild,

    /// The insertion would make a zone its own ancestor.
    #[error("zone cannot be inserted into itself or its descendants")]
    Hierarchy,
}

impl ZoneError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskzone::{Category, TaskId, ZoneError};
    ///
    /// let err = ZoneError::DuplicateKey { category: Category::DEFAULT, id: TaskId::new(3) };
    /// assert_eq!(err.as_label(), "zone_duplicate_key");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ZoneError::DuplicateKey { .. } => "zone_duplicate_key",
            ZoneError::UnknownCategory { .. } => "zone_unknown_category",
            ZoneError::ReservedCategory { .. } => "zone_reserved_category",
            ZoneError::NotAZone => "zone_not_a_zone",
            ZoneError::NotAChild => "zone_not_a_child",
            ZoneError::Hierarchy => "zone_hierarchy",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ZoneError::DuplicateKey { category, id } => {
                format!("duplicate key: id={id} category={category}")
            }
            ZoneError::UnknownCategory { category } => format!("unknown category: {category}"),
            ZoneError::ReservedCategory { category } => format!("reserved category: {category}"),
            ZoneError::NotAZone => "type mismatch: node is not a zone".to_string(),
            ZoneError::NotAChild => "not found: node is not a child".to_string(),
            ZoneError::Hierarchy => "hierarchy violation".to_string(),
        }
    }
}

/// # Errors produced by caller-supplied code.
///
/// Entry functions passed to [`Zone::run`](crate::Zone::run) return
/// `Result<T, TaskError>`; panics are caught and mapped to
/// [`TaskError::Panicked`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Caller code reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Caller code panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The work was cancelled before it could complete.
    #[error("cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Builds a [`TaskError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        TaskError::Panicked { info }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskzone::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }
}

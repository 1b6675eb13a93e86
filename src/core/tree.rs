//! # Tree substrate.
//!
//! Parent/child links of the zone tree, and the only operations that move a
//! zone between parents.
//!
//! - Every zone has at most one parent; the parent keeps its children as weak
//!   references (ordered), the child keeps its parent alive.
//! - Only zones can be attached: [`TreeNode::as_zone`] returning `None` is
//!   rejected with [`ZoneError::NotAZone`].
//! - Moving a live zone carries its liveness along: it leaves the old
//!   parent's `Category::ZONES` registry (which may finish the old parent) and
//!   joins the new one.
//! - A change of parent publishes `ZoneMoved`; reordering under the same
//!   parent publishes nothing.
//!
//! A zone detached with [`Zone::remove_child`] becomes a root but keeps the
//! configuration and event bus of the tree it was created in.

use std::ptr;
use std::sync::Arc;

use crate::core::zone::Finished;
use crate::core::Zone;
use crate::error::ZoneError;
use crate::events::{Event, EventKind};
use crate::tasks::Category;

/// A node that can be handed to the tree operations.
pub trait TreeNode: Send + Sync {
    /// The zone behind this node, if it is one.
    fn as_zone(&self) -> Option<&Zone> {
        None
    }
}

impl TreeNode for Zone {
    fn as_zone(&self) -> Option<&Zone> {
        Some(self)
    }
}

impl Zone {
    /// The parent zone; `None` for roots.
    pub fn parent(&self) -> Option<Zone> {
        self.inner.state.lock().parent.clone()
    }

    /// Topmost ancestor (the zone itself for roots).
    pub fn root(&self) -> Zone {
        let mut zone = self.clone();
        while let Some(parent) = zone.parent() {
            zone = parent;
        }
        zone
    }

    /// Snapshot of the children still alive, in tree order.
    pub fn children(&self) -> Vec<Zone> {
        self.inner
            .state
            .lock()
            .children
            .iter()
            .filter_map(|w| w.upgrade())
            .map(Zone::from_inner)
            .collect()
    }

    /// Returns `true` if `other` is this zone or one of its descendants.
    pub fn contains(&self, other: &Zone) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(zone) = cursor {
            if &zone == self {
                return true;
            }
            cursor = zone.parent();
        }
        false
    }

    /// Makes `node` the last child of this zone. See [`Zone::insert_before`].
    pub fn append_child(&self, node: &dyn TreeNode) -> Result<Zone, ZoneError> {
        self.insert_before(node, None)
    }

    /// Makes `node` a child of this zone, placed before `reference` (or last).
    ///
    /// # Errors
    /// - [`ZoneError::NotAZone`]: `node` is not a zone.
    /// - [`ZoneError::Hierarchy`]: `node` is this zone or one of its ancestors.
    /// - [`ZoneError::NotAChild`]: `reference` is not a child of this zone
    ///   (also when `reference` is `node` itself).
    pub fn insert_before(&self, node: &dyn TreeNode, reference: Option<&Zone>) -> Result<Zone, ZoneError> {
        let child = node.as_zone().ok_or(ZoneError::NotAZone)?.clone();
        if child.contains(self) {
            return Err(ZoneError::Hierarchy);
        }
        if let Some(reference) = reference {
            if reference.parent().as_ref() != Some(self) {
                return Err(ZoneError::NotAChild);
            }
            if reference == &child {
                return Ok(child);
            }
        }

        let mut finished = Finished::new();
        let moved;
        {
            let mut st = child.inner.state.lock();
            let live = st.size() > 0;
            let previous = st.parent.replace(self.clone());
            moved = previous.as_ref() != Some(self);
            if let Some(old) = previous.filter(|old| old != self) {
                old.unlink_child(&child);
                if live {
                    old.remove_entry(&Category::ZONES, child.key(), &mut finished);
                }
            }
            self.link_child(&child, reference);
            if live && moved {
                self.attach_child(&child);
            }
        }
        Zone::flush(finished);

        let bus = self.bus();
        if moved && bus.has_receivers() {
            bus.publish(
                Event::new(EventKind::ZoneMoved)
                    .with_zone_label(child.label())
                    .with_zone_id(child.id().get())
                    .with_reason(self.label()),
            );
        }
        Ok(child)
    }

    /// Detaches `child`; it becomes a root.
    ///
    /// A live child leaves this zone's registry, which may finish this zone.
    pub fn remove_child(&self, child: &Zone) -> Result<Zone, ZoneError> {
        let mut finished = Finished::new();
        {
            let mut st = child.inner.state.lock();
            if st.parent.as_ref() != Some(self) {
                return Err(ZoneError::NotAChild);
            }
            st.parent = None;
            self.unlink_child(child);
            if st.size() > 0 {
                self.remove_entry(&Category::ZONES, child.key(), &mut finished);
            }
        }
        Zone::flush(finished);
        Ok(child.clone())
    }

    /// Records `child` in the ordered child list, before `before` if given.
    pub(crate) fn link_child(&self, child: &Zone, before: Option<&Zone>) {
        let target = Arc::as_ptr(&child.inner);
        let mut st = self.inner.state.lock();
        st.children
            .retain(|w| w.strong_count() > 0 && !ptr::eq(w.as_ptr(), target));
        let at = before
            .and_then(|r| {
                let r = Arc::as_ptr(&r.inner);
                st.children.iter().position(|w| ptr::eq(w.as_ptr(), r))
            })
            .unwrap_or(st.children.len());
        st.children.insert(at, Arc::downgrade(&child.inner));
    }

    fn unlink_child(&self, child: &Zone) {
        let target = Arc::as_ptr(&child.inner);
        self.inner
            .state
            .lock()
            .children
            .retain(|w| !ptr::eq(w.as_ptr(), target));
    }
}

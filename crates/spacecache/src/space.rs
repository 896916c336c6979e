#![forbid(unsafe_code)]

//! The space interface: what the cache needs from the logical item model.
//!
//! A space is an addressable, possibly sparse or unbounded collection of
//! items over a coordinate domain. The cache never owns it; it observes
//! change notifications and asks it for item factories. Everything else the
//! concrete storage strategies need is expressed as layout extension traits
//! next to each strategy (see [`crate::storage`]).

use std::rc::Rc;

use spacecache_core::change::{ChangeReason, ViewApplicationMask};
use spacecache_core::notify::SubscriberId;

use crate::item::CacheItemFactory;

/// Opaque identifier of one logical item within a space.
///
/// Spaces choose the encoding; a grid space typically packs row and column
/// into the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create an id from a raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A logical collection of items the cache renders a window onto.
///
/// Notifications fire synchronously, inline with the mutating call that
/// triggers them, tagged with a [`ChangeReason`] bitmask.
pub trait Space {
    /// Register a change listener; it is invoked in registration order.
    fn subscribe(&self, listener: Rc<dyn Fn(ChangeReason)>) -> SubscriberId;

    /// Remove a previously registered listener.
    fn unsubscribe(&self, id: SubscriberId);

    /// Produce an item factory for the given view-application selection.
    ///
    /// The cache replaces its factory wholesale through this call whenever
    /// the mask changes or the space signals a structural or hint change.
    fn create_item_factory(&self, mask: ViewApplicationMask) -> Box<dyn CacheItemFactory>;
}

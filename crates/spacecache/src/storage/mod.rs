#![forbid(unsafe_code)]

//! Storage strategies: how cached items are indexed and reconciled.
//!
//! The cache delegates all item storage to one owned [`CacheStorage`]
//! trait object. Concrete strategies decide the enumeration order, the
//! spatial lookup, and how much of the previous item set survives a
//! validation pass. Two are provided: [`rows::RowsCacheStorage`] for
//! one-dimensional row layouts and [`grid::GridCacheStorage`] for
//! two-dimensional grids.

pub mod grid;
pub mod rows;

use std::rc::Rc;

use spacecache_core::geometry::Point;

use crate::cache::SpaceCache;
use crate::item::CacheItem;
use crate::space::ItemId;

pub use grid::{GridCacheStorage, GridLayout, grid_cache};
pub use rows::{RowsCacheStorage, RowsLayout, rows_cache};

/// Storage and indexing of cached items, pluggable under [`SpaceCache`].
///
/// Implementations use interior mutability; all methods take `&self`
/// because they are reached from the cache's logically-const read surface.
/// Reentrant mutation (a visitor invalidating the storage it is iterating)
/// is a contract violation and fails fast on borrow panics.
pub trait CacheStorage {
    /// Drop every cached item.
    fn clear(&self);

    /// Reconcile the cached set with the cache's current window and scroll
    /// state. May consult [`SpaceCache::scroll_delta`] and
    /// [`SpaceCache::size_delta`] to reuse still-visible items and only
    /// create/discard the delta set instead of rebuilding everything.
    fn validate(&self, cache: &SpaceCache);

    /// Visit cached items in strategy-defined order. The visitor returns
    /// `false` to stop; the return value is `false` iff it did.
    fn for_each_item(&self, visitor: &mut dyn FnMut(&Rc<dyn CacheItem>) -> bool) -> bool;

    /// Cached item for `id`, if currently cached.
    fn item(&self, id: ItemId) -> Option<Rc<dyn CacheItem>>;

    /// Cached item covering a window-coordinate point, if any.
    fn item_by_position(&self, cache: &SpaceCache, point: Point) -> Option<Rc<dyn CacheItem>>;
}

#![forbid(unsafe_code)]

//! Windowed cache of item representations over a scrollable space.
//!
//! A [`SpaceCache`] renders a small window onto a large, possibly
//! unbounded, logical grid of items without re-deriving every item's
//! visual representation on every frame: it tracks which items are
//! visible, lazily reconciles the cached set when the window or scroll
//! offset moves, and runs the draw/hit-test/controller passes over the
//! cached items with strict ordering and reentrancy guarantees.
//!
//! Storage and indexing of the cached items is pluggable through
//! [`CacheStorage`]; [`storage::rows`] and [`storage::grid`] provide the
//! row- and grid-layout strategies, wired up with [`rows_cache`] and
//! [`grid_cache`].

pub mod cache;
pub mod item;
pub mod space;
pub mod storage;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use cache::{DrawProxy, SpaceCache, ViewVisit};
pub use item::{
    CacheItem, CacheItemFactory, Controller, ControllerContext, ControllerList, DrawSurface,
    GuiContext, TooltipInfo, ViewNode,
};
pub use space::{ItemId, Space};
pub use storage::{CacheStorage, GridLayout, RowsLayout, grid_cache, rows_cache};

// Foundation re-exports, so hosts depend on one crate.
pub use spacecache_core::change::{ChangeReason, ViewApplicationMask};
pub use spacecache_core::geometry::{Point, Rect, Size};
pub use spacecache_core::notify::{Listeners, SubscriberId};

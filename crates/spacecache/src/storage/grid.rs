#![forbid(unsafe_code)]

//! Grid-based storage: items addressed by row and column (spreadsheets,
//! thumbnail grids, terminal-style cell matrices).

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use spacecache_core::change::ViewApplicationMask;
use spacecache_core::geometry::{Point, Rect};

use crate::cache::SpaceCache;
use crate::item::CacheItem;
use crate::space::{ItemId, Space};
use crate::storage::CacheStorage;

/// Layout queries a grid space answers for its cache.
///
/// All coordinates are space coordinates; spans are half-open.
pub trait GridLayout: Space {
    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Rows whose vertical extent intersects `top..bottom`.
    fn visible_rows(&self, top: i32, bottom: i32) -> Range<usize>;

    /// Columns whose horizontal extent intersects `left..right`.
    fn visible_columns(&self, left: i32, right: i32) -> Range<usize>;

    /// Identifier of the cell at `row`/`column`.
    fn cell_id(&self, row: usize, column: usize) -> ItemId;

    /// Bounds of the cell at `row`/`column`.
    fn cell_rect(&self, row: usize, column: usize) -> Rect;

    /// Cell covering `point`, if any.
    fn cell_at(&self, point: Point) -> Option<(usize, usize)>;
}

/// Cached-item storage for grid layouts.
///
/// Keeps the visible cells in row-major order plus an id-keyed index.
/// Validation reuses surviving cells by id, translating their window
/// rectangles by the accumulated scroll delta, and creates/discards only
/// the cells that entered/left the window.
pub struct GridCacheStorage<S> {
    space: Rc<S>,
    ordered: RefCell<Vec<Rc<dyn CacheItem>>>,
    index: RefCell<HashMap<ItemId, Rc<dyn CacheItem>>>,
}

impl<S: GridLayout> GridCacheStorage<S> {
    pub fn new(space: Rc<S>) -> Self {
        Self {
            space,
            ordered: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }
}

impl<S: GridLayout> CacheStorage for GridCacheStorage<S> {
    fn clear(&self) {
        self.ordered.borrow_mut().clear();
        self.index.borrow_mut().clear();
    }

    fn validate(&self, cache: &SpaceCache) {
        let delta = cache.scroll_delta();
        if !self.ordered.borrow().is_empty() && delta.is_zero() && cache.size_delta().is_zero() {
            // Geometry did not move; the visible set is intact.
            return;
        }

        let window = cache.window();
        let top_left = cache.window_to_space(window.top_left());
        let rows = self
            .space
            .visible_rows(top_left.y, top_left.y + window.size().height);
        let columns = self
            .space
            .visible_columns(top_left.x, top_left.x + window.size().width);
        let origin = cache.origin_position();

        let mut index = self.index.borrow_mut();
        let mut ordered = self.ordered.borrow_mut();
        ordered.clear();

        let mut kept = HashMap::with_capacity(rows.len() * columns.len());
        for row in rows {
            for column in columns.clone() {
                let id = self.space.cell_id(row, column);
                let item = match index.remove(&id) {
                    Some(item) => {
                        item.set_rect(item.rect().translated(delta));
                        item
                    }
                    None => {
                        let item = cache.create_item(id);
                        item.set_rect(self.space.cell_rect(row, column).translated(origin));
                        item
                    }
                };
                kept.insert(id, Rc::clone(&item));
                ordered.push(item);
            }
        }
        // Cells that left the window drop with the old index.
        *index = kept;
    }

    fn for_each_item(&self, visitor: &mut dyn FnMut(&Rc<dyn CacheItem>) -> bool) -> bool {
        for item in self.ordered.borrow().iter() {
            if !visitor(item) {
                return false;
            }
        }
        true
    }

    fn item(&self, id: ItemId) -> Option<Rc<dyn CacheItem>> {
        self.index.borrow().get(&id).cloned()
    }

    fn item_by_position(&self, cache: &SpaceCache, point: Point) -> Option<Rc<dyn CacheItem>> {
        if !cache.window().contains(point) {
            return None;
        }
        let space_point = cache.window_to_space(point);
        let (row, column) = self.space.cell_at(space_point)?;
        let item = self.item(self.space.cell_id(row, column))?;
        item.rect().contains(point).then_some(item)
    }
}

/// Wire a [`SpaceCache`] over a grid space.
pub fn grid_cache<S>(space: Rc<S>, mask: ViewApplicationMask) -> Rc<SpaceCache>
where
    S: GridLayout + 'static,
{
    let storage = GridCacheStorage::new(Rc::clone(&space));
    SpaceCache::with_storage(space, mask, Box::new(storage))
}

#![forbid(unsafe_code)]

//! Row-based storage: items stacked along one axis, each spanning the
//! space horizontally (lists, logs, tables without column virtualization).

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

/// Layout queries a row-oriented space answers for its cache.
///
/// All coordinates are space coordinates; spans are half-open.
pub trait RowsLayout: Space {
    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Rows whose vertical extent intersects `top..bottom`.
    fn visible_rows(&self, top: i32, bottom: i32) -> Range<usize>;

    /// Identifier of `row`.
    fn row_id(&self, row: usize) -> ItemId;

    /// Bounds of `row`.
    fn row_rect(&self, row: usize) -> Rect;

    /// Row covering vertical coordinate `y`, if any.
    fn row_at(&self, y: i32) -> Option<usize>;
}

/// Cached-item storage for row layouts.
///
/// Keeps the visible rows top-to-bottom plus an id-keyed index. Validation
/// reuses surviving items by id, translating their window rectangles by the
/// accumulated scroll delta, and creates/discards only the rows that
/// entered/left the window.
pub struct RowsCacheStorage<S> {
    space: Rc<S>,
    ordered: RefCell<Vec<Rc<dyn CacheItem>>>,
    index: RefCell<HashMap<ItemId, Rc<dyn CacheItem>>>,
}

impl<S: RowsLayout> RowsCacheStorage<S> {
    pub fn new(space: Rc<S>) -> Self {
        Self {
            space,
            ordered: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }
}

impl<S: RowsLayout> CacheStorage for RowsCacheStorage<S> {
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
        let top = cache.window_to_space(window.top_left()).y;
        let rows = self.space.visible_rows(top, top + window.size().height);
        let origin = cache.origin_position();

        let mut index = self.index.borrow_mut();
        let mut ordered = self.ordered.borrow_mut();
        ordered.clear();

        let mut kept = HashMap::with_capacity(rows.len());
        for row in rows {
            let id = self.space.row_id(row);
            let item = match index.remove(&id) {
                Some(item) => {
                    item.set_rect(item.rect().translated(delta));
                    item
                }
                None => {
                    let item = cache.create_item(id);
                    item.set_rect(self.space.row_rect(row).translated(origin));
                    item
                }
            };
            kept.insert(id, Rc::clone(&item));
            ordered.push(item);
        }
        // Rows that left the window drop with the old index.
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
        let row = self.space.row_at(space_point.y)?;
        let item = self.item(self.space.row_id(row))?;
        item.rect().contains(point).then_some(item)
    }
}

/// Wire a [`SpaceCache`] over a row-oriented space.
pub fn rows_cache<S>(space: Rc<S>, mask: ViewApplicationMask) -> Rc<SpaceCache>
where
    S: RowsLayout + 'static,
{
    let storage = RowsCacheStorage::new(Rc::clone(&space));
    SpaceCache::with_storage(space, mask, Box::new(storage))
}

#![forbid(unsafe_code)]

//! Instrumented stubs for exercising the cache: a uniform grid space, a
//! factory/item pair that records every call into a shared log, and a
//! recording draw surface.
//!
//! Compiled for this crate's own tests and, behind the `test-helpers`
//! feature, for downstream integration tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::rc::Rc;

use spacecache_core::change::{ChangeReason, ViewApplicationMask};
use spacecache_core::geometry::{Point, Rect, Size};
use spacecache_core::notify::{Listeners, SubscriberId};

use crate::cache::SpaceCache;
use crate::item::{
    CacheItem, CacheItemFactory, Controller, ControllerContext, ControllerList, DrawSurface,
    GuiContext, TooltipInfo, ViewNode,
};
use crate::space::{ItemId, Space};
use crate::storage::{GridLayout, RowsLayout};

/// Shared, ordered call log.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// Snapshot of all entries in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Drain all entries.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of entries starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

/// Pack a row/column pair into an [`ItemId`].
pub const fn cell_id(row: usize, column: usize) -> ItemId {
    ItemId(((row as u64) << 32) | column as u64)
}

/// Render an id packed by [`cell_id`] as `r<row>c<column>`.
pub fn fmt_id(id: ItemId) -> String {
    format!("r{}c{}", id.0 >> 32, id.0 & 0xffff_ffff)
}

/// Uniform-cell space: `rows` x `columns` cells of `cell_size` each,
/// origin at (0, 0). Implements both layout families, so the same stub
/// drives row caches (one item per row) and grid caches (one per cell).
pub struct TestSpace {
    rows: Cell<usize>,
    columns: Cell<usize>,
    cell_size: Size,
    listeners: Listeners<dyn Fn(ChangeReason)>,
    log: EventLog,
    factories_created: Cell<usize>,
    last_factory_mask: Cell<Option<ViewApplicationMask>>,
}

impl TestSpace {
    pub fn new(rows: usize, columns: usize, cell_size: Size, log: EventLog) -> Rc<Self> {
        Rc::new(Self {
            rows: Cell::new(rows),
            columns: Cell::new(columns),
            cell_size,
            listeners: Listeners::new(),
            log,
            factories_created: Cell::new(0),
            last_factory_mask: Cell::new(None),
        })
    }

    /// Deliver a change notification to all subscribers.
    pub fn emit(&self, reason: ChangeReason) {
        for listener in self.listeners.snapshot() {
            listener(reason);
        }
    }

    /// Change dimensions and announce a structural change.
    pub fn resize(&self, rows: usize, columns: usize) {
        self.rows.set(rows);
        self.columns.set(columns);
        self.emit(ChangeReason::SPACE_STRUCTURE);
    }

    /// Factories handed out so far.
    pub fn factories_created(&self) -> usize {
        self.factories_created.get()
    }

    /// Mask the most recent factory was requested for.
    pub fn last_factory_mask(&self) -> Option<ViewApplicationMask> {
        self.last_factory_mask.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn span_range(&self, start: i32, end: i32, step: i32, count: usize) -> Range<usize> {
        if end <= start || step <= 0 || count == 0 {
            return 0..0;
        }
        let extent = count as i32 * step;
        let start = start.max(0);
        let end = end.min(extent);
        if end <= start {
            return 0..0;
        }
        let first = (start / step) as usize;
        let last = ((end + step - 1) / step) as usize;
        first..last.min(count)
    }
}

impl Space for TestSpace {
    fn subscribe(&self, listener: Rc<dyn Fn(ChangeReason)>) -> SubscriberId {
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.listeners.unsubscribe(id);
    }

    fn create_item_factory(&self, mask: ViewApplicationMask) -> Box<dyn CacheItemFactory> {
        self.factories_created.set(self.factories_created.get() + 1);
        self.last_factory_mask.set(Some(mask));
        Box::new(TestFactory {
            mask,
            log: self.log.clone(),
        })
    }
}

impl RowsLayout for TestSpace {
    fn row_count(&self) -> usize {
        self.rows.get()
    }

    fn visible_rows(&self, top: i32, bottom: i32) -> Range<usize> {
        self.span_range(top, bottom, self.cell_size.height, self.rows.get())
    }

    fn row_id(&self, row: usize) -> ItemId {
        cell_id(row, 0)
    }

    fn row_rect(&self, row: usize) -> Rect {
        Rect::new(
            0,
            row as i32 * self.cell_size.height,
            self.columns.get() as i32 * self.cell_size.width,
            self.cell_size.height,
        )
    }

    fn row_at(&self, y: i32) -> Option<usize> {
        if y < 0 || self.cell_size.height <= 0 {
            return None;
        }
        let row = (y / self.cell_size.height) as usize;
        (row < self.rows.get()).then_some(row)
    }
}

impl GridLayout for TestSpace {
    fn row_count(&self) -> usize {
        self.rows.get()
    }

    fn column_count(&self) -> usize {
        self.columns.get()
    }

    fn visible_rows(&self, top: i32, bottom: i32) -> Range<usize> {
        self.span_range(top, bottom, self.cell_size.height, self.rows.get())
    }

    fn visible_columns(&self, left: i32, right: i32) -> Range<usize> {
        self.span_range(left, right, self.cell_size.width, self.columns.get())
    }

    fn cell_id(&self, row: usize, column: usize) -> ItemId {
        cell_id(row, column)
    }

    fn cell_rect(&self, row: usize, column: usize) -> Rect {
        Rect::new(
            column as i32 * self.cell_size.width,
            row as i32 * self.cell_size.height,
            self.cell_size.width,
            self.cell_size.height,
        )
    }

    fn cell_at(&self, point: Point) -> Option<(usize, usize)> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let row = (point.y / self.cell_size.height) as usize;
        let column = (point.x / self.cell_size.width) as usize;
        (row < self.rows.get() && column < self.columns.get()).then_some((row, column))
    }
}

/// Factory producing [`TestItem`]s; logs creations and schema updates.
pub struct TestFactory {
    mask: ViewApplicationMask,
    log: EventLog,
}

impl CacheItemFactory for TestFactory {
    fn mask(&self) -> ViewApplicationMask {
        self.mask
    }

    fn create(&self, id: ItemId) -> Rc<dyn CacheItem> {
        self.log.push(format!("create:{}", fmt_id(id)));
        Rc::new(TestItem {
            id,
            rect: Cell::new(Rect::default()),
            schema_mask: Cell::new(self.mask),
            view: RefCell::new(None),
            log: self.log.clone(),
        })
    }

    fn update_schema(&self, item: &dyn CacheItem) {
        self.log.push(format!("schema:{}", fmt_id(item.id())));
        if let Some(item) = item.as_any().downcast_ref::<TestItem>() {
            item.schema_mask.set(self.mask);
        }
    }
}

/// Cached item recording every lifecycle call.
pub struct TestItem {
    id: ItemId,
    rect: Cell<Rect>,
    schema_mask: Cell<ViewApplicationMask>,
    view: RefCell<Option<Rc<TestView>>>,
    log: EventLog,
}

impl TestItem {
    /// Mask the item's schema currently reflects.
    pub fn schema_mask(&self) -> ViewApplicationMask {
        self.schema_mask.get()
    }

    /// Whether a view tree is currently built.
    pub fn has_view(&self) -> bool {
        self.view.borrow().is_some()
    }
}

impl CacheItem for TestItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn rect(&self) -> Rect {
        self.rect.get()
    }

    fn set_rect(&self, rect: Rect) {
        self.rect.set(rect);
    }

    fn root_view(&self) -> Option<Rc<dyn ViewNode>> {
        self.view
            .borrow()
            .clone()
            .map(|view| view as Rc<dyn ViewNode>)
    }

    fn validate_view(&self, _ctx: &GuiContext, _window: Rect) {
        self.log.push(format!("validate:{}", fmt_id(self.id)));
        let mut view = self.view.borrow_mut();
        if view.is_none() {
            // Root plus two leaves, so view iteration has a tree to walk.
            *view = Some(Rc::new(TestView {
                tag: 0,
                children: vec![
                    Rc::new(TestView::leaf(1)),
                    Rc::new(TestView::leaf(2)),
                ],
            }));
        }
    }

    fn draw(&self, _surface: &mut dyn DrawSurface, _ctx: &GuiContext, _window: Rect) {
        self.log.push(format!("draw:{}", fmt_id(self.id)));
    }

    fn try_activate_controllers(
        &self,
        _ctx: &ControllerContext,
        _cache: &SpaceCache,
        _window: Rect,
        controllers: &mut ControllerList,
    ) {
        self.log.push(format!("controllers:{}", fmt_id(self.id)));
        controllers.push(Rc::new(TestController { item: self.id }));
    }

    fn tooltip_at(&self, point: Point, info: &mut TooltipInfo) -> bool {
        if !self.rect.get().contains(point) {
            return false;
        }
        info.rect = self.rect.get();
        info.text = format!("tooltip {}", fmt_id(self.id));
        true
    }

    fn invalidate_view(&self) {
        self.log.push(format!("invalidate-view:{}", fmt_id(self.id)));
        *self.view.borrow_mut() = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// View-tree node; visits itself, then its children, depth-first.
pub struct TestView {
    pub tag: u32,
    pub children: Vec<Rc<TestView>>,
}

impl TestView {
    pub fn leaf(tag: u32) -> Self {
        Self {
            tag,
            children: Vec::new(),
        }
    }
}

impl ViewNode for TestView {
    fn for_each_view(&self, visitor: &mut dyn FnMut(&dyn ViewNode) -> bool) -> bool {
        if !visitor(self) {
            return false;
        }
        for child in &self.children {
            if !child.for_each_view(visitor) {
                return false;
            }
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Controller stub carrying the item it came from.
pub struct TestController {
    pub item: ItemId,
}

impl Controller for TestController {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Draw surface logging its clip-state operations into the shared log, so
/// tests can see them interleaved with item validate/draw calls.
pub struct RecordingSurface {
    log: EventLog,
}

impl RecordingSurface {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl DrawSurface for RecordingSurface {
    fn save(&mut self) {
        self.log.push("surface:save");
    }

    fn restore(&mut self) {
        self.log.push("surface:restore");
    }

    fn set_clip(&mut self, rect: Rect) {
        self.log.push(format!(
            "surface:clip:{},{},{}x{}",
            rect.x, rect.y, rect.width, rect.height
        ));
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A [`GuiContext`] with an empty host, sufficient for stub items.
pub fn gui_context() -> GuiContext {
    GuiContext::new(Rc::new(()))
}

/// A [`ControllerContext`] at `point` with an empty host.
pub fn controller_context(point: Point) -> ControllerContext {
    ControllerContext::new(point, Rc::new(()))
}

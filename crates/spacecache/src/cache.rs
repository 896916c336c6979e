#![forbid(unsafe_code)]

//! The windowed cache manager.
//!
//! [`SpaceCache`] holds the visible window onto a space, decides which
//! logical items are currently visible, lazily (re)builds their cached
//! representations when something relevant changed, and orchestrates the
//! draw, hit-test, and controller-dispatch passes over the cached set.
//!
//! # Interior mutability
//!
//! The query surface is logically const: reads may adjust internal
//! bookkeeping (validity flag, accumulated deltas) on first use after an
//! invalidation, and the space subscription mutates the cache through a
//! shared handle. All state is therefore held in `Cell`/`RefCell` and the
//! entire public surface takes `&self`. The type is single-threaded by
//! construction (`Rc`, no `Send`/`Sync`); a multi-threaded host must
//! confine it to one owning context.
//!
//! # Reentrancy
//!
//! Draw, controller-dispatch, and tooltip lookups set an in-use flag for
//! their duration. Mutating the cache from a callback running under that
//! flag is a programming error: it trips a `debug_assert!`, and reentrant
//! storage mutation additionally fails fast on `RefCell` borrow panics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spacecache_core::change::{ChangeReason, ViewApplicationMask};
use spacecache_core::geometry::{Point, Rect, Size};
use spacecache_core::notify::{Listeners, SubscriberId};

use crate::item::{
    CacheItem, CacheItemFactory, ControllerContext, ControllerList, DrawSurface, GuiContext,
    TooltipInfo, ViewNode,
};
use crate::space::{ItemId, Space};
use crate::storage::CacheStorage;

/// Injectable replacement for the default draw pipeline.
///
/// Animation layers interpose this way: the proxy receives the cache itself
/// and decides how (and whether) to run the regular passes.
pub type DrawProxy = Rc<dyn Fn(&SpaceCache, &mut dyn DrawSurface, &GuiContext)>;

/// Cursor record handed to [`SpaceCache::for_each_view`] visitors.
pub struct ViewVisit<'a> {
    /// Item owning the visited view.
    pub item: &'a Rc<dyn CacheItem>,
    /// Index of the item in enumeration order; increments once per item
    /// whether or not its view traversal was stopped early.
    pub item_index: usize,
    /// The visited view node.
    pub view: &'a dyn ViewNode,
    /// Index of the view within the item's traversal; resets to zero for
    /// each item and increments after every visit.
    pub view_index: usize,
}

/// Scoped in-use marker; restores the previous flag value on every exit
/// path, including panics.
pub(crate) struct InUseGuard<'a> {
    flag: &'a Cell<bool>,
    prev: bool,
}

impl<'a> InUseGuard<'a> {
    pub(crate) fn acquire(flag: &'a Cell<bool>) -> Self {
        Self {
            flag,
            prev: flag.replace(true),
        }
    }
}

impl Drop for InUseGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

/// Windowed cache of item representations over a [`Space`].
///
/// Constructed behind `Rc` by the strategy wiring functions
/// ([`crate::storage::rows_cache`], [`crate::storage::grid_cache`]); the
/// constructor is crate-internal so every cache is born with a storage
/// strategy attached.
pub struct SpaceCache {
    space: Rc<dyn Space>,
    mask: Cell<ViewApplicationMask>,
    factory: RefCell<Box<dyn CacheItemFactory>>,

    // Visible frame and the offset into the space.
    window: Cell<Rect>,
    scroll_offset: Cell<Point>,

    // Unconsumed deltas since the last completed validation.
    scroll_delta: Cell<Point>,
    size_delta: Cell<Size>,

    cache_invalid: Cell<bool>,
    in_use: Cell<bool>,

    storage: Box<dyn CacheStorage>,

    cache_changed: Listeners<dyn Fn(&SpaceCache, ChangeReason)>,
    pre_draw: Listeners<dyn Fn(&SpaceCache)>,
    draw_proxy: RefCell<Option<DrawProxy>>,

    space_subscription: Cell<Option<SubscriberId>>,
}

impl SpaceCache {
    /// Wire a cache to its storage strategy. Exposed only to the strategy
    /// modules; hosts go through `rows_cache`/`grid_cache`.
    pub(crate) fn with_storage(
        space: Rc<dyn Space>,
        mask: ViewApplicationMask,
        storage: Box<dyn CacheStorage>,
    ) -> Rc<Self> {
        let factory = space.create_item_factory(mask);
        let cache = Rc::new(Self {
            space,
            mask: Cell::new(mask),
            factory: RefCell::new(factory),
            window: Cell::new(Rect::default()),
            scroll_offset: Cell::new(Point::ZERO),
            scroll_delta: Cell::new(Point::ZERO),
            size_delta: Cell::new(Size::ZERO),
            cache_invalid: Cell::new(true),
            in_use: Cell::new(false),
            storage,
            cache_changed: Listeners::new(),
            pre_draw: Listeners::new(),
            draw_proxy: RefCell::new(None),
            space_subscription: Cell::new(None),
        });

        let weak = Rc::downgrade(&cache);
        let id = cache.space.subscribe(Rc::new(move |reason| {
            if let Some(cache) = weak.upgrade() {
                cache.on_space_changed(reason);
            }
        }));
        cache.space_subscription.set(Some(id));
        cache
    }

    /// The observed space.
    pub fn space(&self) -> &Rc<dyn Space> {
        &self.space
    }

    /// Current view-application selection.
    pub fn view_application_mask(&self) -> ViewApplicationMask {
        self.mask.get()
    }

    /// Replace the view-application selection.
    ///
    /// No-op when unchanged; otherwise rebuilds the factory for the new
    /// mask, re-runs its schema update over every cached item, and emits a
    /// cache-changed notification.
    pub fn set_view_application_mask(&self, mask: ViewApplicationMask) {
        if self.mask.get() == mask {
            return;
        }
        self.mask.set(mask);
        self.rebuild_factory();
        self.emit_cache_changed(ChangeReason::CACHE_CONTENT);
    }

    /// Visible rectangle, in window coordinates. Always normalized.
    pub fn window(&self) -> Rect {
        self.window.get()
    }

    /// Replace the visible rectangle.
    ///
    /// No-op when the normalized rectangle equals the current window.
    /// Otherwise accumulates the top-left and size deltas and invalidates
    /// the item cache (storage is kept; validation reconciles it).
    pub fn set_window(&self, window: Rect) {
        let window = window.normalized();
        let old = self.window.get();
        if old == window {
            return;
        }

        self.scroll_delta
            .set(self.scroll_delta.get() + (window.top_left() - old.top_left()));
        self.size_delta
            .set(self.size_delta.get() + (window.size() - old.size()));
        self.window.set(window);

        self.invalidate_items();
    }

    /// Offset mapping between window and space coordinates.
    pub fn scroll_offset(&self) -> Point {
        self.scroll_offset.get()
    }

    /// Replace the scroll offset. No-op when unchanged.
    pub fn set_scroll_offset(&self, offset: Point) {
        let old = self.scroll_offset.get();
        if old == offset {
            return;
        }

        self.scroll_delta.set(self.scroll_delta.get() + (old - offset));
        self.scroll_offset.set(offset);

        self.invalidate_items();
    }

    /// Apply window then scroll offset, sequentially.
    ///
    /// Not an atomic joint update: each step independently checks its own
    /// no-op condition and accumulates its own delta against the state the
    /// previous step left behind.
    pub fn set(&self, window: Rect, offset: Point) {
        self.set_window(window);
        self.set_scroll_offset(offset);
    }

    /// Position of the space origin in window coordinates.
    pub fn origin_position(&self) -> Point {
        self.window.get().top_left() - self.scroll_offset.get()
    }

    /// Map a window-coordinate point into space coordinates.
    pub fn window_to_space(&self, p: Point) -> Point {
        p - self.window.get().top_left() + self.scroll_offset.get()
    }

    /// Map a space-coordinate point into window coordinates.
    pub fn space_to_window(&self, p: Point) -> Point {
        p - self.scroll_offset.get() + self.window.get().top_left()
    }

    /// Accumulated window/offset movement since the last completed
    /// validation. Strategy-facing: a kept item's window rectangle moves by
    /// exactly this much.
    pub fn scroll_delta(&self) -> Point {
        self.scroll_delta.get()
    }

    /// Accumulated window resize since the last completed validation.
    pub fn size_delta(&self) -> Size {
        self.size_delta.get()
    }

    /// Drop all cached items and invalidate.
    pub fn clear(&self) {
        debug_assert!(!self.in_use.get(), "cache cleared during a read pass");
        self.storage.clear();
        self.invalidate_items();
    }

    /// Bring the cached item set up to date. No-op when already valid.
    ///
    /// Every read operation calls this first; the deltas and the validity
    /// flag reset together once the storage strategy returns.
    pub fn validate(&self) {
        if !self.cache_invalid.get() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            window = ?self.window.get(),
            scroll_delta = ?self.scroll_delta.get(),
            size_delta = ?self.size_delta.get(),
            "validating items cache"
        );

        self.storage.validate(self);

        self.cache_invalid.set(false);
        self.scroll_delta.set(Point::ZERO);
        self.size_delta.set(Size::ZERO);
    }

    /// Create a cached item through the current factory. Strategy-facing.
    pub fn create_item(&self, id: ItemId) -> Rc<dyn CacheItem> {
        self.factory.borrow().create(id)
    }

    /// Cached item for `id`, if it is currently visible.
    pub fn item(&self, id: ItemId) -> Option<Rc<dyn CacheItem>> {
        self.validate();
        self.storage.item(id)
    }

    /// Cached item covering a window-coordinate point.
    pub fn item_at(&self, point: Point) -> Option<Rc<dyn CacheItem>> {
        self.validate();
        self.storage.item_by_position(self, point)
    }

    /// Visit every cached item in strategy order.
    ///
    /// The visitor returns `false` to stop; the return value is `false`
    /// iff enumeration was stopped early.
    pub fn for_each_item(&self, visitor: &mut dyn FnMut(&Rc<dyn CacheItem>) -> bool) -> bool {
        self.validate();
        self.storage.for_each_item(visitor)
    }

    /// Visit every view of every cached item, with cursor bookkeeping as
    /// documented on [`ViewVisit`]. Stops as soon as the visitor does.
    pub fn for_each_view(&self, visitor: &mut dyn FnMut(&ViewVisit<'_>) -> bool) -> bool {
        let mut item_index = 0usize;
        self.for_each_item(&mut |item| {
            let mut proceed = true;
            if let Some(root) = item.root_view() {
                let mut view_index = 0usize;
                proceed = root.for_each_view(&mut |view| {
                    let keep_going = visitor(&ViewVisit {
                        item,
                        item_index,
                        view,
                        view_index,
                    });
                    view_index += 1;
                    keep_going
                });
            }
            item_index += 1;
            proceed
        })
    }

    /// Draw all cached items.
    ///
    /// Two strict passes: first every item validates its view tree (which
    /// may construct or re-layout, but never paints), then every item
    /// paints with the surface clipped to the window. The passes never
    /// interleave. The pre-draw notification fires between them.
    pub fn draw(&self, surface: &mut dyn DrawSurface, ctx: &GuiContext) {
        self.validate();

        let _in_use = InUseGuard::acquire(&self.in_use);
        let window = self.window.get();

        self.storage.for_each_item(&mut |item| {
            item.validate_view(ctx, window);
            true
        });

        for listener in self.pre_draw.snapshot() {
            listener(self);
        }

        surface.save();
        surface.set_clip(window);

        self.storage.for_each_item(&mut |item| {
            item.draw(surface, ctx, window);
            true
        });

        surface.restore();
    }

    /// Draw through the registered proxy, or fall back to [`Self::draw`].
    pub fn draw_raw(&self, surface: &mut dyn DrawSurface, ctx: &GuiContext) {
        let proxy = self.draw_proxy.borrow().clone();
        match proxy {
            Some(proxy) => proxy(self, surface, ctx),
            None => self.draw(surface, ctx),
        }
    }

    /// Whether a draw proxy is registered.
    pub fn has_draw_proxy(&self) -> bool {
        self.draw_proxy.borrow().is_some()
    }

    /// Install or remove the draw proxy.
    pub fn set_draw_proxy(&self, proxy: Option<DrawProxy>) {
        *self.draw_proxy.borrow_mut() = proxy;
    }

    /// Collect the controllers applicable at `ctx.point`.
    ///
    /// Leaves `controllers` untouched when no cached item covers the point.
    pub fn try_activate_controllers(
        &self,
        ctx: &ControllerContext,
        controllers: &mut ControllerList,
    ) {
        self.validate();

        let _in_use = InUseGuard::acquire(&self.in_use);

        let Some(item) = self.storage.item_by_position(self, ctx.point) else {
            return;
        };
        item.try_activate_controllers(ctx, self, self.window.get(), controllers);
    }

    /// Look up tooltip content at a window-coordinate point.
    pub fn tooltip_at(&self, point: Point, info: &mut TooltipInfo) -> bool {
        self.validate();

        let _in_use = InUseGuard::acquire(&self.in_use);

        match self.storage.item_by_position(self, point) {
            Some(item) => item.tooltip_at(point, info),
            None => false,
        }
    }

    /// Register a cache-changed listener.
    pub fn on_cache_changed(
        &self,
        listener: Rc<dyn Fn(&SpaceCache, ChangeReason)>,
    ) -> SubscriberId {
        self.cache_changed.subscribe(listener)
    }

    /// Remove a cache-changed listener.
    pub fn unsubscribe_cache_changed(&self, id: SubscriberId) -> bool {
        self.cache_changed.unsubscribe(id)
    }

    /// Register a pre-draw listener; fires each draw cycle between the
    /// validation pass and the paint pass.
    pub fn on_pre_draw(&self, listener: Rc<dyn Fn(&SpaceCache)>) -> SubscriberId {
        self.pre_draw.subscribe(listener)
    }

    /// Remove a pre-draw listener.
    pub fn unsubscribe_pre_draw(&self, id: SubscriberId) -> bool {
        self.pre_draw.unsubscribe(id)
    }

    fn invalidate_items(&self) {
        debug_assert!(!self.in_use.get(), "cache invalidated during a read pass");
        self.cache_invalid.set(true);
        self.emit_cache_changed(ChangeReason::CACHE_CONTENT);
    }

    fn emit_cache_changed(&self, reason: ChangeReason) {
        for listener in self.cache_changed.snapshot() {
            listener(self, reason);
        }
    }

    fn on_space_changed(&self, reason: ChangeReason) {
        if reason.intersects(ChangeReason::SPACE_STRUCTURE) {
            // The item set itself is stale.
            self.clear();
        } else if reason
            .intersects(ChangeReason::SPACE_HINT | ChangeReason::SPACE_ITEMS_STRUCTURE)
        {
            self.rebuild_factory();
            self.emit_cache_changed(reason | ChangeReason::CACHE_CONTENT);
        } else if reason.intersects(ChangeReason::SPACE_ITEMS_CONTENT) {
            // Item set and schemas are intact; forward.
            self.emit_cache_changed(reason | ChangeReason::CACHE_CONTENT);
        }
    }

    /// Replace the factory for the current mask and re-run its schema
    /// update over every currently cached item. Goes straight to the
    /// storage strategy: cascade paths must not trigger validation.
    fn rebuild_factory(&self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(mask = ?self.mask.get(), "rebuilding item factory");

        *self.factory.borrow_mut() = self.space.create_item_factory(self.mask.get());

        let factory = self.factory.borrow();
        self.storage.for_each_item(&mut |item| {
            item.invalidate_view();
            factory.update_schema(item.as_ref());
            true
        });
    }
}

impl Drop for SpaceCache {
    fn drop(&mut self) {
        if let Some(id) = self.space_subscription.take() {
            self.space.unsubscribe(id);
        }
    }
}

#![forbid(unsafe_code)]

//! Item-side interfaces: cached items, their factories, view trees, and the
//! host handles threaded through validation, drawing, and hit testing.
//!
//! The cache orchestrates these objects but never looks inside them. Hosts
//! implement the traits; the opaque context types carry whatever the host's
//! items need to reach their toolkit (`GuiContext` plays the role a widget
//! handle plays in a retained-mode toolkit).

use std::any::Any;
use std::rc::Rc;

use smallvec::SmallVec;

use spacecache_core::change::ViewApplicationMask;
use spacecache_core::geometry::{Point, Rect};

use crate::cache::SpaceCache;
use crate::space::ItemId;

/// Host environment handle passed through validate and draw passes.
///
/// The cache never inspects the payload; items downcast it to the host's
/// concrete environment type.
#[derive(Clone)]
pub struct GuiContext {
    host: Rc<dyn Any>,
}

impl GuiContext {
    /// Wrap a host environment.
    pub fn new(host: Rc<dyn Any>) -> Self {
        Self { host }
    }

    /// Downcast the host environment.
    pub fn host<T: 'static>(&self) -> Option<&T> {
        self.host.downcast_ref()
    }
}

/// Hit context for controller activation.
#[derive(Clone)]
pub struct ControllerContext {
    /// Hit point in window coordinates.
    pub point: Point,
    host: Rc<dyn Any>,
}

impl ControllerContext {
    /// Create a hit context at `point`.
    pub fn new(point: Point, host: Rc<dyn Any>) -> Self {
        Self { point, host }
    }

    /// Downcast the host environment.
    pub fn host<T: 'static>(&self) -> Option<&T> {
        self.host.downcast_ref()
    }
}

/// Tooltip lookup result, filled in by the item that covers the point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TooltipInfo {
    /// Region the tooltip applies to, in window coordinates.
    pub rect: Rect,
    /// Tooltip text.
    pub text: String,
}

/// An interactive controller an item offers at a hit point.
///
/// Activation and event handling are host concerns; the cache only collects
/// applicable controllers during dispatch.
pub trait Controller {
    /// Downcast hook for the host's dispatcher.
    fn as_any(&self) -> &dyn Any;
}

/// Controllers collected by one dispatch pass. Dispatch typically yields
/// zero or a few entries, so the list is inline-allocated.
pub type ControllerList = SmallVec<[Rc<dyn Controller>; 4]>;

/// One node of an item's visual representation tree.
pub trait ViewNode {
    /// Visit this node and its subtree in the node's own order.
    ///
    /// The visitor returns `false` to stop the traversal; the return value
    /// is `false` iff the traversal was stopped early.
    fn for_each_view(&self, visitor: &mut dyn FnMut(&dyn ViewNode) -> bool) -> bool;

    /// Downcast hook for visitors that know the host's view types.
    fn as_any(&self) -> &dyn Any;
}

/// Paint-surface operations the cache itself performs.
///
/// Only clip-state management lives here; items downcast to the host's
/// concrete surface for actual painting.
pub trait DrawSurface {
    /// Push the current surface state.
    fn save(&mut self);

    /// Pop to the most recently saved state.
    fn restore(&mut self);

    /// Clip subsequent painting to `rect` (window coordinates).
    fn set_clip(&mut self, rect: Rect);

    /// Downcast hook for items that paint.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Cached, drawable representation of one logical item.
///
/// Items are shared-ownership: iteration callbacks may retain them past the
/// call that produced them (e.g. for animation). State mutated through
/// `&self` (the view tree, the rectangle) is interior-mutable in
/// implementations.
pub trait CacheItem {
    /// Identifier of the underlying logical item.
    fn id(&self) -> ItemId;

    /// Current bounds in window coordinates.
    ///
    /// Kept up to date by the storage strategy that owns the item.
    fn rect(&self) -> Rect;

    /// Reposition the item. Called by storage strategies during validation,
    /// including incremental translation on scroll.
    fn set_rect(&self, rect: Rect);

    /// Root of the view tree, if one has been built.
    fn root_view(&self) -> Option<Rc<dyn ViewNode>>;

    /// Bring the view tree up to date for the given context and window.
    /// May lazily construct or re-layout views; must not paint.
    fn validate_view(&self, ctx: &GuiContext, window: Rect);

    /// Paint the item. The surface is already clipped to the window.
    fn draw(&self, surface: &mut dyn DrawSurface, ctx: &GuiContext, window: Rect);

    /// Append the controllers applicable at `ctx.point` to `controllers`.
    fn try_activate_controllers(
        &self,
        ctx: &ControllerContext,
        cache: &SpaceCache,
        window: Rect,
        controllers: &mut ControllerList,
    );

    /// Look up tooltip content at `point` (window coordinates).
    /// Returns `false` when the item offers none there.
    fn tooltip_at(&self, point: Point, info: &mut TooltipInfo) -> bool;

    /// Drop the view tree; it is rebuilt on the next validate pass.
    fn invalidate_view(&self);

    /// Downcast hook, used by factories in schema updates.
    fn as_any(&self) -> &dyn Any;
}

/// Creates cached items for a space under one view-application selection.
///
/// Exclusively owned by the cache and replaced wholesale (never mutated)
/// when the selection changes.
pub trait CacheItemFactory {
    /// The view-application selection this factory was built for.
    fn mask(&self) -> ViewApplicationMask;

    /// Create the cached item for `id`.
    fn create(&self, id: ItemId) -> Rc<dyn CacheItem>;

    /// Rewrite an existing item's internal schema to match this factory's
    /// configuration.
    fn update_schema(&self, item: &dyn CacheItem);
}

#![forbid(unsafe_code)]

//! Change-reason and view-application bitmasks.

use bitflags::bitflags;

bitflags! {
    /// Cause of a change notification; drives the cache's cascade policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeReason: u8 {
        /// The space itself was restructured (items added, removed, moved).
        const SPACE_STRUCTURE       = 0b0000_0001;
        /// A space-wide presentation hint changed.
        const SPACE_HINT            = 0b0000_0010;
        /// The per-item view schema changed.
        const SPACE_ITEMS_STRUCTURE = 0b0000_0100;
        /// Item content changed; the item set itself is intact.
        const SPACE_ITEMS_CONTENT   = 0b0000_1000;
        /// The cached representation changed.
        const CACHE_CONTENT         = 0b0001_0000;
    }
}

bitflags! {
    /// Selects which categories of view behavior an item factory produces.
    ///
    /// Part of cache identity: changing the mask replaces the factory and
    /// re-runs schema updates over all cached items.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewApplicationMask: u8 {
        /// Drawable views.
        const DRAW        = 0b0000_0001;
        /// Tooltip lookup.
        const TOOLTIPS    = 0b0000_0010;
        /// Interactive controllers.
        const CONTROLLERS = 0b0000_0100;
        /// Copy/export rendition.
        const COPY        = 0b0000_1000;
    }
}

impl Default for ViewApplicationMask {
    fn default() -> Self {
        Self::DRAW
    }
}

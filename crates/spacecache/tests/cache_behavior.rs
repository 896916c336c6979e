//! Behavioral tests for the windowed cache: coordinate mapping, lazy
//! validation, delta accumulation, draw orchestration, hit testing, and
//! change propagation, driven through the instrumented stubs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spacecache::testing::{
    EventLog, RecordingSurface, TestController, TestItem, TestSpace, TestView, cell_id,
    controller_context, fmt_id, gui_context,
};
use spacecache::{
    ChangeReason, ControllerList, Point, Rect, Size, SpaceCache, TooltipInfo, ViewApplicationMask,
    grid_cache, rows_cache,
};

/// 10x10 grid of 20x20 cells with a 100x100 window at the origin.
fn grid_fixture() -> (Rc<TestSpace>, Rc<SpaceCache>, EventLog) {
    let log = EventLog::new();
    let space = TestSpace::new(10, 10, Size::new(20, 20), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 100, 100));
    (space, cache, log)
}

fn change_counter(cache: &SpaceCache) -> Rc<RefCell<Vec<ChangeReason>>> {
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reasons);
    cache.on_cache_changed(Rc::new(move |_cache, reason| {
        sink.borrow_mut().push(reason);
    }));
    reasons
}

// --- Coordinate mapping ---

#[test]
fn coordinate_maps_are_exact_inverses() {
    let (_space, cache, _log) = grid_fixture();
    cache.set(Rect::new(7, -3, 100, 100), Point::new(13, 41));

    for p in [
        Point::ZERO,
        Point::new(50, 50),
        Point::new(-20, 7),
        Point::new(1000, -1000),
    ] {
        assert_eq!(cache.window_to_space(cache.space_to_window(p)), p);
        assert_eq!(cache.space_to_window(cache.window_to_space(p)), p);
    }

    // The space origin lands at origin_position in window coordinates.
    assert_eq!(cache.space_to_window(Point::ZERO), cache.origin_position());
}

// --- Window/scroll mutators ---

#[test]
fn setters_with_current_values_are_silent_no_ops() {
    let (_space, cache, _log) = grid_fixture();
    cache.validate();
    let reasons = change_counter(&cache);

    cache.set_window(Rect::new(0, 0, 100, 100));
    cache.set_scroll_offset(Point::ZERO);
    // An un-normalized spelling of the same window is also a no-op.
    cache.set_window(Rect::new(100, 100, -100, -100));

    assert!(reasons.borrow().is_empty());
    assert_eq!(cache.scroll_delta(), Point::ZERO);
    assert_eq!(cache.size_delta(), Size::ZERO);
}

#[test]
fn window_is_stored_normalized() {
    let (_space, cache, _log) = grid_fixture();
    cache.set_window(Rect::new(60, 80, -60, -80));
    assert_eq!(cache.window(), Rect::new(0, 0, 60, 80));
}

#[test]
fn deltas_compose_additively_and_reset_on_validate() {
    let log = EventLog::new();
    let space = TestSpace::new(10, 10, Size::new(20, 20), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);

    cache.set_window(Rect::new(10, 5, 100, 100));
    cache.set_window(Rect::new(25, 30, 80, 120));

    // Initial window is the empty rect at the origin.
    assert_eq!(cache.scroll_delta(), Point::new(25, 30));
    assert_eq!(cache.size_delta(), Size::new(80, 120));

    cache.validate();
    assert_eq!(cache.scroll_delta(), Point::ZERO);
    assert_eq!(cache.size_delta(), Size::ZERO);
}

#[test]
fn set_applies_window_then_offset_sequentially() {
    let log = EventLog::new();
    let space = TestSpace::new(10, 10, Size::new(20, 20), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);

    cache.set(Rect::new(10, 0, 100, 100), Point::new(0, 50));

    // Window step contributes (10, 0), offset step (0, -50); each step
    // accumulated independently against the state the previous one left.
    assert_eq!(cache.scroll_delta(), Point::new(10, -50));
    assert_eq!(cache.size_delta(), Size::new(100, 100));
}

#[test]
fn scroll_offset_delta_is_old_minus_new() {
    let (_space, cache, _log) = grid_fixture();
    cache.validate();

    cache.set_scroll_offset(Point::new(5, 20));
    assert_eq!(cache.scroll_delta(), Point::new(-5, -20));
}

// --- Lazy validation ---

#[test]
fn reads_trigger_validation_lazily() {
    let (_space, cache, log) = grid_fixture();
    // Nothing has been built yet.
    assert_eq!(log.count_prefix("create:"), 0);

    let item = cache.item_at(Point::new(50, 50));
    assert!(item.is_some());
    assert_eq!(item.unwrap().id(), cell_id(2, 2));
    // 5x5 cells are visible in a 100x100 window of 20px cells.
    assert_eq!(log.count_prefix("create:"), 25);

    // A second read revalidates nothing.
    log.clear();
    assert!(cache.item_at(Point::new(50, 50)).is_some());
    assert_eq!(log.count_prefix("create:"), 0);
}

#[test]
fn three_items_left_to_right_hit_test() {
    let log = EventLog::new();
    let space = TestSpace::new(1, 3, Size::new(40, 100), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set(Rect::new(0, 0, 100, 100), Point::ZERO);

    let item = cache.item_at(Point::new(50, 50)).expect("covered point");
    assert_eq!(item.id(), cell_id(0, 1));

    // clear() drops everything, but the very next read validates afresh
    // and yields an item consistent with current space contents.
    cache.clear();
    let item = cache.item_at(Point::new(50, 50)).expect("revalidated");
    assert_eq!(item.id(), cell_id(0, 1));
}

#[test]
fn empty_space_enumerates_zero_items() {
    let log = EventLog::new();
    let space = TestSpace::new(0, 0, Size::new(20, 20), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 100, 100));

    cache.clear();
    let mut visited = 0;
    assert!(cache.for_each_item(&mut |_item| {
        visited += 1;
        true
    }));
    assert_eq!(visited, 0);
    assert!(cache.item(cell_id(0, 0)).is_none());
    assert!(cache.item_at(Point::new(10, 10)).is_none());
}

// --- Incremental reuse ---

#[test]
fn scrolling_reuses_surviving_items_and_creates_the_delta_set() {
    let (_space, cache, log) = grid_fixture();
    cache.validate();

    let before = cache.item(cell_id(2, 2)).expect("visible");
    assert_eq!(before.rect(), Rect::new(40, 40, 20, 20));

    log.clear();
    // Scroll down one row: rows 1..6 become visible.
    cache.set_scroll_offset(Point::new(0, 20));
    cache.validate();

    let after = cache.item(cell_id(2, 2)).expect("still visible");
    assert!(Rc::ptr_eq(&before, &after), "surviving item must be reused");
    // The window rectangle moved by the accumulated scroll delta.
    assert_eq!(after.rect(), Rect::new(40, 20, 20, 20));

    // Only the row that entered the window was created.
    assert_eq!(log.count_prefix("create:"), 5);
    // The row that left the window is gone.
    assert!(cache.item(cell_id(0, 0)).is_none());
    assert!(cache.item(cell_id(5, 0)).is_some());
}

#[test]
fn canceling_moves_reuses_everything() {
    let (_space, cache, log) = grid_fixture();
    cache.validate();
    log.clear();

    cache.set_scroll_offset(Point::new(0, 20));
    cache.set_scroll_offset(Point::ZERO);
    cache.validate();

    // The deltas canceled out; the visible set never moved.
    assert_eq!(log.count_prefix("create:"), 0);
}

#[test]
fn window_move_translates_kept_items() {
    let (_space, cache, _log) = grid_fixture();
    cache.validate();
    let item = cache.item(cell_id(0, 0)).expect("visible");
    assert_eq!(item.rect(), Rect::new(0, 0, 20, 20));

    cache.set_window(Rect::new(10, 0, 100, 100));
    cache.validate();
    assert_eq!(item.rect(), Rect::new(10, 0, 20, 20));
}

// --- Draw orchestration ---

#[test]
fn draw_validates_every_item_before_painting_any() {
    let (_space, cache, log) = grid_fixture();
    cache.validate();
    log.clear();

    let pre_draw_log = log.clone();
    cache.on_pre_draw(Rc::new(move |_cache| {
        pre_draw_log.push("pre-draw");
    }));

    let mut surface = RecordingSurface::new(log.clone());
    cache.draw(&mut surface, &gui_context());

    let entries = log.entries();
    let first_draw = entries
        .iter()
        .position(|e| e.starts_with("draw:"))
        .expect("paint pass ran");
    let last_validate = entries
        .iter()
        .rposition(|e| e.starts_with("validate:"))
        .expect("validation pass ran");
    assert!(
        last_validate < first_draw,
        "validation pass must complete before any paint"
    );

    assert_eq!(log.count_prefix("validate:"), 25);
    assert_eq!(log.count_prefix("draw:"), 25);

    // Pre-draw fires after the validation pass and before the clip+paint.
    let pre_draw = entries.iter().position(|e| e == "pre-draw").unwrap();
    let save = entries.iter().position(|e| e == "surface:save").unwrap();
    let clip = entries
        .iter()
        .position(|e| e.starts_with("surface:clip"))
        .unwrap();
    let restore = entries.iter().position(|e| e == "surface:restore").unwrap();
    assert!(last_validate < pre_draw);
    assert!(pre_draw < save);
    assert!(save < clip);
    assert!(clip < first_draw);
    assert_eq!(restore, entries.len() - 1);
    assert_eq!(entries[clip], "surface:clip:0,0,100x100");
}

#[test]
fn draw_raw_uses_the_proxy_when_registered() {
    let (_space, cache, log) = grid_fixture();
    cache.validate();
    log.clear();

    assert!(!cache.has_draw_proxy());
    let proxy_log = log.clone();
    cache.set_draw_proxy(Some(Rc::new(move |_cache, _surface, _ctx| {
        proxy_log.push("proxy");
    })));
    assert!(cache.has_draw_proxy());

    let mut surface = RecordingSurface::new(log.clone());
    cache.draw_raw(&mut surface, &gui_context());
    assert_eq!(log.entries(), vec!["proxy"]);

    // Without a proxy the default pipeline runs.
    cache.set_draw_proxy(None);
    log.clear();
    cache.draw_raw(&mut surface, &gui_context());
    assert_eq!(log.count_prefix("draw:"), 25);
}

// --- View iteration ---

#[test]
fn view_iteration_tracks_item_and_view_indices() {
    let log = EventLog::new();
    let space = TestSpace::new(1, 2, Size::new(50, 100), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 100, 100));

    // Build the view trees (each stub item grows a root plus two leaves).
    let mut surface = RecordingSurface::new(log.clone());
    cache.draw(&mut surface, &gui_context());

    let mut visits = Vec::new();
    assert!(cache.for_each_view(&mut |visit| {
        let tag = visit
            .view
            .as_any()
            .downcast_ref::<TestView>()
            .expect("stub view")
            .tag;
        visits.push((visit.item_index, visit.view_index, tag));
        true
    }));
    assert_eq!(
        visits,
        vec![
            (0, 0, 0),
            (0, 1, 1),
            (0, 2, 2),
            (1, 0, 0),
            (1, 1, 1),
            (1, 2, 2),
        ]
    );
}

#[test]
fn view_iteration_stops_when_the_visitor_does() {
    let log = EventLog::new();
    let space = TestSpace::new(1, 2, Size::new(50, 100), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 100, 100));
    let mut surface = RecordingSurface::new(log.clone());
    cache.draw(&mut surface, &gui_context());

    let mut visited = 0;
    let stopped = cache.for_each_view(&mut |_visit| {
        visited += 1;
        visited < 2
    });
    assert!(!stopped);
    assert_eq!(visited, 2);
}

#[test]
fn items_without_views_contribute_no_view_visits() {
    let (_space, cache, _log) = grid_fixture();
    // Items exist but no draw has built their view trees.
    cache.validate();

    let mut visits = 0;
    assert!(cache.for_each_view(&mut |_visit| {
        visits += 1;
        true
    }));
    assert_eq!(visits, 0);
}

// --- Hit testing and dispatch ---

#[test]
fn lookups_outside_coverage_are_normal_negative_outcomes() {
    let log = EventLog::new();
    // 2x2 cells of 20px: content covers 40x40 inside a 100x100 window.
    let space = TestSpace::new(2, 2, Size::new(20, 20), log.clone());
    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 100, 100));

    // Outside the window entirely.
    assert!(cache.item_at(Point::new(-5, -5)).is_none());
    // Inside the window, past the space contents.
    assert!(cache.item_at(Point::new(80, 80)).is_none());

    let mut info = TooltipInfo::default();
    assert!(!cache.tooltip_at(Point::new(80, 80), &mut info));
    assert_eq!(info, TooltipInfo::default());

    let mut controllers = ControllerList::new();
    cache.try_activate_controllers(&controller_context(Point::new(80, 80)), &mut controllers);
    assert!(controllers.is_empty());
}

#[test]
fn tooltip_reports_the_covering_item() {
    let (_space, cache, _log) = grid_fixture();

    let mut info = TooltipInfo::default();
    assert!(cache.tooltip_at(Point::new(50, 50), &mut info));
    assert_eq!(info.text, format!("tooltip {}", fmt_id(cell_id(2, 2))));
    assert_eq!(info.rect, Rect::new(40, 40, 20, 20));
}

#[test]
fn controllers_are_collected_from_the_covering_item() {
    let (_space, cache, log) = grid_fixture();

    let mut controllers = ControllerList::new();
    cache.try_activate_controllers(&controller_context(Point::new(50, 50)), &mut controllers);

    assert_eq!(controllers.len(), 1);
    let controller = controllers[0]
        .as_any()
        .downcast_ref::<TestController>()
        .expect("stub controller");
    assert_eq!(controller.item, cell_id(2, 2));
    assert_eq!(log.count_prefix("controllers:"), 1);
}

// --- Change propagation ---

#[test]
fn space_structure_change_clears_the_cache() {
    let (space, cache, log) = grid_fixture();
    let first = cache.item(cell_id(0, 0)).expect("visible");
    let reasons = change_counter(&cache);
    log.clear();

    space.emit(ChangeReason::SPACE_STRUCTURE);

    assert_eq!(*reasons.borrow(), vec![ChangeReason::CACHE_CONTENT]);
    // The next read rebuilds from scratch.
    let rebuilt = cache.item(cell_id(0, 0)).expect("rebuilt");
    assert!(!Rc::ptr_eq(&first, &rebuilt));
    assert_eq!(log.count_prefix("create:"), 25);
}

#[test]
fn space_hint_change_rebuilds_factory_and_schemas_in_place() {
    let (space, cache, log) = grid_fixture();
    let item = cache.item(cell_id(1, 1)).expect("visible");
    let factories_before = space.factories_created();
    let reasons = change_counter(&cache);
    log.clear();

    space.emit(ChangeReason::SPACE_HINT);

    assert_eq!(space.factories_created(), factories_before + 1);
    assert_eq!(log.count_prefix("invalidate-view:"), 25);
    assert_eq!(log.count_prefix("schema:"), 25);
    assert_eq!(
        *reasons.borrow(),
        vec![ChangeReason::SPACE_HINT | ChangeReason::CACHE_CONTENT]
    );

    // The item set is intact; no invalidation happened.
    let same = cache.item(cell_id(1, 1)).expect("kept");
    assert!(Rc::ptr_eq(&item, &same));
    assert_eq!(log.count_prefix("create:"), 0);
}

#[test]
fn space_items_content_change_is_forwarded_untouched() {
    let (space, cache, log) = grid_fixture();
    cache.validate();
    let factories_before = space.factories_created();
    let reasons = change_counter(&cache);
    log.clear();

    space.emit(ChangeReason::SPACE_ITEMS_CONTENT);

    assert_eq!(
        *reasons.borrow(),
        vec![ChangeReason::SPACE_ITEMS_CONTENT | ChangeReason::CACHE_CONTENT]
    );
    assert_eq!(space.factories_created(), factories_before);
    assert_eq!(log.count_prefix("schema:"), 0);
    assert_eq!(log.count_prefix("create:"), 0);
}

// --- View-application mask ---

#[test]
fn mask_change_rebuilds_once_and_is_idempotent() {
    let (space, cache, log) = grid_fixture();
    cache.validate();
    let reasons = change_counter(&cache);
    let factories_before = space.factories_created();
    log.clear();

    let new_mask = ViewApplicationMask::DRAW | ViewApplicationMask::CONTROLLERS;
    cache.set_view_application_mask(new_mask);

    assert_eq!(*reasons.borrow(), vec![ChangeReason::CACHE_CONTENT]);
    assert_eq!(space.factories_created(), factories_before + 1);
    assert_eq!(space.last_factory_mask(), Some(new_mask));
    assert_eq!(cache.view_application_mask(), new_mask);

    // Every cached item's schema now reflects the new mask.
    let item = cache.item(cell_id(0, 0)).expect("visible");
    let stub = item.as_any().downcast_ref::<TestItem>().expect("stub item");
    assert_eq!(stub.schema_mask(), new_mask);

    // Setting the same mask again is a silent no-op.
    cache.set_view_application_mask(new_mask);
    assert_eq!(reasons.borrow().len(), 1);
    assert_eq!(space.factories_created(), factories_before + 1);
}

// --- Rows strategy ---

#[test]
fn rows_cache_covers_full_width_rows() {
    let log = EventLog::new();
    // 10 rows, 3 columns of 20px: each row is a 60x20 item.
    let space = TestSpace::new(10, 3, Size::new(20, 20), log.clone());
    let cache = rows_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 60, 100));

    let item = cache.item_at(Point::new(10, 30)).expect("row 1");
    assert_eq!(item.id(), cell_id(1, 0));
    assert_eq!(item.rect(), Rect::new(0, 20, 60, 20));
    assert_eq!(log.count_prefix("create:"), 5);
}

#[test]
fn rows_cache_scrolls_incrementally() {
    let log = EventLog::new();
    let space = TestSpace::new(10, 3, Size::new(20, 20), log.clone());
    let cache = rows_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    cache.set_window(Rect::new(0, 0, 60, 100));
    cache.validate();

    let row1 = cache.item(cell_id(1, 0)).expect("visible");
    log.clear();

    // Half a row of scroll exposes one more row at the bottom.
    cache.set_scroll_offset(Point::new(0, 10));
    cache.validate();

    assert_eq!(log.count_prefix("create:"), 1);
    let kept = cache.item(cell_id(1, 0)).expect("kept");
    assert!(Rc::ptr_eq(&row1, &kept));
    assert_eq!(kept.rect(), Rect::new(0, 10, 60, 20));
}

// --- Lifecycle ---

#[test]
fn dropping_the_cache_unsubscribes_from_the_space() {
    let log = EventLog::new();
    let space = TestSpace::new(4, 4, Size::new(20, 20), log.clone());
    assert_eq!(space.subscriber_count(), 0);

    let cache = grid_cache(Rc::clone(&space), ViewApplicationMask::DRAW);
    assert_eq!(space.subscriber_count(), 1);

    drop(cache);
    assert_eq!(space.subscriber_count(), 0);
}

#[test]
fn resize_notification_reaches_a_live_cache() {
    let (space, cache, _log) = grid_fixture();
    cache.validate();
    let changed = Rc::new(Cell::new(0));
    let sink = Rc::clone(&changed);
    cache.on_cache_changed(Rc::new(move |_cache, _reason| {
        sink.set(sink.get() + 1);
    }));

    space.resize(2, 2);
    assert_eq!(changed.get(), 1);
    // Only the surviving cells are rebuilt.
    assert!(cache.item(cell_id(1, 1)).is_some());
    assert!(cache.item(cell_id(5, 5)).is_none());
}

use crate::*;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

type Page = IteratorPage<u32, u64>;

/// An iterator that replays a scripted sequence of pages, counting polls.
/// The optional `on_next` hook runs before each page resolves, simulating
/// external state changing while a fetch is in flight.
struct ScriptedIterator {
    pages: VecDeque<Result<Page, FetchError>>,
    polls: Rc<Cell<usize>>,
    on_next: Option<Box<dyn Fn()>>,
}

impl ScriptedIterator {
    fn new(pages: Vec<Result<Page, FetchError>>) -> Self {
        Self {
            pages: pages.into(),
            polls: Rc::new(Cell::new(0)),
            on_next: None,
        }
    }

    fn with_on_next(mut self, f: impl Fn() + 'static) -> Self {
        self.on_next = Some(Box::new(f));
        self
    }

    fn polls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.polls)
    }
}

impl PagedIterator<u32, u64> for ScriptedIterator {
    fn next(&mut self) -> PageFuture<'_, u32, u64> {
        self.polls.set(self.polls.get() + 1);
        if let Some(f) = &self.on_next {
            f();
        }
        let page = self.pages.pop_front().unwrap_or_else(|| Ok(Page::finished()));
        Box::pin(async move { page })
    }
}

fn page(start: u32, count: usize, done: bool) -> Result<Page, FetchError> {
    Ok(IteratorPage {
        done,
        data: (start..start + count as u32).collect(),
        metadata: (start as u64..start as u64 + count as u64).collect(),
        max_count_limit: false,
    })
}

fn scroller(
    pages: Vec<Result<Page, FetchError>>,
    options: ScrollerOptions<u32, u64>,
) -> (ViewportScroller<u32, u64>, Rc<Cell<usize>>) {
    let iterator = ScriptedIterator::new(pages);
    let polls = iterator.polls();
    (ViewportScroller::new(Box::new(iterator), options), polls)
}

/// Runs the standard fetch cycle prologue: 25 initial rows measured at
/// pixel bounds (0, 500) with a 100px viewport.
fn measured_scroller(
    pages: Vec<Result<Page, FetchError>>,
) -> (ViewportScroller<u32, u64>, Rc<Cell<usize>>) {
    let (mut s, polls) = scroller(pages, ScrollerOptions::new().with_initial_row_count(25));
    s.set_viewport_size(100);
    s.set_viewport_range(0, 500);
    (s, polls)
}

#[test]
fn shift_moves_only_the_affected_bounds() {
    // at or before the start: both ends move
    let mut point = RenderedPoint::new(10, 20);
    point.start = Some(100);
    point.end = Some(200);
    point.shift(10, 1);
    assert_eq!((point.start_index, point.end_index), (11, 21));
    assert!(!point.valid);

    // inside the half-open range: only the end moves
    let mut point = RenderedPoint::new(10, 20);
    point.shift(15, -1);
    assert_eq!((point.start_index, point.end_index), (10, 19));
    assert!(!point.valid);

    // at or past the (exclusive) end: untouched
    let mut point = RenderedPoint::new(10, 20);
    point.shift(20, 1);
    assert_eq!((point.start_index, point.end_index), (10, 20));
    assert!(point.valid);
}

#[test]
fn merge_requires_adjacent_measured_points() {
    let mut a = RenderedPoint::new(0, 10);
    a.start = Some(0);
    a.end = Some(100);
    let mut b = RenderedPoint::new(10, 20);
    b.start = Some(100);
    b.end = Some(250);

    let merged = a.merge(&b).unwrap();
    assert_eq!((merged.start_index, merged.end_index), (0, 20));
    assert_eq!((merged.start, merged.end), (Some(0), Some(250)));
    assert!(merged.covers(50, 200));

    let gap = RenderedPoint::new(12, 20);
    assert!(a.merge(&gap).is_none());

    b.valid = false;
    assert!(a.merge(&b).is_none());
}

#[test]
fn check_viewport_false_until_bounds_are_measured() {
    let (mut s, _) = scroller(vec![], ScrollerOptions::new().with_initial_row_count(25));
    s.set_viewport_size(100);
    assert!(!s.check_viewport());

    s.set_viewport_range(0, 500);
    assert!(s.check_viewport());
    // first measurement snapshots the point into history
    assert_eq!(s.rendered_points().len(), 1);
    assert_eq!(s.rendered_points()[0], *s.current_point());
}

#[tokio::test]
async fn coverage_invariant_follows_pixel_bounds() {
    let (mut s, _) = measured_scroller(vec![]);
    // [0, 500] covers [scroll, scroll + 100] up to scroll = 400
    assert!(s.check_viewport());
    let _ = s.handle_scroll(400, 1000).await;
    assert!(s.check_viewport());
    let _ = s.handle_scroll(401, 1000).await;
    assert!(!s.check_viewport());
}

#[tokio::test]
async fn first_scroll_arms_midpoint_trigger() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false)]);

    // first scroll after a fetch only arms the trigger (midpoint of 100..1000)
    assert!(matches!(s.handle_scroll(100, 1000).await, ScrollResult::Idle));
    assert_eq!(polls.get(), 0);

    assert!(matches!(s.handle_scroll(549, 1000).await, ScrollResult::Idle));
    assert_eq!(polls.get(), 0);

    let result = s.handle_scroll(550, 1000).await;
    let ScrollResult::Fetched(outcome) = result else {
        panic!("expected fetch at trigger, got {result:?}");
    };
    assert_eq!(polls.get(), 1);
    assert_eq!(outcome.start_index, 25);
    assert_eq!(outcome.data.len(), 25);
    assert_eq!(s.current_point().start_index, 25);
    assert_eq!(s.current_point().end_index, 50);
    assert_eq!(s.current_point().start, None);
    assert_eq!(s.current_point().end, None);
}

#[tokio::test]
async fn near_bottom_fetches_immediately() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false)]);
    // within 1px of the bottom: no midpoint wait
    assert!(s.handle_scroll(999, 1000).await.is_fetched());
    assert_eq!(polls.get(), 1);
}

#[tokio::test]
async fn no_second_fetch_while_one_is_in_flight() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false), page(50, 25, false)]);
    let _ = s.handle_scroll(100, 1000).await;
    assert!(s.handle_scroll(550, 1000).await.is_fetched());
    assert!(s.fetch_in_flight());
    assert_eq!(polls.get(), 1);

    // at or before the last trigger: suppressed outright
    assert!(matches!(s.handle_scroll(548, 1000).await, ScrollResult::Idle));
    // past the trigger: still no second fetch while one is pending
    assert!(matches!(s.handle_scroll(700, 1000).await, ScrollResult::Idle));
    assert_eq!(polls.get(), 1);

    // the view measures the new rows and coverage catches up: cycle closed
    s.set_viewport_range(0, 2000);
    assert!(!s.fetch_in_flight());
}

#[tokio::test]
async fn fetch_cycle_completes_only_when_scroll_caught_up() {
    let (mut s, _) = measured_scroller(vec![page(25, 25, false)]);
    let _ = s.handle_scroll(100, 1000).await;
    assert!(s.handle_scroll(550, 1000).await.is_fetched());

    // bounds arrive but do not cover the viewport yet
    s.set_viewport_range(0, 600);
    assert!(s.fetch_in_flight());

    s.set_viewport_range(0, 2000);
    assert!(!s.fetch_in_flight());
}

#[tokio::test]
async fn scrolling_back_reuses_a_valid_history_point() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false)]);
    let _ = s.handle_scroll(100, 1000).await;
    assert!(s.handle_scroll(550, 1000).await.is_fetched());
    s.set_viewport_range(500, 1000);
    assert_eq!(s.rendered_points().len(), 2);

    // a removal inside the second range invalidates it but not the first
    s.handle_items_removed(&[30]);
    assert!(!s.current_point().valid);
    assert!(s.rendered_points()[0].valid);
    assert!(!s.rendered_points()[1].valid);

    let result = s.handle_scroll(100, 1000).await;
    assert!(matches!(result, ScrollResult::Reused));
    assert_eq!(polls.get(), 1);
    assert_eq!(s.current_point().start_index, 0);
    assert_eq!(s.current_point().end_index, 25);
    assert_eq!(s.current_point().end, Some(500));
}

#[tokio::test]
async fn adjacent_history_points_are_merged_for_coverage() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false), page(50, 25, false)]);
    let _ = s.handle_scroll(100, 1500).await;
    assert!(s.handle_scroll(800, 1500).await.is_fetched());
    s.set_viewport_range(500, 1000);
    assert!(s.handle_scroll(1499, 1500).await.is_fetched());
    s.set_viewport_range(1000, 1600);
    assert_eq!(s.rendered_points().len(), 3);

    // invalidate the third range; a wide viewport then needs the first two
    s.handle_items_removed(&[55]);
    s.set_viewport_size(400);

    let result = s.handle_scroll(300, 1500).await;
    assert!(matches!(result, ScrollResult::Reused));
    assert_eq!(polls.get(), 2);
    assert_eq!(s.current_point().start_index, 0);
    assert_eq!(s.current_point().end_index, 50);
    assert_eq!(s.current_point().start, Some(0));
    assert_eq!(s.current_point().end, Some(1000));
}

#[tokio::test]
async fn invalidated_ranges_do_not_serve_reuse() {
    let (mut s, _) = measured_scroller(vec![page(25, 25, false), page(50, 25, false)]);
    let _ = s.handle_scroll(100, 1500).await;
    assert!(s.handle_scroll(800, 1500).await.is_fetched());
    s.set_viewport_range(500, 1000);
    assert!(s.handle_scroll(1499, 1500).await.is_fetched());
    s.set_viewport_range(1000, 1600);

    // the removal hits the third range; a viewport needing it cannot be
    // served from history even though the first two ranges are intact
    s.handle_items_removed(&[55]);
    s.set_viewport_size(1300);
    let result = s.handle_scroll(100, 1500).await;
    assert!(matches!(result, ScrollResult::Idle));
    assert!(!s.current_point().valid);
}

#[tokio::test]
async fn fetch_after_reuse_starts_at_the_row_count() {
    let (mut s, _) = measured_scroller(vec![
        page(25, 25, false),
        page(50, 25, false),
        page(75, 25, false),
    ]);
    let _ = s.handle_scroll(100, 1500).await;
    assert!(s.handle_scroll(800, 1500).await.is_fetched());
    s.set_viewport_range(500, 1000);
    assert!(s.handle_scroll(1499, 1500).await.is_fetched());
    s.set_viewport_range(1000, 1600);

    // a removal invalidates the later ranges; scrolling back promotes the
    // first history point, rewinding the current index range
    s.handle_items_removed(&[30]);
    assert!(matches!(s.handle_scroll(100, 1500).await, ScrollResult::Reused));
    assert_eq!(s.current_point().end_index, 25);
    assert_eq!(s.row_count(), 74);

    // the next fetch appends past all fetched rows, not at the rewound
    // point's end; a wrong label here would collide with a history entry
    // holding different rows
    let ScrollResult::Fetched(outcome) = s.handle_scroll(1499, 1500).await else {
        panic!("expected fetch after reuse");
    };
    assert_eq!(outcome.start_index, 74);
    assert_eq!(s.current_point().start_index, 74);
    assert_eq!(s.current_point().end_index, 99);
    assert_eq!(s.row_count(), 99);
}

#[tokio::test]
async fn stale_fetch_result_is_discarded() {
    let min_index = Rc::new(Cell::new(5i64));
    let success_calls = Rc::new(Cell::new(0usize));

    let options = ScrollerOptions::new()
        .with_strategy(FetchStrategy::ViewportOnly)
        .with_before_fetch_next({
            let min_index = Rc::clone(&min_index);
            move |_| min_index.get()
        })
        .with_success({
            let success_calls = Rc::clone(&success_calls);
            move |_| success_calls.set(success_calls.get() + 1)
        });

    let iterator = ScriptedIterator::new(vec![page(0, 25, false)]).with_on_next({
        // the viewport moves up while the page is in flight
        let min_index = Rc::clone(&min_index);
        move || min_index.set(3)
    });
    let polls = iterator.polls();
    let mut s = ViewportScroller::new(Box::new(iterator), options);
    s.set_viewport_size(100);

    let result = s.handle_scroll(999, 1000).await;
    assert!(matches!(result, ScrollResult::Discarded));
    assert_eq!(polls.get(), 1);
    assert_eq!(success_calls.get(), 0);
    assert!(!s.fetch_in_flight());
    // nothing was applied
    assert_eq!(s.row_count(), 0);
    assert_eq!(s.status().size, 0);
}

#[tokio::test]
async fn monotonic_min_index_is_applied() {
    let min_index = Rc::new(Cell::new(5i64));
    let options = ScrollerOptions::new()
        .with_strategy(FetchStrategy::ViewportOnly)
        .with_before_fetch_next({
            let min_index = Rc::clone(&min_index);
            move |_| min_index.get()
        });
    let iterator = ScriptedIterator::new(vec![page(0, 25, false)]).with_on_next({
        // the viewport moved further down: the fetched rows are still wanted
        let min_index = Rc::clone(&min_index);
        move || min_index.set(7)
    });
    let mut s = ViewportScroller::new(Box::new(iterator), options);
    s.set_viewport_size(100);

    assert!(s.handle_scroll(999, 1000).await.is_fetched());
    assert_eq!(s.row_count(), 25);
}

#[tokio::test]
async fn negative_min_index_aborts_before_the_pull() {
    let options = ScrollerOptions::<u32, u64>::new()
        .with_strategy(FetchStrategy::ViewportOnly)
        .with_before_fetch_next(|_| -1);
    let (mut s, polls) = scroller(vec![page(0, 25, false)], options);
    s.set_viewport_size(100);

    let result = s.handle_scroll(999, 1000).await;
    assert!(matches!(result, ScrollResult::Aborted));
    assert_eq!(polls.get(), 0);
    assert!(!s.fetch_in_flight());
}

#[tokio::test]
async fn max_count_clamps_the_applied_page() {
    let options = ScrollerOptions::new()
        .with_fetch_size(25)
        .with_max_count(500)
        .with_initial_row_count(490);
    let (mut s, _) = scroller(vec![page(490, 25, false)], options);
    s.set_viewport_size(100);

    let result = s.handle_scroll(999, 1000).await;
    let ScrollResult::Fetched(outcome) = result else {
        panic!("expected fetch, got {result:?}");
    };
    assert_eq!(outcome.data.len(), 10);
    assert!(outcome.status.max_count_limit);
    assert_eq!(outcome.status.size, 10);
    assert_eq!(s.row_count(), 500);
    assert!(s.current_point().max_count_limit);
    assert!(s.check_viewport());
}

#[tokio::test]
async fn max_count_limit_set_when_no_full_page_remains() {
    let options = ScrollerOptions::new().with_fetch_size(25).with_max_count(60);
    let (mut s, _) = scroller(vec![page(0, 25, false), page(25, 25, false)], options);
    s.set_viewport_size(100);

    let ScrollResult::Fetched(first) = s.handle_scroll(999, 1000).await else {
        panic!("expected first fetch");
    };
    assert!(!first.status.max_count_limit);
    s.set_viewport_range(0, 2000);

    // 35 rows of budget left, less than another 25 after this page
    let ScrollResult::Fetched(second) = s.handle_scroll(1999, 2000).await else {
        panic!("expected second fetch");
    };
    assert_eq!(second.status.size, 25);
    assert!(second.status.max_count_limit);
}

#[tokio::test]
async fn failed_fetch_reports_and_allows_retry() {
    let error_calls = Rc::new(Cell::new(0usize));
    let options = ScrollerOptions::new().with_error({
        let error_calls = Rc::clone(&error_calls);
        move |_| error_calls.set(error_calls.get() + 1)
    });
    let (mut s, polls) = scroller(
        vec![Err(FetchError::Source("boom".into())), page(0, 25, true)],
        options,
    );
    s.set_viewport_size(100);

    let result = s.handle_scroll(999, 1000).await;
    assert!(matches!(result, ScrollResult::Failed(FetchError::Source(_))));
    assert_eq!(error_calls.get(), 1);
    assert!(!s.fetch_in_flight());
    assert_eq!(s.row_count(), 0);

    // the next scroll event drives the retry
    assert!(s.handle_scroll(999, 1000).await.is_fetched());
    assert_eq!(polls.get(), 2);
    assert_eq!(s.row_count(), 25);
}

#[tokio::test]
async fn done_source_stops_triggering() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, true)]);
    let _ = s.handle_scroll(100, 1000).await;
    assert!(s.handle_scroll(999, 1000).await.is_fetched());
    assert!(s.current_point().done);
    assert!(s.check_viewport());

    s.set_viewport_range(500, 1000);
    let _ = s.handle_scroll(999, 1000).await;
    let _ = s.handle_scroll(1000, 1000).await;
    assert_eq!(polls.get(), 1);
}

#[test]
fn mutations_shift_current_and_history() {
    let (mut s, _) = scroller(vec![], ScrollerOptions::new().with_initial_row_count(10));
    s.set_viewport_size(100);
    s.set_viewport_range(0, 200);

    s.handle_items_added(&[5]);
    assert_eq!(s.current_point().start_index, 0);
    assert_eq!(s.current_point().end_index, 11);
    assert!(!s.current_point().valid);
    assert_eq!(s.rendered_points()[0].end_index, 11);
    assert_eq!(s.row_count(), 11);

    s.handle_items_removed(&[0]);
    assert_eq!(s.current_point().end_index, 10);
    assert_eq!(s.row_count(), 10);
}

#[test]
fn remeasure_revalidates_and_syncs_history() {
    let (mut s, _) = scroller(vec![], ScrollerOptions::new().with_initial_row_count(10));
    s.set_viewport_size(100);
    s.set_viewport_range(0, 200);

    s.handle_items_added(&[3]);
    assert!(!s.rendered_points()[0].valid);

    // the view re-measures after the mutation
    s.set_viewport_range(0, 220);
    assert!(s.current_point().valid);
    let point = &s.rendered_points()[0];
    assert!(point.valid);
    assert_eq!(point.end, Some(220));
    assert_eq!(point.end_index, 11);
}

#[tokio::test]
async fn before_fetch_by_offset_reports_the_upcoming_range() {
    let ranges = Rc::new(RefCell::new(Vec::new()));
    let options = ScrollerOptions::new()
        .with_initial_row_count(25)
        .with_before_fetch_by_offset({
            let ranges = Rc::clone(&ranges);
            move |start, end| ranges.borrow_mut().push((start, end))
        });
    let (mut s, _) = scroller(vec![page(25, 25, false)], options);
    s.set_viewport_size(100);
    s.set_viewport_range(0, 500);

    assert!(s.handle_scroll(999, 1000).await.is_fetched());
    assert_eq!(ranges.borrow().as_slice(), &[(25, 50)]);
}

#[tokio::test]
async fn sync_viewport_reports_coverage_or_fetches() {
    let (mut s, polls) = measured_scroller(vec![page(25, 25, false)]);
    assert!(matches!(s.sync_viewport().await, ScrollResult::Covered));
    assert_eq!(polls.get(), 0);

    let _ = s.handle_scroll(600, 1000).await;
    assert!(s.sync_viewport().await.is_fetched());
    assert_eq!(polls.get(), 1);
}

#[test]
fn scroller_state_round_trips() {
    let (mut s, _) = scroller(vec![], ScrollerOptions::new().with_initial_row_count(25));
    s.set_viewport_size(100);
    s.set_viewport_range(0, 500);
    let state = s.state();

    let (mut restored, _) = scroller(vec![], ScrollerOptions::new());
    restored.restore_state(state.clone());
    assert_eq!(restored.state(), state);
    assert!(restored.check_viewport());
    assert_eq!(restored.rendered_points().len(), 1);
}

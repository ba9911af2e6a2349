use crate::iterator::{IteratorPage, PagedIterator};
use crate::{
    FetchOutcome, FetchStatus, FetchStrategy, RenderedPoint, ScrollResult, ScrollerOptions,
    ScrollerState,
};

/// Decides, from scroll position alone, whether currently known data covers
/// the visible viewport, and drives the paged iterator when it does not.
///
/// This type is headless:
/// - The view layer reports geometry via [`set_viewport_size`](Self::set_viewport_size)
///   and measured pixel bounds via [`set_viewport_range`](Self::set_viewport_range).
/// - Scroll events are fed through [`handle_scroll`](Self::handle_scroll),
///   which returns what happened as a [`ScrollResult`].
/// - Index-shifting mutations of the source collection are reported through
///   [`handle_items_added`](Self::handle_items_added) /
///   [`handle_items_removed`](Self::handle_items_removed).
///
/// At most one fetch is in flight at a time; scroll events arriving while a
/// fetch is pending are suppressed, not queued. A fetch whose result went
/// stale while in flight (the viewport moved on) is discarded on arrival;
/// there is no explicit cancel API.
pub struct ViewportScroller<D, M> {
    options: ScrollerOptions<D, M>,
    iterator: Box<dyn PagedIterator<D, M>>,
    viewport_size: u32,
    scroll_top: u64,
    max_scroll_top: u64,
    current: RenderedPoint,
    /// Prior rendered points, append-only and not deduplicated. Used to
    /// avoid re-fetching when the user scrolls back into a visited range.
    rendered_points: Vec<RenderedPoint>,
    status: FetchStatus,
    row_count: usize,
    fetch_in_flight: bool,
    next_fetch_trigger: Option<u64>,
    last_fetch_trigger: u64,
}

impl<D, M> ViewportScroller<D, M> {
    pub fn new(iterator: Box<dyn PagedIterator<D, M>>, options: ScrollerOptions<D, M>) -> Self {
        debug_assert!(options.fetch_size > 0, "fetch_size must be greater than zero");
        debug_assert!(options.max_count > 0, "max_count must be greater than zero");
        let row_count = options.initial_row_count;
        fdebug!(
            fetch_size = options.fetch_size,
            max_count = options.max_count,
            initial_row_count = row_count,
            "ViewportScroller::new"
        );
        Self {
            current: RenderedPoint::new(0, row_count),
            rendered_points: Vec::new(),
            status: FetchStatus {
                size: row_count,
                done: false,
                max_count_limit: false,
            },
            row_count,
            viewport_size: 0,
            scroll_top: 0,
            max_scroll_top: 0,
            fetch_in_flight: false,
            next_fetch_trigger: None,
            last_fetch_trigger: 0,
            iterator,
            options,
        }
    }

    pub fn options(&self) -> &ScrollerOptions<D, M> {
        &self.options
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    /// Total rows fetched so far (including `initial_row_count`).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn current_point(&self) -> &RenderedPoint {
        &self.current
    }

    pub fn rendered_points(&self) -> &[RenderedPoint] {
        &self.rendered_points
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    pub fn viewport_size(&self) -> u32 {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: u32) {
        self.viewport_size = size;
    }

    /// Returns true when the viewport is already satisfied by known data:
    /// the current point is terminal (`done` or capped) or the pixel range
    /// `[0, current.end]` covers the visible viewport.
    pub fn check_viewport(&self) -> bool {
        if self.current.done || self.current.max_count_limit {
            return true;
        }
        self.covered_by_current()
    }

    /// [`check_viewport`](Self::check_viewport) plus a fetch when uncovered.
    pub async fn sync_viewport(&mut self) -> ScrollResult<D, M> {
        if self.check_viewport() {
            return ScrollResult::Covered;
        }
        self.do_fetch().await
    }

    /// Handles a scroll event.
    ///
    /// The first event after a fetch arms a pre-fetch trigger at the
    /// midpoint between the current position and the bottom, so the next
    /// fetch starts before the user reaches the end. Within 1px of the
    /// bottom the fetch starts immediately. Scrolling backwards out of the
    /// current range tries to reuse a previously rendered point instead of
    /// fetching.
    pub async fn handle_scroll(
        &mut self,
        scroll_top: u64,
        max_scroll_top: u64,
    ) -> ScrollResult<D, M> {
        ftrace!(scroll_top, max_scroll_top, "handle_scroll");
        let prev = self.scroll_top;
        self.scroll_top = scroll_top;
        self.max_scroll_top = max_scroll_top;

        if self.fetch_in_flight && scroll_top <= self.last_fetch_trigger {
            // a fetch is already pending and the user has not scrolled past
            // the point that triggered it
            return ScrollResult::Idle;
        }

        if scroll_top < prev {
            if !self.covered_by_current() && self.check_rendered_points() {
                return ScrollResult::Reused;
            }
            return ScrollResult::Idle;
        }

        if self.current.done || self.current.max_count_limit {
            return ScrollResult::Idle;
        }

        if max_scroll_top.saturating_sub(scroll_top) <= 1 {
            self.last_fetch_trigger = scroll_top;
            self.next_fetch_trigger = None;
            return self.do_fetch().await;
        }

        match self.next_fetch_trigger {
            None => {
                let trigger =
                    scroll_top.saturating_add(max_scroll_top.saturating_sub(scroll_top) / 2);
                fdebug!(trigger, "armed pre-fetch trigger");
                self.next_fetch_trigger = Some(trigger);
                ScrollResult::Idle
            }
            Some(trigger) if scroll_top >= trigger => {
                self.last_fetch_trigger = trigger;
                self.next_fetch_trigger = None;
                self.do_fetch().await
            }
            Some(_) => ScrollResult::Idle,
        }
    }

    /// Records the measured pixel bounds for the current index range.
    ///
    /// The first measurement for a point snapshots it into the history. A
    /// point invalidated by a mutation is re-validated here, and the new
    /// bounds are back-propagated into history entries sharing its index
    /// range. Once the bounds cover the viewport and the scroll position has
    /// caught up with the last trigger, the pending fetch cycle is complete
    /// and the trigger state is cleared.
    pub fn set_viewport_range(&mut self, start: u64, end: u64) {
        ftrace!(start, end, "set_viewport_range");
        let first = self.current.start.is_none();
        let was_invalid = !self.current.valid;
        self.current.start = Some(start);
        self.current.end = Some(end);
        self.current.valid = true;
        if first {
            self.rendered_points.push(self.current.clone());
        } else if was_invalid {
            self.sync_rendered_points_with_current();
        }
        if self.check_viewport() && self.scroll_top >= self.last_fetch_trigger {
            self.fetch_in_flight = false;
            self.next_fetch_trigger = None;
        }
    }

    /// Shifts index bookkeeping for rows inserted at the given pre-mutation
    /// indexes.
    pub fn handle_items_added(&mut self, indexes: &[usize]) {
        for &index in indexes {
            self.current.shift(index, 1);
            for point in &mut self.rendered_points {
                point.shift(index, 1);
            }
            self.row_count = self.row_count.saturating_add(1);
        }
    }

    /// Shifts index bookkeeping for rows removed at the given pre-mutation
    /// indexes.
    pub fn handle_items_removed(&mut self, indexes: &[usize]) {
        for &index in indexes {
            self.current.shift(index, -1);
            for point in &mut self.rendered_points {
                point.shift(index, -1);
            }
            self.row_count = self.row_count.saturating_sub(1);
        }
    }

    /// Captures a snapshot of the scroller's bookkeeping.
    pub fn state(&self) -> ScrollerState {
        ScrollerState {
            scroll_top: self.scroll_top,
            max_scroll_top: self.max_scroll_top,
            viewport_size: self.viewport_size,
            current: self.current.clone(),
            rendered_points: self.rendered_points.clone(),
            status: self.status,
            row_count: self.row_count,
        }
    }

    /// Restores a previously captured snapshot. Any in-flight fetch and
    /// trigger state is reset; the next scroll event starts fresh.
    pub fn restore_state(&mut self, state: ScrollerState) {
        self.scroll_top = state.scroll_top;
        self.max_scroll_top = state.max_scroll_top;
        self.viewport_size = state.viewport_size;
        self.current = state.current;
        self.rendered_points = state.rendered_points;
        self.status = state.status;
        self.row_count = state.row_count;
        self.fetch_in_flight = false;
        self.next_fetch_trigger = None;
        self.last_fetch_trigger = 0;
    }

    fn covered_by_current(&self) -> bool {
        if !self.current.valid {
            return false;
        }
        match self.current.end {
            Some(end) => self.scroll_top.saturating_add(self.viewport_size as u64) <= end,
            None => false,
        }
    }

    fn viewport_bounds(&self) -> (u64, u64) {
        (
            self.scroll_top,
            self.scroll_top.saturating_add(self.viewport_size as u64),
        )
    }

    async fn do_fetch(&mut self) -> ScrollResult<D, M> {
        if self.fetch_in_flight {
            return ScrollResult::Idle;
        }

        // Under the viewport-only strategy the view gets a veto before any
        // page is pulled. A negative minimum index means "not yet needed".
        let min_index = if self.options.strategy == FetchStrategy::ViewportOnly {
            match self.options.before_fetch_next.as_ref().map(|f| f(self.scroll_top)) {
                Some(min) if min < 0 => {
                    fdebug!(min, "fetch declined by view");
                    self.next_fetch_trigger = None;
                    return ScrollResult::Aborted;
                }
                other => other,
            }
        } else {
            None
        };

        if let Some(f) = &self.options.before_fetch_by_offset {
            f(
                self.row_count,
                self.row_count.saturating_add(self.options.fetch_size),
            );
        }

        self.fetch_in_flight = true;
        let page = match self.iterator.next().await {
            Ok(page) => page,
            Err(err) => {
                // buffer stays at last known good state; the next scroll
                // event drives the retry
                self.fetch_in_flight = false;
                self.next_fetch_trigger = None;
                fwarn!(error = %err, "page fetch failed");
                if let Some(f) = &self.options.error {
                    f(&err);
                }
                return ScrollResult::Failed(err);
            }
        };

        // The viewport may have moved while the page was in flight. Any
        // minimum index below the pre-fetch value (including non-monotonic
        // up-then-down sequences) marks the result stale; rendering it would
        // show rows the view no longer wants.
        if let Some(min_before) = min_index {
            let min_after = self
                .options
                .before_fetch_next
                .as_ref()
                .map(|f| f(self.scroll_top));
            if let Some(min_after) = min_after {
                if min_after < min_before {
                    finfo!(min_before, min_after, "discarding stale fetch result");
                    self.fetch_in_flight = false;
                    self.check_rendered_points();
                    return ScrollResult::Discarded;
                }
            }
        }

        let outcome = self.apply_page(page);
        if let Some(f) = &self.options.success {
            f(&outcome);
        }
        ScrollResult::Fetched(outcome)
    }

    /// Applies a pulled page: clamps it to the remaining max-count budget
    /// and makes the fetched slice the current rendered point. Pixel bounds
    /// stay unknown until the view measures the new rows.
    fn apply_page(&mut self, mut page: IteratorPage<D, M>) -> FetchOutcome<D, M> {
        let remaining = self.options.max_count.saturating_sub(self.row_count);
        let mut size = page.data.len();
        let mut max_count_limit = page.max_count_limit;
        if size >= remaining {
            size = remaining;
            page.data.truncate(size);
            page.metadata.truncate(size);
            max_count_limit = true;
        } else if remaining - size < self.options.fetch_size {
            // not enough budget left for another full page
            max_count_limit = true;
        }
        // rows append at the global row count; the current point may have
        // been rewound to an earlier range by history reuse
        let start_index = self.row_count;
        self.row_count += size;
        self.status = FetchStatus {
            size,
            done: page.done,
            max_count_limit,
        };

        let mut point = RenderedPoint::new(start_index, start_index + size);
        point.done = page.done;
        point.max_count_limit = max_count_limit;
        self.current = point;
        fdebug!(
            start_index,
            size,
            done = page.done,
            max_count_limit,
            "applied fetched page"
        );

        FetchOutcome {
            start_index,
            data: page.data,
            metadata: page.metadata,
            status: self.status,
        }
    }

    /// Searches the history for a previously rendered range covering the
    /// current viewport and promotes it to current. Besides single points,
    /// each pair of consecutive points is tried as a merged range; coverage
    /// spanning 3+ points is not reconstructed (known limitation).
    fn check_rendered_points(&mut self) -> bool {
        let (lo, hi) = self.viewport_bounds();
        for i in 0..self.rendered_points.len() {
            let point = &self.rendered_points[i];
            if point.covers(lo, hi) {
                fdebug!(
                    start_index = point.start_index,
                    end_index = point.end_index,
                    "reusing rendered point"
                );
                self.current = point.clone();
                return true;
            }
            if let Some(next) = self.rendered_points.get(i + 1) {
                if let Some(merged) = point.merge(next) {
                    if merged.covers(lo, hi) {
                        fdebug!(
                            start_index = merged.start_index,
                            end_index = merged.end_index,
                            "reusing merged rendered points"
                        );
                        self.current = merged;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Back-propagates the current point's re-measured bounds into history
    /// entries covering the same index range, re-validating them.
    fn sync_rendered_points_with_current(&mut self) {
        for point in &mut self.rendered_points {
            if point.start_index == self.current.start_index
                && point.end_index == self.current.end_index
            {
                point.start = self.current.start;
                point.end = self.current.end;
                point.valid = true;
            }
        }
    }
}

impl<D, M> std::fmt::Debug for ViewportScroller<D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportScroller")
            .field("options", &self.options)
            .field("viewport_size", &self.viewport_size)
            .field("scroll_top", &self.scroll_top)
            .field("max_scroll_top", &self.max_scroll_top)
            .field("current", &self.current)
            .field("rendered_points", &self.rendered_points)
            .field("status", &self.status)
            .field("row_count", &self.row_count)
            .field("fetch_in_flight", &self.fetch_in_flight)
            .field("next_fetch_trigger", &self.next_fetch_trigger)
            .field("last_fetch_trigger", &self.last_fetch_trigger)
            .finish_non_exhaustive()
    }
}

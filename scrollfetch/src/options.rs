use std::sync::Arc;

use crate::{FetchError, FetchOutcome, FetchStrategy};

/// A callback fired after a fetch result has been applied.
pub type SuccessCallback<D, M> = Arc<dyn Fn(&FetchOutcome<D, M>)>;

/// A callback fired when a page pull is rejected by the source.
pub type ErrorCallback = Arc<dyn Fn(&FetchError)>;

/// Maps the current scroll position to the minimum row index the view still
/// needs. A negative value means the view does not need more rows yet and
/// aborts the fetch.
///
/// Under [`FetchStrategy::ViewportOnly`] this is consulted both before a
/// page pull and after it resolves; a result that dropped below the
/// pre-fetch value marks the fetch stale.
pub type BeforeFetchNextCallback = Arc<dyn Fn(u64) -> i64>;

/// Notified with the half-open index range about to be fetched, before the
/// page pull starts. Lets the view prepare placeholders for that range.
pub type BeforeFetchByOffsetCallback = Arc<dyn Fn(usize, usize)>;

/// Configuration for [`crate::ViewportScroller`].
///
/// Cheap to clone: callbacks are stored in `Arc`s.
pub struct ScrollerOptions<D, M> {
    /// Rows requested per fetch. Must be greater than zero.
    pub fetch_size: usize,
    /// Hard cap on the total number of fetched rows. Must be greater than
    /// zero.
    pub max_count: usize,
    /// Rows the view rendered before the scroller took over; counts against
    /// the max-count budget.
    pub initial_row_count: usize,
    pub strategy: FetchStrategy,
    pub success: Option<SuccessCallback<D, M>>,
    pub error: Option<ErrorCallback>,
    pub before_fetch_next: Option<BeforeFetchNextCallback>,
    pub before_fetch_by_offset: Option<BeforeFetchByOffsetCallback>,
}

impl<D, M> ScrollerOptions<D, M> {
    pub fn new() -> Self {
        Self {
            fetch_size: 25,
            max_count: 500,
            initial_row_count: 0,
            strategy: FetchStrategy::default(),
            success: None,
            error: None,
            before_fetch_next: None,
            before_fetch_by_offset: None,
        }
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        debug_assert!(fetch_size > 0, "fetch_size must be greater than zero");
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        debug_assert!(max_count > 0, "max_count must be greater than zero");
        self.max_count = max_count.max(1);
        self
    }

    pub fn with_initial_row_count(mut self, initial_row_count: usize) -> Self {
        self.initial_row_count = initial_row_count;
        self
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_success(mut self, success: impl Fn(&FetchOutcome<D, M>) + 'static) -> Self {
        self.success = Some(Arc::new(success));
        self
    }

    pub fn with_error(mut self, error: impl Fn(&FetchError) + 'static) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    pub fn with_before_fetch_next(mut self, f: impl Fn(u64) -> i64 + 'static) -> Self {
        self.before_fetch_next = Some(Arc::new(f));
        self
    }

    pub fn with_before_fetch_by_offset(mut self, f: impl Fn(usize, usize) + 'static) -> Self {
        self.before_fetch_by_offset = Some(Arc::new(f));
        self
    }
}

impl<D, M> Default for ScrollerOptions<D, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M> Clone for ScrollerOptions<D, M> {
    fn clone(&self) -> Self {
        Self {
            fetch_size: self.fetch_size,
            max_count: self.max_count,
            initial_row_count: self.initial_row_count,
            strategy: self.strategy,
            success: self.success.clone(),
            error: self.error.clone(),
            before_fetch_next: self.before_fetch_next.clone(),
            before_fetch_by_offset: self.before_fetch_by_offset.clone(),
        }
    }
}

impl<D, M> std::fmt::Debug for ScrollerOptions<D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollerOptions")
            .field("fetch_size", &self.fetch_size)
            .field("max_count", &self.max_count)
            .field("initial_row_count", &self.initial_row_count)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

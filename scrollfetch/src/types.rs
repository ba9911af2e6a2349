use crate::FetchError;

/// When to trigger fetches relative to the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FetchStrategy {
    /// Pre-fetch before the user reaches the scroll bottom.
    #[default]
    HighWaterMark,
    /// Fetch only when the view reports an explicit index need through the
    /// `before_fetch_next` callback.
    ViewportOnly,
}

/// An index range currently backed by known pixel bounds.
///
/// `start_index..end_index` is half-open. Pixel bounds are `None` until the
/// view has measured the rendered range and reported them via
/// [`crate::ViewportScroller::set_viewport_range`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderedPoint {
    pub start_index: usize,
    /// Exclusive.
    pub end_index: usize,
    /// Pixel offset of the top of the range.
    pub start: Option<u64>,
    /// Pixel offset of the bottom of the range.
    pub end: Option<u64>,
    /// True when `end_index` was capped by the configured maximum row count.
    pub max_count_limit: bool,
    /// True when the underlying source is exhausted for this range.
    pub done: bool,
    /// False after an index-shifting mutation until pixel bounds are
    /// recomputed by the view.
    pub valid: bool,
}

impl RenderedPoint {
    pub(crate) fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
            start: None,
            end: None,
            max_count_limit: false,
            done: false,
            valid: true,
        }
    }

    /// Whether this point's pixel range contains `[lo, hi]`.
    ///
    /// A point with unknown or invalidated bounds covers nothing.
    pub fn covers(&self, lo: u64, hi: u64) -> bool {
        if !self.valid {
            return false;
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= lo && hi <= end,
            _ => false,
        }
    }

    /// Shifts the index range for a single-row mutation at `index`.
    ///
    /// A mutation at or before `start_index` moves both ends; one inside the
    /// half-open range moves only `end_index`. Either way the pixel bounds
    /// are no longer trustworthy and the point is marked invalid. Mutations
    /// at or past `end_index` leave the point untouched.
    pub fn shift(&mut self, index: usize, delta: isize) {
        if index <= self.start_index {
            self.start_index = apply_delta(self.start_index, delta);
            self.end_index = apply_delta(self.end_index, delta);
            self.valid = false;
        } else if index < self.end_index {
            self.end_index = apply_delta(self.end_index, delta);
            self.valid = false;
        }
    }

    /// Merges two consecutive points into one covering both ranges.
    ///
    /// Requires both points to be valid with known bounds and `other` to
    /// start exactly where `self` ends.
    pub(crate) fn merge(&self, other: &Self) -> Option<Self> {
        if !self.valid || !other.valid {
            return None;
        }
        if self.end_index != other.start_index {
            return None;
        }
        let (start, end) = match (self.start, other.end) {
            (Some(start), Some(end)) => (start, end),
            _ => return None,
        };
        Some(Self {
            start_index: self.start_index,
            end_index: other.end_index,
            start: Some(start),
            end: Some(end),
            max_count_limit: other.max_count_limit,
            done: other.done,
            valid: true,
        })
    }
}

fn apply_delta(value: usize, delta: isize) -> usize {
    if delta >= 0 {
        value.saturating_add(delta as usize)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// The state of the most recent fetch cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchStatus {
    /// Row count applied by the last fetch, clamped to the remaining
    /// max-count budget.
    pub size: usize,
    /// The source reported no more rows.
    pub done: bool,
    /// The configured maximum row count was (or is about to be) reached.
    pub max_count_limit: bool,
}

/// Rows applied by a completed fetch, handed to the success callback and
/// returned through [`ScrollResult::Fetched`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOutcome<D, M> {
    /// Index of the first appended row.
    pub start_index: usize,
    pub data: Vec<D>,
    pub metadata: Vec<M>,
    pub status: FetchStatus,
}

/// What a scroll event or viewport check produced.
#[derive(Debug)]
pub enum ScrollResult<D, M> {
    /// No action was needed or a pending fetch suppressed this event.
    Idle,
    /// The current rendered point already covers the viewport.
    Covered,
    /// A previously rendered range was promoted to current; no fetch needed.
    Reused,
    /// A fetch completed and its rows were applied.
    Fetched(FetchOutcome<D, M>),
    /// A fetch completed but its result went stale while in flight and was
    /// discarded. Not an error.
    Discarded,
    /// The view declined the fetch (`before_fetch_next` returned a negative
    /// index). Not an error.
    Aborted,
    /// The page pull was rejected by the source.
    Failed(FetchError),
}

impl<D, M> ScrollResult<D, M> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

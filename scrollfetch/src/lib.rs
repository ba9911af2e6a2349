//! A headless incremental-fetch virtualization engine.
//!
//! This crate coordinates asynchronous, paginated data fetches with
//! viewport-driven triggers: it tracks which contiguous index range of a
//! lazily fetched collection is currently backed by known pixel bounds
//! (a [`RenderedPoint`]), decides from scroll position alone when more data
//! is needed, pre-fetches before the user reaches the bottom, reuses
//! previously rendered ranges when scrolling back, and discards fetch
//! results that went stale while in flight.
//!
//! It is UI-agnostic. A view layer is expected to provide:
//! - viewport size and scroll offsets (`set_viewport_size`, `handle_scroll`)
//! - measured pixel bounds for rendered ranges (`set_viewport_range`)
//! - a [`PagedIterator`] over the underlying data source
//!
//! For content-level concerns (fetch buffers, mutation events, flat/tree
//! coordination), see the `scrollfetch-content` crate.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod iterator;
mod options;
mod scroller;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use iterator::{FetchError, IteratorPage, PageFuture, PagedIterator};
pub use options::{
    BeforeFetchByOffsetCallback, BeforeFetchNextCallback, ErrorCallback, ScrollerOptions,
    SuccessCallback,
};
pub use scroller::ViewportScroller;
pub use state::ScrollerState;
pub use types::{FetchOutcome, FetchStatus, FetchStrategy, RenderedPoint, ScrollResult};

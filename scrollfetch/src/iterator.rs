use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// One page of rows pulled from a paged data source.
///
/// `data` and `metadata` are parallel arrays: `data[i]` corresponds to
/// `metadata[i]` and they are always the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IteratorPage<D, M> {
    /// The source is exhausted after this page.
    pub done: bool,
    pub data: Vec<D>,
    pub metadata: Vec<M>,
    /// The source itself capped the result at its maximum row count.
    pub max_count_limit: bool,
}

impl<D, M> IteratorPage<D, M> {
    pub fn len(&self) -> usize {
        debug_assert_eq!(
            self.data.len(),
            self.metadata.len(),
            "data and metadata must be parallel"
        );
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// An empty terminal page.
    pub fn finished() -> Self {
        Self {
            done: true,
            data: Vec::new(),
            metadata: Vec::new(),
            max_count_limit: false,
        }
    }
}

/// The future returned by [`PagedIterator::next`].
///
/// Deliberately not `Send`: the whole subsystem is single-threaded and
/// cooperative, and iterators commonly close over `Rc`-shared state.
pub type PageFuture<'a, D, M> =
    Pin<Box<dyn Future<Output = Result<IteratorPage<D, M>, FetchError>> + 'a>>;

/// An asynchronous paging abstraction over a data source.
///
/// `next()` must be safely callable repeatedly until a page reports `done`;
/// further calls after that should keep returning terminal empty pages.
pub trait PagedIterator<D, M> {
    fn next(&mut self) -> PageFuture<'_, D, M>;
}

/// Why a fetch could not be applied.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The upstream data source rejected a page fetch.
    #[error("data source fetch failed: {0}")]
    Source(String),
    /// A row key violated the key contract (string or number required).
    #[error("invalid row key: {0}")]
    InvalidKey(String),
}

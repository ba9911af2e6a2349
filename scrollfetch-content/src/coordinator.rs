use scrollfetch::FetchError;

use crate::buffer::RenderState;
use crate::events::{AddDetail, MutationEvent, RemoveDetail, UpdateDetail};

/// Configuration shared by the content coordinators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentOptions {
    /// Rows per fetch batch. Must be greater than zero.
    pub fetch_size: usize,
    /// Hard cap on the total number of fetched rows. Must be greater than
    /// zero.
    pub max_count: usize,
    /// When true (the default), the initial fetch stops near `fetch_size`
    /// rows and further batches are scroll-driven. When false, the initial
    /// fetch pulls everything and no scroller is registered.
    pub load_more_on_scroll: bool,
}

impl ContentOptions {
    pub fn new() -> Self {
        Self {
            fetch_size: 25,
            max_count: 500,
            load_more_on_scroll: true,
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

    pub fn with_load_more_on_scroll(mut self, load_more_on_scroll: bool) -> Self {
        self.load_more_on_scroll = load_more_on_scroll;
        self
    }
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The surface shared by [`crate::FlatContentCoordinator`] and
/// [`crate::TreeContentCoordinator`].
///
/// A coordinator owns the fetch buffer for one collection and keeps it in
/// sync with the source: the view calls [`fetch_rows`](Self::fetch_rows)
/// once, pulls snapshots through [`render`](Self::render), forwards scroll
/// and geometry events, and applies source mutations through the
/// `handle_items_*` methods as the source emits them.
#[allow(async_fn_in_trait)]
pub trait ContentCoordinator<D: Clone> {
    type Metadata: Clone;

    /// Runs the initial fetch. A failed fetch leaves any previously
    /// buffered rows untouched; the error is also logged.
    async fn fetch_rows(&mut self) -> Result<(), FetchError>;

    /// Snapshot of what the view should show. The first call after a fetch
    /// registers the scroll-driven load-more machinery when more rows may
    /// come.
    fn render(&mut self) -> RenderState<D, Self::Metadata>;

    /// Feeds a scroll event through; may pull and apply the next batch.
    async fn handle_scroll(&mut self, scroll_top: u64, max_scroll_top: u64)
    -> Result<(), FetchError>;

    fn set_viewport_size(&mut self, size: u32);

    /// Reports the measured pixel bounds of the rendered range.
    fn set_viewport_range(&mut self, start: u64, end: u64);

    fn handle_items_added(&mut self, detail: &AddDetail<D>);

    fn handle_items_removed(&mut self, detail: &RemoveDetail);

    fn handle_items_updated(&mut self, detail: &UpdateDetail<D>);

    /// Applies a composite event: add, then remove, then update.
    fn handle_mutation(&mut self, event: &MutationEvent<D>) {
        if let Some(add) = &event.add {
            self.handle_items_added(add);
        }
        if let Some(remove) = &event.remove {
            self.handle_items_removed(remove);
        }
        if let Some(update) = &event.update {
            self.handle_items_updated(update);
        }
    }

    /// Discards everything and refetches from the source.
    async fn handle_model_refresh(&mut self) -> Result<(), FetchError>;

    /// Drops buffers, caches and the load-more machinery.
    fn destroy(&mut self);
}

use std::rc::Rc;

use scrollfetch::{
    FetchError, FetchOutcome, PagedIterator, ScrollResult, ScrollerOptions, ViewportScroller,
};

use crate::buffer::{FetchBuffer, RenderState, Row};
use crate::coordinator::{ContentCoordinator, ContentOptions};
use crate::events::{AddDetail, RemoveDetail, UpdateDetail};
use crate::provider::{DataProvider, FetchOptions, RowKey, RowMetadata, verify_key};

/// Coordinates incremental fetching and mutation tracking for a flat
/// (non-hierarchical) collection.
///
/// The initial fetch concatenates pages until the requested batch size is
/// reached (or the provider pages internally, or the source is exhausted).
/// When more rows may come, the first [`render`](ContentCoordinator::render)
/// hands the partially consumed iterator to a [`ViewportScroller`] that
/// drives further batches from scroll events.
pub struct FlatContentCoordinator<D> {
    provider: Rc<dyn DataProvider<D>>,
    options: ContentOptions,
    buffer: Option<FetchBuffer<D, RowMetadata>>,
    /// Mutation-added rows whose position fell outside the buffered range.
    out_of_range: Vec<Row<D, RowMetadata>>,
    scroller: Option<ViewportScroller<D, RowMetadata>>,
    /// The initial iterator, kept for the scroller when the source was not
    /// exhausted by the initial fetch.
    pending_iterator: Option<Box<dyn PagedIterator<D, RowMetadata>>>,
    fetching: bool,
}

impl<D: Clone> FlatContentCoordinator<D> {
    pub fn new(provider: Rc<dyn DataProvider<D>>, options: ContentOptions) -> Self {
        Self {
            provider,
            options,
            buffer: None,
            out_of_range: Vec::new(),
            scroller: None,
            pending_iterator: None,
            fetching: false,
        }
    }

    pub fn options(&self) -> &ContentOptions {
        &self.options
    }

    async fn fetch_initial(&mut self) -> Result<(), FetchError> {
        let size = self.options.load_more_on_scroll.then_some(self.options.fetch_size);
        let mut iterator = self.provider.fetch_first(FetchOptions { size });
        let mut buffer = FetchBuffer::new();
        loop {
            let page = match iterator.next().await {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(error = %err, "initial fetch failed; keeping previous rows");
                    return Err(err);
                }
            };
            buffer.done = page.done;
            buffer.max_count_limit |= page.max_count_limit;
            buffer.data.extend(page.data);
            buffer.metadata.extend(page.metadata);
            if buffer.done || self.provider.pages_internally() {
                break;
            }
            if size.is_some_and(|n| buffer.len() >= n) {
                break;
            }
        }
        if let Some(err) = key_violation(&buffer.metadata) {
            tracing::error!(error = %err, "discarding fetched batch");
            self.buffer = Some(FetchBuffer {
                done: true,
                ..FetchBuffer::new()
            });
            self.out_of_range.clear();
            self.scroller = None;
            self.pending_iterator = None;
            return Err(err);
        }
        self.pending_iterator = (!buffer.done && size.is_some()).then_some(iterator);
        self.buffer = Some(buffer);
        self.out_of_range.clear();
        self.scroller = None;
        Ok(())
    }

    /// Registers the load-more scroller once, on the first render after a
    /// fetch that left the source unexhausted.
    fn register_scroller(&mut self) {
        if self.scroller.is_some() {
            return;
        }
        let Some(buffer) = &self.buffer else { return };
        if buffer.done || buffer.max_count_limit {
            self.pending_iterator = None;
            return;
        }
        let Some(iterator) = self.pending_iterator.take() else {
            return;
        };
        let options = ScrollerOptions::new()
            .with_fetch_size(self.options.fetch_size)
            .with_max_count(self.options.max_count)
            .with_initial_row_count(buffer.len());
        self.scroller = Some(ViewportScroller::new(iterator, options));
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome<D, RowMetadata>) -> Result<(), FetchError> {
        if let Some(err) = key_violation(&outcome.metadata) {
            tracing::error!(error = %err, "discarding fetched batch");
            self.buffer = Some(FetchBuffer {
                done: true,
                ..FetchBuffer::new()
            });
            self.out_of_range.clear();
            self.scroller = None;
            return Err(err);
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.data.extend(outcome.data);
            buffer.metadata.extend(outcome.metadata);
            buffer.done = outcome.status.done;
            buffer.max_count_limit = outcome.status.max_count_limit;
        }
        Ok(())
    }
}

impl<D: Clone> ContentCoordinator<D> for FlatContentCoordinator<D> {
    type Metadata = RowMetadata;

    async fn fetch_rows(&mut self) -> Result<(), FetchError> {
        if self.fetching {
            return Ok(());
        }
        self.fetching = true;
        let result = self.fetch_initial().await;
        self.fetching = false;
        result
    }

    fn render(&mut self) -> RenderState<D, RowMetadata> {
        self.register_scroller();
        let (rows, placeholders) = match &self.buffer {
            Some(buffer) => {
                let placeholders = if buffer.done || buffer.max_count_limit {
                    0
                } else {
                    self.options.fetch_size
                };
                (buffer.rows(), placeholders)
            }
            None => (Vec::new(), 0),
        };
        RenderState {
            out_of_range: self.out_of_range.clone(),
            rows,
            placeholders,
            expanding_keys: Vec::new(),
        }
    }

    async fn handle_scroll(
        &mut self,
        scroll_top: u64,
        max_scroll_top: u64,
    ) -> Result<(), FetchError> {
        let Some(scroller) = self.scroller.as_mut() else {
            return Ok(());
        };
        match scroller.handle_scroll(scroll_top, max_scroll_top).await {
            ScrollResult::Fetched(outcome) => self.apply_fetch(outcome),
            ScrollResult::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }

    fn set_viewport_size(&mut self, size: u32) {
        if let Some(scroller) = self.scroller.as_mut() {
            scroller.set_viewport_size(size);
        }
    }

    fn set_viewport_range(&mut self, start: u64, end: u64) {
        if let Some(scroller) = self.scroller.as_mut() {
            scroller.set_viewport_range(start, end);
        }
    }

    fn handle_items_added(&mut self, detail: &AddDetail<D>) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        for i in 0..detail.keys.len() {
            let Some(data) = detail.data.get(i).cloned() else {
                continue;
            };
            let metadata = detail
                .metadata
                .as_ref()
                .and_then(|m| m.get(i))
                .cloned()
                .unwrap_or_else(|| RowMetadata::new(detail.keys[i].clone()));
            if !verify_key(&metadata.key) {
                tracing::error!(key = %metadata.key, "ignoring added row with invalid key");
                continue;
            }
            let index = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .copied()
                .or_else(|| {
                    detail
                        .add_before_keys
                        .as_ref()
                        .and_then(|v| v.get(i))
                        .and_then(|before| match before {
                            Some(key) => {
                                position_of(buffer, key).map(|pos| buffer.start_index + pos)
                            }
                            None => Some(buffer.end_index()),
                        })
                });
            match index {
                Some(index) => {
                    if let Some(scroller) = self.scroller.as_mut() {
                        scroller.handle_items_added(&[index]);
                    }
                    if index < buffer.start_index {
                        buffer.start_index += 1;
                        self.out_of_range.push(Row { data, metadata });
                    } else if index <= buffer.end_index() {
                        buffer.insert(index - buffer.start_index, data, metadata);
                    } else {
                        self.out_of_range.push(Row { data, metadata });
                    }
                }
                // position unknown: appending is only safe once the whole
                // collection is buffered
                None if buffer.done && !buffer.max_count_limit => {
                    let index = buffer.end_index();
                    if let Some(scroller) = self.scroller.as_mut() {
                        scroller.handle_items_added(&[index]);
                    }
                    let pos = buffer.len();
                    buffer.insert(pos, data, metadata);
                }
                None => {}
            }
        }
    }

    fn handle_items_removed(&mut self, detail: &RemoveDetail) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        let mut resolved = Vec::new();
        for i in 0..detail.keys.len() {
            let index = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .copied()
                .or_else(|| {
                    position_of(buffer, &detail.keys[i]).map(|pos| buffer.start_index + pos)
                });
            match index {
                Some(index) => resolved.push(index),
                None => {
                    let key = &detail.keys[i];
                    self.out_of_range.retain(|row| &row.metadata.key != key);
                }
            }
        }
        // pre-mutation indexes stay valid when applied back to front
        resolved.sort_unstable();
        for &index in resolved.iter().rev() {
            if let Some(scroller) = self.scroller.as_mut() {
                scroller.handle_items_removed(&[index]);
            }
            if index < buffer.start_index {
                buffer.start_index -= 1;
            } else if index < buffer.end_index() {
                buffer.remove(index - buffer.start_index, 1);
            }
        }
    }

    fn handle_items_updated(&mut self, detail: &UpdateDetail<D>) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        for i in 0..detail.keys.len() {
            let Some(data) = detail.data.get(i).cloned() else {
                continue;
            };
            let pos = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .and_then(|&index| index.checked_sub(buffer.start_index))
                .filter(|&pos| pos < buffer.len())
                .or_else(|| position_of(buffer, &detail.keys[i]));
            match pos {
                Some(pos) => {
                    buffer.data[pos] = data;
                    if let Some(metadata) = detail.metadata.as_ref().and_then(|m| m.get(i)) {
                        buffer.metadata[pos] = metadata.clone();
                    }
                }
                None => {
                    let key = &detail.keys[i];
                    if let Some(row) = self
                        .out_of_range
                        .iter_mut()
                        .find(|row| &row.metadata.key == key)
                    {
                        row.data = data;
                    }
                }
            }
        }
    }

    async fn handle_model_refresh(&mut self) -> Result<(), FetchError> {
        self.fetch_rows().await
    }

    fn destroy(&mut self) {
        self.buffer = None;
        self.out_of_range.clear();
        self.scroller = None;
        self.pending_iterator = None;
        self.fetching = false;
    }
}

impl<D> std::fmt::Debug for FlatContentCoordinator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatContentCoordinator")
            .field("options", &self.options)
            .field("buffered", &self.buffer.as_ref().map(FetchBuffer::len))
            .field("out_of_range", &self.out_of_range.len())
            .field("fetching", &self.fetching)
            .finish_non_exhaustive()
    }
}

fn position_of<D>(buffer: &FetchBuffer<D, RowMetadata>, key: &RowKey) -> Option<usize> {
    buffer.metadata.iter().position(|m| &m.key == key)
}

fn key_violation(metadata: &[RowMetadata]) -> Option<FetchError> {
    metadata
        .iter()
        .find(|m| !verify_key(&m.key))
        .map(|m| FetchError::InvalidKey(m.key.to_string()))
}

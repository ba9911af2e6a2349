use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use scrollfetch::{
    FetchError, FetchOutcome, IteratorPage, PageFuture, PagedIterator, ScrollResult,
    ScrollerOptions, ViewportScroller,
};
use serde::{Deserialize, Serialize};

use crate::buffer::{FetchBuffer, RenderState, Row};
use crate::coordinator::{ContentCoordinator, ContentOptions};
use crate::events::{AddDetail, RemoveDetail, UpdateDetail};
use crate::provider::{DataProvider, FetchOptions, RowKey, RowMetadata, verify_key};

/// Milliseconds a view should wait before showing a loading affordance for
/// a pending expansion, so fast expansions never flash one.
pub const EXPAND_LOADING_DELAY_MS: u64 = 250;

/// Metadata decorating each row of a flattened tree.
///
/// The flattened order is strict pre-order: a row's descendants always
/// occupy the contiguous block immediately following it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRowMetadata {
    pub key: RowKey,
    /// `None` for root-level rows.
    pub parent_key: Option<RowKey>,
    /// Position among the row's siblings.
    pub index_from_parent: usize,
    /// Root rows are at depth 0.
    pub tree_depth: usize,
    pub is_leaf: bool,
    pub expanded: bool,
}

/// Unconsumed remainder of the last page pulled for one parent.
struct PageCache<D> {
    data: Vec<D>,
    metadata: Vec<RowMetadata>,
    pos: usize,
}

/// Fetch state for one parent's children (`None` parent = root level).
/// The level is exhausted when both `iterator` and `cache` are gone.
struct CacheEntry<D> {
    parent: Option<RowKey>,
    provider: Rc<dyn DataProvider<D>>,
    iterator: Option<Box<dyn PagedIterator<D, RowMetadata>>>,
    cache: Option<PageCache<D>>,
    /// Rows emitted at this level so far; the next row's `index_from_parent`.
    emitted: usize,
}

/// Traversal and cache state shared between the coordinator and the
/// load-more iterator handed to the scroller.
struct TreeState<D> {
    fetch_size: usize,
    fetch_options: FetchOptions,
    entries: Vec<CacheEntry<D>>,
    /// Pre-order traversal position: the chain of parents whose children
    /// are still being emitted. Empty once the visible tree is drained.
    stack: Vec<Option<RowKey>>,
    /// Keys whose subtrees are expanded. Collapse removes only the
    /// collapsed key; descendants keep their flags so re-expanding
    /// restores the previous nested state.
    expanded: Vec<RowKey>,
}

impl<D: Clone> TreeState<D> {
    fn entry_index(&self, parent: &Option<RowKey>) -> Option<usize> {
        self.entries.iter().position(|e| &e.parent == parent)
    }

    fn ensure_child_entry(&mut self, key: &RowKey, provider: Rc<dyn DataProvider<D>>) {
        if self.entries.iter().any(|e| e.parent.as_ref() == Some(key)) {
            return;
        }
        let iterator = provider.fetch_first(self.fetch_options);
        self.entries.push(CacheEntry {
            parent: Some(key.clone()),
            provider,
            iterator: Some(iterator),
            cache: None,
            emitted: 0,
        });
    }

    /// Next row of one level, pulling follow-up pages transparently. `None`
    /// once the level is exhausted.
    async fn next_row(&mut self, entry: usize) -> Result<Option<(D, RowMetadata)>, FetchError> {
        loop {
            let e = &mut self.entries[entry];
            if let Some(cache) = e.cache.as_mut() {
                if cache.pos < cache.data.len() {
                    let data = cache.data[cache.pos].clone();
                    let metadata = cache.metadata[cache.pos].clone();
                    cache.pos += 1;
                    if cache.pos == cache.data.len() {
                        e.cache = None;
                    }
                    e.emitted += 1;
                    return Ok(Some((data, metadata)));
                }
                e.cache = None;
            }
            let page = {
                let Some(iterator) = e.iterator.as_mut() else {
                    return Ok(None);
                };
                iterator.next().await?
            };
            let e = &mut self.entries[entry];
            if page.done {
                e.iterator = None;
            }
            if page.data.is_empty() {
                if e.iterator.is_none() {
                    return Ok(None);
                }
                continue;
            }
            e.cache = Some(PageCache {
                data: page.data,
                metadata: page.metadata,
                pos: 0,
            });
        }
    }

    /// Emits rows in strict pre-order starting from the parent chain on
    /// `stack`, descending into expanded rows, until `limit` rows have been
    /// produced or the stack runs dry. The stack is left at the traversal
    /// position so a later call resumes exactly where this one stopped.
    async fn drain(
        &mut self,
        stack: &mut Vec<Option<RowKey>>,
        base_depth: usize,
        limit: Option<usize>,
        out: &mut Vec<(D, TreeRowMetadata)>,
    ) -> Result<(), FetchError> {
        while let Some(parent) = stack.last().cloned() {
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
            let Some(entry) = self.entry_index(&parent) else {
                stack.pop();
                continue;
            };
            let Some((data, metadata)) = self.next_row(entry).await? else {
                stack.pop();
                continue;
            };
            if !verify_key(&metadata.key) {
                return Err(FetchError::InvalidKey(metadata.key.to_string()));
            }
            let index_from_parent = self.entries[entry].emitted - 1;
            let tree_depth = base_depth + stack.len() - 1;
            let child = self.entries[entry].provider.child_provider(&metadata.key);
            let is_leaf = child.is_none();
            let expanded = !is_leaf && self.expanded.contains(&metadata.key);
            out.push((
                data,
                TreeRowMetadata {
                    key: metadata.key.clone(),
                    parent_key: parent.clone(),
                    index_from_parent,
                    tree_depth,
                    is_leaf,
                    expanded,
                },
            ));
            if expanded {
                if let Some(provider) = child {
                    self.ensure_child_entry(&metadata.key, provider);
                    stack.push(Some(metadata.key));
                }
            }
        }
        Ok(())
    }
}

/// Feeds the scroller from the shared traversal state, one pre-order batch
/// per pull.
struct TreeLoadMoreIterator<D> {
    state: Rc<RefCell<TreeState<D>>>,
}

impl<D: Clone> PagedIterator<D, TreeRowMetadata> for TreeLoadMoreIterator<D> {
    fn next(&mut self) -> PageFuture<'_, D, TreeRowMetadata> {
        let state = Rc::clone(&self.state);
        Box::pin(async move {
            let mut state = state.borrow_mut();
            let limit = Some(state.fetch_size);
            let mut stack = mem::take(&mut state.stack);
            let mut out = Vec::new();
            let result = state.drain(&mut stack, 0, limit, &mut out).await;
            state.stack = stack;
            result?;
            let done = state.stack.is_empty();
            let mut data = Vec::with_capacity(out.len());
            let mut metadata = Vec::with_capacity(out.len());
            for (d, m) in out {
                data.push(d);
                metadata.push(m);
            }
            Ok(IteratorPage {
                done,
                data,
                metadata,
                max_count_limit: false,
            })
        })
    }
}

/// Coordinates incremental fetching, expansion and mutation tracking for a
/// hierarchical collection rendered as a flattened pre-order list.
pub struct TreeContentCoordinator<D> {
    provider: Rc<dyn DataProvider<D>>,
    options: ContentOptions,
    state: Rc<RefCell<TreeState<D>>>,
    buffer: Option<FetchBuffer<D, TreeRowMetadata>>,
    out_of_range: Vec<Row<D, TreeRowMetadata>>,
    scroller: Option<ViewportScroller<D, TreeRowMetadata>>,
    /// Keys with an expansion pending, including leaf rows that became
    /// expandable through an update and await their first child fetch.
    expanding: Vec<RowKey>,
    fetching: bool,
}

impl<D: Clone + 'static> TreeContentCoordinator<D> {
    pub fn new(provider: Rc<dyn DataProvider<D>>, options: ContentOptions) -> Self {
        Self::with_expanded_keys(provider, options, Vec::new())
    }

    /// Like [`new`](Self::new), with keys whose subtrees are drained inline
    /// (already expanded) during the initial fetch.
    pub fn with_expanded_keys(
        provider: Rc<dyn DataProvider<D>>,
        options: ContentOptions,
        expanded_keys: Vec<RowKey>,
    ) -> Self {
        let fetch_options = FetchOptions {
            size: options.load_more_on_scroll.then_some(options.fetch_size),
        };
        let state = TreeState {
            fetch_size: options.fetch_size,
            fetch_options,
            entries: Vec::new(),
            stack: Vec::new(),
            expanded: expanded_keys,
        };
        Self {
            provider,
            options,
            state: Rc::new(RefCell::new(state)),
            buffer: None,
            out_of_range: Vec::new(),
            scroller: None,
            expanding: Vec::new(),
            fetching: false,
        }
    }

    pub fn options(&self) -> &ContentOptions {
        &self.options
    }

    /// Expands `key`: fetches its entire child subtree and splices it
    /// directly after the parent row in one insertion. No-op for leaves,
    /// unknown keys and already expanded rows. A failed child fetch leaves
    /// the buffer untouched.
    pub async fn expand(&mut self, key: &RowKey) -> Result<(), FetchError> {
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(());
        };
        let Some(pos) = position_of(buffer, key) else {
            return Ok(());
        };
        let meta = buffer.metadata[pos].clone();
        if meta.is_leaf || meta.expanded {
            return Ok(());
        }
        let Some(provider) = self.level_provider(&meta.parent_key) else {
            return Ok(());
        };
        let Some(child_provider) = provider.child_provider(key) else {
            return Ok(());
        };

        if !self.expanding.contains(key) {
            self.expanding.push(key.clone());
        }
        let mut out = Vec::new();
        let result = {
            let mut state = self.state.borrow_mut();
            if !state.expanded.contains(key) {
                state.expanded.push(key.clone());
            }
            // drop any stale entry left by an earlier expansion
            state.entries.retain(|e| e.parent.as_ref() != Some(key));
            let iterator = child_provider.fetch_first(state.fetch_options);
            state.entries.push(CacheEntry {
                parent: Some(key.clone()),
                provider: child_provider,
                iterator: Some(iterator),
                cache: None,
                emitted: 0,
            });
            let mut stack = vec![Some(key.clone())];
            state
                .drain(&mut stack, meta.tree_depth + 1, None, &mut out)
                .await
        };
        self.expanding.retain(|k| k != key);
        if let Err(err) = result {
            let mut state = self.state.borrow_mut();
            state.expanded.retain(|k| k != key);
            state.entries.retain(|e| e.parent.as_ref() != Some(key));
            tracing::error!(error = %err, "expand failed");
            return Err(err);
        }

        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(());
        };
        buffer.metadata[pos].expanded = true;
        let global = buffer.start_index + pos + 1;
        let indexes: Vec<usize> = (global..global + out.len()).collect();
        if let Some(scroller) = self.scroller.as_mut() {
            scroller.handle_items_added(&indexes);
        }
        for (offset, (data, metadata)) in out.into_iter().enumerate() {
            buffer.insert(pos + 1 + offset, data, metadata);
        }
        Ok(())
    }

    /// Collapses `key`, removing its contiguous descendant block in one
    /// removal. Descendants keep their expanded flags; re-expanding
    /// restores the nested state they had.
    pub fn collapse(&mut self, key: &RowKey) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        let Some(pos) = position_of(buffer, key) else {
            return;
        };
        if !buffer.metadata[pos].expanded {
            return;
        }
        let depth = buffer.metadata[pos].tree_depth;
        let count = buffer.metadata[pos + 1..]
            .iter()
            .take_while(|m| m.tree_depth > depth)
            .count();
        let removed_keys: Vec<RowKey> = buffer.metadata[pos + 1..pos + 1 + count]
            .iter()
            .map(|m| m.key.clone())
            .collect();

        let global = buffer.start_index + pos + 1;
        if let Some(scroller) = self.scroller.as_mut() {
            scroller.handle_items_removed(&vec![global; count]);
        }
        buffer.remove(pos + 1, count);
        buffer.metadata[pos].expanded = false;

        let mut state = self.state.borrow_mut();
        state.expanded.retain(|k| k != key);
        state.entries.retain(|e| match &e.parent {
            Some(parent) => parent != key && !removed_keys.contains(parent),
            None => true,
        });
        // prune traversal frames that pointed into the removed subtree
        let in_subtree = |frame: &Option<RowKey>| match frame {
            Some(frame) => frame == key || removed_keys.contains(frame),
            None => false,
        };
        if let Some(i) = state.stack.iter().position(in_subtree) {
            state.stack.truncate(i);
        }
    }

    async fn fetch_initial(&mut self) -> Result<(), FetchError> {
        let limit = self.options.load_more_on_scroll.then_some(self.options.fetch_size);
        let mut out = Vec::new();
        let result = {
            let mut state = self.state.borrow_mut();
            state.entries.clear();
            let iterator = self.provider.fetch_first(state.fetch_options);
            state.entries.push(CacheEntry {
                parent: None,
                provider: Rc::clone(&self.provider),
                iterator: Some(iterator),
                cache: None,
                emitted: 0,
            });
            let mut stack = vec![None];
            let result = state.drain(&mut stack, 0, limit, &mut out).await;
            state.stack = stack;
            result
        };
        if let Err(err) = result {
            if matches!(err, FetchError::InvalidKey(_)) {
                tracing::error!(error = %err, "discarding fetched batch");
                self.fail_closed();
            } else {
                tracing::error!(error = %err, "tree fetch failed; keeping previous rows");
            }
            return Err(err);
        }
        let mut buffer = FetchBuffer::new();
        buffer.done = self.state.borrow().stack.is_empty();
        for (data, metadata) in out {
            buffer.data.push(data);
            buffer.metadata.push(metadata);
        }
        self.buffer = Some(buffer);
        self.out_of_range.clear();
        self.scroller = None;
        self.expanding.clear();
        Ok(())
    }

    /// Fail-closed reset after a key-contract violation: the batch (and
    /// anything already buffered) is discarded.
    fn fail_closed(&mut self) {
        self.buffer = Some(FetchBuffer {
            done: true,
            ..FetchBuffer::new()
        });
        self.out_of_range.clear();
        self.scroller = None;
        self.expanding.clear();
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.stack.clear();
    }

    fn register_scroller(&mut self) {
        if self.scroller.is_some() || !self.options.load_more_on_scroll {
            return;
        }
        let Some(buffer) = &self.buffer else { return };
        if buffer.done || buffer.max_count_limit {
            return;
        }
        let iterator = Box::new(TreeLoadMoreIterator {
            state: Rc::clone(&self.state),
        });
        let options = ScrollerOptions::new()
            .with_fetch_size(self.options.fetch_size)
            .with_max_count(self.options.max_count)
            .with_initial_row_count(buffer.len());
        self.scroller = Some(ViewportScroller::new(iterator, options));
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome<D, TreeRowMetadata>) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.data.extend(outcome.data);
            buffer.metadata.extend(outcome.metadata);
            buffer.done = outcome.status.done;
            buffer.max_count_limit = outcome.status.max_count_limit;
        }
    }

    /// The provider owning the level whose parent is `parent`.
    fn level_provider(&self, parent: &Option<RowKey>) -> Option<Rc<dyn DataProvider<D>>> {
        match parent {
            None => Some(Rc::clone(&self.provider)),
            Some(_) => {
                let state = self.state.borrow();
                state
                    .entry_index(parent)
                    .map(|i| Rc::clone(&state.entries[i].provider))
            }
        }
    }

    fn is_leaf_key(&self, parent: &Option<RowKey>, key: &RowKey) -> bool {
        self.level_provider(parent)
            .is_none_or(|provider| provider.child_provider(key).is_none())
    }

    /// Where an added row belongs: buffer position, parent, sibling index
    /// and depth. `None` when the position cannot be resolved.
    fn resolve_add_position(
        &self,
        detail: &AddDetail<D>,
        i: usize,
    ) -> Option<(usize, Option<RowKey>, usize, usize)> {
        let buffer = self.buffer.as_ref()?;
        // an explicit before-key names the exact position and wins over the
        // per-parent offset
        if let Some(before) = detail.add_before_keys.as_ref().and_then(|v| v.get(i)) {
            return match before {
                Some(before_key) => {
                    let pos = position_of(buffer, before_key)?;
                    let meta = &buffer.metadata[pos];
                    Some((
                        pos,
                        meta.parent_key.clone(),
                        meta.index_from_parent,
                        meta.tree_depth,
                    ))
                }
                None => Some((buffer.len(), None, root_count(buffer), 0)),
            };
        }
        if let Some(parent) = detail.parent_keys.as_ref().and_then(|v| v.get(i)) {
            let (walk_from, parent_depth) = match parent {
                Some(parent_key) => {
                    let parent_pos = position_of(buffer, parent_key)?;
                    (parent_pos + 1, Some(buffer.metadata[parent_pos].tree_depth))
                }
                None => (0, None),
            };
            let child_depth = parent_depth.map_or(0, |d| d + 1);
            let offset = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .copied()
                .unwrap_or(usize::MAX);
            let mut siblings = 0;
            let mut pos = walk_from;
            for (j, meta) in buffer.metadata.iter().enumerate().skip(walk_from) {
                if parent_depth.is_some_and(|d| meta.tree_depth <= d) {
                    break;
                }
                if meta.tree_depth == child_depth {
                    if siblings == offset {
                        pos = j;
                        break;
                    }
                    siblings += 1;
                }
                pos = j + 1;
            }
            return Some((pos, parent.clone(), siblings.min(offset), child_depth));
        }
        if let Some(&index) = detail.indexes.as_ref().and_then(|v| v.get(i)) {
            let pos = index.saturating_sub(buffer.start_index);
            return if pos < buffer.len() {
                let meta = &buffer.metadata[pos];
                Some((
                    pos,
                    meta.parent_key.clone(),
                    meta.index_from_parent,
                    meta.tree_depth,
                ))
            } else {
                Some((buffer.len(), None, root_count(buffer), 0))
            };
        }
        if buffer.done && !buffer.max_count_limit {
            return Some((buffer.len(), None, root_count(buffer), 0));
        }
        None
    }
}

impl<D: Clone + 'static> ContentCoordinator<D> for TreeContentCoordinator<D> {
    type Metadata = TreeRowMetadata;

    async fn fetch_rows(&mut self) -> Result<(), FetchError> {
        if self.fetching {
            return Ok(());
        }
        self.fetching = true;
        let result = self.fetch_initial().await;
        self.fetching = false;
        result
    }

    fn render(&mut self) -> RenderState<D, TreeRowMetadata> {
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
            expanding_keys: self.expanding.clone(),
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
            ScrollResult::Fetched(outcome) => {
                self.apply_fetch(outcome);
                Ok(())
            }
            ScrollResult::Failed(err) => {
                if matches!(err, FetchError::InvalidKey(_)) {
                    tracing::error!(error = %err, "discarding fetched batch");
                    self.fail_closed();
                }
                Err(err)
            }
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
        for i in 0..detail.keys.len() {
            let Some(data) = detail.data.get(i).cloned() else {
                continue;
            };
            let key = detail.keys[i].clone();
            if !verify_key(&key) {
                tracing::error!(key = %key, "ignoring added row with invalid key");
                continue;
            }
            let Some((pos, parent_key, index_from_parent, tree_depth)) =
                self.resolve_add_position(detail, i)
            else {
                continue;
            };
            let is_leaf = self.is_leaf_key(&parent_key, &key);
            let metadata = TreeRowMetadata {
                key,
                parent_key,
                index_from_parent,
                tree_depth,
                is_leaf,
                expanded: false,
            };
            let Some(buffer) = self.buffer.as_mut() else {
                return;
            };
            let global = buffer.start_index + pos;
            if let Some(scroller) = self.scroller.as_mut() {
                scroller.handle_items_added(&[global]);
            }
            buffer.insert(pos, data, metadata);
        }
    }

    fn handle_items_removed(&mut self, detail: &RemoveDetail) {
        for i in 0..detail.keys.len() {
            let key = &detail.keys[i];
            let Some(buffer) = self.buffer.as_mut() else {
                return;
            };
            let pos = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .and_then(|&index| index.checked_sub(buffer.start_index))
                .filter(|&pos| pos < buffer.len())
                .or_else(|| position_of(buffer, key));
            let Some(pos) = pos else {
                self.out_of_range.retain(|row| &row.metadata.key != key);
                continue;
            };
            // a removed row takes its contiguous descendant block with it
            let depth = buffer.metadata[pos].tree_depth;
            let descendants = buffer.metadata[pos + 1..]
                .iter()
                .take_while(|m| m.tree_depth > depth)
                .count();
            let count = 1 + descendants;
            let removed_keys: Vec<RowKey> = buffer.metadata[pos..pos + count]
                .iter()
                .map(|m| m.key.clone())
                .collect();

            let global = buffer.start_index + pos;
            if let Some(scroller) = self.scroller.as_mut() {
                scroller.handle_items_removed(&vec![global; count]);
            }
            buffer.remove(pos, count);

            self.expanding.retain(|k| !removed_keys.contains(k));
            let mut state = self.state.borrow_mut();
            state.expanded.retain(|k| !removed_keys.contains(k));
            state.entries.retain(|e| match &e.parent {
                Some(parent) => !removed_keys.contains(parent),
                None => true,
            });
            let in_subtree =
                |frame: &Option<RowKey>| frame.as_ref().is_some_and(|f| removed_keys.contains(f));
            if let Some(j) = state.stack.iter().position(in_subtree) {
                state.stack.truncate(j);
            }
        }
    }

    fn handle_items_updated(&mut self, detail: &UpdateDetail<D>) {
        for i in 0..detail.keys.len() {
            let Some(data) = detail.data.get(i).cloned() else {
                continue;
            };
            let key = detail.keys[i].clone();
            let Some(buffer) = self.buffer.as_ref() else {
                return;
            };
            let pos = detail
                .indexes
                .as_ref()
                .and_then(|v| v.get(i))
                .and_then(|&index| index.checked_sub(buffer.start_index))
                .filter(|&pos| pos < buffer.len())
                .or_else(|| position_of(buffer, &key));
            let Some(pos) = pos else {
                if let Some(row) = self
                    .out_of_range
                    .iter_mut()
                    .find(|row| row.metadata.key == key)
                {
                    row.data = data;
                }
                continue;
            };
            let parent_key = buffer.metadata[pos].parent_key.clone();
            let was_leaf = buffer.metadata[pos].is_leaf;
            let is_leaf = self.is_leaf_key(&parent_key, &key);
            let Some(buffer) = self.buffer.as_mut() else {
                return;
            };
            buffer.data[pos] = data;
            let meta = &mut buffer.metadata[pos];
            meta.is_leaf = is_leaf;
            if is_leaf {
                meta.expanded = false;
            }
            // a leaf that grew children gets an expansion affordance in a
            // pending state until the view asks for the actual expand
            if was_leaf && !is_leaf && !self.expanding.contains(&key) {
                self.expanding.push(key);
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
        self.expanding.clear();
        self.fetching = false;
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.stack.clear();
        state.expanded.clear();
    }
}

impl<D> std::fmt::Debug for TreeContentCoordinator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeContentCoordinator")
            .field("options", &self.options)
            .field("buffered", &self.buffer.as_ref().map(FetchBuffer::len))
            .field("expanding", &self.expanding)
            .field("fetching", &self.fetching)
            .finish_non_exhaustive()
    }
}

fn position_of<D>(buffer: &FetchBuffer<D, TreeRowMetadata>, key: &RowKey) -> Option<usize> {
    buffer.metadata.iter().position(|m| &m.key == key)
}

fn root_count<D>(buffer: &FetchBuffer<D, TreeRowMetadata>) -> usize {
    buffer.metadata.iter().filter(|m| m.tree_depth == 0).count()
}

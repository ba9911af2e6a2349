use crate::provider::RowKey;

/// The contiguous slice of the source collection a coordinator currently
/// holds.
///
/// `data` and `metadata` are parallel arrays covering the half-open global
/// index range `start_index..start_index + data.len()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchBuffer<D, M> {
    pub start_index: usize,
    /// The source reported no more rows.
    pub done: bool,
    /// The configured maximum row count was reached.
    pub max_count_limit: bool,
    pub data: Vec<D>,
    pub metadata: Vec<M>,
}

impl<D, M> FetchBuffer<D, M> {
    pub fn new() -> Self {
        Self {
            start_index: 0,
            done: false,
            max_count_limit: false,
            data: Vec::new(),
            metadata: Vec::new(),
        }
    }

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

    /// Global index just past the last buffered row.
    pub fn end_index(&self) -> usize {
        self.start_index + self.data.len()
    }

    /// Inserts a row at a buffer-local position.
    pub fn insert(&mut self, pos: usize, data: D, metadata: M) {
        self.data.insert(pos, data);
        self.metadata.insert(pos, metadata);
    }

    /// Removes `count` rows starting at a buffer-local position.
    pub fn remove(&mut self, pos: usize, count: usize) {
        self.data.drain(pos..pos + count);
        self.metadata.drain(pos..pos + count);
    }

    /// A fresh snapshot of the buffered rows.
    pub fn rows(&self) -> Vec<Row<D, M>>
    where
        D: Clone,
        M: Clone,
    {
        self.data
            .iter()
            .zip(&self.metadata)
            .map(|(data, metadata)| Row {
                data: data.clone(),
                metadata: metadata.clone(),
            })
            .collect()
    }
}

/// One row paired with its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Row<D, M> {
    pub data: D,
    pub metadata: M,
}

/// What the view should currently show. Always a fresh clone of the
/// coordinator's state; mutating it has no effect on the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState<D, M> {
    /// Cached rows that fell outside the buffered range, rendered ahead of
    /// the in-range rows.
    pub out_of_range: Vec<Row<D, M>>,
    pub rows: Vec<Row<D, M>>,
    /// Loading placeholders to append after the rows; zero once the source
    /// is exhausted or capped.
    pub placeholders: usize,
    /// Keys with an expansion pending, for views that show an expand
    /// affordance in a loading state.
    pub expanding_keys: Vec<RowKey>,
}

use std::rc::Rc;

use scrollfetch::PagedIterator;

/// A row's identity as supplied by the data source.
///
/// Sources hand keys over as arbitrary JSON payloads; only strings and
/// numbers satisfy the key contract. See [`verify_key`].
pub type RowKey = serde_json::Value;

/// Whether a key satisfies the row-key contract.
///
/// Anything other than a string or a number (objects, arrays, booleans,
/// null) is a data-contract violation. Violations are fail-closed: the
/// coordinators discard the entire batch a bad key arrived in.
pub fn verify_key(key: &RowKey) -> bool {
    key.is_string() || key.is_number()
}

/// Per-row metadata yielded by a [`DataProvider`]'s iterator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RowMetadata {
    pub key: RowKey,
}

impl RowMetadata {
    pub fn new(key: RowKey) -> Self {
        Self { key }
    }
}

/// What a coordinator asks of [`DataProvider::fetch_first`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Target number of rows for the first batch. `None` requests
    /// everything up front (the unbounded mode); providers are free to
    /// page the result internally either way.
    pub size: Option<usize>,
}

/// An asynchronous source of rows.
///
/// A provider describes one level of data: the iterator returned by
/// [`fetch_first`](Self::fetch_first) yields that level's rows, and
/// [`child_provider`](Self::child_provider) descends one level for tree
/// sources. Flat sources leave the default `child_provider`.
pub trait DataProvider<D> {
    /// Starts iteration over this level's rows.
    ///
    /// The returned iterator must be safely pollable until a page reports
    /// `done`.
    fn fetch_first(&self, options: FetchOptions) -> Box<dyn PagedIterator<D, RowMetadata>>;

    /// The provider for `key`'s children, or `None` when the row is a leaf.
    fn child_provider(&self, key: &RowKey) -> Option<Rc<dyn DataProvider<D>>> {
        let _ = key;
        None
    }

    /// True when the provider controls its own page boundaries, in which
    /// case the initial fetch takes a single page as-is instead of
    /// concatenating pages up to the requested size.
    fn pages_internally(&self) -> bool {
        false
    }

    /// Total row count at this level, when the source knows it up front.
    fn total_size(&self) -> Option<usize> {
        None
    }
}

use serde::{Deserialize, Serialize};

use crate::provider::{RowKey, RowMetadata};

/// Rows inserted into the source collection.
///
/// Flat collections resolve positions from explicit pre-mutation `indexes`,
/// then from `add_before_keys`. Trees prefer `add_before_keys` (the exact
/// row to insert before), then `parent_keys` with `indexes` interpreted as
/// per-parent offsets, then `indexes` as global positions. Rows whose
/// position cannot be resolved are appended only once the collection is
/// fully fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddDetail<D> {
    pub indexes: Option<Vec<usize>>,
    /// For each row, the key of the row it should be inserted before;
    /// `Some(None)` means "at the end".
    pub add_before_keys: Option<Vec<Option<RowKey>>>,
    pub keys: Vec<RowKey>,
    pub data: Vec<D>,
    pub metadata: Option<Vec<RowMetadata>>,
    /// For tree sources, the parent under which each row is inserted;
    /// `Some(None)` means the root level.
    pub parent_keys: Option<Vec<Option<RowKey>>>,
}

impl<D> AddDetail<D> {
    pub fn new(keys: Vec<RowKey>, data: Vec<D>) -> Self {
        Self {
            indexes: None,
            add_before_keys: None,
            keys,
            data,
            metadata: None,
            parent_keys: None,
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<usize>) -> Self {
        self.indexes = Some(indexes);
        self
    }

    pub fn with_add_before_keys(mut self, keys: Vec<Option<RowKey>>) -> Self {
        self.add_before_keys = Some(keys);
        self
    }

    pub fn with_parent_keys(mut self, parent_keys: Vec<Option<RowKey>>) -> Self {
        self.parent_keys = Some(parent_keys);
        self
    }
}

/// Rows removed from the source collection, by pre-mutation index when
/// known, otherwise located by key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveDetail {
    pub indexes: Option<Vec<usize>>,
    pub keys: Vec<RowKey>,
}

impl RemoveDetail {
    pub fn new(keys: Vec<RowKey>) -> Self {
        Self { indexes: None, keys }
    }

    pub fn with_indexes(mut self, indexes: Vec<usize>) -> Self {
        self.indexes = Some(indexes);
        self
    }
}

/// Rows whose data (and optionally metadata) changed in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateDetail<D> {
    pub indexes: Option<Vec<usize>>,
    pub keys: Vec<RowKey>,
    pub data: Vec<D>,
    pub metadata: Option<Vec<RowMetadata>>,
}

impl<D> UpdateDetail<D> {
    pub fn new(keys: Vec<RowKey>, data: Vec<D>) -> Self {
        Self {
            indexes: None,
            keys,
            data,
            metadata: None,
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<usize>) -> Self {
        self.indexes = Some(indexes);
        self
    }
}

/// A composite mutation. Populated parts apply in add, remove, update
/// order; separate events apply in the order the source emits them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent<D> {
    pub add: Option<AddDetail<D>>,
    pub remove: Option<RemoveDetail>,
    pub update: Option<UpdateDetail<D>>,
}

impl<D> MutationEvent<D> {
    pub fn new() -> Self {
        Self {
            add: None,
            remove: None,
            update: None,
        }
    }
}

impl<D> Default for MutationEvent<D> {
    fn default() -> Self {
        Self::new()
    }
}

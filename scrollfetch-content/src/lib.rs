//! Content coordination on top of the `scrollfetch` engine.
//!
//! Where `scrollfetch` decides *when* to fetch from scroll geometry alone,
//! this crate owns *what* was fetched: it buffers rows pulled from a
//! [`DataProvider`], validates their keys, applies source mutations (adds,
//! removes, updates) to the buffer, and hands the view immutable
//! [`RenderState`] snapshots.
//!
//! Two coordinators share the [`ContentCoordinator`] surface:
//! - [`FlatContentCoordinator`] for flat collections,
//! - [`TreeContentCoordinator`] for hierarchical collections rendered as a
//!   flattened pre-order list, with expand/collapse.
#![forbid(unsafe_code)]

mod buffer;
mod coordinator;
mod events;
mod flat;
mod provider;
mod tree;


pub use buffer::{FetchBuffer, RenderState, Row};
pub use coordinator::{ContentCoordinator, ContentOptions};
pub use events::{AddDetail, MutationEvent, RemoveDetail, UpdateDetail};
pub use flat::FlatContentCoordinator;
pub use provider::{DataProvider, FetchOptions, RowKey, RowMetadata, verify_key};
pub use tree::{EXPAND_LOADING_DELAY_MS, TreeContentCoordinator, TreeRowMetadata};

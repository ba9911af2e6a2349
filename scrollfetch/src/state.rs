use crate::{FetchStatus, RenderedPoint};

/// A snapshot of a [`crate::ViewportScroller`]'s bookkeeping.
///
/// Useful for persisting the rendered-point history across adapter
/// re-mounts so a rebuilt view does not re-fetch ranges it already visited.
/// In-flight fetch and trigger state is deliberately not captured; a
/// restored scroller starts fresh on the next scroll event.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollerState {
    pub scroll_top: u64,
    pub max_scroll_top: u64,
    pub viewport_size: u32,
    pub current: RenderedPoint,
    pub rendered_points: Vec<RenderedPoint>,
    pub status: FetchStatus,
    pub row_count: usize,
}

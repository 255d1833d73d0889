use crate::{Rect, ScrollDirection};

/// A lightweight, serializable snapshot of the observed viewport.
///
/// The tracker keeps one per attached container. Before the first `attach`,
/// [`crate::TreeVirtualizer::viewport_state`] reports the configured initial rect and offset.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    pub rect: Rect,
    pub offset: u64,
    pub is_scrolling: bool,
    pub direction: Option<ScrollDirection>,
}

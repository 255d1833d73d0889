use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::virtualizer::TreeVirtualizer;
use crate::{NodeId, NodeRef, Range, Rect, TreeNode, VirtualItem};

/// A callback fired when the engine's state changes.
///
/// The second argument is `is_synchronous`: `true` for explicit mutations (toggle, selection,
/// measurement, ...), `false` for changes driven by the observed viewport.
pub type OnChangeCallback<T> = Arc<dyn Fn(&TreeVirtualizer<T>, bool) + Send + Sync>;

/// Reads the display value of a node.
pub type Accessor<T> = Arc<dyn Fn(&TreeNode<T>) -> String + Send + Sync>;

/// Estimated size of the visible item at an index, used until the item is measured.
pub type EstimateSize = Arc<dyn Fn(usize) -> u32 + Send + Sync>;

/// A hook that decides whether to adjust the scroll position when an item size changes.
///
/// Receives the item before the change and the size delta. Without a hook, the position is
/// adjusted when the item starts above the current scroll offset.
pub type ShouldAdjustScrollPositionOnItemSizeChangeCallback<T> =
    Arc<dyn Fn(&TreeVirtualizer<T>, &VirtualItem, i64) -> bool + Send + Sync>;

pub type CustomItemKey<T> = Arc<dyn Fn(usize, &TreeNode<T>) -> NodeId + Send + Sync>;

/// How visible items are keyed (and therefore how measurements are cached).
pub enum ItemKeys<T> {
    /// The visible index. Measurements stay with the position, not the node.
    Index,
    /// The node id. Measurements follow nodes across expand/collapse.
    NodeId,
    Custom(CustomItemKey<T>),
}

impl<T> ItemKeys<T> {
    pub(crate) fn key(&self, index: usize, node: &TreeNode<T>) -> NodeId {
        match self {
            Self::Index => NodeId::from(index),
            Self::NodeId => node.id.clone(),
            Self::Custom(f) => f(index, node),
        }
    }
}

impl<T> Clone for ItemKeys<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Index => Self::Index,
            Self::NodeId => Self::NodeId,
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<T> Default for ItemKeys<T> {
    fn default() -> Self {
        Self::Index
    }
}

impl<T> core::fmt::Debug for ItemKeys<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Index => f.write_str("Index"),
            Self::NodeId => f.write_str("NodeId"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Initial scroll offset configuration.
#[derive(Clone)]
pub enum InitialOffset {
    Value(u64),
    /// Evaluated when the engine is created and when it is re-enabled.
    Provider(Arc<dyn Fn() -> u64 + Send + Sync>),
}

impl InitialOffset {
    pub(crate) fn resolve(&self) -> u64 {
        match self {
            Self::Value(v) => *v,
            Self::Provider(f) => f(),
        }
    }
}

impl Default for InitialOffset {
    fn default() -> Self {
        Self::Value(0)
    }
}

impl core::fmt::Debug for InitialOffset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// Configuration for [`crate::TreeVirtualizer`].
///
/// Cheap to clone: the dataset and every closure live behind `Arc`s.
pub struct TreeVirtualizerOptions<T> {
    /// The tree records, in source order.
    pub data: Arc<[NodeRef<T>]>,
    pub accessor: Accessor<T>,
    pub estimate_size: EstimateSize,
    pub item_keys: ItemKeys<T>,
    /// Optional index selection hook (pinned rows, sticky headers, ...).
    ///
    /// Receives the strictly visible range plus `overscan` and `count`. Without it, the
    /// overscanned window is rendered.
    pub range_extractor: Option<crate::RangeExtractor>,

    /// When disabled, window queries return empty results and `attach` is refused.
    pub enabled: bool,
    /// Logs memo recomputation timings (requires the `tracing` feature).
    pub debug: bool,

    pub overscan: usize,
    /// Virtualizes along the x axis.
    pub horizontal: bool,
    /// Right-to-left layout: horizontal element offsets are negated.
    pub is_rtl: bool,

    /// Viewport rect used until a container is attached.
    pub initial_rect: Option<Rect>,

    pub padding_start: u32,
    pub padding_end: u32,

    /// Extra space kept around an item when computing scroll-to offsets.
    pub scroll_padding_start: u32,
    pub scroll_padding_end: u32,

    /// Where the list starts inside the scroll container.
    pub scroll_margin: u32,

    pub initial_offset: InitialOffset,

    /// Registered as the first change listener.
    pub on_change: Option<OnChangeCallback<T>>,

    /// Debounce for resetting `is_scrolling` on containers without a native scroll-end signal.
    pub is_scrolling_reset_delay_ms: u64,

    /// Attribute read by [`crate::TreeVirtualizer::index_from_element`].
    pub index_attribute: String,

    pub should_adjust_scroll_position_on_item_size_change:
        Option<ShouldAdjustScrollPositionOnItemSizeChangeCallback<T>>,

    /// Space between rows.
    pub gap: u32,
    /// Items per row.
    pub lanes: usize,
}

impl<T> Clone for TreeVirtualizerOptions<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            accessor: Arc::clone(&self.accessor),
            estimate_size: Arc::clone(&self.estimate_size),
            item_keys: self.item_keys.clone(),
            range_extractor: self.range_extractor.clone(),
            enabled: self.enabled,
            debug: self.debug,
            overscan: self.overscan,
            horizontal: self.horizontal,
            is_rtl: self.is_rtl,
            initial_rect: self.initial_rect,
            padding_start: self.padding_start,
            padding_end: self.padding_end,
            scroll_padding_start: self.scroll_padding_start,
            scroll_padding_end: self.scroll_padding_end,
            scroll_margin: self.scroll_margin,
            initial_offset: self.initial_offset.clone(),
            on_change: self.on_change.clone(),
            is_scrolling_reset_delay_ms: self.is_scrolling_reset_delay_ms,
            index_attribute: self.index_attribute.clone(),
            should_adjust_scroll_position_on_item_size_change: self
                .should_adjust_scroll_position_on_item_size_change
                .clone(),
            gap: self.gap,
            lanes: self.lanes,
        }
    }
}

impl<T> TreeVirtualizerOptions<T> {
    /// Creates options for `data` (flat records, possibly carrying inline children).
    ///
    /// `accessor` returns the text shown for a node.
    pub fn new(
        data: impl IntoIterator<Item = TreeNode<T>>,
        accessor: impl Fn(&TreeNode<T>) -> String + Send + Sync + 'static,
    ) -> Self {
        let data: Vec<NodeRef<T>> = data.into_iter().map(Arc::new).collect();
        Self::from_shared(Arc::from(data), accessor)
    }

    /// Like [`Self::new`], for records that are already shared.
    pub fn from_shared(
        data: Arc<[NodeRef<T>]>,
        accessor: impl Fn(&TreeNode<T>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            data,
            accessor: Arc::new(accessor),
            estimate_size: Arc::new(|_| 1),
            item_keys: ItemKeys::Index,
            range_extractor: None,
            enabled: true,
            debug: false,
            overscan: 1,
            horizontal: false,
            is_rtl: false,
            initial_rect: None,
            padding_start: 0,
            padding_end: 0,
            scroll_padding_start: 0,
            scroll_padding_end: 0,
            scroll_margin: 0,
            initial_offset: InitialOffset::default(),
            on_change: None,
            is_scrolling_reset_delay_ms: 150,
            index_attribute: String::from("data-index"),
            should_adjust_scroll_position_on_item_size_change: None,
            gap: 0,
            lanes: 1,
        }
    }

    pub fn with_estimate_size(
        mut self,
        estimate_size: impl Fn(usize) -> u32 + Send + Sync + 'static,
    ) -> Self {
        self.estimate_size = Arc::new(estimate_size);
        self
    }

    pub fn with_item_keys(mut self, item_keys: ItemKeys<T>) -> Self {
        self.item_keys = item_keys;
        self
    }

    pub fn with_custom_item_key(
        mut self,
        key: impl Fn(usize, &TreeNode<T>) -> NodeId + Send + Sync + 'static,
    ) -> Self {
        self.item_keys = ItemKeys::Custom(Arc::new(key));
        self
    }

    pub fn with_range_extractor(
        mut self,
        range_extractor: Option<impl Fn(Range) -> Vec<usize> + Send + Sync + 'static>,
    ) -> Self {
        self.range_extractor = range_extractor.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_is_rtl(mut self, is_rtl: bool) -> Self {
        self.is_rtl = is_rtl;
        self
    }

    pub fn with_initial_rect(mut self, initial_rect: Option<Rect>) -> Self {
        self.initial_rect = initial_rect;
        self
    }

    pub fn with_padding(mut self, padding_start: u32, padding_end: u32) -> Self {
        self.padding_start = padding_start;
        self.padding_end = padding_end;
        self
    }

    pub fn with_scroll_padding(
        mut self,
        scroll_padding_start: u32,
        scroll_padding_end: u32,
    ) -> Self {
        self.scroll_padding_start = scroll_padding_start;
        self.scroll_padding_end = scroll_padding_end;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u32) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_initial_offset(mut self, initial_offset: InitialOffset) -> Self {
        self.initial_offset = initial_offset;
        self
    }

    pub fn with_initial_offset_value(mut self, initial_offset: u64) -> Self {
        self.initial_offset = InitialOffset::Value(initial_offset);
        self
    }

    pub fn with_initial_offset_provider(
        mut self,
        initial_offset: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.initial_offset = InitialOffset::Provider(Arc::new(initial_offset));
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&TreeVirtualizer<T>, bool) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_is_scrolling_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.is_scrolling_reset_delay_ms = delay_ms;
        self
    }

    pub fn with_index_attribute(mut self, name: impl Into<String>) -> Self {
        self.index_attribute = name.into();
        self
    }

    pub fn with_should_adjust_scroll_position_on_item_size_change(
        mut self,
        f: Option<impl Fn(&TreeVirtualizer<T>, &VirtualItem, i64) -> bool + Send + Sync + 'static>,
    ) -> Self {
        self.should_adjust_scroll_position_on_item_size_change = f.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    /// Sets the number of items per row (clamped to at least 1).
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes.max(1);
        self
    }
}

impl<T> core::fmt::Debug for TreeVirtualizerOptions<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeVirtualizerOptions")
            .field("records", &self.data.len())
            .field("item_keys", &self.item_keys)
            .field("enabled", &self.enabled)
            .field("debug", &self.debug)
            .field("overscan", &self.overscan)
            .field("horizontal", &self.horizontal)
            .field("is_rtl", &self.is_rtl)
            .field("initial_rect", &self.initial_rect)
            .field("padding_start", &self.padding_start)
            .field("padding_end", &self.padding_end)
            .field("scroll_padding_start", &self.scroll_padding_start)
            .field("scroll_padding_end", &self.scroll_padding_end)
            .field("scroll_margin", &self.scroll_margin)
            .field("initial_offset", &self.initial_offset)
            .field(
                "is_scrolling_reset_delay_ms",
                &self.is_scrolling_reset_delay_ms,
            )
            .field("index_attribute", &self.index_attribute)
            .field("gap", &self.gap)
            .field("lanes", &self.lanes)
            .finish_non_exhaustive()
    }
}

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp;
use core::fmt;

use crate::element::{IndexedElement, parse_leading_int};
use crate::key::KeySet;
use crate::notifier::{ChangeNotifier, ListenerId};
use crate::projection::VisibleProjection;
use crate::range::{default_range_extractor, sanitize_indexes};
use crate::sizes::SizeCache;
use crate::tree_state::TreeState;
use crate::viewport::{AttachToken, ScrollContainer, TrackerConfig, ViewportReport, ViewportTracker};
use crate::{
    Align, ByRef, Memo, NodeId, NodeRef, Range, Rect, ScrollDirection, TreeVirtualizerOptions,
    ViewportState, VirtualItem, VirtualNode,
};

// (visible sequence identity, layout revision, scroll offset, viewport size, options revision)
type WindowDeps<T> = (ByRef<[NodeRef<T>]>, u64, u64, u32, u64);
type NotifyDeps = (bool, Option<(usize, usize)>);

/// A headless tree virtualization engine.
///
/// It owns the expansion state of a tree, the flattened sequence of visible nodes, and the
/// window of that sequence a viewport needs rendered. It holds no UI objects: hosts either
/// attach a [`ScrollContainer`] and forward its events, or push geometry directly
/// (`set_scroll_rect`, `apply_scroll_offset_event`).
///
/// Explicit mutations notify listeners with `is_synchronous = true`. Viewport changes notify
/// with `false`, and only when `is_scrolling` or the visible range changed.
pub struct TreeVirtualizer<T> {
    options: TreeVirtualizerOptions<T>,
    options_revision: u64,
    tree: TreeState<T>,
    projection: VisibleProjection<T>,
    sizes: SizeCache,
    tracker: ViewportTracker,
    selected_id: Option<NodeId>,

    scroll_rect: Rect,
    scroll_offset: u64,
    is_scrolling: bool,
    scroll_direction: Option<ScrollDirection>,

    notifier: ChangeNotifier<T>,
    indexes_memo: RefCell<Memo<WindowDeps<T>, Arc<[usize]>>>,
    items_memo: RefCell<Memo<WindowDeps<T>, Arc<[VirtualNode<T>]>>>,
    notify_memo: RefCell<Memo<NotifyDeps, ()>>,
}

impl<T> TreeVirtualizer<T> {
    /// Creates an engine with every node collapsed (only roots visible).
    pub fn new(options: TreeVirtualizerOptions<T>) -> Self {
        let tree = TreeState::new(Arc::clone(&options.data));
        let projection = VisibleProjection::new(&tree);
        let scroll_rect = options.initial_rect.unwrap_or_default();
        let scroll_offset = options.initial_offset.resolve();
        let debug = options.debug;
        vdebug!(
            records = options.data.len(),
            nodes = tree.len(),
            visible = projection.len(),
            enabled = options.enabled,
            "TreeVirtualizer::new"
        );

        let mut v = Self {
            tracker: ViewportTracker::new(tracker_config(&options)),
            options_revision: 0,
            tree,
            projection,
            sizes: SizeCache::new(),
            selected_id: None,
            scroll_rect,
            scroll_offset,
            is_scrolling: false,
            scroll_direction: None,
            notifier: ChangeNotifier::new(),
            indexes_memo: RefCell::new(Memo::new("virtual_indexes").with_debug(debug)),
            items_memo: RefCell::new(Memo::new("virtual_items").with_debug(debug)),
            notify_memo: RefCell::new(Memo::new("maybe_notify").with_debug(debug)),
            options,
        };
        v.relayout();
        let deps = v.notify_deps();
        let gate = Memo::new("maybe_notify").with_debug(debug).with_initial(deps, ());
        *v.notify_memo.get_mut() = gate;
        v
    }

    pub fn options(&self) -> &TreeVirtualizerOptions<T> {
        &self.options
    }

    /// Replaces the options.
    ///
    /// A new dataset (a different `data` allocation) rebuilds the index; expanded ids that
    /// still resolve stay expanded. Disabling detaches any container.
    pub fn set_options(&mut self, options: TreeVirtualizerOptions<T>) {
        let data_changed = !Arc::ptr_eq(&self.options.data, &options.data);
        let was_enabled = self.options.enabled;
        self.options = options;
        self.options_revision = self.options_revision.wrapping_add(1);
        self.tracker.set_config(tracker_config(&self.options));

        let debug = self.options.debug;
        self.indexes_memo.get_mut().set_debug(debug);
        self.items_memo.get_mut().set_debug(debug);
        self.notify_memo.get_mut().set_debug(debug);

        if data_changed {
            let kept: Vec<NodeId> = self.tree.expanded().iter().cloned().collect();
            self.tree = TreeState::new(Arc::clone(&self.options.data));
            let dropped = self.tree.replace_expanded(kept);
            self.projection.rebuild(&self.tree);
            vdebug!(
                nodes = self.tree.len(),
                dropped_expanded = dropped,
                "TreeVirtualizer::set_options: dataset replaced"
            );
        }

        if !self.options.enabled {
            self.tracker.teardown();
            self.reset_viewport(Rect::default());
        } else if !was_enabled {
            self.reset_viewport(self.options.initial_rect.unwrap_or_default());
        }

        self.relayout();
        self.notify(true);
    }

    /// Clones the current options, applies `f`, then delegates to `set_options`.
    pub fn update_options(&mut self, f: impl FnOnce(&mut TreeVirtualizerOptions<T>)) {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next);
    }

    pub fn enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.options.enabled == enabled {
            return;
        }
        self.update_options(|o| o.enabled = enabled);
    }

    fn reset_viewport(&mut self, rect: Rect) {
        self.scroll_rect = rect;
        self.scroll_offset = self.options.initial_offset.resolve();
        self.is_scrolling = false;
        self.scroll_direction = None;
    }

    // --- notifications ---

    /// Registers a change listener. `options.on_change` always runs before subscribers.
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&TreeVirtualizer<T>, bool) + Send + Sync + 'static,
    ) -> ListenerId {
        self.notifier.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len() + usize::from(self.options.on_change.is_some())
    }

    /// Runs `f` and delivers at most one notification afterwards.
    ///
    /// The coalesced notification is synchronous if any of the ones it replaces was.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        self.notifier.begin_batch();
        f(self);
        if let Some(sync) = self.notifier.end_batch() {
            self.deliver(sync);
        }
    }

    fn notify(&self, sync: bool) {
        if self.notifier.request(sync) {
            self.deliver(sync);
        }
    }

    fn deliver(&self, sync: bool) {
        vtrace!(sync, "TreeVirtualizer::notify");
        if let Some(cb) = &self.options.on_change {
            cb(self, sync);
        }
        for listener in self.notifier.listeners() {
            listener(self, sync);
        }
    }

    fn notify_deps(&self) -> NotifyDeps {
        (
            self.is_scrolling,
            self.visible_range().map(|r| (r.start_index, r.end_index)),
        )
    }

    /// Notifies (asynchronously) if `is_scrolling` or the visible range changed.
    fn maybe_notify(&self) {
        let deps = self.notify_deps();
        let changed = self.notify_memo.borrow_mut().update(deps);
        if changed {
            self.notify(false);
        }
    }

    // --- tree ---

    pub fn tree(&self) -> &TreeState<T> {
        &self.tree
    }

    /// The visible sequence. A new instance is installed on every change, so callers can
    /// compare with [`Arc::ptr_eq`] to detect updates.
    pub fn visible_nodes(&self) -> Arc<[NodeRef<T>]> {
        Arc::clone(self.projection.visible())
    }

    /// Number of visible nodes.
    pub fn count(&self) -> usize {
        self.projection.len()
    }

    /// The accessor's display value of the visible node at `visible_index`.
    pub fn display_value(&self, visible_index: usize) -> Option<String> {
        let node = self.projection.visible().get(visible_index)?;
        Some((self.options.accessor)(node))
    }

    pub fn find(&self, id: &NodeId) -> Option<&NodeRef<T>> {
        self.tree.find(id)
    }

    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.projection.position_of(id)
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.tree.is_expanded(id)
    }

    pub fn expanded_nodes(&self) -> &KeySet<NodeId> {
        self.tree.expanded()
    }

    /// `[id, parent, .., root]`; empty for unknown ids.
    pub fn ancestor_chain(&self, id: &NodeId) -> Vec<NodeId> {
        self.tree.ancestor_chain(id)
    }

    pub fn selected_id(&self) -> Option<&NodeId> {
        self.selected_id.as_ref()
    }

    pub fn set_selected_id(&mut self, id: impl Into<NodeId>) {
        self.selected_id = Some(id.into());
        self.notify(true);
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
        self.notify(true);
    }

    /// Replaces the expanded set and recomputes the visible sequence.
    ///
    /// Ids that are unknown or have no children are dropped.
    pub fn set_expanded_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let dropped = self.tree.replace_expanded(ids);
        if dropped > 0 {
            vdebug!(dropped, "set_expanded_nodes: ignored ids without children");
        }
        self.projection.rebuild(&self.tree);
        self.relayout();
        self.notify(true);
    }

    /// Flips the expansion of `id`, splicing its subtree into or out of the visible sequence.
    ///
    /// `visible_index` is where the caller rendered the node; a stale index is corrected by
    /// searching. Unknown ids are ignored and do not notify.
    pub fn toggle_node(&mut self, id: &NodeId, visible_index: usize) {
        let expand = !self.tree.is_expanded(id);
        self.apply_toggle(id, Some(visible_index), expand);
    }

    /// Expands `id`. Returns whether the expanded set changed.
    pub fn expand(&mut self, id: &NodeId) -> bool {
        let before = self.tree.is_expanded(id);
        self.apply_toggle(id, None, true);
        self.tree.is_expanded(id) != before
    }

    /// Collapses `id` and every expanded descendant. Returns whether `id` was expanded.
    pub fn collapse(&mut self, id: &NodeId) -> bool {
        let before = self.tree.is_expanded(id);
        self.apply_toggle(id, None, false);
        before
    }

    fn apply_toggle(&mut self, id: &NodeId, hint: Option<usize>, expand: bool) {
        if !self
            .projection
            .apply(&mut self.tree, id, hint, expand)
        {
            vtrace!(id = %id, "toggle ignored: unknown node");
            return;
        }
        self.relayout();
        self.notify(true);
    }

    /// Expands every ancestor of `id` so it becomes visible. Returns its visible index.
    pub fn reveal(&mut self, id: &NodeId) -> Option<usize> {
        let chain = self.tree.ancestor_chain(id);
        if chain.is_empty() {
            return None;
        }
        for ancestor in chain.iter().skip(1) {
            self.tree.expand(ancestor);
        }
        self.projection.rebuild(&self.tree);
        self.relayout();
        self.notify(true);
        self.projection.position_of(id)
    }

    /// Maps a rendered element back to its visible index through `options.index_attribute`.
    ///
    /// Returns `-1` (and logs a warning) when the attribute is missing or not an integer.
    pub fn index_from_element(&self, element: &impl IndexedElement) -> i64 {
        let name = self.options.index_attribute.as_str();
        let Some(raw) = element.attribute(name) else {
            vwarn!(attribute = name, "missing index attribute on measured element");
            return -1;
        };
        match parse_leading_int(raw) {
            Some(index) => index,
            None => {
                vwarn!(attribute = name, value = raw, "index attribute is not an integer");
                -1
            }
        }
    }

    // --- layout ---

    fn relayout(&mut self) {
        let visible = Arc::clone(self.projection.visible());
        let item_keys = &self.options.item_keys;
        let estimate_size = &self.options.estimate_size;
        self.sizes.relayout(
            visible.len(),
            self.options.lanes,
            self.options.gap,
            |i| item_keys.key(i, &visible[i]),
            |i| estimate_size(i),
        );
    }

    fn viewport_size(&self) -> u32 {
        self.scroll_rect.main(self.options.horizontal)
    }

    pub fn total_size(&self) -> u64 {
        if !self.options.enabled {
            return 0;
        }
        self.options.padding_start as u64 + self.sizes.total() + self.options.padding_end as u64
    }

    pub fn item_start(&self, index: usize) -> Option<u64> {
        if !self.options.enabled || index >= self.sizes.count() {
            return None;
        }
        Some(self.start_of(index))
    }

    pub fn item_size(&self, index: usize) -> Option<u32> {
        if !self.options.enabled {
            return None;
        }
        self.sizes.size(index)
    }

    pub fn item_end(&self, index: usize) -> Option<u64> {
        let start = self.item_start(index)?;
        let size = self.item_size(index)? as u64;
        Some(start.saturating_add(size))
    }

    /// The item at `index`, positioned along the scroll axis.
    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        if !self.options.enabled {
            return None;
        }
        self.item_inner(index)
    }

    fn item_inner(&self, index: usize) -> Option<VirtualItem> {
        let size = self.sizes.size(index)?;
        let key = self.sizes.key(index)?.clone();
        Some(VirtualItem {
            key,
            index,
            start: self.start_of(index),
            size,
            lane: index % self.sizes.lanes(),
        })
    }

    fn start_of(&self, index: usize) -> u64 {
        (self.options.scroll_margin as u64)
            .saturating_add(self.options.padding_start as u64)
            .saturating_add(self.sizes.start_of(index))
    }

    /// First index of the row containing `offset` (an absolute scroll offset).
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        if !self.options.enabled {
            return None;
        }
        let count = self.sizes.count();
        if count == 0 {
            return None;
        }
        let row = self.row_at_list_offset(offset.saturating_sub(self.options.scroll_margin as u64))?;
        Some((row * self.sizes.lanes()).min(count - 1))
    }

    fn row_at_list_offset(&self, offset: u64) -> Option<usize> {
        let padding = self.options.padding_start as u64;
        if offset < padding {
            return (self.sizes.row_count() > 0).then_some(0);
        }
        self.sizes.row_at(offset - padding)
    }

    // --- window ---

    /// The strictly visible window (no overscan), or `None` when nothing is visible.
    pub fn visible_range(&self) -> Option<Range> {
        if !self.options.enabled {
            return None;
        }
        let count = self.sizes.count();
        let view = self.viewport_size() as u64;
        if count == 0 || view == 0 {
            return None;
        }

        let margin = self.options.scroll_margin as u64;
        let offset = self.scroll_offset.min(self.max_scroll_offset());
        let scroll_end = offset.saturating_add(view);
        if scroll_end <= margin {
            return None;
        }
        let start = offset.saturating_sub(margin);
        let last = cmp::max(scroll_end - margin - 1, start);

        let start_row = self.row_at_list_offset(start)?;
        let end_row = self.row_at_list_offset(last)?;
        let lanes = self.sizes.lanes();
        let start_index = (start_row * lanes).min(count - 1);
        let end_index = ((end_row + 1) * lanes).min(count) - 1;

        Some(Range {
            start_index,
            end_index: end_index.max(start_index),
            overscan: self.options.overscan,
            count,
        })
    }

    fn window_deps(&self) -> WindowDeps<T> {
        (
            ByRef::new(self.projection.visible()),
            self.sizes.revision(),
            self.scroll_offset,
            self.viewport_size(),
            self.options_revision,
        )
    }

    /// Indexes to render: the visible range plus overscan, or the extractor's selection.
    pub fn virtual_indexes(&self) -> Arc<[usize]> {
        let deps = self.window_deps();
        self.indexes_memo.borrow_mut().get(deps, |_| {
            let Some(range) = self.visible_range() else {
                return Arc::from(Vec::new());
            };
            let indexes = match &self.options.range_extractor {
                Some(extract) => sanitize_indexes(extract(range), range.count),
                None => default_range_extractor(range),
            };
            Arc::from(indexes)
        })
    }

    /// The items to render, paired with their nodes.
    pub fn virtual_items(&self) -> Arc<[VirtualNode<T>]> {
        let deps = self.window_deps();
        let indexes = self.virtual_indexes();
        self.items_memo.borrow_mut().get(deps, |_| {
            let visible = self.projection.visible();
            indexes
                .iter()
                .filter_map(|&i| {
                    Some(VirtualNode {
                        item: self.item_inner(i)?,
                        node: Arc::clone(visible.get(i)?),
                    })
                })
                .collect()
        })
    }

    // --- measurement ---

    /// Records the measured size of the item at `index`.
    pub fn measure(&mut self, index: usize, size: u32) {
        if index >= self.sizes.count() {
            return;
        }
        vtrace!(index, size, "measure");
        self.sizes.set_size(index, size);
        self.notify(true);
    }

    /// Measures a rendered element, resolving its index through `options.index_attribute`.
    pub fn measure_element(&mut self, element: &impl IndexedElement, size: u32) -> Option<usize> {
        let index = usize::try_from(self.index_from_element(element)).ok()?;
        (index < self.sizes.count()).then(|| {
            self.resize_item(index, size);
            index
        })
    }

    /// Measures an item and, when it grows or shrinks above the viewport, shifts the scroll
    /// offset by the same amount. Returns the applied shift.
    pub fn resize_item(&mut self, index: usize, size: u32) -> i64 {
        let Some(item) = self.item_inner(index) else {
            return 0;
        };
        let delta = self.sizes.set_size(index, size);
        if delta == 0 {
            self.notify(true);
            return 0;
        }

        let should_adjust = match self
            .options
            .should_adjust_scroll_position_on_item_size_change
            .clone()
        {
            Some(f) => f(self, &item, delta),
            None => item.start < self.scroll_offset,
        };
        let applied = if should_adjust {
            self.scroll_offset = if delta > 0 {
                self.scroll_offset.saturating_add(delta as u64)
            } else {
                self.scroll_offset.saturating_sub(delta.unsigned_abs())
            };
            self.tracker.scroll_to(self.scroll_offset);
            delta
        } else {
            0
        };
        self.notify(true);
        applied
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.sizes.is_measured(index)
    }

    pub fn measurement_cache_len(&self) -> usize {
        self.sizes.cached_len()
    }

    pub fn reset_measurements(&mut self) {
        self.sizes.clear_measurements();
        self.relayout();
        self.notify(true);
    }

    /// The cached measurements (item key → size), e.g. for persistence.
    pub fn export_measurement_cache(&self) -> Vec<(NodeId, u32)> {
        self.sizes.export()
    }

    /// Replaces the cached measurements and re-lays out the visible items.
    pub fn import_measurement_cache(&mut self, entries: impl IntoIterator<Item = (NodeId, u32)>) {
        self.sizes.import(entries);
        vdebug!(entries = self.sizes.cached_len(), "import_measurement_cache");
        self.relayout();
        self.notify(true);
    }

    // --- scrolling ---

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn scroll_rect(&self) -> Rect {
        self.scroll_rect
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    pub fn scroll_direction(&self) -> Option<ScrollDirection> {
        self.scroll_direction
    }

    pub fn max_scroll_offset(&self) -> u64 {
        if !self.options.enabled {
            return self.options.initial_offset.resolve();
        }
        let margin = self.options.scroll_margin as u64;
        let view = self.viewport_size() as u64;
        margin.saturating_add(self.total_size().saturating_sub(view))
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll_offset())
    }

    /// The (clamped) offset that brings `index` into view with the given alignment.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> u64 {
        if !self.options.enabled {
            return self.options.initial_offset.resolve();
        }
        let count = self.sizes.count();
        if count == 0 {
            return 0;
        }
        let Some(item) = self.item_inner(index.min(count - 1)) else {
            return 0;
        };

        let sp_start = self.options.scroll_padding_start as u64;
        let sp_end = self.options.scroll_padding_end as u64;
        let view = self.viewport_size() as u64;

        let target = match align {
            Align::Start => item.start.saturating_sub(sp_start),
            Align::End => item.end().saturating_add(sp_end).saturating_sub(view),
            Align::Center => {
                let center = item.start.saturating_add(item.size as u64 / 2);
                center.saturating_sub(view / 2)
            }
            Align::Auto => {
                let cur = self.scroll_offset;
                let cur_end = cur.saturating_add(view);
                if item.start >= cur && item.end() <= cur_end {
                    cur
                } else if item.start < cur {
                    item.start.saturating_sub(sp_start)
                } else {
                    item.end().saturating_add(sp_end).saturating_sub(view)
                }
            }
        };

        self.clamp_scroll_offset(target)
    }

    /// Scrolls so `index` is in view (no animation) and returns the applied offset.
    ///
    /// An attached container is asked to scroll too.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> u64 {
        let offset = self.scroll_to_index_offset(index, align);
        self.scroll_to_offset(offset)
    }

    pub fn scroll_to_offset(&mut self, offset: u64) -> u64 {
        let offset = self.clamp_scroll_offset(offset);
        self.tracker.scroll_to(offset);
        self.set_scroll_offset(offset);
        offset
    }

    pub fn set_scroll_rect(&mut self, rect: Rect) {
        if self.scroll_rect == rect {
            return;
        }
        self.scroll_rect = rect;
        self.maybe_notify();
    }

    pub fn set_scroll_offset(&mut self, offset: u64) {
        if self.scroll_offset == offset {
            return;
        }
        self.scroll_direction = match offset.cmp(&self.scroll_offset) {
            cmp::Ordering::Greater => Some(ScrollDirection::Forward),
            _ => Some(ScrollDirection::Backward),
        };
        self.scroll_offset = offset;
        self.maybe_notify();
    }

    /// Applies a scroll position reported by the host (wheel, drag, ...) and marks the engine
    /// as scrolling until `advance_timers` passes the reset delay.
    pub fn apply_scroll_offset_event(&mut self, offset: u64, now_ms: u64) {
        vtrace!(offset, now_ms, "apply_scroll_offset_event");
        if !self.options.enabled {
            return;
        }
        if offset != self.scroll_offset {
            self.scroll_direction = Some(if offset > self.scroll_offset {
                ScrollDirection::Forward
            } else {
                ScrollDirection::Backward
            });
            self.scroll_offset = offset;
        }
        self.is_scrolling = true;
        self.tracker.schedule_reset(now_ms);
        self.maybe_notify();
    }

    // --- viewport lifecycle ---

    /// Starts observing `container`, replacing any attached one.
    ///
    /// Returns `None` (and attaches nothing) while the engine is disabled.
    pub fn attach(&mut self, container: impl ScrollContainer + 'static) -> Option<AttachToken> {
        if !self.options.enabled {
            vdebug!("attach refused: virtualizer disabled");
            return None;
        }
        let (token, reports) = self.tracker.attach(Box::new(container));
        for report in reports {
            self.apply_report(report);
        }
        self.maybe_notify();
        Some(token)
    }

    /// Stops observing the container attached with `token`. Idempotent.
    pub fn detach(&mut self, token: AttachToken) -> bool {
        let detached = self.tracker.detach(token);
        if detached {
            self.settle();
        }
        detached
    }

    /// Detaches whatever is attached and cancels the pending scroll-end timer.
    pub fn teardown(&mut self) {
        self.tracker.teardown();
        self.settle();
    }

    pub fn is_attached(&self) -> bool {
        self.tracker.is_attached()
    }

    fn settle(&mut self) {
        if !self.is_scrolling && self.scroll_direction.is_none() {
            return;
        }
        self.is_scrolling = false;
        self.scroll_direction = None;
        self.maybe_notify();
    }

    /// Forwards a scroll event of the attached container.
    pub fn handle_scroll(&mut self, now_ms: u64) {
        if let Some(report) = self.tracker.on_scroll(now_ms) {
            self.apply_report(report);
            self.maybe_notify();
        }
    }

    /// Forwards a native scroll-end event of the attached container.
    pub fn handle_scroll_end(&mut self) {
        if let Some(report) = self.tracker.on_scroll_end() {
            self.apply_report(report);
            self.maybe_notify();
        }
    }

    /// Forwards a resize notification of the attached container.
    pub fn handle_resize(&mut self) {
        if let Some(report) = self.tracker.on_resize() {
            self.apply_report(report);
            self.maybe_notify();
        }
    }

    /// Fires the scroll-end debounce if its deadline has passed. Returns whether it fired.
    pub fn advance_timers(&mut self, now_ms: u64) -> bool {
        let Some(offset) = self.tracker.advance(now_ms) else {
            return false;
        };
        if let Some(offset) = offset {
            self.scroll_offset = offset;
        }
        self.is_scrolling = false;
        self.scroll_direction = None;
        self.maybe_notify();
        true
    }

    /// When the host should call `advance_timers` next, if a timer is pending.
    pub fn next_timer_deadline(&self) -> Option<u64> {
        self.tracker.next_deadline()
    }

    pub fn viewport_state(&self) -> ViewportState {
        ViewportState {
            rect: self.scroll_rect,
            offset: self.scroll_offset,
            is_scrolling: self.is_scrolling,
            direction: self.scroll_direction,
        }
    }

    fn apply_report(&mut self, report: ViewportReport) {
        match report {
            ViewportReport::Rect(rect) => self.scroll_rect = rect,
            ViewportReport::Offset {
                offset,
                is_scrolling,
                direction,
            } => {
                self.scroll_offset = offset;
                self.is_scrolling = is_scrolling;
                self.scroll_direction = direction;
            }
        }
    }
}

impl<T> fmt::Debug for TreeVirtualizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeVirtualizer")
            .field("options", &self.options)
            .field("nodes", &self.tree.len())
            .field("expanded", &self.tree.expanded().len())
            .field("visible", &self.projection.len())
            .field("selected_id", &self.selected_id)
            .field("viewport", &self.viewport_state())
            .field("tracker", &self.tracker)
            .field("listeners", &self.notifier.len())
            .finish_non_exhaustive()
    }
}

fn tracker_config<T>(options: &TreeVirtualizerOptions<T>) -> TrackerConfig {
    TrackerConfig {
        horizontal: options.horizontal,
        is_rtl: options.is_rtl,
        reset_delay_ms: options.is_scrolling_reset_delay_ms,
    }
}

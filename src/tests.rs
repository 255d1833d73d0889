use crate::*;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::rc::Rc;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 1
    }
}

fn id(n: i64) -> NodeId {
    NodeId::from(n)
}

fn ids(v: &TreeVirtualizer<impl Sized>) -> Vec<NodeId> {
    v.visible_nodes().iter().map(|n| n.id.clone()).collect()
}

fn id_list(ns: &[i64]) -> Vec<NodeId> {
    ns.iter().copied().map(NodeId::from).collect()
}

// 1 { 2 { 4, 5 }, 3 }, 6 { 7 }
fn sample_tree() -> Vec<TreeNode<&'static str>> {
    vec![
        TreeNode::root(1, "a"),
        TreeNode::child(2, 1, "a/b"),
        TreeNode::child(4, 2, "a/b/d"),
        TreeNode::child(5, 2, "a/b/e"),
        TreeNode::child(3, 1, "a/c"),
        TreeNode::root(6, "f"),
        TreeNode::child(7, 6, "f/g"),
    ]
}

fn sample_options() -> TreeVirtualizerOptions<&'static str> {
    TreeVirtualizerOptions::new(sample_tree(), |n| n.data.to_string())
}

fn flat_roots(count: i64) -> TreeVirtualizerOptions<()> {
    TreeVirtualizerOptions::new((0..count).map(|i| TreeNode::root(i, ())), |n| {
        n.id.to_string()
    })
    .with_estimate_size(|_| 10)
}

fn reference_visible<T>(tree: &TreeState<T>) -> Vec<NodeId> {
    fn walk<T>(tree: &TreeState<T>, id: &NodeId, out: &mut Vec<NodeId>) {
        for child in tree.children_of(id) {
            out.push(child.id.clone());
            if tree.is_expanded(&child.id) {
                walk(tree, &child.id, out);
            }
        }
    }
    let mut out = Vec::new();
    for root in tree.roots() {
        out.push(root.id.clone());
        if tree.is_expanded(&root.id) {
            walk(tree, &root.id, &mut out);
        }
    }
    out
}

type Log = Arc<Mutex<Vec<(&'static str, bool)>>>;

fn recording_options<T: 'static>(
    options: TreeVirtualizerOptions<T>,
    log: &Log,
) -> TreeVirtualizerOptions<T> {
    let log = Arc::clone(log);
    options.with_on_change(Some(move |_: &TreeVirtualizer<T>, sync: bool| {
        log.lock().unwrap().push(("options", sync));
    }))
}

fn flags(log: &Log) -> Vec<bool> {
    log.lock().unwrap().iter().map(|(_, sync)| *sync).collect()
}

#[derive(Debug, Default)]
struct ContainerState {
    rect: Rect,
    left: f64,
    top: f64,
    scrollend: bool,
    resize: bool,
    window: bool,
    scrolled_to: Vec<(bool, u64)>,
}

#[derive(Clone, Default)]
struct FakeContainer(Rc<RefCell<ContainerState>>);

impl FakeContainer {
    fn new(width: u32, height: u32) -> Self {
        let c = Self::default();
        c.0.borrow_mut().rect = Rect::new(width, height);
        c
    }

    fn set(&self, f: impl FnOnce(&mut ContainerState)) {
        f(&mut self.0.borrow_mut());
    }
}

impl ScrollContainer for FakeContainer {
    fn content_rect(&self) -> Rect {
        self.0.borrow().rect
    }

    fn scroll_left(&self) -> f64 {
        self.0.borrow().left
    }

    fn scroll_top(&self) -> f64 {
        self.0.borrow().top
    }

    fn supports_scrollend(&self) -> bool {
        self.0.borrow().scrollend
    }

    fn supports_resize_observer(&self) -> bool {
        self.0.borrow().resize
    }

    fn is_window(&self) -> bool {
        self.0.borrow().window
    }

    fn scroll_to(&mut self, horizontal: bool, offset: u64) {
        self.0.borrow_mut().scrolled_to.push((horizontal, offset));
    }
}

struct FakeElement(Vec<(&'static str, &'static str)>);

impl IndexedElement for FakeElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

#[test]
fn toggle_round_trip_with_inline_children() {
    let data = vec![TreeNode::root(1, "root").with_children([
        TreeNode::child(2, 1, "a"),
        TreeNode::child(3, 1, "b"),
    ])];
    let mut v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |n| n.data.to_string()));
    assert_eq!(ids(&v), id_list(&[1]));

    v.toggle_node(&id(1), 0);
    assert_eq!(ids(&v), id_list(&[1, 2, 3]));
    assert!(v.is_expanded(&id(1)));
    assert_eq!(v.expanded_nodes().len(), 1);
    assert_eq!(v.display_value(1).as_deref(), Some("a"));

    v.toggle_node(&id(1), 0);
    assert_eq!(ids(&v), id_list(&[1]));
    assert!(v.expanded_nodes().is_empty());
}

#[test]
fn compute_range_applies_overscan_and_clamps() {
    assert_eq!(compute_range(10, 20, 2, 100), (8..=22).collect::<Vec<_>>());
    assert_eq!(compute_range(0, 5, 3, 10), (0..=8).collect::<Vec<_>>());
    assert_eq!(compute_range(7, 9, 5, 10), (2..=9).collect::<Vec<_>>());
    assert!(compute_range(0, 0, 1, 0).is_empty());
}

#[test]
fn compute_range_bounds_hold_for_random_inputs() {
    let mut rng = Lcg::new(7);
    for _ in 0..500 {
        let count = rng.gen_range_usize(1, 200);
        let start = rng.gen_range_usize(0, count);
        let end = rng.gen_range_usize(start, count);
        let overscan = rng.gen_range_usize(0, 20);
        let out = compute_range(start, end, overscan, count);

        let lo = start.saturating_sub(overscan);
        let hi = (end + overscan).min(count - 1);
        assert_eq!(out.first().copied(), Some(lo));
        assert_eq!(out.last().copied(), Some(hi));
        assert_eq!(out.len(), hi - lo + 1);
        assert!(out.windows(2).all(|w| w[1] == w[0] + 1));
    }
}

#[test]
fn expand_then_collapse_restores_sequence() {
    let mut v = TreeVirtualizer::new(sample_options());
    let before = ids(&v);
    assert_eq!(before, id_list(&[1, 6]));

    assert!(v.expand(&id(1)));
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6]));
    assert!(v.collapse(&id(1)));
    assert_eq!(ids(&v), before);

    assert!(v.expand(&id(6)));
    assert!(!v.expand(&id(6)));
    assert!(v.collapse(&id(6)));
    assert!(!v.collapse(&id(6)));
    assert_eq!(ids(&v), before);
}

#[test]
fn expand_inserts_children_right_after_node() {
    let mut v = TreeVirtualizer::new(sample_options());
    v.toggle_node(&id(6), 1);
    assert_eq!(ids(&v), id_list(&[1, 6, 7]));

    v.toggle_node(&id(1), 0);
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6, 7]));

    v.toggle_node(&id(2), 1);
    assert_eq!(ids(&v), id_list(&[1, 2, 4, 5, 3, 6, 7]));
    assert_eq!(v.position_of(&id(5)), Some(3));
}

#[test]
fn collapse_removes_whole_visible_subtree() {
    let mut v = TreeVirtualizer::new(sample_options());
    v.expand(&id(1));
    v.expand(&id(2));
    v.expand(&id(6));
    assert_eq!(ids(&v), id_list(&[1, 2, 4, 5, 3, 6, 7]));

    v.collapse(&id(1));
    assert_eq!(ids(&v), id_list(&[1, 6, 7]));
    assert!(!v.is_expanded(&id(2)));
    assert!(v.is_expanded(&id(6)));

    v.expand(&id(1));
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6, 7]));
}

#[test]
fn collapse_forgets_hidden_expanded_descendants() {
    let mut v = TreeVirtualizer::new(sample_options());
    assert!(v.expand(&id(2)));
    assert_eq!(ids(&v), id_list(&[1, 6]));

    assert!(!v.collapse(&id(1)));
    assert!(!v.is_expanded(&id(2)));
    assert_eq!(ids(&v), id_list(&[1, 6]));

    v.set_expanded_nodes([id(2), id(6)]);
    v.expand(&id(1));
    assert_eq!(ids(&v), id_list(&[1, 2, 4, 5, 3, 6, 7]));
    assert!(v.collapse(&id(1)));
    assert_eq!(ids(&v), id_list(&[1, 6, 7]));
    assert!(!v.is_expanded(&id(2)));
    assert!(v.is_expanded(&id(6)));
}

#[test]
fn collapse_leaves_unrelated_expansion_alone() {
    let mut data = vec![TreeNode::root(0, ()), TreeNode::child(1, 0, ())];
    for chain in 0..50i64 {
        let base = 1_000 + chain * 10;
        data.push(TreeNode::root(base, ()));
        for step in 1..10 {
            data.push(TreeNode::child(base + step, base + step - 1, ()));
        }
    }
    let mut v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |_| String::new()));
    let all: Vec<NodeId> = v.tree().data().iter().map(|n| n.id.clone()).collect();
    v.set_expanded_nodes(all);
    assert_eq!(v.expanded_nodes().len(), 451);
    assert_eq!(v.count(), 502);

    for _ in 0..20 {
        assert!(v.collapse(&id(0)));
        assert_eq!(v.count(), 501);
        assert!(v.expand(&id(0)));
        assert_eq!(v.count(), 502);
    }
    assert_eq!(v.expanded_nodes().len(), 451);
}

#[test]
fn deep_chains_expand_and_collapse_without_recursion() {
    const DEPTH: i64 = 20_000;
    let data = (0..DEPTH).map(|i| {
        if i == 0 {
            TreeNode::root(0, ())
        } else {
            TreeNode::child(i, i - 1, ())
        }
    });
    let mut v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |_| String::new()));

    v.set_expanded_nodes((0..DEPTH).map(id));
    assert_eq!(v.count(), DEPTH as usize);
    assert_eq!(v.visible_nodes().last().map(|n| n.id.clone()), Some(id(DEPTH - 1)));

    assert!(v.collapse(&id(0)));
    assert_eq!(v.count(), 1);
    assert!(v.expanded_nodes().is_empty());

    v.set_expanded_nodes((1..DEPTH).map(id));
    assert_eq!(v.count(), 1);
    assert!(v.expand(&id(0)));
    assert_eq!(v.count(), DEPTH as usize);
    assert_eq!(v.tree().ancestor_chain(&id(DEPTH - 1)).len(), DEPTH as usize);
}

#[test]
fn stale_visible_index_is_corrected() {
    let mut v = TreeVirtualizer::new(sample_options());
    v.toggle_node(&id(6), 0);
    assert_eq!(ids(&v), id_list(&[1, 6, 7]));

    v.toggle_node(&id(6), 42);
    assert_eq!(ids(&v), id_list(&[1, 6]));
}

#[test]
fn incremental_and_full_recompute_agree_across_levels() {
    let mut incremental = TreeVirtualizer::new(sample_options());
    // Expanded while hidden: shows up once its parent opens.
    incremental.expand(&id(2));
    assert_eq!(ids(&incremental), id_list(&[1, 6]));
    incremental.expand(&id(1));

    let mut rebuilt = TreeVirtualizer::new(sample_options());
    rebuilt.set_expanded_nodes([id(1), id(2)]);

    assert_eq!(ids(&incremental), id_list(&[1, 2, 4, 5, 3, 6]));
    assert_eq!(ids(&incremental), ids(&rebuilt));
}

#[test]
fn set_expanded_nodes_drops_leaves_and_unknown_ids() {
    let mut v = TreeVirtualizer::new(sample_options());
    v.set_expanded_nodes([id(1), id(3), id(99)]);
    assert_eq!(v.expanded_nodes().len(), 1);
    assert!(v.is_expanded(&id(1)));
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6]));
}

#[test]
fn toggling_a_leaf_installs_a_new_sequence() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(sample_options(), &log));
    v.expand(&id(1));
    let before = v.visible_nodes();

    v.toggle_node(&id(3), 2);
    let after = v.visible_nodes();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6]));
    assert!(!v.is_expanded(&id(3)));
    assert_eq!(flags(&log), vec![true, true]);
}

#[test]
fn unknown_id_is_ignored_without_notification() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(sample_options(), &log));
    let before = v.visible_nodes();

    v.toggle_node(&id(99), 0);
    v.toggle_node(&NodeId::from("missing"), 1);
    assert!(!v.expand(&id(99)));
    assert!(!v.collapse(&id(99)));

    assert!(Arc::ptr_eq(&before, &v.visible_nodes()));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn ancestor_chain_walks_to_root() {
    let v = TreeVirtualizer::new(sample_options());
    assert_eq!(v.ancestor_chain(&id(5)), id_list(&[5, 2, 1]));
    assert_eq!(v.ancestor_chain(&id(1)), id_list(&[1]));
    assert!(v.ancestor_chain(&id(99)).is_empty());
    assert!(v.tree().is_ancestor(&id(1), &id(4)));
    assert!(!v.tree().is_ancestor(&id(6), &id(4)));
}

#[test]
fn ancestor_chain_survives_parent_cycles() {
    let data = vec![
        TreeNode::root(0, ()),
        TreeNode::child(1, 2, ()),
        TreeNode::child(2, 1, ()),
    ];
    let v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |n| n.id.to_string()));
    let chain = v.ancestor_chain(&id(1));
    assert!(chain.len() <= v.tree().len() + 1);
    assert_eq!(chain[0], id(1));
}

#[test]
fn reveal_expands_ancestors() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(sample_options(), &log));
    assert_eq!(v.reveal(&id(5)), Some(3));
    assert_eq!(ids(&v), id_list(&[1, 2, 4, 5, 3, 6]));
    assert_eq!(v.reveal(&id(99)), None);
    assert_eq!(flags(&log), vec![true]);
}

#[test]
fn orphans_are_roots_and_linked_records_join_inline_children() {
    let data = vec![
        TreeNode::root(1, "a").with_children([TreeNode::child(2, 1, "a/b")]),
        TreeNode::child(3, 1, "a/c"),
        TreeNode::child(4, 99, "orphan"),
    ];
    let mut v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |n| n.data.to_string()));
    assert_eq!(ids(&v), id_list(&[1, 4]));

    v.expand(&id(1));
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 4]));
    assert_eq!(v.find(&id(3)).map(|n| n.data), Some("a/c"));
    assert_eq!(v.tree().children_of(&id(1)).len(), 2);
}

#[test]
fn flat_records_win_over_inline_copies() {
    let data = vec![
        TreeNode::root(1, "flat").with_children([TreeNode::child(2, 1, "inline")]),
        TreeNode::child(2, 1, "flat child"),
    ];
    let mut v = TreeVirtualizer::new(TreeVirtualizerOptions::new(data, |n| n.data.to_string()));
    v.expand(&id(1));
    assert_eq!(v.display_value(1).as_deref(), Some("flat child"));
}

#[test]
fn memo_recomputes_only_on_changed_deps() {
    let calls = AtomicUsize::new(0);
    let mut m: Memo<(u32, bool), u32> = Memo::new("double");
    let mut run = |deps| {
        m.get(deps, |d: &(u32, bool)| {
            calls.fetch_add(1, Ordering::Relaxed);
            d.0 * 2
        })
    };
    assert_eq!(run((1, true)), 2);
    assert_eq!(run((1, true)), 2);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(run((2, true)), 4);
    assert_eq!(run((2, false)), 4);
    assert_eq!(calls.load(Ordering::Relaxed), 3);

    m.invalidate();
    assert_eq!(m.get((2, false), |d| d.0 * 3), 6);
}

#[test]
fn memo_by_ref_compares_identity_and_fires_on_change() {
    let changes = Arc::new(AtomicUsize::new(0));
    let mut m: Memo<ByRef<[u8]>, usize> = Memo::new("len").with_on_change({
        let changes = Arc::clone(&changes);
        move |_| {
            changes.fetch_add(1, Ordering::Relaxed);
        }
    });
    let a: Arc<[u8]> = Arc::from(vec![1, 2, 3]);
    let b: Arc<[u8]> = Arc::from(vec![1, 2, 3]);

    assert_eq!(m.get(ByRef::new(&a), |d| d.0.len()), 3);
    assert_eq!(m.get(ByRef::new(&a), |d| d.0.len()), 3);
    assert_eq!(changes.load(Ordering::Relaxed), 1);
    assert_eq!(m.get(ByRef::new(&b), |d| d.0.len()), 3);
    assert_eq!(changes.load(Ordering::Relaxed), 2);

    let mut gate: Memo<(bool, Option<u8>), ()> = Memo::new("gate").with_initial((false, None), ());
    assert!(!gate.update((false, None)));
    assert!(gate.update((true, None)));
    assert!(!gate.update((true, None)));
}

#[test]
fn window_getters_follow_visible_sequence_identity() {
    let mut v = TreeVirtualizer::new(
        sample_options()
            .with_estimate_size(|_| 10)
            .with_initial_rect(Some(Rect::new(100, 100))),
    );
    v.expand(&id(1));
    let a = v.virtual_indexes();
    let b = v.virtual_indexes();
    assert!(Arc::ptr_eq(&a, &b));

    v.toggle_node(&id(3), 2);
    let c = v.virtual_indexes();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(&a[..], &c[..]);
}

#[test]
fn listeners_run_after_on_change_with_sync_flag() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(sample_options(), &log));
    let sub = v.subscribe({
        let log = Arc::clone(&log);
        move |_, sync| log.lock().unwrap().push(("listener", sync))
    });
    assert_eq!(v.listener_count(), 2);

    v.set_selected_id(6);
    assert_eq!(v.selected_id(), Some(&id(6)));
    assert_eq!(
        *log.lock().unwrap(),
        vec![("options", true), ("listener", true)]
    );

    assert!(v.unsubscribe(sub));
    assert!(!v.unsubscribe(sub));
    v.clear_selection();
    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(v.selected_id(), None);
}

#[test]
fn viewport_changes_notify_only_when_range_or_scrolling_changes() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(
        flat_roots(100).with_initial_rect(Some(Rect::new(100, 50))),
        &log,
    ));
    assert_eq!(v.visible_range().map(|r| (r.start_index, r.end_index)), Some((0, 4)));

    v.apply_scroll_offset_event(100, 0);
    assert!(v.is_scrolling());
    assert_eq!(v.scroll_direction(), Some(ScrollDirection::Forward));
    assert_eq!(flags(&log), vec![false]);

    v.apply_scroll_offset_event(100, 10);
    assert_eq!(flags(&log), vec![false]);
    assert_eq!(v.next_timer_deadline(), Some(160));

    assert!(!v.advance_timers(159));
    assert!(v.advance_timers(160));
    assert!(!v.is_scrolling());
    assert_eq!(v.next_timer_deadline(), None);
    assert_eq!(flags(&log), vec![false, false]);

    v.set_scroll_offset(105);
    assert_eq!(flags(&log), vec![false, false, false]);

    v.toggle_node(&id(3), 3);
    assert_eq!(flags(&log), vec![false, false, false, true]);
}

#[test]
fn batch_update_coalesces_into_one_notification() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(
        flat_roots(100).with_initial_rect(Some(Rect::new(100, 50))),
        &log,
    ));

    v.batch_update(|v| {
        v.apply_scroll_offset_event(300, 0);
        v.batch_update(|v| {
            v.set_selected_id(1);
            v.clear_selection();
        });
        assert!(log.lock().unwrap().is_empty());
    });
    assert_eq!(flags(&log), vec![true]);

    v.batch_update(|v| v.set_scroll_offset(600));
    assert_eq!(flags(&log), vec![true, false]);

    v.batch_update(|_| {});
    assert_eq!(flags(&log), vec![true, false]);
}

#[test]
fn attach_reads_rect_and_offset_once() {
    let log: Log = Arc::default();
    let mut v = TreeVirtualizer::new(recording_options(flat_roots(100), &log));
    let container = FakeContainer::new(200, 50);
    container.set(|s| s.top = 30.4);

    let token = v.attach(container.clone());
    assert!(token.is_some());
    assert!(v.is_attached());
    assert_eq!(
        v.viewport_state(),
        ViewportState {
            rect: Rect::new(200, 50),
            offset: 30,
            is_scrolling: false,
            direction: None,
        }
    );
    assert_eq!(v.visible_range().map(|r| (r.start_index, r.end_index)), Some((3, 7)));
    assert_eq!(flags(&log), vec![false]);
}

#[test]
fn scroll_end_falls_back_to_debounce() {
    let mut v = TreeVirtualizer::new(flat_roots(100));
    let container = FakeContainer::new(200, 50);
    v.attach(container.clone());

    container.set(|s| s.top = 60.0);
    v.handle_scroll(1_000);
    assert!(v.is_scrolling());
    assert_eq!(v.scroll_direction(), Some(ScrollDirection::Forward));
    assert_eq!(v.next_timer_deadline(), Some(1_150));

    container.set(|s| s.top = 40.0);
    v.handle_scroll(1_100);
    assert_eq!(v.scroll_direction(), Some(ScrollDirection::Backward));
    assert_eq!(v.next_timer_deadline(), Some(1_250));

    assert!(!v.advance_timers(1_200));
    assert!(v.is_scrolling());
    assert!(v.advance_timers(1_250));
    assert!(!v.is_scrolling());
    assert_eq!(v.scroll_direction(), None);
    assert_eq!(v.scroll_offset(), 40);
    assert!(!v.advance_timers(2_000));
}

#[test]
fn native_scroll_end_skips_the_timer() {
    let mut v = TreeVirtualizer::new(flat_roots(100));
    let container = FakeContainer::new(200, 50);
    container.set(|s| s.scrollend = true);
    v.attach(container.clone());

    container.set(|s| s.top = 25.0);
    v.handle_scroll(0);
    assert!(v.is_scrolling());
    assert_eq!(v.next_timer_deadline(), None);

    v.handle_scroll_end();
    assert!(!v.is_scrolling());
    assert_eq!(v.scroll_offset(), 25);
}

#[test]
fn resize_requires_observer_support() {
    let mut v = TreeVirtualizer::new(flat_roots(100));
    let plain = FakeContainer::new(200, 50);
    v.attach(plain.clone());
    plain.set(|s| s.rect = Rect::new(200, 80));
    v.handle_resize();
    assert_eq!(v.scroll_rect(), Rect::new(200, 50));

    let observed = FakeContainer::new(200, 50);
    observed.set(|s| s.resize = true);
    v.attach(observed.clone());
    observed.set(|s| s.rect = Rect::new(200, 80));
    v.handle_resize();
    assert_eq!(v.scroll_rect(), Rect::new(200, 80));
}

#[test]
fn horizontal_offsets_respect_rtl_and_windows() {
    let mut v = TreeVirtualizer::new(flat_roots(100).with_horizontal(true).with_is_rtl(true));
    let element = FakeContainer::new(50, 20);
    element.set(|s| s.left = -120.0);
    v.attach(element);
    assert_eq!(v.scroll_offset(), 120);
    assert_eq!(v.visible_range().map(|r| r.start_index), Some(12));

    let window = FakeContainer::new(50, 20);
    window.set(|s| {
        s.window = true;
        s.left = 80.0;
    });
    v.attach(window);
    assert_eq!(v.scroll_offset(), 80);

    let mut vertical = TreeVirtualizer::new(flat_roots(100));
    let negative = FakeContainer::new(50, 20);
    negative.set(|s| s.top = -5.0);
    vertical.attach(negative);
    assert_eq!(vertical.scroll_offset(), 0);
}

#[test]
fn detach_and_teardown_are_idempotent() {
    let mut v = TreeVirtualizer::new(flat_roots(100));
    let container = FakeContainer::new(200, 50);
    let first = v.attach(container.clone()).unwrap();
    let second = v.attach(container.clone()).unwrap();
    assert_ne!(first, second);
    assert!(!v.detach(first));
    assert!(v.is_attached());

    container.set(|s| s.top = 70.0);
    v.handle_scroll(0);
    assert!(v.detach(second));
    assert!(!v.detach(second));
    assert!(!v.is_scrolling());
    assert_eq!(v.next_timer_deadline(), None);

    container.set(|s| s.top = 300.0);
    v.handle_scroll(10);
    assert_eq!(v.scroll_offset(), 70);

    v.attach(container.clone());
    v.handle_scroll(20);
    v.teardown();
    v.teardown();
    assert!(!v.is_attached());
    assert_eq!(v.next_timer_deadline(), None);
}

#[test]
fn scroll_to_index_moves_attached_container() {
    let mut v = TreeVirtualizer::new(flat_roots(100));
    let container = FakeContainer::new(100, 50);
    v.attach(container.clone());

    assert_eq!(v.scroll_to_index(10, Align::Start), 100);
    assert_eq!(v.scroll_offset(), 100);
    assert_eq!(container.0.borrow().scrolled_to, vec![(false, 100)]);
}

#[test]
fn scroll_to_index_offset_alignments() {
    let mut v = TreeVirtualizer::new(flat_roots(100).with_initial_rect(Some(Rect::new(100, 50))));
    assert_eq!(v.scroll_to_index_offset(10, Align::Start), 100);
    assert_eq!(v.scroll_to_index_offset(10, Align::End), 60);
    assert_eq!(v.scroll_to_index_offset(10, Align::Center), 80);
    assert_eq!(v.scroll_to_index_offset(10, Align::Auto), 60);
    assert_eq!(v.scroll_to_index_offset(99, Align::Start), 950);
    assert_eq!(v.max_scroll_offset(), 950);

    v.set_scroll_offset(80);
    assert_eq!(v.scroll_to_index_offset(10, Align::Auto), 80);
    assert_eq!(v.scroll_to_offset(5_000), 950);
}

#[test]
fn attach_is_refused_while_disabled() {
    let mut v = TreeVirtualizer::new(
        sample_options()
            .with_enabled(false)
            .with_initial_rect(Some(Rect::new(10, 10))),
    );
    assert!(v.attach(FakeContainer::new(10, 10)).is_none());
    assert!(v.virtual_indexes().is_empty());
    assert_eq!(v.total_size(), 0);
    assert_eq!(v.visible_range(), None);

    v.toggle_node(&id(1), 0);
    assert_eq!(ids(&v), id_list(&[1, 2, 3, 6]));

    v.set_enabled(true);
    assert_eq!(v.scroll_rect(), Rect::new(10, 10));
    assert_eq!(&v.virtual_indexes()[..], &[0, 1, 2, 3]);
}

#[test]
fn index_from_element_parses_leading_integer() {
    let v = TreeVirtualizer::new(sample_options());
    let el = |value| FakeElement(vec![("data-index", value)]);
    assert_eq!(v.index_from_element(&el("12")), 12);
    assert_eq!(v.index_from_element(&el("7px")), 7);
    assert_eq!(v.index_from_element(&el(" -3")), -3);
    assert_eq!(v.index_from_element(&el("")), -1);
    assert_eq!(v.index_from_element(&el("abc")), -1);
    assert_eq!(v.index_from_element(&FakeElement(Vec::new())), -1);

    let custom = TreeVirtualizer::new(sample_options().with_index_attribute("data-row"));
    assert_eq!(custom.index_from_element(&el("4")), -1);
    assert_eq!(
        custom.index_from_element(&FakeElement(vec![("data-row", "4")])),
        4
    );
}

#[test]
fn measure_element_resolves_index() {
    let mut v = TreeVirtualizer::new(flat_roots(10));
    let el = FakeElement(vec![("data-index", "2")]);
    assert_eq!(v.measure_element(&el, 25), Some(2));
    assert_eq!(v.item_size(2), Some(25));
    assert!(v.is_measured(2));
    assert_eq!(v.measure_element(&FakeElement(vec![("data-index", "10")]), 25), None);
}

#[test]
fn lanes_share_rows_and_gap_separates_them() {
    let mut v = TreeVirtualizer::new(
        flat_roots(10)
            .with_lanes(2)
            .with_gap(5)
            .with_initial_rect(Some(Rect::new(100, 20))),
    );
    assert_eq!(v.total_size(), 70);
    assert_eq!(v.item_start(3), Some(15));
    assert_eq!(v.item(3).map(|i| i.lane), Some(1));
    let range = v.visible_range().unwrap();
    assert_eq!((range.start_index, range.end_index), (0, 3));

    v.measure(2, 30);
    assert_eq!(v.total_size(), 90);
    assert_eq!(v.item_size(3), Some(10));
    assert_eq!(v.item_start(4), Some(50));
    assert_eq!(v.index_at_offset(52), Some(4));
    assert_eq!(v.index_at_offset(10_000), Some(8));
}

#[test]
fn node_keys_carry_measurements_across_expand() {
    let mut by_node = TreeVirtualizer::new(
        sample_options()
            .with_estimate_size(|_| 10)
            .with_item_keys(ItemKeys::NodeId),
    );
    by_node.measure(1, 40);
    by_node.expand(&id(1));
    assert_eq!(by_node.item_size(3), Some(40));
    assert_eq!(by_node.item_size(1), Some(10));
    assert!(by_node.is_measured(3));

    let mut by_index = TreeVirtualizer::new(sample_options().with_estimate_size(|_| 10));
    by_index.measure(1, 40);
    by_index.expand(&id(1));
    assert_eq!(by_index.item_size(1), Some(40));
    assert_eq!(by_index.item_size(3), Some(10));
}

#[test]
fn resize_item_shifts_offset_for_items_above() {
    let mut v = TreeVirtualizer::new(flat_roots(100).with_initial_rect(Some(Rect::new(100, 50))));
    v.set_scroll_offset(200);
    assert_eq!(v.resize_item(0, 30), 20);
    assert_eq!(v.scroll_offset(), 220);
    assert_eq!(v.resize_item(50, 30), 0);
    assert_eq!(v.scroll_offset(), 220);

    let mut hooked = TreeVirtualizer::new(
        flat_roots(100)
            .with_initial_rect(Some(Rect::new(100, 50)))
            .with_should_adjust_scroll_position_on_item_size_change(Some(
                |_: &TreeVirtualizer<()>, _: &VirtualItem, _: i64| false,
            )),
    );
    hooked.set_scroll_offset(200);
    assert_eq!(hooked.resize_item(0, 30), 0);
    assert_eq!(hooked.scroll_offset(), 200);
}

#[test]
fn measurement_cache_round_trips_and_resets() {
    let mut v = TreeVirtualizer::new(flat_roots(10).with_item_keys(ItemKeys::NodeId));
    v.measure(0, 15);
    v.measure(4, 22);
    let mut exported = v.export_measurement_cache();
    exported.sort();
    assert_eq!(exported, vec![(id(0), 15), (id(4), 22)]);

    let mut restored = TreeVirtualizer::new(flat_roots(10).with_item_keys(ItemKeys::NodeId));
    restored.import_measurement_cache(exported);
    assert_eq!(restored.item_size(4), Some(22));
    assert_eq!(restored.total_size(), v.total_size());

    restored.reset_measurements();
    assert_eq!(restored.measurement_cache_len(), 0);
    assert!(!restored.is_measured(4));
    assert_eq!(restored.total_size(), 100);
}

#[test]
fn range_extractor_output_is_sanitized() {
    let v = TreeVirtualizer::new(
        flat_roots(100)
            .with_initial_rect(Some(Rect::new(100, 30)))
            .with_initial_offset_value(200)
            .with_range_extractor(Some(|r: Range| {
                let mut out = vec![0, 0];
                out.extend(r.start_index..=r.end_index);
                out
            })),
    );
    assert_eq!(&v.virtual_indexes()[..], &[0, 20, 21, 22]);
}

#[test]
fn index_emitter_pins_rows() {
    let v = TreeVirtualizer::new(
        flat_roots(100)
            .with_initial_rect(Some(Rect::new(100, 30)))
            .with_initial_offset_value(200)
            .with_overscan(2)
            .with_range_extractor(Some(|r: Range| {
                let mut e = IndexEmitter::new(r);
                e.emit_pinned(0);
                e.emit_overscanned();
                e.finish()
            })),
    );
    assert_eq!(&v.virtual_indexes()[..], &[0, 18, 19, 20, 21, 22, 23, 24]);
}

#[test]
fn virtual_items_pair_layout_with_nodes() {
    let mut v = TreeVirtualizer::new(
        sample_options()
            .with_estimate_size(|_| 10)
            .with_initial_rect(Some(Rect::new(100, 30)))
            .with_padding(4, 6),
    );
    v.set_expanded_nodes([id(1), id(2), id(6)]);
    assert_eq!(v.total_size(), 80);

    let items = v.virtual_items();
    let got: Vec<(NodeId, u64, NodeId)> = items
        .iter()
        .map(|n| (n.node.id.clone(), n.item.start, n.item.key.clone()))
        .collect();
    assert_eq!(
        got,
        vec![
            (id(1), 4, NodeId::from(0usize)),
            (id(2), 14, NodeId::from(1usize)),
            (id(4), 24, NodeId::from(2usize)),
            (id(5), 34, NodeId::from(3usize)),
        ]
    );
}

#[test]
fn horizontal_layout_uses_width() {
    let v = TreeVirtualizer::new(
        flat_roots(100)
            .with_horizontal(true)
            .with_initial_rect(Some(Rect::new(30, 500))),
    );
    let range = v.visible_range().unwrap();
    assert_eq!((range.start_index, range.end_index), (0, 2));
}

#[test]
fn initial_offset_provider_and_scroll_margin() {
    let v = TreeVirtualizer::new(
        flat_roots(100)
            .with_initial_rect(Some(Rect::new(100, 50)))
            .with_scroll_margin(100)
            .with_initial_offset_provider(|| 120),
    );
    assert_eq!(v.scroll_offset(), 120);
    assert_eq!(v.item_start(0), Some(100));
    assert_eq!(v.index_at_offset(125), Some(2));
    let range = v.visible_range().unwrap();
    assert_eq!((range.start_index, range.end_index), (2, 6));
}

#[test]
fn set_options_keeps_expansion_that_still_resolves() {
    let mut v = TreeVirtualizer::new(sample_options());
    v.set_expanded_nodes([id(1), id(2)]);

    let next = TreeVirtualizerOptions::new(
        vec![
            TreeNode::root(1, "a"),
            TreeNode::child(2, 1, "a/b"),
            TreeNode::child(3, 1, "a/c"),
        ],
        |n| n.data.to_string(),
    );
    v.set_options(next);
    assert!(v.is_expanded(&id(1)));
    assert!(!v.is_expanded(&id(2)));
    assert_eq!(ids(&v), id_list(&[1, 2, 3]));
}

#[test]
fn node_ids_normalize_numbers() {
    assert_eq!(NodeId::from(5u64), NodeId::from(5i64));
    assert_eq!(NodeId::from(5i128), NodeId::Int(5));
    assert_eq!(NodeId::from(i128::MAX), NodeId::BigInt(i128::MAX));
    assert_ne!(NodeId::from("5"), NodeId::from(5));
    assert_eq!(NodeId::from(String::from("x")).to_string(), "x");
}

#[test]
fn property_random_toggles_match_reference_projection() {
    for seed in 1..=40u64 {
        let mut rng = Lcg::new(seed);
        let n = rng.gen_range_usize(1, 40) as i64;
        let mut data = Vec::new();
        for i in 1..=n {
            let parent = if i == 1 || rng.gen_range_u64(0, 5) == 0 {
                None
            } else {
                Some(NodeId::from(rng.gen_range_u64(1, i as u64) as i64))
            };
            data.push(TreeNode::new(i, parent, ()));
        }

        let options = TreeVirtualizerOptions::new(data, |n| n.id.to_string())
            .with_estimate_size(|_| 10)
            .with_item_keys(ItemKeys::NodeId);
        let mut v = TreeVirtualizer::new(options.clone());

        for _ in 0..60 {
            let target = id(rng.gen_range_u64(1, n as u64 + 1) as i64);
            match v.position_of(&target) {
                Some(pos) => v.toggle_node(&target, pos),
                None if rng.gen_bool() => {
                    v.expand(&target);
                }
                None => {
                    v.collapse(&target);
                }
            }

            assert_eq!(ids(&v), reference_visible(v.tree()), "seed={seed}");
            assert!(v.expanded_nodes().iter().all(|e| v.tree().has_children(e)));
            assert_eq!(v.total_size(), v.count() as u64 * 10);
        }

        let mut rebuilt = TreeVirtualizer::new(options);
        rebuilt.set_expanded_nodes(v.expanded_nodes().iter().cloned());
        assert_eq!(ids(&rebuilt), ids(&v), "seed={seed}");
    }
}

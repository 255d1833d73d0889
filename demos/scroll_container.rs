// Example: driving the engine from a host scroll container and a clock.
use std::cell::Cell;
use std::rc::Rc;

use tree_virtualizer::{Rect, ScrollContainer, TreeNode, TreeVirtualizer, TreeVirtualizerOptions};

#[derive(Clone)]
struct Pane {
    top: Rc<Cell<f64>>,
}

impl ScrollContainer for Pane {
    fn content_rect(&self) -> Rect {
        Rect::new(120, 20)
    }

    fn scroll_left(&self) -> f64 {
        0.0
    }

    fn scroll_top(&self) -> f64 {
        self.top.get()
    }

    fn scroll_to(&mut self, _horizontal: bool, offset: u64) {
        self.top.set(offset as f64);
    }
}

fn main() {
    let data = (0..1_000u32).map(|i| TreeNode::root(i, format!("row {i}")));
    let options = TreeVirtualizerOptions::new(data, |n| n.data.clone())
        .with_estimate_size(|_| 2)
        .with_on_change(Some(|v: &TreeVirtualizer<String>, sync: bool| {
            println!(
                "on_change(sync={sync}) scrolling={} range={:?}",
                v.is_scrolling(),
                v.visible_range().map(|r| (r.start_index, r.end_index))
            );
        }));
    let mut v = TreeVirtualizer::new(options);

    let pane = Pane {
        top: Rc::new(Cell::new(0.0)),
    };
    let token = v.attach(pane.clone());

    // A burst of scroll events, 16ms apart.
    let mut now = 0;
    for step in 1..=5 {
        pane.top.set(step as f64 * 7.5);
        v.handle_scroll(now);
        now += 16;
    }
    println!("deadline={:?}", v.next_timer_deadline());

    // The host sleeps until the deadline and advances the clock.
    if let Some(deadline) = v.next_timer_deadline() {
        v.advance_timers(deadline);
    }
    let first = v.virtual_items().first().map(|n| n.node.data.clone());
    println!("settled at offset={} first={first:?}", v.scroll_offset());

    if let Some(token) = token {
        v.detach(token);
    }
}

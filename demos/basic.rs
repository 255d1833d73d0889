// Example: a file tree, expanded and collapsed, with the rendered window printed.
use tree_virtualizer::{Align, NodeId, Rect, TreeNode, TreeVirtualizer, TreeVirtualizerOptions};

fn render(v: &TreeVirtualizer<&'static str>) {
    for row in v.virtual_items().iter() {
        let indent = "  ".repeat(v.ancestor_chain(&row.node.id).len() - 1);
        let marker = if v.tree().has_children(&row.node.id) {
            if v.is_expanded(&row.node.id) { "v " } else { "> " }
        } else {
            "  "
        };
        println!("{:>3} {indent}{marker}{}", row.item.index, row.node.data);
    }
    println!("-- {} visible, total_size={}", v.count(), v.total_size());
}

fn main() {
    let mut data = vec![TreeNode::root("src", "src"), TreeNode::root("docs", "docs")];
    for i in 0..40 {
        data.push(TreeNode::child(format!("src/{i}"), "src", "module.rs"));
    }
    data.push(TreeNode::child("docs/guide", "docs", "guide.md"));

    let options = TreeVirtualizerOptions::new(data, |n| n.data.to_string())
        .with_initial_rect(Some(Rect::new(80, 8)))
        .with_overscan(2)
        .with_on_change(Some(|v: &TreeVirtualizer<&'static str>, sync: bool| {
            println!("on_change(sync={sync}) visible={}", v.count());
        }));
    let mut v = TreeVirtualizer::new(options);
    render(&v);

    v.toggle_node(&NodeId::from("src"), 0);
    render(&v);

    let target = v.scroll_to_index_offset(41, Align::End);
    v.set_scroll_offset(target);
    println!("scrolled to offset={target} range={:?}", v.visible_range());
    render(&v);

    if let Some(index) = v.reveal(&NodeId::from("docs/guide")) {
        println!("revealed docs/guide at {index}");
    }
    v.collapse(&NodeId::from("src"));
    render(&v);
}

//! A headless tree virtualization engine.
//!
//! Given a hierarchical dataset (flat records with parent links, optionally carrying inline
//! children), the engine keeps track of:
//! - which nodes are expanded,
//! - the depth-first sequence of visible nodes (roots plus the children of expanded nodes),
//! - the window of that sequence a viewport must render, with overscan.
//!
//! It is UI-agnostic. A host renders the window returned by
//! [`TreeVirtualizer::virtual_items`] and feeds viewport geometry back, either by attaching a
//! [`ScrollContainer`] and forwarding its events or by pushing rect/offset updates directly.
//!
//! ```
//! use tree_virtualizer::{NodeId, Rect, TreeNode, TreeVirtualizer, TreeVirtualizerOptions};
//!
//! let data = vec![
//!     TreeNode::root(1, "src"),
//!     TreeNode::child(2, 1, "lib.rs"),
//!     TreeNode::child(3, 1, "main.rs"),
//! ];
//! let options = TreeVirtualizerOptions::new(data, |n| n.data.to_string())
//!     .with_initial_rect(Some(Rect::new(80, 10)));
//! let mut v = TreeVirtualizer::new(options);
//!
//! assert_eq!(v.count(), 1);
//! v.toggle_node(&NodeId::from(1), 0);
//! assert_eq!(v.display_value(2).as_deref(), Some("main.rs"));
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod element;
mod fenwick;
mod key;
mod memo;
mod node;
mod notifier;
mod options;
mod projection;
mod range;
mod sizes;
mod state;
mod tree_state;
mod types;
mod viewport;
mod virtualizer;

#[cfg(test)]
mod tests;

pub use element::IndexedElement;
pub use key::KeySet;
pub use memo::{ByRef, Memo, MemoOnChange, memo};
pub use node::{NodeRef, TreeNode};
pub use notifier::ListenerId;
pub use options::{
    Accessor, CustomItemKey, EstimateSize, InitialOffset, ItemKeys, OnChangeCallback,
    ShouldAdjustScrollPositionOnItemSizeChangeCallback, TreeVirtualizerOptions,
};
pub use range::{IndexEmitter, RangeExtractor, compute_range, default_range_extractor};
pub use state::ViewportState;
pub use tree_state::TreeState;
pub use types::{Align, NodeId, Range, Rect, ScrollDirection, VirtualItem, VirtualNode};
pub use viewport::{AttachToken, ScrollContainer};
pub use virtualizer::TreeVirtualizer;

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::TreeNode;

/// Identifier of a tree node (and of a measured item).
///
/// Ids are strings, integers or large integers. Prefer the `From` conversions over building
/// variants by hand: they keep `BigInt` for values that do not fit in `i64`, so equal numbers
/// always compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeId {
    Int(i64),
    BigInt(i128),
    Str(Arc<str>),
}

impl NodeId {
    pub fn big(value: i128) -> Self {
        match i64::try_from(value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::BigInt(value),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for NodeId {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self::big(value as i128)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self::big(value as i128)
    }
}

impl From<i128> for NodeId {
    fn from(value: i128) -> Self {
        Self::big(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::Str(Arc::from(value))
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::Str(Arc::from(value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Content-box size of the scroll container, in whole pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size along the virtualized axis.
    pub fn main(&self, horizontal: bool) -> u32 {
        if horizontal { self.width } else { self.height }
    }
}

/// The strictly visible window handed to a range extractor.
///
/// `end_index` is inclusive: `start_index <= end_index < count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start_index: usize,
    pub end_index: usize,
    pub overscan: usize,
    pub count: usize,
}

impl Range {
    pub fn len(&self) -> usize {
        self.end_index + 1 - self.start_index
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualItem {
    pub key: NodeId,
    /// Position in the visible sequence.
    pub index: usize,
    /// Start offset in the scroll axis (includes `scroll_margin` and `padding_start`).
    pub start: u64,
    /// Size in the scroll axis (excludes `gap`).
    pub size: u32,
    pub lane: usize,
}

impl VirtualItem {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size as u64)
    }
}

/// A virtual item together with the tree node it renders.
pub struct VirtualNode<T> {
    pub item: VirtualItem,
    pub node: Arc<TreeNode<T>>,
}

impl<T> Clone for VirtualNode<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for VirtualNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualNode")
            .field("item", &self.item)
            .field("id", &self.node.id)
            .finish()
    }
}

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::Range;

/// Strategy turning the visible [`Range`] into the indexes to render.
///
/// Contract: returned indexes are `< range.count` and ascending. The engine drops anything
/// else (and debug-asserts on it). Use [`IndexEmitter`] to build conforming output.
pub type RangeExtractor = Arc<dyn Fn(Range) -> Vec<usize> + Send + Sync>;

/// `max(start - overscan, 0) ..= min(end + overscan, count - 1)`, or empty when `count == 0`.
pub fn compute_range(start: usize, end: usize, overscan: usize, count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let lo = start.saturating_sub(overscan);
    let hi = end.saturating_add(overscan).min(count - 1);
    if lo > hi {
        return Vec::new();
    }
    (lo..=hi).collect()
}

/// The contiguous, overscanned window. Used when no extractor is configured.
pub fn default_range_extractor(range: Range) -> Vec<usize> {
    compute_range(range.start_index, range.end_index, range.overscan, range.count)
}

/// Drops out-of-bounds, duplicate and out-of-order indexes from extractor output.
pub(crate) fn sanitize_indexes(indexes: Vec<usize>, count: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(indexes.len());
    let mut prev: Option<usize> = None;
    for i in indexes {
        if i >= count {
            vwarn!(index = i, count, "range_extractor emitted out-of-bounds index");
            debug_assert!(
                i < count,
                "range_extractor emitted out-of-bounds index (i={i}, count={count})"
            );
            continue;
        }
        if let Some(p) = prev {
            if i == p {
                continue;
            }
            if i < p {
                vwarn!(prev = p, next = i, "range_extractor must emit sorted indexes");
                debug_assert!(
                    i > p,
                    "range_extractor must emit sorted indexes (prev={p}, next={i})"
                );
                continue;
            }
        }
        prev = Some(i);
        out.push(i);
    }
    out
}

/// Helper to build correct range extractor output.
///
/// It enforces the extractor contract while collecting:
/// - Out-of-bounds indexes are ignored (and debug-asserted).
/// - Duplicates are ignored.
/// - Out-of-order indexes are ignored (and debug-asserted).
///
/// ```
/// use tree_virtualizer::{IndexEmitter, Range};
///
/// // Keep row 0 (a pinned header) plus the overscanned window.
/// let extract = |r: Range| {
///     let mut e = IndexEmitter::new(r);
///     e.emit_pinned(0);
///     e.emit_overscanned();
///     e.finish()
/// };
/// let r = Range { start_index: 10, end_index: 12, overscan: 1, count: 50 };
/// assert_eq!(extract(r), vec![0, 9, 10, 11, 12, 13]);
/// ```
#[derive(Debug)]
pub struct IndexEmitter {
    range: Range,
    out: Vec<usize>,
}

impl IndexEmitter {
    pub fn new(range: Range) -> Self {
        Self {
            range,
            out: Vec::new(),
        }
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn emit(&mut self, index: usize) {
        if index >= self.range.count {
            debug_assert!(
                index < self.range.count,
                "IndexEmitter: out-of-bounds index (i={index}, count={})",
                self.range.count
            );
            return;
        }
        if let Some(&prev) = self.out.last() {
            if index == prev {
                return;
            }
            if index < prev {
                debug_assert!(
                    index > prev,
                    "IndexEmitter: indexes must be emitted in ascending order (prev={prev}, next={index})"
                );
                return;
            }
        }
        self.out.push(index);
    }

    pub fn emit_pinned(&mut self, index: usize) {
        self.emit(index);
    }

    /// Emits `start..=end`, clamped to `count`.
    pub fn emit_range(&mut self, start: usize, end: usize) {
        if self.range.count == 0 {
            return;
        }
        let end = end.min(self.range.count - 1);
        if start > end {
            return;
        }
        for i in start..=end {
            self.emit(i);
        }
    }

    pub fn emit_visible(&mut self) {
        self.emit_range(self.range.start_index, self.range.end_index);
    }

    pub fn emit_overscanned(&mut self) {
        let start = self.range.start_index.saturating_sub(self.range.overscan);
        let end = self.range.end_index.saturating_add(self.range.overscan);
        self.emit_range(start, end);
    }

    pub fn finish(self) -> Vec<usize> {
        self.out
    }
}

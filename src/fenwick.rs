use alloc::vec::Vec;
use core::cmp;

/// Prefix sums over row extents (row size plus the trailing gap, if any).
#[derive(Clone, Debug, Default)]
pub(crate) struct Fenwick {
    tree: Vec<u64>, // 1-indexed
    total: u64,
    top_bit: usize,
}

impl Fenwick {
    /// Builds the tree in `O(n)` from per-row sizes; every row but the last gets `gap` added.
    pub(crate) fn from_rows(rows: &[u32], gap: u32) -> Self {
        let n = rows.len();
        let mut tree = alloc::vec![0u64; n + 1];
        let mut total = 0u64;
        for i in 1..=n {
            let extent = row_extent(rows[i - 1], gap, i < n);
            total = total.saturating_add(extent);
            tree[i] = tree[i].saturating_add(extent);
            let parent = i + lsb(i);
            if parent <= n {
                tree[parent] = tree[parent].saturating_add(tree[i]);
            }
        }
        Self {
            tree,
            total,
            top_bit: top_bit(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len().saturating_sub(1)
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn add(&mut self, row: usize, delta: i64) {
        let n = self.len();
        if row >= n || delta == 0 {
            return;
        }
        self.total = apply_delta(self.total, delta);
        let mut i = row + 1;
        while i <= n {
            self.tree[i] = apply_delta(self.tree[i], delta);
            i += lsb(i);
        }
    }

    /// Sum of the first `rows` extents.
    pub(crate) fn prefix_sum(&self, rows: usize) -> u64 {
        let mut i = cmp::min(rows, self.len());
        let mut sum = 0u64;
        while i > 0 {
            sum = sum.saturating_add(self.tree[i]);
            i &= i - 1;
        }
        sum
    }

    /// Number of rows whose cumulative extent is `<= target`, i.e. the row containing the
    /// offset `target` (a gap belongs to the row before it).
    pub(crate) fn rows_before(&self, mut target: u64) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = self.top_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= target {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn row_extent(size: u32, gap: u32, has_next: bool) -> u64 {
    if has_next {
        size as u64 + gap as u64
    } else {
        size as u64
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        debug_assert!(
            value >= delta.unsigned_abs(),
            "Fenwick underflow (value={value}, delta={delta})"
        );
        value.saturating_sub(delta.unsigned_abs())
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn top_bit(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1usize << (usize::BITS - 1 - n.leading_zeros())
    }
}

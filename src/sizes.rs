use alloc::vec::Vec;

use crate::NodeId;
use crate::fenwick::Fenwick;
use crate::key::KeyMap;

/// Item sizes of the visible sequence, laid out in rows of `lanes` items.
///
/// Measured sizes are cached by item key so they survive expand/collapse splices (when keys
/// are stable, e.g. node ids). Unmeasured items use the size estimate. A row is as tall as
/// its largest item.
#[derive(Clone, Debug)]
pub(crate) struct SizeCache {
    key_sizes: KeyMap<NodeId, u32>,
    keys: Vec<NodeId>,
    sizes: Vec<u32>,
    measured: Vec<bool>,
    rows: Vec<u32>,
    sums: Fenwick,
    lanes: usize,
    gap: u32,
    revision: u64,
}

impl SizeCache {
    pub(crate) fn new() -> Self {
        Self {
            key_sizes: KeyMap::new(),
            keys: Vec::new(),
            sizes: Vec::new(),
            measured: Vec::new(),
            rows: Vec::new(),
            sums: Fenwick::default(),
            lanes: 1,
            gap: 0,
            revision: 0,
        }
    }

    /// Re-derives every per-item size from the key cache and the estimate.
    pub(crate) fn relayout(
        &mut self,
        count: usize,
        lanes: usize,
        gap: u32,
        mut key_for: impl FnMut(usize) -> NodeId,
        estimate_size: impl Fn(usize) -> u32,
    ) {
        self.lanes = lanes.max(1);
        self.gap = gap;
        self.keys.clear();
        self.sizes.clear();
        self.measured.clear();
        self.keys.reserve_exact(count);
        self.sizes.reserve_exact(count);
        self.measured.reserve_exact(count);

        for i in 0..count {
            let key = key_for(i);
            match self.key_sizes.get(&key) {
                Some(&size) => {
                    self.sizes.push(size);
                    self.measured.push(true);
                }
                None => {
                    self.sizes.push(estimate_size(i));
                    self.measured.push(false);
                }
            }
            self.keys.push(key);
        }

        self.rows = self
            .sizes
            .chunks(self.lanes)
            .map(|row| row.iter().copied().max().unwrap_or(0))
            .collect();
        self.sums = Fenwick::from_rows(&self.rows, self.gap);
        self.revision = self.revision.wrapping_add(1);
        vtrace!(
            count,
            rows = self.rows.len(),
            cached = self.key_sizes.len(),
            "SizeCache::relayout"
        );
    }

    /// Changes on every layout change; used as a memo dependency.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn count(&self) -> usize {
        self.sizes.len()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn lanes(&self) -> usize {
        self.lanes
    }

    pub(crate) fn size(&self, index: usize) -> Option<u32> {
        self.sizes.get(index).copied()
    }

    pub(crate) fn key(&self, index: usize) -> Option<&NodeId> {
        self.keys.get(index)
    }

    pub(crate) fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn cached_len(&self) -> usize {
        self.key_sizes.len()
    }

    /// Offset of the row holding `index`, relative to the first row.
    pub(crate) fn start_of(&self, index: usize) -> u64 {
        self.sums.prefix_sum(index / self.lanes)
    }

    /// Sum of all row extents (gaps included, paddings excluded).
    pub(crate) fn total(&self) -> u64 {
        self.sums.total()
    }

    /// Row containing `offset` (relative to the first row), clamped to the last row.
    pub(crate) fn row_at(&self, offset: u64) -> Option<usize> {
        let rows = self.rows.len();
        if rows == 0 {
            return None;
        }
        Some(self.sums.rows_before(offset).min(rows - 1))
    }

    /// Records a measured size. Returns how much the item's row grew or shrank.
    pub(crate) fn set_size(&mut self, index: usize, size: u32) -> i64 {
        let Some(&cur) = self.sizes.get(index) else {
            return 0;
        };
        self.measured[index] = true;
        self.key_sizes.insert(self.keys[index].clone(), size);
        if cur == size {
            return 0;
        }
        self.sizes[index] = size;

        let row = index / self.lanes;
        let from = row * self.lanes;
        let to = (from + self.lanes).min(self.sizes.len());
        let row_size = self.sizes[from..to].iter().copied().max().unwrap_or(0);
        let delta = row_size as i64 - self.rows[row] as i64;
        self.rows[row] = row_size;
        self.sums.add(row, delta);
        self.revision = self.revision.wrapping_add(1);
        delta
    }

    pub(crate) fn clear_measurements(&mut self) {
        self.key_sizes.clear();
    }

    pub(crate) fn import(&mut self, entries: impl IntoIterator<Item = (NodeId, u32)>) {
        self.key_sizes.clear();
        self.key_sizes.extend(entries);
    }

    pub(crate) fn export(&self) -> Vec<(NodeId, u32)> {
        self.key_sizes
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

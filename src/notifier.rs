use alloc::vec::Vec;
use core::cell::Cell;

use crate::OnChangeCallback;

/// Handle returned by [`crate::TreeVirtualizer::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registered change listeners plus batching state.
pub(crate) struct ChangeNotifier<T> {
    listeners: Vec<(ListenerId, OnChangeCallback<T>)>,
    next_id: u64,
    depth: Cell<usize>,
    // `Some(sync)` while a batched notification is owed.
    pending: Cell<Option<bool>>,
}

impl<T> ChangeNotifier<T> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            depth: Cell::new(0),
            pending: Cell::new(None),
        }
    }

    pub(crate) fn subscribe(&mut self, listener: OnChangeCallback<T>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn listeners(&self) -> impl Iterator<Item = &OnChangeCallback<T>> {
        self.listeners.iter().map(|(_, cb)| cb)
    }

    /// Returns `true` when the notification should be delivered now; inside a batch it is
    /// recorded instead.
    pub(crate) fn request(&self, sync: bool) -> bool {
        if self.depth.get() == 0 {
            return true;
        }
        let owed = self.pending.get().unwrap_or(false) || sync;
        self.pending.set(Some(owed));
        false
    }

    pub(crate) fn begin_batch(&self) {
        self.depth.set(self.depth.get().saturating_add(1));
    }

    /// Closes a batch level. Returns the owed notification when the outermost batch ends.
    pub(crate) fn end_batch(&self) -> Option<bool> {
        let depth = self.depth.get();
        debug_assert!(depth > 0, "notify batch depth underflow");
        let next = depth.saturating_sub(1);
        self.depth.set(next);
        if next == 0 { self.pending.take() } else { None }
    }
}

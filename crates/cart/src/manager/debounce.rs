//! Per-item debounce task tracking.
//!
//! Each item has at most one armed task. Re-arming aborts the previous task,
//! and every task carries a generation number so a task that has already
//! woken up can tell whether it is still the current one.

use std::collections::{HashMap, HashSet};

use medicart_core::ItemId;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Armed debounce tasks keyed by item.
#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    next_generation: u64,
    tasks: HashMap<ItemId, PendingWrite>,
}

impl PendingWrites {
    /// Reserve a generation number for a task about to be spawned.
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        self.next_generation
    }

    /// Track a freshly spawned task, aborting the one it replaces.
    pub(crate) fn arm(&mut self, item_id: ItemId, generation: u64, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(item_id, PendingWrite { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Called by a task once its delay has elapsed. Removes the entry only if
    /// it still belongs to `generation`; returns whether it did.
    pub(crate) fn detach(&mut self, item_id: &ItemId, generation: u64) -> bool {
        match self.tasks.get(item_id) {
            Some(pending) if pending.generation == generation => {
                self.tasks.remove(item_id);
                true
            }
            _ => false,
        }
    }

    /// Abort and forget the task for one item.
    pub(crate) fn cancel(&mut self, item_id: &ItemId) -> bool {
        self.tasks.remove(item_id).is_some_and(|pending| {
            pending.handle.abort();
            true
        })
    }

    /// Abort and forget every task, returning the affected items.
    pub(crate) fn cancel_all(&mut self) -> Vec<ItemId> {
        self.tasks
            .drain()
            .map(|(item_id, pending)| {
                pending.handle.abort();
                item_id
            })
            .collect()
    }

    pub(crate) fn item_ids(&self) -> HashSet<ItemId> {
        self.tasks.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for PendingWrites {
    fn drop(&mut self) {
        for pending in self.tasks.values() {
            pending.handle.abort();
        }
    }
}

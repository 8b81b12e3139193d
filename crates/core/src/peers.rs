// Side table of weak upward references to managed peers

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Key of a weak peer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

pub struct WeakPeerTable<W> {
    entries: RwLock<HashMap<PeerId, W>>,
    next_id: AtomicU64,
}

impl<W> WeakPeerTable<W> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, weak: W) -> PeerId {
        let id = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().insert(id, weak);
        id
    }

    pub fn remove(&self, id: PeerId) -> Option<W> {
        self.entries.write().remove(&id)
    }

    /// Run `upgrade` on the entry. `None` if the entry is gone or the
    /// upgrade itself finds the peer collected.
    pub fn upgrade<S>(&self, id: PeerId, upgrade: impl FnOnce(&W) -> Option<S>) -> Option<S> {
        let entries = self.entries.read();
        entries.get(&id).and_then(upgrade)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<W> Default for WeakPeerTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

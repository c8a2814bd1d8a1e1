//! Rolling id set for subscription-feed deduplication.
//!
//! Several relays deliver the same event; the pool forwards only the first
//! copy by remembering a bounded window of recently seen event ids.

use cosign_types::EventId;
use std::collections::{HashSet, VecDeque};

/// Default capacity: track the last 65 536 event ids.
pub const DEFAULT_DEDUP_CAPACITY: usize = 65_536;

pub struct EventDedup {
    capacity: usize,
    seen: HashSet<EventId>,
    order: VecDeque<EventId>,
}

impl EventDedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::with_capacity(capacity.min(DEFAULT_DEDUP_CAPACITY)),
            order: VecDeque::with_capacity(capacity.min(DEFAULT_DEDUP_CAPACITY)),
        }
    }

    /// Returns `true` if `id` was already seen; otherwise records it.
    pub fn is_duplicate(&mut self, id: &EventId) -> bool {
        if self.seen.contains(id) {
            return true;
        }
        if self.seen.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        self.seen.insert(*id);
        self.order.push_back(*id);
        false
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for EventDedup {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

// =============================================================================
// Snapshot History — bounded ring of market cross-sections
// =============================================================================
//
// Thread-safe ring buffer of the most recent market snapshots, newest last.
// The movers engine wants exactly two cross-sections; the depth check lives
// here (`latest_pair` is `None` until two snapshots exist) so the engine can
// assume two well-formed inputs.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::types::MarketSnapshot;

pub struct SnapshotHistory {
    inner: RwLock<VecDeque<MarketSnapshot>>,
    max_len: usize,
}

impl SnapshotHistory {
    /// Retain at most `max_len` snapshots (at least 2, so a movers pair can
    /// always form once enough refreshes happen).
    pub fn new(max_len: usize) -> Self {
        Self {
            inner: RwLock::new(VecDeque::with_capacity(max_len.max(2))),
            max_len: max_len.max(2),
        }
    }

    /// Append a snapshot, trimming the oldest beyond capacity.
    pub fn push(&self, snapshot: MarketSnapshot) {
        let mut ring = self.inner.write();
        ring.push_back(snapshot);
        while ring.len() > self.max_len {
            ring.pop_front();
        }
    }

    /// The two most recent snapshots as `(previous, latest)`, or `None` while
    /// history depth is below 2.
    pub fn latest_pair(&self) -> Option<(MarketSnapshot, MarketSnapshot)> {
        let ring = self.inner.read();
        if ring.len() < 2 {
            return None;
        }
        let latest = ring[ring.len() - 1].clone();
        let previous = ring[ring.len() - 2].clone();
        Some((previous, latest))
    }

    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.inner.read().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

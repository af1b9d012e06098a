//! Per-key access history.
//!
//! Every locally processed key operation is recorded as a timestamped
//! observation. External load management consumes two signals from this:
//! per-key access counts within a lookback window (hot keys) and a
//! process-lifetime total (worker load). Eviction of aged records happens
//! on the reporting path, never on the request path.

use crate::core::time::Timestamp;
use crate::protocol::Key;
use std::collections::{BTreeMap, HashMap};

/// Per-key time-ordered access multiset plus a lifetime counter.
#[derive(Debug, Default)]
pub struct AccessTracker {
    history: HashMap<Key, BTreeMap<Timestamp, u64>>,
    total: u64,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one access of `key` at `at`.
    pub fn record(&mut self, key: &str, at: Timestamp) {
        *self
            .history
            .entry(key.to_string())
            .or_default()
            .entry(at)
            .or_insert(0) += 1;
        self.total += 1;
    }

    /// Process-lifetime access count. Never decreases, even when old
    /// per-key records are evicted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Accesses of `key` at or after `cutoff`.
    pub fn count_since(&self, key: &str, cutoff: Timestamp) -> u64 {
        self.history
            .get(key)
            .map(|times| times.range(cutoff..).map(|(_, n)| n).sum())
            .unwrap_or(0)
    }

    /// Per-key access counts at or after `cutoff`, sorted by key. Keys
    /// with no accesses in the window are omitted.
    pub fn counts_since(&self, cutoff: Timestamp) -> Vec<(Key, u64)> {
        let mut counts: Vec<(Key, u64)> = self
            .history
            .iter()
            .filter_map(|(key, times)| {
                let n: u64 = times.range(cutoff..).map(|(_, n)| n).sum();
                (n > 0).then(|| (key.clone(), n))
            })
            .collect();
        counts.sort();
        counts
    }

    /// Drop records older than `cutoff`; keys left with no records are
    /// removed entirely.
    pub fn evict_before(&mut self, cutoff: Timestamp) {
        self.history.retain(|_, times| {
            *times = times.split_off(&cutoff);
            !times.is_empty()
        });
    }

    /// Number of keys with at least one retained record.
    pub fn tracked_keys(&self) -> usize {
        self.history.len()
    }
}

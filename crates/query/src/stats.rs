//! Selector-kind counters and stats snapshots.

use crate::classify::SelectorKind;

/// Monotonic per-kind counters, reset only by an explicit clear.
#[derive(Debug, Clone, Default)]
pub struct SelectorStats {
    counts: [u64; SelectorKind::ALL.len()],
}

impl SelectorStats {
    /// Count one query of the given kind.
    #[inline]
    pub fn record(&mut self, kind: SelectorKind) {
        self.counts[kind as usize] += 1;
    }

    /// Count for one kind.
    #[inline]
    pub fn count(&self, kind: SelectorKind) -> u64 {
        self.counts[kind as usize]
    }

    /// Reset all counters.
    pub fn clear(&mut self) {
        self.counts = [0; SelectorKind::ALL.len()];
    }

    /// Non-zero counts in classification order.
    pub fn breakdown(&self) -> Vec<(SelectorKind, u64)> {
        SelectorKind::ALL
            .into_iter()
            .map(|kind| (kind, self.count(kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Point-in-time view of engine statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Cache hits since the last clear.
    pub hits: u64,
    /// Cache misses since the last clear.
    pub misses: u64,
    /// `hits / (hits + misses)`, `0.0` when nothing was queried.
    pub hit_rate: f64,
    /// Entries currently cached.
    pub cache_size: usize,
    /// Non-zero per-kind query counts.
    pub by_kind: Vec<(SelectorKind, u64)>,
}

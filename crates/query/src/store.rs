//! Bounded key -> entry cache with hit/miss accounting.

use crate::classify::SelectorKind;
use crate::key::CacheKey;
use crate::stats::{SelectorStats, StatsSnapshot};
use log::trace;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Instant;
use sylva_dom::NodeId;

/// Raw node identifiers held by one cache entry. Wrapping happens per read;
/// entries never hold enhanced values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedNodes {
    /// A single query that found nothing.
    None,
    /// A single query's first match.
    One(NodeId),
    /// An all-matches query result, possibly empty.
    Many(Vec<NodeId>),
}

/// One cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The native result, as raw node ids.
    pub result: CachedNodes,
    /// When the entry was populated.
    pub created_at: Instant,
}

impl CacheEntry {
    /// Entry wrapping a native result.
    pub fn new(result: CachedNodes) -> Self {
        Self {
            result,
            created_at: Instant::now(),
        }
    }
}

/// Bounded cache store. Not thread-aware by itself; the engine serializes
/// access behind its own lock.
#[derive(Debug)]
pub struct CacheStore {
    entries: FxHashMap<CacheKey, CacheEntry>,
    /// Insertion order, oldest first, used for bounded eviction.
    order: VecDeque<CacheKey>,
    max_entries: usize,
    hits: u64,
    misses: u64,
    by_kind: SelectorStats,
}

impl CacheStore {
    /// Create a store bounded to `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
            by_kind: SelectorStats::default(),
        }
    }

    /// Change the size bound; takes effect on the next insert.
    pub fn set_limit(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
    }

    /// Look up an entry, updating hit/miss counters.
    ///
    /// A present entry that fails `is_valid` is deleted and reported as a
    /// miss, so the caller refreshes it.
    pub fn get(
        &mut self,
        key: &CacheKey,
        is_valid: impl FnOnce(&CacheEntry) -> bool,
    ) -> Option<CacheEntry> {
        match self.entries.get(key) {
            Some(entry) if is_valid(entry) => {
                self.hits += 1;
                trace!("cache hit for {key}");
                Some(entry.clone())
            }
            Some(_) => {
                trace!("cache entry for {key} went stale");
                self.delete(key);
                self.misses += 1;
                None
            }
            None => {
                trace!("cache miss for {key}");
                self.misses += 1;
                None
            }
        }
    }

    /// Whether an entry exists (no counter updates).
    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert an entry, evicting the oldest one past the size bound.
    pub fn set(&mut self, key: CacheKey, entry: CacheEntry) {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.max_entries {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                if self.entries.remove(&oldest).is_some() {
                    trace!("evicting {oldest} to stay within {}", self.max_entries);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, entry);
    }

    /// Remove one entry.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.order.retain(|queued| queued != key);
        true
    }

    /// Remove every entry matching the predicate; returns how many went.
    pub fn delete_where(&mut self, predicate: impl Fn(&CacheKey, &CacheEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| !predicate(key, entry));
        let removed = before - self.entries.len();
        if removed > 0 {
            let entries = &self.entries;
            self.order.retain(|queued| entries.contains_key(queued));
        }
        removed
    }

    /// Drop all entries. Counters survive; they reset only via
    /// [`CacheStore::clear_stats`].
    pub fn clear_entries(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Reset hit/miss and per-kind counters.
    pub fn clear_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.by_kind.clear();
    }

    /// Count one classified query kind (recorded on misses).
    pub fn record_kind(&mut self, kind: SelectorKind) {
        self.by_kind.record(kind);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.hits + self.misses;
        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
            cache_size: self.entries.len(),
            by_kind: self.by_kind.breakdown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::QueryKind;

    fn key(selector: &str) -> CacheKey {
        CacheKey::global(QueryKind::Multiple, selector)
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let mut store = CacheStore::new(8);
        assert!(store.get(&key(".a"), |_| true).is_none());
        store.set(key(".a"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        assert!(store.get(&key(".a"), |_| true).is_some());
        let snapshot = store.snapshot();
        assert_eq!((snapshot.hits, snapshot.misses), (1, 1));
        assert!((snapshot.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn stale_entries_are_deleted_on_read() {
        let mut store = CacheStore::new(8);
        store.set(key(".a"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        assert!(store.get(&key(".a"), |_| false).is_none());
        assert!(!store.has(&key(".a")));
        assert_eq!(store.snapshot().misses, 1);
    }

    #[test]
    fn size_bound_evicts_oldest_first() {
        let mut store = CacheStore::new(2);
        store.set(key(".a"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        store.set(key(".b"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        store.set(key(".c"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        assert_eq!(store.len(), 2);
        assert!(!store.has(&key(".a")));
        assert!(store.has(&key(".b")));
        assert!(store.has(&key(".c")));
    }

    #[test]
    fn clear_entries_keeps_counters() {
        let mut store = CacheStore::new(8);
        store.set(key(".a"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        assert!(store.get(&key(".a"), |_| true).is_some());
        store.clear_entries();
        assert!(store.is_empty());
        assert_eq!(store.snapshot().hits, 1);
        store.clear_stats();
        assert_eq!(store.snapshot().hits, 0);
    }

    #[test]
    fn deletion_keeps_order_bookkeeping_in_step() {
        let mut store = CacheStore::new(8);
        for _ in 0..100 {
            store.set(key(".a"), CacheEntry::new(CachedNodes::Many(Vec::new())));
            store.delete_where(|candidate, _| candidate.descriptor.contains(".a"));
            store.set(key(".b"), CacheEntry::new(CachedNodes::Many(Vec::new())));
            store.delete(&key(".b"));
        }
        assert!(store.is_empty());
        assert!(store.order.is_empty());

        store.set(key(".c"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        assert_eq!(store.order.len(), store.len());
    }

    #[test]
    fn delete_where_filters_by_key() {
        let mut store = CacheStore::new(8);
        store.set(key(".btn"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        store.set(key(".nav"), CacheEntry::new(CachedNodes::Many(Vec::new())));
        let removed = store.delete_where(|candidate, _| candidate.descriptor.contains(".btn"));
        assert_eq!(removed, 1);
        assert!(store.has(&key(".nav")));
    }
}

//! Engine configuration.

use std::time::Duration;

/// How collection cache entries are validated at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionValidation {
    /// Check only the first member's rootedness. O(1), may briefly serve a
    /// collection whose tail members were detached.
    #[default]
    FirstMember,
    /// Check every member. Exact, O(n) per read.
    FullScan,
}

/// Tunables for a [`crate::QueryEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache size bound; the oldest entry is evicted past it.
    pub max_cache_entries: usize,
    /// Poll interval for `wait_for*`.
    pub poll_interval: Duration,
    /// Collection validity strategy.
    pub collection_validation: CollectionValidation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 256,
            poll_interval: Duration::from_millis(25),
            collection_validation: CollectionValidation::default(),
        }
    }
}

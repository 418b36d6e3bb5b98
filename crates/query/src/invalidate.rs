//! Mutation-driven cache invalidation.
//!
//! The invalidator observes the document's mutation stream and maps each
//! batch to a set of affected selector fragments. Any cached key whose
//! descriptor mentions an affected fragment is dropped; structural changes
//! drop everything. Over-invalidation is accepted, under-invalidation is
//! not.

use crate::store::CacheStore;
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use sylva_dom::{MutationObserver, MutationRecord};

/// Attributes whose changes invalidate cached queries. Anything else is
/// invisible to the selector grammar this engine caches for.
pub const OBSERVED_ATTRIBUTES: &[&str] = &["id", "class", "style", "hidden", "disabled"];

/// Fragment marking "everything is affected".
const WILDCARD: &str = "*";

/// Observer that translates mutation batches into cache deletions.
pub struct MutationInvalidator {
    cache: Arc<Mutex<CacheStore>>,
    destroyed: AtomicBool,
}

impl MutationInvalidator {
    /// Invalidator feeding deletions into `cache`.
    pub fn new(cache: Arc<Mutex<CacheStore>>) -> Self {
        Self {
            cache,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Stop reacting to mutations. Idempotent; batches delivered after this
    /// are ignored.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    /// Whether [`MutationInvalidator::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Selector fragments affected by one batch. A wildcard anywhere
    /// swallows the rest.
    fn affected_fragments(batch: &[MutationRecord]) -> Vec<String> {
        let mut fragments: Vec<String> = Vec::new();
        let mut push = |fragment: String| {
            if !fragments.contains(&fragment) {
                fragments.push(fragment);
            }
        };
        for record in batch {
            match record {
                // Child list changes can affect any structural selector.
                MutationRecord::ChildList { .. } => return vec![WILDCARD.to_owned()],
                MutationRecord::Attribute {
                    name,
                    old_value,
                    new_value,
                    ..
                } => match name.as_str() {
                    "id" => {
                        for value in [old_value, new_value].into_iter().flatten() {
                            push(format!("#{value}"));
                        }
                    }
                    "class" => {
                        for value in [old_value, new_value].into_iter().flatten() {
                            for token in value.split_ascii_whitespace() {
                                push(format!(".{token}"));
                            }
                        }
                    }
                    observed if OBSERVED_ATTRIBUTES.contains(&observed) => {
                        push(format!("[{observed}]"));
                    }
                    _ => {}
                },
            }
        }
        fragments
    }

    /// Apply one batch to the cache.
    fn invalidate(&self, batch: &[MutationRecord]) {
        let fragments = Self::affected_fragments(batch);
        if fragments.is_empty() {
            return;
        }
        let mut cache = self.cache.lock();
        if fragments.iter().any(|fragment| fragment == WILDCARD) {
            let dropped = cache.len();
            cache.clear_entries();
            trace!("structural mutation cleared {dropped} cached queries");
            return;
        }
        let dropped = cache.delete_where(|key, _| {
            fragments
                .iter()
                .any(|fragment| key.descriptor.contains(fragment.as_str()))
        });
        if dropped > 0 {
            trace!("attribute mutations {fragments:?} dropped {dropped} cached queries");
        }
    }
}

impl MutationObserver for MutationInvalidator {
    fn on_mutations(&self, batch: &[MutationRecord]) {
        if self.is_destroyed() {
            return;
        }
        self.invalidate(batch);
    }
}

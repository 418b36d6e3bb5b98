//! Cache-aware query dispatch.
//!
//! The dispatcher is the only path between the cache and the document's
//! selector evaluator. Reads validate lazily: an entry is checked against
//! current rootedness at lookup time rather than eagerly on every mutation.

use crate::classify::classify;
use crate::config::CollectionValidation;
use crate::key::{CacheKey, QueryKind};
use crate::store::{CacheEntry, CacheStore, CachedNodes};
use parking_lot::Mutex;
use sylva_dom::{Document, NodeId, SelectorError};

/// Borrowing view the engine hands to each query.
pub(crate) struct Dispatcher<'engine> {
    pub document: &'engine Document,
    pub cache: &'engine Mutex<CacheStore>,
    pub validation: CollectionValidation,
}

impl Dispatcher<'_> {
    /// First match for `selector`, cached. `scope` restricts the search to a
    /// container's descendants and switches to a scoped key.
    pub fn single(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Option<NodeId>, SelectorError> {
        let key = self.key(QueryKind::Single, scope, selector);
        if let Some(entry) = self.cached(&key) {
            return Ok(match entry.result {
                CachedNodes::One(node) => Some(node),
                _ => None,
            });
        }
        let found = self.document.select_first(scope, selector)?;
        let result = found.map_or(CachedNodes::None, CachedNodes::One);
        self.remember(key, selector, result);
        Ok(found)
    }

    /// All matches for `selector` in document order, cached.
    pub fn multiple(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, SelectorError> {
        let key = self.key(QueryKind::Multiple, scope, selector);
        if let Some(entry) = self.cached(&key)
            && let CachedNodes::Many(nodes) = entry.result
        {
            return Ok(nodes);
        }
        let found = self.document.select_all(scope, selector)?;
        self.remember(key, selector, CachedNodes::Many(found.clone()));
        Ok(found)
    }

    fn key(&self, kind: QueryKind, scope: Option<NodeId>, selector: &str) -> CacheKey {
        match scope {
            None => CacheKey::global(kind, selector),
            Some(container) => {
                let container_id = self.document.attribute(container, "id");
                CacheKey::scoped(kind, selector, container_id.as_deref())
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<CacheEntry> {
        let validation = self.validation;
        self.cache
            .lock()
            .get(key, |entry| entry_is_valid(self.document, entry, validation))
    }

    fn remember(&self, key: CacheKey, selector: &str, result: CachedNodes) {
        let mut cache = self.cache.lock();
        cache.record_kind(classify(selector));
        cache.set(key, CacheEntry::new(result));
    }
}

/// Whether a cache entry still reflects live nodes.
///
/// Empty results stay valid until invalidation drops them; a mutation that
/// could produce a match clears the entry through the observer instead.
pub(crate) fn entry_is_valid(
    document: &Document,
    entry: &CacheEntry,
    validation: CollectionValidation,
) -> bool {
    match &entry.result {
        CachedNodes::None => true,
        CachedNodes::One(node) => document.is_rooted(*node),
        CachedNodes::Many(nodes) => match validation {
            _ if nodes.is_empty() => true,
            CollectionValidation::FirstMember => document.is_rooted(nodes[0]),
            CollectionValidation::FullScan => {
                nodes.iter().all(|&node| document.is_rooted(node))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn dispatcher_fixture() -> (Document, Arc<Mutex<CacheStore>>) {
        let document = Document::new();
        (document, Arc::new(Mutex::new(CacheStore::new(32))))
    }

    #[test]
    fn repeat_queries_hit_the_cache() {
        let (document, cache) = dispatcher_fixture();
        let root = document.root();
        let node = document.create_element("div");
        document.set_attribute(node, "id", "main");
        document.append_child(root, node);

        let dispatcher = Dispatcher {
            document: &document,
            cache: &cache,
            validation: CollectionValidation::FirstMember,
        };
        assert_eq!(dispatcher.single(None, "#main").unwrap(), Some(node));
        assert_eq!(dispatcher.single(None, "#main").unwrap(), Some(node));
        let snapshot = cache.lock().snapshot();
        assert_eq!((snapshot.hits, snapshot.misses), (1, 1));
    }

    #[test]
    fn detached_single_entries_go_stale() {
        let (document, cache) = dispatcher_fixture();
        let root = document.root();
        let node = document.create_element("div");
        document.set_attribute(node, "id", "gone");
        document.append_child(root, node);

        let dispatcher = Dispatcher {
            document: &document,
            cache: &cache,
            validation: CollectionValidation::FirstMember,
        };
        assert_eq!(dispatcher.single(None, "#gone").unwrap(), Some(node));
        document.remove(node);
        assert_eq!(dispatcher.single(None, "#gone").unwrap(), None);
    }

    #[test]
    fn full_scan_rejects_partially_detached_collections() {
        let (document, cache) = dispatcher_fixture();
        let root = document.root();
        let keep = document.create_element("li");
        let drop = document.create_element("li");
        for node in [keep, drop] {
            document.add_class(node, "item");
            document.append_child(root, node);
        }

        let dispatcher = Dispatcher {
            document: &document,
            cache: &cache,
            validation: CollectionValidation::FullScan,
        };
        assert_eq!(dispatcher.multiple(None, ".item").unwrap().len(), 2);
        document.remove(drop);
        // First member is still rooted; only a full scan catches the hole.
        assert_eq!(dispatcher.multiple(None, ".item").unwrap(), vec![keep]);
    }

    #[test]
    fn scoped_keys_do_not_collide_with_global_ones() {
        let (document, cache) = dispatcher_fixture();
        let root = document.root();
        let sidebar = document.create_element("aside");
        document.set_attribute(sidebar, "id", "sidebar");
        document.append_child(root, sidebar);
        let inner = document.create_element("div");
        document.add_class(inner, "item");
        document.append_child(sidebar, inner);
        let outer = document.create_element("div");
        document.add_class(outer, "item");
        document.append_child(root, outer);

        let dispatcher = Dispatcher {
            document: &document,
            cache: &cache,
            validation: CollectionValidation::FirstMember,
        };
        assert_eq!(dispatcher.multiple(None, ".item").unwrap().len(), 2);
        assert_eq!(
            dispatcher.multiple(Some(sidebar), ".item").unwrap(),
            vec![inner]
        );
        assert_eq!(cache.lock().len(), 2);
    }
}

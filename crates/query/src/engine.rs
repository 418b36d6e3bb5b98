//! The query engine facade.
//!
//! One engine per document. The engine owns the cache, the mutation
//! invalidator, and the patch handler registry; queries drain the
//! document's pending mutation batch before touching the cache, so a read
//! never observes a result the mutation stream has already outdated.

use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, entry_is_valid};
use crate::enhance::{Collection, Element};
use crate::error::QueryError;
use crate::invalidate::MutationInvalidator;
use crate::normalize::normalize;
use crate::patch::{HandlerRegistry, Patch, UpdateHandler, apply_patch};
use crate::stats::StatsSnapshot;
use crate::store::CacheStore;
use log::{trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sylva_dom::{Document, MutationObserver, NodeId};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// Result of a name-based lookup; the name's shape decides the variant.
#[derive(Clone)]
pub enum Lookup {
    /// The name resolved to an id query with a match.
    Element(Element),
    /// The name resolved to a class or tag query.
    Collection(Collection),
    /// An id query with no match.
    None,
}

impl Lookup {
    /// The single element, if this lookup produced one.
    pub fn element(self) -> Option<Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Collection(_) | Self::None => None,
        }
    }

    /// The collection, if this lookup produced one.
    pub fn collection(self) -> Option<Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            Self::Element(_) | Self::None => None,
        }
    }
}

/// Per-selector outcome of a bulk update.
#[derive(Debug)]
pub struct BulkOutcome {
    /// The selector this outcome belongs to.
    pub selector: String,
    /// Matched-and-patched count, or the evaluator's rejection.
    pub result: Result<usize, String>,
}

/// Cached, mutation-aware query interface over one [`Document`].
pub struct QueryEngine {
    document: Document,
    cache: Arc<Mutex<CacheStore>>,
    handlers: Arc<HandlerRegistry>,
    invalidator: Arc<MutationInvalidator>,
    /// The invalidator re-typed for observer identity comparisons.
    observer_handle: Arc<dyn MutationObserver>,
    config: Arc<Mutex<EngineConfig>>,
}

impl QueryEngine {
    /// Engine with default configuration.
    pub fn new(document: Document) -> Self {
        Self::with_config(document, EngineConfig::default())
    }

    /// Engine with explicit configuration. Registers the mutation observer
    /// immediately; records still queued from before construction reach it
    /// on the first drain, which is harmless against an empty cache.
    pub fn with_config(document: Document, config: EngineConfig) -> Self {
        let cache = Arc::new(Mutex::new(CacheStore::new(config.max_cache_entries)));
        let invalidator = Arc::new(MutationInvalidator::new(Arc::clone(&cache)));
        let observer_handle = Arc::clone(&invalidator) as Arc<dyn MutationObserver>;
        document.observe(Arc::clone(&observer_handle));
        Self {
            document,
            cache,
            handlers: Arc::new(HandlerRegistry::with_builtins()),
            invalidator,
            observer_handle,
            config: Arc::new(Mutex::new(config)),
        }
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// First match for `selector`, or `None`. Bad input is recovered with a
    /// warning, never an error.
    pub fn query(&self, selector: &str) -> Option<Element> {
        self.scoped_query(None, selector)
    }

    /// All matches for `selector`, in document order. Bad input yields an
    /// empty collection.
    pub fn query_all(&self, selector: &str) -> Collection {
        self.scoped_query_all(None, selector)
    }

    /// First match for `selector` among `container`'s descendants.
    pub fn within(&self, container: NodeId, selector: &str) -> Option<Element> {
        self.scoped_query(Some(container), selector)
    }

    /// All matches for `selector` among `container`'s descendants.
    pub fn within_all(&self, container: NodeId, selector: &str) -> Collection {
        self.scoped_query_all(Some(container), selector)
    }

    /// Name-based lookup. The name is normalized into a selector whose
    /// shape picks the query: id selectors resolve to a single element,
    /// everything else to a collection.
    pub fn get(&self, name: &str) -> Lookup {
        let selector = normalize(name);
        trace!("get({name}) normalized to `{selector}`");
        if selector.starts_with('#') {
            return match self.query(&selector) {
                Some(element) => Lookup::Element(element),
                None => Lookup::None,
            };
        }
        Lookup::Collection(self.query_all(&selector))
    }

    /// Wait until `selector` has a match, polling between checks.
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<Element, QueryError> {
        let deadline = Instant::now() + timeout;
        let poll = self.config.lock().poll_interval;
        loop {
            if let Some(element) = self.query(selector) {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(QueryError::WaitTimeout {
                    selector: selector.to_owned(),
                    waited: timeout,
                });
            }
            sleep(poll).await;
        }
    }

    /// Wait until `selector` has at least `min_count` matches.
    pub async fn wait_for_all(
        &self,
        selector: &str,
        min_count: usize,
        timeout: Duration,
    ) -> Result<Collection, QueryError> {
        let deadline = Instant::now() + timeout;
        let poll = self.config.lock().poll_interval;
        loop {
            let collection = self.query_all(selector);
            if collection.len() >= min_count {
                return Ok(collection);
            }
            if Instant::now() >= deadline {
                return Err(QueryError::WaitTimeout {
                    selector: selector.to_owned(),
                    waited: timeout,
                });
            }
            sleep(poll).await;
        }
    }

    /// Apply a patch to every match of each selector. Outcomes are
    /// per-selector; one bad selector never aborts the rest.
    pub fn update_many(&self, updates: &[(&str, &Patch)]) -> Vec<BulkOutcome> {
        updates
            .iter()
            .map(|(selector, patch)| {
                self.sync();
                let result = match self.dispatcher().multiple(None, selector) {
                    Ok(nodes) => {
                        for &node in &nodes {
                            apply_patch(&self.document, node, patch, &self.handlers);
                        }
                        Ok(nodes.len())
                    }
                    Err(error) => Err(error.to_string()),
                };
                BulkOutcome {
                    selector: (*selector).to_owned(),
                    result,
                }
            })
            .collect()
    }

    /// Register a custom patch-key handler. Handlers run in registration
    /// order, so custom ones are consulted after the built-ins.
    pub fn register_handler(&self, handler: UpdateHandler) {
        self.handlers.register(handler);
    }

    /// Current cache statistics, after draining pending mutations.
    pub fn stats(&self) -> StatsSnapshot {
        self.sync();
        self.cache.lock().snapshot()
    }

    /// Drop cached entries and reset statistics.
    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.clear_entries();
        cache.clear_stats();
    }

    /// Drop cached entries; statistics survive.
    pub fn clear_cache(&self) {
        self.cache.lock().clear_entries();
    }

    /// Replace the engine configuration. The cache size bound applies on
    /// the next insert.
    pub fn configure(&self, config: EngineConfig) {
        self.cache.lock().set_limit(config.max_cache_entries);
        *self.config.lock() = config;
    }

    /// Detach the engine from the document's mutation stream. Idempotent;
    /// queries still work afterwards but the cache goes uninvalidated, so
    /// callers should treat the engine as finished.
    pub fn destroy(&self) {
        self.invalidator.destroy();
        self.document.unobserve(&self.observer_handle);
    }

    /// Background task that periodically prunes entries referencing
    /// detached nodes. Abort the handle to stop it. The task re-reads the
    /// engine configuration every pass, so a later [`QueryEngine::configure`]
    /// applies without a restart.
    pub fn spawn_maintenance(&self, interval: Duration) -> JoinHandle<()> {
        let document = self.document.clone();
        let cache = Arc::clone(&self.cache);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                document.deliver_pending();
                let validation = config.lock().collection_validation;
                let pruned = cache
                    .lock()
                    .delete_where(|_, entry| !entry_is_valid(&document, entry, validation));
                if pruned > 0 {
                    trace!("maintenance pruned {pruned} stale cached queries");
                }
            }
        })
    }

    /// Drain the document's pending mutation batch into the invalidator.
    fn sync(&self) {
        self.document.deliver_pending();
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher {
            document: &self.document,
            cache: &self.cache,
            validation: self.config.lock().collection_validation,
        }
    }

    fn scoped_query(&self, scope: Option<NodeId>, selector: &str) -> Option<Element> {
        if selector.trim().is_empty() {
            warn!("query called with an empty selector");
            return None;
        }
        self.sync();
        match self.dispatcher().single(scope, selector) {
            Ok(found) => found.map(|node| {
                Element::new(self.document.clone(), node, Arc::clone(&self.handlers))
            }),
            Err(error) => {
                warn!("query(`{selector}`) rejected by the evaluator: {error}");
                None
            }
        }
    }

    fn scoped_query_all(&self, scope: Option<NodeId>, selector: &str) -> Collection {
        if selector.trim().is_empty() {
            warn!("query_all called with an empty selector");
            return Collection::empty(
                self.document.clone(),
                selector.to_owned(),
                Arc::clone(&self.handlers),
            );
        }
        self.sync();
        match self.dispatcher().multiple(scope, selector) {
            Ok(nodes) => Collection::new(
                self.document.clone(),
                nodes,
                selector.to_owned(),
                Arc::clone(&self.handlers),
            ),
            Err(error) => {
                warn!("query_all(`{selector}`) rejected by the evaluator: {error}");
                Collection::empty(
                    self.document.clone(),
                    selector.to_owned(),
                    Arc::clone(&self.handlers),
                )
            }
        }
    }
}

impl Drop for QueryEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

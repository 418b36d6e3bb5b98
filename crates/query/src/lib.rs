//! Cached, mutation-aware DOM querying.
//!
//! This crate layers a query cache over a [`sylva_dom::Document`]. Repeat
//! queries are answered from the cache; the engine observes the document's
//! mutation stream and drops exactly the cached results a mutation could
//! have changed, preferring over-invalidation to staleness. Results come
//! back enhanced: single elements and collections both carry a declarative,
//! diff-aware `update` that skips writes already reflected in the tree.
//!
//! # Example
//!
//! ```
//! use sylva_dom::Document;
//! use sylva_query::{Patch, QueryEngine};
//!
//! let document = Document::new();
//! let root = document.root();
//! let button = document.create_element("button");
//! document.set_attribute(button, "id", "save");
//! document.append_child(root, button);
//!
//! let engine = QueryEngine::new(document);
//!
//! // Cached after the first evaluation.
//! let save = engine.query("#save").unwrap();
//! assert_eq!(save.tag().as_deref(), Some("button"));
//!
//! // Declarative update; unchanged keys are skipped.
//! let patch = Patch::new().set("textContent", "Save").class_add("primary");
//! save.update(&patch);
//! assert!(save.has_class("primary"));
//! ```
//!
//! Mutations invalidate lazily: the document queues them, and every engine
//! read drains the queue first, so a query never sees a cached result that
//! the mutation stream has already outdated.

#![allow(
    clippy::module_name_repetitions,
    reason = "Names like QueryEngine and QueryError read better at call sites"
)]
#![allow(clippy::missing_errors_doc, reason = "Internal crate")]
#![allow(clippy::missing_panics_doc, reason = "Internal crate")]

mod classify;
mod config;
mod dispatch;
mod engine;
mod enhance;
mod error;
mod invalidate;
mod key;
mod normalize;
mod patch;
mod stats;
mod store;

pub use classify::{SelectorKind, classify};
pub use config::{CollectionValidation, EngineConfig};
pub use engine::{BulkOutcome, Lookup, QueryEngine};
pub use enhance::{Collection, Element};
pub use error::QueryError;
pub use invalidate::{MutationInvalidator, OBSERVED_ATTRIBUTES};
pub use key::{ANONYMOUS_CONTAINER, CacheKey, QueryKind, QueryType};
pub use normalize::normalize;
pub use patch::{HandlerRegistry, Patch, PatchValue, UpdateHandler};
pub use stats::{SelectorStats, StatsSnapshot};
pub use store::{CacheEntry, CacheStore, CachedNodes};

//! In-memory host document for the sylva query engine.
//!
//! This crate provides the "native" side of the system: an addressable,
//! mutable tree of nodes with:
//! - first-match and all-matches selector evaluation (global or scoped),
//! - attribute / class-list / inline-style / dataset mutation,
//! - event-listener registration and dispatch,
//! - a batched mutation-notification primitive.
//!
//! Mutation records are queued as they happen and delivered to registered
//! observers as one batch per [`Document::deliver_pending`] call, so
//! notification is decoupled from the mutating code the same way a host
//! mutation observer would be.

#![allow(clippy::missing_errors_doc, reason = "Internal crate")]
#![allow(clippy::missing_panics_doc, reason = "Internal crate")]

mod event;
mod mutation;
mod selector;
mod tree;

pub use event::{Event, EventHandler, ListenerOptions};
pub use mutation::{MutationObserver, MutationRecord};
pub use selector::SelectorError;
pub use tree::{Document, NodeId, NodeKind, PropertyValue};

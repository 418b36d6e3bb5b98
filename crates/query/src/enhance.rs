//! Enhanced query results: single elements and collections.
//!
//! Wrappers are non-owning; the document owns every node's lifetime. Each
//! cache hit wraps fresh, so two different cache keys never share a wrapper
//! even when they point at the same underlying node.

use crate::patch::{HandlerRegistry, Patch, apply_patch};
use log::warn;
use std::sync::Arc;
use sylva_dom::{Document, NodeId};

/// One node, enhanced with a declarative `update`.
#[derive(Clone)]
pub struct Element {
    document: Document,
    node: NodeId,
    handlers: Arc<HandlerRegistry>,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl Element {
    pub(crate) fn new(document: Document, node: NodeId, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            document,
            node,
            handlers,
        }
    }

    /// The wrapped node id.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Apply a patch; returns `self` for chaining.
    pub fn update(&self, patch: &Patch) -> &Self {
        apply_patch(&self.document, self.node, patch, &self.handlers);
        self
    }

    /// The node's `id` attribute.
    pub fn id(&self) -> Option<String> {
        self.document.attribute(self.node, "id")
    }

    /// Lowercased tag name.
    pub fn tag(&self) -> Option<String> {
        self.document.tag(self.node)
    }

    /// Flattened text content.
    pub fn text(&self) -> String {
        self.document.text(self.node)
    }

    /// Attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document.attribute(self.node, name)
    }

    /// Whether the node carries a class token.
    pub fn has_class(&self, name: &str) -> bool {
        self.document.has_class(self.node, name)
    }

    /// Whether the node is still connected to the document root.
    pub fn is_rooted(&self) -> bool {
        self.document.is_rooted(self.node)
    }

    /// Not hidden and not styled `display: none`.
    pub fn is_visible(&self) -> bool {
        self.document.attribute(self.node, "hidden").is_none()
            && self.document.style(self.node, "display").as_deref() != Some("none")
    }

    /// Not carrying the `disabled` attribute.
    pub fn is_enabled(&self) -> bool {
        self.document.attribute(self.node, "disabled").is_none()
    }
}

/// An ordered node sequence, enhanced with iteration and array helpers and
/// a broadcasting `update`.
#[derive(Clone)]
pub struct Collection {
    document: Document,
    nodes: Vec<NodeId>,
    descriptor: String,
    handlers: Arc<HandlerRegistry>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("nodes", &self.nodes)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub(crate) fn new(
        document: Document,
        nodes: Vec<NodeId>,
        descriptor: String,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            document,
            nodes,
            descriptor,
            handlers,
        }
    }

    /// A zero-length collection. Still iterable and update-capable.
    pub(crate) fn empty(
        document: Document,
        descriptor: String,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self::new(document, Vec::new(), descriptor, handlers)
    }

    /// Selector text this collection was produced by (diagnostic and
    /// cache-key use only).
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Raw node ids, in document order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Member at a non-negative index.
    pub fn get(&self, index: usize) -> Option<Element> {
        self.nodes.get(index).map(|&node| self.wrap(node))
    }

    /// Member at an index; negative indices count from the end.
    pub fn at(&self, index: isize) -> Option<Element> {
        let resolved = if index < 0 {
            self.nodes.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.get(resolved)
    }

    /// First member.
    pub fn first(&self) -> Option<Element> {
        self.get(0)
    }

    /// Last member.
    pub fn last(&self) -> Option<Element> {
        self.nodes.last().map(|&node| self.wrap(node))
    }

    /// Iterate members as fresh [`Element`] wrappers.
    pub fn iter(&self) -> impl Iterator<Item = Element> + '_ {
        self.nodes.iter().map(|&node| self.wrap(node))
    }

    /// Map members into a plain vector.
    pub fn map<T>(&self, mut transform: impl FnMut(Element) -> T) -> Vec<T> {
        self.iter().map(|element| transform(element)).collect()
    }

    /// Keep members matching the predicate, as a new collection.
    pub fn filter(&self, mut predicate: impl FnMut(&Element) -> bool) -> Self {
        let nodes = self
            .nodes
            .iter()
            .copied()
            .filter(|&node| predicate(&self.wrap(node)))
            .collect();
        Self::new(
            self.document.clone(),
            nodes,
            self.descriptor.clone(),
            Arc::clone(&self.handlers),
        )
    }

    /// First member matching the predicate.
    pub fn find(&self, mut predicate: impl FnMut(&Element) -> bool) -> Option<Element> {
        self.iter().find(|element| predicate(element))
    }

    /// Whether any member matches.
    pub fn some(&self, mut predicate: impl FnMut(&Element) -> bool) -> bool {
        self.iter().any(|element| predicate(&element))
    }

    /// Whether every member matches.
    pub fn every(&self, mut predicate: impl FnMut(&Element) -> bool) -> bool {
        self.iter().all(|element| predicate(&element))
    }

    /// Fold members into an accumulator.
    pub fn reduce<A>(&self, initial: A, mut fold: impl FnMut(A, Element) -> A) -> A {
        self.iter()
            .fold(initial, |accumulator, element| fold(accumulator, element))
    }

    /// Visit every member.
    pub fn for_each(&self, mut visit: impl FnMut(Element)) {
        for element in self.iter() {
            visit(element);
        }
    }

    /// Members that are visible.
    pub fn visible(&self) -> Self {
        self.filter(Element::is_visible)
    }

    /// Members that are enabled.
    pub fn enabled(&self) -> Self {
        self.filter(Element::is_enabled)
    }

    /// Apply a patch to every member; returns `self` for chaining.
    pub fn update(&self, patch: &Patch) -> &Self {
        for &node in &self.nodes {
            apply_patch(&self.document, node, patch, &self.handlers);
        }
        self
    }

    /// Re-query each member's subtree and return the union as a new
    /// collection. The result descriptor is `"<original> <selector>"`.
    pub fn within(&self, selector: &str) -> Self {
        let descriptor = format!("{} {selector}", self.descriptor);
        let mut nodes: Vec<NodeId> = Vec::new();
        for &member in &self.nodes {
            match self.document.select_all(Some(member), selector) {
                Ok(found) => {
                    for node in found {
                        if !nodes.contains(&node) {
                            nodes.push(node);
                        }
                    }
                }
                Err(error) => {
                    warn!("within({selector}) rejected by the evaluator: {error}");
                    return Self::empty(
                        self.document.clone(),
                        descriptor,
                        Arc::clone(&self.handlers),
                    );
                }
            }
        }
        Self::new(
            self.document.clone(),
            nodes,
            descriptor,
            Arc::clone(&self.handlers),
        )
    }

    fn wrap(&self, node: NodeId) -> Element {
        Element::new(self.document.clone(), node, Arc::clone(&self.handlers))
    }
}

impl IntoIterator for &Collection {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

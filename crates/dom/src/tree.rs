//! Document tree structure, node data, and mutation bookkeeping.

use crate::event::{Event, EventHandler, Listener, ListenerOptions};
use crate::mutation::{MutationObserver, MutationRecord};
use crate::selector::SelectorList;
use indextree::Arena;
use log::warn;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

pub use indextree::NodeId;

/// Attribute names treated as boolean reflected properties.
const BOOL_PROPERTIES: [&str; 3] = ["hidden", "disabled", "checked"];

/// What a node is.
#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    /// The document root. Exactly one per tree, never matched by selectors.
    #[default]
    Document,
    /// An element with a lowercased tag name.
    Element {
        /// Lowercased tag name.
        tag: String,
    },
}

/// Data stored for each node in the arena.
#[derive(Default)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    /// Lowercased attribute name -> value pairs, insertion order.
    pub attributes: SmallVec<(String, String), 4>,
    /// Registered event listeners.
    pub listeners: Vec<Listener>,
    /// Flattened text content.
    pub text: String,
}

impl NodeData {
    /// Tag name for element nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document => None,
        }
    }

    /// Attribute value by lowercased name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the class attribute contains the given token.
    pub fn has_class(&self, name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|token| token == name))
    }
}

/// Internal mutable document state.
struct DocumentInner {
    arena: Arena<NodeData>,
    root: NodeId,
    focused: Option<NodeId>,
    /// Records queued since the last delivery.
    pending: Vec<MutationRecord>,
    /// Monotonic count of every record ever queued.
    records_total: u64,
    observers: Vec<Arc<dyn MutationObserver>>,
}

impl DocumentInner {
    fn record(&mut self, record: MutationRecord) {
        self.records_total += 1;
        self.pending.push(record);
    }
}

/// A scalar node property, as seen by the declarative update layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// String-valued property.
    Str(String),
    /// Boolean reflected property (`hidden`, `disabled`, `checked`).
    Bool(bool),
}

/// Cloneable handle to a mutable node tree.
///
/// All operations lock an internal mutex per call; the intended use is the
/// host's single UI-affinity thread, so there is no finer-grained locking.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a root node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::default());
        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                arena,
                root,
                focused: None,
                pending: Vec::new(),
                records_total: 0,
                observers: Vec::new(),
            })),
        }
    }

    /// The permanent root node.
    pub fn root(&self) -> NodeId {
        self.inner.lock().root
    }

    /// Create a detached element; it is not rooted until appended.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.lock();
        inner.arena.new_node(NodeData {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            ..NodeData::default()
        })
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut inner = self.inner.lock();
        match parent.checked_append(child, &mut inner.arena) {
            Ok(()) => inner.record(MutationRecord::ChildList { target: parent }),
            Err(error) => warn!("append_child rejected: {error}"),
        }
    }

    /// Insert `new_node` immediately before `reference`.
    pub fn insert_before(&self, reference: NodeId, new_node: NodeId) {
        let mut inner = self.inner.lock();
        let parent = inner.arena.get(reference).and_then(|node| node.parent());
        match reference.checked_insert_before(new_node, &mut inner.arena) {
            Ok(()) => {
                if let Some(target) = parent {
                    inner.record(MutationRecord::ChildList { target });
                }
            }
            Err(error) => warn!("insert_before rejected: {error}"),
        }
    }

    /// Detach a node (and its subtree) from the tree. The node stays
    /// addressable but is no longer rooted.
    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.lock();
        if node == inner.root {
            warn!("refusing to remove the document root");
            return;
        }
        let parent = inner.arena.get(node).and_then(|data| data.parent());
        node.detach(&mut inner.arena);
        if let Some(target) = parent {
            inner.record(MutationRecord::ChildList { target });
        }
    }

    /// Parent of a node, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.lock();
        inner.arena.get(node).and_then(|data| data.parent())
    }

    /// Children of a node in document order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.lock();
        node.children(&inner.arena).collect()
    }

    /// Tag name for element nodes.
    pub fn tag(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .arena
            .get(node)
            .and_then(|data| data.get().tag_name().map(str::to_owned))
    }

    /// Whether the node is still connected to the document root.
    pub fn is_rooted(&self, node: NodeId) -> bool {
        let inner = self.inner.lock();
        node.ancestors(&inner.arena).last() == Some(inner.root)
    }

    /// Number of nodes currently attached under the root (excluding it).
    pub fn rooted_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.root.descendants(&inner.arena).count().saturating_sub(1)
    }
}

/// Attribute, class, style, and dataset access.
impl Document {
    /// Attribute value by name (case-insensitive).
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let inner = self.inner.lock();
        inner
            .arena
            .get(node)
            .and_then(|data| data.get().attribute(&name).map(str::to_owned))
    }

    /// Set an attribute, queuing a mutation record.
    ///
    /// The document is deliberately not diff-aware: every set queues a
    /// record, even when the value is unchanged. Skipping no-op writes is
    /// the caller's concern.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let mut inner = self.inner.lock();
        let Some(data) = inner.arena.get_mut(node) else {
            return;
        };
        let data = data.get_mut();
        let old_value = data.attribute(&name).map(str::to_owned);
        match data
            .attributes
            .iter_mut()
            .find(|(attr, _)| *attr == name)
        {
            Some((_, existing)) => *existing = value.to_owned(),
            None => data.attributes.push((name.clone(), value.to_owned())),
        }
        inner.record(MutationRecord::Attribute {
            target: node,
            name,
            old_value,
            new_value: Some(value.to_owned()),
        });
    }

    /// Remove an attribute. No record is queued if it was absent.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        let mut inner = self.inner.lock();
        let Some(data) = inner.arena.get_mut(node) else {
            return;
        };
        let data = data.get_mut();
        let old_value = data.attribute(&name).map(str::to_owned);
        if old_value.is_none() {
            return;
        }
        data.attributes.retain(|(attr, _)| *attr != name);
        inner.record(MutationRecord::Attribute {
            target: node,
            name,
            old_value,
            new_value: None,
        });
    }

    /// Class tokens in attribute order.
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|classes| classes.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Whether the node carries the given class token.
    pub fn has_class(&self, node: NodeId, name: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .arena
            .get(node)
            .is_some_and(|data| data.get().has_class(name))
    }

    /// Add a class token; no-op (and no record) if already present.
    pub fn add_class(&self, node: NodeId, name: &str) {
        if self.has_class(node, name) {
            return;
        }
        let mut classes = self.classes(node);
        classes.push(name.to_owned());
        self.set_attribute(node, "class", &classes.join(" "));
    }

    /// Remove a class token; no-op (and no record) if absent.
    pub fn remove_class(&self, node: NodeId, name: &str) {
        if !self.has_class(node, name) {
            return;
        }
        let classes: Vec<String> = self
            .classes(node)
            .into_iter()
            .filter(|token| token != name)
            .collect();
        self.set_attribute(node, "class", &classes.join(" "));
    }

    /// Toggle a class token, returning the new membership state.
    pub fn toggle_class(&self, node: NodeId, name: &str) -> bool {
        if self.has_class(node, name) {
            self.remove_class(node, name);
            false
        } else {
            self.add_class(node, name);
            true
        }
    }

    /// Replace one class token with another, returning whether a
    /// replacement happened.
    pub fn replace_class(&self, node: NodeId, old: &str, new: &str) -> bool {
        if !self.has_class(node, old) {
            return false;
        }
        let classes: Vec<String> = self
            .classes(node)
            .into_iter()
            .map(|token| if token == old { new.to_owned() } else { token })
            .collect();
        self.set_attribute(node, "class", &classes.join(" "));
        true
    }

    /// Inline style property value.
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        parse_style(&style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Set an inline style property; an empty value removes it.
    pub fn set_style(&self, node: NodeId, property: &str, value: &str) {
        let mut entries = self
            .attribute(node, "style")
            .map(|style| parse_style(&style))
            .unwrap_or_default();
        entries.retain(|(name, _)| name != property);
        if !value.is_empty() {
            entries.push((property.to_owned(), value.to_owned()));
        }
        if entries.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            self.set_attribute(node, "style", &serialize_style(&entries));
        }
    }

    /// Dataset value: `name` is camelCase, stored as `data-<kebab-name>`.
    pub fn data(&self, node: NodeId, name: &str) -> Option<String> {
        self.attribute(node, &data_attribute_name(name))
    }

    /// Set a dataset value.
    pub fn set_data(&self, node: NodeId, name: &str, value: &str) {
        self.set_attribute(node, &data_attribute_name(name), value);
    }

    /// Remove a dataset value; no-op if absent.
    pub fn remove_data(&self, node: NodeId, name: &str) {
        self.remove_attribute(node, &data_attribute_name(name));
    }
}

/// Scalar property and method access for the declarative update layer.
impl Document {
    /// Read a scalar property.
    ///
    /// `textContent` maps to the node's text, the boolean reflected
    /// properties map to attribute presence, and everything else falls back
    /// to the attribute of the same name (empty string when absent).
    pub fn property(&self, node: NodeId, name: &str) -> Option<PropertyValue> {
        let inner = self.inner.lock();
        let data = inner.arena.get(node)?.get();
        if name == "textContent" {
            return Some(PropertyValue::Str(data.text.clone()));
        }
        let lowered = name.to_ascii_lowercase();
        if BOOL_PROPERTIES.contains(&lowered.as_str()) {
            return Some(PropertyValue::Bool(data.attribute(&lowered).is_some()));
        }
        Some(PropertyValue::Str(
            data.attribute(&lowered).unwrap_or_default().to_owned(),
        ))
    }

    /// Write a scalar property. See [`Document::property`] for the mapping.
    pub fn set_property(&self, node: NodeId, name: &str, value: &PropertyValue) {
        if name == "textContent" {
            let text = match value {
                PropertyValue::Str(text) => text.clone(),
                PropertyValue::Bool(flag) => flag.to_string(),
            };
            self.set_text(node, &text);
            return;
        }
        let lowered = name.to_ascii_lowercase();
        if BOOL_PROPERTIES.contains(&lowered.as_str()) {
            let on = match value {
                PropertyValue::Bool(flag) => *flag,
                PropertyValue::Str(text) => !text.is_empty(),
            };
            if on {
                self.set_attribute(node, &lowered, "");
            } else {
                self.remove_attribute(node, &lowered);
            }
            return;
        }
        let text = match value {
            PropertyValue::Str(text) => text.clone(),
            PropertyValue::Bool(flag) => flag.to_string(),
        };
        self.set_attribute(node, &lowered, &text);
    }

    /// Flattened text content.
    pub fn text(&self, node: NodeId) -> String {
        let inner = self.inner.lock();
        inner
            .arena
            .get(node)
            .map(|data| data.get().text.clone())
            .unwrap_or_default()
    }

    /// Replace the node's text content. Text lives in the child layer, so
    /// this queues a child-list record.
    pub fn set_text(&self, node: NodeId, text: &str) {
        let mut inner = self.inner.lock();
        let Some(data) = inner.arena.get_mut(node) else {
            return;
        };
        data.get_mut().text = text.to_owned();
        inner.record(MutationRecord::ChildList { target: node });
    }

    /// Invoke a named node method, returning whether the name was known.
    ///
    /// Supported: `remove`, `click`, `focus`, `blur`.
    pub fn call_method(&self, node: NodeId, name: &str) -> bool {
        match name {
            "remove" => {
                self.remove(node);
                true
            }
            "click" => {
                self.dispatch(node, "click");
                true
            }
            "focus" => {
                self.inner.lock().focused = Some(node);
                true
            }
            "blur" => {
                let mut inner = self.inner.lock();
                if inner.focused == Some(node) {
                    inner.focused = None;
                }
                true
            }
            _ => false,
        }
    }

    /// Currently focused node, if any.
    pub fn focused(&self) -> Option<NodeId> {
        self.inner.lock().focused
    }
}

/// Event listener registration and dispatch.
impl Document {
    /// Register a listener. Registering an identical `(type, handler)` pair
    /// again is a no-op; returns whether the listener was added.
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        handler: EventHandler,
        options: ListenerOptions,
    ) -> bool {
        let mut inner = self.inner.lock();
        let Some(data) = inner.arena.get_mut(node) else {
            return false;
        };
        let data = data.get_mut();
        if data
            .listeners
            .iter()
            .any(|listener| listener.same_registration(event_type, &handler))
        {
            return false;
        }
        data.listeners.push(Listener {
            event_type: event_type.to_owned(),
            handler,
            options,
        });
        true
    }

    /// Remove a previously registered listener by `(type, handler)` identity.
    pub fn remove_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        handler: &EventHandler,
    ) -> bool {
        let mut inner = self.inner.lock();
        let Some(data) = inner.arena.get_mut(node) else {
            return false;
        };
        let data = data.get_mut();
        let before = data.listeners.len();
        data.listeners
            .retain(|listener| !listener.same_registration(event_type, handler));
        data.listeners.len() != before
    }

    /// Number of listeners registered for an event type.
    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        let inner = self.inner.lock();
        inner.arena.get(node).map_or(0, |data| {
            data.get()
                .listeners
                .iter()
                .filter(|listener| listener.event_type == event_type)
                .count()
        })
    }

    /// Dispatch an event to the node's listeners. `once` listeners are
    /// dropped after their first invocation.
    pub fn dispatch(&self, node: NodeId, event_type: &str) {
        let handlers: Vec<EventHandler> = {
            let mut inner = self.inner.lock();
            let Some(data) = inner.arena.get_mut(node) else {
                return;
            };
            let data = data.get_mut();
            let handlers = data
                .listeners
                .iter()
                .filter(|listener| listener.event_type == event_type)
                .map(|listener| Arc::clone(&listener.handler))
                .collect();
            data.listeners
                .retain(|listener| listener.event_type != event_type || !listener.options.once);
            handlers
        };
        let event = Event {
            event_type: event_type.to_owned(),
            target: node,
        };
        for handler in handlers {
            handler(&event);
        }
    }
}

/// Mutation observation.
impl Document {
    /// Register a batch observer.
    pub fn observe(&self, observer: Arc<dyn MutationObserver>) {
        self.inner.lock().observers.push(observer);
    }

    /// Detach a previously registered observer (by `Arc` identity).
    pub fn unobserve(&self, observer: &Arc<dyn MutationObserver>) {
        self.inner
            .lock()
            .observers
            .retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    /// Deliver all queued records to observers as one batch.
    ///
    /// The internal lock is released before any observer runs, so observers
    /// may call back into the document.
    pub fn deliver_pending(&self) {
        let (batch, observers) = {
            let mut inner = self.inner.lock();
            if inner.pending.is_empty() {
                return;
            }
            let batch: Vec<MutationRecord> = inner.pending.drain(..).collect();
            (batch, inner.observers.clone())
        };
        for observer in observers {
            observer.on_mutations(&batch);
        }
    }

    /// Number of records queued but not yet delivered.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Monotonic count of every mutation record ever queued. Useful for
    /// asserting that no-op writes were skipped.
    pub fn records_emitted(&self) -> u64 {
        self.inner.lock().records_total
    }
}

/// Native selector evaluation.
impl Document {
    /// First match in document order, optionally scoped to a container's
    /// subtree (the container itself is excluded).
    pub fn select_first(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Option<NodeId>, crate::SelectorError> {
        let list = SelectorList::parse(selector)?;
        let inner = self.inner.lock();
        let start = scope.unwrap_or(inner.root);
        Ok(start
            .descendants(&inner.arena)
            .skip(1)
            .find(|&node| list.matches(&inner.arena, node)))
    }

    /// All matches in document order, optionally scoped.
    pub fn select_all(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, crate::SelectorError> {
        let list = SelectorList::parse(selector)?;
        let inner = self.inner.lock();
        let start = scope.unwrap_or(inner.root);
        Ok(start
            .descendants(&inner.arena)
            .skip(1)
            .filter(|&node| list.matches(&inner.arena, node))
            .collect())
    }
}

/// Parse a `name: value; ...` inline style string.
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|entry| {
            let (name, value) = entry.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            (!name.is_empty() && !value.is_empty())
                .then(|| (name.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Serialize inline style entries back to attribute form.
fn serialize_style(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map a camelCase dataset name to its `data-*` attribute name.
fn data_attribute_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 6);
    out.push_str("data-");
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_doc() -> (Document, NodeId, NodeId) {
        let doc = Document::new();
        let parent = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(doc.root(), parent);
        doc.append_child(parent, child);
        (doc, parent, child)
    }

    #[test]
    fn detached_nodes_are_not_rooted() {
        let (doc, parent, child) = build_doc();
        assert!(doc.is_rooted(parent));
        assert!(doc.is_rooted(child));
        doc.remove(parent);
        assert!(!doc.is_rooted(parent));
        assert!(!doc.is_rooted(child));
    }

    #[test]
    fn set_attribute_records_old_and_new() {
        let (doc, parent, _) = build_doc();
        doc.deliver_pending();
        doc.set_attribute(parent, "id", "a");
        doc.set_attribute(parent, "id", "b");
        assert_eq!(doc.pending_len(), 2);
        assert_eq!(doc.attribute(parent, "id").as_deref(), Some("b"));
    }

    #[test]
    fn class_ops_skip_noop_writes() {
        let (doc, parent, _) = build_doc();
        doc.add_class(parent, "x");
        let emitted = doc.records_emitted();
        doc.add_class(parent, "x");
        assert_eq!(doc.records_emitted(), emitted);
        assert!(doc.toggle_class(parent, "y"));
        assert!(!doc.toggle_class(parent, "y"));
        assert!(doc.replace_class(parent, "x", "z"));
        assert!(!doc.has_class(parent, "x"));
        assert!(doc.has_class(parent, "z"));
    }

    #[test]
    fn style_round_trip() {
        let (doc, parent, _) = build_doc();
        doc.set_style(parent, "color", "red");
        doc.set_style(parent, "display", "none");
        assert_eq!(doc.style(parent, "color").as_deref(), Some("red"));
        doc.set_style(parent, "color", "");
        assert_eq!(doc.style(parent, "color"), None);
        assert_eq!(doc.style(parent, "display").as_deref(), Some("none"));
    }

    #[test]
    fn dataset_uses_kebab_attribute_names() {
        let (doc, parent, _) = build_doc();
        doc.set_data(parent, "userId", "42");
        assert_eq!(doc.attribute(parent, "data-user-id").as_deref(), Some("42"));
        assert_eq!(doc.data(parent, "userId").as_deref(), Some("42"));
    }

    #[test]
    fn duplicate_listener_registration_is_noop() {
        let (doc, parent, _) = build_doc();
        let handler: EventHandler = Arc::new(|_event| {});
        assert!(doc.add_event_listener(parent, "click", Arc::clone(&handler), ListenerOptions::default()));
        assert!(!doc.add_event_listener(parent, "click", Arc::clone(&handler), ListenerOptions::default()));
        assert_eq!(doc.listener_count(parent, "click"), 1);
        assert!(doc.remove_event_listener(parent, "click", &handler));
        assert_eq!(doc.listener_count(parent, "click"), 0);
    }

    #[test]
    fn once_listeners_fire_a_single_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let (doc, parent, _) = build_doc();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler: EventHandler = Arc::new(move |_event| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        doc.add_event_listener(
            parent,
            "click",
            handler,
            ListenerOptions {
                once: true,
                capture: false,
            },
        );
        doc.dispatch(parent, "click");
        doc.dispatch(parent, "click");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn boolean_properties_reflect_attributes() {
        let (doc, parent, _) = build_doc();
        assert_eq!(
            doc.property(parent, "hidden"),
            Some(PropertyValue::Bool(false))
        );
        doc.set_property(parent, "hidden", &PropertyValue::Bool(true));
        assert_eq!(
            doc.property(parent, "hidden"),
            Some(PropertyValue::Bool(true))
        );
        doc.set_property(parent, "hidden", &PropertyValue::Bool(false));
        assert_eq!(doc.attribute(parent, "hidden"), None);
    }
}

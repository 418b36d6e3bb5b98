//! Declarative, diff-aware node updates.
//!
//! A [`Patch`] is an ordered set of key/value pairs. Each key is dispatched
//! to the first matching handler in a registration-ordered registry;
//! built-in handlers cover class-list operations, style maps, attribute
//! maps, dataset maps, listener registration, and scalar properties. Every
//! built-in diffs against the document before writing, so re-applying an
//! identical patch performs no underlying writes.
//!
//! Failure is per key: an unknown key falls back to a same-named node
//! method, and failing that is skipped with one warning while the rest of
//! the patch still applies.

use log::warn;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use sylva_dom::{Document, EventHandler, ListenerOptions, NodeId, PropertyValue};

/// Keys handled as scalar node properties.
const SCALAR_PROPERTIES: [&str; 6] = [
    "textContent",
    "value",
    "title",
    "hidden",
    "disabled",
    "checked",
];

/// A value carried by one patch key.
#[derive(Clone)]
pub enum PatchValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Nested key/value map, insertion-ordered.
    Map(Vec<(String, PatchValue)>),
    List(Vec<PatchValue>),
    /// An event callback, for listener registration.
    Handler(EventHandler),
}

impl PatchValue {
    /// Build a map value.
    pub fn map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Map(pairs.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Scalar text rendering; `None` for `Null`, maps, lists, and handlers.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(text) => Some(text.clone()),
            Self::Int(number) => Some(number.to_string()),
            Self::Float(number) => Some(number.to_string()),
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Null | Self::Map(_) | Self::List(_) | Self::Handler(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Handler(_) => "handler",
        }
    }
}

impl fmt::Debug for PatchValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => write!(formatter, "Str({text:?})"),
            Self::Int(number) => write!(formatter, "Int({number})"),
            Self::Float(number) => write!(formatter, "Float({number})"),
            Self::Bool(flag) => write!(formatter, "Bool({flag})"),
            Self::Null => formatter.write_str("Null"),
            Self::Map(pairs) => formatter.debug_map().entries(pairs.iter().map(|(k, v)| (k, v))).finish(),
            Self::List(items) => formatter.debug_list().entries(items).finish(),
            Self::Handler(_) => formatter.write_str("Handler(..)"),
        }
    }
}

impl From<&str> for PatchValue {
    fn from(text: &str) -> Self {
        Self::Str(text.to_owned())
    }
}

impl From<String> for PatchValue {
    fn from(text: String) -> Self {
        Self::Str(text)
    }
}

impl From<i64> for PatchValue {
    fn from(number: i64) -> Self {
        Self::Int(number)
    }
}

impl From<f64> for PatchValue {
    fn from(number: f64) -> Self {
        Self::Float(number)
    }
}

impl From<bool> for PatchValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<EventHandler> for PatchValue {
    fn from(handler: EventHandler) -> Self {
        Self::Handler(handler)
    }
}

/// An ordered, declarative description of changes to apply to a node.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    entries: Vec<(String, PatchValue)>,
}

impl Patch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level key, replacing any previous value for it.
    pub fn set(mut self, key: &str, value: impl Into<PatchValue>) -> Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key.to_owned(), value)),
        }
        self
    }

    /// Merge one pair into a map-valued top-level key.
    fn merge(mut self, key: &str, name: &str, value: PatchValue) -> Self {
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, PatchValue::Map(pairs))) => pairs.push((name.to_owned(), value)),
            Some((_, other)) => {
                *other = PatchValue::map([(name, value)]);
            }
            None => self
                .entries
                .push((key.to_owned(), PatchValue::map([(name, value)]))),
        }
        self
    }

    /// Set one inline style property.
    pub fn style(self, property: &str, value: impl Into<PatchValue>) -> Self {
        self.merge("style", property, value.into())
    }

    /// Set one attribute (`PatchValue::Null` removes it).
    pub fn attr(self, name: &str, value: impl Into<PatchValue>) -> Self {
        self.merge("attributes", name, value.into())
    }

    /// Set one dataset entry.
    pub fn data(self, name: &str, value: impl Into<PatchValue>) -> Self {
        self.merge("dataset", name, value.into())
    }

    /// Queue a class-list operation (`add`, `remove`, `toggle`, `replace`).
    pub fn class_op(self, operation: &str, value: impl Into<PatchValue>) -> Self {
        self.merge("classList", operation, value.into())
    }

    /// Add a class.
    pub fn class_add(self, name: &str) -> Self {
        self.class_op("add", name)
    }

    /// Remove a class.
    pub fn class_remove(self, name: &str) -> Self {
        self.class_op("remove", name)
    }

    /// Toggle a class.
    pub fn class_toggle(self, name: &str) -> Self {
        self.class_op("toggle", name)
    }

    /// Replace one class with another.
    pub fn class_replace(self, old: &str, new: &str) -> Self {
        self.class_op("replace", PatchValue::list([old.into(), new.into()]))
    }

    /// Register an event listener.
    pub fn on(self, event_type: &str, handler: EventHandler) -> Self {
        self.merge("on", event_type, PatchValue::Handler(handler))
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatchValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Whether the patch carries no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type MatchFn = dyn Fn(&str, &PatchValue) -> bool + Send + Sync;
type ApplyFn = dyn Fn(&Document, NodeId, &str, &PatchValue) + Send + Sync;

/// One patch-key handler: a predicate over `(key, value)` and an apply
/// function. Handlers are tried in registration order; first match wins.
pub struct UpdateHandler {
    name: &'static str,
    matches: Box<MatchFn>,
    apply: Box<ApplyFn>,
}

impl UpdateHandler {
    /// Build a handler from its match predicate and apply function.
    pub fn new(
        name: &'static str,
        matches: impl Fn(&str, &PatchValue) -> bool + Send + Sync + 'static,
        apply: impl Fn(&Document, NodeId, &str, &PatchValue) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            matches: Box::new(matches),
            apply: Box::new(apply),
        }
    }

    /// Handler name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for UpdateHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UpdateHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered handler registry shared by every enhanced value of one engine.
pub struct HandlerRegistry {
    handlers: RwLock<Vec<UpdateHandler>>,
}

impl HandlerRegistry {
    /// Registry pre-loaded with the built-in handlers.
    pub fn with_builtins() -> Self {
        Self {
            handlers: RwLock::new(vec![
                class_list_handler(),
                style_handler(),
                attributes_handler(),
                dataset_handler(),
                listeners_handler(),
                scalar_property_handler(),
            ]),
        }
    }

    /// Append a custom handler; it is consulted after the built-ins.
    pub fn register(&self, handler: UpdateHandler) {
        self.handlers.write().push(handler);
    }

    /// Dispatch one key to the first matching handler.
    pub(crate) fn apply_key(
        &self,
        document: &Document,
        node: NodeId,
        key: &str,
        value: &PatchValue,
    ) -> bool {
        let handlers = self.handlers.read();
        for handler in handlers.iter() {
            if (handler.matches)(key, value) {
                (handler.apply)(document, node, key, value);
                return true;
            }
        }
        false
    }
}

/// Apply a whole patch to one node, key by key.
pub(crate) fn apply_patch(
    document: &Document,
    node: NodeId,
    patch: &Patch,
    registry: &HandlerRegistry,
) {
    for (key, value) in patch.iter() {
        if registry.apply_key(document, node, key, value) {
            continue;
        }
        if document.call_method(node, key) {
            continue;
        }
        warn!("no update handler or node method for patch key `{key}`, skipping it");
    }
}

/// `classList: {add/remove/toggle/replace: name | [names]}`
fn class_list_handler() -> UpdateHandler {
    UpdateHandler::new(
        "classList",
        |key, value| key == "classList" && matches!(value, PatchValue::Map(_)),
        |document, node, _key, value| {
            let PatchValue::Map(operations) = value else {
                return;
            };
            for (operation, argument) in operations {
                match operation.as_str() {
                    "add" => {
                        for name in class_names(argument) {
                            document.add_class(node, &name);
                        }
                    }
                    "remove" => {
                        for name in class_names(argument) {
                            document.remove_class(node, &name);
                        }
                    }
                    "toggle" => {
                        for name in class_names(argument) {
                            document.toggle_class(node, &name);
                        }
                    }
                    "replace" => apply_class_replace(document, node, argument),
                    other => warn!("unknown classList operation `{other}`"),
                }
            }
        },
    )
}

/// Class names from a single string or a list of strings.
fn class_names(value: &PatchValue) -> Vec<String> {
    match value {
        PatchValue::Str(name) => vec![name.clone()],
        PatchValue::List(items) => items
            .iter()
            .filter_map(PatchValue::as_text)
            .collect(),
        other => {
            warn!("classList operand must be a name or list, got {}", other.type_name());
            Vec::new()
        }
    }
}

fn apply_class_replace(document: &Document, node: NodeId, argument: &PatchValue) {
    match argument {
        PatchValue::List(pair) if pair.len() == 2 => {
            if let (Some(old), Some(new)) = (pair[0].as_text(), pair[1].as_text()) {
                document.replace_class(node, &old, &new);
            }
        }
        PatchValue::Map(pairs) => {
            for (old, new) in pairs {
                if let Some(new) = new.as_text() {
                    document.replace_class(node, old, &new);
                }
            }
        }
        other => warn!(
            "classList replace expects [old, new] or a map, got {}",
            other.type_name()
        ),
    }
}

/// `style: {property: value}`, per-property diffed.
fn style_handler() -> UpdateHandler {
    UpdateHandler::new(
        "style",
        |key, value| key == "style" && matches!(value, PatchValue::Map(_)),
        |document, node, _key, value| {
            let PatchValue::Map(properties) = value else {
                return;
            };
            for (property, entry) in properties {
                match entry {
                    PatchValue::Null => {
                        if document.style(node, property).is_some() {
                            document.set_style(node, property, "");
                        }
                    }
                    other => {
                        let Some(text) = other.as_text() else {
                            warn!("style `{property}` expects a scalar value");
                            continue;
                        };
                        if document.style(node, property).as_deref() != Some(text.as_str()) {
                            document.set_style(node, property, &text);
                        }
                    }
                }
            }
        },
    )
}

/// `attributes: {name: value}` or tuple form `["name", value]`.
fn attributes_handler() -> UpdateHandler {
    UpdateHandler::new(
        "attributes",
        |key, value| {
            (key == "attributes" || key == "attrs")
                && matches!(value, PatchValue::Map(_) | PatchValue::List(_))
        },
        |document, node, _key, value| match value {
            PatchValue::Map(pairs) => {
                for (name, entry) in pairs {
                    apply_attribute(document, node, name, entry);
                }
            }
            PatchValue::List(items) => {
                if let Some(PatchValue::Str(_)) = items.first() {
                    apply_attribute_tuple(document, node, items);
                } else {
                    for item in items {
                        match item {
                            PatchValue::List(tuple) => apply_attribute_tuple(document, node, tuple),
                            other => warn!(
                                "attribute tuple expected, got {}",
                                other.type_name()
                            ),
                        }
                    }
                }
            }
            _ => {}
        },
    )
}

fn apply_attribute_tuple(document: &Document, node: NodeId, tuple: &[PatchValue]) {
    let (Some(name), Some(entry)) = (tuple.first().and_then(PatchValue::as_text), tuple.get(1))
    else {
        warn!("attribute tuple must be [name, value]");
        return;
    };
    apply_attribute(document, node, &name, entry);
}

fn apply_attribute(document: &Document, node: NodeId, name: &str, entry: &PatchValue) {
    match entry {
        PatchValue::Null => document.remove_attribute(node, name),
        other => {
            let Some(text) = other.as_text() else {
                warn!("attribute `{name}` expects a scalar value");
                return;
            };
            if document.attribute(node, name).as_deref() != Some(text.as_str()) {
                document.set_attribute(node, name, &text);
            }
        }
    }
}

/// `dataset: {camelName: value}`.
fn dataset_handler() -> UpdateHandler {
    UpdateHandler::new(
        "dataset",
        |key, value| (key == "dataset" || key == "data") && matches!(value, PatchValue::Map(_)),
        |document, node, _key, value| {
            let PatchValue::Map(pairs) = value else {
                return;
            };
            for (name, entry) in pairs {
                match entry {
                    PatchValue::Null => document.remove_data(node, name),
                    other => {
                        let Some(text) = other.as_text() else {
                            warn!("dataset `{name}` expects a scalar value");
                            continue;
                        };
                        if document.data(node, name).as_deref() != Some(text.as_str()) {
                            document.set_data(node, name, &text);
                        }
                    }
                }
            }
        },
    )
}

/// `on: {type: handler}` or tuple form `[type, handler, {once, capture}]`.
/// Re-registering an identical `(type, handler)` pair is a no-op in the
/// document itself.
fn listeners_handler() -> UpdateHandler {
    UpdateHandler::new(
        "listeners",
        |key, value| {
            (key == "on" || key == "listeners")
                && matches!(value, PatchValue::Map(_) | PatchValue::List(_))
        },
        |document, node, _key, value| match value {
            PatchValue::Map(pairs) => {
                for (event_type, entry) in pairs {
                    match entry {
                        PatchValue::Handler(handler) => {
                            document.add_event_listener(
                                node,
                                event_type,
                                Arc::clone(handler),
                                ListenerOptions::default(),
                            );
                        }
                        other => warn!(
                            "listener for `{event_type}` expects a handler, got {}",
                            other.type_name()
                        ),
                    }
                }
            }
            PatchValue::List(items) => {
                if matches!(items.first(), Some(PatchValue::Str(_))) {
                    apply_listener_tuple(document, node, items);
                } else {
                    for item in items {
                        match item {
                            PatchValue::List(tuple) => apply_listener_tuple(document, node, tuple),
                            other => warn!("listener tuple expected, got {}", other.type_name()),
                        }
                    }
                }
            }
            _ => {}
        },
    )
}

fn apply_listener_tuple(document: &Document, node: NodeId, tuple: &[PatchValue]) {
    let (Some(event_type), Some(PatchValue::Handler(handler))) =
        (tuple.first().and_then(PatchValue::as_text), tuple.get(1))
    else {
        warn!("listener tuple must be [type, handler] or [type, handler, options]");
        return;
    };
    let options = tuple.get(2).map_or_else(ListenerOptions::default, |entry| {
        listener_options(entry)
    });
    document.add_event_listener(node, &event_type, Arc::clone(handler), options);
}

fn listener_options(value: &PatchValue) -> ListenerOptions {
    let PatchValue::Map(pairs) = value else {
        return ListenerOptions::default();
    };
    let mut options = ListenerOptions::default();
    for (name, entry) in pairs {
        if let PatchValue::Bool(flag) = entry {
            match name.as_str() {
                "once" => options.once = *flag,
                "capture" => options.capture = *flag,
                _ => {}
            }
        }
    }
    options
}

/// Scalar node properties, strict-equality diffed before assignment.
fn scalar_property_handler() -> UpdateHandler {
    UpdateHandler::new(
        "scalar",
        |key, value| {
            SCALAR_PROPERTIES.contains(&key)
                && !matches!(
                    value,
                    PatchValue::Map(_) | PatchValue::List(_) | PatchValue::Handler(_)
                )
        },
        |document, node, key, value| {
            let current = document.property(node, key);
            let wanted = match value {
                PatchValue::Bool(flag) => PropertyValue::Bool(*flag),
                // Null clears: false for boolean properties, "" otherwise.
                PatchValue::Null => match current {
                    Some(PropertyValue::Bool(_)) => PropertyValue::Bool(false),
                    _ => PropertyValue::Str(String::new()),
                },
                other => PropertyValue::Str(other.as_text().unwrap_or_default()),
            };
            if current.as_ref() != Some(&wanted) {
                document.set_property(node, key, &wanted);
            }
        },
    )
}

//! Native selector parsing and matching.
//!
//! Supports the subset a host evaluator would: `#id`, `.class`, `tag`, `*`,
//! `[attr]` / `[attr=value]`, compounds of those, descendant (whitespace)
//! and child (`>`) combinators, and comma-separated selector lists.
//! Pseudo-classes and pseudo-elements are rejected as unsupported.

use crate::tree::NodeData;
use indextree::{Arena, NodeId};
use std::fmt;

/// Rejection from the native evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Malformed selector text.
    Syntax(String),
    /// Syntactically plausible but outside the supported grammar.
    Unsupported(String),
}

impl fmt::Display for SelectorError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(message) => write!(formatter, "invalid selector syntax: {message}"),
            Self::Unsupported(message) => write!(formatter, "unsupported selector: {message}"),
        }
    }
}

impl std::error::Error for SelectorError {}

/// One compound selector: all parts must match the same element.
#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    /// Attribute name with an optional required value.
    attributes: Vec<(String, Option<String>)>,
    universal: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    fn matches(&self, data: &NodeData) -> bool {
        let Some(tag) = data.tag_name() else {
            // Document root and other non-elements never match.
            return false;
        };
        if let Some(wanted) = &self.tag
            && tag != wanted
        {
            return false;
        }
        if let Some(wanted) = &self.id
            && data.attribute("id") != Some(wanted.as_str())
        {
            return false;
        }
        if self.classes.iter().any(|class| !data.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, expected)| {
            match (data.attribute(name), expected) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A compound chain joined by combinators, left to right.
#[derive(Debug, Clone)]
struct Complex {
    parts: Vec<Compound>,
    /// `combinators[i]` joins `parts[i]` to `parts[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, arena: &Arena<NodeData>, node: NodeId) -> bool {
        let last = self.parts.len() - 1;
        let Some(data) = arena.get(node) else {
            return false;
        };
        self.parts[last].matches(data.get()) && self.prefix_matches(arena, node, last)
    }

    /// Whether `parts[..index]` can be anchored above `node`.
    fn prefix_matches(&self, arena: &Arena<NodeData>, node: NodeId, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        let wanted = &self.parts[index - 1];
        match self.combinators[index - 1] {
            Combinator::Child => {
                let Some(parent) = arena.get(node).and_then(|data| data.parent()) else {
                    return false;
                };
                arena
                    .get(parent)
                    .is_some_and(|data| wanted.matches(data.get()))
                    && self.prefix_matches(arena, parent, index - 1)
            }
            Combinator::Descendant => node.ancestors(arena).skip(1).any(|ancestor| {
                arena
                    .get(ancestor)
                    .is_some_and(|data| wanted.matches(data.get()))
                    && self.prefix_matches(arena, ancestor, index - 1)
            }),
        }
    }
}

/// A parsed comma-separated selector list.
#[derive(Debug, Clone)]
pub(crate) struct SelectorList {
    entries: Vec<Complex>,
}

impl SelectorList {
    /// Parse selector text, rejecting malformed or unsupported input.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Syntax(String::from("empty selector")));
        }
        let entries = split_top_level_commas(trimmed)?
            .into_iter()
            .map(parse_complex)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Whether any list entry matches the node.
    pub fn matches(&self, arena: &Arena<NodeData>, node: NodeId) -> bool {
        self.entries.iter().any(|entry| entry.matches(arena, node))
    }
}

/// Split on commas outside attribute brackets.
fn split_top_level_commas(selector: &str) -> Result<Vec<&str>, SelectorError> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut start = 0;
    for (offset, ch) in selector.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&selector[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(SelectorError::Syntax(format!(
                "unbalanced ']' in `{selector}`"
            )));
        }
    }
    if depth != 0 {
        return Err(SelectorError::Syntax(format!(
            "unclosed '[' in `{selector}`"
        )));
    }
    parts.push(&selector[start..]);
    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err(SelectorError::Syntax(format!(
            "empty selector in list `{selector}`"
        )));
    }
    Ok(parts)
}

/// Parse one complex selector: compounds joined by combinators.
fn parse_complex(text: &str) -> Result<Complex, SelectorError> {
    let text = text.trim();
    let mut parts = Vec::new();
    let mut combinators = Vec::new();
    let mut depth = 0_i32;
    let mut start: Option<usize> = None;
    let mut pending: Option<Combinator> = None;

    for (offset, ch) in text.char_indices() {
        let separator = depth == 0 && (ch == '>' || ch.is_whitespace());
        if separator {
            if let Some(from) = start.take() {
                parts.push(parse_compound(&text[from..offset])?);
            }
            if ch == '>' {
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(SelectorError::Syntax(format!(
                        "dangling combinator in `{text}`"
                    )));
                }
                pending = Some(Combinator::Child);
            } else if pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            continue;
        }
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(SelectorError::Syntax(format!("unbalanced ']' in `{text}`")));
        }
        if start.is_none() {
            if let Some(combinator) = pending.take() {
                combinators.push(combinator);
            }
            start = Some(offset);
        }
    }
    if depth != 0 {
        return Err(SelectorError::Syntax(format!("unclosed '[' in `{text}`")));
    }
    if let Some(from) = start.take() {
        parts.push(parse_compound(&text[from..])?);
    }
    if pending.is_some() || parts.is_empty() {
        return Err(SelectorError::Syntax(format!(
            "selector `{text}` ends with a combinator"
        )));
    }
    Ok(Complex { parts, combinators })
}

/// Parse one compound selector (no combinators).
fn parse_compound(text: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let chars: Vec<char> = text.chars().collect();
    let mut index = 0;
    while index < chars.len() {
        match chars[index] {
            '#' => {
                let (ident, next) = read_identifier(&chars, index + 1);
                if ident.is_empty() {
                    return Err(SelectorError::Syntax(format!("empty id in `{text}`")));
                }
                compound.id = Some(ident);
                index = next;
            }
            '.' => {
                let (ident, next) = read_identifier(&chars, index + 1);
                if ident.is_empty() {
                    return Err(SelectorError::Syntax(format!("empty class in `{text}`")));
                }
                compound.classes.push(ident);
                index = next;
            }
            '[' => {
                let close = chars[index..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|found| index + found)
                    .ok_or_else(|| {
                        SelectorError::Syntax(format!("unclosed '[' in `{text}`"))
                    })?;
                let body: String = chars[index + 1..close].iter().collect();
                compound.attributes.push(parse_attribute(&body, text)?);
                index = close + 1;
            }
            '*' => {
                compound.universal = true;
                index += 1;
            }
            ':' => {
                return Err(SelectorError::Unsupported(format!(
                    "pseudo selectors are not supported: `{text}`"
                )));
            }
            ch if ch.is_ascii_alphabetic() => {
                let (ident, next) = read_identifier(&chars, index);
                compound.tag = Some(ident.to_ascii_lowercase());
                index = next;
            }
            other => {
                return Err(SelectorError::Syntax(format!(
                    "unexpected `{other}` in `{text}`"
                )));
            }
        }
    }
    if compound.is_empty() {
        return Err(SelectorError::Syntax(format!("empty compound in `{text}`")));
    }
    Ok(compound)
}

/// Parse an attribute test body (the text between `[` and `]`).
fn parse_attribute(body: &str, selector: &str) -> Result<(String, Option<String>), SelectorError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(SelectorError::Syntax(format!(
            "empty attribute test in `{selector}`"
        )));
    }
    match body.split_once('=') {
        None => Ok((body.to_ascii_lowercase(), None)),
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(SelectorError::Syntax(format!(
                    "attribute test missing a name in `{selector}`"
                )));
            }
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Ok((name.to_ascii_lowercase(), Some(value.to_owned())))
        }
    }
}

/// Read an identifier (`[A-Za-z0-9_-]+`) starting at `from`.
fn read_identifier(chars: &[char], from: usize) -> (String, usize) {
    let mut end = from;
    while end < chars.len()
        && (chars[end].is_ascii_alphanumeric() || chars[end] == '-' || chars[end] == '_')
    {
        end += 1;
    }
    (chars[from..end].iter().collect(), end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn sample() -> (Document, Vec<crate::NodeId>) {
        // <div id="top" class="outer">
        //   <ul class="list">
        //     <li class="item first" data-row="1"></li>
        //     <li class="item"></li>
        //   </ul>
        // </div>
        // <span class="item"></span>
        let doc = Document::new();
        let div = doc.create_element("div");
        let ul = doc.create_element("ul");
        let li1 = doc.create_element("li");
        let li2 = doc.create_element("li");
        let span = doc.create_element("span");
        doc.append_child(doc.root(), div);
        doc.append_child(div, ul);
        doc.append_child(ul, li1);
        doc.append_child(ul, li2);
        doc.append_child(doc.root(), span);
        doc.set_attribute(div, "id", "top");
        doc.set_attribute(div, "class", "outer");
        doc.set_attribute(ul, "class", "list");
        doc.set_attribute(li1, "class", "item first");
        doc.set_attribute(li1, "data-row", "1");
        doc.set_attribute(li2, "class", "item");
        doc.set_attribute(span, "class", "item");
        (doc, vec![div, ul, li1, li2, span])
    }

    #[test]
    fn simple_selectors_match() {
        let (doc, nodes) = sample();
        assert_eq!(doc.select_first(None, "#top").unwrap(), Some(nodes[0]));
        assert_eq!(doc.select_all(None, ".item").unwrap().len(), 3);
        assert_eq!(doc.select_all(None, "li").unwrap(), vec![nodes[2], nodes[3]]);
        assert_eq!(doc.select_all(None, "[data-row]").unwrap(), vec![nodes[2]]);
        assert_eq!(
            doc.select_all(None, "[data-row=\"1\"]").unwrap(),
            vec![nodes[2]]
        );
    }

    #[test]
    fn compound_and_combinator_selectors() {
        let (doc, nodes) = sample();
        assert_eq!(
            doc.select_all(None, "li.item.first").unwrap(),
            vec![nodes[2]]
        );
        assert_eq!(
            doc.select_all(None, ".outer .item").unwrap(),
            vec![nodes[2], nodes[3]]
        );
        assert_eq!(
            doc.select_all(None, ".list > li").unwrap(),
            vec![nodes[2], nodes[3]]
        );
        // Child combinator must not match grandchildren.
        assert!(doc.select_all(None, ".outer > li").unwrap().is_empty());
        assert_eq!(
            doc.select_all(None, "span, #top").unwrap(),
            vec![nodes[0], nodes[4]]
        );
    }

    #[test]
    fn scoped_queries_exclude_the_container() {
        let (doc, nodes) = sample();
        let scoped = doc.select_all(Some(nodes[0]), ".item").unwrap();
        assert_eq!(scoped, vec![nodes[2], nodes[3]]);
        assert!(doc.select_all(Some(nodes[0]), ".outer").unwrap().is_empty());
    }

    #[test]
    fn syntax_errors_are_rejected() {
        let (doc, _) = sample();
        assert!(matches!(
            doc.select_first(None, ""),
            Err(SelectorError::Syntax(_))
        ));
        assert!(matches!(
            doc.select_first(None, "[unclosed"),
            Err(SelectorError::Syntax(_))
        ));
        assert!(matches!(
            doc.select_first(None, ".."),
            Err(SelectorError::Syntax(_))
        ));
        assert!(matches!(
            doc.select_first(None, "div >"),
            Err(SelectorError::Syntax(_))
        ));
        assert!(matches!(
            doc.select_first(None, "li:first-child"),
            Err(SelectorError::Unsupported(_))
        ));
    }
}

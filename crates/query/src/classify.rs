//! Selector classification.
//!
//! Classification feeds statistics and invalidation decisions only; it never
//! changes what a query matches.

use std::fmt;

/// Shape of a selector string, as decided by ordered first-match tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SelectorKind {
    /// `#name`
    Id,
    /// `.name`
    Class,
    /// Bare tag name.
    Tag,
    /// `[attr]` / `[attr=value]`
    Attribute,
    /// Whitespace combinator without `>`.
    Descendant,
    /// Contains a `>` combinator.
    Child,
    /// Contains a pseudo-class or pseudo-element.
    Pseudo,
    /// Anything else.
    Complex,
}

impl SelectorKind {
    /// All kinds, in classification order.
    pub const ALL: [Self; 8] = [
        Self::Id,
        Self::Class,
        Self::Tag,
        Self::Attribute,
        Self::Descendant,
        Self::Child,
        Self::Pseudo,
        Self::Complex,
    ];

    /// Lowercase name used in stats breakdowns and key encodings.
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Class => "class",
            Self::Tag => "tag",
            Self::Attribute => "attribute",
            Self::Descendant => "descendant",
            Self::Child => "child",
            Self::Pseudo => "pseudo",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Classify a selector string. Total: every input maps to some kind.
pub fn classify(selector: &str) -> SelectorKind {
    let selector = selector.trim();
    if let Some(rest) = selector.strip_prefix('#')
        && is_identifier(rest)
    {
        return SelectorKind::Id;
    }
    if let Some(rest) = selector.strip_prefix('.')
        && is_identifier(rest)
    {
        return SelectorKind::Class;
    }
    if is_tag_name(selector) {
        return SelectorKind::Tag;
    }
    if selector.len() > 2 && selector.starts_with('[') && selector.ends_with(']') {
        return SelectorKind::Attribute;
    }
    if selector.contains(char::is_whitespace) && !selector.contains('>') {
        return SelectorKind::Descendant;
    }
    if selector.contains('>') {
        return SelectorKind::Child;
    }
    if selector.contains(':') {
        return SelectorKind::Pseudo;
    }
    SelectorKind::Complex
}

/// `[A-Za-z0-9_-]+`
fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// `[A-Za-z][A-Za-z0-9]*`
fn is_tag_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_first_match_wins() {
        assert_eq!(classify("#main"), SelectorKind::Id);
        assert_eq!(classify(".btn-primary"), SelectorKind::Class);
        assert_eq!(classify("div"), SelectorKind::Tag);
        assert_eq!(classify("h1"), SelectorKind::Tag);
        assert_eq!(classify("[data-id]"), SelectorKind::Attribute);
        assert_eq!(classify("[role=button]"), SelectorKind::Attribute);
        assert_eq!(classify(".nav .item"), SelectorKind::Descendant);
        assert_eq!(classify("ul > li"), SelectorKind::Child);
        assert_eq!(classify("a:hover"), SelectorKind::Pseudo);
        assert_eq!(classify("div.item[role]"), SelectorKind::Complex);
    }

    #[test]
    fn classification_is_total() {
        for selector in ["", "  ", "#", ".", "###", "p,q", "\u{1F600}"] {
            // No panic, some kind comes back.
            let _ = classify(selector);
        }
        assert_eq!(classify(""), SelectorKind::Complex);
    }
}

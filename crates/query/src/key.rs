//! Cache keys: normalized, type-tagged encodings of queries.

use crate::classify::{SelectorKind, classify};
use std::fmt;

/// Whether a query asks for the first match or all matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// First match in document order.
    Single,
    /// All matches in document order.
    Multiple,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
        })
    }
}

/// Broad query category embedded in the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Id,
    Class,
    Tag,
    /// Any other global selector.
    Selector,
    /// Container-scoped query.
    Scoped,
}

impl fmt::Display for QueryType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Id => "id",
            Self::Class => "class",
            Self::Tag => "tag",
            Self::Selector => "selector",
            Self::Scoped => "scoped",
        })
    }
}

/// Container identity used when the scoping container has no `id`.
///
/// Two unidentified containers with the same selector share a key; preserved
/// for compatibility with the behavior this engine replaces.
pub const ANONYMOUS_CONTAINER: &str = "anonymous";

/// Immutable composite cache index for one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// First-match or all-matches.
    pub kind: QueryKind,
    /// Broad query category.
    pub query_type: QueryType,
    /// The selector text the query ran with.
    pub descriptor: String,
    /// Scoping container identity, for scoped queries only.
    pub container: Option<String>,
}

impl CacheKey {
    /// Key for a global (document-wide) query.
    pub fn global(kind: QueryKind, selector: &str) -> Self {
        let query_type = match classify(selector) {
            SelectorKind::Id => QueryType::Id,
            SelectorKind::Class => QueryType::Class,
            SelectorKind::Tag => QueryType::Tag,
            _ => QueryType::Selector,
        };
        Self {
            kind,
            query_type,
            descriptor: selector.to_owned(),
            container: None,
        }
    }

    /// Key for a container-scoped query. `container_id` is the container's
    /// `id` attribute; absent ids collapse to [`ANONYMOUS_CONTAINER`].
    pub fn scoped(kind: QueryKind, selector: &str, container_id: Option<&str>) -> Self {
        Self {
            kind,
            query_type: QueryType::Scoped,
            descriptor: selector.to_owned(),
            container: Some(container_id.unwrap_or(ANONYMOUS_CONTAINER).to_owned()),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(
                formatter,
                "{}:{}:{}@{container}",
                self.kind, self.query_type, self.descriptor
            ),
            None => write!(
                formatter,
                "{}:{}:{}",
                self.kind, self.query_type, self.descriptor
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_keys_encode_kind_and_type() {
        let key = CacheKey::global(QueryKind::Single, "#main");
        assert_eq!(key.query_type, QueryType::Id);
        assert_eq!(key.to_string(), "single:id:#main");

        let key = CacheKey::global(QueryKind::Multiple, "ul > li");
        assert_eq!(key.query_type, QueryType::Selector);
        assert_eq!(key.to_string(), "multiple:selector:ul > li");
    }

    #[test]
    fn scoped_keys_embed_container_identity() {
        let named = CacheKey::scoped(QueryKind::Multiple, ".item", Some("sidebar"));
        assert_eq!(named.to_string(), "multiple:scoped:.item@sidebar");

        let anonymous = CacheKey::scoped(QueryKind::Multiple, ".item", None);
        assert_eq!(anonymous.to_string(), "multiple:scoped:.item@anonymous");

        // The documented collision: two unidentified containers share a key.
        assert_eq!(anonymous, CacheKey::scoped(QueryKind::Multiple, ".item", None));
        assert_ne!(named, anonymous);
    }
}

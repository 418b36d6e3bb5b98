//! Property-name to selector normalization.
//!
//! Dynamic property access spells queries as names like `idHeader` or
//! `classBtnPrimary`. `normalize` turns those into selector strings by a
//! fixed priority-ordered heuristic; ambiguity is resolved by rule order,
//! never by inspecting the document.

/// Names at least this long are read as camelCase class words (rule 3);
/// shorter all-lowercase names are read as bare tag names (rule 4).
const CAMEL_CLASS_MIN_LEN: usize = 10;

/// Turn a dynamic property name into a selector string.
///
/// Priority order, first match wins:
/// 1. `id` prefix, length > 2 -> `#kebab-rest`    (`idHeader` -> `#header`)
/// 2. `class` prefix, length > 5 -> `.kebab-rest` (`classBtnPrimary` -> `.btn-primary`)
/// 3. long bare camelCase word -> `.kebab` (`btnPrimary` -> `.btn-primary`)
/// 4. short all-lowercase word -> tag      (`div` -> `div`)
/// 5. plain identifier -> `#name`          (`myButton` -> `#myButton`)
/// 6. anything else passes through untouched (already a literal selector).
pub fn normalize(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("id")
        && name.len() > 2
    {
        return format!("#{}", camel_to_kebab(rest));
    }
    if let Some(rest) = name.strip_prefix("class")
        && name.len() > 5
    {
        return format!(".{}", camel_to_kebab(rest));
    }
    if is_camel_word(name) && name.len() >= CAMEL_CLASS_MIN_LEN {
        return format!(".{}", camel_to_kebab(name));
    }
    if name.len() < CAMEL_CLASS_MIN_LEN
        && !name.is_empty()
        && name.chars().all(|ch| ch.is_ascii_lowercase())
    {
        return name.to_owned();
    }
    if is_plain_identifier(name) {
        return format!("#{name}");
    }
    name.to_owned()
}

/// `^[a-z][a-zA-Z]*$` with at least one uppercase letter.
fn is_camel_word(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_lowercase())
        && name.chars().skip(1).all(|ch| ch.is_ascii_alphabetic())
        && name.chars().any(|ch| ch.is_ascii_uppercase())
}

/// `^[a-zA-Z][\w-]*$`
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Insert `-` at every lowercase-to-uppercase boundary, then lowercase.
fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() && previous_lower {
            out.push('-');
        }
        previous_lower = ch.is_ascii_lowercase();
        out.push(ch.to_ascii_lowercase());
    }
    out
}

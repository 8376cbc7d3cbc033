//! String conversion utilities.

/// Canonical form of an entity title used for title-based lookups.
///
/// Trims, collapses inner whitespace runs to a single space, and lowercases,
/// so `"  Hit   Points"` and `"hit points"` resolve to the same attribute.
///
/// # Examples
///
/// ```
/// use questbound_domain::common::normalize_title;
///
/// assert_eq!(normalize_title("  Hit   Points "), "hit points");
/// ```
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether two titles refer to the same entity.
pub fn titles_match(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_match_ignores_case_and_spacing() {
        assert!(titles_match("Max HP", " max   hp"));
        assert!(!titles_match("Max HP", "MaxHP"));
    }
}

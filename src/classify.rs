//! Pure classification and splitting of link targets.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{LinkParts, LinkType};

/// `http://` or `https://`, any case.
static HTTP_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^https?://").expect("valid regex"));

/// `mailto:`, any case.
static MAILTO_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^mailto:").expect("valid regex"));

/// Generic URI scheme such as `ftp:` or `tel:`. Requires two letters so Windows drive
/// letters are not mistaken for schemes.
static ANY_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]+:").expect("valid regex");
});

/// Categorize an href. Rules are checked in order and the first match wins.
pub fn classify_link_type(href: &str) -> LinkType {
    if href.is_empty() {
        return LinkType::Other;
    }
    if href.starts_with('#') {
        return LinkType::Anchor;
    }
    if HTTP_SCHEME.is_match(href) {
        return LinkType::Http;
    }
    if MAILTO_SCHEME.is_match(href) {
        return LinkType::Mailto;
    }
    if href.starts_with('/') {
        return LinkType::Absolute;
    }
    return LinkType::Relative;
}

/// The fragment from the first `#` onward.
pub fn extract_anchor(href: &str) -> Option<&str> {
    return href.find('#').and_then(|idx| return href.get(idx..));
}

/// True for targets the rewriters must never touch: web and mail links,
/// absolute paths, and anything else carrying a URI scheme.
pub fn is_external_link(href: &str) -> bool {
    return match classify_link_type(href) {
        LinkType::Absolute | LinkType::Http | LinkType::Mailto => true,
        LinkType::Anchor | LinkType::Other => false,
        LinkType::Relative => ANY_SCHEME.is_match(href),
    };
}

/// Split an href into path, query, and anchor. The anchor starts at the first `#`;
/// a `?` only opens a query when it comes before that `#`.
pub fn split_link_parts(href: &str) -> LinkParts<'_> {
    let hash = href.find('#');
    let question = href.find('?').filter(|q| return hash.is_none_or(|h| return *q < h));

    let path_end = question.or(hash).unwrap_or(href.len());
    let query = question.and_then(|q| return href.get(q..hash.unwrap_or(href.len())));
    let anchor = hash.and_then(|h| return href.get(h..));

    return LinkParts {
        anchor,
        path: href.get(..path_end).unwrap_or(href),
        query,
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_rule_order() {
        assert_eq!(classify_link_type(""), LinkType::Other);
        assert_eq!(classify_link_type("#intro"), LinkType::Anchor);
        assert_eq!(classify_link_type("HTTPS://example.com"), LinkType::Http);
        assert_eq!(classify_link_type("http://example.com/#x"), LinkType::Http);
        assert_eq!(classify_link_type("MailTo:someone@example.com"), LinkType::Mailto);
        assert_eq!(classify_link_type("/abs/page.md"), LinkType::Absolute);
        assert_eq!(classify_link_type("../page.md"), LinkType::Relative);
        assert_eq!(classify_link_type("page.md"), LinkType::Relative);
    }

    #[test]
    fn external_covers_other_schemes() {
        assert!(is_external_link("https://example.com"));
        assert!(is_external_link("mailto:a@b.c"));
        assert!(is_external_link("/root.md"));
        assert!(is_external_link("ftp://files.example.com/a.md"));
        assert!(!is_external_link("docs/page.md"));
        assert!(!is_external_link("#anchor"));
        assert!(!is_external_link(""));
    }

    #[test]
    fn split_separates_query_and_anchor() {
        let parts = split_link_parts("../page.md?v=2#overview");
        assert_eq!(parts.path, "../page.md");
        assert_eq!(parts.query, Some("?v=2"));
        assert_eq!(parts.anchor, Some("#overview"));
        assert_eq!(parts.suffix(), "?v=2#overview");
    }

    #[test]
    fn question_mark_after_anchor_belongs_to_anchor() {
        let parts = split_link_parts("page.md#what?");
        assert_eq!(parts.path, "page.md");
        assert_eq!(parts.query, None);
        assert_eq!(parts.anchor, Some("#what?"));
    }

    #[test]
    fn plain_path_has_no_suffix() {
        let parts = split_link_parts("page.md");
        assert_eq!(parts.path, "page.md");
        assert_eq!(parts.suffix(), "");
        assert_eq!(extract_anchor("page.md"), None);
        assert_eq!(extract_anchor("page.md#a#b"), Some("#a#b"));
    }
}

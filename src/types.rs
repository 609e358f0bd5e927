/// Core domain types for extracted links, edit instructions, and findings.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// One inline link as found by the scanner. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLink {
    /// Byte offset one past the end of the link node, when the parser recorded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    /// Raw link target as written, possibly empty.
    pub href: String,
    /// One-based line of the link node's start.
    pub line: usize,
    /// Byte offset of the link node's start, when the parser recorded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Concatenated direct text of the link label.
    pub text: String,
}

/// An edit instruction: swap `old_href` for `new_href` at an offset range or on a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    /// Byte offset one past the end of the region the href lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    /// Which strategy produced this edit. `None` tallies as `Updated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReplacementKind>,
    /// One-based line used when offsets are absent.
    pub line: usize,
    /// Replacement href.
    pub new_href: String,
    /// Href expected in the original text.
    pub old_href: String,
    /// Byte offset of the start of the region the href lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
}

impl Replacement {
    /// Build a replacement anchored at the link's recorded position.
    pub fn for_link(link: &ParsedLink, new_href: String, kind: ReplacementKind) -> Self {
        return Self {
            end: link.end,
            kind: Some(kind),
            line: link.line,
            new_href,
            old_href: link.href.clone(),
            start: link.start,
        };
    }

    /// The kind this replacement is tallied under.
    pub fn effective_kind(&self) -> ReplacementKind {
        return self.kind.unwrap_or(ReplacementKind::Updated);
    }
}

/// Tag naming the generator strategy behind a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplacementKind {
    /// Relative link rewritten into a docs-folder-rooted path. Never emitted.
    NormalizedFull,
    /// Relative link rewritten to its shortest equivalent form.
    NormalizedRel,
    /// Broken link repaired by a path-depth variant.
    Patched,
    /// Bulk prefix rename.
    PathSubstitution,
    /// Untagged edit.
    Updated,
}

impl ReplacementKind {
    /// Stable string name, matching the serialized form.
    pub const fn as_str(self) -> &'static str {
        return match self {
            ReplacementKind::NormalizedFull => "normalizedFull",
            ReplacementKind::NormalizedRel => "normalizedRel",
            ReplacementKind::Patched => "patched",
            ReplacementKind::PathSubstitution => "pathSubstitution",
            ReplacementKind::Updated => "updated",
        };
    }

    /// Whether applying this kind of edit makes a file worth persisting.
    /// `Updated` edits only ever change the in-memory result.
    pub const fn triggers_write(self) -> bool {
        return !matches!(self, ReplacementKind::Updated);
    }
}

impl fmt::Display for ReplacementKind {
    /// Write the camelCase name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Outcome of applying an edit list to one piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    /// How many replacements took effect.
    pub applied: usize,
    /// Applied count per kind.
    pub by_kind: BTreeMap<ReplacementKind, usize>,
    /// The rewritten content.
    pub content: String,
}

impl ApplyResult {
    /// Applied count for one kind, zero when absent.
    pub fn count(&self, kind: ReplacementKind) -> usize {
        return self.by_kind.get(&kind).copied().unwrap_or(0);
    }

    /// Sum of applied edits whose kind warrants writing the file back.
    pub fn write_triggering_count(&self) -> usize {
        return self
            .by_kind
            .iter()
            .filter(|(kind, _)| return kind.triggers_write())
            .fold(0_usize, |acc, (_, n)| return acc.saturating_add(*n));
    }
}

/// A broken link that could not be repaired. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkError {
    /// Markdown file holding the link.
    pub file: PathBuf,
    /// Always [`LinkError::TARGET_NOT_FOUND`].
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Raw text of the offending line, empty when out of range.
    pub line: String,
    /// One-based line of the link.
    #[serde(rename = "lineNumber")]
    pub line_number: usize,
}

impl LinkError {
    /// Finding type for a link whose target and all variants are missing.
    pub const TARGET_NOT_FOUND: &'static str = "LINK TARGET NOT FOUND";
}

/// Category of a link target, decided by `classify::classify_link_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Rooted at `/`.
    Absolute,
    /// In-document fragment such as `#usage`.
    Anchor,
    /// `http://` or `https://`.
    Http,
    /// `mailto:` address.
    Mailto,
    /// Empty target.
    Other,
    /// Everything else.
    Relative,
}

impl fmt::Display for LinkType {
    /// Write the lowercase name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkType::Absolute => "absolute",
            LinkType::Anchor => "anchor",
            LinkType::Http => "http",
            LinkType::Mailto => "mailto",
            LinkType::Other => "other",
            LinkType::Relative => "relative",
        };
        return f.write_str(name);
    }
}

/// An href split into path, query (with `?`), and anchor (with `#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParts<'a> {
    /// Fragment including the leading `#`.
    pub anchor: Option<&'a str>,
    /// Everything before the query or anchor.
    pub path: &'a str,
    /// Query including the leading `?`.
    pub query: Option<&'a str>,
}

impl LinkParts<'_> {
    /// Query and anchor joined back together, empty when both are absent.
    pub fn suffix(&self) -> String {
        return format!("{}{}", self.query.unwrap_or(""), self.anchor.unwrap_or(""));
    }
}

/// All links extracted from one markdown file.
#[derive(Debug, Clone, Serialize)]
pub struct FileLinks {
    /// Links in source order.
    pub links: Vec<ParsedLink>,
    /// The markdown file.
    pub path: PathBuf,
}

//! Markdown link extraction, per document and per directory tree.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tree_sitter::{Node, Parser, Range, Tree};

use crate::error::Error;
use crate::fs::FileSystem;
use crate::grammar;
use crate::types::{FileLinks, ParsedLink};

/// Extract every inline link from markdown content, in source order.
///
/// Never fails: content the parser cannot make sense of yields fewer links,
/// possibly none. Links inside code blocks and code spans are not links.
pub fn extract_links(content: &str) -> Vec<ParsedLink> {
    let Some(block_tree) = parse_block_tree(content) else {
        tracing::debug!("block parse produced no tree");
        return Vec::new();
    };

    let mut inline_parser = Parser::new();
    if let Err(e) = inline_parser.set_language(&grammar::inline_language()) {
        tracing::debug!(error = %e, "inline grammar unavailable");
        return Vec::new();
    }

    let mut inline_regions = Vec::new();
    collect_inline_regions(block_tree.root_node(), &mut inline_regions);

    let mut links = Vec::new();
    for ranges in &inline_regions {
        let Some(inline_tree) = parse_inline_region(&mut inline_parser, content, ranges) else {
            continue;
        };
        collect_inline_links(inline_tree.root_node(), content, &mut links);
    }

    return links;
}

/// Result of scanning a directory tree.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Files that could not be read, with the reason.
    pub failures: Vec<(PathBuf, Error)>,
    /// Extracted links per readable file, sorted by path.
    pub files: Vec<FileLinks>,
}

/// Extract links from every markdown file under `dir`.
/// Files are read and parsed in parallel; one unreadable file does not stop the rest.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `dir` does not exist.
pub fn scan_directory<F: FileSystem + ?Sized>(fs: &F, dir: &Path) -> Result<ScanReport, Error> {
    let paths = fs.markdown_files(dir)?;
    tracing::debug!(dir = %dir.display(), files = paths.len(), "scanning markdown");

    let results: Vec<(PathBuf, Result<Vec<ParsedLink>, Error>)> = paths
        .into_par_iter()
        .map(|path| {
            let links = fs.read_file(&path).map(|content| return extract_links(&content));
            return (path, links);
        })
        .collect();

    let mut report = ScanReport::default();
    for (path, outcome) in results {
        match outcome {
            Err(e) => report.failures.push((path, e)),
            Ok(links) => report.files.push(FileLinks { links, path }),
        }
    }
    report.files.sort_by(|a, b| return a.path.cmp(&b.path));
    return Ok(report);
}

/// Parse the block structure of a document.
fn parse_block_tree(content: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&grammar::block_language()).ok()?;
    return parser.parse(content, None);
}

/// Collect the byte ranges of every inline region, in document order.
/// Paragraph text, heading text, and table cells are inline regions.
fn collect_inline_regions(node: Node<'_>, regions: &mut Vec<Vec<Range>>) {
    if matches!(node.kind(), "inline" | "pipe_table_cell") {
        regions.push(ranges_excluding_named_children(node));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_inline_regions(child, regions);
    }
    return;
}

/// The node's range with its named children cut out. Named children of an inline
/// node are block markers such as `>` continuations, which are not inline text.
fn ranges_excluding_named_children(node: Node<'_>) -> Vec<Range> {
    let mut remaining = node.range();
    let mut ranges = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let child_range = child.range();
        if child_range.start_byte > remaining.start_byte {
            ranges.push(Range {
                end_byte: child_range.start_byte,
                end_point: child_range.start_point,
                start_byte: remaining.start_byte,
                start_point: remaining.start_point,
            });
        }
        remaining.start_byte = child_range.end_byte;
        remaining.start_point = child_range.end_point;
    }

    if remaining.end_byte > remaining.start_byte {
        ranges.push(remaining);
    }
    return ranges;
}

/// Parse one inline region. Positions in the returned tree are absolute.
fn parse_inline_region(parser: &mut Parser, content: &str, ranges: &[Range]) -> Option<Tree> {
    if ranges.is_empty() {
        return None;
    }
    if let Err(e) = parser.set_included_ranges(ranges) {
        tracing::debug!(error = %e, "skipping inline region with invalid ranges");
        return None;
    }
    return parser.parse(content, None);
}

/// Walk an inline tree and record each inline link.
fn collect_inline_links(node: Node<'_>, content: &str, links: &mut Vec<ParsedLink>) {
    if node.kind() == "inline_link" {
        links.push(parsed_link_from_node(node, content));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_inline_links(child, content, links);
    }
    return;
}

/// Build a link record from an `inline_link` node.
fn parsed_link_from_node(node: Node<'_>, content: &str) -> ParsedLink {
    let mut href = String::new();
    let mut text = String::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "link_destination" => href = destination_text(child, content),
            "link_text" => text = direct_text(child, content),
            _ => {},
        }
    }

    return ParsedLink {
        end: Some(node.end_byte()),
        href,
        line: node.start_position().row.saturating_add(1),
        start: Some(node.start_byte()),
        text,
    };
}

/// Raw destination text, without the optional `<…>` wrapper.
fn destination_text(node: Node<'_>, content: &str) -> String {
    let raw = content.get(node.start_byte()..node.end_byte()).unwrap_or("").trim();
    let unwrapped = raw
        .strip_prefix('<')
        .and_then(|r| return r.strip_suffix('>'))
        .unwrap_or(raw);
    return unwrapped.to_string();
}

/// Text directly inside a node, skipping nested structures like emphasis or code.
fn direct_text(node: Node<'_>, content: &str) -> String {
    let mut text = String::new();
    let mut position = node.start_byte();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        text.push_str(content.get(position..child.start_byte()).unwrap_or(""));
        position = child.end_byte();
    }
    text.push_str(content.get(position..node.end_byte()).unwrap_or(""));
    return text;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn extracts_links_in_source_order() {
        let content = "This is a [link](old.md) and [another](other.md).";
        let links = extract_links(content);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "old.md");
        assert_eq!(links[0].text, "link");
        assert_eq!(links[0].line, 1);
        assert_eq!(links[0].start, Some(10));
        assert_eq!(links[0].end, Some(24));
        assert_eq!(links[1].href, "other.md");
        assert_eq!(links[1].text, "another");
    }

    #[test]
    fn offsets_cover_the_link_node() {
        let content = "# Title\n\nSee [the guide](../guide.md#setup) for more.\n";
        let links = extract_links(content);

        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.line, 3);
        assert_eq!(link.href, "../guide.md#setup");
        let span = &content[link.start.unwrap()..link.end.unwrap()];
        assert_eq!(span, "[the guide](../guide.md#setup)");
    }

    #[test]
    fn links_in_headings_lists_and_quotes() {
        let content = "## See [a](a.md)\n\n- item [b](b.md)\n\n> quoted [c](c.md)\n";
        let hrefs: Vec<String> = extract_links(content).into_iter().map(|l| l.href).collect();
        assert_eq!(hrefs, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn code_is_not_scanned() {
        let content = "```\n[not](a.md)\n```\n\nInline `[nope](b.md)` and [yes](c.md).\n";
        let links = extract_links(content);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "c.md");
        assert_eq!(links[0].line, 5);
    }

    #[test]
    fn images_are_not_links() {
        let links = extract_links("![diagram](img/flow.md) and [doc](doc.md)\n");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "doc.md");
    }

    #[test]
    fn empty_destination_is_kept() {
        let links = extract_links("[empty]()\n");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "");
        assert_eq!(links[0].text, "empty");
    }

    #[test]
    fn angle_bracket_destination_is_unwrapped() {
        let links = extract_links("[spaced](<my file.md>)\n");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "my file.md");
    }

    #[test]
    fn no_links_in_plain_or_broken_markdown() {
        assert!(extract_links("").is_empty());
        assert!(extract_links("just text\n").is_empty());
        assert!(extract_links("[unclosed](oops.md\n\n**bold").is_empty());
    }

    #[test]
    fn scan_directory_collects_per_file_links() {
        let fs = MemoryFileSystem::new();
        fs.insert("/d/b.md", "[x](x.md)\n");
        fs.insert("/d/a.md", "[y](y.md) [z](z.md)\n");
        fs.insert("/d/skip.txt", "[w](w.md)\n");

        let report = scan_directory(&fs, Path::new("/d")).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].path, PathBuf::from("/d/a.md"));
        assert_eq!(report.files[0].links.len(), 2);
        assert_eq!(report.files[1].links[0].href, "x.md");
    }

    #[test]
    fn scan_missing_directory_fails() {
        let fs = MemoryFileSystem::new();
        assert!(scan_directory(&fs, Path::new("/missing")).is_err());
    }
}

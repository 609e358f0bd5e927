/// Tree-sitter markdown grammars and markdown file detection.
use std::path::Path;

use tree_sitter::Language;

/// Block-level markdown grammar: sections, paragraphs, code blocks.
pub fn block_language() -> Language {
    return tree_sitter_md::LANGUAGE.into();
}

/// Inline markdown grammar: links, emphasis, code spans.
pub fn inline_language() -> Language {
    return tree_sitter_md::INLINE_LANGUAGE.into();
}

/// Whether a path names a markdown document.
pub fn is_markdown_path(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");
    return matches!(ext, "md" | "markdown");
}

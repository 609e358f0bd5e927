use std::fmt::Write as _;
use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::resolver::to_slash;
use crate::types::LinkError;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
    return;
}

/// Print markdown to stderr with bold headings.
pub fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render an error as a structured markdown diagnostic: what happened, and how
/// to fix it where there is something to fix.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => format!(
            "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Check the `--config` path, or drop the flag to use `{CONFIG_FILE}` in the project root.
",
            path.display()
        ),

        Error::EmptySubstitutionBase => "\
# Error: Empty Prefix

`substitute` needs a non-empty OLD prefix. An empty one would match every link.

## Fix

Pass the folder prefix being replaced, e.g. `linkmend substitute old/ new/`.
"
        .to_string(),

        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::Io(inner) => format!(
            "\
# Error: I/O

{inner}
"
        ),

        Error::Json(inner) => format!(
            "\
# Error: JSON Output

{inner}
"
        ),

        Error::LinkPathUndefined => "\
# Error: Empty Link Path

A link with no path was handed to the path resolver.
"
        .to_string(),

        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Invalid Config

Could not parse `{}`: {reason}

## Fix

Valid keys are `dataset_root`, `docs_folders`, `exclusion_list`, `include`, and `exclude`.
",
            file.display()
        ),

        Error::TomlDe(inner) => format!(
            "\
# Error: Invalid TOML

{inner}
"
        ),

        Error::Walk(inner) => format!(
            "\
# Error: Directory Walk

{inner}
"
        ),

        Error::Watch(inner) => format!(
            "\
# Error: Watch Setup

{inner}
"
        ),
    };
}

/// `path` relative to `root` with `/` separators, or as given when outside it.
pub fn display_path(path: &Path, root: &Path) -> String {
    return to_slash(path.strip_prefix(root).unwrap_or(path));
}

/// One link rewrite, for reports.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRecord {
    /// File containing the link.
    pub file: std::path::PathBuf,
    /// 1-based line of the link.
    pub line: usize,
    /// Replacement target.
    pub new_href: String,
    /// Target as written.
    pub old_href: String,
}

/// Render the `## Unresolved links` section for existence-check findings.
pub fn render_unresolved(errors: &[LinkError], root: &Path) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Unresolved links\n\n");
    for err in errors {
        let _ = writeln!(out, "- {}:{}  {}", display_path(&err.file, root), err.line_number, err.kind);
        if !err.line.trim().is_empty() {
            let _ = writeln!(out, "  {}", err.line.trim());
        }
    }
    out.push('\n');
    return out;
}

/// Render a titled list of link rewrites.
pub fn render_patches(title: &str, patches: &[PatchRecord], root: &Path) -> String {
    if patches.is_empty() {
        return String::new();
    }

    let mut out = format!("## {title}\n\n");
    for patch in patches {
        let _ = writeln!(
            out,
            "- {}:{}  `{}` -> `{}`",
            display_path(&patch.file, root),
            patch.line,
            patch.old_href,
            patch.new_href,
        );
    }
    out.push('\n');
    return out;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn unresolved_section_lists_location_and_line() {
        let errors = [LinkError {
            file: PathBuf::from("/data/docs/a.md"),
            kind: LinkError::TARGET_NOT_FOUND,
            line: "  see [x](gone.md)".to_string(),
            line_number: 4,
        }];
        let md = render_unresolved(&errors, Path::new("/data"));
        assert_eq!(
            md,
            "## Unresolved links\n\n- docs/a.md:4  LINK TARGET NOT FOUND\n  see [x](gone.md)\n\n"
        );
    }

    #[test]
    fn empty_sections_render_nothing() {
        assert!(render_unresolved(&[], Path::new("/")).is_empty());
        assert!(render_patches("Patched", &[], Path::new("/")).is_empty());
    }

    #[test]
    fn patches_render_old_and_new() {
        let patches = [PatchRecord {
            file: PathBuf::from("/data/a.md"),
            line: 2,
            new_href: "b.md".to_string(),
            old_href: "../b.md".to_string(),
        }];
        let md = render_patches("Fixable", &patches, Path::new("/data"));
        assert!(md.starts_with("## Fixable\n\n"));
        assert!(md.contains("- a.md:2  `../b.md` -> `b.md`"));
    }

    #[test]
    fn errors_render_as_markdown_headings() {
        let md = render_error(&Error::FileNotFound { path: PathBuf::from("x.md") });
        assert!(md.starts_with("# Error: File Not Found"));
        assert!(md.contains("`x.md`"));

        let md = render_error(&Error::LinkPathUndefined);
        assert!(md.starts_with("# Error: Empty Link Path"));
    }
}

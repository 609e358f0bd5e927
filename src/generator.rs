//! Replacement strategies: normalization, path substitution, and existence-check patching.
//!
//! Each strategy reads extracted links and emits edit instructions; none of them
//! touch the content itself. Links with empty, external, excluded, or placeholder
//! targets are never rewritten.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{is_external_link, split_link_parts};
use crate::config::LinkProcessingConfig;
use crate::fs::FileSystem;
use crate::resolver::{parent_dir, relative_path, resolve_markdown_path, to_slash, try_resolve_path_variants};
use crate::types::{LinkError, LinkParts, ParsedLink, Replacement, ReplacementKind};

/// Internal placeholder marker of the form `:name.md:`, never a real target.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^:.*\.md:$").expect("valid regex"));

/// Whether a link must be left alone by every strategy.
pub fn should_skip_link(href: &str, config: &LinkProcessingConfig) -> bool {
    return href.is_empty()
        || is_external_link(href)
        || config.is_excluded(href)
        || PLACEHOLDER.is_match(href);
}

// ── Normalization ─────────────────────────────────────────────────────

/// Normalization rules, tried in order; the first rule that applies decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationRule {
    /// A bare file name sitting directly in the dataset root.
    DatasetRootFile,
    /// Rewrite to a docs-folder-rooted path. Such paths are not navigable from
    /// editors or hosting, so this rule never applies.
    DocsFolderRooted,
    /// The target exists in or below the linking file's directory.
    SameTree,
}

/// Rule order used by [`generate_normalization_replacements`].
pub const NORMALIZATION_RULES: [NormalizationRule; 3] = [
    NormalizationRule::SameTree,
    NormalizationRule::DatasetRootFile,
    NormalizationRule::DocsFolderRooted,
];

/// Everything a rule needs to judge one link.
struct NormalizationContext<'a> {
    /// Absolute dataset root.
    dataset_root: &'a Path,
    /// Directory of the linking file.
    file_dir: &'a Path,
    /// The href as written.
    href: &'a str,
    /// The href split into path, query, anchor.
    parts: LinkParts<'a>,
    /// Resolved absolute target.
    target: &'a Path,
    /// Whether the target exists.
    target_exists: bool,
}

impl NormalizationRule {
    /// Kind tag for replacements proposed by this rule.
    pub const fn kind(self) -> ReplacementKind {
        return match self {
            NormalizationRule::DatasetRootFile | NormalizationRule::SameTree => {
                ReplacementKind::NormalizedRel
            },
            NormalizationRule::DocsFolderRooted => ReplacementKind::NormalizedFull,
        };
    }

    /// The canonical href for this link, or `None` if the rule does not apply.
    /// A proposal may equal the original href.
    fn propose(self, ctx: &NormalizationContext<'_>) -> Option<String> {
        return match self {
            NormalizationRule::DatasetRootFile => propose_dataset_root_file(ctx),
            NormalizationRule::DocsFolderRooted => None,
            NormalizationRule::SameTree => propose_same_tree(ctx),
        };
    }
}

/// Canonical relative path when the target exists in the file's own subtree.
fn propose_same_tree(ctx: &NormalizationContext<'_>) -> Option<String> {
    if !ctx.target_exists {
        return None;
    }
    let rel = to_slash(&relative_path(ctx.file_dir, ctx.target));
    if rel.is_empty() || rel.starts_with("..") {
        return None;
    }
    return Some(format!("{}{}", match_dot_prefix(&rel, ctx.href), ctx.parts.suffix()));
}

/// Bare file name when the target sits directly in the dataset root.
fn propose_dataset_root_file(ctx: &NormalizationContext<'_>) -> Option<String> {
    let rel = to_slash(&relative_path(ctx.dataset_root, ctx.target)).replace('\\', "/");
    if rel.is_empty() || rel.starts_with("..") || rel == "./" {
        return None;
    }
    if rel.contains('/') || rel == "index.md" || !ctx.target_exists {
        return None;
    }
    return Some(format!("{rel}{}", ctx.parts.suffix()));
}

/// Give a computed relative path the same `./` convention as the href it replaces.
fn match_dot_prefix(rel: &str, original: &str) -> String {
    if original.starts_with("./") {
        if rel.starts_with('.') {
            return rel.to_string();
        }
        return format!("./{rel}");
    }
    return rel.strip_prefix("./").unwrap_or(rel).to_string();
}

/// Rewrite links to their shortest equivalent relative form.
///
/// A target that exists in the linking file's subtree gets its canonical
/// relative path. Otherwise a target that is a bare file in the dataset root
/// (other than `index.md`) gets its bare name. Query and anchor are kept verbatim.
pub fn generate_normalization_replacements<F: FileSystem + ?Sized>(
    links: &[ParsedLink],
    file: &Path,
    config: &LinkProcessingConfig,
    fs: &F,
) -> Vec<Replacement> {
    let file_dir = parent_dir(file);
    let mut replacements = Vec::new();

    for link in links {
        if should_skip_link(&link.href, config) {
            continue;
        }
        let parts = split_link_parts(&link.href);
        if parts.path.is_empty() {
            continue;
        }
        let Ok(target) =
            resolve_markdown_path(file, parts.path, config.docs_folders(), config.dataset_root())
        else {
            continue;
        };

        let ctx = NormalizationContext {
            dataset_root: config.dataset_root(),
            file_dir,
            href: &link.href,
            parts,
            target: &target,
            target_exists: fs.exists(&target),
        };

        let decision = NORMALIZATION_RULES
            .iter()
            .find_map(|rule| return rule.propose(&ctx).map(|href| return (*rule, href)));
        let Some((rule, new_href)) = decision else {
            continue;
        };
        if new_href != link.href {
            replacements.push(Replacement::for_link(link, new_href, rule.kind()));
        }
    }

    return replacements;
}

// ── Path substitution ─────────────────────────────────────────────────

/// Bulk prefix rename: every href starting with `old_base` (after converting
/// `\` to `/`) gets `new_base` in place of that prefix. Skipped links are left
/// alone. Needs no file system access.
pub fn generate_path_substitution_replacements(
    links: &[ParsedLink],
    old_base: &str,
    new_base: &str,
    config: &LinkProcessingConfig,
) -> Vec<Replacement> {
    if old_base.is_empty() {
        return Vec::new();
    }

    let mut replacements = Vec::new();
    for link in links {
        if should_skip_link(&link.href, config) {
            continue;
        }
        let normalized = link.href.replace('\\', "/");
        let Some(remainder) = normalized.strip_prefix(old_base) else {
            continue;
        };
        let new_href = format!("{new_base}{remainder}");
        if new_href != link.href {
            replacements.push(Replacement::for_link(link, new_href, ReplacementKind::PathSubstitution));
        }
    }
    return replacements;
}

// ── Existence check ───────────────────────────────────────────────────

/// Patches for repairable broken links plus a finding for each unrepairable one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExistenceCheck {
    /// Links whose target and every path-depth variant are missing.
    pub errors: Vec<LinkError>,
    /// `patched` replacements for links repaired by a variant.
    pub replacements: Vec<Replacement>,
}

/// Find links whose targets are missing, repairing those that a shallower
/// `../` variant fixes and reporting the rest. `lines` is the file's content
/// split into lines, used to quote the offending line in findings.
pub fn generate_existence_check_replacements<F: FileSystem + ?Sized>(
    links: &[ParsedLink],
    file: &Path,
    config: &LinkProcessingConfig,
    fs: &F,
    lines: &[&str],
) -> ExistenceCheck {
    let file_dir = parent_dir(file);
    let mut check = ExistenceCheck::default();

    for link in links {
        if should_skip_link(&link.href, config) {
            continue;
        }
        let parts = split_link_parts(&link.href);
        if parts.path.is_empty() {
            continue;
        }
        let Ok(target) =
            resolve_markdown_path(file, parts.path, config.docs_folders(), config.dataset_root())
        else {
            continue;
        };
        if fs.exists(&target) {
            continue;
        }

        let patched = try_resolve_path_variants(
            file,
            parts.path,
            config.docs_folders(),
            fs,
            config.dataset_root(),
        )
        .and_then(|variant| {
            return resolve_markdown_path(file, &variant, config.docs_folders(), config.dataset_root()).ok();
        })
        .map(|resolved| return to_slash(&relative_path(file_dir, &resolved)))
        .filter(|rel| return !rel.is_empty());

        match patched {
            None => {
                let line = link
                    .line
                    .checked_sub(1)
                    .and_then(|idx| return lines.get(idx))
                    .copied()
                    .unwrap_or("");
                check.errors.push(LinkError {
                    file: file.to_path_buf(),
                    kind: LinkError::TARGET_NOT_FOUND,
                    line: line.to_string(),
                    line_number: link.line,
                });
            },
            Some(rel) => {
                let new_href = format!("{}{}", match_dot_prefix(&rel, &link.href), parts.suffix());
                if new_href != link.href {
                    check.replacements.push(Replacement::for_link(link, new_href, ReplacementKind::Patched));
                }
            },
        }
    }

    return check;
}

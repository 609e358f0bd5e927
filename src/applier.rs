//! Applying edit lists to raw markdown, and the per-file pipeline around it.

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::fs::FileSystem;
use crate::scanner::extract_links;
use crate::types::{ApplyResult, ParsedLink, Replacement};

/// Bytes searched on each side of a replacement's offsets when the old href is
/// not exactly at `start..end`.
pub const FALLBACK_WINDOW: usize = 64;

/// Apply replacements to `content` with the default fallback window.
pub fn apply_replacements(content: &str, replacements: &[Replacement]) -> ApplyResult {
    return apply_replacements_with_window(content, replacements, FALLBACK_WINDOW);
}

/// Apply replacements to `content`.
///
/// Replacements carrying both offsets are applied right to left, so earlier
/// splices never shift offsets still to be processed. If the old href is not at
/// the exact offsets, the first occurrence inside `start - window .. end + window`
/// is used instead, preferring one in link-destination position. Replacements
/// without offsets edit the first occurrence of
/// the old href on their line. Anything that does not fit is skipped.
pub fn apply_replacements_with_window(
    content: &str,
    replacements: &[Replacement],
    window: usize,
) -> ApplyResult {
    let mut result = ApplyResult {
        content: content.to_string(),
        ..ApplyResult::default()
    };
    if replacements.is_empty() {
        return result;
    }

    let (mut offset_based, line_based): (Vec<&Replacement>, Vec<&Replacement>) =
        replacements.iter().partition(|r| return r.start.is_some() && r.end.is_some());
    offset_based.sort_by(|a, b| return b.start.cmp(&a.start));

    for replacement in offset_based {
        match splice_at_offsets(&result.content, replacement, window) {
            None => log_skipped(replacement, "href not found near offsets"),
            Some(updated) => {
                result.content = updated;
                record_applied(&mut result, replacement);
            },
        }
    }

    for replacement in line_based {
        match replace_on_line(&result.content, replacement) {
            None => log_skipped(replacement, "href not found on line"),
            Some(updated) => {
                result.content = updated;
                record_applied(&mut result, replacement);
            },
        }
    }

    return result;
}

/// Count one applied replacement under its kind.
fn record_applied(result: &mut ApplyResult, replacement: &Replacement) {
    result.applied = result.applied.saturating_add(1);
    let count = result.by_kind.entry(replacement.effective_kind()).or_insert(0);
    *count = count.saturating_add(1);
    return;
}

/// Note a replacement that did not apply.
fn log_skipped(replacement: &Replacement, reason: &str) {
    tracing::debug!(
        line = replacement.line,
        old = %replacement.old_href,
        new = %replacement.new_href,
        reason,
        "replacement not applied"
    );
    return;
}

/// Splice by offsets, falling back to a bounded search around them.
fn splice_at_offsets(content: &str, replacement: &Replacement, window: usize) -> Option<String> {
    let (start, end) = (replacement.start?, replacement.end?);
    if start >= end || end > content.len() {
        return None;
    }

    let old = replacement.old_href.as_str();
    if content.get(start..end) == Some(old) {
        return Some(splice(content, start, end, &replacement.new_href));
    }
    if old.is_empty() {
        return None;
    }

    let window_start = floor_char_boundary(content, start.saturating_sub(window));
    let window_end = ceil_char_boundary(content, end.saturating_add(window).min(content.len()));
    let haystack = content.get(window_start..window_end)?;
    let found = find_destination(haystack, old).or_else(|| return haystack.find(old))?;

    let at = window_start.saturating_add(found);
    return Some(splice(content, at, at.saturating_add(old.len()), &replacement.new_href));
}

/// First occurrence of `href` in destination position, right after `(` or `<`.
/// Link text that happens to repeat the href is not a destination.
fn find_destination(haystack: &str, href: &str) -> Option<usize> {
    return haystack.match_indices(href).map(|(i, _)| return i).find(|&i| {
        let before = haystack.get(..i).and_then(|h| return h.chars().next_back());
        return matches!(before, Some('(' | '<'));
    });
}

/// Replace the first occurrence of the old href on the replacement's line,
/// keeping the content's line-ending style.
fn replace_on_line(content: &str, replacement: &Replacement) -> Option<String> {
    let old = replacement.old_href.as_str();
    if old.is_empty() {
        return None;
    }

    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| return l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let idx = replacement.line.checked_sub(1)?;
    let line = *lines.get(idx)?;
    if !line.contains(old) {
        return None;
    }

    let rewritten = line.replacen(old, &replacement.new_href, 1);
    let joined: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| return if i == idx { rewritten.as_str() } else { *l })
        .collect();
    return Some(joined.join(eol));
}

/// `content` with `start..end` replaced by `insert`. Offsets must be char boundaries.
fn splice(content: &str, start: usize, end: usize, insert: &str) -> String {
    let mut out = String::with_capacity(content.len().saturating_add(insert.len()));
    out.push_str(content.get(..start).unwrap_or(""));
    out.push_str(insert);
    out.push_str(content.get(end..).unwrap_or(""));
    return out;
}

/// Largest char boundary at or below `idx`.
fn floor_char_boundary(content: &str, idx: usize) -> usize {
    let mut i = idx.min(content.len());
    while !content.is_char_boundary(i) {
        i = i.saturating_sub(1);
    }
    return i;
}

/// Smallest char boundary at or above `idx`.
fn ceil_char_boundary(content: &str, idx: usize) -> usize {
    let mut i = idx.min(content.len());
    while !content.is_char_boundary(i) {
        i = i.saturating_add(1);
    }
    return i;
}

// ── Pipeline ──────────────────────────────────────────────────────────

/// Extract links from `content`, generate replacements, and apply them.
pub fn process_file_with_links(
    content: &str,
    generate: impl FnOnce(&[ParsedLink]) -> Vec<Replacement>,
) -> ApplyResult {
    let links = extract_links(content);
    let replacements = generate(&links);
    return apply_replacements(content, &replacements);
}

/// What happened to one file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// The processed file.
    pub path: PathBuf,
    /// Applied edits and resulting content.
    pub result: ApplyResult,
    /// Whether the result was written back.
    pub written: bool,
}

/// Read `file`, run the pipeline, and write the result back when it applied
/// at least one `normalizedRel`, `normalizedFull`, `pathSubstitution`, or
/// `patched` edit. Untagged (`updated`) edits alone are never written.
///
/// The generator receives the links and the file's lines.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `file` does not exist, or the write error.
pub fn process_file_replacement<F: FileSystem + ?Sized>(
    file: &Path,
    fs: &F,
    generate: impl FnOnce(&[ParsedLink], &[&str]) -> Vec<Replacement>,
) -> Result<FileOutcome, Error> {
    let content = fs.read_file(file)?;
    let lines: Vec<&str> = content.lines().collect();

    let result = process_file_with_links(&content, |links| return generate(links, &lines));
    let written = result.write_triggering_count() > 0;
    if written {
        fs.write_file(file, &result.content)?;
        tracing::info!(path = %file.display(), applied = result.applied, "rewrote links");
    } else {
        tracing::debug!(path = %file.display(), applied = result.applied, "nothing to write");
    }

    return Ok(FileOutcome {
        path: file.to_path_buf(),
        result,
        written,
    });
}

/// Outcomes of running the pipeline over many files.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files that failed, with the reason. Other files are unaffected.
    pub failures: Vec<(PathBuf, Error)>,
    /// Files processed successfully, in input order.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Outcomes that were written back.
    pub fn written(&self) -> impl Iterator<Item = &FileOutcome> {
        return self.outcomes.iter().filter(|o| return o.written);
    }
}

/// Run [`process_file_replacement`] over each file in turn. A failing file is
/// recorded and skipped; writes already made to other files stay.
pub fn process_files<F: FileSystem + ?Sized>(
    files: &[PathBuf],
    fs: &F,
    mut generate: impl FnMut(&Path, &[ParsedLink], &[&str]) -> Vec<Replacement>,
) -> BatchReport {
    let mut report = BatchReport::default();
    for file in files {
        match process_file_replacement(file, fs, |links, lines| return generate(file, links, lines)) {
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "file skipped");
                report.failures.push((file.clone(), e));
            },
            Ok(outcome) => report.outcomes.push(outcome),
        }
    }
    return report;
}

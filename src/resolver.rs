//! Dataset-aware resolution of link paths to absolute filesystem targets.

use std::path::{Component, Path, PathBuf};

use crate::error::Error;
use crate::fs::FileSystem;

/// Resolve a link path, as written in `file`, to an absolute dataset path.
///
/// Any anchor is dropped first. Links whose first segment is a docs folder are
/// rooted at `dataset_root`; `./`, `../` and bare file names resolve against the
/// directory of `file`; anything else is rooted at `dataset_root`, offset by the
/// position of `file`'s directory inside the dataset.
///
/// # Errors
///
/// Returns `Error::LinkPathUndefined` if `link_path` is empty.
pub fn resolve_markdown_path(
    file: &Path,
    link_path: &str,
    docs_folders: &[String],
    dataset_root: &Path,
) -> Result<PathBuf, Error> {
    if link_path.is_empty() {
        return Err(Error::LinkPathUndefined);
    }

    let path = link_path.split_once('#').map_or(link_path, |(before, _)| return before);
    let first_segment = path.split('/').next().unwrap_or("");
    let file_dir = parent_dir(file);

    if docs_folders.iter().any(|folder| return folder == first_segment) {
        return Ok(normalize_path(&dataset_root.join(path)));
    }

    if path.starts_with("./") || path.starts_with("../") || !path.contains('/') {
        return Ok(normalize_path(&file_dir.join(path)));
    }

    let offset = relative_path(dataset_root, file_dir);
    return Ok(normalize_path(&dataset_root.join(offset).join(path)));
}

/// Search for an existing target by climbing fewer directories than `link_path` does.
///
/// Only applies to links starting with `../`. Candidates drop 0, 1, 2, … leading
/// segments, so the path as written is tried first and the least-modified
/// existing candidate wins. Returns the candidate link path, not its resolution.
pub fn try_resolve_path_variants<F: FileSystem + ?Sized>(
    file: &Path,
    link_path: &str,
    docs_folders: &[String],
    fs: &F,
    dataset_root: &Path,
) -> Option<String> {
    if !link_path.starts_with("../") {
        return None;
    }

    let segments: Vec<&str> = link_path.split('/').collect();
    let max_back_steps = segments.iter().take_while(|s| return **s == "..").count();

    for dropped in 0..=max_back_steps {
        let Some(rest) = segments.get(dropped..) else {
            break;
        };
        let joined = rest.join("/");
        if joined.is_empty() {
            continue;
        }
        let candidate = if joined.starts_with('.') { joined } else { format!("./{joined}") };

        let Ok(resolved) = resolve_markdown_path(file, &candidate, docs_folders, dataset_root) else {
            continue;
        };
        if fs.exists(&resolved) {
            tracing::debug!(original = link_path, %candidate, "path variant found");
            return Some(candidate);
        }
    }

    return None;
}

/// Directory containing `file`, or the empty path for a bare name.
pub fn parent_dir(file: &Path) -> &Path {
    return file.parent().unwrap_or_else(|| return Path::new(""));
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop and never climbs above the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => match components.last() {
            Some(Component::Normal(_)) => {
                components.pop();
            },
            Some(Component::RootDir | Component::Prefix(_)) => {},
            Some(Component::CurDir | Component::ParentDir) | None => components.push(component),
        },
        other => components.push(other),
    }
    return;
}

/// Lexical path from directory `from` to `to`. Empty when they are the same.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| return a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in from_parts.iter().skip(common) {
        out.push("..");
    }
    for part in to_parts.iter().skip(common) {
        out.push(part.as_os_str());
    }
    return out;
}

/// Render a path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    return path
        .components()
        .map(|c| {
            return match c {
                Component::RootDir => String::new(),
                other => other.as_os_str().to_string_lossy().into_owned(),
            };
        })
        .collect::<Vec<_>>()
        .join("/");
}

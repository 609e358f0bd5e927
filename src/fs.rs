//! File-system access behind a trait, so the pipeline can run against disk,
//! memory, or a dry-run overlay.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use walkdir::WalkDir;

use crate::config::ScanFilter;
use crate::error::Error;
use crate::grammar;
use crate::resolver::normalize_path;

/// Operations the link pipeline needs from a file system.
pub trait FileSystem: Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Every markdown file under `dir`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if `dir` does not exist, or `Error::Walk`
    /// if it cannot be read.
    fn markdown_files(&self, dir: &Path) -> Result<Vec<PathBuf>, Error>;

    /// Read a file to a string.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file does not exist, or `Error::Io`.
    fn read_file(&self, path: &Path) -> Result<String, Error>;

    /// Make `path` absolute and lexically normalized.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the working directory cannot be determined.
    fn resolve(&self, path: &Path) -> Result<PathBuf, Error>;

    /// Replace the contents of a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the write fails.
    fn write_file(&self, path: &Path, content: &str) -> Result<(), Error>;
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    return mutex.lock().unwrap_or_else(PoisonError::into_inner);
}

// ── Disk ──────────────────────────────────────────────────────────────

/// The real file system, limited by the config's include/exclude filter.
#[derive(Debug, Clone, Default)]
pub struct DiskFileSystem {
    /// Prefix filter applied during directory discovery.
    filter: ScanFilter,
}

impl DiskFileSystem {
    /// Disk access that only discovers markdown files accepted by `filter`.
    pub const fn new(filter: ScanFilter) -> Self {
        return Self { filter };
    }
}

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &Path) -> bool {
        return path.exists();
    }

    fn markdown_files(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        if !dir.exists() {
            return Err(Error::FileNotFound { path: dir.to_path_buf() });
        }

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Err(e) if e.depth() == 0 => return Err(Error::Walk(e)),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                },
                Ok(entry) => entry,
            };
            let path = entry.path();
            if entry.file_type().is_file()
                && grammar::is_markdown_path(path)
                && self.filter.should_scan_path(path)
            {
                files.push(entry.into_path());
            }
        }
        return Ok(files);
    }

    fn read_file(&self, path: &Path) -> Result<String, Error> {
        return match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::FileNotFound { path: path.to_path_buf() })
            },
            Err(e) => Err(Error::Io(e)),
            Ok(content) => Ok(content),
        };
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, Error> {
        if path.is_absolute() {
            return Ok(normalize_path(path));
        }
        let cwd = std::env::current_dir()?;
        return Ok(normalize_path(&cwd.join(path)));
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), Error> {
        std::fs::write(path, content)?;
        return Ok(());
    }
}

// ── Memory ────────────────────────────────────────────────────────────

/// A map-backed file system. Directories exist implicitly when a file lives under them.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    /// File contents keyed by normalized absolute path.
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// An empty file system.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Create or replace a file.
    pub fn insert(&self, path: impl AsRef<Path>, content: &str) {
        let key = normalize_path(&Path::new("/").join(path.as_ref()));
        lock(&self.files).insert(key, content.to_string());
        return;
    }

    /// Current contents of a file, if present.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = normalize_path(&Path::new("/").join(path.as_ref()));
        return lock(&self.files).get(&key).cloned();
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let key = normalize_path(&Path::new("/").join(path));
        let files = lock(&self.files);
        return files.contains_key(&key) || files.keys().any(|p| return p.starts_with(&key));
    }

    fn markdown_files(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        if !self.exists(dir) {
            return Err(Error::FileNotFound { path: dir.to_path_buf() });
        }
        let key = normalize_path(&Path::new("/").join(dir));
        let files = lock(&self.files)
            .keys()
            .filter(|p| return p.starts_with(&key) && grammar::is_markdown_path(p))
            .cloned()
            .collect();
        return Ok(files);
    }

    fn read_file(&self, path: &Path) -> Result<String, Error> {
        return self.get(path).ok_or_else(|| return Error::FileNotFound { path: path.to_path_buf() });
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, Error> {
        return Ok(normalize_path(&Path::new("/").join(path)));
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), Error> {
        self.insert(path, content);
        return Ok(());
    }
}

// ── Dry run ───────────────────────────────────────────────────────────

/// Wraps another file system and stages writes in memory instead of performing them.
/// Reads see staged content, so multi-pass runs behave as if the writes happened.
#[derive(Debug)]
pub struct DryRunFileSystem<'a, F: FileSystem + ?Sized> {
    /// The file system reads are delegated to.
    inner: &'a F,
    /// Writes that would have happened, keyed by normalized path.
    staged: Mutex<BTreeMap<PathBuf, String>>,
}

impl<'a, F: FileSystem + ?Sized> DryRunFileSystem<'a, F> {
    /// Stage writes over `inner`.
    pub fn new(inner: &'a F) -> Self {
        return Self { inner, staged: Mutex::new(BTreeMap::new()) };
    }

    /// Paths that would have been written, sorted.
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        return lock(&self.staged).keys().cloned().collect();
    }
}

impl<F: FileSystem + ?Sized> FileSystem for DryRunFileSystem<'_, F> {
    fn exists(&self, path: &Path) -> bool {
        return lock(&self.staged).contains_key(&normalize_path(path)) || self.inner.exists(path);
    }

    fn markdown_files(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        return self.inner.markdown_files(dir);
    }

    fn read_file(&self, path: &Path) -> Result<String, Error> {
        if let Some(content) = lock(&self.staged).get(&normalize_path(path)) {
            return Ok(content.clone());
        }
        return self.inner.read_file(path);
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, Error> {
        return self.inner.resolve(path);
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), Error> {
        tracing::debug!(path = %path.display(), "dry run: write staged");
        lock(&self.staged).insert(normalize_path(path), content.to_string());
        return Ok(());
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn memory_directories_exist_implicitly() {
        let fs = MemoryFileSystem::new();
        fs.insert("/dataset/docs/a.md", "# A");
        assert!(fs.exists(Path::new("/dataset/docs/a.md")));
        assert!(fs.exists(Path::new("/dataset/docs")));
        assert!(!fs.exists(Path::new("/dataset/docs/b.md")));
        assert!(!fs.exists(Path::new("/dataset/do")));
    }

    #[test]
    fn memory_lists_only_markdown() {
        let fs = MemoryFileSystem::new();
        fs.insert("/d/b.md", "");
        fs.insert("/d/a.md", "");
        fs.insert("/d/img.png", "");
        fs.insert("/other/c.md", "");
        let files = fs.markdown_files(Path::new("/d")).unwrap();
        assert_eq!(files, vec![PathBuf::from("/d/a.md"), PathBuf::from("/d/b.md")]);
    }

    #[test]
    fn memory_read_missing_file_fails() {
        let fs = MemoryFileSystem::new();
        let err = fs.read_file(Path::new("/nope.md")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn dry_run_stages_writes() {
        let fs = MemoryFileSystem::new();
        fs.insert("/d/a.md", "old");
        let dry = DryRunFileSystem::new(&fs);
        dry.write_file(Path::new("/d/a.md"), "new").unwrap();

        assert_eq!(dry.read_file(Path::new("/d/a.md")).unwrap(), "new");
        assert_eq!(fs.get("/d/a.md").as_deref(), Some("old"));
        assert_eq!(dry.staged_paths(), vec![PathBuf::from("/d/a.md")]);
    }

    #[test]
    fn dry_run_finds_staged_writes_under_any_spelling() {
        let fs = MemoryFileSystem::new();
        let dry = DryRunFileSystem::new(&fs);
        dry.write_file(Path::new("/d/./sub/../a.md"), "new").unwrap();

        assert!(dry.exists(Path::new("/d/a.md")));
        assert_eq!(dry.read_file(Path::new("/d/sub/../a.md")).unwrap(), "new");
        assert_eq!(dry.staged_paths(), vec![PathBuf::from("/d/a.md")]);
    }

    #[test]
    fn disk_lists_markdown_and_skips_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "").unwrap();
        std::fs::write(dir.path().join("docs/notes.txt"), "").unwrap();
        std::fs::write(dir.path().join(".git/HEAD.md"), "").unwrap();

        let fs = DiskFileSystem::default();
        let files = fs.markdown_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("docs/a.md")]);
    }
}

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::resolver::{normalize_path, to_slash};

/// Name of the project config file.
pub const CONFIG_FILE: &str = ".linkmend.toml";

/// Project configuration loaded from `.linkmend.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute dataset root all dataset-relative links are anchored at.
    dataset_root: PathBuf,
    /// Folder names that mark a link as already dataset-rooted.
    docs_folders: Vec<String>,
    /// Href prefixes exempt from rewriting.
    exclusion_list: Vec<String>,
    /// Which markdown files directory scans pick up.
    filter: ScanFilter,
}

/// Raw TOML structure for `.linkmend.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkmendTomlConfig {
    #[serde(default)]
    dataset_root: Option<PathBuf>,
    #[serde(default)]
    docs_folders: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    exclusion_list: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
}

impl Config {
    /// Load config from `.linkmend.toml` in the given root directory.
    /// Returns a default rooted at `root` if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::ParseFailed` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::defaults_rooted_at(root));
            },
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(root, &content).map_err(|e| return name_config_file(e, &path));
    }

    /// Load an explicitly named config file. Relative paths inside it are taken
    /// relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file doesn't exist,
    /// or `Error::ParseFailed` if the TOML is malformed.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        let root = path.parent().unwrap_or_else(|| return Path::new("."));
        return Self::parse(root, &content).map_err(|e| return name_config_file(e, path));
    }

    /// Parse config text for a project rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(root: &Path, content: &str) -> Result<Self, Error> {
        let raw: LinkmendTomlConfig = toml::from_str(content)?;
        let dataset_root = raw
            .dataset_root
            .map_or_else(|| return root.to_path_buf(), |p| return root.join(p));

        return Ok(Self {
            dataset_root: normalize_path(&dataset_root),
            docs_folders: raw.docs_folders,
            exclusion_list: raw.exclusion_list,
            filter: ScanFilter {
                exclude: raw.exclude,
                include: raw.include,
                root: normalize_path(root),
            },
        });
    }

    /// Default config: the project root is the dataset root, nothing is excluded.
    fn defaults_rooted_at(root: &Path) -> Self {
        return Self {
            dataset_root: normalize_path(root),
            docs_folders: Vec::new(),
            exclusion_list: Vec::new(),
            filter: ScanFilter {
                exclude: Vec::new(),
                include: Vec::new(),
                root: normalize_path(root),
            },
        };
    }

    /// Add docs folders for this run only.
    pub fn add_docs_folders(&mut self, folders: impl IntoIterator<Item = String>) {
        self.docs_folders.extend(folders);
        return;
    }

    /// Add exclusion prefixes for this run only.
    pub fn add_exclusions(&mut self, prefixes: impl IntoIterator<Item = String>) {
        self.exclusion_list.extend(prefixes);
        return;
    }

    /// Absolute dataset root.
    pub fn dataset_root(&self) -> &Path {
        return &self.dataset_root;
    }

    /// The include/exclude filter for directory scans.
    pub const fn filter(&self) -> &ScanFilter {
        return &self.filter;
    }

    /// Snapshot of the settings the link pipeline reads, fixed for one run.
    pub fn processing(&self) -> LinkProcessingConfig {
        return LinkProcessingConfig::new(
            self.dataset_root.clone(),
            self.docs_folders.iter().cloned(),
            self.exclusion_list.iter().cloned(),
        );
    }
}

/// Attach the config file's path to a TOML error.
fn name_config_file(e: Error, path: &Path) -> Error {
    return match e {
        Error::TomlDe(inner) => Error::ParseFailed {
            file: path.to_path_buf(),
            reason: inner.message().to_string(),
        },
        other => other,
    };
}

/// Include/exclude path prefixes applied to project-relative markdown paths.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Prefixes that are never scanned.
    exclude: Vec<String>,
    /// Prefixes to scan; empty means everything.
    include: Vec<String>,
    /// Directory the prefixes are relative to.
    root: PathBuf,
}

impl ScanFilter {
    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// [`ScanFilter::should_scan`] for a path that may still carry the root prefix.
    pub fn should_scan_path(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        return self.should_scan(&to_slash(relative));
    }
}

/// Settings for one pipeline run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProcessingConfig {
    /// Absolute dataset root.
    dataset_root: PathBuf,
    /// Ordered, de-duplicated docs folder names.
    docs_folders: Vec<String>,
    /// Non-empty href prefixes exempt from rewriting.
    exclusion_list: Vec<String>,
}

impl LinkProcessingConfig {
    /// Build a run config. Duplicate docs folders keep their first position;
    /// empty exclusion prefixes are dropped since they would match every link.
    pub fn new(
        dataset_root: impl Into<PathBuf>,
        docs_folders: impl IntoIterator<Item = String>,
        exclusion_list: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut folders: Vec<String> = Vec::new();
        for folder in docs_folders {
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }

        return Self {
            dataset_root: dataset_root.into(),
            docs_folders: folders,
            exclusion_list: exclusion_list.into_iter().filter(|p| return !p.is_empty()).collect(),
        };
    }

    /// Absolute dataset root.
    pub fn dataset_root(&self) -> &Path {
        return &self.dataset_root;
    }

    /// Docs folder names, in configured order.
    pub fn docs_folders(&self) -> &[String] {
        return &self.docs_folders;
    }

    /// Exclusion prefixes.
    pub fn exclusion_list(&self) -> &[String] {
        return &self.exclusion_list;
    }

    /// Whether `href` starts with a configured exclusion prefix.
    pub fn is_excluded(&self, href: &str) -> bool {
        return self.exclusion_list.iter().any(|p| return href.starts_with(p.as_str()));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_dataset_root_against_project_root() {
        let config = Config::parse(
            Path::new("/project"),
            "dataset_root = \"content\"\ndocs_folders = [\"docs\", \"guides\"]\nexclusion_list = [\"assets/\"]\n",
        )
        .unwrap();
        assert_eq!(config.dataset_root(), Path::new("/project/content"));

        let processing = config.processing();
        assert_eq!(processing.docs_folders(), ["docs".to_string(), "guides".to_string()]);
        assert!(processing.is_excluded("assets/logo.md"));
        assert!(!processing.is_excluded("docs/a.md"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse(Path::new("/p"), "docs_folder = [\"docs\"]\n").unwrap_err();
        assert!(matches!(err, Error::TomlDe(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.dataset_root(), normalize_path(dir.path()));
        assert!(config.processing().docs_folders().is_empty());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn malformed_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "docs_folders = \"docs\"\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ParseFailed { ref file, .. } if file.ends_with(CONFIG_FILE)));
    }

    #[test]
    fn docs_folders_are_deduplicated_in_order() {
        let config = LinkProcessingConfig::new(
            "/d",
            ["guides", "docs", "guides"].map(String::from),
            [String::new(), "x/".to_string()],
        );
        assert_eq!(config.docs_folders(), ["guides".to_string(), "docs".to_string()]);
        assert_eq!(config.exclusion_list(), ["x/".to_string()]);
    }

    #[test]
    fn filter_applies_include_then_exclude() {
        let config = Config::parse(
            Path::new("/p"),
            "include = [\"docs/\"]\nexclude = [\"docs/archive/\"]\n",
        )
        .unwrap();
        let filter = config.filter();
        assert!(filter.should_scan_path(Path::new("/p/docs/a.md")));
        assert!(!filter.should_scan_path(Path::new("/p/docs/archive/old.md")));
        assert!(!filter.should_scan_path(Path::new("/p/README.md")));
    }
}

/// Crate-level error types for linkmend diagnostics.
use std::path::PathBuf;

/// Hard failures. Each variant names the file or reason so the CLI can render a
/// useful diagnostic. Unresolvable links are not errors; see `types::LinkError`.
#[allow(clippy::error_impl_error, reason = "crate error type re-exported as linkmend::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `.linkmend.toml` named on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// `substitute` was given an empty prefix to replace.
    #[error("substitution prefix is empty")]
    EmptySubstitutionBase,

    /// A markdown file was requested but does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The path resolver was handed an empty link path.
    #[error("linkPath is undefined")]
    LinkPathUndefined,

    /// A config file on disk is not valid TOML for `.linkmend.toml`.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The file watcher could not be created or attached.
    #[error("watch: {0}")]
    Watch(
        /// The wrapped notify error.
        #[from]
        notify::Error,
    ),

    /// Directory traversal failed.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped walkdir error.
        #[from]
        walkdir::Error,
    ),
}

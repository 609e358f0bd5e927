//! Relative-link maintenance for markdown datasets.
//!
//! Links are extracted with tree-sitter, resolved against a dataset root and its
//! docs folders, and rewritten by one of three strategies: normalization to the
//! shortest relative form, bulk prefix substitution, or repair of links that
//! climb too many directories. Edits are applied to the raw text so the rest of
//! each document stays byte-for-byte intact.

pub mod applier;
pub mod classify;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod generator;
pub mod grammar;
pub mod resolver;
pub mod scanner;
pub mod types;
pub mod watch;

pub use applier::{apply_replacements, process_file_replacement, process_file_with_links, process_files};
pub use classify::{classify_link_type, extract_anchor, is_external_link, split_link_parts};
pub use config::{Config, LinkProcessingConfig};
pub use error::Error;
pub use fs::{DiskFileSystem, DryRunFileSystem, FileSystem, MemoryFileSystem};
pub use generator::{
    generate_existence_check_replacements, generate_normalization_replacements,
    generate_path_substitution_replacements,
};
pub use resolver::{resolve_markdown_path, try_resolve_path_variants};
pub use scanner::{extract_links, scan_directory};
pub use types::{ApplyResult, LinkError, LinkType, ParsedLink, Replacement, ReplacementKind};

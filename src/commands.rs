//! CLI commands for linkmend: links, normalize, check, substitute.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::applier::{BatchReport, process_files};
use crate::classify::classify_link_type;
use crate::config::{Config, LinkProcessingConfig};
use crate::diagnostics::{self, PatchRecord, display_path};
use crate::error::Error;
use crate::fs::{DryRunFileSystem, FileSystem};
use crate::generator::{
    generate_existence_check_replacements, generate_normalization_replacements,
    generate_path_substitution_replacements,
};
use crate::scanner::scan_directory;
use crate::types::{LinkError, LinkType};

/// Exit code when unresolved links remain.
const EXIT_UNRESOLVED: u8 = 2;

/// One extracted link, as printed by `links`.
#[derive(Debug, Serialize)]
struct LinkRecord<'a> {
    /// File path relative to the dataset root.
    file: String,
    /// Link target as written.
    href: &'a str,
    /// 1-based line.
    line: usize,
    /// Visible link text.
    text: &'a str,
    /// Classification of the target.
    #[serde(rename = "type")]
    link_type: LinkType,
}

/// Findings of an existence check over a set of files.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    /// Broken links a shallower variant would repair, left unchanged.
    pub fixable: Vec<PatchRecord>,
    /// Broken links that were repaired.
    pub patched: Vec<PatchRecord>,
    /// Broken links with no existing variant.
    pub unresolved: Vec<LinkError>,
}

impl CheckReport {
    /// No broken links remain.
    pub fn is_clean(&self) -> bool {
        return self.fixable.is_empty() && self.unresolved.is_empty();
    }
}

/// Exit status for per-file failures: success when there were none.
fn exit_for_failures(failures: &[(PathBuf, Error)], root: &Path) -> ExitCode {
    for (path, e) in failures {
        eprintln!("skipped {}: {e}", display_path(path, root));
    }
    if failures.is_empty() {
        return ExitCode::SUCCESS;
    }
    return ExitCode::FAILURE;
}

/// Print the files a rewriting command wrote, as a markdown section.
fn print_rewrites(title: &str, report: &BatchReport, root: &Path) {
    let written: Vec<_> = report.written().collect();
    if !written.is_empty() {
        println!("## {title}\n");
        for outcome in &written {
            println!(
                "- {}  ({} links)",
                display_path(&outcome.path, root),
                outcome.result.write_triggering_count(),
            );
        }
        println!();
    }

    let total = report.outcomes.len();
    println!("{} of {total} files rewritten", written.len());
    return;
}

/// Markdown files under `path`, or under the dataset root when no path is given.
/// `path` may also name a single markdown file.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the target does not exist.
pub fn target_files<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Config,
    path: Option<&Path>,
) -> Result<Vec<PathBuf>, Error> {
    let target = match path {
        None => config.dataset_root().to_path_buf(),
        Some(p) => fs.resolve(p)?,
    };
    return fs.markdown_files(&target);
}

/// Print every extracted link, as `file:line  type  href` lines or JSON.
///
/// # Errors
///
/// Returns errors from target discovery or JSON serialization.
pub fn links<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Config,
    path: Option<&Path>,
    json: bool,
) -> Result<ExitCode, Error> {
    let root = config.dataset_root();
    let target = match path {
        None => root.to_path_buf(),
        Some(p) => fs.resolve(p)?,
    };
    let report = scan_directory(fs, &target)?;

    let records: Vec<LinkRecord<'_>> = report
        .files
        .iter()
        .flat_map(|file| {
            return file.links.iter().map(move |link| {
                return LinkRecord {
                    file: display_path(&file.path, root),
                    href: &link.href,
                    line: link.line,
                    link_type: classify_link_type(&link.href),
                    text: &link.text,
                };
            });
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{}:{}  {}  {}", record.file, record.line, record.link_type, record.href);
        }
    }

    return Ok(exit_for_failures(&report.failures, root));
}

/// Rewrite links to their shortest relative form and write back changed files.
///
/// # Errors
///
/// Returns errors from target discovery.
pub fn normalize<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Config,
    path: Option<&Path>,
) -> Result<ExitCode, Error> {
    let processing = config.processing();
    let files = target_files(fs, config, path)?;

    let report = process_files(&files, fs, |file, links, _| {
        return generate_normalization_replacements(links, file, &processing, fs);
    });

    print_rewrites("Normalized", &report, config.dataset_root());
    return Ok(exit_for_failures(&report.failures, config.dataset_root()));
}

/// Replace the `old_base` prefix of link targets with `new_base`.
///
/// # Errors
///
/// Returns `Error::EmptySubstitutionBase` if `old_base` is empty, or errors
/// from target discovery.
pub fn substitute<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Config,
    path: Option<&Path>,
    old_base: &str,
    new_base: &str,
) -> Result<ExitCode, Error> {
    if old_base.is_empty() {
        return Err(Error::EmptySubstitutionBase);
    }
    let processing = config.processing();
    let files = target_files(fs, config, path)?;

    let report = process_files(&files, fs, |_, links, _| {
        return generate_path_substitution_replacements(links, old_base, new_base, &processing);
    });

    print_rewrites("Substituted", &report, config.dataset_root());
    return Ok(exit_for_failures(&report.failures, config.dataset_root()));
}

/// Run the existence check over `files`. With `fix`, repairable links are
/// patched on `fs`; otherwise nothing is written and they are reported as fixable.
pub fn run_check<F: FileSystem + ?Sized>(
    fs: &F,
    config: &LinkProcessingConfig,
    files: &[PathBuf],
    fix: bool,
) -> (CheckReport, BatchReport) {
    let mut report = CheckReport::default();
    let batch = if fix {
        check_files(fs, config, files, &mut report.patched, &mut report.unresolved)
    } else {
        let dry = DryRunFileSystem::new(fs);
        check_files(&dry, config, files, &mut report.fixable, &mut report.unresolved)
    };
    return (report, batch);
}

/// Run the patching pipeline, recording patches and findings.
fn check_files<F: FileSystem + ?Sized>(
    fs: &F,
    config: &LinkProcessingConfig,
    files: &[PathBuf],
    patches: &mut Vec<PatchRecord>,
    unresolved: &mut Vec<LinkError>,
) -> BatchReport {
    return process_files(files, fs, |file, links, lines| {
        let check = generate_existence_check_replacements(links, file, config, fs, lines);
        patches.extend(check.replacements.iter().map(|r| {
            return PatchRecord {
                file: file.to_path_buf(),
                line: r.line,
                new_href: r.new_href.clone(),
                old_href: r.old_href.clone(),
            };
        }));
        unresolved.extend(check.errors);
        return check.replacements;
    });
}

/// Check that every link target exists, optionally patching repairable links.
///
/// Exit code priority: broken links (2) > per-file failures (1) > clean (0).
///
/// # Errors
///
/// Returns errors from target discovery or JSON serialization.
pub fn check<F: FileSystem + ?Sized>(
    fs: &F,
    config: &Config,
    path: Option<&Path>,
    fix: bool,
    json: bool,
) -> Result<ExitCode, Error> {
    let root = config.dataset_root();
    let files = target_files(fs, config, path)?;
    let (report, batch) = run_check(fs, &config.processing(), &files, fix);

    for err in &report.unresolved {
        tracing::warn!(file = %err.file.display(), line = err.line_number, "unresolved link");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", diagnostics::render_patches("Patched", &report.patched, root));
        print!("{}", diagnostics::render_patches("Fixable", &report.fixable, root));
        print!("{}", diagnostics::render_unresolved(&report.unresolved, root));
        print_check_summary(&report, files.len());
    }

    let failures = exit_for_failures(&batch.failures, root);
    if !report.is_clean() {
        return Ok(ExitCode::from(EXIT_UNRESOLVED));
    }
    return Ok(failures);
}

/// One-line outcome of a check, plus a hint when `--fix` would help.
fn print_check_summary(report: &CheckReport, file_count: usize) {
    if report.is_clean() {
        println!("All links resolve ({file_count} files checked)");
        return;
    }

    println!(
        "{} unresolved, {} fixable",
        report.unresolved.len(),
        report.fixable.len()
    );
    if !report.fixable.is_empty() {
        eprintln!();
        eprintln!("hint: run `linkmend check --fix` to apply the fixable patches");
    }
    return;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn dataset() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.insert("/data/docs/existing.md", "# Existing\n");
        fs.insert(
            "/data/docs/sub/deep/file.md",
            "[ok](../../existing.md)\n[over](../../../existing.md)\n[gone](../nowhere.md)\n",
        );
        return fs;
    }

    fn config() -> LinkProcessingConfig {
        return LinkProcessingConfig::new("/data", ["docs".to_string()], []);
    }

    #[test]
    fn check_without_fix_leaves_files_alone() {
        let fs = dataset();
        let files = vec![PathBuf::from("/data/docs/sub/deep/file.md")];
        let (report, batch) = run_check(&fs, &config(), &files, false);

        assert!(batch.failures.is_empty());
        assert_eq!(report.fixable.len(), 1);
        assert_eq!(report.fixable[0].new_href, "../../existing.md");
        assert!(report.patched.is_empty());
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].line_number, 3);
        assert!(!report.is_clean());
        assert!(fs.get("/data/docs/sub/deep/file.md").unwrap().contains("../../../existing.md"));
    }

    #[test]
    fn check_with_fix_writes_patches() {
        let fs = dataset();
        let files = vec![PathBuf::from("/data/docs/sub/deep/file.md")];
        let (report, batch) = run_check(&fs, &config(), &files, true);

        assert_eq!(batch.written().count(), 1);
        assert_eq!(report.patched.len(), 1);
        assert!(report.fixable.is_empty());
        assert_eq!(
            fs.get("/data/docs/sub/deep/file.md").as_deref(),
            Some("[ok](../../existing.md)\n[over](../../existing.md)\n[gone](../nowhere.md)\n")
        );
    }

    #[test]
    fn clean_tree_reports_nothing() {
        let fs = MemoryFileSystem::new();
        fs.insert("/data/a.md", "[b](b.md)\n");
        fs.insert("/data/b.md", "[a](./a.md#top) [web](https://example.com)\n");
        let files = vec![PathBuf::from("/data/a.md"), PathBuf::from("/data/b.md")];

        let (report, _) = run_check(&fs, &config(), &files, false);
        assert!(report.is_clean());
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn substitute_rejects_an_empty_old_prefix() {
        let fs = dataset();
        let cfg = Config::parse(Path::new("/data"), "").unwrap();
        let err = substitute(&fs, &cfg, None, "", "new/").unwrap_err();
        assert!(matches!(err, Error::EmptySubstitutionBase));
    }

    #[test]
    fn substitute_skips_excluded_prefixes() {
        let fs = MemoryFileSystem::new();
        fs.insert("/data/a.md", "[l](assets/logo.md) [g](assets2/g.md)\n");
        let cfg = Config::parse(Path::new("/data"), "exclusion_list = [\"assets/\"]\n").unwrap();

        substitute(&fs, &cfg, None, "assets", "media").unwrap();
        assert_eq!(fs.get("/data/a.md").as_deref(), Some("[l](assets/logo.md) [g](media2/g.md)\n"));
    }

    #[test]
    fn target_files_accepts_a_single_file() {
        let fs = dataset();
        let cfg = Config::parse(Path::new("/data"), "").unwrap();
        let files = target_files(&fs, &cfg, Some(Path::new("/data/docs/existing.md"))).unwrap();
        assert_eq!(files, vec![PathBuf::from("/data/docs/existing.md")]);

        let all = target_files(&fs, &cfg, None).unwrap();
        assert_eq!(all.len(), 2);
    }
}

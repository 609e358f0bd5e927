//! File watcher: runs `check` on startup, then re-runs on markdown changes.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::Config;
use crate::diagnostics;
use crate::error::Error;
use crate::fs::{DiskFileSystem, FileSystem as _};
use crate::grammar;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Whether an event should trigger a re-check: a create, modify, or remove
/// touching at least one markdown file.
fn is_relevant(event: &notify::Event) -> bool {
    let kind_matches = matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    );
    return kind_matches && event.paths.iter().any(|p| return grammar::is_markdown_path(p));
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, Error> {
    let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && is_relevant(&event)
        {
            let _ = tx.send(());
        }
    })?;
    return Ok(watcher);
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the target tree and re-checks on changes.
///
/// # Errors
///
/// Returns errors from path resolution or watcher setup.
pub fn run(config: &Config, path: Option<&Path>) -> Result<ExitCode, Error> {
    let fs = DiskFileSystem::new(config.filter().clone());
    let target = match path {
        None => config.dataset_root().to_path_buf(),
        Some(p) => fs.resolve(p)?,
    };

    eprintln!("watch: initial check");
    let mut last_code = run_check(&fs, config, &target);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher.watch(&target, RecursiveMode::Recursive)?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", target.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(&fs, config, &target);
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check(fs: &DiskFileSystem, config: &Config, target: &Path) -> ExitCode {
    return match commands::check(fs, config, Some(target), false, false) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind, EventKind};

    use super::*;

    fn event(kind: EventKind, path: &str) -> notify::Event {
        return notify::Event::new(kind).add_path(PathBuf::from(path));
    }

    #[test]
    fn markdown_changes_are_relevant() {
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), "/d/a.md")));
        assert!(!is_relevant(&event(EventKind::Create(CreateKind::File), "/d/a.png")));
        assert!(!is_relevant(&event(EventKind::Access(AccessKind::Any), "/d/a.md")));
    }
}

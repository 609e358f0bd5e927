use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use linkmend::config::Config;
use linkmend::error::Error;
use linkmend::fs::{DiskFileSystem, DryRunFileSystem, FileSystem};
use linkmend::{commands, diagnostics, watch};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linkmend", version, about = "Normalize, rewrite, and repair relative links in markdown")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file to use instead of <root>/.linkmend.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Extra docs folder for this run (repeatable)
    #[arg(long = "docs-folder", global = true, value_name = "NAME")]
    docs_folders: Vec<String>,
    /// Extra href prefix to leave untouched for this run (repeatable)
    #[arg(long = "exclude-prefix", global = true, value_name = "PREFIX")]
    exclude_prefixes: Vec<String>,
    /// Project root holding .linkmend.toml
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    root: PathBuf,
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report links whose targets do not exist, optionally patching repairable ones
    Check {
        /// Show what --fix would write without writing it
        #[arg(long)]
        dry_run: bool,
        /// Apply patches for links that climb too many directories
        #[arg(long)]
        fix: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Markdown file or directory (default: the dataset root)
        path: Option<PathBuf>,
    },
    /// List every link in the markdown files
    Links {
        /// Print links as JSON
        #[arg(long)]
        json: bool,
        /// Markdown file or directory (default: the dataset root)
        path: Option<PathBuf>,
    },
    /// Rewrite links to their shortest relative form
    Normalize {
        /// Show what would be written without writing it
        #[arg(long)]
        dry_run: bool,
        /// Markdown file or directory (default: the dataset root)
        path: Option<PathBuf>,
    },
    /// Replace a link-target prefix, e.g. after moving a folder
    Substitute {
        /// Show what would be written without writing it
        #[arg(long)]
        dry_run: bool,
        /// New prefix
        #[arg(index = 2)]
        new: String,
        /// Prefix to replace
        #[arg(index = 1)]
        old: String,
        /// Markdown file or directory (default: the dataset root)
        #[arg(index = 3)]
        path: Option<PathBuf>,
    },
    /// Run check, then re-run it whenever markdown changes
    Watch {
        /// Markdown file or directory (default: the dataset root)
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    return match run(cli) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    return;
}

/// Load the config named on the command line, or the one in the project root,
/// then apply the per-run flags.
///
/// # Errors
///
/// Returns errors from path resolution or config loading.
fn load_config(cli: &Cli) -> Result<Config, Error> {
    let disk = DiskFileSystem::default();
    let mut config = match &cli.config {
        None => Config::load(&disk.resolve(&cli.root)?)?,
        Some(file) => Config::load_file(&disk.resolve(file)?)?,
    };
    config.add_docs_folders(cli.docs_folders.iter().cloned());
    config.add_exclusions(cli.exclude_prefixes.iter().cloned());
    return Ok(config);
}

/// Run a command against the disk, or against a dry-run overlay that lists
/// the files it would have written.
///
/// # Errors
///
/// Returns the command's error.
fn with_file_system(
    disk: &DiskFileSystem,
    dry_run: bool,
    root: &Path,
    command: impl FnOnce(&dyn FileSystem) -> Result<ExitCode, Error>,
) -> Result<ExitCode, Error> {
    if !dry_run {
        return command(disk);
    }

    let dry = DryRunFileSystem::new(disk);
    let code = command(&dry)?;
    let staged = dry.staged_paths();
    eprintln!("dry run: {} file(s) would be written", staged.len());
    for path in &staged {
        eprintln!("  {}", diagnostics::display_path(path, root));
    }
    return Ok(code);
}

/// Dispatch the parsed command.
///
/// # Errors
///
/// Returns errors from config loading or the command itself.
fn run(cli: Cli) -> Result<ExitCode, Error> {
    let config = load_config(&cli)?;
    let disk = DiskFileSystem::new(config.filter().clone());
    let root = config.dataset_root();

    return match cli.command {
        Commands::Check { dry_run, fix, json, path } => with_file_system(&disk, dry_run, root, |fs| {
            return commands::check(fs, &config, path.as_deref(), fix, json);
        }),
        Commands::Links { json, path } => commands::links(&disk, &config, path.as_deref(), json),
        Commands::Normalize { dry_run, path } => with_file_system(&disk, dry_run, root, |fs| {
            return commands::normalize(fs, &config, path.as_deref());
        }),
        Commands::Substitute { dry_run, new, old, path } => with_file_system(&disk, dry_run, root, |fs| {
            return commands::substitute(fs, &config, path.as_deref(), &old, &new);
        }),
        Commands::Watch { path } => watch::run(&config, path.as_deref()),
    };
}

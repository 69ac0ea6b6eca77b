//! Command-line interface for tracebit.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::config::{Config, DEFAULT_CONFIG_NAMES};
use crate::detect::{ScanResult, Scanner};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never descended into when scanning a tree.
const SKIPPED_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    "site-packages",
    "venv",
    "env",
    "build",
    "dist",
];

/// Static risk detection for Python source.
///
/// Tracebit parses Python files and reports dangerous or low-quality
/// patterns: dynamic execution, shell invocation, SQL built from strings,
/// hardcoded secrets, swallowed exceptions, deep nesting and more.
#[derive(Parser)]
#[command(name = "tracebit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a Python file or directory
    #[command(visible_alias = "check")]
    Scan(ScanArgs),
    /// List the available rules
    Rules(RulesArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Show suppressed findings in output
    #[arg(long)]
    pub show_suppressed: bool,

    /// Exit with code 1 when any finding is reported
    #[arg(long)]
    pub fail_on_findings: bool,
}

/// Arguments for the rules command.
#[derive(Parser)]
pub struct RulesArgs {
    /// Config whose disabled rules are marked in the listing
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Install the stderr log subscriber.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "tracebit=debug",
        _ => "tracebit=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the explicit config, a discovered one, or the defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(Path::new(".")),
    };
    match path {
        Some(p) => {
            let config = Config::parse_file(&p)
                .with_context(|| format!("loading config {}", p.display()))?;
            Ok((config, Some(p)))
        }
        None => {
            tracing::debug!(
                "no config file found (looked for {}), using defaults",
                DEFAULT_CONFIG_NAMES.join(", ")
            );
            Ok((Config::default(), None))
        }
    }
}

/// Collect Python files under `root`.
pub fn collect_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name)
        })
    {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("py")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Exit code for a finished scan.
pub fn exit_code(result: &ScanResult, fail_on_findings: bool) -> i32 {
    if !result.errors.is_empty() && result.files.is_empty() {
        return EXIT_ERROR;
    }
    if fail_on_findings && result.total_findings() > 0 {
        return EXIT_FAILED;
    }
    EXIT_SUCCESS
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    let (config, config_path) = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = if metadata.is_dir() {
        collect_files(&args.path)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no Python files to scan");
        return Ok(EXIT_SUCCESS);
    }

    let scanner = Scanner::new(&config)?;
    let result = scanner.scan_paths(&files);
    tracing::debug!(
        files = result.files.len(),
        errors = result.errors.len(),
        findings = result.total_findings(),
        "scan finished"
    );

    let path_str = args.path.to_string_lossy().to_string();
    let config_str = config_path.map(|p| p.to_string_lossy().to_string());

    match args.format {
        OutputFormat::Json => report::write_json(&path_str, config_str.as_deref(), &result)?,
        OutputFormat::Pretty => report::write_pretty(
            &path_str,
            config_str.as_deref(),
            &result,
            args.show_suppressed,
        ),
    }

    Ok(exit_code(&result, args.fail_on_findings))
}

/// Run the rules command.
pub fn run_rules(args: &RulesArgs) -> anyhow::Result<i32> {
    let (config, _) = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    report::write_rules(&config.disabled_categories());
    Ok(EXIT_SUCCESS)
}

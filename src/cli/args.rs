//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// gopt - keep `go install`ed binaries up to date
///
/// Reads the build information embedded in Go binaries, looks up the latest
/// published version of each module and rebuilds outdated binaries in place.
#[derive(Parser, Debug)]
#[command(name = "gopt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GOPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Don't read or write the persistent version cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List installed Go binaries
    #[command(alias = "ls")]
    List(ListArgs),

    /// Update one or all installed binaries
    #[command(alias = "up")]
    Update(UpdateArgs),

    /// Install applications by recipe name or package path
    Install(InstallArgs),

    /// Show toolchain, directories and cache location
    Status,

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Manage the version cache
    Cache(CacheArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only development builds (yes) or only released builds (no)
    #[arg(long, value_enum)]
    pub dev: Option<YesNo>,

    /// Don't look up latest versions
    #[arg(long, conflicts_with = "expired")]
    pub no_latest: bool,

    /// Only binaries with a newer published version
    #[arg(long)]
    pub expired: bool,

    /// Per-module lookup timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory to scan (repeatable)
    #[arg(short, long = "dir")]
    pub dirs: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Only update the binary with this file name
    pub name: Option<String>,

    /// Version lookup timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory to scan (repeatable)
    #[arg(short, long = "dir")]
    pub dirs: Vec<PathBuf>,

    /// Show what would be updated without installing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Recipe names from [apps] or full package paths
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Install into this directory instead of the first scan directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove every cached lookup, including failure markers
    Clear,

    /// Remove expired entries
    Gc,

    /// Show the cache directory
    Path,
}

/// Output format for list command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Answer for yes/no filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

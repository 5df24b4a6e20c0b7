//! The `attic` command line.

use super::interval;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Attic - Deduplicated Backups
#[derive(Parser, Debug)]
#[command(name = "attic", version = "0.16")]
pub struct AtticCli {
    #[command(subcommand)]
    pub command: AtticCommand,
}

#[derive(Subcommand, Debug)]
pub enum AtticCommand {
    /// Initialize an empty repository
    Init(RepositoryArgs),
    /// Create backup archive
    Create(CreateArgs),
    /// Check repository consistency
    Check(CheckArgs),
    /// List archive or repository contents
    List(RepositoryArgs),
    /// Prune repository archives according to specified rules
    Prune(PruneArgs),
}

/// Options accepted by every sub-command.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
    /// Set umask to M (local and remote)
    #[arg(long, value_name = "M", default_value_t = 63)]
    pub umask: u32,
    /// Set remote path to executable
    #[arg(long, value_name = "PATH", default_value = "attic")]
    pub remote_path: String,
}

#[derive(Args, Debug)]
pub struct RepositoryArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    #[arg(value_name = "REPOSITORY")]
    pub repository: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Print statistics for the created archive
    #[arg(short, long)]
    pub stats: bool,
    /// Print progress while creating the archive
    #[arg(short, long)]
    pub progress: bool,
    /// Exclude paths matching PATTERN
    #[arg(short, long, value_name = "PATTERN")]
    pub exclude: Vec<String>,
    /// Read exclude patterns from EXCLUDEFILE, one per line
    #[arg(long, value_name = "EXCLUDEFILE")]
    pub exclude_from: Vec<PathBuf>,
    /// Exclude directories that contain a CACHEDIR.TAG file
    #[arg(long)]
    pub exclude_caches: bool,
    /// Write checkpoint every SECONDS seconds
    #[arg(short = 'c', long, value_name = "SECONDS", default_value_t = 300)]
    pub checkpoint_interval: u32,
    /// Do not cross mount points
    #[arg(long)]
    pub do_not_cross_mountpoints: bool,
    /// Only store numeric user and group identifiers
    #[arg(long)]
    pub numeric_owner: bool,
    /// Archive to create
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,
    /// Paths to archive
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Only perform repository checks
    #[arg(long)]
    pub repository_only: bool,
    /// Only perform archives checks
    #[arg(long)]
    pub archives_only: bool,
    /// Attempt to repair any inconsistencies found
    #[arg(long)]
    pub repair: bool,
    /// Repository or archive to check consistency of
    #[arg(value_name = "REPOSITORY_OR_ARCHIVE")]
    pub repository: String,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Print statistics for the deleted archive
    #[arg(short, long)]
    pub stats: bool,
    /// Keep all archives within this time interval
    #[arg(long, value_name = "WITHIN", value_parser = interval)]
    pub keep_within: Option<String>,
    /// Number of hourly archives to keep
    #[arg(short = 'H', long, value_name = "N", default_value_t = 0)]
    pub keep_hourly: u32,
    /// Number of daily archives to keep
    #[arg(short = 'd', long, value_name = "N", default_value_t = 0)]
    pub keep_daily: u32,
    /// Number of weekly archives to keep
    #[arg(short = 'w', long, value_name = "N", default_value_t = 0)]
    pub keep_weekly: u32,
    /// Number of monthly archives to keep
    #[arg(short = 'm', long, value_name = "N", default_value_t = 0)]
    pub keep_monthly: u32,
    /// Number of yearly archives to keep
    #[arg(short = 'y', long, value_name = "N", default_value_t = 0)]
    pub keep_yearly: u32,
    /// Only consider archive names starting with this prefix
    #[arg(short, long)]
    pub prefix: Option<String>,
    /// Repository to prune
    #[arg(value_name = "REPOSITORY")]
    pub repository: String,
}

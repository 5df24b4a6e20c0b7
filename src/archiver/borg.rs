//! The `borg` command line, as far as backups are configured through it.

use super::{compression_spec, interval};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Borg - Deduplicated Backups
#[derive(Parser, Debug)]
#[command(name = "borg", version = "1.0.9")]
pub struct BorgCli {
    #[command(subcommand)]
    pub command: BorgCommand,
}

#[derive(Subcommand, Debug)]
pub enum BorgCommand {
    /// Initialize an empty repository
    Init(InitArgs),
    /// Create a backup archive
    Create(CreateArgs),
    /// Verify repository consistency
    Check(CheckArgs),
    /// List repository or archive contents
    List(ListArgs),
    /// Prune repository archives according to specified rules
    Prune(PruneArgs),
}

/// Options accepted by every sub-command.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
    /// Show/log the return code (rc)
    #[arg(long)]
    pub show_rc: bool,
    /// Do not load/update the file metadata cache used to detect unchanged files
    #[arg(long)]
    pub no_files_cache: bool,
    /// Set umask to M (local and remote)
    #[arg(long, value_name = "M", default_value_t = 63)]
    pub umask: u32,
    /// Set remote path to executable
    #[arg(long, value_name = "PATH", default_value = "borg")]
    pub remote_path: String,
    /// Wait for the lock, but max. N seconds
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub lock_wait: u32,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Select encryption key mode
    #[arg(
        short,
        long,
        default_value = "repokey",
        value_parser = ["none", "keyfile", "repokey"]
    )]
    pub encryption: String,
    /// Repository to create
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
    /// Show progress display while creating the archive
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
    /// Exclude directories that contain the specified file
    #[arg(long, value_name = "FILENAME", value_delimiter = ',')]
    pub exclude_if_present: Vec<String>,
    /// Keep tag files of excluded caches/directories
    #[arg(long)]
    pub keep_tag_files: bool,
    /// Write checkpoint every SECONDS seconds
    #[arg(short = 'c', long, value_name = "SECONDS", default_value_t = 300)]
    pub checkpoint_interval: u32,
    /// Stay in same file system, do not cross mount points
    #[arg(short = 'x', long)]
    pub one_file_system: bool,
    /// Only store numeric user and group identifiers
    #[arg(long)]
    pub numeric_owner: bool,
    /// Ignore inode data in the file metadata cache used to detect unchanged files
    #[arg(long)]
    pub ignore_inode: bool,
    /// Select compression algorithm and level
    #[arg(
        short = 'C',
        long,
        value_name = "COMPRESSION",
        default_value = "none",
        value_parser = compression_spec
    )]
    pub compression: String,
    /// Open and read block and char device files as well as FIFOs as if they were regular files
    #[arg(long)]
    pub read_special: bool,
    /// Do not create a backup archive
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Name of archive to create (must be also a valid directory name)
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
    /// Work slower, but using less space
    #[arg(long)]
    pub save_space: bool,
    /// Only check last N archives (Default: all)
    #[arg(long, value_name = "N")]
    pub last: Option<u32>,
    /// Only consider archive names starting with this prefix
    #[arg(short = 'P', long)]
    pub prefix: Option<String>,
    /// Repository or archive to check consistency of
    #[arg(value_name = "REPOSITORY_OR_ARCHIVE")]
    pub repository: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Only print file/directory names, nothing else
    #[arg(long)]
    pub short: bool,
    /// Specify format for archive file listing
    #[arg(long, value_name = "FORMAT")]
    pub list_format: Option<String>,
    /// Only consider archive names starting with this prefix
    #[arg(short = 'P', long)]
    pub prefix: Option<String>,
    /// Repository/Archive to list contents of
    #[arg(value_name = "REPOSITORY_OR_ARCHIVE")]
    pub repository: String,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Do not change repository
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Print statistics for the deleted archive
    #[arg(short, long)]
    pub stats: bool,
    /// Output verbose list of archives it keeps/prunes
    #[arg(long)]
    pub list: bool,
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
    #[arg(short = 'P', long)]
    pub prefix: Option<String>,
    /// Work slower, but using less space
    #[arg(long)]
    pub save_space: bool,
    /// Repository to prune
    #[arg(value_name = "REPOSITORY")]
    pub repository: String,
}

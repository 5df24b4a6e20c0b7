//! Command-line interface for the configuration tool.
//!
//! `generate` writes a sample configuration file and `validate` checks an
//! existing one. Both work against the archiver picked with `--archiver`, or
//! the one implied by the name the program was invoked as.

use anyhow::Result;
use atticmatic::archiver::{Archiver, ArchiverKind};
use atticmatic::generate::generate_sample_config_file;
use atticmatic::validate::validate_config_file;
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Generate or validate a backup configuration file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Configuration filename (default: /etc/<archiver>matic/config.yaml)
    #[arg(short, long = "config", value_name = "FILE")]
    pub config_filename: Option<PathBuf>,
    /// Archiver the configuration is for (default: derived from the program name)
    #[arg(long, value_enum)]
    pub archiver: Option<ArchiverKind>,
    /// Log verbosity: 0 for warnings only, 1 for some, 2 for lots
    #[arg(short, long, value_name = "N", default_value_t = 0)]
    pub verbosity: u8,
    #[command(subcommand)]
    pub operation: Operation,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    /// Generate a sample configuration file containing defaults
    Generate,
    /// Perform syntax and option validation of a configuration file
    Validate,
}

impl Cli {
    pub fn archiver_kind(&self) -> ArchiverKind {
        self.archiver.unwrap_or_else(|| {
            let program_name = env::args_os()
                .next()
                .map(PathBuf::from)
                .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
                .unwrap_or_default();
            ArchiverKind::from_program_name(&program_name)
        })
    }

    pub fn config_filename(&self, kind: ArchiverKind) -> PathBuf {
        self.config_filename
            .clone()
            .unwrap_or_else(|| kind.default_config_filename())
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag.
pub(crate) fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn generate(archiver: &dyn Archiver, config_filename: &Path) -> Result<()> {
    debug!(
        "Generating a {} configuration at {}",
        archiver.command_name(),
        config_filename.display()
    );
    generate_sample_config_file(archiver, config_filename)?;
    Ok(())
}

pub(crate) fn validate(archiver: &dyn Archiver, config_filename: &Path) -> Result<()> {
    let config = validate_config_file(archiver, config_filename)?;
    for (sub_command, arguments) in &config.arguments {
        info!("{sub_command}: {}", arguments.join(" "));
    }
    Ok(())
}

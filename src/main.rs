mod commands;

use crate::commands::{Cli, Operation};
use anyhow::Result;
use atticmatic::archiver::BuiltinArchiver;
use atticmatic::sysexits;
use clap::Parser;
use std::process;

/// Entry point for the configuration tool.
/// Parses command-line arguments and dispatches to the requested operation.
fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_logging(cli.verbosity);

    let archiver = BuiltinArchiver::new(cli.archiver_kind());
    let config_filename = cli.config_filename(archiver.kind());

    let outcome = match cli.operation {
        Operation::Generate => commands::generate(&archiver, &config_filename),
        Operation::Validate => commands::validate(&archiver, &config_filename),
    };

    if let Err(error) = outcome {
        eprintln!("{error}");
        let code = error
            .downcast_ref::<atticmatic::Error>()
            .map_or(sysexits::EX_SOFTWARE, atticmatic::Error::exit_code);
        process::exit(code);
    }
    Ok(())
}

//! Archiver collaborators.
//!
//! An archiver (Attic or Borg) owns an argument parser describing its
//! sub-commands and options. It parses its command line through a replaceable
//! [`ParseArgs`] hook exactly once before doing any work, which is what lets
//! the schema extractor capture that parser without running a backup.

pub mod attic;
pub mod borg;

use crate::constants::DEFAULT_CONFIG_DIR;
use clap::{ArgMatches, Command, CommandFactory, ValueEnum};
use std::cell::RefCell;
use std::ffi::OsString;
use std::path::PathBuf;
use std::{env, fmt};
use tracing::debug;

/// The archivers this crate knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchiverKind {
    Attic,
    Borg,
}

impl ArchiverKind {
    /// Picks the archiver from the name the program was invoked as:
    /// `borgmatic*` means Borg, anything else Attic.
    pub fn from_program_name(program_name: &str) -> Self {
        match program_name.split('-').next() {
            Some("borgmatic") => ArchiverKind::Borg,
            _ => ArchiverKind::Attic,
        }
    }

    /// Name of the archiver's executable.
    pub fn command_name(self) -> &'static str {
        match self {
            ArchiverKind::Attic => "attic",
            ArchiverKind::Borg => "borg",
        }
    }

    pub fn usage_documentation_url(self) -> &'static str {
        match self {
            ArchiverKind::Attic => "https://attic-backup.org/usage.html",
            ArchiverKind::Borg => "https://borgbackup.readthedocs.org/en/latest/usage.html",
        }
    }

    /// Default configuration file, e.g. `/etc/borgmatic/config.yaml`.
    pub fn default_config_filename(self) -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_DIR)
            .join(format!("{}matic", self.command_name()))
            .join("config.yaml")
    }

    fn argument_parser(self) -> Command {
        match self {
            ArchiverKind::Attic => attic::AtticCli::command(),
            ArchiverKind::Borg => borg::BorgCli::command(),
        }
    }
}

impl fmt::Display for ArchiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

/// Why a parse hook did not produce matches.
#[derive(Debug)]
pub enum ParseInterrupt {
    /// The hook took the parser instead of parsing with it.
    Captured(Box<Command>),
    /// The command line was rejected.
    Rejected(clap::Error),
}

/// The step through which an archiver parses its command line.
pub trait ParseArgs {
    fn parse_args(&mut self, command: &mut Command) -> Result<ArgMatches, ParseInterrupt>;
}

/// Parses a command line without exiting the process on errors.
///
/// Uses the process arguments unless explicit ones are given.
#[derive(Debug, Default)]
pub struct CommandLine {
    args: Option<Vec<OsString>>,
}

impl CommandLine {
    pub fn from_env() -> Self {
        Self { args: None }
    }

    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
        }
    }
}

impl ParseArgs for CommandLine {
    fn parse_args(&mut self, command: &mut Command) -> Result<ArgMatches, ParseInterrupt> {
        let args = self.args.clone().unwrap_or_else(|| env::args_os().collect());
        command
            .try_get_matches_from_mut(args)
            .map_err(ParseInterrupt::Rejected)
    }
}

/// A parsed archiver command line, ready to be executed by the backup glue.
#[derive(Debug)]
pub struct Invocation {
    pub sub_command: String,
    pub matches: ArgMatches,
}

/// An archiver whose argument parser can be introspected.
pub trait Archiver {
    /// Name of the archiver's executable, e.g. `borg`.
    fn command_name(&self) -> &str;

    fn usage_documentation_url(&self) -> &str;

    /// Installs `hook` as the parse step and returns the previous one.
    fn swap_parse_hook(&self, hook: Box<dyn ParseArgs>) -> Box<dyn ParseArgs>;

    /// Entry point. Parses the command line through the installed hook before
    /// anything else happens.
    fn run(&self) -> Result<Invocation, ParseInterrupt>;
}

/// The Attic and Borg command lines shipped with this crate.
///
/// The parse hook sits in a `RefCell`, which keeps archivers `!Sync`: the hook
/// can only ever be swapped from the thread that owns the archiver.
pub struct BuiltinArchiver {
    kind: ArchiverKind,
    parse_hook: RefCell<Box<dyn ParseArgs>>,
}

impl BuiltinArchiver {
    pub fn new(kind: ArchiverKind) -> Self {
        Self {
            kind,
            parse_hook: RefCell::new(Box::new(CommandLine::from_env())),
        }
    }

    pub fn kind(&self) -> ArchiverKind {
        self.kind
    }
}

impl Archiver for BuiltinArchiver {
    fn command_name(&self) -> &str {
        self.kind.command_name()
    }

    fn usage_documentation_url(&self) -> &str {
        self.kind.usage_documentation_url()
    }

    fn swap_parse_hook(&self, hook: Box<dyn ParseArgs>) -> Box<dyn ParseArgs> {
        self.parse_hook.replace(hook)
    }

    fn run(&self) -> Result<Invocation, ParseInterrupt> {
        let mut command = self.kind.argument_parser();
        let matches = self.parse_hook.borrow_mut().parse_args(&mut command)?;
        let sub_command = matches.subcommand_name().unwrap_or_default().to_string();
        debug!("{} parsed sub-command {sub_command:?}", self.kind);
        Ok(Invocation {
            sub_command,
            matches,
        })
    }
}

/// Accepts `none`, `lz4`, or `zlib`/`lzma` with an optional `,LEVEL` of 0-9.
pub(crate) fn compression_spec(value: &str) -> Result<String, String> {
    let (algorithm, level) = match value.split_once(',') {
        Some((algorithm, level)) => (algorithm, Some(level)),
        None => (value, None),
    };
    let valid = match (algorithm, level) {
        ("none" | "lz4", None) => true,
        ("zlib" | "lzma", None) => true,
        ("zlib" | "lzma", Some(level)) => level.parse::<u8>().is_ok_and(|level| level <= 9),
        _ => false,
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err("expected none, lz4, zlib[,0-9] or lzma[,0-9]".to_string())
    }
}

/// Accepts a time interval such as `7d` or `2m`: a number followed by one of
/// `H`, `d`, `w`, `m`, `y`.
pub(crate) fn interval(value: &str) -> Result<String, String> {
    let mut chars = value.chars();
    let unit = chars.next_back();
    let count = chars.as_str();
    if !count.is_empty()
        && count.bytes().all(|b| b.is_ascii_digit())
        && matches!(unit, Some('H' | 'd' | 'w' | 'm' | 'y'))
    {
        Ok(value.to_string())
    } else {
        Err("expected a number followed by one of H, d, w, m, y".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_program_name() {
        assert_eq!(ArchiverKind::from_program_name("borgmatic"), ArchiverKind::Borg);
        assert_eq!(
            ArchiverKind::from_program_name("borgmatic-config"),
            ArchiverKind::Borg
        );
        assert_eq!(
            ArchiverKind::from_program_name("atticmatic-config"),
            ArchiverKind::Attic
        );
        assert_eq!(ArchiverKind::from_program_name("whatever"), ArchiverKind::Attic);
    }

    #[test]
    fn test_default_config_filename() {
        assert_eq!(
            ArchiverKind::Borg.default_config_filename(),
            PathBuf::from("/etc/borgmatic/config.yaml")
        );
        assert_eq!(
            ArchiverKind::Attic.default_config_filename(),
            PathBuf::from("/etc/atticmatic/config.yaml")
        );
    }

    #[test]
    fn test_argument_parsers_are_well_formed() {
        ArchiverKind::Attic.argument_parser().debug_assert();
        ArchiverKind::Borg.argument_parser().debug_assert();
    }

    #[test]
    fn test_run_parses_through_installed_hook() {
        let archiver = BuiltinArchiver::new(ArchiverKind::Borg);
        archiver.swap_parse_hook(Box::new(CommandLine::new([
            "borg",
            "prune",
            "--keep-daily",
            "7",
            "user@host:repo",
        ])));

        let invocation = archiver.run().unwrap();
        assert_eq!(invocation.sub_command, "prune");
        let (_, prune) = invocation.matches.subcommand().unwrap();
        assert_eq!(prune.get_one::<u32>("keep_daily"), Some(&7));
    }

    #[test]
    fn test_run_reports_rejected_command_line() {
        let archiver = BuiltinArchiver::new(ArchiverKind::Attic);
        archiver.swap_parse_hook(Box::new(CommandLine::new(["attic", "create", "--bogus"])));

        assert!(matches!(archiver.run(), Err(ParseInterrupt::Rejected(_))));
    }

    #[test]
    fn test_compression_spec() {
        for valid in ["none", "lz4", "zlib", "zlib,6", "lzma,0"] {
            assert!(compression_spec(valid).is_ok(), "{valid}");
        }
        for invalid in ["gzip", "lz4,3", "zlib,10", "zlib,", ""] {
            assert!(compression_spec(invalid).is_err(), "{invalid}");
        }
    }

    #[test]
    fn test_interval() {
        for valid in ["7d", "12H", "1y"] {
            assert!(interval(valid).is_ok(), "{valid}");
        }
        for invalid in ["d", "7", "7x", "", "1.5d"] {
            assert!(interval(invalid).is_err(), "{invalid}");
        }
    }
}

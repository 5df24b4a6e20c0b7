//! Option schema extraction.
//!
//! Archivers don't publish their options as data, so the schema is read off
//! their argument parser. [`capture_argument_parser`] swaps the archiver's
//! parse step for one that hands the parser back instead of parsing, runs the
//! archiver, and puts the original step back no matter how the run ends.
//! [`extract_parser_options`] then walks the captured `clap::Command`.

use crate::archiver::{Archiver, ParseArgs, ParseInterrupt};
use crate::document::resolve_plain_scalar;
use crate::error::{Error, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Options handled outside the per-sub-command sections.
pub const EXCLUDED_OPTIONS: &[&str] = &[
    "--help",
    "--verbose",
    "--stats",
    "--progress",
    "--exclude",
    "--exclude-from",
];

/// The archiver sub-commands a configuration file can have a section for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubCommand {
    Create,
    Prune,
    Check,
}

impl SubCommand {
    pub const ALL: [SubCommand; 3] = [SubCommand::Create, SubCommand::Prune, SubCommand::Check];

    pub fn as_str(self) -> &'static str {
        match self {
            SubCommand::Create => "create",
            SubCommand::Prune => "prune",
            SubCommand::Check => "check",
        }
    }

    /// Positional arguments the archiver insists on, filled with placeholders
    /// when only options are being checked.
    pub fn required_positionals(self) -> &'static [&'static str] {
        match self {
            SubCommand::Create => &["repository::archive", "/path"],
            SubCommand::Prune | SubCommand::Check => &["repository"],
        }
    }
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubCommand {
    type Err = String;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        SubCommand::ALL
            .into_iter()
            .find(|sub_command| sub_command.as_str() == name)
            .ok_or_else(|| format!("unknown sub-command: {name}"))
    }
}

/// A command-line option as the archiver declares it, e.g. `--umask` with a
/// default of 63.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOption {
    pub name: String,
    pub default: Value,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

/// Supported options per sub-command, in the archiver's declaration order.
pub type OptionSchema = BTreeMap<SubCommand, Vec<CommandOption>>;

/// Parse step that hands the parser back instead of parsing with it.
struct CaptureParser;

impl ParseArgs for CaptureParser {
    fn parse_args(&mut self, command: &mut Command) -> std::result::Result<ArgMatches, ParseInterrupt> {
        command.build();
        Err(ParseInterrupt::Captured(Box::new(command.clone())))
    }
}

/// Keeps a substitute parse step installed for as long as it lives.
struct ParseHookGuard<'a> {
    archiver: &'a dyn Archiver,
    original: Option<Box<dyn ParseArgs>>,
}

impl<'a> ParseHookGuard<'a> {
    fn install(archiver: &'a dyn Archiver, hook: Box<dyn ParseArgs>) -> Self {
        let original = archiver.swap_parse_hook(hook);
        Self {
            archiver,
            original: Some(original),
        }
    }
}

impl Drop for ParseHookGuard<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.archiver.swap_parse_hook(original);
        }
    }
}

/// Returns the argument parser the archiver uses for its own command line.
///
/// # Errors
/// Returns [`Error::UnsupportedArchiver`] if the archiver finishes without ever
/// handing its parser to the parse step.
pub fn capture_argument_parser(archiver: &dyn Archiver) -> Result<Command> {
    let _guard = ParseHookGuard::install(archiver, Box::new(CaptureParser));

    match archiver.run() {
        Err(ParseInterrupt::Captured(command)) => {
            debug!("Captured the {} argument parser", archiver.command_name());
            Ok(*command)
        }
        Err(ParseInterrupt::Rejected(error)) => Err(Error::UnsupportedArchiver(format!(
            "{} failed before its argument parser could be captured: {}",
            archiver.command_name(),
            first_line(&error.to_string())
        ))),
        Ok(_) => Err(Error::UnsupportedArchiver(format!(
            "{} ran without parsing its command line",
            archiver.command_name()
        ))),
    }
}

/// Reads the supported options of each sub-command of interest off `parser`.
///
/// Positional arguments, options without a long form and [`EXCLUDED_OPTIONS`]
/// are left out.
///
/// # Errors
/// Returns [`Error::UnsupportedArchiver`] if the parser has no sub-commands or
/// lacks one of [`SubCommand::ALL`].
pub fn extract_parser_options(parser: &Command) -> Result<OptionSchema> {
    if !parser.has_subcommands() {
        return Err(Error::UnsupportedArchiver(format!(
            "{} declares no sub-commands",
            parser.get_name()
        )));
    }

    let mut schema = OptionSchema::new();
    for sub_command in parser.get_subcommands() {
        let Ok(sub_command_name) = sub_command.get_name().parse::<SubCommand>() else {
            continue;
        };
        let options: Vec<CommandOption> = sub_command
            .get_arguments()
            .filter(|arg| !arg.is_positional())
            .filter_map(|arg| {
                let long = arg.get_long()?;
                let name = format!("--{long}");
                if EXCLUDED_OPTIONS.contains(&name.as_str()) {
                    return None;
                }
                Some(CommandOption {
                    default: option_default(arg),
                    name,
                })
            })
            .collect();
        debug!("{sub_command_name}: {} options", options.len());
        schema.insert(sub_command_name, options);
    }

    if let Some(missing) = SubCommand::ALL
        .into_iter()
        .find(|sub_command| !schema.contains_key(sub_command))
    {
        return Err(Error::UnsupportedArchiver(format!(
            "{} has no \"{missing}\" sub-command",
            parser.get_name()
        )));
    }
    Ok(schema)
}

/// Captures the archiver's parser and extracts its option schema.
///
/// # Errors
/// Returns [`Error::UnsupportedArchiver`] if either step fails.
pub fn extract_option_schema(archiver: &dyn Archiver) -> Result<OptionSchema> {
    let parser = capture_argument_parser(archiver)?;
    let schema = extract_parser_options(&parser)?;
    info!(
        "Extracted {} options from {}",
        schema.values().map(Vec::len).sum::<usize>(),
        archiver.command_name()
    );
    Ok(schema)
}

/// Types an argument's default the way its action implies.
fn option_default(arg: &Arg) -> Value {
    let defaults: Vec<String> = arg
        .get_default_values()
        .iter()
        .map(|value| value.to_string_lossy().into_owned())
        .collect();

    match arg.get_action() {
        ArgAction::SetTrue | ArgAction::SetFalse => {
            Value::Bool(defaults.first().is_some_and(|value| value == "true"))
        }
        ArgAction::Count => Value::from(
            defaults
                .first()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or_default(),
        ),
        ArgAction::Append if !defaults.is_empty() => sequence(&defaults),
        _ => match defaults.as_slice() {
            [] => Value::Null,
            [single] => resolve_plain_scalar(single),
            many => sequence(many),
        },
    }
}

fn sequence(values: &[String]) -> Value {
    Value::Sequence(values.iter().map(|value| resolve_plain_scalar(value)).collect())
}

fn first_line(message: &str) -> &str {
    let line = message.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line)
}

//! Configuration validation and conversion to archiver arguments.
//!
//! A configuration file is checked in two passes. The global options
//! (`source_directories` and `repository`) are checked structurally, then
//! every remaining section is turned into the command line its sub-command
//! would run with and handed to the archiver's own parser. Whatever that
//! parser rejects is traced back to the key or value it came from.

use crate::archiver::Archiver;
use crate::document::{
    ConfigDocument, Entry, Mapping, Node, Scalar, SourcePosition, Value, load_config_file,
    scalar_to_string,
};
use crate::error::{Error, Result};
use crate::generate::command_argument_to_config_option;
use crate::schema::{EXCLUDED_OPTIONS, SubCommand, capture_argument_parser};
use clap::Command;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const SOURCE_DIRECTORIES: &str = "source_directories";
const REPOSITORY: &str = "repository";

/// A configuration file that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub source_directories: Vec<String>,
    pub repository: String,
    /// Command-line options per sub-command section, e.g. `--umask=77`.
    pub arguments: BTreeMap<SubCommand, Vec<String>>,
}

/// Why an option could not be turned into an argument the archiver accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// The option is spelled like a command-line flag instead of a config key.
    #[error("Unknown option. Did you mean: \"{}\"", command_argument_to_config_option(.name))]
    LooksLikeArgument { name: String },

    #[error("Unknown option")]
    UnknownArgument { token: String },

    #[error("{message}")]
    InvalidValue { argument: String, message: String },

    /// The option clashes with another one or is given more than once.
    #[error("{message}")]
    Conflict { argument: String, message: String },

    #[error("{message}")]
    Other { message: String },
}

impl ArgumentError {
    fn invalid_value(argument: &str) -> Self {
        ArgumentError::InvalidValue {
            argument: argument.to_string(),
            message: "invalid value".to_string(),
        }
    }

    /// Classifies a parser rejection by the argument it names.
    pub fn from_clap(error: &clap::Error) -> Self {
        let argument = match error.get(ContextKind::InvalidArg) {
            Some(ContextValue::String(argument)) => argument
                .split_whitespace()
                .next()
                .and_then(|argument| argument.split('=').next())
                .map(str::to_string),
            _ => None,
        };
        let message = error_summary(&error.to_string());

        match (error.kind(), argument) {
            (ErrorKind::UnknownArgument, Some(token)) => ArgumentError::UnknownArgument { token },
            (ErrorKind::InvalidValue | ErrorKind::ValueValidation, Some(argument)) => {
                ArgumentError::InvalidValue { argument, message }
            }
            (ErrorKind::ArgumentConflict, Some(argument)) => {
                ArgumentError::Conflict { argument, message }
            }
            _ => ArgumentError::Other { message },
        }
    }

    /// Where the error points inside the section it came from.
    fn position(&self, section: &Mapping) -> Option<SourcePosition> {
        match self {
            ArgumentError::LooksLikeArgument { name } => {
                option_position(section, name, PositionKind::Key)
            }
            ArgumentError::UnknownArgument { token: argument }
            | ArgumentError::Conflict { argument, .. } => {
                option_position(section, argument, PositionKind::Key).or_else(|| {
                    producing_entry(section, argument).map(|entry| entry.key_position)
                })
            }
            ArgumentError::InvalidValue { argument, .. } => {
                option_position(section, argument, PositionKind::Value).or_else(|| {
                    producing_entry(section, argument).map(|entry| entry.value.position)
                })
            }
            ArgumentError::Other { .. } => None,
        }
    }
}

/// The first paragraph of a rendered clap error on a single line, without
/// the `error: ` prefix.
fn error_summary(rendered: &str) -> String {
    let summary = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match summary.strip_prefix("error: ") {
        Some(rest) => rest.to_string(),
        None => summary,
    }
}

/// The section entry whose command-line flag is `token`. Covers keys whose
/// flag doesn't map back to them, such as `_foo` becoming `---foo`.
fn producing_entry<'a>(section: &'a Mapping, token: &str) -> Option<&'a Entry> {
    section
        .iter()
        .find(|entry| command_flag(&entry.key).split('=').next() == Some(token))
}

fn command_flag(option_name: &str) -> String {
    format!("--{}", option_name.replace('_', "-"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    Key,
    Value,
}

/// Finds an option in `mapping` by its config name or, failing that, by the
/// exact name given.
///
/// Example: `--keep-daily` finds the `keep_daily` key.
pub fn option_position(
    mapping: &Mapping,
    argument_or_option_name: &str,
    kind: PositionKind,
) -> Option<SourcePosition> {
    let lookup = |name: &str| match kind {
        PositionKind::Key => mapping.key_position(name),
        PositionKind::Value => mapping.value_position(name),
    };

    let option_name = command_argument_to_config_option(argument_or_option_name);
    lookup(&option_name).or_else(|| {
        if option_name == argument_or_option_name {
            None
        } else {
            lookup(argument_or_option_name)
        }
    })
}

/// Converts a config option to the command-line argument it stands for.
///
/// Returns `None` for null and `false`, which mean "not set". `true` becomes a
/// bare flag and anything else `--name=value`, with sequences joined by
/// commas.
///
/// Example: `posix_me_harder` with a value of 123 becomes
/// `--posix-me-harder=123`.
///
/// # Errors
/// [`ArgumentError::LooksLikeArgument`] if the name already looks like a
/// command-line flag, [`ArgumentError::InvalidValue`] for mapping values.
pub fn config_option_to_command_argument(
    option_name: &str,
    value: &Node,
) -> std::result::Result<Option<String>, ArgumentError> {
    if command_argument_to_config_option(option_name) != option_name {
        return Err(ArgumentError::LooksLikeArgument {
            name: option_name.to_string(),
        });
    }

    let flag = command_flag(option_name);
    let value = match &value.value {
        Value::Scalar(Scalar::Null | Scalar::Bool(false)) => return Ok(None),
        Value::Scalar(Scalar::Bool(true)) => return Ok(Some(flag)),
        Value::Scalar(scalar) => scalar_to_string(scalar),
        Value::Sequence(items) => items
            .iter()
            .map(|item| item.as_scalar().map(scalar_to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ArgumentError::invalid_value(option_name))?
            .join(","),
        Value::Mapping(_) => return Err(ArgumentError::invalid_value(option_name)),
    };
    Ok(Some(format!("{flag}={value}")))
}

/// Converts one section's options, in file order.
///
/// `sub_parser` is the archiver's parser for the section's sub-command when
/// known. It is consulted so that a flag given a non-boolean value, or an
/// option taking a value given a bare `true`, is reported against that value.
pub fn section_to_command_arguments(
    section: &Mapping,
    sub_parser: Option<&Command>,
) -> std::result::Result<Vec<String>, ArgumentError> {
    let mut arguments = Vec::with_capacity(section.len());
    for Entry { key, value, .. } in section {
        let argument = config_option_to_command_argument(key, value)?;

        let long = key.replace('_', "-");
        if EXCLUDED_OPTIONS.contains(&format!("--{long}").as_str()) {
            return Err(ArgumentError::UnknownArgument { token: key.clone() });
        }
        let takes_values = sub_parser
            .and_then(|parser| {
                parser
                    .get_arguments()
                    .find(|arg| arg.get_long() == Some(long.as_str()))
            })
            .map(|arg| arg.get_action().takes_values());
        let mismatched = match (takes_values, value.as_scalar()) {
            (Some(false), Some(Scalar::Bool(_) | Scalar::Null)) => false,
            (Some(false), _) => true,
            (Some(true), Some(Scalar::Bool(true))) => true,
            _ => false,
        };
        if mismatched {
            return Err(ArgumentError::invalid_value(key));
        }

        arguments.extend(argument);
    }
    Ok(arguments)
}

/// Checks `source_directories` and `repository`, returning the rest of the
/// configuration.
///
/// # Errors
/// Returns [`Error::Validation`] for a missing, empty or malformed global
/// option.
pub fn validate_global_options(document: &ConfigDocument) -> Result<Mapping> {
    let root = document.root();
    let fail = |position, message: &str| Err(Error::Validation(document.error(position, message)));

    let source_directories = root.get(SOURCE_DIRECTORIES);
    if source_directories.is_none_or(Node::is_empty) {
        return fail(
            option_position(root, SOURCE_DIRECTORIES, PositionKind::Key),
            "Missing required option: \"source_directories\"",
        );
    }
    let repository = root.get(REPOSITORY);
    if repository.is_none_or(Node::is_empty) {
        return fail(None, "Missing required option: \"repository\"");
    }

    match source_directories.and_then(Node::as_sequence) {
        Some(directories) => {
            if let Some(bad) = directories.iter().find(|node| !is_plain_value(node)) {
                return fail(Some(bad.position), "Invalid value");
            }
        }
        None => {
            return fail(
                option_position(root, SOURCE_DIRECTORIES, PositionKind::Value),
                "Invalid value",
            );
        }
    }
    if let Some(repository) = repository.filter(|node| !is_plain_value(node)) {
        return fail(Some(repository.position), "Invalid value");
    }

    Ok(root.without(&[SOURCE_DIRECTORIES, REPOSITORY]))
}

fn is_plain_value(node: &Node) -> bool {
    node.as_scalar().is_some_and(|scalar| !scalar.is_null())
}

fn validate_section(
    document: &ConfigDocument,
    parser: &mut Command,
    entry: &Entry,
) -> Result<(SubCommand, Vec<String>)> {
    let fail = |position, message: &str| Error::Validation(document.error(position, message));

    let sub_command: SubCommand = entry
        .key
        .parse()
        .map_err(|_| fail(Some(entry.key_position), "Unknown section"))?;
    let empty = Mapping::default();
    let section = match &entry.value.value {
        Value::Mapping(section) => section,
        Value::Scalar(Scalar::Null) => &empty,
        _ => return Err(fail(Some(entry.value.position), "Invalid value")),
    };
    let argument_error =
        |error: ArgumentError| fail(error.position(section), &error.to_string());

    let arguments =
        section_to_command_arguments(section, parser.find_subcommand(sub_command.as_str()))
            .map_err(argument_error)?;

    let argv = [parser.get_name().to_string(), sub_command.to_string()]
        .into_iter()
        .chain(arguments.iter().cloned())
        .chain(
            sub_command
                .required_positionals()
                .iter()
                .map(|placeholder| placeholder.to_string()),
        );
    parser
        .try_get_matches_from_mut(argv)
        .map_err(|error| argument_error(ArgumentError::from_clap(&error)))?;

    debug!("Section {sub_command} converts to {arguments:?}");
    Ok((sub_command, arguments))
}

/// Loads the configuration file at `path` and validates it against the
/// archiver's own argument parser.
///
/// Steps run strictly in order and the first failure is returned: loading,
/// the global options, capturing the archiver's parser, then each section in
/// file order.
///
/// # Errors
/// [`Error::File`] or [`Error::Parse`] if the file can't be loaded,
/// [`Error::UnsupportedArchiver`] if the parser can't be captured, and
/// [`Error::Validation`] for anything wrong with the contents.
pub fn validate_config_file(archiver: &dyn Archiver, path: &Path) -> Result<ValidatedConfig> {
    let document = load_config_file(path)?;
    let sections = validate_global_options(&document)?;
    let mut parser = capture_argument_parser(archiver)?;

    let mut arguments = BTreeMap::new();
    for entry in &sections {
        let (sub_command, options) = validate_section(&document, &mut parser, entry)?;
        arguments.insert(sub_command, options);
    }

    let root = document.root();
    let source_directories = root
        .get(SOURCE_DIRECTORIES)
        .and_then(Node::as_sequence)
        .unwrap_or_default()
        .iter()
        .filter_map(Node::as_scalar)
        .map(scalar_to_string)
        .collect();
    let repository = root
        .get(REPOSITORY)
        .and_then(Node::as_scalar)
        .map(scalar_to_string)
        .unwrap_or_default();

    info!("{} is valid", path.display());
    Ok(ValidatedConfig {
        source_directories,
        repository,
        arguments,
    })
}

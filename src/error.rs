//! Error types for configuration generation and validation.
//!
//! Every failure leaving the crate is one of four kinds: the archiver could not
//! be introspected, a file could not be read or written, the configuration is
//! not well-formed YAML, or it does not match the archiver's option schema.
//! Parse and validation errors share [`ConfigurationError`], which renders the
//! offending source line with a caret under the reported column.

use crate::document::SourcePosition;
use crate::sysexits;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unified result type for the configuration core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or validating a configuration file.
#[derive(Debug, Error)]
pub enum Error {
    /// The archiver's argument parser does not have the expected shape.
    #[error("Unsupported archiver version: {0}")]
    UnsupportedArchiver(String),

    /// Refusing to overwrite an existing file.
    #[error("File already exists. Move it aside and try again: {}", .0.display())]
    FileExists(PathBuf),

    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not well-formed.
    #[error("{0}")]
    Parse(ConfigurationError),

    /// The configuration file does not match the archiver's option schema.
    #[error("{0}")]
    Validation(ConfigurationError),
}

impl Error {
    pub(crate) fn file(path: &Path, source: io::Error) -> Self {
        Error::File {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the sysexits status a command-line front-end should exit with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnsupportedArchiver(_) => sysexits::EX_SOFTWARE,
            Error::FileExists(_) => sysexits::EX_CANTCREAT,
            Error::File { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                sysexits::EX_NOINPUT
            }
            Error::File { .. } => sysexits::EX_IOERR,
            Error::Parse(_) | Error::Validation(_) => sysexits::EX_CONFIG,
        }
    }

    /// Returns the positioned error for parse and validation failures.
    pub fn configuration_error(&self) -> Option<&ConfigurationError> {
        match self {
            Error::Parse(error) | Error::Validation(error) => Some(error),
            _ => None,
        }
    }
}

/// A problem located in a configuration file.
///
/// The offending line is captured when the error is built, so rendering never
/// has to go back to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    filename: PathBuf,
    position: Option<SourcePosition>,
    line: Option<String>,
    message: String,
}

impl ConfigurationError {
    /// Creates an error for `filename`, whose contents are `source`.
    ///
    /// The message is tidied with [`clean_message`].
    pub fn new(
        filename: &Path,
        source: &str,
        position: Option<SourcePosition>,
        message: &str,
    ) -> Self {
        let line = position.map(|position| {
            source
                .lines()
                .nth(position.line)
                .unwrap_or_default()
                .to_string()
        });
        Self {
            filename: filename.to_path_buf(),
            position,
            line,
            message: clean_message(message),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Position of the offending token, or `None` for file-level problems.
    pub fn position(&self) -> Option<SourcePosition> {
        self.position
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.position, &self.line) {
            (Some(position), Some(line)) => {
                writeln!(
                    f,
                    "File \"{}\", line {}, column {}:",
                    self.filename.display(),
                    position.line + 1,
                    position.column + 1
                )?;
                writeln!(f, "{line}")?;
                writeln!(f, "{}^", " ".repeat(position.column))?;
                write!(f, "{}", self.message)
            }
            _ => {
                writeln!(f, "File \"{}\":", self.filename.display())?;
                write!(f, "{}", self.message)
            }
        }
    }
}

/// Tidies an archiver or parser message so it reads well as a config file error.
///
/// Value rejections collapse to `Invalid value`; anything else only gets its
/// first letter capitalized.
pub fn clean_message(message: &str) -> String {
    if message.starts_with("invalid value") {
        return "Invalid value".to_string();
    }
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

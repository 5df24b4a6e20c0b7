//! atticmatic: configuration front-end for the Attic and Borg backup archivers.
//!
//! The option schema of a configuration file is not written down anywhere: it
//! is read at runtime off the archiver's own argument parser. From that schema
//! this crate generates commented sample files and validates operator-written
//! ones, reporting problems with the exact line and column they come from.

pub mod archiver;
mod constants;
pub mod document;
pub mod error;
pub mod generate;
pub mod schema;
pub mod sysexits;
pub mod validate;

pub use error::{ConfigurationError, Error, Result};

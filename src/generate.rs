//! Sample configuration generation.
//!
//! Turns the archiver's option schema into a commented YAML file with one
//! section per sub-command, every option set to the archiver's own default.

use crate::archiver::Archiver;
use crate::document::scalar_to_string;
use crate::error::{Error, Result};
use crate::schema::{CommandOption, OptionSchema, extract_option_schema};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Placeholder source directories written into a fresh configuration file.
const SAMPLE_SOURCE_DIRECTORIES: &[&str] = &["/home", "/etc"];

/// A configuration-file option: the counterpart of a [`CommandOption`] with an
/// underscore-separated name and a default that fits in a flat YAML value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    pub name: String,
    pub default: Value,
}

/// Converts a command-line argument name to a config option name.
///
/// Example: `--posix-me-harder` becomes `posix_me_harder`.
pub fn command_argument_to_config_option(argument_name: &str) -> String {
    argument_name.trim_matches('-').replace('-', "_")
}

/// Converts an archiver option to its config-file form.
///
/// Sequence defaults are flattened to a comma-separated string and mapping
/// defaults, which have no flat form, become null.
pub fn command_option_to_config(command_option: &CommandOption) -> ConfigOption {
    let name = command_argument_to_config_option(&command_option.name);
    let default = match &command_option.default {
        sequence @ Value::Sequence(_) => Value::String(scalar_to_string(sequence)),
        Value::Mapping(_) => Value::Null,
        other => other.clone(),
    };
    ConfigOption { name, default }
}

/// Builds the per-sub-command sections of a sample configuration.
///
/// Example: `{create: [--foo = "bar", --baz = "quux"]}` becomes
/// `{create: {foo: bar, baz: quux}}`.
pub fn sample_config(schema: &OptionSchema) -> Mapping {
    schema
        .iter()
        .map(|(sub_command, options)| {
            let section: Mapping = options
                .iter()
                .map(command_option_to_config)
                .map(|option| (Value::String(option.name), option.default))
                .collect();
            (Value::from(sub_command.as_str()), Value::Mapping(section))
        })
        .collect()
}

#[derive(Serialize)]
struct SourcesConfig<'a> {
    source_directories: &'a [&'a str],
}

#[derive(Serialize)]
struct RepositoryConfig {
    repository: String,
}

/// Renders the full sample file: placeholders for the source directories and
/// the repository, a pointer to the archiver's documentation, then the
/// sub-command sections.
pub fn render_sample_config(
    archiver: &dyn Archiver,
    schema: &OptionSchema,
) -> std::result::Result<String, serde_yaml::Error> {
    let sources = serde_yaml::to_string(&SourcesConfig {
        source_directories: SAMPLE_SOURCE_DIRECTORIES,
    })?;
    let repository = serde_yaml::to_string(&RepositoryConfig {
        repository: format!(
            "user@backupserver:sourcehostname.{}",
            archiver.command_name()
        ),
    })?;
    let sections = serde_yaml::to_string(&sample_config(schema))?;

    Ok([
        "# Paths of source directories to backup.\n",
        &sources,
        "# Path to local or remote repository.\n",
        &repository,
        "# For documentation on the rest of these options, see:\n",
        &format!("# {}\n", archiver.usage_documentation_url()),
        &sections,
    ]
    .concat())
}

/// Writes a sample configuration file for `archiver` to `path`.
///
/// # Errors
/// Returns [`Error::FileExists`] without touching anything if `path` already
/// exists, [`Error::File`] if writing fails, and
/// [`Error::UnsupportedArchiver`] if the archiver's options can't be read.
pub fn generate_sample_config_file(archiver: &dyn Archiver, path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        return Err(Error::FileExists(path.to_path_buf()));
    }

    let schema = extract_option_schema(archiver)?;
    let contents = render_sample_config(archiver, &schema)
        .map_err(|e| Error::file(path, io::Error::other(e)))?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::FileExists(path.to_path_buf()),
            _ => Error::file(path, e),
        })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| Error::file(path, e))?;

    info!("Generated sample configuration at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::{ArchiverKind, BuiltinArchiver};
    use crate::schema::SubCommand;
    use tempfile::TempDir;

    #[test]
    fn test_command_argument_to_config_option() {
        assert_eq!(command_argument_to_config_option("--posix-me-harder"), "posix_me_harder");
        assert_eq!(command_argument_to_config_option("-x"), "x");
        assert_eq!(command_argument_to_config_option("keep_daily"), "keep_daily");
    }

    #[test]
    fn test_command_option_to_config_should_convert_name_for_config() {
        let option = CommandOption::new("--posix-me-harder", 42);
        assert_eq!(
            command_option_to_config(&option),
            ConfigOption {
                name: "posix_me_harder".to_string(),
                default: Value::from(42),
            }
        );
    }

    #[test]
    fn test_command_option_to_config_should_convert_list_default_to_string() {
        let default = Value::Sequence(vec![Value::from("foo"), Value::from(3), Value::from("bar")]);
        let option = CommandOption::new("--opt", default);

        assert_eq!(command_option_to_config(&option).default, Value::from("foo,3,bar"));
    }

    #[test]
    fn test_command_option_to_config_should_convert_mapping_default_to_null() {
        let mut default = Mapping::new();
        default.insert(Value::from(1), Value::from(2));
        let option = CommandOption::new("--opt", Value::Mapping(default));

        let config_option = command_option_to_config(&option);
        assert_eq!(config_option.name, "opt");
        assert_eq!(config_option.default, Value::Null);
    }

    #[test]
    fn test_command_option_to_config_keeps_scalar_types() {
        for default in [Value::Bool(true), Value::from(300), Value::from("lz4"), Value::Null] {
            let option = CommandOption::new("--x", default.clone());
            assert_eq!(command_option_to_config(&option).default, default);
        }
    }

    #[test]
    fn test_sample_config_should_convert_command_options_to_config_dict() {
        let schema = OptionSchema::from([
            (
                SubCommand::Prune,
                vec![CommandOption::new("--baz", "c"), CommandOption::new("--quux", "d")],
            ),
            (
                SubCommand::Create,
                vec![CommandOption::new("--foo", "a"), CommandOption::new("--bar-baz", "b")],
            ),
        ]);

        let config = sample_config(&schema);

        let sections: Vec<_> = config.keys().filter_map(Value::as_str).collect();
        assert_eq!(sections, vec!["create", "prune"]);
        let create = config["create"].as_mapping().unwrap();
        let options: Vec<_> = create.keys().filter_map(Value::as_str).collect();
        assert_eq!(options, vec!["foo", "bar_baz"]);
        assert_eq!(create["bar_baz"], Value::from("b"));
    }

    #[test]
    fn test_generate_sample_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let archiver = BuiltinArchiver::new(ArchiverKind::Borg);

        generate_sample_config_file(&archiver, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Paths of source directories to backup.\n"));
        assert!(contents.contains("- /home\n"));
        assert!(contents.contains("sourcehostname.borg"));
        assert!(contents.contains("# https://borgbackup.readthedocs.org/en/latest/usage.html\n"));
        assert!(contents.contains("\ncreate:\n"));
        assert!(contents.contains("  checkpoint_interval: 300\n"));
        assert!(!contents.contains("exclude_from"));
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "repository: mine\n").unwrap();
        let archiver = BuiltinArchiver::new(ArchiverKind::Attic);

        let error = generate_sample_config_file(&archiver, &path).unwrap_err();

        assert!(matches!(error, Error::FileExists(_)));
        assert!(error.to_string().contains(&path.display().to_string()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "repository: mine\n");
    }

    #[test]
    fn test_generate_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("config.yaml");
        let archiver = BuiltinArchiver::new(ArchiverKind::Attic);

        let error = generate_sample_config_file(&archiver, &path).unwrap_err();
        assert!(matches!(error, Error::File { .. }));
    }
}

//! Position-preserving configuration documents.
//!
//! The loader builds its own tree from `yaml-rust2` marked parser events so
//! that every key and every value keeps the line and column it came from.
//! Error messages further down the pipeline point at these positions, so a
//! parser that discards them is not an option.

use crate::error::{ConfigurationError, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// A scalar value as found in the file: null, boolean, number or string.
pub type Scalar = serde_yaml::Value;

/// A 0-based line and column in a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<&Marker> for SourcePosition {
    /// yaml-rust2 counts lines from 1 and columns from 0.
    fn from(marker: &Marker) -> Self {
        Self {
            line: marker.line().saturating_sub(1),
            column: marker.col(),
        }
    }
}

/// A value together with the position it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: Value,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.value {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match &self.value {
            Value::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Scalar(Scalar::Null))
    }

    /// Returns true for values that don't count as "set": null, `false`, zero,
    /// the empty string and empty collections.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Scalar(Scalar::Null) => true,
            Value::Scalar(Scalar::Bool(value)) => !value,
            Value::Scalar(Scalar::Number(number)) => number.as_f64() == Some(0.0),
            Value::Scalar(Scalar::String(value)) => value.is_empty(),
            Value::Scalar(_) => false,
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(mapping) => mapping.is_empty(),
        }
    }
}

/// A key and its value, both positioned.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub key_position: SourcePosition,
    pub value: Node,
}

/// An ordered YAML mapping with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<Entry>,
}

impl Mapping {
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|entry| &entry.value)
    }

    pub fn key_position(&self, key: &str) -> Option<SourcePosition> {
        self.entry(key).map(|entry| entry.key_position)
    }

    pub fn value_position(&self, key: &str) -> Option<SourcePosition> {
        self.get(key).map(|node| node.position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of this mapping without the given keys.
    pub fn without(&self, keys: &[&str]) -> Mapping {
        Mapping {
            entries: self
                .entries
                .iter()
                .filter(|entry| !keys.contains(&entry.key.as_str()))
                .cloned()
                .collect(),
        }
    }

    fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A loaded configuration file.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    filename: PathBuf,
    source: String,
    root: Mapping,
}

impl ConfigDocument {
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The file contents the document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Builds a positioned error against this document.
    pub fn error(&self, position: Option<SourcePosition>, message: &str) -> ConfigurationError {
        ConfigurationError::new(&self.filename, &self.source, position, message)
    }
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
/// Returns [`Error::File`] if the file can't be read and [`Error::Parse`] if
/// it isn't well-formed.
pub fn load_config_file(path: &Path) -> Result<ConfigDocument> {
    debug!("Loading configuration file {}", path.display());
    let source = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    parse_config(path, &source)
}

/// Parses configuration text that was read from `filename`.
///
/// # Errors
/// Returns [`Error::Parse`] positioned at the offending token.
pub fn parse_config(filename: &Path, source: &str) -> Result<ConfigDocument> {
    let parse_error = |position: SourcePosition, message: &str| {
        Error::Parse(ConfigurationError::new(
            filename,
            source,
            Some(position),
            message,
        ))
    };

    let mut builder = TreeBuilder::default();
    Parser::new_from_str(source)
        .load(&mut builder, false)
        .map_err(|e| parse_error(SourcePosition::from(e.marker()), e.info()))?;
    if let Some((position, message)) = builder.error {
        return Err(parse_error(position, &message));
    }

    let root = match builder.root {
        None => Mapping::default(),
        Some(node) if node.is_null() => Mapping::default(),
        Some(Node {
            value: Value::Mapping(mapping),
            ..
        }) => mapping,
        Some(node) => {
            return Err(parse_error(
                node.position,
                "expected a mapping at the top level",
            ));
        }
    };

    Ok(ConfigDocument {
        filename: filename.to_path_buf(),
        source: source.to_string(),
        root,
    })
}

/// Resolves an unquoted scalar the way YAML does: null, booleans and numbers
/// get their types, everything else is a string.
pub(crate) fn resolve_plain_scalar(raw: &str) -> Scalar {
    if raw.is_empty() {
        return Scalar::Null;
    }
    match Yaml::from_str(raw) {
        Yaml::Null => Scalar::Null,
        Yaml::Boolean(value) => Scalar::Bool(value),
        Yaml::Integer(value) => Scalar::Number(value.into()),
        real @ Yaml::Real(_) => real
            .as_f64()
            .map_or_else(|| Scalar::String(raw.to_string()), Scalar::from),
        _ => Scalar::String(raw.to_string()),
    }
}

/// Renders a value the way it would be passed on a command line. Sequences
/// become comma-separated lists.
pub(crate) fn scalar_to_string(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null | Scalar::Mapping(_) => String::new(),
        Scalar::Bool(value) => value.to_string(),
        Scalar::Number(number) => number.to_string(),
        Scalar::String(value) => value.clone(),
        Scalar::Sequence(values) => values
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Scalar::Tagged(tagged) => scalar_to_string(&tagged.value),
    }
}

enum Frame {
    Sequence {
        position: SourcePosition,
        items: Vec<Node>,
    },
    Mapping {
        position: SourcePosition,
        mapping: Mapping,
        key: Option<(String, SourcePosition)>,
    },
}

/// Assembles parser events into a [`Node`] tree.
///
/// Only the first problem is kept; later events are ignored once one is
/// recorded.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Node>,
    error: Option<(SourcePosition, String)>,
}

impl TreeBuilder {
    fn awaiting_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { key: None, .. }))
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            None => self.root = Some(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { mapping, key, .. }) => {
                if let Some((key, key_position)) = key.take() {
                    mapping.push(Entry {
                        key,
                        key_position,
                        value: node,
                    });
                }
            }
        }
    }

    fn fail(&mut self, position: SourcePosition, message: impl Into<String>) {
        self.error.get_or_insert_with(|| (position, message.into()));
    }

    /// Records `raw` as the pending key of the innermost mapping.
    ///
    /// A block mapping's start marker sits on the first key's `:`, so the
    /// mapping takes the first key's position when that comes earlier.
    fn set_key(&mut self, raw: String, position: SourcePosition) {
        let Some(Frame::Mapping {
            position: mapping_position,
            mapping,
            key,
        }) = self.stack.last_mut()
        else {
            return;
        };
        if mapping.entry(&raw).is_some() {
            self.fail(position, format!("duplicate key \"{raw}\""));
            return;
        }
        if mapping.is_empty() && position < *mapping_position {
            *mapping_position = position;
        }
        *key = Some((raw, position));
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        let position = SourcePosition::from(&mark);

        match event {
            Event::Scalar(raw, style, ..) => {
                if self.awaiting_key() {
                    self.set_key(raw, position);
                    return;
                }
                let scalar = if style == TScalarStyle::Plain {
                    resolve_plain_scalar(&raw)
                } else {
                    Scalar::String(raw)
                };
                self.push(Node {
                    value: Value::Scalar(scalar),
                    position,
                });
            }
            Event::SequenceStart(..) | Event::MappingStart(..) if self.awaiting_key() => {
                self.fail(position, "complex mapping keys are not supported");
            }
            Event::SequenceStart(..) => self.stack.push(Frame::Sequence {
                position,
                items: Vec::new(),
            }),
            Event::MappingStart(..) => self.stack.push(Frame::Mapping {
                position,
                mapping: Mapping::default(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence { position, items }) => self.push(Node {
                    value: Value::Sequence(items),
                    position,
                }),
                Some(Frame::Mapping {
                    position, mapping, ..
                }) => self.push(Node {
                    value: Value::Mapping(mapping),
                    position,
                }),
                None => {}
            },
            Event::Alias(_) => self.fail(position, "aliases are not supported"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<ConfigDocument> {
        parse_config(Path::new("config.yaml"), source)
    }

    #[test]
    fn test_parse_keeps_key_and_value_positions() {
        let document = parse(
            "source_directories:\n    - /home\n    - /etc\nrepository: user@host:repo\ncreate:\n    umask: 77\n",
        )
        .unwrap();
        let root = document.root();

        assert_eq!(root.len(), 3);
        assert_eq!(root.key_position("source_directories"), Some(SourcePosition::new(0, 0)));
        assert_eq!(root.key_position("repository"), Some(SourcePosition::new(3, 0)));
        assert_eq!(root.value_position("repository"), Some(SourcePosition::new(3, 12)));

        let directories = root.get("source_directories").unwrap().as_sequence().unwrap();
        assert_eq!(directories.len(), 2);
        assert_eq!(directories[0].position, SourcePosition::new(1, 6));
        assert_eq!(directories[1].as_scalar(), Some(&Scalar::from("/etc")));

        assert_eq!(root.value_position("create"), Some(SourcePosition::new(5, 4)));
        let create = root.get("create").unwrap().as_mapping().unwrap();
        assert_eq!(create.key_position("umask"), Some(SourcePosition::new(5, 4)));
        assert_eq!(create.value_position("umask"), Some(SourcePosition::new(5, 11)));
        assert_eq!(create.get("umask").unwrap().as_scalar(), Some(&Scalar::from(77)));
    }

    #[test]
    fn test_nested_mapping_positions_point_at_first_key() {
        let document = parse("a:\n    b: 1\nc: {x: 1}\nd:\n    e:\n        f: 3\n").unwrap();
        let root = document.root();

        assert_eq!(root.value_position("a"), Some(SourcePosition::new(1, 4)));
        assert_eq!(root.value_position("c"), Some(SourcePosition::new(2, 3)));
        assert_eq!(root.value_position("d"), Some(SourcePosition::new(4, 4)));
        let d = root.get("d").unwrap().as_mapping().unwrap();
        assert_eq!(d.value_position("e"), Some(SourcePosition::new(5, 8)));
    }

    #[test]
    fn test_parse_rejects_duplicate_keys() {
        let error = parse("repository: a\nrepository: [x]\n").unwrap_err();
        let Error::Parse(error) = error else {
            panic!("expected a parse error, got {error:?}");
        };
        assert_eq!(error.message(), "Duplicate key \"repository\"");
        assert_eq!(error.position(), Some(SourcePosition::new(1, 0)));

        let error = parse("create:\n    umask: 1\n    umask: 2\n").unwrap_err();
        assert_eq!(
            error.configuration_error().and_then(|error| error.position()),
            Some(SourcePosition::new(2, 4))
        );
    }

    #[test]
    fn test_parse_resolves_plain_scalars_only() {
        let document = parse(
            "a: true\nb: 12\nc: 1.5\nd: ~\ne: text\nf: '12'\ng: \"true\"\nh:\n",
        )
        .unwrap();
        let root = document.root();
        let scalar = |key: &str| root.get(key).unwrap().as_scalar().unwrap().clone();

        assert_eq!(scalar("a"), Scalar::Bool(true));
        assert_eq!(scalar("b"), Scalar::from(12));
        assert_eq!(scalar("c"), Scalar::from(1.5));
        assert_eq!(scalar("d"), Scalar::Null);
        assert_eq!(scalar("e"), Scalar::from("text"));
        assert_eq!(scalar("f"), Scalar::from("12"));
        assert_eq!(scalar("g"), Scalar::from("true"));
        assert_eq!(scalar("h"), Scalar::Null);
    }

    #[test]
    fn test_parse_empty_file_is_empty_mapping() {
        assert!(parse("").unwrap().root().is_empty());
        assert!(parse("# only a comment\n").unwrap().root().is_empty());
    }

    #[test]
    fn test_parse_error_has_position_and_message() {
        let error = parse("repository: foo\nsource_directories: foo: bar\n").unwrap_err();
        let Error::Parse(error) = error else {
            panic!("expected a parse error, got {error:?}");
        };

        assert_eq!(error.position().map(|p| p.line), Some(1));
        assert!(
            error.message().starts_with("Mapping values are not allowed"),
            "{}",
            error.message()
        );
        assert!(error.to_string().contains("source_directories: foo: bar"));
    }

    #[test]
    fn test_parse_rejects_aliases() {
        let error = parse("a: &anchor 1\nb: *anchor\n").unwrap_err();
        let Error::Parse(error) = error else {
            panic!("expected a parse error, got {error:?}");
        };
        assert_eq!(error.message(), "Aliases are not supported");
        assert_eq!(error.position().map(|p| p.line), Some(1));
    }

    #[test]
    fn test_parse_rejects_non_mapping_root() {
        let error = parse("- a\n- b\n").unwrap_err();
        assert!(matches!(error, Error::Parse(_)));
        assert!(error.to_string().contains("Expected a mapping at the top level"));
    }

    #[test]
    fn test_without_is_a_projection() {
        let document = parse("source_directories: [/home]\nrepository: r\ncheck:\n").unwrap();
        let rest = document.root().without(&["source_directories", "repository"]);

        assert_eq!(rest.len(), 1);
        assert!(rest.entry("check").is_some());
        assert_eq!(document.root().len(), 3);
    }

    #[test]
    fn test_is_empty() {
        let document = parse("a: 0\nb: ''\nc: []\nd: false\ne: x\nf: [1]\n").unwrap();
        let root = document.root();
        for key in ["a", "b", "c", "d"] {
            assert!(root.get(key).unwrap().is_empty(), "{key}");
        }
        for key in ["e", "f"] {
            assert!(!root.get(key).unwrap().is_empty(), "{key}");
        }
    }

    #[test]
    fn test_load_missing_file() {
        let error = load_config_file(Path::new("/nonexistent/atticmatic/config.yaml")).unwrap_err();
        assert!(matches!(error, Error::File { .. }));
    }
}

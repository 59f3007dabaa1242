//! Document model: body text plus metadata

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::metadata::{Metadata, keys};
use crate::{Error, Result};

const FENCE: &str = "---";

/// Text being transformed and the metadata travelling with it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

/// Inputs the caller supplies for seeding the reserved metadata keys
#[derive(Debug, Clone, Default)]
pub struct BuildInputs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    /// `key value` pairs from the command line, applied in order
    pub options: Vec<(String, String)>,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Read a document from disk and split off its frontmatter
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    /// Split a leading `---` fenced YAML block from the body.
    ///
    /// Sources without a fence yield empty metadata and the whole source as text.
    pub fn parse(source: &str) -> Result<Self> {
        let Some((header, body)) = split_frontmatter(source) else {
            return Ok(Self::new(source, Metadata::new()));
        };

        let metadata = if header.trim().is_empty() {
            Metadata::new()
        } else {
            let value: Value = serde_yaml::from_str(header)
                .map_err(|e| Error::Frontmatter(e.to_string()))?;
            match value {
                Value::Object(map) => Metadata::from_map(map),
                Value::Null => Metadata::new(),
                other => {
                    return Err(Error::Frontmatter(format!(
                        "expected a mapping, found {}",
                        kind_of(&other)
                    )));
                }
            }
        };

        Ok(Self::new(body, metadata))
    }

    /// Populate the reserved keys before a phase starts.
    ///
    /// The legacy marker is only set when the source supplied no metadata at all,
    /// so it must be checked before anything else is inserted.
    pub fn prepare(mut self, inputs: &BuildInputs) -> Self {
        let meta = &mut self.metadata;
        if meta.is_empty() {
            meta.insert(keys::LEGACY, "legacy");
        }

        meta.insert(
            keys::INPUT_FILENAME,
            inputs.input.to_string_lossy().to_string(),
        );
        meta.insert(
            keys::OUTPUT_FILENAME,
            inputs
                .output
                .as_ref()
                .map(|p| Value::String(p.to_string_lossy().to_string()))
                .unwrap_or(Value::Null),
        );

        let environment: Map<String, Value> = inputs
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        meta.insert(keys::ENVIRONMENT, Value::Object(environment));

        for (key, value) in &inputs.options {
            meta.insert(key.clone(), option_value(value));
        }

        self
    }
}

/// Read a command-line option the way frontmatter reads a scalar, so
/// `-o draft true` gives a boolean. Anything that is not a plain scalar stays text.
fn option_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn split_frontmatter(source: &str) -> Option<(&str, &str)> {
    let rest = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == FENCE || trimmed == "..." {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

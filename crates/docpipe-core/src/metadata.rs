//! Metadata context threaded through a phase
//!
//! Every plugin in a phase sees the same mapping. Nothing stops two plugins
//! from writing the same key, so well-known keys live in [`keys`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version of the reserved-key schema below
pub const SCHEMA_VERSION: u32 = 1;

/// Reserved and well-known metadata keys
pub mod keys {
    /// Path of the source document
    pub const INPUT_FILENAME: &str = "input_filename";
    /// Path the pre phase writes to (null when printing to stdout)
    pub const OUTPUT_FILENAME: &str = "output_filename";
    /// Snapshot of the process environment
    pub const ENVIRONMENT: &str = "environment";
    /// Set when the document carried no frontmatter at all
    pub const LEGACY: &str = "legacy";
    pub const DRAFT: &str = "draft";
    pub const PREAMBLES: &str = "preambles";
    pub const REDACTED: &str = "redacted";
    pub const CLEAN_REFS: &str = "cleanrefs";
    pub const REMOVE_REFS: &str = "remove-refs";
    pub const REF_REGEX: &str = "ref-regex";
    pub const BUGS: &str = "bugs";
    pub const BUILD_STRINGS: &str = "build_strings";
    pub const TITLE: &str = "title";
    pub const CLIENT: &str = "client";
    pub const DATE: &str = "date";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: Map<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.get(key).and_then(Value::as_bool)
    }

    /// True unless the key is present and literally `false`.
    ///
    /// Plugins use this for opt-out switches such as `bugs: false`.
    pub fn enabled(&self, key: &str) -> bool {
        !matches!(self.entries.get(key), Some(Value::Bool(false)))
    }

    /// True only if the key holds the boolean `true`
    pub fn is_true(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Bool(true)))
    }

    /// Read a key as a list of strings. A lone scalar is treated as a
    /// one-element list. Numbers and booleans are written out as text
    /// (`2024` -> `"2024"`); nulls and nested collections are skipped.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.entries.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(other) => scalar_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Whether a string-valued key contains `needle` (false when missing or not a string)
    pub fn str_contains(&self, key: &str, needle: &str) -> bool {
        self.get_str(key).is_some_and(|s| s.contains(needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Copy the listed keys that are present into a new mapping
    pub fn select(&self, wanted: &[&str]) -> Map<String, Value> {
        wanted
            .iter()
            .filter_map(|k| self.entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(entries: Map<String, Value>) -> Self {
        Self::from_map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Metadata {
        let Value::Object(map) = json!({
            "title": "Example",
            "bugs": false,
            "draft": true,
            "redacted": ["Alice", "Bob", 3],
            "output_filename": "report-draft.tex"
        }) else {
            unreachable!()
        };
        Metadata::from_map(map)
    }

    #[test]
    fn test_enabled_switch() {
        let meta = sample();
        assert!(!meta.enabled(keys::BUGS));
        assert!(meta.enabled(keys::DRAFT));
        assert!(meta.enabled("missing"));
    }

    #[test]
    fn test_string_list() {
        let mut meta = sample();
        assert_eq!(meta.string_list(keys::REDACTED), vec!["Alice", "Bob"]);

        meta.insert(keys::REDACTED, "Carol");
        assert_eq!(meta.string_list(keys::REDACTED), vec!["Carol"]);
        assert!(meta.string_list("missing").is_empty());

        meta.insert(keys::REDACTED, serde_json::json!([2024, "ACME", 1.5, true, null]));
        assert_eq!(
            meta.string_list(keys::REDACTED),
            vec!["2024", "ACME", "1.5", "true"]
        );
        meta.insert(keys::REDACTED, 2024);
        assert_eq!(meta.string_list(keys::REDACTED), vec!["2024"]);
    }

    #[test]
    fn test_str_contains() {
        let meta = sample();
        assert!(meta.str_contains(keys::OUTPUT_FILENAME, "draft"));
        assert!(!meta.str_contains(keys::OUTPUT_FILENAME, "redacted"));
        assert!(!meta.str_contains(keys::INPUT_FILENAME, "draft"));
    }

    #[test]
    fn test_select_skips_missing() {
        let meta = sample();
        let picked = meta.select(&["title", "nope"]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked["title"], json!("Example"));
    }
}

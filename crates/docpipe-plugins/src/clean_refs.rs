//! Strips working references (`ref:<hex>`) from the text when the document
//! sets `remove-refs: true`. `ref-regex` replaces the default pattern.

use anyhow::Context;
use docpipe_core::metadata::keys;
use docpipe_core::{Metadata, PreStage};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DEFAULT_REF: Regex = Regex::new(r"[\[(]*ref:[0-9a-f]+[\])]*").unwrap();
}

pub struct CleanRefs;

impl PreStage for CleanRefs {
    fn applies(&self, _text: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        Ok(metadata.enabled(keys::CLEAN_REFS))
    }

    fn transform(&self, text: String, metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        if !metadata.is_true(keys::REMOVE_REFS) {
            return Ok((text, metadata));
        }

        let cleaned = match metadata.get_str(keys::REF_REGEX) {
            Some(custom) => {
                let pattern = Regex::new(custom)
                    .with_context(|| format!("Invalid {}: {}", keys::REF_REGEX, custom))?;
                pattern.replace_all(&text, "").into_owned()
            }
            None => DEFAULT_REF.replace_all(&text, "").into_owned(),
        };

        Ok((cleaned, metadata))
    }
}

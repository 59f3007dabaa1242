//! Looks for likely mistakes in the LaTeX source.
//!
//! Findings are warnings in draft mode and stop the build otherwise. Set
//! `bugs: false` to build regardless. Findings are recorded under `bugs` so
//! they survive the renderer's long log.
//!
//! Current checks:
//! - `footnote` written without its backslash

use docpipe_core::metadata::keys;
use docpipe_core::{BuildBlocked, Metadata, PreStage};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::warn;

lazy_static! {
    static ref FOOTNOTE: Regex = Regex::new(r".*[^\\\s]footnote.*").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub check: &'static str,
    pub offset: usize,
    pub excerpt: String,
}

/// Run every check over `text`
pub fn find_bugs(text: &str) -> Vec<Finding> {
    FOOTNOTE
        .find_iter(text)
        .map(|m| Finding {
            check: "footnote",
            offset: m.start(),
            excerpt: m.as_str().to_string(),
        })
        .collect()
}

pub struct Bugs;

impl PreStage for Bugs {
    fn applies(&self, _text: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        Ok(metadata.enabled(keys::BUGS))
    }

    fn transform(&self, text: String, mut metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        let findings = find_bugs(&text);

        let mut report: Map<String, Value> = Map::new();
        for finding in &findings {
            warn!(
                check = finding.check,
                offset = finding.offset,
                "Found {} at position {}",
                finding.excerpt,
                finding.offset
            );
            let entry = report
                .entry(finding.check)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.push(json!({"offset": finding.offset, "excerpt": finding.excerpt}));
            }
        }
        metadata.insert(keys::BUGS, Value::Object(report));

        if !findings.is_empty() && !metadata.is_true(keys::DRAFT) {
            return Err(BuildBlocked::new(format!(
                "Pipeline found {} problem(s) in LaTeX. Stopping build.",
                findings.len()
            ))
            .into());
        }

        Ok((text, metadata))
    }
}

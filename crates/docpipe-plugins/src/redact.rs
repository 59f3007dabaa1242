use docpipe_core::metadata::keys;
use docpipe_core::{Metadata, PreStage};
use docpipe_security::{RedactionOptions, Redactor};
use serde::Deserialize;
use tracing::info;

/// Manifest overrides on top of the configured redaction options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactSettings {
    /// Substring of the output file name that turns redaction on
    pub trigger: Option<String>,
    pub marker: Option<String>,
    pub region_open: Option<String>,
    pub region_close: Option<String>,
    pub case_insensitive: Option<bool>,
    pub join_whitespace: Option<bool>,
}

impl RedactSettings {
    fn apply(self, mut base: RedactionOptions) -> RedactionOptions {
        if let Some(marker) = self.marker {
            base.marker = marker;
        }
        if let Some(open) = self.region_open {
            base.region_open = open;
        }
        if let Some(close) = self.region_close {
            base.region_close = close;
        }
        if let Some(flag) = self.case_insensitive {
            base.case_insensitive = flag;
        }
        if let Some(flag) = self.join_whitespace {
            base.join_whitespace = flag;
        }
        base
    }
}

/// Censors the patterns listed under `redacted` when building a redacted copy
pub struct Redact {
    trigger: String,
    options: RedactionOptions,
}

impl Redact {
    pub fn new(base: RedactionOptions, settings: RedactSettings) -> Self {
        let trigger = settings
            .trigger
            .clone()
            .unwrap_or_else(|| "redacted".to_string());
        Self {
            trigger,
            options: settings.apply(base),
        }
    }
}

impl PreStage for Redact {
    fn applies(&self, _text: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        Ok(metadata.str_contains(keys::OUTPUT_FILENAME, &self.trigger))
    }

    fn transform(&self, text: String, metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        let patterns = metadata.string_list(keys::REDACTED);
        if patterns.is_empty() {
            return Ok((text, metadata));
        }

        let redactor = Redactor::with_options(&patterns, self.options.clone())?;
        let result = redactor.redact(&text);
        info!(
            patterns = patterns.len(),
            spans = result.spans.len(),
            markers = result.markers,
            dropped_lines = result.dropped_lines,
            "Redacted document"
        );

        Ok((result.text, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(output: &str, redacted: serde_json::Value) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert(keys::OUTPUT_FILENAME, output);
        meta.insert(keys::REDACTED, redacted);
        meta
    }

    #[test]
    fn test_triggered_by_output_name() {
        let plugin = Redact::new(RedactionOptions::default(), RedactSettings::default());
        assert!(plugin.applies("", &meta("report-redacted.tex", json!([]))).unwrap());
        assert!(!plugin.applies("", &meta("report.tex", json!([]))).unwrap());
    }

    #[test]
    fn test_custom_trigger_and_marker() {
        let settings = RedactSettings {
            trigger: Some("public".to_string()),
            marker: Some("[X]".to_string()),
            ..Default::default()
        };
        let plugin = Redact::new(RedactionOptions::default(), settings);
        let m = meta("report-public.tex", json!(["Alice"]));
        assert!(plugin.applies("", &m).unwrap());

        let (text, _) = plugin.transform("Ask Alice".to_string(), m).unwrap();
        assert_eq!(text, "Ask [X]");
    }

    #[test]
    fn test_without_patterns_is_identity() {
        let plugin = Redact::new(RedactionOptions::default(), RedactSettings::default());
        let mut m = Metadata::new();
        m.insert(keys::OUTPUT_FILENAME, "x-redacted.tex");
        let (text, _) = plugin.transform("Alice".to_string(), m).unwrap();
        assert_eq!(text, "Alice");
    }

    #[test]
    fn test_bad_pattern_fails() {
        let plugin = Redact::new(RedactionOptions::default(), RedactSettings::default());
        let err = plugin
            .transform("x".to_string(), meta("x-redacted.tex", json!(["(oops"])))
            .unwrap_err();
        assert!(err.to_string().contains("(oops"));
    }
}

//! Pattern redaction engine

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spans::{Span, SpanSet};

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("Invalid redaction pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// How matches are replaced and where the marker is not allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionOptions {
    /// Placeholder written in place of each redacted span
    pub marker: String,
    /// Line prefix that opens the region where the marker is not legal
    pub region_open: String,
    /// Line prefix that closes that region for the rest of the text
    pub region_close: String,
    pub case_insensitive: bool,
    /// Emit one marker for spans separated only by spaces or tabs on one line
    pub join_whitespace: bool,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            marker: r"\censor{XXXX}".to_string(),
            region_open: r"\begin{acronym}".to_string(),
            region_close: r"\end{acronym}".to_string(),
            case_insensitive: true,
            join_whitespace: true,
        }
    }
}

/// Outcome of a redaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    /// Merged cover of all matches, ascending, in the input text
    pub spans: Vec<Span>,
    /// Markers written to the output
    pub markers: usize,
    /// Lines removed inside the exempt region
    pub dropped_lines: usize,
}

/// Redacts every match of a list of author-supplied patterns
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<(String, Regex)>,
    options: RedactionOptions,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Region {
    Outside,
    Inside,
    Closed,
}

impl Redactor {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RedactError> {
        Self::with_options(patterns, RedactionOptions::default())
    }

    pub fn with_options<S: AsRef<str>>(
        patterns: &[S],
        options: RedactionOptions,
    ) -> Result<Self, RedactError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                let source = p.as_ref();
                RegexBuilder::new(&expand_pattern(source))
                    .case_insensitive(options.case_insensitive)
                    .build()
                    .map(|re| (source.to_string(), re))
                    .map_err(|e| RedactError::InvalidPattern {
                        pattern: source.to_string(),
                        source: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns: compiled,
            options,
        })
    }

    pub fn options(&self) -> &RedactionOptions {
        &self.options
    }

    /// Minimal sorted cover of every match of every pattern
    pub fn find_spans(&self, text: &str) -> Vec<Span> {
        let mut cover = SpanSet::new();
        for (_, pattern) in &self.patterns {
            cover.extend(pattern.find_iter(text).map(|m| Span::new(m.start(), m.end())));
        }
        cover.into_sorted()
    }

    /// Redact matches from content
    pub fn redact(&self, content: &str) -> Redaction {
        let spans = self.find_spans(content);
        if spans.is_empty() {
            return Redaction {
                text: content.to_string(),
                ..Default::default()
            };
        }

        let (substituted, markers) = self.substitute(content, &spans);
        let (text, dropped_lines) = self.drop_region_lines(&substituted);

        Redaction {
            text,
            spans,
            markers,
            dropped_lines,
        }
    }

    fn substitute(&self, content: &str, spans: &[Span]) -> (String, usize) {
        let mut out = String::with_capacity(content.len());
        let mut markers = 0;
        let mut last = 0;
        let mut open: Option<Span> = None;

        for span in spans {
            if let Some(current) = open {
                let gap = &content[current.end..span.start];
                if self.options.join_whitespace && gap.chars().all(|c| c == ' ' || c == '\t') {
                    open = Some(current.union(span));
                    continue;
                }
                out.push_str(&content[last..current.start]);
                out.push_str(&self.options.marker);
                markers += 1;
                last = current.end;
            }
            open = Some(*span);
        }

        if let Some(current) = open {
            out.push_str(&content[last..current.start]);
            out.push_str(&self.options.marker);
            markers += 1;
            last = current.end;
        }
        out.push_str(&content[last..]);

        (out, markers)
    }

    /// Remove marker-bearing lines inside the exempt region
    fn drop_region_lines(&self, text: &str) -> (String, usize) {
        let mut state = Region::Outside;
        let mut kept = Vec::new();
        let mut dropped = 0;

        for line in text.split('\n') {
            let trimmed = line.trim();
            match state {
                Region::Outside => {
                    if trimmed.starts_with(&self.options.region_open) {
                        state = Region::Inside;
                    }
                }
                Region::Inside => {
                    if trimmed.starts_with(&self.options.region_close) {
                        state = Region::Closed;
                    } else if line.contains(&self.options.marker) {
                        dropped += 1;
                        continue;
                    }
                }
                Region::Closed => {}
            }
            kept.push(line);
        }

        (kept.join("\n"), dropped)
    }
}

/// Let an escaped space match any run of whitespace, including line breaks
pub fn expand_pattern(pattern: &str) -> String {
    pattern.replace(r"\ ", r"\s*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_options() -> RedactionOptions {
        RedactionOptions {
            marker: "<MARKER>".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_contiguous_matches_collapse_to_one_marker() {
        let redactor =
            Redactor::with_options(&["Alice", "Bob", "met"], marker_options()).unwrap();
        let result = redactor.redact("Secret: Alice met Bob");

        assert_eq!(result.text, "Secret: <MARKER>");
        assert_eq!(result.markers, 1);
        assert_eq!(result.spans.len(), 3);
    }

    #[test]
    fn test_separated_matches_keep_gap_text() {
        let redactor = Redactor::with_options(&["Alice", "Bob"], marker_options()).unwrap();
        let result = redactor.redact("Alice and Bob");
        assert_eq!(result.text, "<MARKER> and <MARKER>");
        assert_eq!(result.markers, 2);
    }

    #[test]
    fn test_join_whitespace_can_be_disabled() {
        let options = RedactionOptions {
            join_whitespace: false,
            ..marker_options()
        };
        let redactor = Redactor::with_options(&["Alice", "Bob"], options).unwrap();
        assert_eq!(redactor.redact("Alice Bob").text, "<MARKER> <MARKER>");
    }

    #[test]
    fn test_line_breaks_are_never_joined() {
        let redactor = Redactor::with_options(&["Alice", "Bob"], marker_options()).unwrap();
        let result = redactor.redact("Ask Alice\n\nBob replied.");
        assert_eq!(result.text, "Ask <MARKER>\n\n<MARKER> replied.");
        assert_eq!(result.markers, 2);

        assert_eq!(redactor.redact("Alice\t Bob").text, "<MARKER>");
    }

    #[test]
    fn test_overlapping_patterns_merge() {
        let redactor =
            Redactor::with_options(&["Project Hydra", "Hydra Labs"], marker_options()).unwrap();
        let result = redactor.redact("See Project Hydra Labs today");
        assert_eq!(result.spans, vec![Span::new(4, 22)]);
        assert_eq!(result.text, "See <MARKER> today");
    }

    #[test]
    fn test_escaped_space_spans_line_breaks() {
        let redactor = Redactor::with_options(&[r"Acme\ Corp"], marker_options()).unwrap();
        let result = redactor.redact("Contract with ACME\n   corp was signed");
        assert_eq!(result.text, "Contract with <MARKER> was signed");
    }

    #[test]
    fn test_case_sensitive_option() {
        let options = RedactionOptions {
            case_insensitive: false,
            ..marker_options()
        };
        let redactor = Redactor::with_options(&["alice"], options).unwrap();
        assert_eq!(redactor.redact("Alice alice").text, "Alice <MARKER>");
    }

    #[test]
    fn test_no_matches_is_identity() {
        let redactor = Redactor::new(&["Mallory"]).unwrap();
        let content = "Just some normal text\n\\begin{acronym}\n\\end{acronym}\n";
        let result = redactor.redact(content);
        assert_eq!(result.text, content);
        assert!(result.spans.is_empty());
        assert_eq!(result.markers, 0);
    }

    #[test]
    fn test_region_lines_dropped_inside_substituted_outside() {
        let redactor = Redactor::new(&["Hydra"]).unwrap();
        let content = [
            r"Hydra is outside.",
            r"\begin{acronym}",
            r"  \acro{HY}{Hydra Systems}",
            r"  \acro{OK}{Okay}",
            r"\end{acronym}",
            r"Hydra again.",
        ]
        .join("\n");

        let result = redactor.redact(&content);
        let expected = [
            r"\censor{XXXX} is outside.",
            r"\begin{acronym}",
            r"  \acro{OK}{Okay}",
            r"\end{acronym}",
            r"\censor{XXXX} again.",
        ]
        .join("\n");
        assert_eq!(result.text, expected);
        assert_eq!(result.dropped_lines, 1);
    }

    #[test]
    fn test_closed_region_is_not_reentered() {
        let redactor = Redactor::with_options(&["Hydra"], marker_options()).unwrap();
        let content = "\\begin{acronym}\n\\end{acronym}\n\\begin{acronym}\nHydra\n";
        let result = redactor.redact(content);
        assert_eq!(
            result.text,
            "\\begin{acronym}\n\\end{acronym}\n\\begin{acronym}\n<MARKER>\n"
        );
        assert_eq!(result.dropped_lines, 0);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = Redactor::new(&["ok", "(unclosed"]).unwrap_err();
        match err {
            RedactError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
        }
    }
}

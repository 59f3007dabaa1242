//! Build provenance trailer
//!
//! A provenance block is a YAML mapping, every line prefixed with a comment
//! marker, framed by begin/end sentinel lines and appended to the end of a
//! rendered artifact. Formats such as PDF treat the trailing comment lines as
//! inert; callers must only stamp formats with that property.
//!
//! ```text
//! %%% BEGIN BUILD PROVENANCE %%%
//! % draft: true
//! % title: Example
//! %%% END BUILD PROVENANCE %%%
//! ```

pub mod error;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub use error::{ProvenanceError, Result};

pub const BEGIN_SENTINEL: &str = "%%% BEGIN BUILD PROVENANCE %%%";
pub const END_SENTINEL: &str = "%%% END BUILD PROVENANCE %%%";
pub const COMMENT_PREFIX: &str = "% ";

/// Sentinel and comment strings of the trailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceFormat {
    pub begin: String,
    pub end: String,
    pub comment: String,
}

impl Default for ProvenanceFormat {
    fn default() -> Self {
        Self {
            begin: BEGIN_SENTINEL.to_string(),
            end: END_SENTINEL.to_string(),
            comment: COMMENT_PREFIX.to_string(),
        }
    }
}

/// Encodes, appends and recovers provenance blocks
#[derive(Debug, Clone, Default)]
pub struct ProvenanceCodec {
    format: ProvenanceFormat,
}

impl ProvenanceCodec {
    pub fn new(format: ProvenanceFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &ProvenanceFormat {
        &self.format
    }

    /// Serialize `fields` into a complete framed block
    pub fn encode(&self, fields: &Map<String, Value>) -> Result<Vec<u8>> {
        let yaml = serde_yaml::to_string(fields)?;
        let bare = self.format.comment.trim_end();

        let mut out = String::with_capacity(yaml.len() * 2);
        out.push_str(&self.format.begin);
        out.push('\n');
        for line in yaml.lines() {
            if line.is_empty() {
                out.push_str(bare);
            } else {
                out.push_str(&self.format.comment);
                out.push_str(line);
            }
            out.push('\n');
        }
        out.push_str(&self.format.end);
        out.push('\n');

        Ok(out.into_bytes())
    }

    /// Append an encoded block to the artifact. Existing bytes are never read
    /// or rewritten. Returns the number of bytes written.
    pub fn append(&self, artifact: &Path, fields: &Map<String, Value>) -> Result<usize> {
        let block = self.encode(fields)?;
        let mut file = OpenOptions::new().append(true).open(artifact)?;
        file.write_all(&block)?;
        file.flush()?;
        debug!(artifact = %artifact.display(), bytes = block.len(), "Appended provenance block");
        Ok(block.len())
    }

    /// Recover the last provenance block in `bytes`.
    ///
    /// Returns `Ok(None)` when no complete block is present; unstamped
    /// artifacts are normal.
    pub fn decode(&self, bytes: &[u8]) -> Result<Option<Map<String, Value>>> {
        let Some((start, end)) = self.locate_last(bytes) else {
            return Ok(None);
        };

        let body = std::str::from_utf8(&bytes[start..end]).map_err(|_| ProvenanceError::Encoding)?;
        let bare = self.format.comment.trim_end();

        let mut yaml = String::with_capacity(body.len());
        for (idx, line) in body.lines().enumerate() {
            let content = if let Some(rest) = line.strip_prefix(self.format.comment.as_str()) {
                rest
            } else if line == bare {
                ""
            } else {
                return Err(ProvenanceError::MalformedLine { line: idx + 1 });
            };
            yaml.push_str(content);
            yaml.push('\n');
        }

        if yaml.trim().is_empty() {
            return Ok(Some(Map::new()));
        }
        let fields: Map<String, Value> = serde_yaml::from_str(&yaml)?;
        Ok(Some(fields))
    }

    /// Read an artifact from disk and decode its last provenance block
    pub fn extract(&self, artifact: &Path) -> Result<Option<Map<String, Value>>> {
        let bytes = std::fs::read(artifact)?;
        self.decode(&bytes)
    }

    /// Number of begin sentinels present
    pub fn count_blocks(&self, bytes: &[u8]) -> usize {
        let begin = self.begin_line();
        let mut count = 0;
        let mut from = 0;
        while let Some(pos) = find_line(bytes, &begin, from) {
            count += 1;
            from = pos + begin.len();
        }
        count
    }

    fn begin_line(&self) -> Vec<u8> {
        format!("{}\n", self.format.begin).into_bytes()
    }

    /// Byte range of the body of the last complete block
    fn locate_last(&self, bytes: &[u8]) -> Option<(usize, usize)> {
        let begin = self.begin_line();
        let end = format!("\n{}\n", self.format.end).into_bytes();

        let start = rfind_line(bytes, &begin)? + begin.len();
        // An empty body puts the end sentinel right after the begin line
        let end_line = format!("{}\n", self.format.end).into_bytes();
        if bytes[start..].starts_with(&end_line) {
            return Some((start, start));
        }
        let stop = find(bytes, &end, start)? + 1;
        Some((start, stop))
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn at_line_start(haystack: &[u8], pos: usize) -> bool {
    pos == 0 || haystack[pos - 1] == b'\n'
}

/// First occurrence of `needle` that starts a line
fn find_line(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(pos) = find(haystack, needle, from) {
        if at_line_start(haystack, pos) {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

/// Last occurrence of `needle` that starts a line
fn rfind_line(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&pos| at_line_start(haystack, pos) && haystack[pos..].starts_with(needle))
}

//! Post-phase plugin that stamps build provenance into the artifact.
//!
//! The keys listed under `build_strings` are saved together with revision
//! identifiers of the surrounding checkout and a few standard document fields.
//! Set `build_strings: false` to turn stamping off.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use docpipe_core::metadata::keys;
use docpipe_core::{CommandSpec, Metadata, PostStage, ProcessRunner};
use docpipe_provenance::ProvenanceCodec;
use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildStringsSettings {
    /// Field name -> command whose trimmed stdout is recorded
    pub revision_commands: BTreeMap<String, Vec<String>>,
}

impl Default for BuildStringsSettings {
    fn default() -> Self {
        let argv = |args: &[&str]| args.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            revision_commands: BTreeMap::from([
                ("git_commit".to_string(), argv(&["git", "rev-parse", "HEAD"])),
                (
                    "git_branch".to_string(),
                    argv(&["git", "rev-parse", "--abbrev-ref", "HEAD"]),
                ),
            ]),
        }
    }
}

pub struct BuildStrings {
    runner: Arc<dyn ProcessRunner>,
    codec: ProvenanceCodec,
    settings: BuildStringsSettings,
}

impl BuildStrings {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        codec: ProvenanceCodec,
        settings: BuildStringsSettings,
    ) -> Self {
        Self {
            runner,
            codec,
            settings,
        }
    }

    /// Assemble the fields to stamp
    pub fn collect(&self, metadata: &Metadata) -> anyhow::Result<Map<String, Value>> {
        let mut out = Map::new();
        let input = metadata.get_str(keys::INPUT_FILENAME).unwrap_or("");

        for (field, argv) in &self.settings.revision_commands {
            match self.revision(argv, input) {
                Ok(rev) => {
                    out.insert(field.clone(), Value::String(rev));
                }
                Err(e) => warn!(field = %field, "Skipping revision field: {:#}", e),
            }
        }

        for key in metadata.string_list(keys::BUILD_STRINGS) {
            let value = metadata
                .get(&key)
                .with_context(|| format!("{} lists {} but it is not set", keys::BUILD_STRINGS, key))?;
            out.insert(key, value.clone());
        }

        let client = metadata.get_str(keys::CLIENT).unwrap_or("");
        out.insert(keys::CLIENT.to_string(), Value::String(strip_acronym(client).to_string()));
        out.insert(
            keys::DATE.to_string(),
            metadata
                .get(keys::DATE)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        );
        out.insert(
            keys::TITLE.to_string(),
            Value::String(metadata.get_str(keys::TITLE).unwrap_or("").replace(r"\\", "\n")),
        );
        out.insert(
            keys::DRAFT.to_string(),
            Value::Bool(metadata.get_bool(keys::DRAFT).unwrap_or(false)),
        );

        let input_path = Path::new(input);
        let shown = std::fs::canonicalize(input_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| input.to_string());
        out.insert(keys::INPUT_FILENAME.to_string(), Value::String(shown));

        if let Ok(bytes) = std::fs::read(input_path) {
            out.insert(
                "source_digest".to_string(),
                Value::String(blake3::hash(&bytes).to_hex().to_string()),
            );
        }

        out.insert(
            "built_at".to_string(),
            Value::String(OffsetDateTime::now_utc().format(&Rfc3339)?),
        );

        Ok(out)
    }

    fn revision(&self, argv: &[String], input: &str) -> anyhow::Result<String> {
        let mut spec = CommandSpec::from_argv(argv)?;
        if let Some(dir) = Path::new(input).parent().filter(|d| d.is_dir()) {
            spec = spec.cwd(dir);
        }
        Ok(self.runner.output(&spec)?.trim().to_string())
    }
}

impl PostStage for BuildStrings {
    fn applies(&self, _artifact: &Path, metadata: &Metadata) -> anyhow::Result<bool> {
        Ok(metadata.enabled(keys::BUILD_STRINGS))
    }

    fn transform(&self, artifact: &Path, metadata: Metadata) -> anyhow::Result<Metadata> {
        let stamp = self.collect(&metadata)?;

        let previous = std::fs::read(artifact)
            .map(|bytes| self.codec.count_blocks(&bytes))
            .with_context(|| format!("Failed to read {}", artifact.display()))?;
        if previous > 0 {
            info!(blocks = previous, "Artifact already stamped; appending a newer block");
        }

        self.codec.append(artifact, &stamp)?;

        // Read it back now so a broken block fails this build, not a later reader
        let decoded = self
            .codec
            .extract(artifact)?
            .context("Provenance block missing right after stamping")?;
        debug!(?decoded, "Provenance block");
        info!(fields = decoded.len(), artifact = %artifact.display(), "Stamped build provenance");

        Ok(metadata)
    }
}

/// `\ac{ACME}` -> `ACME`
fn strip_acronym(value: &str) -> &str {
    value
        .strip_prefix(r"\ac{")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(value)
}

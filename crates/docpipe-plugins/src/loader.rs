use std::sync::Arc;

use anyhow::Context;
use docpipe_core::{Capabilities, PluginLoader, PluginUnit, ProcessRunner};
use docpipe_provenance::{ProvenanceCodec, ProvenanceFormat};
use docpipe_security::RedactionOptions;

use crate::bugs::Bugs;
use crate::build_strings::{BuildStrings, BuildStringsSettings};
use crate::clean_refs::CleanRefs;
use crate::draft::DraftMode;
use crate::exec::ExecStage;
use crate::manifest::PluginManifest;
use crate::redact::{Redact, RedactSettings};
use crate::svg_fix::{SvgFix, SvgFixSettings};

/// Plugin kinds a manifest may name
pub const KINDS: &[&str] = &[
    "draft",
    "svg_fix",
    "redact",
    "clean_refs",
    "bugs",
    "build_strings",
    "exec",
];

/// Builds plugins from manifests
pub struct BuiltinLoader {
    runner: Arc<dyn ProcessRunner>,
    redaction: RedactionOptions,
    provenance: ProvenanceFormat,
}

impl BuiltinLoader {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            redaction: RedactionOptions::default(),
            provenance: ProvenanceFormat::default(),
        }
    }

    /// Base options for `redact` plugins
    pub fn with_redaction(mut self, options: RedactionOptions) -> Self {
        self.redaction = options;
        self
    }

    /// Block format for `build_strings` plugins
    pub fn with_provenance(mut self, format: ProvenanceFormat) -> Self {
        self.provenance = format;
        self
    }

    pub fn build(&self, name: &str, manifest: &PluginManifest) -> anyhow::Result<Capabilities> {
        if manifest.plugin != "exec" && (manifest.pre.is_some() || manifest.post.is_some()) {
            anyhow::bail!(
                "[pre] and [post] tables are only valid for exec plugins, not {}",
                manifest.plugin
            );
        }

        let caps = match manifest.plugin.as_str() {
            "draft" => {
                manifest.expect_no_settings()?;
                Capabilities::pre(DraftMode)
            }
            "svg_fix" => {
                let settings: SvgFixSettings = manifest.settings()?;
                Capabilities::pre(SvgFix::new(self.runner.clone(), settings))
            }
            "redact" => {
                let settings: RedactSettings = manifest.settings()?;
                Capabilities::pre(Redact::new(self.redaction.clone(), settings))
            }
            "clean_refs" => {
                manifest.expect_no_settings()?;
                Capabilities::pre(CleanRefs)
            }
            "bugs" => {
                manifest.expect_no_settings()?;
                Capabilities::pre(Bugs)
            }
            "build_strings" => {
                let settings: BuildStringsSettings = manifest.settings()?;
                Capabilities::post(BuildStrings::new(
                    self.runner.clone(),
                    ProvenanceCodec::new(self.provenance.clone()),
                    settings,
                ))
            }
            "exec" => {
                manifest.expect_no_settings()?;
                let mut caps = Capabilities::default();
                if let Some(entry) = &manifest.pre {
                    caps.pre = Some(Box::new(ExecStage::new(
                        name,
                        entry.clone(),
                        self.runner.clone(),
                    )?));
                }
                if let Some(entry) = &manifest.post {
                    caps.post = Some(Box::new(ExecStage::new(
                        name,
                        entry.clone(),
                        self.runner.clone(),
                    )?));
                }
                caps
            }
            other => anyhow::bail!(
                "Unknown plugin kind {:?} (expected one of: {})",
                other,
                KINDS.join(", ")
            ),
        };

        Ok(caps)
    }
}

impl PluginLoader for BuiltinLoader {
    fn load(&self, unit: &PluginUnit) -> anyhow::Result<Capabilities> {
        let source = std::fs::read_to_string(&unit.path)
            .with_context(|| format!("Failed to read {}", unit.path.display()))?;
        let manifest = PluginManifest::parse(&source)
            .with_context(|| format!("Failed to parse {}", unit.path.display()))?;
        self.build(&unit.name, &manifest)
    }
}

//! Plugins backed by external commands.
//!
//! Pre phase: the document text is written to the command's stdin and its
//! stdout becomes the new text. Post phase: the artifact path is passed as
//! the final argument. Metadata is exported as JSON in `DOCPIPE_METADATA`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use docpipe_core::{CommandSpec, Metadata, PostStage, PreStage, ProcessRunner};

use crate::manifest::ExecEntry;

pub const METADATA_ENV: &str = "DOCPIPE_METADATA";

pub struct ExecStage {
    name: String,
    entry: ExecEntry,
    runner: Arc<dyn ProcessRunner>,
}

impl ExecStage {
    pub fn new(name: &str, entry: ExecEntry, runner: Arc<dyn ProcessRunner>) -> anyhow::Result<Self> {
        if entry.run.is_empty() {
            anyhow::bail!("exec plugin {} has an empty run command", name);
        }
        if entry.when.as_ref().is_some_and(|w| w.is_empty()) {
            anyhow::bail!("exec plugin {} has an empty when command", name);
        }
        Ok(Self {
            name: name.to_string(),
            entry,
            runner,
        })
    }

    fn command(&self, argv: &[String], metadata: &Metadata) -> anyhow::Result<CommandSpec> {
        let json = serde_json::to_string(metadata)?;
        Ok(CommandSpec::from_argv(argv)?
            .env(METADATA_ENV, json)
            .env("DOCPIPE_PLUGIN", self.name.clone()))
    }

    fn predicate(&self, spec: Option<CommandSpec>) -> anyhow::Result<bool> {
        match spec {
            None => Ok(true),
            Some(spec) => Ok(self.runner.run(&spec)?.success),
        }
    }
}

impl PreStage for ExecStage {
    fn applies(&self, text: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        let spec = match &self.entry.when {
            Some(argv) => Some(self.command(argv, metadata)?.stdin(text)),
            None => None,
        };
        self.predicate(spec)
    }

    fn transform(&self, text: String, metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        let spec = self.command(&self.entry.run, &metadata)?.stdin(text);
        let output = self
            .runner
            .output(&spec)
            .with_context(|| format!("exec plugin {} failed", self.name))?;
        Ok((output, metadata))
    }
}

impl PostStage for ExecStage {
    fn applies(&self, artifact: &Path, metadata: &Metadata) -> anyhow::Result<bool> {
        let spec = match &self.entry.when {
            Some(argv) => Some(
                self.command(argv, metadata)?
                    .arg(artifact.display().to_string()),
            ),
            None => None,
        };
        self.predicate(spec)
    }

    fn transform(&self, artifact: &Path, metadata: Metadata) -> anyhow::Result<Metadata> {
        let spec = self
            .command(&self.entry.run, &metadata)?
            .arg(artifact.display().to_string());
        self.runner
            .output(&spec)
            .with_context(|| format!("exec plugin {} failed", self.name))?;
        Ok(metadata)
    }
}

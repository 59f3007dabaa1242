//! Pipeline executor
//!
//! Runs exactly one phase over the discovered plugins, in discovery order,
//! threading state from one plugin to the next. The first failure aborts the
//! run; side effects of plugins that already ran are left in place.

use std::path::Path;

use tracing::{debug, info};

use crate::plugin::PluginDescriptor;
use crate::{Document, Error, Metadata, Phase, Result};

/// Result of running one phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutcome {
    pub document: Document,
    /// Canonical names of plugins whose transform ran, in order
    pub applied: Vec<String>,
}

/// Ordered plugin set, ready to run
#[derive(Debug, Default)]
pub struct Pipeline {
    plugins: Vec<PluginDescriptor>,
}

impl Pipeline {
    pub fn new(plugins: Vec<PluginDescriptor>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    /// Run a single phase.
    ///
    /// In the post phase the document text passes through untouched and only
    /// the metadata is threaded.
    pub fn run(&self, phase: Phase, document: Document, artifact: &Path) -> Result<PhaseOutcome> {
        match phase {
            Phase::Pre => self.run_pre(document),
            Phase::Post => {
                let Document { text, metadata } = document;
                let (metadata, applied) = self.run_post(artifact, metadata)?;
                Ok(PhaseOutcome {
                    document: Document::new(text, metadata),
                    applied,
                })
            }
        }
    }

    /// Thread `(text, metadata)` through every matching pre stage
    pub fn run_pre(&self, document: Document) -> Result<PhaseOutcome> {
        let Document {
            mut text,
            mut metadata,
        } = document;
        let mut applied = Vec::new();

        for plugin in &self.plugins {
            let Some(stage) = &plugin.pre else {
                continue;
            };

            let wanted = stage
                .applies(&text, &metadata)
                .map_err(|e| Error::from_plugin(&plugin.name, e))?;
            if !wanted {
                debug!(plugin = %plugin.name, "Skipping pre stage");
                continue;
            }

            info!(plugin = %plugin.name, "Running pre stage");
            (text, metadata) = stage
                .transform(text, metadata)
                .map_err(|e| Error::from_plugin(&plugin.name, e))?;
            applied.push(plugin.name.clone());
        }

        Ok(PhaseOutcome {
            document: Document::new(text, metadata),
            applied,
        })
    }

    /// Thread metadata through every matching post stage for `artifact`
    pub fn run_post(&self, artifact: &Path, metadata: Metadata) -> Result<(Metadata, Vec<String>)> {
        let mut metadata = metadata;
        let mut applied = Vec::new();

        for plugin in &self.plugins {
            let Some(stage) = &plugin.post else {
                continue;
            };

            let wanted = stage
                .applies(artifact, &metadata)
                .map_err(|e| Error::from_plugin(&plugin.name, e))?;
            if !wanted {
                debug!(plugin = %plugin.name, "Skipping post stage");
                continue;
            }

            info!(plugin = %plugin.name, artifact = %artifact.display(), "Running post stage");
            metadata = stage
                .transform(artifact, metadata)
                .map_err(|e| Error::from_plugin(&plugin.name, e))?;
            applied.push(plugin.name.clone());
        }

        Ok((metadata, applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildBlocked, Capabilities, PostStage, PreStage};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Appends its tag to the text when the text does not yet contain `skip_if`
    struct Tagger {
        tag: &'static str,
        skip_if: &'static str,
    }

    impl PreStage for Tagger {
        fn applies(&self, text: &str, _metadata: &Metadata) -> anyhow::Result<bool> {
            Ok(self.skip_if.is_empty() || !text.contains(self.skip_if))
        }

        fn transform(&self, text: String, mut metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
            metadata.insert(self.tag, true);
            Ok((format!("{}{}", text, self.tag), metadata))
        }
    }

    struct Failing;

    impl PreStage for Failing {
        fn applies(&self, _text: &str, _metadata: &Metadata) -> anyhow::Result<bool> {
            Ok(true)
        }

        fn transform(&self, _text: String, _metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
            Err(BuildBlocked::new("not in draft mode").into())
        }
    }

    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        name: &'static str,
    }

    impl PostStage for Recorder {
        fn applies(&self, _artifact: &Path, metadata: &Metadata) -> anyhow::Result<bool> {
            Ok(metadata.enabled(self.name))
        }

        fn transform(&self, artifact: &Path, mut metadata: Metadata) -> anyhow::Result<Metadata> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, artifact.display()));
            metadata.insert(self.name, "done");
            Ok(metadata)
        }
    }

    fn tagger(name: &str, tag: &'static str, skip_if: &'static str) -> PluginDescriptor {
        PluginDescriptor::new(name, name, Capabilities::pre(Tagger { tag, skip_if }))
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let mut metadata = Metadata::new();
        metadata.insert("title", "Example");
        let doc = Document::new("Body", metadata);

        let outcome = Pipeline::default().run(Phase::Pre, doc.clone(), Path::new("x.pdf")).unwrap();
        assert_eq!(outcome.document, doc);
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_pre_threads_in_order_and_skips() {
        let pipeline = Pipeline::new(vec![
            tagger("a", "A", ""),
            tagger("b", "B", "A"),
            tagger("c", "C", ""),
        ]);

        let outcome = pipeline.run_pre(Document::new(">", Metadata::new())).unwrap();
        assert_eq!(outcome.document.text, ">AC");
        assert_eq!(outcome.applied, vec!["a", "c"]);
        assert!(outcome.document.metadata.is_true("A"));
        assert!(!outcome.document.metadata.contains_key("B"));
    }

    #[test]
    fn test_post_skips_pre_only_plugins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            tagger("a", "A", ""),
            PluginDescriptor::new(
                "stamp",
                "50_stamp.toml",
                Capabilities::post(Recorder {
                    log: log.clone(),
                    name: "stamp",
                }),
            ),
        ]);

        let artifact = PathBuf::from("out.pdf");
        let outcome = pipeline
            .run(Phase::Post, Document::new("text", Metadata::new()), &artifact)
            .unwrap();

        assert_eq!(outcome.applied, vec!["stamp"]);
        assert_eq!(outcome.document.text, "text");
        assert_eq!(outcome.document.metadata.get_str("stamp"), Some("done"));
        assert_eq!(*log.lock().unwrap(), vec!["stamp:out.pdf"]);
    }

    #[test]
    fn test_failure_aborts_run() {
        let pipeline = Pipeline::new(vec![
            tagger("a", "A", ""),
            PluginDescriptor::new("bugs", "65_bugs.toml", Capabilities::pre(Failing)),
            tagger("c", "C", ""),
        ]);

        let err = pipeline.run_pre(Document::new("", Metadata::new())).unwrap_err();
        assert!(matches!(err, Error::BuildBlocked { ref plugin, .. } if plugin == "bugs"));
    }
}

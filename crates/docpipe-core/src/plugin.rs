//! Plugin protocol
//!
//! A plugin exposes any non-empty subset of two capabilities: a pre stage
//! (text + metadata) and a post stage (artifact + metadata). The executor
//! branches on which fields of [`PluginDescriptor`] are present.

use std::fmt;
use std::path::Path;

use crate::Metadata;

/// Pre-phase capability: runs before external rendering
pub trait PreStage: Send + Sync {
    /// Whether this plugin wants to run on the current document
    fn applies(&self, text: &str, metadata: &Metadata) -> anyhow::Result<bool>;

    /// Transform the document, returning the new text and metadata
    fn transform(&self, text: String, metadata: Metadata) -> anyhow::Result<(String, Metadata)>;
}

/// Post-phase capability: runs once the rendered artifact exists
pub trait PostStage: Send + Sync {
    /// Whether this plugin wants to run against the artifact
    fn applies(&self, artifact: &Path, metadata: &Metadata) -> anyhow::Result<bool>;

    /// Process the artifact. Any change to the file must be append-only.
    fn transform(&self, artifact: &Path, metadata: Metadata) -> anyhow::Result<Metadata>;
}

/// What a loaded plugin unit provides
#[derive(Default)]
pub struct Capabilities {
    pub pre: Option<Box<dyn PreStage>>,
    pub post: Option<Box<dyn PostStage>>,
}

impl Capabilities {
    pub fn pre(stage: impl PreStage + 'static) -> Self {
        Self {
            pre: Some(Box::new(stage)),
            post: None,
        }
    }

    pub fn post(stage: impl PostStage + 'static) -> Self {
        Self {
            pre: None,
            post: Some(Box::new(stage)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.post.is_none()
    }
}

/// A discovered plugin, ready for execution
pub struct PluginDescriptor {
    /// Name with the ordering prefix stripped
    pub name: String,
    /// Original file name, used only for ordering
    pub sort_key: String,
    pub pre: Option<Box<dyn PreStage>>,
    pub post: Option<Box<dyn PostStage>>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, sort_key: impl Into<String>, caps: Capabilities) -> Self {
        Self {
            name: name.into(),
            sort_key: sort_key.into(),
            pre: caps.pre,
            post: caps.post,
        }
    }

    /// Short capability summary, e.g. `pre+post`
    pub fn capability_label(&self) -> &'static str {
        match (self.pre.is_some(), self.post.is_some()) {
            (true, true) => "pre+post",
            (true, false) => "pre",
            (false, true) => "post",
            (false, false) => "none",
        }
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("sort_key", &self.sort_key)
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

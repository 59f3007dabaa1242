pub mod plugins;
pub mod provenance;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use docpipe_config::Config;
use docpipe_core::{Pipeline, PluginRegistry, SystemRunner};
use docpipe_plugins::BuiltinLoader;
use docpipe_provenance::ProvenanceFormat;
use docpipe_security::RedactionOptions;

/// Used when neither the command line nor the config names a plugin directory
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

pub fn plugin_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.plugin_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_DIR))
}

pub fn provenance_format(config: &Config) -> ProvenanceFormat {
    ProvenanceFormat {
        begin: config.provenance.begin.clone(),
        end: config.provenance.end.clone(),
        comment: config.provenance.comment.clone(),
    }
}

pub fn loader(config: &Config) -> BuiltinLoader {
    let redaction = RedactionOptions {
        marker: config.redaction.marker.clone(),
        region_open: config.redaction.region_open.clone(),
        region_close: config.redaction.region_close.clone(),
        ..Default::default()
    };
    BuiltinLoader::new(Arc::new(SystemRunner))
        .with_redaction(redaction)
        .with_provenance(provenance_format(config))
}

/// Discover plugins and build the pipeline
pub fn pipeline(dir: &Path, config: &Config) -> Result<Pipeline> {
    let plugins = PluginRegistry::discover(dir, &loader(config))?;
    Ok(Pipeline::new(plugins))
}

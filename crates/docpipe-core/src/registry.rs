//! Plugin discovery
//!
//! Plugins are loaded from a directory and run in asciibetical order of their
//! file names. A leading `<digits>_` prefix is an ordering knob only and is
//! stripped from the name the pipeline reports.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::plugin::{Capabilities, PluginDescriptor};
use crate::{Error, Result};

/// File extension of a plugin unit
pub const PLUGIN_EXTENSION: &str = "toml";

lazy_static! {
    static ref ENABLED: Regex = Regex::new(r"^[0-9a-zA-Z]").unwrap();
    static ref PREFIX: Regex = Regex::new(r"^[0-9]+_").unwrap();
}

/// An eligible plugin file, not yet loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUnit {
    /// File stem with the ordering prefix removed
    pub name: String,
    /// Raw file name
    pub sort_key: String,
    pub path: PathBuf,
}

/// Turns a plugin unit into its capabilities
pub trait PluginLoader {
    fn load(&self, unit: &PluginUnit) -> anyhow::Result<Capabilities>;
}

pub struct PluginRegistry;

impl PluginRegistry {
    /// Discover and load every plugin in `dir`, in execution order.
    ///
    /// Any unit that fails to load aborts discovery: running with only part
    /// of the plugin set would silently change what the pipeline does.
    pub fn discover(dir: &Path, loader: &dyn PluginLoader) -> Result<Vec<PluginDescriptor>> {
        let units = Self::scan(dir)?;
        let mut plugins = Vec::with_capacity(units.len());

        for unit in units {
            let caps = loader
                .load(&unit)
                .map_err(|e| Error::discovery(&unit.sort_key, format!("{:#}", e)))?;
            if caps.is_empty() {
                return Err(Error::discovery(
                    &unit.sort_key,
                    "plugin exposes neither a pre nor a post entry point",
                ));
            }
            debug!(plugin = %unit.name, file = %unit.sort_key, "Loaded plugin");
            plugins.push(PluginDescriptor::new(unit.name, unit.sort_key, caps));
        }

        Ok(plugins)
    }

    /// List eligible plugin units in `dir`, sorted by raw file name
    pub fn scan(dir: &Path) -> Result<Vec<PluginUnit>> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::discovery(
                dir.display().to_string(),
                format!("cannot read plugin directory: {}", e),
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            // Follows symlinks so shared units can be linked in
            if !entry.path().is_file() {
                continue;
            }
            let Some(fname) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if is_eligible(&fname) {
                files.push((fname, entry.path()));
            }
        }

        // Sort for determinism
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(files.len());
        for (fname, path) in files {
            let name = canonical_name(&fname).to_string();
            if !seen.insert(name.clone()) {
                return Err(Error::discovery(
                    &fname,
                    format!("another plugin is already named {}", name),
                ));
            }
            units.push(PluginUnit {
                name,
                sort_key: fname,
                path,
            });
        }

        Ok(units)
    }
}

/// Whether a directory entry is a plugin unit.
///
/// Hidden files, editor backups containing `#`, and names not starting with a
/// letter or digit are skipped.
pub fn is_eligible(fname: &str) -> bool {
    Path::new(fname)
        .extension()
        .is_some_and(|ext| ext == PLUGIN_EXTENSION)
        && !fname.starts_with('.')
        && !fname.contains('#')
        && ENABLED.is_match(fname)
}

/// File name without extension and without a leading `<digits>_`
pub fn canonical_name(fname: &str) -> &str {
    let stem = fname
        .strip_suffix(PLUGIN_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(fname);
    match PREFIX.find(stem) {
        Some(m) => &stem[m.end()..],
        None => stem,
    }
}

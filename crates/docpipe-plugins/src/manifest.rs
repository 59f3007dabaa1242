//! Plugin manifest (`<nn>_<name>.toml`)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parsed plugin unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    /// Built-in kind, or `exec` for an external command
    pub plugin: String,

    /// Kind-specific settings
    #[serde(default)]
    pub settings: toml::Table,

    /// Pre-phase command (exec plugins only)
    #[serde(default)]
    pub pre: Option<ExecEntry>,

    /// Post-phase command (exec plugins only)
    #[serde(default)]
    pub post: Option<ExecEntry>,
}

/// External command pair for one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecEntry {
    /// Predicate command; exit status 0 means "run". Absent means always.
    #[serde(default)]
    pub when: Option<Vec<String>>,

    /// Transform command
    pub run: Vec<String>,
}

impl PluginManifest {
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Deserialize the settings table into a kind-specific struct
    pub fn settings<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = toml::Value::Table(self.settings.clone());
        value
            .try_into()
            .map_err(|e| anyhow::anyhow!("Invalid settings for {}: {}", self.plugin, e))
    }

    /// Fail if the manifest carries settings this kind does not take
    pub fn expect_no_settings(&self) -> anyhow::Result<()> {
        if !self.settings.is_empty() {
            anyhow::bail!("Plugin kind {} takes no settings", self.plugin);
        }
        Ok(())
    }
}

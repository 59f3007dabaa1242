use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration for docpipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Plugin directory used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<PathBuf>,

    /// Extension of the rendered artifact, used to find it in the post phase
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub provenance: ProvenanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "default_marker")]
    pub marker: String,

    #[serde(default = "default_region_open")]
    pub region_open: String,

    #[serde(default = "default_region_close")]
    pub region_close: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    #[serde(default = "default_begin")]
    pub begin: String,

    #[serde(default = "default_end")]
    pub end: String,

    /// Prefix of every line inside the block
    #[serde(default = "default_comment")]
    pub comment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_dir: None,
            artifact_extension: default_artifact_extension(),
            redaction: RedactionConfig::default(),
            provenance: ProvenanceConfig::default(),
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            region_open: default_region_open(),
            region_close: default_region_close(),
        }
    }
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            begin: default_begin(),
            end: default_end(),
            comment: default_comment(),
        }
    }
}

fn default_artifact_extension() -> String {
    "pdf".to_string()
}

fn default_marker() -> String {
    r"\censor{XXXX}".to_string()
}

fn default_region_open() -> String {
    r"\begin{acronym}".to_string()
}

fn default_region_close() -> String {
    r"\end{acronym}".to_string()
}

fn default_begin() -> String {
    "%%% BEGIN BUILD PROVENANCE %%%".to_string()
}

fn default_end() -> String {
    "%%% END BUILD PROVENANCE %%%".to_string()
}

fn default_comment() -> String {
    "% ".to_string()
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)?;
            Ok(config)
        }
    }

    /// Load an explicit config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "docpipe", "docpipe") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.docpipe/config.toml")
        }
    }
}

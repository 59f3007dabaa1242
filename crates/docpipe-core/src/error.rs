use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load plugin {plugin}: {reason}")]
    Discovery { plugin: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Plugin {plugin} failed: {source:#}")]
    Plugin {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Plugin {plugin} stopped the build: {reason}")]
    BuildBlocked { plugin: String, reason: String },

    #[error("Invalid frontmatter: {0}")]
    Frontmatter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returned by a plugin to halt the build on purpose.
///
/// The executor recognises it inside the plugin's `anyhow::Error` and reports
/// `Error::BuildBlocked` instead of a runtime failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct BuildBlocked {
    pub reason: String,
}

impl BuildBlocked {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Error {
    pub fn discovery(plugin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Discovery {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a failure raised inside a plugin call
    pub fn from_plugin(plugin: &str, err: anyhow::Error) -> Self {
        match err.downcast::<BuildBlocked>() {
            Ok(blocked) => Error::BuildBlocked {
                plugin: plugin.to_string(),
                reason: blocked.reason,
            },
            Err(source) => Error::Plugin {
                plugin: plugin.to_string(),
                source,
            },
        }
    }
}

//! Built-in pipeline plugins and the manifest loader
//!
//! A plugin directory holds `<nn>_<name>.toml` manifests. Each names a
//! built-in kind (`plugin = "redact"`) or `exec` for an external command.

pub mod bugs;
pub mod build_strings;
pub mod clean_refs;
pub mod draft;
pub mod exec;
pub mod loader;
pub mod manifest;
pub mod redact;
pub mod svg_fix;

#[cfg(test)]
mod test_support;

pub use loader::{BuiltinLoader, KINDS};
pub use manifest::{ExecEntry, PluginManifest};

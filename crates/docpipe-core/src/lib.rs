//! Core of the docpipe document-build pipeline
//!
//! This crate contains:
//! - Document model (text + metadata, frontmatter split)
//! - Plugin protocol (pre/post stages) and plugin discovery
//! - Pipeline executor (one phase per run)
//! - External process capability used by plugins

pub mod document;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod phase;
pub mod plugin;
pub mod process;
pub mod registry;

pub use document::{BuildInputs, Document};
pub use error::{BuildBlocked, Error, Result};
pub use executor::{PhaseOutcome, Pipeline};
pub use metadata::Metadata;
pub use phase::Phase;
pub use plugin::{Capabilities, PluginDescriptor, PostStage, PreStage};
pub use process::{CommandOutput, CommandSpec, ProcessRunner, SystemRunner};
pub use registry::{PluginLoader, PluginRegistry, PluginUnit};

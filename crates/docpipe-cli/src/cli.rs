use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docpipe")]
#[command(about = "Plugin pipeline around a document renderer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log plugin decisions
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one pipeline phase over a document
    Run {
        /// Source document (optional YAML frontmatter)
        document: PathBuf,

        /// Where the renderer will write its output; pre phase writes the text here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Metadata override, repeatable
        #[arg(short = 'o', long = "option", num_args = 2, value_names = ["KEY", "VALUE"])]
        options: Vec<String>,

        /// pre or post (default: pre, or the value of `-o stage`)
        #[arg(long)]
        phase: Option<String>,

        /// Rendered artifact for the post phase
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// Directory of plugin manifests
        #[arg(long, env = "DOCPIPE_PLUGIN_DIR")]
        plugin_dir: Option<PathBuf>,
    },

    /// List discovered plugins in execution order
    Plugins {
        /// Directory of plugin manifests
        #[arg(long, env = "DOCPIPE_PLUGIN_DIR")]
        plugin_dir: Option<PathBuf>,
    },

    /// Print the provenance block of an artifact
    Provenance {
        artifact: PathBuf,

        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

use std::path::PathBuf;

use anyhow::Result;
use docpipe_config::Config;

pub fn handle(plugin_dir: Option<PathBuf>, config: &Config) -> Result<()> {
    let dir = super::plugin_dir(plugin_dir, config);
    let pipeline = super::pipeline(&dir, config)?;

    if pipeline.plugins().is_empty() {
        println!("No plugins found in {}.", dir.display());
        return Ok(());
    }

    println!("Plugins in {}:", dir.display());
    for plugin in pipeline.plugins() {
        println!("  {} ({})", plugin.name, plugin.capability_label());
        println!("    Unit: {}", plugin.sort_key);
    }

    Ok(())
}

use std::path::Path;

use anyhow::Result;
use docpipe_config::Config;
use docpipe_provenance::ProvenanceCodec;

pub fn handle(artifact: &Path, json: bool, config: &Config) -> Result<()> {
    let codec = ProvenanceCodec::new(super::provenance_format(config));
    let bytes = std::fs::read(artifact)?;

    let Some(fields) = codec.decode(&bytes)? else {
        println!("No provenance block in {}.", artifact.display());
        return Ok(());
    };

    let blocks = codec.count_blocks(&bytes);
    if blocks > 1 {
        eprintln!("  Note: {} blocks found, showing the newest", blocks);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else {
        print!("{}", serde_yaml::to_string(&fields)?);
    }

    Ok(())
}

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docpipe_config::Config;
use docpipe_core::{BuildInputs, Document, Phase};
use tracing::info;

/// Option key that selects the phase when `--phase` is absent
pub const STAGE_OPTION: &str = "stage";

pub struct RunArgs {
    pub document: PathBuf,
    pub output: Option<PathBuf>,
    pub options: Vec<String>,
    pub phase: Option<String>,
    pub artifact: Option<PathBuf>,
    pub plugin_dir: Option<PathBuf>,
}

pub fn handle(args: RunArgs, config: &Config) -> Result<()> {
    let options = pairs(&args.options)?;
    let phase = select_phase(args.phase.as_deref(), &options)?;

    let dir = super::plugin_dir(args.plugin_dir, config);
    let pipeline = super::pipeline(&dir, config)?;
    info!(
        phase = %phase,
        plugins = pipeline.plugins().len(),
        dir = %dir.display(),
        "Starting pipeline"
    );

    let inputs = BuildInputs {
        input: args.document.clone(),
        output: args.output.clone(),
        environment: std::env::vars().collect::<BTreeMap<_, _>>(),
        options,
    };
    let document = Document::load(&args.document)?.prepare(&inputs);

    match phase {
        Phase::Pre => {
            let outcome = pipeline.run(phase, document, Path::new(""))?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, &outcome.document.text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("✓ Wrote {}", path.display());
                    println!("  Applied: {}", applied(&outcome.applied));
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(outcome.document.text.as_bytes())?;
                    stdout.flush()?;
                }
            }
        }
        Phase::Post => {
            let artifact = args
                .artifact
                .unwrap_or_else(|| args.document.with_extension(&config.artifact_extension));
            if !artifact.is_file() {
                anyhow::bail!("Artifact not found: {}", artifact.display());
            }
            let outcome = pipeline.run(phase, document, &artifact)?;
            println!("✓ Post phase done: {}", artifact.display());
            println!("  Applied: {}", applied(&outcome.applied));
        }
    }

    Ok(())
}

/// Phase from `--phase`, else from `-o stage <phase>`, else pre
pub fn select_phase(flag: Option<&str>, options: &[(String, String)]) -> docpipe_core::Result<Phase> {
    let from_options = options
        .iter()
        .rev()
        .find(|(key, _)| key == STAGE_OPTION)
        .map(|(_, value)| value.as_str());
    match flag.or(from_options) {
        Some(value) => value.parse(),
        None => Ok(Phase::default()),
    }
}

fn pairs(flat: &[String]) -> Result<Vec<(String, String)>> {
    if flat.len() % 2 != 0 {
        return Err(docpipe_core::Error::Configuration(
            "Every -o option needs a KEY and a VALUE".to_string(),
        )
        .into());
    }
    Ok(flat
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

fn applied(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_phase_precedence() {
        assert_eq!(select_phase(None, &[]).unwrap(), Phase::Pre);
        assert_eq!(
            select_phase(None, &opts(&[("stage", "post")])).unwrap(),
            Phase::Post
        );
        assert_eq!(
            select_phase(Some("pre"), &opts(&[("stage", "post")])).unwrap(),
            Phase::Pre
        );
    }

    #[test]
    fn test_unknown_phase() {
        let err = select_phase(Some("mid"), &[]).unwrap_err();
        assert!(matches!(err, docpipe_core::Error::Configuration(_)));
    }

    #[test]
    fn test_pairs() {
        let flat = vec!["draft".to_string(), "true".to_string()];
        assert_eq!(pairs(&flat).unwrap(), opts(&[("draft", "true")]));
        assert!(pairs(&flat[..1]).is_err());
    }
}

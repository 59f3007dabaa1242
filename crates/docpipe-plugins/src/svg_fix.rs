//! Inkscape 1.x changed the command line options the LaTeX `svg` package uses
//! for svg -> pdf conversion. When Inkscape 1 is installed this plugin adds a
//! preamble snippet that switches the package to the new options.
//!
//! See https://github.com/mrpiggi/svg/issues/21 for the workaround.

use std::sync::Arc;

use docpipe_core::metadata::keys;
use docpipe_core::{CommandSpec, Metadata, PreStage, ProcessRunner};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const WORKAROUND: &str = r##"\usepackage{svg}
\makeatletter
\ifdefined\svg@ink@ver\else
  \def\svg@ink@ver{1}% change version to 0 if necessary
  \renewcommand*\svg@ink@cmd[2]{%
    \svg@ink@exe\space"#1.\svg@file@ext"\space%
    \svg@ink@area\space%
    \ifx\svg@ink@dpi\relax\else--export-dpi=\svg@ink@dpi\space\fi%
    \if@svg@ink@latex--export-latex\space\fi%
    \ifx\svg@ink@opt\@empty\else\svg@ink@opt\space\fi%
    \ifnum\svg@ink@ver<\@ne%
      --export-\svg@ink@format="#2.\svg@ink@format"\space%
    \else%
      --export-type=\svg@ink@format\space%
      --export-filename="#2.\svg@ink@format"\space%
    \fi%
  }%
\fi
\makeatother
"##;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgFixSettings {
    pub version_command: Vec<String>,
    pub version_prefix: String,
}

impl Default for SvgFixSettings {
    fn default() -> Self {
        Self {
            version_command: vec!["inkscape".to_string(), "--version".to_string()],
            version_prefix: "Inkscape 1".to_string(),
        }
    }
}

pub struct SvgFix {
    runner: Arc<dyn ProcessRunner>,
    settings: SvgFixSettings,
}

impl SvgFix {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: SvgFixSettings) -> Self {
        Self { runner, settings }
    }
}

impl PreStage for SvgFix {
    fn applies(&self, _text: &str, _metadata: &Metadata) -> anyhow::Result<bool> {
        let spec = CommandSpec::from_argv(&self.settings.version_command)?;
        match self.runner.output(&spec) {
            Ok(version) => Ok(version.starts_with(&self.settings.version_prefix)),
            Err(e) => {
                // Unknown version: stand pat
                debug!("Inkscape version probe failed: {:#}", e);
                Ok(false)
            }
        }
    }

    fn transform(&self, text: String, mut metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        append_preamble(&mut metadata, WORKAROUND);
        Ok((text, metadata))
    }
}

/// Add a snippet to `preambles`, promoting a scalar value to a list
pub fn append_preamble(metadata: &mut Metadata, snippet: &str) {
    let snippet = Value::String(snippet.to_string());
    match metadata.get_mut(keys::PREAMBLES) {
        Some(Value::Array(list)) => list.push(snippet),
        Some(other) => {
            let previous = other.take();
            *other = Value::Array(vec![previous, snippet]);
        }
        None => {
            metadata.insert(keys::PREAMBLES, Value::Array(vec![snippet]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;
    use serde_json::json;

    fn fix(runner: ScriptedRunner) -> SvgFix {
        SvgFix::new(Arc::new(runner), SvgFixSettings::default())
    }

    #[test]
    fn test_applies_for_inkscape_one() {
        let plugin = fix(ScriptedRunner::new().reply("inkscape --version", "Inkscape 1.2.2 (b0a8486541, 2022-12-01)\n"));
        assert!(plugin.applies("", &Metadata::new()).unwrap());
    }

    #[test]
    fn test_skips_for_old_or_missing_inkscape() {
        let old = fix(ScriptedRunner::new().reply("inkscape --version", "Inkscape 0.92.4\n"));
        assert!(!old.applies("", &Metadata::new()).unwrap());

        let failing = fix(ScriptedRunner::new().fail("inkscape --version"));
        assert!(!failing.applies("", &Metadata::new()).unwrap());

        let missing = fix(ScriptedRunner::new());
        assert!(!missing.applies("", &Metadata::new()).unwrap());
    }

    #[test]
    fn test_append_preamble_shapes() {
        let mut meta = Metadata::new();
        append_preamble(&mut meta, "a");
        assert_eq!(meta.get(keys::PREAMBLES), Some(&json!(["a"])));
        append_preamble(&mut meta, "b");
        assert_eq!(meta.get(keys::PREAMBLES), Some(&json!(["a", "b"])));

        let mut scalar = Metadata::new();
        scalar.insert(keys::PREAMBLES, "\\usepackage{x}");
        append_preamble(&mut scalar, "c");
        assert_eq!(scalar.get(keys::PREAMBLES), Some(&json!(["\\usepackage{x}", "c"])));
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docpipe_core::{
    BuildInputs, CommandOutput, CommandSpec, Document, Error, Phase, Pipeline, PluginRegistry,
    ProcessRunner,
};
use docpipe_plugins::BuiltinLoader;
use docpipe_provenance::ProvenanceCodec;

/// Fails every command, as on a machine without inkscape or git
struct NoTools;

impl ProcessRunner for NoTools {
    fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        anyhow::bail!("Command not found: {}", spec.program)
    }
}

fn plugin_dir(dir: &Path, units: &[(&str, &str)]) -> PathBuf {
    let plugins = dir.join("plugins");
    std::fs::create_dir(&plugins).unwrap();
    for (name, body) in units {
        std::fs::write(plugins.join(name), body).unwrap();
    }
    plugins
}

fn standard_plugins(dir: &Path) -> PathBuf {
    plugin_dir(
        dir,
        &[
            ("15_draft.toml", "plugin = \"draft\"\n"),
            ("15_svg_fix.toml", "plugin = \"svg_fix\"\n"),
            ("50_build_strings.toml", "plugin = \"build_strings\"\n"),
            ("60_clean_refs.toml", "plugin = \"clean_refs\"\n"),
            ("60_redact.toml", "plugin = \"redact\"\n"),
            ("65_bugs.toml", "plugin = \"bugs\"\n"),
            ("_disabled.toml", "plugin = \"nope\"\n"),
        ],
    )
}

fn pipeline(plugins: &Path) -> Pipeline {
    let loader = BuiltinLoader::new(Arc::new(NoTools));
    Pipeline::new(PluginRegistry::discover(plugins, &loader).unwrap())
}

fn inputs(input: &Path, output: &str) -> BuildInputs {
    BuildInputs {
        input: input.to_path_buf(),
        output: Some(PathBuf::from(output)),
        ..Default::default()
    }
}

#[test]
fn test_discovers_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&standard_plugins(dir.path()));
    let names: Vec<_> = pipeline.plugins().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        ["draft", "svg_fix", "build_strings", "clean_refs", "redact", "bugs"]
    );
}

#[test]
fn test_redacted_draft_build() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&standard_plugins(dir.path()));

    let source = dir.path().join("report.md");
    std::fs::write(
        &source,
        "---\nredacted: [Alice, met, Bob]\nremove-refs: true\n---\nSecret: Alice met Bob (ref:1f).\nOdd.footnote{x}\n",
    )
    .unwrap();

    let document = Document::load(&source)
        .unwrap()
        .prepare(&inputs(&source, "report-draft-redacted.tex"));
    let outcome = pipeline.run_pre(document).unwrap();

    assert_eq!(
        outcome.document.text,
        "Secret: \\censor{XXXX} .\nOdd.footnote{x}\n"
    );
    assert!(outcome.document.metadata.is_true("draft"));
    assert!(outcome.document.metadata.get("bugs").unwrap()["footnote"].is_array());
    assert_eq!(outcome.applied, ["draft", "clean_refs", "redact", "bugs"]);
}

#[test]
fn test_final_build_blocked_by_bugs() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&standard_plugins(dir.path()));

    let source = dir.path().join("report.md");
    std::fs::write(&source, "Odd.footnote{x}\n").unwrap();
    let document = Document::load(&source)
        .unwrap()
        .prepare(&inputs(&source, "report.tex"));

    match pipeline.run(Phase::Pre, document, Path::new("")) {
        Err(Error::BuildBlocked { plugin, .. }) => assert_eq!(plugin, "bugs"),
        other => panic!("expected a blocked build, got {:?}", other.map(|o| o.applied)),
    }
}

#[test]
fn test_post_phase_stamps_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&standard_plugins(dir.path()));

    let source = dir.path().join("report.md");
    std::fs::write(&source, "---\ntitle: Quarterly\n---\nBody\n").unwrap();
    let artifact = dir.path().join("report.pdf");
    std::fs::write(&artifact, b"%PDF-1.5\n%%EOF\n").unwrap();

    let document = Document::load(&source)
        .unwrap()
        .prepare(&inputs(&source, "report.tex"));
    let outcome = pipeline.run(Phase::Post, document, &artifact).unwrap();
    assert_eq!(outcome.applied, ["build_strings"]);

    let stamp = ProvenanceCodec::default()
        .extract(&artifact)
        .unwrap()
        .unwrap();
    assert_eq!(stamp["title"], "Quarterly");
    assert_eq!(stamp["draft"], false);
    // No git in this environment
    assert!(!stamp.contains_key("git_commit"));
}

#[test]
fn test_bad_manifest_fails_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = plugin_dir(dir.path(), &[("10_broken.toml", "plugin = \"teleport\"\n")]);
    let loader = BuiltinLoader::new(Arc::new(NoTools));
    let err = PluginRegistry::discover(&plugins, &loader).unwrap_err();
    assert!(matches!(err, Error::Discovery { .. }));
}

use docpipe_core::metadata::keys;
use docpipe_core::{Metadata, PreStage};

/// Turns on draft mode when the output file name mentions `draft`
pub struct DraftMode;

impl PreStage for DraftMode {
    fn applies(&self, _text: &str, metadata: &Metadata) -> anyhow::Result<bool> {
        Ok(metadata.str_contains(keys::OUTPUT_FILENAME, "draft"))
    }

    fn transform(&self, text: String, mut metadata: Metadata) -> anyhow::Result<(String, Metadata)> {
        metadata.insert(keys::DRAFT, true);
        Ok((text, metadata))
    }
}

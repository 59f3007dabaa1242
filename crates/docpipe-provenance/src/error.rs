//! Error types for docpipe-provenance

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvenanceError>;

#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Provenance block is not valid UTF-8")]
    Encoding,

    #[error("Provenance line {line} is missing the comment prefix")]
    MalformedLine { line: usize },
}

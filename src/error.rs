use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KgError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid CURIE: {0}")]
    InvalidCurie(String),

    #[error("node normalization request failed: {0}")]
    NodeNormHttp(String),

    #[error("node normalization service returned status {status}: {message}")]
    NodeNormStatus { status: u16, message: String },

    #[error("malformed node normalization response: {0}")]
    NodeNormResponse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read graph file: {0}")]
    GraphRead(String),

    #[error("invalid graph record on line {line}: {message}")]
    GraphParse { line: usize, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KgError {
    /// True for failures of the external resolution service as a whole.
    pub fn is_resolution_service_error(&self) -> bool {
        matches!(
            self,
            KgError::NodeNormHttp(_)
                | KgError::NodeNormStatus { .. }
                | KgError::NodeNormResponse(_)
        )
    }
}

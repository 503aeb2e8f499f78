/// Crate-level error type shared by the pipeline components.
use thiserror::Error;

use crate::embedder::EmbedderError;

/// Errors surfaced by the retrieval and generation pipeline.
///
/// Component failures propagate unchanged to the caller; the orchestrator
/// never substitutes partial results for a failed stage.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

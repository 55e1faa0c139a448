use definitions::{ConfigError, EngineError};
use thiserror::Error;

/// Everything that can stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Raised before anything is written.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The engine failed (or returned garbage) at the 1-based `replicate`.
    /// What was written before stays on the sink.
    #[error("replicate {replicate} failed: {source}")]
    Engine {
        replicate: usize,
        source: EngineError,
    },
    #[error("failed to write the output: {0}")]
    Sink(#[from] std::io::Error),
}

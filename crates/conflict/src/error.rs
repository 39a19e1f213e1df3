//! Error type shared by the quantizer, the similarity kernel and the batch engine.

use thiserror::Error;

/// Errors returned by the conflict detection core.
///
/// Every variant is a contract violation detected synchronously at the point
/// of the call. Degenerate (all-zero) vectors are not errors; they score `0.0`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConflictError {
    #[error("vector length mismatch: left has {left} components, right has {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("embedding {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("batch has {embeddings} embeddings but {sources} source labels")]
    SourceCountMismatch { embeddings: usize, sources: usize },

    #[error("dimension {dimension} exceeds the 32-bit accumulator limit of {max}")]
    DimensionTooLarge { dimension: usize, max: usize },

    #[error("invalid config: {name} must be finite and in (0, 1] (got {value})")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}

//! Workspace umbrella crate for Horaculo semantic conflict detection.
//!
//! This crate re-exports the conflict engine and adds the JSON batch boundary
//! used by the `horaculo` binary: a [`BatchRequest`] of labelled embeddings
//! goes in, a [`BatchReport`] with one verdict per analyzed item comes out.

pub mod config;

pub use conflict::{
    CONFLICT_EXPLANATION, ConflictEngine, ConflictError, ConflictMetrics,
    DEFAULT_COPY_THRESHOLD, DEFAULT_DEDUPE_THRESHOLD, EngineConfig, Kernel, KernelBackend,
    MAX_DIMENSION, NO_CONFLICT_EXPLANATION, QuantizedVector, SourceLabel, Verdict,
    cosine_similarity, dot_product, l2_norm, most_central, quantize,
};
pub use config::{ConfigLoadError, HoraculoConfig, LoggingYamlConfig};

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the batch boundary.
#[derive(Debug, Error)]
pub enum HoraculoError {
    #[error("conflict analysis failed: {0}")]
    Conflict(#[from] ConflictError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed batch JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One labelled embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchItem {
    pub source: SourceLabel,
    pub embedding: Vec<f32>,
}

impl BatchItem {
    pub fn new(source: impl Into<SourceLabel>, embedding: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            embedding,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
}

impl BatchRequest {
    pub fn from_json(json: &str) -> Result<Self, HoraculoError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HoraculoError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of [`run_batch`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    /// Kernel backend that produced the similarities.
    pub kernel: String,
    /// Copy threshold the verdicts were classified with.
    pub threshold: f32,
    /// Request indices that were analyzed, ascending.
    pub kept: Vec<usize>,
    /// One verdict per entry of `kept`, in the same order.
    pub verdicts: Vec<Verdict>,
    /// Position in `verdicts` of the item with the highest centrality.
    pub most_central: Option<usize>,
    /// Score entropy of the most central verdict, `0.0` without one.
    pub entropy: f32,
}

impl BatchReport {
    pub fn conflicts(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_conflict).count()
    }
}

/// Analyze a request with `engine`.
///
/// With `dedupe` set, near-duplicates (at the engine's `dedupe_threshold`) are
/// dropped first and only the survivors are compared.
pub fn run_batch(
    engine: &ConflictEngine,
    request: &BatchRequest,
    dedupe: bool,
) -> Result<BatchReport, HoraculoError> {
    let kept: Vec<usize> = if dedupe {
        let embeddings: Vec<&[f32]> = request
            .items
            .iter()
            .map(|item| item.embedding.as_slice())
            .collect();
        engine.dedupe(&embeddings)?
    } else {
        (0..request.items.len()).collect()
    };
    debug!(
        requested = request.items.len(),
        kept = kept.len(),
        "run_batch_selection"
    );

    let embeddings: Vec<&[f32]> = kept
        .iter()
        .map(|&i| request.items[i].embedding.as_slice())
        .collect();
    let sources: Vec<&str> = kept
        .iter()
        .map(|&i| request.items[i].source.as_str())
        .collect();

    let verdicts = engine.analyze_batch(&embeddings, &sources)?;
    let most_central = most_central(&verdicts);
    let entropy = most_central.map_or(0.0, |idx| verdicts[idx].score_entropy());

    Ok(BatchReport {
        kernel: engine.kernel().name().to_string(),
        threshold: engine.copy_threshold(),
        kept,
        verdicts,
        most_central,
        entropy,
    })
}

//! # Horaculo Conflict Detection
//!
//! This crate detects semantic overlap ("conflict") among a batch of content
//! items represented as dense embeddings from multiple named sources. For
//! each item it produces a [`Verdict`]: whether it overlaps with another item
//! at or above a configured threshold, how strong the strongest overlap is,
//! and a per-source similarity breakdown.
//!
//! ## Contract
//!
//! - The engine is a pure function of `(embeddings, sources, config)`: no I/O,
//!   no clocks in the result, no state carried between calls.
//! - Inputs are never mutated. Verdicts come back in input order.
//! - Contract violations (mismatched lengths or counts) fail the call with a
//!   [`ConflictError`]; nothing is truncated or padded.
//!
//! ## Core Pipeline
//!
//! 1.  **Quantization**: every embedding is clamped into `[-1, 1]`, scaled by
//!     127 and rounded to `i8`, once per batch.
//! 2.  **Similarity kernel**: cosine similarity over the quantized vectors,
//!     computed with an `i32` dot product that runs on AVX2 or NEON when the
//!     CPU supports it and on a portable chunked loop otherwise. All paths are
//!     bit-identical.
//! 3.  **Classification**: every item is compared with every other item;
//!     similarities at or above `copy_threshold` mark the item as conflicting
//!     and raise its intensity. The per-item loop optionally runs on rayon.
//!
//! ## Example Usage
//!
//! ```
//! use conflict::{ConflictEngine, EngineConfig};
//!
//! let engine = ConflictEngine::new(EngineConfig::default()).unwrap();
//! let embeddings = vec![vec![1.0_f32, 0.0, 0.0], vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
//! let sources = ["wire-a", "wire-b", "blog"];
//!
//! let verdicts = engine.analyze_batch(&embeddings, &sources).unwrap();
//!
//! assert!(verdicts[0].is_conflict);
//! assert_eq!(verdicts[0].winner_source, "wire-a");
//! assert!(!verdicts[2].is_conflict);
//! ```

pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod metrics;
pub mod quantize;
pub mod types;

pub use crate::config::{EngineConfig, DEFAULT_COPY_THRESHOLD, DEFAULT_DEDUPE_THRESHOLD};
pub use crate::engine::ConflictEngine;
pub use crate::error::ConflictError;
pub use crate::kernel::{
    cosine_similarity, dot_product, l2_norm, Kernel, KernelBackend, MAX_DIMENSION,
};
pub use crate::metrics::ConflictMetrics;
pub use crate::quantize::{quantize, quantize_batch, quantize_value, QuantizedVector, QUANT_SCALE};
pub use crate::types::{
    most_central, SourceLabel, Verdict, CONFLICT_EXPLANATION, NO_CONFLICT_EXPLANATION,
};

/// Current conflict algorithm version for this crate.
pub const CONFLICT_VERSION: u16 = 1;

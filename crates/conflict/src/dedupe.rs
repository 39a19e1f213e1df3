//! Greedy near-duplicate filtering over quantized embeddings.
//!
//! Items are visited in input order. An item is kept only if its similarity
//! to every previously kept item stays below the threshold, so the first
//! member of each near-duplicate group survives.

use tracing::debug;

use crate::error::ConflictError;
use crate::kernel::Kernel;
use crate::quantize::QuantizedVector;

/// Indices of the items kept by a greedy pass at `threshold`.
///
/// All vectors must share one length; a mismatch against any kept vector
/// fails with [`ConflictError::LengthMismatch`], and a length past
/// [`crate::MAX_DIMENSION`] with [`ConflictError::DimensionTooLarge`].
pub fn dedupe_quantized(
    kernel: &Kernel,
    vectors: &[QuantizedVector],
    threshold: f32,
) -> Result<Vec<usize>, ConflictError> {
    let mut kept: Vec<usize> = Vec::new();
    let mut kept_norms: Vec<f32> = Vec::new();

    for (idx, candidate) in vectors.iter().enumerate() {
        let norm = kernel.l2_norm(candidate)?;
        let mut duplicate = false;
        for (&k, &k_norm) in kept.iter().zip(kept_norms.iter()) {
            let sim = kernel.cosine_with_norms(candidate, &vectors[k], norm, k_norm)?;
            if sim >= threshold {
                duplicate = true;
                break;
            }
        }
        if !duplicate {
            kept.push(idx);
            kept_norms.push(norm);
        }
    }

    debug!(
        items = vectors.len(),
        kept = kept.len(),
        threshold,
        "dedupe_complete"
    );
    Ok(kept)
}

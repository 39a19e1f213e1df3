//! Fixed-point quantization of `f32` embeddings into `i8` vectors.
//!
//! Each component is clamped into `[-1.0, 1.0]` before scaling by
//! [`QUANT_SCALE`], so un-normalized inputs saturate at `±127` instead of
//! wrapping. Rounding is half away from zero. NaN components map to `0`.

use rayon::prelude::*;

/// Quantized embedding: one signed 8-bit value per dimension.
pub type QuantizedVector = Vec<i8>;

/// Scale applied after clamping; the output range is `[-127, 127]`.
pub const QUANT_SCALE: f32 = 127.0;

/// Quantize a single embedding component.
#[inline]
pub fn quantize_value(x: f32) -> i8 {
    if x.is_nan() {
        return 0;
    }
    (x.clamp(-1.0, 1.0) * QUANT_SCALE).round() as i8
}

/// Quantize an embedding into a vector of the same length.
pub fn quantize(embedding: &[f32]) -> QuantizedVector {
    let mut out = Vec::with_capacity(embedding.len());
    out.extend(embedding.iter().map(|&v| quantize_value(v)));
    out
}

/// Quantize every embedding of a batch once, preserving order.
pub fn quantize_batch<E>(embeddings: &[E], parallel: bool) -> Vec<QuantizedVector>
where
    E: AsRef<[f32]> + Sync,
{
    if parallel {
        embeddings
            .par_iter()
            .map(|e| quantize(e.as_ref()))
            .collect()
    } else {
        embeddings.iter().map(|e| quantize(e.as_ref())).collect()
    }
}

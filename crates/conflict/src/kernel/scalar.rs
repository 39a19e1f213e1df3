//! Portable kernel path.
//!
//! Works in fixed 32-element chunks so the compiler can auto-vectorize the
//! inner loop; the result is the plain elementwise sum.

use super::ChunkedDot;

/// Chunk width of the portable path.
pub const SCALAR_CHUNK: usize = 32;

/// Portable implementation of [`ChunkedDot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl ChunkedDot for Scalar {
    const LANES: usize = SCALAR_CHUNK;

    #[inline]
    fn dot_chunks(&self, a: &[i8], b: &[i8]) -> i32 {
        a.chunks_exact(SCALAR_CHUNK)
            .zip(b.chunks_exact(SCALAR_CHUNK))
            .map(|(ca, cb)| dot(ca, cb))
            .fold(0i32, i32::wrapping_add)
    }
}

/// Elementwise reference dot product with a 32-bit accumulator.
#[inline(always)]
pub fn dot(a: &[i8], b: &[i8]) -> i32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as i32) * (y as i32))
        .fold(0i32, i32::wrapping_add)
}

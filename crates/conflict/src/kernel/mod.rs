//! Vectorized similarity kernel over quantized vectors.
//!
//! The dot product is split into whole chunks handled by a [`ChunkedDot`]
//! implementation plus a scalar tail. Three implementations exist: the
//! portable [`Scalar`] path, AVX2 on `x86_64` and NEON on `aarch64`. The
//! vectorized paths are selected at runtime and are bit-identical to the
//! elementwise reference sum, so switching backends never changes a score.
//!
//! All accumulation happens in `i32`. With `|x| <= 128` per component this is
//! exact up to [`MAX_DIMENSION`] components; longer inputs are rejected with
//! [`ConflictError::DimensionTooLarge`].

#[cfg(target_arch = "aarch64")]
mod aarch64;
pub mod scalar;
#[cfg(target_arch = "x86_64")]
mod x86;

use serde::{Deserialize, Serialize};

use crate::error::ConflictError;

#[cfg(target_arch = "aarch64")]
pub use aarch64::Neon;
pub use scalar::Scalar;
#[cfg(target_arch = "x86_64")]
pub use x86::Avx2;

/// Largest dimensionality whose sum of squares fits the `i32` accumulator.
pub const MAX_DIMENSION: usize = (i32::MAX as usize) / (128 * 128);

/// Fixed-width chunk processor for the integer dot product.
pub trait ChunkedDot {
    /// Elements consumed per chunk.
    const LANES: usize;

    /// Sum of products over `a.len() / LANES` whole chunks.
    ///
    /// Callers pass equal-length slices whose length is a multiple of `LANES`.
    fn dot_chunks(&self, a: &[i8], b: &[i8]) -> i32;
}

/// Dot product using `imp` for whole chunks and a scalar loop for the rest.
#[inline]
pub fn chunked_dot<K: ChunkedDot>(imp: &K, a: &[i8], b: &[i8]) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    let split = a.len() - a.len() % K::LANES;
    let (head_a, tail_a) = a.split_at(split);
    let (head_b, tail_b) = b.split_at(split);
    imp.dot_chunks(head_a, head_b)
        .wrapping_add(scalar::dot(tail_a, tail_b))
}

/// Backend preference for the kernel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KernelBackend {
    /// Use the widest vector unit detected at runtime.
    #[default]
    Auto,
    /// Always use the portable path.
    Scalar,
}

#[derive(Debug, Clone, Copy)]
enum Dispatch {
    Scalar(Scalar),
    #[cfg(target_arch = "x86_64")]
    Avx2(Avx2),
    #[cfg(target_arch = "aarch64")]
    Neon(Neon),
}

/// Resolved similarity kernel.
///
/// Resolution happens once at construction; every call afterwards is
/// allocation-free.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    dispatch: Dispatch,
}

impl Kernel {
    pub fn new(backend: KernelBackend) -> Self {
        match backend {
            KernelBackend::Auto => Self::detect(),
            KernelBackend::Scalar => Self::scalar(),
        }
    }

    /// Portable kernel, available on every target.
    pub fn scalar() -> Self {
        Self {
            dispatch: Dispatch::Scalar(Scalar),
        }
    }

    /// Widest kernel supported by the running CPU.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if let Some(avx2) = Avx2::detect() {
                return Self {
                    dispatch: Dispatch::Avx2(avx2),
                };
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if let Some(neon) = Neon::detect() {
                return Self {
                    dispatch: Dispatch::Neon(neon),
                };
            }
        }
        Self::scalar()
    }

    /// Short identifier of the active path: `"avx2"`, `"neon"` or `"scalar"`.
    pub fn name(&self) -> &'static str {
        match self.dispatch {
            Dispatch::Scalar(_) => "scalar",
            #[cfg(target_arch = "x86_64")]
            Dispatch::Avx2(_) => "avx2",
            #[cfg(target_arch = "aarch64")]
            Dispatch::Neon(_) => "neon",
        }
    }

    pub fn is_vectorized(&self) -> bool {
        !matches!(self.dispatch, Dispatch::Scalar(_))
    }

    /// Integer dot product.
    ///
    /// Fails on mismatched lengths and on lengths past [`MAX_DIMENSION`].
    #[inline]
    pub fn dot(&self, a: &[i8], b: &[i8]) -> Result<i32, ConflictError> {
        if a.len() != b.len() {
            return Err(ConflictError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        check_dimension(a.len())?;
        Ok(self.dot_unchecked(a, b))
    }

    #[inline]
    fn dot_unchecked(&self, a: &[i8], b: &[i8]) -> i32 {
        match &self.dispatch {
            Dispatch::Scalar(imp) => chunked_dot(imp, a, b),
            #[cfg(target_arch = "x86_64")]
            Dispatch::Avx2(imp) => chunked_dot(imp, a, b),
            #[cfg(target_arch = "aarch64")]
            Dispatch::Neon(imp) => chunked_dot(imp, a, b),
        }
    }

    /// Euclidean norm of a quantized vector. Fails past [`MAX_DIMENSION`].
    #[inline]
    pub fn l2_norm(&self, v: &[i8]) -> Result<f32, ConflictError> {
        check_dimension(v.len())?;
        Ok((self.dot_unchecked(v, v) as f32).sqrt())
    }

    /// `dot(a, b) / (|a| * |b|)`, or `0.0` when either norm is zero.
    #[inline]
    pub fn cosine_similarity(&self, a: &[i8], b: &[i8]) -> Result<f32, ConflictError> {
        let dot = self.dot(a, b)?;
        Ok(Self::normalize(dot, self.l2_norm(a)?, self.l2_norm(b)?))
    }

    /// Cosine similarity with norms computed ahead of time by [`Kernel::l2_norm`].
    ///
    /// Produces exactly the value [`Kernel::cosine_similarity`] would.
    #[inline]
    pub fn cosine_with_norms(
        &self,
        a: &[i8],
        b: &[i8],
        norm_a: f32,
        norm_b: f32,
    ) -> Result<f32, ConflictError> {
        let dot = self.dot(a, b)?;
        Ok(Self::normalize(dot, norm_a, norm_b))
    }

    #[inline(always)]
    fn normalize(dot: i32, norm_a: f32, norm_b: f32) -> f32 {
        let denom = norm_a * norm_b;
        if denom == 0.0 {
            return 0.0;
        }
        dot as f32 / denom
    }
}

/// Lengths past [`MAX_DIMENSION`] would wrap the `i32` accumulator.
#[inline]
fn check_dimension(len: usize) -> Result<(), ConflictError> {
    if len > MAX_DIMENSION {
        return Err(ConflictError::DimensionTooLarge {
            dimension: len,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

impl Default for Kernel {
    fn default() -> Self {
        Self::detect()
    }
}

/// Dot product on the detected kernel.
pub fn dot_product(a: &[i8], b: &[i8]) -> Result<i32, ConflictError> {
    Kernel::detect().dot(a, b)
}

/// L2 norm on the detected kernel.
pub fn l2_norm(v: &[i8]) -> Result<f32, ConflictError> {
    Kernel::detect().l2_norm(v)
}

/// Cosine similarity on the detected kernel.
pub fn cosine_similarity(a: &[i8], b: &[i8]) -> Result<f32, ConflictError> {
    Kernel::detect().cosine_similarity(a, b)
}

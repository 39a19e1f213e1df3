//! AVX2 kernel path for `x86_64`.

use std::arch::x86_64::*;

use super::ChunkedDot;

/// Proof that the running CPU supports AVX2.
///
/// Only [`Avx2::detect`] constructs this token, which is what makes the
/// `unsafe` call inside [`ChunkedDot::dot_chunks`] sound.
#[derive(Debug, Clone, Copy)]
pub struct Avx2 {
    _detected: (),
}

impl Avx2 {
    pub fn detect() -> Option<Self> {
        if std::is_x86_feature_detected!("avx2") {
            Some(Self { _detected: () })
        } else {
            None
        }
    }
}

impl ChunkedDot for Avx2 {
    const LANES: usize = 32;

    #[inline]
    fn dot_chunks(&self, a: &[i8], b: &[i8]) -> i32 {
        // SAFETY: the token exists only after AVX2 was detected at runtime.
        unsafe { dot_chunks_avx2(a, b) }
    }
}

/// Sum of products over whole 32-byte chunks.
///
/// Each half of a chunk is sign-extended to sixteen `i16` lanes and fed to
/// `vpmaddwd`, which multiplies and adds adjacent pairs into `i32` lanes.
/// Every pair sum is at most `2 * 128 * 128`, so nothing saturates and the
/// result equals the elementwise sum exactly.
#[target_feature(enable = "avx2")]
unsafe fn dot_chunks_avx2(a: &[i8], b: &[i8]) -> i32 {
    debug_assert_eq!(a.len(), b.len());

    let mut acc = _mm256_setzero_si256();
    for (ca, cb) in a.chunks_exact(32).zip(b.chunks_exact(32)) {
        let va = _mm256_loadu_si256(ca.as_ptr() as *const __m256i);
        let vb = _mm256_loadu_si256(cb.as_ptr() as *const __m256i);

        let a_lo = _mm256_cvtepi8_epi16(_mm256_castsi256_si128(va));
        let a_hi = _mm256_cvtepi8_epi16(_mm256_extracti128_si256(va, 1));
        let b_lo = _mm256_cvtepi8_epi16(_mm256_castsi256_si128(vb));
        let b_hi = _mm256_cvtepi8_epi16(_mm256_extracti128_si256(vb, 1));

        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(a_lo, b_lo));
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(a_hi, b_hi));
    }

    let mut lanes = [0i32; 8];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc);
    lanes.iter().fold(0i32, |sum, &lane| sum.wrapping_add(lane))
}

//! NEON kernel path for `aarch64`.

use std::arch::aarch64::*;

use super::ChunkedDot;

/// Proof that the running CPU supports NEON.
#[derive(Debug, Clone, Copy)]
pub struct Neon {
    _detected: (),
}

impl Neon {
    pub fn detect() -> Option<Self> {
        if std::arch::is_aarch64_feature_detected!("neon") {
            Some(Self { _detected: () })
        } else {
            None
        }
    }
}

impl ChunkedDot for Neon {
    const LANES: usize = 16;

    #[inline]
    fn dot_chunks(&self, a: &[i8], b: &[i8]) -> i32 {
        // SAFETY: the token exists only after NEON was detected at runtime.
        unsafe { dot_chunks_neon(a, b) }
    }
}

/// Widening `i8 x i8 -> i16` multiplies, pairwise-accumulated into `i32` lanes.
#[target_feature(enable = "neon")]
unsafe fn dot_chunks_neon(a: &[i8], b: &[i8]) -> i32 {
    debug_assert_eq!(a.len(), b.len());

    let mut acc = vdupq_n_s32(0);
    for (ca, cb) in a.chunks_exact(16).zip(b.chunks_exact(16)) {
        let va = vld1q_s8(ca.as_ptr());
        let vb = vld1q_s8(cb.as_ptr());
        acc = vpadalq_s16(acc, vmull_s8(vget_low_s8(va), vget_low_s8(vb)));
        acc = vpadalq_s16(acc, vmull_high_s8(va, vb));
    }
    vaddvq_s32(acc)
}

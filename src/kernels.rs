// SPDX-License-Identifier: Apache-2.0

//! Dot product kernels
//!
//! One float32 dot product per vector tier plus a portable scalar fallback. Every
//! variant accumulates with compensated (Kahan) summation:
//!
//! ```text
//! y = a[i] * b[i] - c
//! t = sum + y
//! c = (t - sum) - y
//! sum = t
//! ```
//!
//! Vector kernels run the recurrence lane-wise on a vector accumulator and a vector
//! compensation term, add the lanes of each together in lane order, then fold the tail
//! with the scalar recurrence starting from those two reduced values.
//!
//! Each SIMD kernel is compiled with `#[target_feature]` for its own tier only, so
//! several tiers can live in one binary. Calling one on a processor without that tier
//! is undefined behavior; [`crate::dispatch`] is responsible for never doing so.

// Some clippy lints are noisy for low-level SIMD code; we opt out at the module level.
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::missing_safety_doc)]

// =============================================================================
// X86/X86_64 SIMD IMPORTS
// =============================================================================

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use super::constants::{LANES_AVX512_F32, LANES_AVX_F32};

#[cfg(target_arch = "x86")]
use std::arch::x86::{
    _mm256_add_ps, _mm256_loadu_ps, _mm256_mul_ps, _mm256_setzero_ps, _mm256_storeu_ps,
    _mm256_sub_ps, _mm512_add_ps, _mm512_fmsub_ps, _mm512_loadu_ps, _mm512_setzero_ps,
    _mm512_storeu_ps, _mm512_sub_ps,
};
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{
    _mm256_add_ps, _mm256_loadu_ps, _mm256_mul_ps, _mm256_setzero_ps, _mm256_storeu_ps,
    _mm256_sub_ps, _mm512_add_ps, _mm512_fmsub_ps, _mm512_loadu_ps, _mm512_setzero_ps,
    _mm512_storeu_ps, _mm512_sub_ps,
};

// =============================================================================
// ARM IMPORTS
// =============================================================================

#[cfg(target_arch = "aarch64")]
use super::constants::LANES_NEON_F32;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::{vaddq_f32, vdupq_n_f32, vld1q_f32, vmulq_f32, vst1q_f32, vsubq_f32};

#[cfg(target_arch = "aarch64")]
use std::arch::asm;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Continues a Kahan accumulation from `(sum, comp)` over the paired elements.
#[inline(always)]
fn kahan_continue(mut sum: f32, mut comp: f32, va: &[f32], vb: &[f32]) -> f32 {
    for (&a, &b) in va.iter().zip(vb) {
        let y = a * b - comp;
        let t = sum + y;
        comp = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Adds lanes strictly in lane order so results do not depend on reduction shape.
#[allow(dead_code)]
#[inline(always)]
fn reduce_lanes(lanes: &[f32]) -> f32 {
    lanes.iter().fold(0.0f32, |acc, &lane| acc + lane)
}

// =============================================================================
// SCALAR
// =============================================================================

/// Portable compensated dot product. Always available.
#[inline]
pub fn dot_f32_scalar(va: &[f32], vb: &[f32]) -> f32 {
    let len = va.len().min(vb.len());
    kahan_continue(0.0, 0.0, &va[..len], &vb[..len])
}

// =============================================================================
// AVX-512 (16 lanes, fused multiply-subtract)
// =============================================================================

// AVX-512 compensated dot product for f32 vectors.
//
// Processes 16 f32 elements per iteration using 512-bit registers. The product and
// the compensation subtract share one rounding through VFMSUB.
//
// # Safety
// Requires AVX-512F support.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx512f")]
pub unsafe fn dot_f32_avx512(va: &[f32], vb: &[f32]) -> f32 {
    const LANES: usize = LANES_AVX512_F32;
    let len = va.len().min(vb.len());
    let simd_len = len & !(LANES - 1);

    let mut sum = _mm512_setzero_ps();
    let mut comp = _mm512_setzero_ps();

    let mut i = 0;
    while i < simd_len {
        let a = _mm512_loadu_ps(va.as_ptr().add(i));
        let b = _mm512_loadu_ps(vb.as_ptr().add(i));
        let y = _mm512_fmsub_ps(a, b, comp);
        let t = _mm512_add_ps(sum, y);
        comp = _mm512_sub_ps(_mm512_sub_ps(t, sum), y);
        sum = t;
        i += LANES;
    }

    let mut lanes = [0.0f32; LANES];
    _mm512_storeu_ps(lanes.as_mut_ptr(), sum);
    let sum = reduce_lanes(&lanes);
    _mm512_storeu_ps(lanes.as_mut_ptr(), comp);
    let comp = reduce_lanes(&lanes);

    kahan_continue(sum, comp, &va[simd_len..len], &vb[simd_len..len])
}

// =============================================================================
// AVX / AVX2 (8 lanes)
// =============================================================================

// AVX compensated dot product for f32 vectors.
//
// Uses only AVX instructions, so it serves processors reporting AVX or AVX2.
//
// # Safety
// Requires AVX support.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx")]
pub unsafe fn dot_f32_avx(va: &[f32], vb: &[f32]) -> f32 {
    const LANES: usize = LANES_AVX_F32;
    let len = va.len().min(vb.len());
    let simd_len = len & !(LANES - 1);

    let mut sum = _mm256_setzero_ps();
    let mut comp = _mm256_setzero_ps();

    // Process 8 elements at a time with AVX
    let mut i = 0;
    while i < simd_len {
        let a = _mm256_loadu_ps(va.as_ptr().add(i));
        let b = _mm256_loadu_ps(vb.as_ptr().add(i));
        let y = _mm256_sub_ps(_mm256_mul_ps(a, b), comp);
        let t = _mm256_add_ps(sum, y);
        comp = _mm256_sub_ps(_mm256_sub_ps(t, sum), y);
        sum = t;
        i += LANES;
    }

    let mut lanes = [0.0f32; LANES];
    _mm256_storeu_ps(lanes.as_mut_ptr(), sum);
    let sum = reduce_lanes(&lanes);
    _mm256_storeu_ps(lanes.as_mut_ptr(), comp);
    let comp = reduce_lanes(&lanes);

    // Handle remaining elements with scalar code
    kahan_continue(sum, comp, &va[simd_len..len], &vb[simd_len..len])
}

// =============================================================================
// NEON (4 lanes)
// =============================================================================

// NEON compensated dot product for f32 vectors.
//
// # Safety
// Requires NEON support (always present on AArch64).
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub unsafe fn dot_f32_neon(va: &[f32], vb: &[f32]) -> f32 {
    const LANES: usize = LANES_NEON_F32;
    let len = va.len().min(vb.len());
    let simd_len = len & !(LANES - 1);

    let mut sum = vdupq_n_f32(0.0);
    let mut comp = vdupq_n_f32(0.0);

    // Process 4 elements at a time with NEON
    let mut i = 0;
    while i < simd_len {
        let a = vld1q_f32(va.as_ptr().add(i));
        let b = vld1q_f32(vb.as_ptr().add(i));
        let y = vsubq_f32(vmulq_f32(a, b), comp);
        let t = vaddq_f32(sum, y);
        comp = vsubq_f32(vsubq_f32(t, sum), y);
        sum = t;
        i += LANES;
    }

    let mut lanes = [0.0f32; LANES];
    vst1q_f32(lanes.as_mut_ptr(), sum);
    let sum = reduce_lanes(&lanes);
    vst1q_f32(lanes.as_mut_ptr(), comp);
    let comp = reduce_lanes(&lanes);

    kahan_continue(sum, comp, &va[simd_len..len], &vb[simd_len..len])
}

// =============================================================================
// SVE (scalable lanes, fused multiply-subtract)
// =============================================================================

/// Number of f32 lanes in one SVE vector on this processor.
///
/// # Safety
/// Requires SVE support.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "sve")]
pub unsafe fn sve_lanes_f32() -> usize {
    let lanes: usize;
    asm!("cntw {}", out(reg) lanes, options(pure, nomem, nostack));
    lanes
}

// SVE compensated dot product for f32 vectors.
//
// The vector width is read at runtime with CNTW. Only whole vectors go through the
// predicated loop; the tail continues on the scalar recurrence like every other tier.
// FNMLS computes `a * b - c` with one rounding.
//
// # Safety
// Requires SVE support.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "sve")]
pub unsafe fn dot_f32_sve(va: &[f32], vb: &[f32]) -> f32 {
    let len = va.len().min(vb.len());
    let lanes = sve_lanes_f32();
    let simd_len = len - len % lanes;

    if simd_len == 0 {
        return kahan_continue(0.0, 0.0, &va[..len], &vb[..len]);
    }

    let sum: f32;
    let comp: f32;
    // z0 = sum, z1 = compensation, z2/z3 = inputs, z4 = y, z5 = t
    asm!(
        "ptrue p0.s",
        "dup z0.s, #0",
        "dup z1.s, #0",
        "mov {i}, #0",
        "2:",
        "ld1w {{ z2.s }}, p0/z, [{a}, {i}, lsl #2]",
        "ld1w {{ z3.s }}, p0/z, [{b}, {i}, lsl #2]",
        "movprfx z4, z1",
        "fnmls z4.s, p0/m, z2.s, z3.s",
        "fadd z5.s, z0.s, z4.s",
        "fsub z1.s, z5.s, z0.s",
        "fsub z1.s, z1.s, z4.s",
        "mov z0.d, z5.d",
        "incw {i}",
        "cmp {i}, {n}",
        "b.lo 2b",
        "faddv {sum:s}, p0, z0.s",
        "faddv {comp:s}, p0, z1.s",
        a = in(reg) va.as_ptr(),
        b = in(reg) vb.as_ptr(),
        n = in(reg) simd_len,
        i = out(reg) _,
        sum = out(vreg) sum,
        comp = out(vreg) comp,
        out("v0") _,
        out("v1") _,
        out("v2") _,
        out("v3") _,
        out("v4") _,
        out("v5") _,
        out("p0") _,
        options(nostack, readonly),
    );

    kahan_continue(sum, comp, &va[simd_len..len], &vb[simd_len..len])
}

// SPDX-License-Identifier: Apache-2.0

//! # vdot dispatch framework
//!
//! Chooses one kernel from [`crate::kernels`] per call (dynamic dispatch) or per build
//! (static dispatch, the default).
//!
//! ```text
//! Priority  Kernel   Requirement      Platform
//! ────────  ───────  ───────────────  ──────────
//! 1         Avx512   avx512f          x86 / x86_64
//! 2         Avx      avx or avx2      x86 / x86_64
//! 1         Sve      sve              AArch64
//! 2         Neon     neon             AArch64
//! last      Scalar   none             any
//! ```
//!
//! Static dispatch fixes the kernel from the compilation target's guaranteed features,
//! so no capability flag is read at runtime. Dynamic dispatch (the `dynamic-dispatch`
//! feature) reads the thread's cached [`CapabilityRecord`] on every call and walks the
//! priority list. A kernel is only ever invoked when the record proves its instruction
//! set is present; running it anywhere else raises an illegal-instruction fault.

use std::fmt;

use log::trace;
use serde::Serialize;

use crate::cache;
use crate::detect;
use crate::kernels;
use crate::types::{CapabilityRecord, Feature, Result, VdotError};

// =============================================================================
//  KERNEL TAGS
// =============================================================================

/// One compiled dot product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Avx512,
    Avx,
    Sve,
    Neon,
    Scalar,
}

impl Kernel {
    pub const ALL: [Kernel; 5] = [
        Kernel::Avx512,
        Kernel::Avx,
        Kernel::Sve,
        Kernel::Neon,
        Kernel::Scalar,
    ];

    /// Dispatch order on x86 and x86_64.
    pub const X86_PRIORITY: &'static [Kernel] = &[Kernel::Avx512, Kernel::Avx, Kernel::Scalar];

    /// Dispatch order on ARM.
    pub const ARM_PRIORITY: &'static [Kernel] = &[Kernel::Sve, Kernel::Neon, Kernel::Scalar];

    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Avx512 => "avx512",
            Kernel::Avx => "avx",
            Kernel::Sve => "sve",
            Kernel::Neon => "neon",
            Kernel::Scalar => "scalar",
        }
    }

    /// f32 elements per vector, `None` when the width is only known at runtime.
    pub const fn lanes(self) -> Option<usize> {
        use crate::constants::{LANES_AVX512_F32, LANES_AVX_F32, LANES_NEON_F32};
        match self {
            Kernel::Avx512 => Some(LANES_AVX512_F32),
            Kernel::Avx => Some(LANES_AVX_F32),
            Kernel::Sve => None,
            Kernel::Neon => Some(LANES_NEON_F32),
            Kernel::Scalar => Some(1),
        }
    }

    /// Whether `record` proves the processor can execute this kernel.
    #[inline]
    pub const fn is_supported_by(self, record: &CapabilityRecord) -> bool {
        match self {
            Kernel::Avx512 => record.has(Feature::Avx512f),
            Kernel::Avx => record.has(Feature::Avx) || record.has(Feature::Avx2),
            Kernel::Sve => record.has(Feature::Sve),
            Kernel::Neon => record.has(Feature::Neon),
            Kernel::Scalar => true,
        }
    }

    /// Whether this variant exists in the current binary.
    #[inline]
    pub fn is_compiled(self) -> bool {
        compiled_kernels().contains(&self)
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Kernel {
    type Err = VdotError;

    fn from_str(s: &str) -> Result<Self> {
        Kernel::ALL
            .iter()
            .copied()
            .find(|kernel| kernel.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VdotError::Unsupported(format!("unknown kernel '{s}'")))
    }
}

// =============================================================================
//  SELECTION
// =============================================================================

#[cfg(all(
    not(feature = "disable-simd"),
    any(target_arch = "x86", target_arch = "x86_64")
))]
const COMPILED_KERNELS: &[Kernel] = Kernel::X86_PRIORITY;

#[cfg(all(not(feature = "disable-simd"), target_arch = "aarch64"))]
const COMPILED_KERNELS: &[Kernel] = Kernel::ARM_PRIORITY;

#[cfg(any(
    feature = "disable-simd",
    not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))
))]
const COMPILED_KERNELS: &[Kernel] = &[Kernel::Scalar];

/// Kernels compiled into this binary, highest priority first. Always ends in `Scalar`.
#[inline]
pub const fn compiled_kernels() -> &'static [Kernel] {
    COMPILED_KERNELS
}

/// First kernel of `priority` that `record` supports, or `Scalar`.
#[inline]
pub fn select_from(priority: &[Kernel], record: &CapabilityRecord) -> Kernel {
    priority
        .iter()
        .copied()
        .find(|kernel| kernel.is_supported_by(record))
        .unwrap_or(Kernel::Scalar)
}

/// Best compiled kernel that `record` supports.
#[inline]
pub fn select_kernel(record: &CapabilityRecord) -> Kernel {
    select_from(compiled_kernels(), record)
}

const fn static_kernel() -> Kernel {
    if cfg!(feature = "disable-simd") {
        Kernel::Scalar
    } else if cfg!(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "avx512f"
    )) {
        Kernel::Avx512
    } else if cfg!(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        any(target_feature = "avx", target_feature = "avx2")
    )) {
        Kernel::Avx
    } else if cfg!(all(target_arch = "aarch64", target_feature = "sve")) {
        Kernel::Sve
    } else if cfg!(all(target_arch = "aarch64", target_feature = "neon")) {
        Kernel::Neon
    } else {
        Kernel::Scalar
    }
}

/// Kernel fixed at build time from the target's guaranteed features.
pub const STATIC_KERNEL: Kernel = static_kernel();

/// How [`dot_product_f32`] picks its kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    Static,
    Dynamic,
}

pub const DISPATCH_MODE: DispatchMode = if cfg!(feature = "dynamic-dispatch") {
    DispatchMode::Dynamic
} else {
    DispatchMode::Static
};

/// The kernel the next call on this thread will run.
#[inline]
pub fn active_kernel() -> Kernel {
    match DISPATCH_MODE {
        DispatchMode::Static => STATIC_KERNEL,
        DispatchMode::Dynamic => select_kernel(&cache::runtime_capabilities()),
    }
}

// =============================================================================
//  CAPABILITY QUERIES
// =============================================================================

/// Record guaranteed by the compilation target.
#[inline]
pub const fn static_capabilities() -> CapabilityRecord {
    detect::static_record()
}

/// Record probed from the executing processor, cached per thread.
#[inline]
pub fn runtime_capabilities() -> CapabilityRecord {
    cache::runtime_capabilities()
}

/// Record the active dispatch mode decides with.
#[inline]
pub fn capabilities() -> CapabilityRecord {
    match DISPATCH_MODE {
        DispatchMode::Static => static_capabilities(),
        DispatchMode::Dynamic => runtime_capabilities(),
    }
}

/// Check if a specific capability flag is set, by name (e.g. `"avx2"`, `"neon-fma"`)
#[inline]
pub fn has_hw_support(name: &str) -> bool {
    match name.parse::<Feature>() {
        Ok(feature) => capabilities().has(feature),
        Err(_) => false,
    }
}

// =============================================================================
//  DOT PRODUCT
// =============================================================================

/// Runs `kernel` on the paired elements of `va` and `vb`.
///
/// # Safety
/// The executing processor must support `kernel`'s instruction set.
#[inline]
unsafe fn invoke(kernel: Kernel, va: &[f32], vb: &[f32]) -> f32 {
    match kernel {
        #[cfg(all(
            not(feature = "disable-simd"),
            any(target_arch = "x86", target_arch = "x86_64")
        ))]
        Kernel::Avx512 => kernels::dot_f32_avx512(va, vb),
        #[cfg(all(
            not(feature = "disable-simd"),
            any(target_arch = "x86", target_arch = "x86_64")
        ))]
        Kernel::Avx => kernels::dot_f32_avx(va, vb),
        #[cfg(all(not(feature = "disable-simd"), target_arch = "aarch64"))]
        Kernel::Sve => kernels::dot_f32_sve(va, vb),
        #[cfg(all(not(feature = "disable-simd"), target_arch = "aarch64"))]
        Kernel::Neon => kernels::dot_f32_neon(va, vb),
        _ => kernels::dot_f32_scalar(va, vb),
    }
}

#[inline]
fn dispatch(va: &[f32], vb: &[f32]) -> f32 {
    let kernel = active_kernel();
    trace!(
        "DOT_PRODUCT_F32 DISPATCH: len={}, kernel={}, mode={:?}",
        va.len(),
        kernel,
        DISPATCH_MODE
    );
    // SAFETY: static mode only picks kernels the target guarantees; dynamic mode only
    // picks kernels the probed record supports.
    unsafe { invoke(kernel, va, vb) }
}

/// Compute the float32 dot product Σ va[i]·vb[i] with compensated summation.
///
/// # Errors
/// * Returns `VdotError::LengthMismatch` if the slices have different lengths
///
/// # Examples
/// ```rust
/// use vdot::dot_product_f32;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// assert_eq!(dot_product_f32(&a, &b)?, 32.0);
/// assert_eq!(dot_product_f32(&[], &[])?, 0.0);
/// # Ok::<(), vdot::VdotError>(())
/// ```
#[inline]
pub fn dot_product_f32(va: &[f32], vb: &[f32]) -> Result<f32> {
    if va.len() != vb.len() {
        return Err(VdotError::LengthMismatch {
            left: va.len(),
            right: vb.len(),
        });
    }
    Ok(dispatch(va, vb))
}

/// Pointer-and-length form of [`dot_product_f32`] with no checks.
///
/// # Safety
/// When `n > 0`, `a` and `b` must each point to `n` initialized, readable `f32` values.
#[inline]
pub unsafe fn dot_product_f32_unchecked(a: *const f32, b: *const f32, n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    let va = std::slice::from_raw_parts(a, n);
    let vb = std::slice::from_raw_parts(b, n);
    dispatch(va, vb)
}

/// Run one specific kernel variant.
///
/// # Errors
/// * Returns `VdotError::Unsupported` if `kernel` is not compiled into this binary or
///   the executing processor lacks its instruction set
/// * Returns `VdotError::LengthMismatch` if the slices have different lengths
pub fn dot_product_f32_with(kernel: Kernel, va: &[f32], vb: &[f32]) -> Result<f32> {
    if !kernel.is_compiled() {
        return Err(VdotError::Unsupported(format!(
            "kernel '{kernel}' is not compiled for this target"
        )));
    }
    let record = runtime_capabilities();
    if !kernel.is_supported_by(&record) {
        return Err(VdotError::Unsupported(format!(
            "kernel '{kernel}' needs instructions this processor lacks ({record})"
        )));
    }
    if va.len() != vb.len() {
        return Err(VdotError::LengthMismatch {
            left: va.len(),
            right: vb.len(),
        });
    }
    trace!("DOT_PRODUCT_F32 FORCED: len={}, kernel={}", va.len(), kernel);
    // SAFETY: support was just checked against the probed record.
    Ok(unsafe { invoke(kernel, va, vb) })
}

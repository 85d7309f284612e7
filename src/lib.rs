// SPDX-License-Identifier: Apache-2.0

//! vdot library
//!
//! A float32 dot product that runs well on processors with different vector extensions
//! from one compiled artifact. The crate detects hardware capabilities and picks the
//! fastest kernel the processor can actually execute, with a scalar fallback everywhere.
//!
//! - Capability probe: compile-time records and execution-time CPUID / HWCAP decoding
//! - Capability cache: one probe per thread
//! - Kernel dispatch: static (per build, default) or dynamic (per call)
//! - Kernels: AVX-512, AVX, SVE, NEON and scalar, all with compensated summation
//!
//! ## Hardware support
//! - **AVX / AVX2 / AVX-512F** on x86 and x86_64
//! - **NEON / SVE** on AArch64 (SVE through inline assembly)
//! - **Scalar** on every target, and the only kernel under the `disable-simd` feature
//!
//! Enable the `dynamic-dispatch` feature to select per call from the probed processor
//! instead of the compilation target.
//!
//! ## Usage
//!
//! ```rust
//! use vdot;
//!
//! let a = [1.0, 2.0, 3.0, 4.0];
//! let b = [2.0, 3.0, 4.0, 5.0];
//! let dot = vdot::dot_product_f32(&a, &b).unwrap();
//! assert_eq!(dot, 40.0);
//!
//! // Inspect what the dispatcher decides with
//! let caps = vdot::capabilities();
//! println!("capabilities: {caps}, kernel: {}", vdot::active_kernel());
//! ```

#![allow(clippy::missing_safety_doc)]

pub mod cache;
pub mod constants;
pub mod detect;
pub mod dispatch;
pub mod kernels;
pub mod types;

pub use types::*;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod cache_tests;
#[cfg(test)]
#[path = "tests/detect_tests.rs"]
mod detect_tests;
#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod dispatch_tests;
#[cfg(test)]
#[path = "tests/kernels_tests.rs"]
mod kernels_tests;
#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod types_tests;

// Re-export the main API from core
pub use cache::{runtime_capabilities, shared_capabilities, CapabilityCache};
pub use detect::{probe, static_record};
pub use dispatch::{
    active_kernel, capabilities, dot_product_f32, dot_product_f32_unchecked,
    dot_product_f32_with, has_hw_support, select_kernel, DispatchMode, Kernel, DISPATCH_MODE,
    STATIC_KERNEL,
};

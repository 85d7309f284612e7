// SPDX-License-Identifier: Apache-2.0

//! Property tests for kernel selection and numerical accuracy.

use proptest::prelude::*;

use vdot::dispatch::{compiled_kernels, select_from};
use vdot::{
    dot_product_f32, dot_product_f32_with, runtime_capabilities, CapabilityRecord, Flavor,
    Kernel,
};

fn reference(va: &[f32], vb: &[f32]) -> (f64, f64) {
    va.iter().zip(vb).fold((0.0, 0.0), |(dot, mag), (&a, &b)| {
        let p = f64::from(a) * f64::from(b);
        (dot + p, mag + p.abs())
    })
}

fn paired_vectors(max_len: usize) -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (0..=max_len).prop_flat_map(|n| {
        (
            prop::collection::vec(-1000.0f32..1000.0, n),
            prop::collection::vec(-1000.0f32..1000.0, n),
        )
    })
}

fn host_kernels() -> Vec<Kernel> {
    let record = runtime_capabilities();
    compiled_kernels()
        .iter()
        .copied()
        .filter(|kernel| kernel.is_supported_by(&record))
        .collect()
}

proptest! {
    #[test]
    fn prop_selection_is_safe_and_maximal(bits in any::<u32>()) {
        let record = CapabilityRecord::from_bits(Flavor::Dynamic, bits);
        for priority in [Kernel::X86_PRIORITY, Kernel::ARM_PRIORITY] {
            let chosen = select_from(priority, &record);
            prop_assert!(chosen.is_supported_by(&record));
            let rank = priority.iter().position(|&k| k == chosen);
            prop_assert!(rank.is_some());
            for higher in &priority[..rank.unwrap_or(0)] {
                prop_assert!(!higher.is_supported_by(&record), "{} skipped", higher);
            }
        }
    }

    #[test]
    fn prop_dot_product_accuracy((va, vb) in paired_vectors(600)) {
        let (expected, magnitude) = reference(&va, &vb);
        let actual = f64::from(dot_product_f32(&va, &vb).unwrap());
        let tolerance = 1e-5 * magnitude + 1e-6;
        prop_assert!(
            (actual - expected).abs() <= tolerance,
            "got {}, expected {}, tolerance {}", actual, expected, tolerance
        );
    }

    #[test]
    fn prop_kernels_agree((va, vb) in paired_vectors(300)) {
        let (_, magnitude) = reference(&va, &vb);
        let scalar = f64::from(dot_product_f32_with(Kernel::Scalar, &va, &vb).unwrap());
        for kernel in host_kernels() {
            let result = f64::from(dot_product_f32_with(kernel, &va, &vb).unwrap());
            prop_assert!(
                (result - scalar).abs() <= 2e-5 * magnitude + 1e-6,
                "{} gave {}, scalar gave {}", kernel, result, scalar
            );
        }
    }

    #[test]
    fn prop_length_mismatch_rejected(a in prop::collection::vec(-1.0f32..1.0, 0..32),
                                     b in prop::collection::vec(-1.0f32..1.0, 0..32)) {
        prop_assume!(a.len() != b.len());
        prop_assert!(dot_product_f32(&a, &b).is_err());
    }
}

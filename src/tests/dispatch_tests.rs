// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use crate::dispatch::{
        active_kernel, capabilities, compiled_kernels, dot_product_f32,
        dot_product_f32_unchecked, dot_product_f32_with, has_hw_support, runtime_capabilities,
        select_from, select_kernel, static_capabilities, DispatchMode, Kernel, DISPATCH_MODE,
        STATIC_KERNEL,
    };
    use crate::test_utils::{config_test_logger, ramp, sum_of_squares};
    use crate::types::{CapabilityRecord, Feature, Flavor, VdotError};

    fn record(features: &[Feature]) -> CapabilityRecord {
        features
            .iter()
            .fold(CapabilityRecord::empty(Flavor::Dynamic), |r, &f| r.with(f))
    }

    // =============================================================================
    //   PRIORITY SELECTION
    // =============================================================================

    #[test]
    fn test_x86_priority_order() {
        let all = record(&[Feature::Avx512f, Feature::Avx, Feature::Avx2]);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &all), Kernel::Avx512);

        let no_512 = record(&[Feature::Avx, Feature::Avx2, Feature::Fma]);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &no_512), Kernel::Avx);

        let avx2_only = record(&[Feature::Avx2]);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &avx2_only), Kernel::Avx);

        let sse_only = record(&[Feature::Sse3, Feature::Ssse3]);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &sse_only), Kernel::Scalar);
    }

    #[test]
    fn test_arm_priority_order() {
        let sve = record(&[Feature::Neon, Feature::NeonFma, Feature::Sve]);
        assert_eq!(select_from(Kernel::ARM_PRIORITY, &sve), Kernel::Sve);

        let neon = record(&[Feature::Neon, Feature::NeonFma]);
        assert_eq!(select_from(Kernel::ARM_PRIORITY, &neon), Kernel::Neon);

        let bare = record(&[Feature::ArmInt8Matmul]);
        assert_eq!(select_from(Kernel::ARM_PRIORITY, &bare), Kernel::Scalar);
    }

    #[test]
    fn test_empty_record_selects_scalar() {
        let empty = CapabilityRecord::empty(Flavor::Dynamic);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &empty), Kernel::Scalar);
        assert_eq!(select_from(Kernel::ARM_PRIORITY, &empty), Kernel::Scalar);
        assert_eq!(select_kernel(&empty), Kernel::Scalar);
        assert_eq!(select_from(&[], &empty), Kernel::Scalar);
    }

    #[test]
    fn test_foreign_family_flags_are_ignored() {
        let arm = record(&[Feature::Sve, Feature::Neon]);
        assert_eq!(select_from(Kernel::X86_PRIORITY, &arm), Kernel::Scalar);
        let x86 = record(&[Feature::Avx512f, Feature::Avx]);
        assert_eq!(select_from(Kernel::ARM_PRIORITY, &x86), Kernel::Scalar);
    }

    #[test]
    fn test_compiled_kernels_end_in_scalar() {
        let kernels = compiled_kernels();
        assert_eq!(kernels.last(), Some(&Kernel::Scalar));
        assert!(Kernel::Scalar.is_compiled());
        if cfg!(feature = "disable-simd") {
            assert_eq!(kernels, &[Kernel::Scalar]);
        }
    }

    #[test]
    fn test_static_kernel_matches_static_record() {
        assert_eq!(select_kernel(&static_capabilities()), STATIC_KERNEL);
        assert!(STATIC_KERNEL.is_compiled());
    }

    #[test]
    fn test_runtime_selection_is_supported() {
        config_test_logger();
        let record = runtime_capabilities();
        let kernel = select_kernel(&record);
        assert!(kernel.is_supported_by(&record));
        // The build target never promises more than the processor delivers.
        assert!(STATIC_KERNEL.is_supported_by(&record));
    }

    #[test]
    fn test_dispatch_mode() {
        let expected = if cfg!(feature = "dynamic-dispatch") {
            DispatchMode::Dynamic
        } else {
            DispatchMode::Static
        };
        assert_eq!(DISPATCH_MODE, expected);
        match DISPATCH_MODE {
            DispatchMode::Static => {
                assert_eq!(active_kernel(), STATIC_KERNEL);
                assert_eq!(capabilities(), static_capabilities());
            }
            DispatchMode::Dynamic => {
                assert_eq!(active_kernel(), select_kernel(&runtime_capabilities()));
                assert_eq!(capabilities(), runtime_capabilities());
            }
        }
    }

    // =============================================================================
    //   KERNEL TAGS
    // =============================================================================

    #[test]
    fn test_kernel_names() {
        for kernel in Kernel::ALL {
            assert_eq!(kernel.name().parse::<Kernel>().unwrap(), kernel);
            assert_eq!(kernel.to_string(), kernel.name());
        }
        assert_eq!("AVX512".parse::<Kernel>().unwrap(), Kernel::Avx512);
        assert!(matches!(
            "sse".parse::<Kernel>(),
            Err(VdotError::Unsupported(_))
        ));
    }

    #[test]
    fn test_kernel_lanes() {
        assert_eq!(Kernel::Avx512.lanes(), Some(16));
        assert_eq!(Kernel::Avx.lanes(), Some(8));
        assert_eq!(Kernel::Neon.lanes(), Some(4));
        assert_eq!(Kernel::Scalar.lanes(), Some(1));
        assert_eq!(Kernel::Sve.lanes(), None);
    }

    #[test]
    fn test_kernel_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Kernel::Avx512).unwrap(), "\"avx512\"");
        assert_eq!(serde_json::to_string(&DispatchMode::Static).unwrap(), "\"static\"");
    }

    // =============================================================================
    //   CAPABILITY QUERIES
    // =============================================================================

    #[test]
    fn test_has_hw_support_matches_record() {
        let record = capabilities();
        for feature in Feature::ALL {
            assert_eq!(has_hw_support(feature.name()), record.has(feature), "{feature}");
        }
    }

    #[test]
    fn test_has_hw_support_unknown_name() {
        assert!(!has_hw_support("avx10"));
        assert!(!has_hw_support(""));
    }

    #[test]
    fn test_query_flavors() {
        assert_eq!(static_capabilities().flavor(), Flavor::Static);
        assert_eq!(runtime_capabilities().flavor(), Flavor::Dynamic);
    }

    // =============================================================================
    //   PUBLIC DOT PRODUCT
    // =============================================================================

    #[test]
    fn test_dot_product_basic() {
        config_test_logger();
        assert_eq!(dot_product_f32(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap(), 32.0);
        assert_eq!(dot_product_f32(&[], &[]).unwrap(), 0.0);
        let va = ramp(1000);
        assert_eq!(
            f64::from(dot_product_f32(&va[..100], &va[..100]).unwrap()),
            sum_of_squares(100)
        );
    }

    #[test]
    fn test_dot_product_length_mismatch() {
        let err = dot_product_f32(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, VdotError::LengthMismatch { left: 2, right: 1 }));
        assert_eq!(err.to_string(), "Length mismatch: a.len()=2, b.len()=1");
    }

    #[test]
    fn test_unchecked_zero_length_ignores_pointers() {
        let result = unsafe { dot_product_f32_unchecked(std::ptr::null(), std::ptr::null(), 0) };
        assert_eq!(result, 0.0);
    }

    #[test]
    fn test_unchecked_matches_checked() {
        let va = ramp(77);
        let vb: Vec<f32> = va.iter().map(|x| 0.5 * x).collect();
        let checked = dot_product_f32(&va, &vb).unwrap();
        let unchecked = unsafe { dot_product_f32_unchecked(va.as_ptr(), vb.as_ptr(), va.len()) };
        assert_eq!(checked, unchecked);
    }

    #[test]
    fn test_forced_kernel_rejects_missing_tiers() {
        let record = runtime_capabilities();
        for kernel in Kernel::ALL {
            let result = dot_product_f32_with(kernel, &[1.0, 2.0], &[3.0, 4.0]);
            if kernel.is_compiled() && kernel.is_supported_by(&record) {
                assert_eq!(result.unwrap(), 11.0, "{kernel}");
            } else {
                assert!(
                    matches!(result, Err(VdotError::Unsupported(_))),
                    "{kernel} should be rejected"
                );
            }
        }
    }

    #[test]
    fn test_forced_kernel_length_mismatch() {
        let err = dot_product_f32_with(Kernel::Scalar, &[1.0], &[]).unwrap_err();
        assert!(matches!(err, VdotError::LengthMismatch { left: 1, right: 0 }));
    }

    #[test]
    fn test_active_kernel_agrees_with_scalar() {
        let va = ramp(513);
        let vb: Vec<f32> = (0..513).map(|i| (i % 7) as f32 - 3.0).collect();
        let dispatched = dot_product_f32(&va, &vb).unwrap();
        let scalar = dot_product_f32_with(Kernel::Scalar, &va, &vb).unwrap();
        assert_eq!(dispatched, scalar);
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Common constants used across implementations
//!
//! This module centralizes lane counts and the declarative bit tables the capability
//! probe decodes hardware identification words with.

use crate::types::{CpuidBit, CpuidRegister, Feature, HwcapBit, HwcapWord};

// =============================================================================
// SIMD Lane Counts by Tier (f32 elements per register)
// =============================================================================

pub const LANES_NEON_F32: usize = 4; // 128/32 = 4 f32 elements
pub const LANES_AVX_F32: usize = 8; // 256/32 = 8 f32 elements
pub const LANES_AVX512_F32: usize = 16; // 512/32 = 16 f32 elements

// =============================================================================
// x86 CPUID
// =============================================================================

pub const CPUID_LEAF_MAX: u32 = 0;
pub const CPUID_LEAF_FEATURES: u32 = 1;
pub const CPUID_LEAF_EXTENDED_FEATURES: u32 = 7;

/// Leaf 1 ECX: the OS has enabled XSAVE/XGETBV.
pub const CPUID_1_ECX_OSXSAVE: u32 = 1 << 27;

/// XCR0 bits 1|2: SSE and AVX (YMM upper halves) state enabled by the OS.
pub const XCR0_AVX_STATE: u64 = 0b0000_0110;
/// XCR0 bits 5|6|7: opmask, ZMM0-15 upper halves and ZMM16-31 state enabled by the OS.
pub const XCR0_AVX512_STATE: u64 = 0b1110_0000;

const fn cpuid_bit(
    leaf: u32,
    sub_leaf: u32,
    register: CpuidRegister,
    bit: u32,
    feature: Feature,
) -> CpuidBit {
    CpuidBit {
        leaf,
        sub_leaf,
        register,
        bit,
        feature,
    }
}

/// Intel SDM Vol. 2A, CPUID feature information.
pub const X86_CPUID_TABLE: &[CpuidBit] = &[
    cpuid_bit(1, 0, CpuidRegister::Ecx, 0, Feature::Sse3),
    cpuid_bit(1, 0, CpuidRegister::Ecx, 9, Feature::Ssse3),
    cpuid_bit(1, 0, CpuidRegister::Ecx, 12, Feature::Fma),
    cpuid_bit(1, 0, CpuidRegister::Ecx, 28, Feature::Avx),
    cpuid_bit(1, 0, CpuidRegister::Ecx, 29, Feature::F16c),
    cpuid_bit(7, 0, CpuidRegister::Ebx, 5, Feature::Avx2),
    cpuid_bit(7, 0, CpuidRegister::Ebx, 16, Feature::Avx512f),
    cpuid_bit(7, 0, CpuidRegister::Ebx, 17, Feature::Avx512dq),
    cpuid_bit(7, 0, CpuidRegister::Ecx, 1, Feature::Avx512vbmi),
    cpuid_bit(7, 0, CpuidRegister::Ecx, 11, Feature::Avx512vnni),
    cpuid_bit(7, 0, CpuidRegister::Edx, 23, Feature::Avx512fp16),
    cpuid_bit(7, 1, CpuidRegister::Eax, 4, Feature::AvxVnni),
    cpuid_bit(7, 1, CpuidRegister::Eax, 5, Feature::Avx512bf16),
];

// =============================================================================
// ARM auxiliary vector (Linux uapi asm/hwcap.h)
// =============================================================================

const fn hwcap_bits(word: HwcapWord, mask: u64, feature: Feature) -> HwcapBit {
    HwcapBit {
        word,
        mask,
        feature,
    }
}

/// arch/arm64/include/uapi/asm/hwcap.h
pub const AARCH64_HWCAP_TABLE: &[HwcapBit] = &[
    // HWCAP_ASIMDHP
    hwcap_bits(HwcapWord::Hwcap, 1 << 10, Feature::ArmFp16VectorArith),
    // HWCAP_SVE
    hwcap_bits(HwcapWord::Hwcap, 1 << 22, Feature::Sve),
    // HWCAP2_SVE2
    hwcap_bits(HwcapWord::Hwcap2, 1 << 1, Feature::Sve2),
    // HWCAP2_I8MM
    hwcap_bits(HwcapWord::Hwcap2, 1 << 13, Feature::ArmInt8Matmul),
];

/// arch/arm/include/uapi/asm/hwcap.h
pub const ARM_HWCAP_TABLE: &[HwcapBit] = &[
    // HWCAP_NEON
    hwcap_bits(HwcapWord::Hwcap, 1 << 12, Feature::Neon),
    // HWCAP_NEON | HWCAP_VFPv4
    hwcap_bits(HwcapWord::Hwcap, (1 << 12) | (1 << 16), Feature::NeonFma),
    // HWCAP_ASIMDHP
    hwcap_bits(HwcapWord::Hwcap, 1 << 23, Feature::ArmFp16VectorArith),
    // HWCAP_I8MM
    hwcap_bits(HwcapWord::Hwcap, 1 << 27, Feature::ArmInt8Matmul),
];

/// Features 64-bit ARM guarantees without asking the OS.
pub const AARCH64_BASELINE: &[Feature] = &[Feature::Neon, Feature::NeonFma];

// =============================================================================
// Apple sysctl names (platforms without an auxiliary vector)
// =============================================================================

pub const APPLE_SYSCTL_TABLE: &[(&std::ffi::CStr, Feature)] = &[
    (c"hw.optional.arm.FEAT_I8MM", Feature::ArmInt8Matmul),
    (c"hw.optional.arm.FEAT_FP16", Feature::ArmFp16VectorArith),
];

// SPDX-License-Identifier: Apache-2.0

//! # Capability probe
//!
//! Produces [`CapabilityRecord`]s in two flavors:
//!
//! - [`static_record`]: what the compilation target guarantees. Built in a `const`
//!   context from `cfg!(target_feature = ...)`, so it costs nothing at runtime and
//!   describes the *compiler target*, not necessarily the processor running the code.
//! - [`probe`]: what the executing processor reports. x86 reads CPUID leaves 1 and 7,
//!   64-bit and 32-bit ARM read the auxiliary vector (or `sysctlbyname` on Apple).
//!
//! Hardware words are decoded through the declarative tables in
//! [`crate::constants`] by [`decode_cpuid`] and [`decode_hwcap`]. Both decoders are pure
//! functions over captured words, so they can be exercised on any host.
//!
//! The probe never fails. A query the OS cannot answer yields false flags, and an
//! unrecognized architecture yields an empty record.

use log::debug;

use crate::constants::*;
use crate::types::{
    CapabilityRecord, CpuidBit, CpuidWords, Feature, Flavor, HwcapBit, HwcapWord,
};

// =============================================================================
//  STATIC (COMPILE-TIME) RECORD
// =============================================================================

const fn flag(enabled: bool, feature: Feature) -> u32 {
    if enabled {
        feature.bit()
    } else {
        0
    }
}

const STATIC_BITS: u32 = flag(cfg!(target_feature = "avx"), Feature::Avx)
    | flag(cfg!(target_feature = "avx2"), Feature::Avx2)
    | flag(cfg!(target_feature = "avxvnni"), Feature::AvxVnni)
    | flag(cfg!(target_feature = "f16c"), Feature::F16c)
    | flag(cfg!(target_feature = "fma"), Feature::Fma)
    | flag(cfg!(target_feature = "avx512f"), Feature::Avx512f)
    | flag(cfg!(target_feature = "avx512fp16"), Feature::Avx512fp16)
    | flag(cfg!(target_feature = "avx512bf16"), Feature::Avx512bf16)
    | flag(cfg!(target_feature = "avx512vnni"), Feature::Avx512vnni)
    | flag(cfg!(target_feature = "avx512vbmi"), Feature::Avx512vbmi)
    | flag(cfg!(target_feature = "avx512dq"), Feature::Avx512dq)
    | flag(cfg!(target_feature = "sse3"), Feature::Sse3)
    | flag(cfg!(target_feature = "ssse3"), Feature::Ssse3)
    | flag(
        cfg!(all(
            any(target_arch = "aarch64", target_arch = "arm"),
            target_feature = "neon"
        )),
        Feature::Neon,
    )
    | flag(
        cfg!(any(
            all(target_arch = "aarch64", target_feature = "neon"),
            all(
                target_arch = "arm",
                target_feature = "neon",
                target_feature = "vfp4"
            )
        )),
        Feature::NeonFma,
    )
    | flag(cfg!(target_feature = "sve"), Feature::Sve)
    | flag(cfg!(target_feature = "sve2"), Feature::Sve2)
    | flag(cfg!(target_feature = "i8mm"), Feature::ArmInt8Matmul)
    | flag(
        cfg!(all(target_arch = "aarch64", target_feature = "fp16")),
        Feature::ArmFp16VectorArith,
    );

/// Features guaranteed by the active compilation target.
#[inline]
pub const fn static_record() -> CapabilityRecord {
    CapabilityRecord::from_bits(Flavor::Static, STATIC_BITS)
}

// =============================================================================
//  TABLE DECODERS
// =============================================================================

/// CPUID words captured from one processor, plus the OS-enabled register state (XCR0).
///
/// Leaves the processor does not implement stay zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuidSnapshot {
    pub leaf1: CpuidWords,
    pub leaf7: CpuidWords,
    pub leaf7_1: CpuidWords,
    pub xcr0: u64,
}

impl CpuidSnapshot {
    #[inline]
    fn words(&self, leaf: u32, sub_leaf: u32) -> Option<CpuidWords> {
        match (leaf, sub_leaf) {
            (CPUID_LEAF_FEATURES, 0) => Some(self.leaf1),
            (CPUID_LEAF_EXTENDED_FEATURES, 0) => Some(self.leaf7),
            (CPUID_LEAF_EXTENDED_FEATURES, 1) => Some(self.leaf7_1),
            _ => None,
        }
    }

    /// The OS saves and restores YMM state across context switches.
    #[inline]
    pub fn os_supports_avx(&self) -> bool {
        self.leaf1.ecx & CPUID_1_ECX_OSXSAVE != 0 && self.xcr0 & XCR0_AVX_STATE == XCR0_AVX_STATE
    }

    /// The OS saves and restores opmask and ZMM state across context switches.
    #[inline]
    pub fn os_supports_avx512(&self) -> bool {
        self.os_supports_avx() && self.xcr0 & XCR0_AVX512_STATE == XCR0_AVX512_STATE
    }
}

/// Decodes x86 identification words into a dynamic record.
///
/// AVX-family flags are dropped when the OS has not enabled the matching register
/// state, since executing those instructions would fault regardless of the CPUID bits.
pub fn decode_cpuid(table: &[CpuidBit], snapshot: &CpuidSnapshot) -> CapabilityRecord {
    let mut record = CapabilityRecord::empty(Flavor::Dynamic);
    for entry in table {
        let Some(words) = snapshot.words(entry.leaf, entry.sub_leaf) else {
            continue;
        };
        if words.get(entry.register) & (1u32 << entry.bit) != 0 {
            record = record.with(entry.feature);
        }
    }

    let os_avx = snapshot.os_supports_avx();
    let os_avx512 = snapshot.os_supports_avx512();
    Feature::ALL.iter().fold(record, |record, &feature| {
        if (feature.needs_avx_state() && !os_avx) || (feature.needs_avx512_state() && !os_avx512)
        {
            record.without(feature)
        } else {
            record
        }
    })
}

/// Decodes ARM auxiliary-vector words into a dynamic record.
pub fn decode_hwcap(table: &[HwcapBit], hwcap: u64, hwcap2: u64) -> CapabilityRecord {
    table
        .iter()
        .fold(CapabilityRecord::empty(Flavor::Dynamic), |record, entry| {
            let word = match entry.word {
                HwcapWord::Hwcap => hwcap,
                HwcapWord::Hwcap2 => hwcap2,
            };
            if word & entry.mask == entry.mask {
                record.with(entry.feature)
            } else {
                record
            }
        })
}

#[allow(dead_code)]
fn with_aarch64_baseline(record: CapabilityRecord) -> CapabilityRecord {
    AARCH64_BASELINE
        .iter()
        .fold(record, |record, &feature| record.with(feature))
}

// =============================================================================
//  DYNAMIC (EXECUTION-TIME) PROBE
// =============================================================================

/// Queries the executing processor. Every call issues the hardware queries again;
/// use [`crate::cache::runtime_capabilities`] for the memoized per-thread record.
pub fn probe() -> CapabilityRecord {
    let record = probe_arch();
    debug!("probed processor capabilities: {}", record);
    record
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn probe_arch() -> CapabilityRecord {
    decode_cpuid(X86_CPUID_TABLE, &x86::snapshot())
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    use super::CpuidSnapshot;
    use crate::constants::{
        CPUID_1_ECX_OSXSAVE, CPUID_LEAF_EXTENDED_FEATURES, CPUID_LEAF_FEATURES, CPUID_LEAF_MAX,
    };
    use crate::types::CpuidWords;

    #[cfg(target_arch = "x86")]
    use std::arch::x86::{__cpuid_count, _xgetbv, CpuidResult};
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::{__cpuid_count, _xgetbv, CpuidResult};

    #[allow(unused_unsafe)]
    #[inline]
    fn cpuid(leaf: u32, sub_leaf: u32) -> CpuidWords {
        // SAFETY: every x86 target rustc supports implements CPUID.
        let CpuidResult { eax, ebx, ecx, edx } = unsafe { __cpuid_count(leaf, sub_leaf) };
        CpuidWords::new(eax, ebx, ecx, edx)
    }

    #[target_feature(enable = "xsave")]
    unsafe fn xgetbv0() -> u64 {
        _xgetbv(0)
    }

    pub(super) fn snapshot() -> CpuidSnapshot {
        let max_leaf = cpuid(CPUID_LEAF_MAX, 0).eax;
        let mut snapshot = CpuidSnapshot::default();

        if max_leaf >= CPUID_LEAF_FEATURES {
            snapshot.leaf1 = cpuid(CPUID_LEAF_FEATURES, 0);
        }
        if max_leaf >= CPUID_LEAF_EXTENDED_FEATURES {
            snapshot.leaf7 = cpuid(CPUID_LEAF_EXTENDED_FEATURES, 0);
            // leaf7.eax reports the highest supported sub-leaf
            if snapshot.leaf7.eax >= 1 {
                snapshot.leaf7_1 = cpuid(CPUID_LEAF_EXTENDED_FEATURES, 1);
            }
        }
        if snapshot.leaf1.ecx & CPUID_1_ECX_OSXSAVE != 0 {
            // SAFETY: OSXSAVE means XGETBV is implemented and enabled by the OS.
            snapshot.xcr0 = unsafe { xgetbv0() };
        }
        snapshot
    }
}

#[cfg(all(
    target_arch = "aarch64",
    any(target_os = "linux", target_os = "android")
))]
fn probe_arch() -> CapabilityRecord {
    // SAFETY: getauxval has no preconditions; an absent key reads as 0.
    let hwcap = unsafe { libc::getauxval(libc::AT_HWCAP) } as u64;
    let hwcap2 = unsafe { libc::getauxval(libc::AT_HWCAP2) } as u64;
    with_aarch64_baseline(decode_hwcap(AARCH64_HWCAP_TABLE, hwcap, hwcap2))
}

#[cfg(all(target_arch = "aarch64", target_vendor = "apple"))]
fn probe_arch() -> CapabilityRecord {
    APPLE_SYSCTL_TABLE.iter().fold(
        with_aarch64_baseline(CapabilityRecord::empty(Flavor::Dynamic)),
        |record, &(name, feature)| {
            if sysctl_flag(name) {
                record.with(feature)
            } else {
                record
            }
        },
    )
}

#[cfg(all(target_arch = "aarch64", target_vendor = "apple"))]
fn sysctl_flag(name: &std::ffi::CStr) -> bool {
    let mut value: libc::c_int = 0;
    let mut size = std::mem::size_of::<libc::c_int>();
    // SAFETY: `name` is NUL-terminated and `value`/`size` describe a valid c_int buffer.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    rc == 0 && value != 0
}

#[cfg(all(
    target_arch = "aarch64",
    not(any(target_os = "linux", target_os = "android", target_vendor = "apple"))
))]
fn probe_arch() -> CapabilityRecord {
    with_aarch64_baseline(CapabilityRecord::empty(Flavor::Dynamic))
}

#[cfg(all(target_arch = "arm", any(target_os = "linux", target_os = "android")))]
fn probe_arch() -> CapabilityRecord {
    // SAFETY: getauxval has no preconditions; an absent key reads as 0.
    let hwcap = unsafe { libc::getauxval(libc::AT_HWCAP) } as u64;
    let hwcap2 = unsafe { libc::getauxval(libc::AT_HWCAP2) } as u64;
    decode_hwcap(ARM_HWCAP_TABLE, hwcap, hwcap2)
}

#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "aarch64",
    all(target_arch = "arm", any(target_os = "linux", target_os = "android"))
)))]
fn probe_arch() -> CapabilityRecord {
    CapabilityRecord::empty(Flavor::Dynamic)
}

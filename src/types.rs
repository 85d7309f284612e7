// SPDX-License-Identifier: Apache-2.0

// types.rs for vdot
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VdotError {
    #[error("Length mismatch: a.len()={left}, b.len()={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),
}

pub type Result<T> = std::result::Result<T, VdotError>;

// =============================================================================
// FEATURE FLAGS
// =============================================================================

/// Instruction-set family a feature flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFamily {
    X86,
    Arm,
}

/// One recognized hardware capability.
///
/// The discriminant doubles as the bit position inside a [`CapabilityRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Feature {
    Avx = 0,
    Avx2,
    AvxVnni,
    F16c,
    Fma,
    Avx512f,
    Avx512fp16,
    Avx512bf16,
    Avx512vnni,
    Avx512vbmi,
    Avx512dq,
    Sse3,
    Ssse3,
    Neon,
    NeonFma,
    Sve,
    Sve2,
    ArmInt8Matmul,
    ArmFp16VectorArith,
}

impl Feature {
    pub const COUNT: usize = 19;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::Avx,
        Feature::Avx2,
        Feature::AvxVnni,
        Feature::F16c,
        Feature::Fma,
        Feature::Avx512f,
        Feature::Avx512fp16,
        Feature::Avx512bf16,
        Feature::Avx512vnni,
        Feature::Avx512vbmi,
        Feature::Avx512dq,
        Feature::Sse3,
        Feature::Ssse3,
        Feature::Neon,
        Feature::NeonFma,
        Feature::Sve,
        Feature::Sve2,
        Feature::ArmInt8Matmul,
        Feature::ArmFp16VectorArith,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Feature::Avx => "avx",
            Feature::Avx2 => "avx2",
            Feature::AvxVnni => "avx-vnni",
            Feature::F16c => "f16c",
            Feature::Fma => "fma",
            Feature::Avx512f => "avx512f",
            Feature::Avx512fp16 => "avx512fp16",
            Feature::Avx512bf16 => "avx512bf16",
            Feature::Avx512vnni => "avx512vnni",
            Feature::Avx512vbmi => "avx512vbmi",
            Feature::Avx512dq => "avx512dq",
            Feature::Sse3 => "sse3",
            Feature::Ssse3 => "ssse3",
            Feature::Neon => "neon",
            Feature::NeonFma => "neon-fma",
            Feature::Sve => "sve",
            Feature::Sve2 => "sve2",
            Feature::ArmInt8Matmul => "arm-int8-matmul",
            Feature::ArmFp16VectorArith => "arm-fp16-vector-arith",
        }
    }

    pub const fn family(self) -> FeatureFamily {
        match self {
            Feature::Neon
            | Feature::NeonFma
            | Feature::Sve
            | Feature::Sve2
            | Feature::ArmInt8Matmul
            | Feature::ArmFp16VectorArith => FeatureFamily::Arm,
            _ => FeatureFamily::X86,
        }
    }

    /// True for flags whose instructions touch the AVX (YMM) register state.
    pub const fn needs_avx_state(self) -> bool {
        matches!(
            self,
            Feature::Avx | Feature::Avx2 | Feature::AvxVnni | Feature::F16c | Feature::Fma
        ) || self.needs_avx512_state()
    }

    /// True for flags whose instructions touch the opmask/ZMM register state.
    pub const fn needs_avx512_state(self) -> bool {
        matches!(
            self,
            Feature::Avx512f
                | Feature::Avx512fp16
                | Feature::Avx512bf16
                | Feature::Avx512vnni
                | Feature::Avx512vbmi
                | Feature::Avx512dq
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = VdotError;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VdotError::UnknownFeature(s.to_string()))
    }
}

// =============================================================================
// CAPABILITY RECORD
// =============================================================================

/// Where the flags of a [`CapabilityRecord`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Guaranteed by the compilation target.
    Static,
    /// Probed from the executing processor.
    Dynamic,
}

/// Immutable set of hardware feature flags of a single flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityRecord {
    flavor: Flavor,
    bits: u32,
}

impl CapabilityRecord {
    const VALID_BITS: u32 = (1 << Feature::COUNT) - 1;

    #[inline]
    pub const fn empty(flavor: Flavor) -> Self {
        Self { flavor, bits: 0 }
    }

    /// Builds a record from raw bits; bits without a matching [`Feature`] are dropped.
    #[inline]
    pub const fn from_bits(flavor: Flavor, bits: u32) -> Self {
        Self {
            flavor,
            bits: bits & Self::VALID_BITS,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with(self, feature: Feature) -> Self {
        Self {
            flavor: self.flavor,
            bits: self.bits | feature.bit(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn without(self, feature: Feature) -> Self {
        Self {
            flavor: self.flavor,
            bits: self.bits & !feature.bit(),
        }
    }

    #[inline]
    pub const fn has(&self, feature: Feature) -> bool {
        self.bits & feature.bit() != 0
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub const fn flavor(&self) -> Flavor {
        self.flavor
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Every recognized flag with its value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        Feature::ALL.iter().map(move |&feature| (feature, self.has(feature)))
    }

    /// Only the flags that are set.
    pub fn enabled(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL
            .iter()
            .copied()
            .filter(move |&feature| self.has(feature))
    }
}

impl fmt::Display for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavor = match self.flavor {
            Flavor::Static => "static",
            Flavor::Dynamic => "dynamic",
        };
        write!(f, "{flavor}[")?;
        for (i, feature) in self.enabled().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(feature.name())?;
        }
        f.write_str("]")
    }
}

impl Serialize for CapabilityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Feature::COUNT + 1))?;
        map.serialize_entry("flavor", &self.flavor)?;
        for (feature, enabled) in self.iter() {
            map.serialize_entry(feature.name(), &enabled)?;
        }
        map.end()
    }
}

// =============================================================================
// DECODE TABLE ENTRIES
// =============================================================================

/// General purpose register written by the `cpuid` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuidRegister {
    Eax,
    Ebx,
    Ecx,
    Edx,
}

/// Register values returned by one `cpuid` leaf/sub-leaf query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuidWords {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidWords {
    #[inline]
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    #[inline]
    pub const fn get(&self, register: CpuidRegister) -> u32 {
        match register {
            CpuidRegister::Eax => self.eax,
            CpuidRegister::Ebx => self.ebx,
            CpuidRegister::Ecx => self.ecx,
            CpuidRegister::Edx => self.edx,
        }
    }
}

/// `(leaf, sub-leaf, register, bit) -> feature` row of the x86 decode table.
#[derive(Debug, Clone, Copy)]
pub struct CpuidBit {
    pub leaf: u32,
    pub sub_leaf: u32,
    pub register: CpuidRegister,
    pub bit: u32,
    pub feature: Feature,
}

/// Auxiliary-vector word holding hardware capability bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwcapWord {
    Hwcap,
    Hwcap2,
}

/// `(word, mask) -> feature` row of an ARM decode table. Every bit of `mask` must be set.
#[derive(Debug, Clone, Copy)]
pub struct HwcapBit {
    pub word: HwcapWord,
    pub mask: u64,
    pub feature: Feature,
}

// SPDX-License-Identifier: Apache-2.0

/// Test-only helpers.
///
/// Keep this module lightweight and dependency-free so `cargo test` works out of the box.
pub fn config_test_logger() {
    // Intentionally a no-op.
    // vdot only emits through the `log` facade; tests don't need a logger for correctness.
}

/// Dot product accumulated in f64 from exactly representable f32 products.
pub fn reference_dot(va: &[f32], vb: &[f32]) -> f64 {
    va.iter()
        .zip(vb)
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum()
}

/// Plain f32 accumulation without compensation.
pub fn naive_dot(va: &[f32], vb: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (&a, &b) in va.iter().zip(vb) {
        sum += a * b;
    }
    sum
}

/// `[0, 1, ..., n - 1]` as f32.
pub fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32).collect()
}

/// Exact Σ i² for i in [0, n).
pub fn sum_of_squares(n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (n * (n - 1) * (2 * n - 1) / 6) as f64
}

/// Deterministic pseudo-random f32 values in `[-1, 1)`.
pub fn noise(n: usize, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 8) as f32 / (1u32 << 23) as f32 - 1.0
        })
        .collect()
}

pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        actual.abs()
    } else {
        ((actual - expected) / expected).abs()
    }
}

/// Compiled kernels the executing processor can run, highest priority first.
///
/// Tiers the host lacks are reported on stdout so skipped coverage stays visible.
pub fn host_kernels() -> Vec<crate::dispatch::Kernel> {
    let record = crate::cache::runtime_capabilities();
    crate::dispatch::compiled_kernels()
        .iter()
        .copied()
        .filter(|kernel| {
            let supported = kernel.is_supported_by(&record);
            if !supported {
                println!("test kernel {kernel} ... skipped (not supported by {record})");
            }
            supported
        })
        .collect()
}

// SPDX-License-Identifier: Apache-2.0

//! vdot driver
//!
//! Builds two ramps `a[i] = b[i] = i` of the requested length, runs the dispatched dot
//! product over them and prints the result.
//!
//! ```text
//! vdot 4096
//! vdot 4096 --kernel scalar
//! vdot --capabilities
//! RUST_LOG=trace vdot 16
//! ```

use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use vdot::dispatch::{compiled_kernels, runtime_capabilities, static_capabilities};
use vdot::{
    active_kernel, dot_product_f32, dot_product_f32_with, Kernel, DISPATCH_MODE, STATIC_KERNEL,
};

#[derive(Parser, Debug)]
#[command(name = "vdot")]
#[command(about = "Compensated float32 dot product with CPU capability dispatch")]
struct Args {
    /// Number of elements in each vector (must be greater than zero)
    #[arg(required_unless_present = "capabilities", allow_hyphen_values = true)]
    size: Option<String>,

    /// Force one kernel (avx512, avx, sve, neon, scalar) instead of the dispatcher's choice
    #[arg(short, long)]
    kernel: Option<Kernel>,

    /// Print the detected capability records as JSON and exit
    #[arg(long)]
    capabilities: bool,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_capabilities() -> ExitCode {
    let runtime = runtime_capabilities();
    let report = json!({
        "mode": DISPATCH_MODE,
        "active_kernel": active_kernel(),
        "static_kernel": STATIC_KERNEL,
        "compiled_kernels": compiled_kernels(),
        "static": static_capabilities(),
        "runtime": runtime,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to encode capabilities: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_size(raw: &str) -> Option<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => usize::try_from(n).ok(),
        _ => None,
    }
}

fn ramp(size: usize) -> Option<Vec<f32>> {
    let mut values = Vec::new();
    values.try_reserve_exact(size).ok()?;
    values.extend((0..size).map(|i| i as f32));
    Some(values)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    if args.capabilities {
        return print_capabilities();
    }

    let Some(size) = args.size.as_deref().and_then(parse_size) else {
        eprintln!("Invalid size");
        return ExitCode::FAILURE;
    };

    let (Some(a), Some(b)) = (ramp(size), ramp(size)) else {
        eprintln!("Memory allocation failed");
        return ExitCode::FAILURE;
    };
    debug!("allocated two vectors of {size} f32 elements");

    let result = match args.kernel {
        Some(kernel) => dot_product_f32_with(kernel, &a, &b),
        None => dot_product_f32(&a, &b),
    };
    match result {
        Ok(value) => {
            info!(
                "size={size} kernel={}",
                args.kernel.unwrap_or_else(active_kernel)
            );
            println!("Result: {value:.2}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

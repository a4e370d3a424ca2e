//! Report the device backend this host selects
//!
//! Run with: cargo run --example device_report
//!
//! Set `DEVBLAS_BACKEND` to force a backend and `DEVBLAS_TRACING_PROFILE=debug`
//! to see every forwarded runtime call.

#![allow(deprecated)]

use devblas_device::{BackendKind, Bridge, GpuDevice};
use devblas_tracing::{init_global_tracing, TracingConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_global_tracing(&TracingConfig::from_env())?;

    let bridge = Bridge::from_env()?;
    println!("=== Device Report ===\n");
    println!("Backend: {}", bridge.kind());
    println!("Devices: {}", bridge.get_device_count()?);

    if bridge.kind().has_current_device() {
        match bridge.get_device() {
            Ok(device) => println!("Current device: {device}"),
            Err(err) => println!("Current device: unavailable ({err})"),
        }
    }

    if bridge.kind() == BackendKind::Sycl {
        let mut devices: Vec<GpuDevice> = Vec::new();
        bridge.enumerate_devices(&mut devices)?;
        for device in &devices {
            println!(
                "  [{}] {} ({}, platform {} index {})",
                device.ordinal, device.name, device.device_type, device.platform, device.index
            );
        }
    }

    Ok(())
}

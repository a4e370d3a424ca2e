//! Device selection and device/pinned-host memory release across GPU runtimes
//!
//! This crate provides:
//! - **Bridge**: one call surface for choosing and reporting the active GPU
//!   and for releasing device or pinned host allocations
//! - **Backends**: CUDA and ROCm runtimes, a SYCL-class backend over oneAPI
//!   Level Zero, and a null backend for builds without GPU support
//! - **Active bridge**: the process-wide backend used by the free functions in [`active`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              BLAS front-end / allocation code            │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │  set/get device, count, enumerate, free
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Bridge (active backend)                 │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┬─────────────┐
//!         ▼             ▼             ▼             ▼
//!   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐
//!   │  CUDA   │  │  ROCm   │  │  SYCL   │  │  Null   │
//!   │ cudart  │  │ amdhip  │  │ze_loader│  │         │
//!   └─────────┘  └─────────┘  └─────────┘  └─────────┘
//! ```
//!
//! Vendor runtimes are opened at run time, so no GPU SDK is needed to build.
//! The `cuda`, `rocm` and `sycl` features (all on by default) control which
//! runtimes may be loaded.
//!
//! # Capability matrix
//!
//! | operation                   | CUDA / ROCm        | SYCL               | none        |
//! |-----------------------------|--------------------|--------------------|-------------|
//! | `set_device`                | runtime call       | unsupported        | no backend  |
//! | `internal_set_device`       | runtime call       | no-op              | no backend  |
//! | `get_device`                | runtime call       | unsupported        | no backend  |
//! | `get_device_count`          | runtime call       | GPU count          | 0           |
//! | `enumerate_devices`         | unsupported        | GPU list           | no backend  |
//! | `device_free`               | set device + free  | free in context    | no backend  |
//! | `device_free_unqueued`      | free               | unsupported        | no backend  |
//! | `host_free_pinned`          | free host          | free in context    | no backend  |
//! | `host_free_pinned_unqueued` | free host          | unsupported        | no backend  |
//!
//! # Usage
//!
//! ```rust,no_run
//! use devblas_device::{Bridge, BridgeConfig, BackendSelection, GpuDevice};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = Bridge::from_config(&BridgeConfig::new(BackendSelection::Auto))?;
//! println!("{} backend, {} device(s)", bridge.kind(), bridge.get_device_count()?);
//!
//! let mut devices: Vec<GpuDevice> = Vec::new();
//! match bridge.enumerate_devices(&mut devices) {
//!     Ok(()) => devices.iter().for_each(|d| println!("{}: {}", d.ordinal, d.name)),
//!     Err(err) if err.is_unsupported() => {}
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod active;
pub mod backend;
pub mod backends;
pub mod bridge;
pub mod config;
pub mod error;

// Re-export public API
pub use backend::{
    BackendKind, DeviceBackend, DeviceId, DeviceMemory, DeviceType, GpuDevice, NativeDevice, NativeStream,
    PinnedHostMemory, Queue,
};
pub use backends::{CudaBackend, FakeBackend, NullBackend, RocmBackend, SyclBackend};
pub use bridge::Bridge;
pub use config::{BackendSelection, BridgeConfig};
pub use error::{DeviceError, Result};

//! CUDA runtime backend for NVIDIA GPUs
//!
//! Drives `libcudart` through runtime-loaded entry points.
//!
//! # Usage
//!
//! ```rust,ignore
//! use devblas_device::{CudaBackend, DeviceBackend};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = CudaBackend::load(None)?;
//! backend.set_device(0)?;
//! assert_eq!(backend.get_device()?, 0);
//! # Ok(())
//! # }
//! ```

use super::runtime::{RuntimeBackend, RuntimeFlavor, RuntimeStatus, RuntimeSymbols};
use crate::backend::BackendKind;

/// `cudaErrorNoDevice`
pub const CUDA_ERROR_NO_DEVICE: RuntimeStatus = 100;

#[cfg(windows)]
const CUDART_CANDIDATES: &[&str] = &["cudart64_12.dll", "cudart64_110.dll", "cudart64_101.dll"];
#[cfg(all(unix, not(target_os = "macos")))]
const CUDART_CANDIDATES: &[&str] = &["libcudart.so", "libcudart.so.12", "libcudart.so.11.0"];
#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
const CUDART_CANDIDATES: &[&str] = &[];

/// CUDA runtime flavor
#[derive(Debug, Clone, Copy)]
pub struct Cuda;

impl RuntimeFlavor for Cuda {
    const KIND: BackendKind = BackendKind::Cuda;
    const FEATURE: &'static str = "cuda";
    const ENABLED: bool = cfg!(feature = "cuda");
    const LIBRARY_CANDIDATES: &'static [&'static str] = CUDART_CANDIDATES;
    const SYMBOLS: RuntimeSymbols = RuntimeSymbols {
        set_device: "cudaSetDevice",
        get_device: "cudaGetDevice",
        get_device_count: "cudaGetDeviceCount",
        free: "cudaFree",
        free_host: "cudaFreeHost",
        get_error_string: "cudaGetErrorString",
    };
    const NO_DEVICE: RuntimeStatus = CUDA_ERROR_NO_DEVICE;
}

/// Backend over the CUDA runtime
pub type CudaBackend = RuntimeBackend<Cuda>;

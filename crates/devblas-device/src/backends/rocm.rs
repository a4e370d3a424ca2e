//! ROCm backend for AMD GPUs
//!
//! Drives the HIP runtime (`libamdhip64`) through runtime-loaded entry points,
//! so no ROCm install is needed at build time and any installed version works.

use super::runtime::{RuntimeBackend, RuntimeFlavor, RuntimeStatus, RuntimeSymbols};
use crate::backend::BackendKind;

/// `hipErrorNoDevice`
pub const HIP_ERROR_NO_DEVICE: RuntimeStatus = 100;

#[cfg(windows)]
const HIP_CANDIDATES: &[&str] = &["amdhip64_6.dll", "amdhip64.dll"];
#[cfg(all(unix, not(target_os = "macos")))]
const HIP_CANDIDATES: &[&str] = &["libamdhip64.so", "libamdhip64.so.6", "libamdhip64.so.5"];
#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
const HIP_CANDIDATES: &[&str] = &[];

/// HIP runtime flavor
#[derive(Debug, Clone, Copy)]
pub struct Rocm;

impl RuntimeFlavor for Rocm {
    const KIND: BackendKind = BackendKind::Rocm;
    const FEATURE: &'static str = "rocm";
    const ENABLED: bool = cfg!(feature = "rocm");
    const LIBRARY_CANDIDATES: &'static [&'static str] = HIP_CANDIDATES;
    const SYMBOLS: RuntimeSymbols = RuntimeSymbols {
        set_device: "hipSetDevice",
        get_device: "hipGetDevice",
        get_device_count: "hipGetDeviceCount",
        free: "hipFree",
        free_host: "hipHostFree",
        get_error_string: "hipGetErrorString",
    };
    const NO_DEVICE: RuntimeStatus = HIP_ERROR_NO_DEVICE;
}

/// Backend over the HIP runtime
pub type RocmBackend = RuntimeBackend<Rocm>;

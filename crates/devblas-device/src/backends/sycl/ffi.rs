//! Runtime-loaded oneAPI Level Zero entry points
//!
//! Only the driver/device enumeration and memory-free subset is bound.

use std::ffi::{c_char, c_void};

use libloading::Library;

use crate::backend::{BackendKind, DeviceType};
use crate::backends::loader::symbol;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub type ZeResult = u32;
pub const ZE_RESULT_SUCCESS: ZeResult = 0;
pub const ZE_RESULT_ERROR_DEVICE_LOST: ZeResult = 0x7000_0001;
pub const ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY: ZeResult = 0x7000_0002;
pub const ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY: ZeResult = 0x7000_0003;
pub const ZE_RESULT_ERROR_UNINITIALIZED: ZeResult = 0x7800_0001;
pub const ZE_RESULT_ERROR_UNSUPPORTED_VERSION: ZeResult = 0x7800_0002;
pub const ZE_RESULT_ERROR_UNSUPPORTED_FEATURE: ZeResult = 0x7800_0003;
pub const ZE_RESULT_ERROR_INVALID_ARGUMENT: ZeResult = 0x7800_0004;
pub const ZE_RESULT_ERROR_INVALID_NULL_HANDLE: ZeResult = 0x7800_0005;
pub const ZE_RESULT_ERROR_INVALID_NULL_POINTER: ZeResult = 0x7800_0007;
pub const ZE_RESULT_ERROR_UNKNOWN: ZeResult = 0x7fff_fffe;

/// Level Zero has no error-string lookup in its core API
pub fn result_name(code: ZeResult) -> &'static str {
    match code {
        ZE_RESULT_SUCCESS => "ZE_RESULT_SUCCESS",
        ZE_RESULT_ERROR_DEVICE_LOST => "ZE_RESULT_ERROR_DEVICE_LOST",
        ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY => "ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY",
        ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY => "ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY",
        ZE_RESULT_ERROR_UNINITIALIZED => "ZE_RESULT_ERROR_UNINITIALIZED",
        ZE_RESULT_ERROR_UNSUPPORTED_VERSION => "ZE_RESULT_ERROR_UNSUPPORTED_VERSION",
        ZE_RESULT_ERROR_UNSUPPORTED_FEATURE => "ZE_RESULT_ERROR_UNSUPPORTED_FEATURE",
        ZE_RESULT_ERROR_INVALID_ARGUMENT => "ZE_RESULT_ERROR_INVALID_ARGUMENT",
        ZE_RESULT_ERROR_INVALID_NULL_HANDLE => "ZE_RESULT_ERROR_INVALID_NULL_HANDLE",
        ZE_RESULT_ERROR_INVALID_NULL_POINTER => "ZE_RESULT_ERROR_INVALID_NULL_POINTER",
        ZE_RESULT_ERROR_UNKNOWN => "ZE_RESULT_ERROR_UNKNOWN",
        _ => "unrecognized Level Zero result",
    }
}

// ---------------------------------------------------------------------------
// Handles and structures
// ---------------------------------------------------------------------------

pub type ZeDriverHandle = *mut c_void;
pub type ZeDeviceHandle = *mut c_void;
pub type ZeContextHandle = *mut c_void;

pub const ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES: u32 = 0x3;

pub const ZE_DEVICE_TYPE_GPU: u32 = 1;
pub const ZE_DEVICE_TYPE_CPU: u32 = 2;
pub const ZE_DEVICE_TYPE_FPGA: u32 = 3;
pub const ZE_DEVICE_TYPE_MCA: u32 = 4;
pub const ZE_DEVICE_TYPE_VPU: u32 = 5;

pub const ZE_MAX_DEVICE_UUID_SIZE: usize = 16;
pub const ZE_MAX_DEVICE_NAME: usize = 256;

/// `ze_device_properties_t`
#[repr(C)]
#[derive(Clone)]
pub struct ZeDeviceProperties {
    pub stype: u32,
    pub p_next: *mut c_void,
    pub device_type: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub flags: u32,
    pub subdevice_id: u32,
    pub core_clock_rate: u32,
    pub max_mem_alloc_size: u64,
    pub max_hardware_contexts: u32,
    pub max_command_queue_priority: u32,
    pub num_threads_per_eu: u32,
    pub physical_eu_simd_width: u32,
    pub num_eus_per_subslice: u32,
    pub num_subslices_per_slice: u32,
    pub num_slices: u32,
    pub timer_resolution: u64,
    pub timestamp_valid_bits: u32,
    pub kernel_timestamp_valid_bits: u32,
    pub uuid: [u8; ZE_MAX_DEVICE_UUID_SIZE],
    pub name: [c_char; ZE_MAX_DEVICE_NAME],
}

impl ZeDeviceProperties {
    /// Zeroed properties with the structure type the driver expects
    pub fn new() -> Self {
        Self {
            stype: ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES,
            p_next: std::ptr::null_mut(),
            device_type: 0,
            vendor_id: 0,
            device_id: 0,
            flags: 0,
            subdevice_id: 0,
            core_clock_rate: 0,
            max_mem_alloc_size: 0,
            max_hardware_contexts: 0,
            max_command_queue_priority: 0,
            num_threads_per_eu: 0,
            physical_eu_simd_width: 0,
            num_eus_per_subslice: 0,
            num_subslices_per_slice: 0,
            num_slices: 0,
            timer_resolution: 0,
            timestamp_valid_bits: 0,
            kernel_timestamp_valid_bits: 0,
            uuid: [0; ZE_MAX_DEVICE_UUID_SIZE],
            name: [0; ZE_MAX_DEVICE_NAME],
        }
    }

    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn classify(&self) -> DeviceType {
        match self.device_type {
            ZE_DEVICE_TYPE_GPU => DeviceType::Gpu,
            ZE_DEVICE_TYPE_CPU => DeviceType::Cpu,
            ZE_DEVICE_TYPE_FPGA => DeviceType::Fpga,
            ZE_DEVICE_TYPE_MCA | ZE_DEVICE_TYPE_VPU => DeviceType::Accelerator,
            other => DeviceType::Other(other),
        }
    }
}

impl Default for ZeDeviceProperties {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub(crate) type FnZeInit = unsafe extern "C" fn(u32) -> ZeResult;
pub(crate) type FnZeDriverGet = unsafe extern "C" fn(*mut u32, *mut ZeDriverHandle) -> ZeResult;
pub(crate) type FnZeDeviceGet = unsafe extern "C" fn(ZeDriverHandle, *mut u32, *mut ZeDeviceHandle) -> ZeResult;
pub(crate) type FnZeDeviceGetProperties = unsafe extern "C" fn(ZeDeviceHandle, *mut ZeDeviceProperties) -> ZeResult;
pub(crate) type FnZeMemFree = unsafe extern "C" fn(ZeContextHandle, *mut c_void) -> ZeResult;

pub(crate) struct LevelZeroApi {
    pub(super) _lib: Option<Library>,
    pub(super) ze_init: FnZeInit,
    pub(super) ze_driver_get: FnZeDriverGet,
    pub(super) ze_device_get: FnZeDeviceGet,
    pub(super) ze_device_get_properties: FnZeDeviceGetProperties,
    pub(super) ze_mem_free: FnZeMemFree,
}

impl LevelZeroApi {
    pub(crate) fn load(lib: Library) -> Result<Self> {
        let backend = BackendKind::Sycl;
        unsafe {
            Ok(Self {
                ze_init: symbol::<FnZeInit>(&lib, backend, "zeInit")?,
                ze_driver_get: symbol::<FnZeDriverGet>(&lib, backend, "zeDriverGet")?,
                ze_device_get: symbol::<FnZeDeviceGet>(&lib, backend, "zeDeviceGet")?,
                ze_device_get_properties: symbol::<FnZeDeviceGetProperties>(&lib, backend, "zeDeviceGetProperties")?,
                ze_mem_free: symbol::<FnZeMemFree>(&lib, backend, "zeMemFree")?,
                _lib: Some(lib),
            })
        }
    }
}

//! Runtime-loaded entry points shared by the CUDA and HIP runtimes
//!
//! Both runtimes expose the same shape for the calls this layer needs: an
//! integer status, `SetDevice`/`GetDevice`/`GetDeviceCount`, a device free,
//! a pinned-host free, and an error-string lookup.

use std::ffi::{c_char, c_int, c_void, CStr};

use libloading::Library;

use crate::backend::BackendKind;
use crate::backends::loader::symbol;
use crate::error::Result;

pub type RuntimeStatus = c_int;
pub const RUNTIME_SUCCESS: RuntimeStatus = 0;

pub(crate) type FnSetDevice = unsafe extern "C" fn(c_int) -> RuntimeStatus;
pub(crate) type FnGetDevice = unsafe extern "C" fn(*mut c_int) -> RuntimeStatus;
pub(crate) type FnGetDeviceCount = unsafe extern "C" fn(*mut c_int) -> RuntimeStatus;
pub(crate) type FnFree = unsafe extern "C" fn(*mut c_void) -> RuntimeStatus;
pub(crate) type FnFreeHost = unsafe extern "C" fn(*mut c_void) -> RuntimeStatus;
pub(crate) type FnGetErrorString = unsafe extern "C" fn(RuntimeStatus) -> *const c_char;

/// Exported symbol names of one runtime
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSymbols {
    pub set_device: &'static str,
    pub get_device: &'static str,
    pub get_device_count: &'static str,
    pub free: &'static str,
    pub free_host: &'static str,
    pub get_error_string: &'static str,
}

pub(crate) struct RuntimeApi {
    pub(super) _lib: Option<Library>,
    pub(super) set_device: FnSetDevice,
    pub(super) get_device: FnGetDevice,
    pub(super) get_device_count: FnGetDeviceCount,
    pub(super) free: FnFree,
    pub(super) free_host: FnFreeHost,
    pub(super) get_error_string: FnGetErrorString,
}

impl RuntimeApi {
    /// Resolve every entry point from `lib`, which is kept alive alongside them
    pub(crate) fn load(backend: BackendKind, lib: Library, symbols: &RuntimeSymbols) -> Result<Self> {
        unsafe {
            Ok(Self {
                set_device: symbol::<FnSetDevice>(&lib, backend, symbols.set_device)?,
                get_device: symbol::<FnGetDevice>(&lib, backend, symbols.get_device)?,
                get_device_count: symbol::<FnGetDeviceCount>(&lib, backend, symbols.get_device_count)?,
                free: symbol::<FnFree>(&lib, backend, symbols.free)?,
                free_host: symbol::<FnFreeHost>(&lib, backend, symbols.free_host)?,
                get_error_string: symbol::<FnGetErrorString>(&lib, backend, symbols.get_error_string)?,
                _lib: Some(lib),
            })
        }
    }

    /// The runtime's own diagnostic text for `status`
    pub(crate) fn error_string(&self, status: RuntimeStatus) -> String {
        let text = unsafe { (self.get_error_string)(status) };
        if text.is_null() {
            return format!("unknown error {status}");
        }
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}

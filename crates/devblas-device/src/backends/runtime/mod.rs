//! Current-device runtimes (CUDA and HIP)
//!
//! CUDA and ROCm share one backend implementation: both keep a process-global
//! current device, free device memory in the current device's context, and
//! report failures as integer statuses with a string lookup. A
//! [`RuntimeFlavor`] supplies what differs between them.
//!
//! ```text
//! RuntimeBackend<F>
//! ├── RuntimeApi    - entry points resolved from the loaded library
//! └── F             - library names, symbol names, "no device" status
//! ```

pub(crate) mod ffi;

use std::ffi::c_int;
use std::marker::PhantomData;
use std::path::Path;

use crate::backend::{BackendKind, DeviceBackend, DeviceId, DeviceMemory, PinnedHostMemory, Queue};
use crate::backends::loader;
use crate::error::{DeviceError, Result};

pub use ffi::{RuntimeStatus, RuntimeSymbols, RUNTIME_SUCCESS};
use ffi::RuntimeApi;

/// Static description of a current-device runtime
pub trait RuntimeFlavor: Send + Sync + 'static {
    const KIND: BackendKind;
    /// Cargo feature that enables loading this runtime
    const FEATURE: &'static str;
    const ENABLED: bool;
    /// Library names tried, in order, when no explicit path is configured
    const LIBRARY_CANDIDATES: &'static [&'static str];
    const SYMBOLS: RuntimeSymbols;
    /// Status returned by the device-count query when no device is present
    const NO_DEVICE: RuntimeStatus;
}

/// Backend over a runtime-loaded CUDA-style runtime
pub struct RuntimeBackend<F: RuntimeFlavor> {
    api: RuntimeApi,
    _flavor: PhantomData<F>,
}

impl<F: RuntimeFlavor> RuntimeBackend<F> {
    /// Load the runtime from `library`, or from the platform default names
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::RuntimeUnavailable`] if:
    /// - the crate was built without this runtime's feature
    /// - no candidate library could be opened
    /// - a required entry point is missing
    pub fn load(library: Option<&Path>) -> Result<Self> {
        if !F::ENABLED {
            return Err(DeviceError::unavailable(
                F::KIND,
                format!("built without the `{}` feature", F::FEATURE),
            ));
        }

        let lib = loader::open_library(F::KIND, library, F::LIBRARY_CANDIDATES)?;
        let api = RuntimeApi::load(F::KIND, lib, &F::SYMBOLS)?;
        Ok(Self::with_api(api))
    }

    /// Check whether the runtime library can be loaded on this system
    pub fn is_available() -> bool {
        Self::load(None).is_ok()
    }

    pub(crate) fn with_api(api: RuntimeApi) -> Self {
        Self {
            api,
            _flavor: PhantomData,
        }
    }

    fn check(&self, op: &'static str, call: &'static str, status: RuntimeStatus) -> Result<()> {
        if status == RUNTIME_SUCCESS {
            return Ok(());
        }
        Err(DeviceError::Runtime {
            op,
            backend: F::KIND,
            call,
            code: i64::from(status),
            message: self.api.error_string(status),
        })
    }

    fn select_device(&self, op: &'static str, device: DeviceId) -> Result<()> {
        tracing::debug!(backend = %F::KIND, device, call = F::SYMBOLS.set_device, "selecting device");
        let status = unsafe { (self.api.set_device)(device) };
        self.check(op, F::SYMBOLS.set_device, status)
    }

    fn free_device_memory(&self, op: &'static str, memory: DeviceMemory) -> Result<()> {
        tracing::debug!(backend = %F::KIND, ptr = memory.addr(), call = F::SYMBOLS.free, "freeing device memory");
        let status = unsafe { (self.api.free)(memory.into_raw()) };
        self.check(op, F::SYMBOLS.free, status)
    }

    fn free_pinned_memory(&self, op: &'static str, memory: PinnedHostMemory) -> Result<()> {
        tracing::debug!(backend = %F::KIND, ptr = memory.addr(), call = F::SYMBOLS.free_host, "freeing pinned memory");
        let status = unsafe { (self.api.free_host)(memory.into_raw()) };
        self.check(op, F::SYMBOLS.free_host, status)
    }
}

impl<F: RuntimeFlavor> DeviceBackend for RuntimeBackend<F> {
    fn kind(&self) -> BackendKind {
        F::KIND
    }

    fn set_device(&self, device: DeviceId) -> Result<()> {
        self.select_device("set_device", device)
    }

    fn set_device_internal(&self, device: DeviceId) -> Result<()> {
        self.select_device("internal_set_device", device)
    }

    fn get_device(&self) -> Result<DeviceId> {
        let mut device: c_int = -1;
        let status = unsafe { (self.api.get_device)(&mut device) };
        self.check("get_device", F::SYMBOLS.get_device, status)?;
        Ok(device)
    }

    fn device_count(&self) -> Result<usize> {
        let mut count: c_int = 0;
        let status = unsafe { (self.api.get_device_count)(&mut count) };
        if status == F::NO_DEVICE {
            tracing::debug!(backend = %F::KIND, "runtime reports no device present");
            return Ok(0);
        }
        self.check("get_device_count", F::SYMBOLS.get_device_count, status)?;
        Ok(count.max(0) as usize)
    }

    fn device_free(&self, memory: DeviceMemory, queue: &Queue) -> Result<()> {
        self.select_device("device_free", queue.device())?;
        self.free_device_memory("device_free", memory)
    }

    fn device_free_unqueued(&self, memory: DeviceMemory) -> Result<()> {
        self.free_device_memory("device_free", memory)
    }

    // Host memory needs no device affinity.
    fn host_free_pinned(&self, memory: PinnedHostMemory, _queue: &Queue) -> Result<()> {
        self.free_pinned_memory("host_free_pinned", memory)
    }

    fn host_free_pinned_unqueued(&self, memory: PinnedHostMemory) -> Result<()> {
        self.free_pinned_memory("host_free_pinned", memory)
    }
}

#[cfg(test)]
pub(crate) mod fake_runtime {
    //! In-process stand-ins for the runtime entry points, with thread-local
    //! state so each test sees its own "runtime".

    use super::ffi::{RuntimeApi, RuntimeStatus, RUNTIME_SUCCESS};
    use std::cell::{Cell, RefCell};
    use std::ffi::{c_char, c_int, c_void};

    pub const INVALID_DEVICE: RuntimeStatus = 101;
    pub const INVALID_VALUE: RuntimeStatus = 1;

    /// Operations observed by the fake runtime, in call order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        SetDevice(c_int),
        Free { ptr: usize, device: c_int },
        FreeHost { ptr: usize },
    }

    thread_local! {
        static DEVICES: Cell<c_int> = const { Cell::new(1) };
        static CURRENT: Cell<c_int> = const { Cell::new(0) };
        static COUNT_STATUS: Cell<RuntimeStatus> = const { Cell::new(RUNTIME_SUCCESS) };
        static CALLS: RefCell<Vec<Call>> = const { RefCell::new(Vec::new()) };
    }

    pub fn reset(devices: c_int) {
        DEVICES.with(|d| d.set(devices));
        CURRENT.with(|c| c.set(0));
        COUNT_STATUS.with(|s| s.set(RUNTIME_SUCCESS));
        CALLS.with(|c| c.borrow_mut().clear());
    }

    pub fn fail_count_with(status: RuntimeStatus) {
        COUNT_STATUS.with(|s| s.set(status));
    }

    pub fn calls() -> Vec<Call> {
        CALLS.with(|c| c.borrow().clone())
    }

    unsafe extern "C" fn set_device(device: c_int) -> RuntimeStatus {
        if device < 0 || device >= DEVICES.with(Cell::get) {
            return INVALID_DEVICE;
        }
        CURRENT.with(|c| c.set(device));
        CALLS.with(|c| c.borrow_mut().push(Call::SetDevice(device)));
        RUNTIME_SUCCESS
    }

    unsafe extern "C" fn get_device(device: *mut c_int) -> RuntimeStatus {
        *device = CURRENT.with(Cell::get);
        RUNTIME_SUCCESS
    }

    unsafe extern "C" fn get_device_count(count: *mut c_int) -> RuntimeStatus {
        let status = COUNT_STATUS.with(Cell::get);
        if status == RUNTIME_SUCCESS {
            *count = DEVICES.with(Cell::get);
        }
        status
    }

    unsafe extern "C" fn free(ptr: *mut c_void) -> RuntimeStatus {
        // 0xdead stands in for a pointer the runtime does not own.
        if ptr as usize == 0xdead {
            return INVALID_VALUE;
        }
        let device = CURRENT.with(Cell::get);
        CALLS.with(|c| c.borrow_mut().push(Call::Free { ptr: ptr as usize, device }));
        RUNTIME_SUCCESS
    }

    unsafe extern "C" fn free_host(ptr: *mut c_void) -> RuntimeStatus {
        CALLS.with(|c| c.borrow_mut().push(Call::FreeHost { ptr: ptr as usize }));
        RUNTIME_SUCCESS
    }

    unsafe extern "C" fn get_error_string(status: RuntimeStatus) -> *const c_char {
        let text: &'static [u8] = match status {
            INVALID_VALUE => b"invalid argument\0",
            INVALID_DEVICE => b"invalid device ordinal\0",
            _ => b"unrecognized error code\0",
        };
        text.as_ptr().cast()
    }

    pub fn api() -> RuntimeApi {
        RuntimeApi {
            _lib: None,
            set_device,
            get_device,
            get_device_count,
            free,
            free_host,
            get_error_string,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake_runtime::{self, Call};
    use super::*;
    use crate::backend::NativeStream;
    use crate::backends::cuda::Cuda;
    use crate::backends::rocm::Rocm;
    use proptest::prelude::*;

    fn cuda(devices: c_int) -> RuntimeBackend<Cuda> {
        fake_runtime::reset(devices);
        RuntimeBackend::with_api(fake_runtime::api())
    }

    fn device_memory(addr: usize) -> DeviceMemory {
        unsafe { DeviceMemory::from_raw(addr as *mut _) }.unwrap()
    }

    fn pinned_memory(addr: usize) -> PinnedHostMemory {
        unsafe { PinnedHostMemory::from_raw(addr as *mut _) }.unwrap()
    }

    #[test]
    fn test_single_device_scenario() {
        let backend = cuda(1);
        backend.set_device(0).unwrap();
        assert_eq!(backend.get_device().unwrap(), 0);
        assert_eq!(backend.device_count().unwrap(), 1);
    }

    #[test]
    fn test_no_device_status_counts_as_zero() {
        let backend = cuda(4);
        fake_runtime::fail_count_with(Cuda::NO_DEVICE);
        assert_eq!(backend.device_count().unwrap(), 0);
    }

    #[test]
    fn test_other_count_failures_surface() {
        let backend = cuda(4);
        fake_runtime::fail_count_with(fake_runtime::INVALID_VALUE);
        let err = backend.device_count().unwrap_err();
        match err {
            DeviceError::Runtime {
                op,
                backend,
                call,
                code,
                message,
            } => {
                assert_eq!(op, "get_device_count");
                assert_eq!(backend, BackendKind::Cuda);
                assert_eq!(call, "cudaGetDeviceCount");
                assert_eq!(code, 1);
                assert_eq!(message, "invalid argument");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_device_is_runtime_error() {
        let backend = cuda(2);
        let err = backend.set_device(7).unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.op(), Some("set_device"));
        assert!(err.to_string().contains("invalid device ordinal"));
    }

    #[test]
    fn test_internal_set_device_names_its_operation() {
        let backend = cuda(1);
        let err = backend.set_device_internal(3).unwrap_err();
        assert_eq!(err.op(), Some("internal_set_device"));
    }

    #[test]
    fn test_queue_free_restores_affinity_first() {
        let backend = cuda(4);
        backend.set_device(0).unwrap();

        let queue = Queue::new(2, NativeStream::null());
        backend.device_free(device_memory(0x1000), &queue).unwrap();

        assert_eq!(
            fake_runtime::calls(),
            vec![
                Call::SetDevice(0),
                Call::SetDevice(2),
                Call::Free { ptr: 0x1000, device: 2 },
            ]
        );
        assert_eq!(backend.get_device().unwrap(), 2);
    }

    #[test]
    fn test_queue_free_on_invalid_device_does_not_free() {
        let backend = cuda(1);
        let queue = Queue::new(5, NativeStream::null());
        let err = backend.device_free(device_memory(0x1000), &queue).unwrap_err();
        assert_eq!(err.op(), Some("device_free"));
        assert!(fake_runtime::calls().is_empty());
    }

    #[test]
    fn test_unqueued_free_uses_current_device() {
        let backend = cuda(3);
        backend.set_device(1).unwrap();
        backend.device_free_unqueued(device_memory(0x2000)).unwrap();
        assert_eq!(
            fake_runtime::calls().last(),
            Some(&Call::Free { ptr: 0x2000, device: 1 })
        );
    }

    #[test]
    fn test_free_failure_carries_runtime_text() {
        let backend = cuda(1);
        let err = backend.device_free_unqueued(device_memory(0xdead)).unwrap_err();
        assert_eq!(err.op(), Some("device_free"));
        assert!(err.to_string().contains("cudaFree"));
        assert!(err.to_string().contains("invalid argument"));
    }

    #[test]
    fn test_pinned_free_leaves_current_device_alone() {
        let backend = cuda(4);
        backend.set_device(3).unwrap();

        let queue = Queue::new(1, NativeStream::null());
        backend.host_free_pinned(pinned_memory(0x3000), &queue).unwrap();
        backend.host_free_pinned_unqueued(pinned_memory(0x4000)).unwrap();

        assert_eq!(
            fake_runtime::calls(),
            vec![
                Call::SetDevice(3),
                Call::FreeHost { ptr: 0x3000 },
                Call::FreeHost { ptr: 0x4000 },
            ]
        );
        assert_eq!(backend.get_device().unwrap(), 3);
    }

    #[test]
    fn test_enumeration_is_unsupported() {
        let backend = cuda(2);
        let err = backend.enumerate_devices(&mut Vec::new()).unwrap_err();
        assert_eq!(err, DeviceError::unsupported("enumerate_devices", BackendKind::Cuda));
    }

    #[test]
    fn test_rocm_flavor_names_hip_calls() {
        fake_runtime::reset(1);
        let backend: RuntimeBackend<Rocm> = RuntimeBackend::with_api(fake_runtime::api());
        assert_eq!(backend.kind(), BackendKind::Rocm);

        let err = backend.set_device(9).unwrap_err();
        match err {
            DeviceError::Runtime { backend, call, .. } => {
                assert_eq!(backend, BackendKind::Rocm);
                assert_eq!(call, "hipSetDevice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn prop_set_then_get_round_trips(devices in 1..16i32, pick in 0..16i32) {
            let device = pick % devices;
            let backend = cuda(devices);
            backend.set_device(device).unwrap();
            prop_assert_eq!(backend.get_device().unwrap(), device);
        }

        #[test]
        fn prop_count_is_never_negative(devices in -4..16i32) {
            let backend = cuda(devices);
            let count = backend.device_count().unwrap();
            prop_assert_eq!(count, devices.max(0) as usize);
        }
    }
}

//! SYCL-class backend
//!
//! Drives oneAPI Level Zero, the native runtime underneath SYCL on Intel GPUs.
//! Level Zero drivers play the role of SYCL platforms, and freeing is always
//! anchored to the context carried by the caller's [`Queue`]:
//!
//! ```text
//! sycl::platform::get_platforms()   ->  zeDriverGet
//! platform.get_devices()            ->  zeDeviceGet
//! device.is_gpu()                   ->  zeDeviceGetProperties().type == GPU
//! sycl::free(ptr, queue)            ->  zeMemFree(queue.stream(), ptr)
//! ```
//!
//! There is no process-global current device, so the queue-less deprecated
//! operations are unsupported and the internal device switch is a no-op.

pub(crate) mod ffi;

use std::ffi::c_void;
use std::path::Path;
use std::sync::OnceLock;

use crate::backend::{
    BackendKind, DeviceBackend, DeviceId, DeviceMemory, GpuDevice, NativeDevice, PinnedHostMemory, Queue,
};
use crate::backends::loader;
use crate::error::{DeviceError, Result};

use ffi::{
    result_name, LevelZeroApi, ZeDeviceHandle, ZeDeviceProperties, ZeDriverHandle, ZeResult,
    ZE_RESULT_ERROR_UNINITIALIZED, ZE_RESULT_SUCCESS,
};

#[cfg(windows)]
const LEVEL_ZERO_CANDIDATES: &[&str] = &["ze_loader.dll"];
#[cfg(all(unix, not(target_os = "macos")))]
const LEVEL_ZERO_CANDIDATES: &[&str] = &["libze_loader.so.1", "libze_loader.so"];
#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
const LEVEL_ZERO_CANDIDATES: &[&str] = &[];

/// Backend over the Level Zero loader
pub struct SyclBackend {
    api: LevelZeroApi,
    init_status: OnceLock<ZeResult>,
}

impl SyclBackend {
    /// Load the Level Zero loader from `library`, or from the platform default names
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::RuntimeUnavailable`] if the `sycl` feature is
    /// disabled, the loader cannot be opened, or an entry point is missing.
    pub fn load(library: Option<&Path>) -> Result<Self> {
        if !cfg!(feature = "sycl") {
            return Err(DeviceError::unavailable(
                BackendKind::Sycl,
                "built without the `sycl` feature",
            ));
        }

        let lib = loader::open_library(BackendKind::Sycl, library, LEVEL_ZERO_CANDIDATES)?;
        Ok(Self::with_api(LevelZeroApi::load(lib)?))
    }

    /// Check whether the Level Zero loader can be loaded on this system
    pub fn is_available() -> bool {
        Self::load(None).is_ok()
    }

    pub(crate) fn with_api(api: LevelZeroApi) -> Self {
        Self {
            api,
            init_status: OnceLock::new(),
        }
    }

    fn check(&self, op: &'static str, call: &'static str, status: ZeResult) -> Result<()> {
        if status == ZE_RESULT_SUCCESS {
            return Ok(());
        }
        Err(DeviceError::Runtime {
            op,
            backend: BackendKind::Sycl,
            call,
            code: i64::from(status),
            message: result_name(status).to_string(),
        })
    }

    /// Initialize the driver stack once; `false` means no driver is installed
    fn initialized(&self, op: &'static str) -> Result<bool> {
        let status = *self.init_status.get_or_init(|| unsafe { (self.api.ze_init)(0) });
        if status == ZE_RESULT_ERROR_UNINITIALIZED {
            tracing::debug!("no Level Zero driver present");
            return Ok(false);
        }
        self.check(op, "zeInit", status)?;
        Ok(true)
    }

    fn drivers(&self, op: &'static str) -> Result<Vec<ZeDriverHandle>> {
        if !self.initialized(op)? {
            return Ok(Vec::new());
        }

        let mut count = 0u32;
        self.check(op, "zeDriverGet", unsafe {
            (self.api.ze_driver_get)(&mut count, std::ptr::null_mut())
        })?;
        let mut drivers = vec![std::ptr::null_mut(); count as usize];
        if count > 0 {
            self.check(op, "zeDriverGet", unsafe {
                (self.api.ze_driver_get)(&mut count, drivers.as_mut_ptr())
            })?;
            drivers.truncate(count as usize);
        }
        Ok(drivers)
    }

    fn devices(&self, op: &'static str, driver: ZeDriverHandle) -> Result<Vec<ZeDeviceHandle>> {
        let mut count = 0u32;
        self.check(op, "zeDeviceGet", unsafe {
            (self.api.ze_device_get)(driver, &mut count, std::ptr::null_mut())
        })?;
        let mut devices = vec![std::ptr::null_mut(); count as usize];
        if count > 0 {
            self.check(op, "zeDeviceGet", unsafe {
                (self.api.ze_device_get)(driver, &mut count, devices.as_mut_ptr())
            })?;
            devices.truncate(count as usize);
        }
        Ok(devices)
    }

    fn properties(&self, op: &'static str, device: ZeDeviceHandle) -> Result<ZeDeviceProperties> {
        let mut props = ZeDeviceProperties::new();
        self.check(op, "zeDeviceGetProperties", unsafe {
            (self.api.ze_device_get_properties)(device, &mut props)
        })?;
        Ok(props)
    }

    /// Visit every device of every driver in platform-then-device order
    fn for_each_device<F>(&self, op: &'static str, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, usize, ZeDeviceHandle, &ZeDeviceProperties),
    {
        for (platform, driver) in self.drivers(op)?.into_iter().enumerate() {
            for (index, device) in self.devices(op, driver)?.into_iter().enumerate() {
                let props = self.properties(op, device)?;
                visit(platform, index, device, &props);
            }
        }
        Ok(())
    }

    fn free_in_context(&self, op: &'static str, ptr: *mut c_void, queue: &Queue) -> Result<()> {
        tracing::debug!(ptr = ptr as usize, context = queue.stream().as_raw() as usize, "zeMemFree");
        let status = unsafe { (self.api.ze_mem_free)(queue.stream().as_raw(), ptr) };
        self.check(op, "zeMemFree", status)
    }
}

impl DeviceBackend for SyclBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sycl
    }

    fn set_device(&self, _device: DeviceId) -> Result<()> {
        Err(DeviceError::unsupported("set_device", BackendKind::Sycl))
    }

    // The queue carries its own device context; there is nothing to set.
    fn set_device_internal(&self, _device: DeviceId) -> Result<()> {
        Ok(())
    }

    fn get_device(&self) -> Result<DeviceId> {
        Err(DeviceError::unsupported("get_device", BackendKind::Sycl))
    }

    fn device_count(&self) -> Result<usize> {
        let mut count = 0usize;
        self.for_each_device("get_device_count", |_, _, _, props| {
            if props.classify().is_gpu() {
                count += 1;
            }
        })?;
        Ok(count)
    }

    fn enumerate_devices(&self, out: &mut Vec<GpuDevice>) -> Result<()> {
        let count = self.device_count()?;
        // Re-populate even when the length already matches; stale entries
        // must not survive a hardware change.
        out.clear();
        out.reserve(count);

        self.for_each_device("enumerate_devices", |platform, index, handle, props| {
            let device_type = props.classify();
            if device_type.is_gpu() {
                out.push(GpuDevice {
                    ordinal: out.len(),
                    platform,
                    index,
                    name: props.name(),
                    device_type,
                    handle: NativeDevice::from_raw(handle),
                });
            }
        })
    }

    fn device_free(&self, memory: DeviceMemory, queue: &Queue) -> Result<()> {
        self.free_in_context("device_free", memory.into_raw(), queue)
    }

    fn device_free_unqueued(&self, _memory: DeviceMemory) -> Result<()> {
        // Freeing needs a context, which only a queue provides.
        Err(DeviceError::unsupported("device_free", BackendKind::Sycl))
    }

    fn host_free_pinned(&self, memory: PinnedHostMemory, queue: &Queue) -> Result<()> {
        self.free_in_context("host_free_pinned", memory.into_raw(), queue)
    }

    fn host_free_pinned_unqueued(&self, _memory: PinnedHostMemory) -> Result<()> {
        Err(DeviceError::unsupported("host_free_pinned", BackendKind::Sycl))
    }
}


#[cfg(test)]
mod tests {
    use super::ffi::{ZE_DEVICE_TYPE_CPU, ZE_DEVICE_TYPE_FPGA, ZE_DEVICE_TYPE_GPU, ZE_RESULT_ERROR_DEVICE_LOST};
    use super::*;
    use crate::backend::{DeviceType, NativeStream};

    fn backend(drivers: Vec<Vec<u32>>) -> SyclBackend {
        fake_level_zero::reset(drivers);
        SyclBackend::with_api(fake_level_zero::api())
    }

    fn queue(context: usize) -> Queue {
        Queue::new(0, NativeStream::from_raw(context as *mut c_void))
    }

    fn device_memory(addr: usize) -> DeviceMemory {
        unsafe { DeviceMemory::from_raw(addr as *mut c_void) }.unwrap()
    }

    fn pinned_memory(addr: usize) -> PinnedHostMemory {
        unsafe { PinnedHostMemory::from_raw(addr as *mut c_void) }.unwrap()
    }

    #[test]
    fn test_counts_only_gpus_across_platforms() {
        let backend = backend(vec![
            vec![ZE_DEVICE_TYPE_GPU, ZE_DEVICE_TYPE_CPU],
            vec![ZE_DEVICE_TYPE_FPGA, ZE_DEVICE_TYPE_GPU, ZE_DEVICE_TYPE_GPU],
        ]);
        assert_eq!(backend.device_count().unwrap(), 3);
    }

    #[test]
    fn test_missing_driver_counts_as_zero() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU]]);
        fake_level_zero::fail_init_with(ZE_RESULT_ERROR_UNINITIALIZED);
        assert_eq!(backend.device_count().unwrap(), 0);

        let mut out = Vec::new();
        backend.enumerate_devices(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_init_failure_surfaces() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU]]);
        fake_level_zero::fail_init_with(ZE_RESULT_ERROR_DEVICE_LOST);
        let err = backend.device_count().unwrap_err();
        match err {
            DeviceError::Runtime { op, call, message, .. } => {
                assert_eq!(op, "get_device_count");
                assert_eq!(call, "zeInit");
                assert_eq!(message, "ZE_RESULT_ERROR_DEVICE_LOST");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enumerate_matches_count_in_platform_order() {
        let backend = backend(vec![
            vec![ZE_DEVICE_TYPE_CPU, ZE_DEVICE_TYPE_GPU],
            vec![ZE_DEVICE_TYPE_GPU],
        ]);

        let mut out = Vec::new();
        backend.enumerate_devices(&mut out).unwrap();

        assert_eq!(out.len(), backend.device_count().unwrap());
        assert!(out.iter().all(GpuDevice::is_gpu));
        assert_eq!(
            out.iter().map(|d| (d.ordinal, d.platform, d.index)).collect::<Vec<_>>(),
            vec![(0, 0, 1), (1, 1, 0)]
        );
        assert_eq!(out[0].name, "fake device 0.1");
        assert_eq!(out[1].device_type, DeviceType::Gpu);
    }

    #[test]
    fn test_enumerate_repopulates_presized_output() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU, ZE_DEVICE_TYPE_GPU]]);

        let mut out = Vec::new();
        backend.enumerate_devices(&mut out).unwrap();
        assert_eq!(out.len(), 2);

        // Same size as the device count: must not append duplicates
        backend.enumerate_devices(&mut out).unwrap();
        assert_eq!(out.len(), 2);

        fake_level_zero::add_device(0, ZE_DEVICE_TYPE_GPU);
        backend.enumerate_devices(&mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].ordinal, 2);
    }

    #[test]
    fn test_global_device_operations_are_unsupported() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU]]);
        assert!(backend.set_device(0).unwrap_err().is_unsupported());
        assert!(backend.get_device().unwrap_err().is_unsupported());
        assert!(backend.device_free_unqueued(device_memory(0x10)).unwrap_err().is_unsupported());
        assert!(backend.host_free_pinned_unqueued(pinned_memory(0x20)).unwrap_err().is_unsupported());
        assert!(fake_level_zero::freed().is_empty());
    }

    #[test]
    fn test_internal_set_device_is_noop() {
        let backend = backend(Vec::new());
        backend.set_device_internal(5).unwrap();
    }

    #[test]
    fn test_queue_frees_use_queue_context() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU]]);
        backend.device_free(device_memory(0x1000), &queue(0xc0)).unwrap();
        backend.host_free_pinned(pinned_memory(0x2000), &queue(0xc1)).unwrap();
        assert_eq!(fake_level_zero::freed(), vec![(0xc0, 0x1000), (0xc1, 0x2000)]);
    }

    #[test]
    fn test_free_with_null_context_is_runtime_error() {
        let backend = backend(vec![vec![ZE_DEVICE_TYPE_GPU]]);
        let err = backend.device_free(device_memory(0x1000), &queue(0)).unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.op(), Some("device_free"));
        assert!(err.to_string().contains("ZE_RESULT_ERROR_INVALID_NULL_HANDLE"));
    }

    #[test]
    fn test_sycl_device_count_when_available() {
        if let Ok(backend) = SyclBackend::load(None) {
            // Without a working driver the count query reports a runtime error.
            if let Err(err) = backend.device_count() {
                assert!(err.is_runtime(), "{err}");
            }
        }
    }
}

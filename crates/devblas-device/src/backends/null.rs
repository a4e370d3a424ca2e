//! Backend used when no GPU runtime is configured
//!
//! Every device-mutating or querying operation fails with
//! [`DeviceError::NoBackendConfigured`]; the device count degrades to zero.

use crate::backend::{BackendKind, DeviceBackend, DeviceId, DeviceMemory, GpuDevice, PinnedHostMemory, Queue};
use crate::error::{DeviceError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    pub const fn new() -> Self {
        Self
    }
}

impl DeviceBackend for NullBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::None
    }

    fn set_device(&self, _device: DeviceId) -> Result<()> {
        Err(DeviceError::no_backend("set_device"))
    }

    fn set_device_internal(&self, _device: DeviceId) -> Result<()> {
        Err(DeviceError::no_backend("internal_set_device"))
    }

    fn get_device(&self) -> Result<DeviceId> {
        Err(DeviceError::no_backend("get_device"))
    }

    fn device_count(&self) -> Result<usize> {
        Ok(0)
    }

    fn enumerate_devices(&self, _out: &mut Vec<GpuDevice>) -> Result<()> {
        Err(DeviceError::no_backend("enumerate_devices"))
    }

    fn device_free(&self, _memory: DeviceMemory, _queue: &Queue) -> Result<()> {
        Err(DeviceError::no_backend("device_free"))
    }

    fn device_free_unqueued(&self, _memory: DeviceMemory) -> Result<()> {
        Err(DeviceError::no_backend("device_free"))
    }

    fn host_free_pinned(&self, _memory: PinnedHostMemory, _queue: &Queue) -> Result<()> {
        Err(DeviceError::no_backend("host_free_pinned"))
    }

    fn host_free_pinned_unqueued(&self, _memory: PinnedHostMemory) -> Result<()> {
        Err(DeviceError::no_backend("host_free_pinned"))
    }
}

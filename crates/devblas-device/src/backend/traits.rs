//! Backend trait for device selection and memory release
//!
//! Each GPU runtime family implements this trait. Exactly one implementation
//! is active per [`Bridge`](crate::Bridge).

use super::types::{BackendKind, DeviceId, DeviceMemory, GpuDevice, PinnedHostMemory, Queue};
use crate::error::{DeviceError, Result};

/// Device/memory capability set of a GPU runtime
///
/// ```text
///                      DeviceBackend
///                            │
///      ┌──────────────┬──────┴───────┬──────────────┐
///      ▼              ▼              ▼              ▼
/// ┌─────────┐    ┌─────────┐    ┌─────────┐    ┌─────────┐
/// │  CUDA   │    │  ROCm   │    │  SYCL   │    │  Null   │
/// │ cudart  │    │  HIP    │    │ L0      │    │         │
/// └─────────┘    └─────────┘    └─────────┘    └─────────┘
/// ```
///
/// # Current-device model
///
/// CUDA and ROCm keep a process-global "current device" register owned by the
/// vendor runtime. It is shared mutable state with no locking in this layer:
/// callers that switch devices from several threads must serialize those
/// calls themselves. SYCL-class runtimes have no such register; every
/// operation is anchored to a [`Queue`].
///
/// # Errors
///
/// Implementations report an operation that makes no sense for their runtime
/// with [`DeviceError::UnsupportedBackend`], the absence of a GPU runtime with
/// [`DeviceError::NoBackendConfigured`], and failures of the runtime itself
/// with [`DeviceError::Runtime`]. They never fall through silently.
pub trait DeviceBackend: Send + Sync {
    /// Runtime family of this backend
    fn kind(&self) -> BackendKind;

    /// Set the process-global current device (deprecated public entry point)
    fn set_device(&self, device: DeviceId) -> Result<()>;

    /// Restore device affinity before a device-sensitive runtime call
    ///
    /// A no-op where the runtime has no current-device register.
    fn set_device_internal(&self, device: DeviceId) -> Result<()>;

    /// Query the process-global current device
    fn get_device(&self) -> Result<DeviceId>;

    /// Number of GPU devices visible to the runtime
    ///
    /// "No device present" is zero devices, not an error.
    fn device_count(&self) -> Result<usize>;

    /// Re-populate `out` with the runtime's GPU devices
    fn enumerate_devices(&self, out: &mut Vec<GpuDevice>) -> Result<()> {
        let _ = out;
        Err(DeviceError::unsupported("enumerate_devices", self.kind()))
    }

    /// Free device memory within the context of `queue`'s device
    fn device_free(&self, memory: DeviceMemory, queue: &Queue) -> Result<()>;

    /// Free device memory on the current device (deprecated)
    fn device_free_unqueued(&self, memory: DeviceMemory) -> Result<()>;

    /// Free pinned host memory allocated against `queue`
    fn host_free_pinned(&self, memory: PinnedHostMemory, queue: &Queue) -> Result<()>;

    /// Free pinned host memory without a queue (deprecated)
    fn host_free_pinned_unqueued(&self, memory: PinnedHostMemory) -> Result<()>;
}

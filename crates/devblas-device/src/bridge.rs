//! Bridge handle over the selected backend

use std::fmt;
use std::sync::Arc;

use crate::backend::{BackendKind, DeviceBackend, DeviceId, DeviceMemory, GpuDevice, PinnedHostMemory, Queue};
use crate::backends::{self, NullBackend};
use crate::config::BridgeConfig;
use crate::error::Result;

/// Device selection and memory release against one backend
///
/// Cloning is cheap: clones share the backend.
///
/// # Example
///
/// ```
/// use devblas_device::{BackendKind, Bridge};
///
/// let bridge = Bridge::null();
/// assert_eq!(bridge.kind(), BackendKind::None);
/// assert_eq!(bridge.get_device_count().unwrap(), 0);
/// assert!(bridge.internal_set_device(0).unwrap_err().is_no_backend());
/// ```
#[derive(Clone)]
pub struct Bridge {
    backend: Arc<dyn DeviceBackend>,
}

impl Bridge {
    pub fn new(backend: impl DeviceBackend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn DeviceBackend>) -> Self {
        Self { backend }
    }

    /// Bridge with no GPU support
    pub fn null() -> Self {
        Self::new(NullBackend)
    }

    /// Select and load a backend
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeUnavailable`](crate::DeviceError::RuntimeUnavailable)
    /// if an explicitly selected runtime cannot be loaded.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        backends::select(config).map(Self::from_arc)
    }

    /// Select a backend from `DEVBLAS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(&BridgeConfig::from_env())
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &Arc<dyn DeviceBackend> {
        &self.backend
    }

    /// Make `device` the current device of the calling process
    ///
    /// Unsupported on SYCL-class backends.
    #[deprecated(note = "pass a Queue to the operation instead of relying on the current device")]
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn set_device(&self, device: DeviceId) -> Result<()> {
        self.backend.set_device(device)
    }

    /// Restore device affinity ahead of a device-sensitive call
    ///
    /// Succeeds without effect on SYCL-class backends.
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn internal_set_device(&self, device: DeviceId) -> Result<()> {
        self.backend.set_device_internal(device)
    }

    /// Current device of the calling process
    #[deprecated(note = "track the device through a Queue instead")]
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn get_device(&self) -> Result<DeviceId> {
        self.backend.get_device()
    }

    /// Number of GPUs visible to the backend; zero without a backend
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn get_device_count(&self) -> Result<usize> {
        self.backend.device_count()
    }

    /// Replace the contents of `devices` with the backend's GPUs
    ///
    /// Only SYCL-class backends can enumerate. On success `devices` holds
    /// exactly [`get_device_count`](Self::get_device_count) entries.
    #[tracing::instrument(level = "debug", skip(self, devices), fields(backend = %self.kind()))]
    pub fn enumerate_devices(&self, devices: &mut Vec<GpuDevice>) -> Result<()> {
        self.backend.enumerate_devices(devices)
    }

    /// Release device memory allocated on `queue`'s device
    ///
    /// The handle is consumed even when the runtime reports a failure.
    #[tracing::instrument(level = "debug", skip(self, queue), fields(backend = %self.kind(), device = queue.device()))]
    pub fn device_free(&self, memory: DeviceMemory, queue: &Queue) -> Result<()> {
        self.backend.device_free(memory, queue)
    }

    /// Release device memory on the current device
    #[deprecated(note = "use device_free with the Queue the memory was allocated on")]
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn device_free_unqueued(&self, memory: DeviceMemory) -> Result<()> {
        self.backend.device_free_unqueued(memory)
    }

    /// Release pinned host memory allocated against `queue`
    #[tracing::instrument(level = "debug", skip(self, queue), fields(backend = %self.kind(), device = queue.device()))]
    pub fn host_free_pinned(&self, memory: PinnedHostMemory, queue: &Queue) -> Result<()> {
        self.backend.host_free_pinned(memory, queue)
    }

    /// Release pinned host memory without a queue
    #[deprecated(note = "use host_free_pinned with the Queue the memory was allocated against")]
    #[tracing::instrument(level = "debug", skip(self), fields(backend = %self.kind()))]
    pub fn host_free_pinned_unqueued(&self, memory: PinnedHostMemory) -> Result<()> {
        self.backend.host_free_pinned_unqueued(memory)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge").field("backend", &self.kind()).finish()
    }
}

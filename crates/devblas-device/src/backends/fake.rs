//! In-process fake backend for tests
//!
//! Mimics the capability matrix of any [`BackendKind`] without a GPU runtime:
//! it keeps a simulated current device for CUDA/ROCm, enumerates synthetic
//! GPUs for SYCL, behaves exactly like [`NullBackend`] for `None`, and records
//! every free so tests of code built on the bridge can assert on them.

use parking_lot::Mutex;

use super::null::NullBackend;
use crate::backend::{
    BackendKind, DeviceBackend, DeviceId, DeviceMemory, DeviceType, GpuDevice, NativeDevice, PinnedHostMemory, Queue,
};
use crate::error::{DeviceError, Result};

/// Status reported when a device identifier is out of range
pub const FAKE_INVALID_DEVICE: i64 = 101;

/// Which free primitive released an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Device,
    PinnedHost,
}

/// One release observed by a [`FakeBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRecord {
    pub memory: MemoryKind,
    pub addr: usize,
    /// Device current at the time of a device free (CUDA/ROCm only)
    pub device: Option<DeviceId>,
    /// Native stream of the queue the free was anchored to, if any
    pub stream: Option<usize>,
}

#[derive(Debug)]
pub struct FakeBackend {
    kind: BackendKind,
    devices: usize,
    current: Mutex<DeviceId>,
    freed: Mutex<Vec<FreeRecord>>,
}

impl FakeBackend {
    /// Fake `kind` runtime exposing `devices` GPUs
    pub fn new(kind: BackendKind, devices: usize) -> Self {
        Self {
            kind,
            devices,
            current: Mutex::new(0),
            freed: Mutex::new(Vec::new()),
        }
    }

    /// Releases recorded so far, in call order
    pub fn freed(&self) -> Vec<FreeRecord> {
        self.freed.lock().clone()
    }

    /// Simulated current device, regardless of whether the kind exposes one
    pub fn current_device(&self) -> DeviceId {
        *self.current.lock()
    }

    fn select(&self, op: &'static str, device: DeviceId) -> Result<()> {
        let valid = usize::try_from(device).map(|d| d < self.devices).unwrap_or(false);
        if !valid {
            return Err(DeviceError::Runtime {
                op,
                backend: self.kind,
                call: "fakeSetDevice",
                code: FAKE_INVALID_DEVICE,
                message: "invalid device ordinal".to_string(),
            });
        }
        *self.current.lock() = device;
        Ok(())
    }

    fn record(&self, memory: MemoryKind, addr: usize, device: Option<DeviceId>, queue: Option<&Queue>) {
        self.freed.lock().push(FreeRecord {
            memory,
            addr,
            device,
            stream: queue.map(|q| q.stream().as_raw() as usize),
        });
    }
}

impl DeviceBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn set_device(&self, device: DeviceId) -> Result<()> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => self.select("set_device", device),
            BackendKind::Sycl => Err(DeviceError::unsupported("set_device", self.kind)),
            BackendKind::None => NullBackend.set_device(device),
        }
    }

    fn set_device_internal(&self, device: DeviceId) -> Result<()> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => self.select("internal_set_device", device),
            BackendKind::Sycl => Ok(()),
            BackendKind::None => NullBackend.set_device_internal(device),
        }
    }

    fn get_device(&self) -> Result<DeviceId> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => Ok(self.current_device()),
            BackendKind::Sycl => Err(DeviceError::unsupported("get_device", self.kind)),
            BackendKind::None => NullBackend.get_device(),
        }
    }

    fn device_count(&self) -> Result<usize> {
        match self.kind {
            BackendKind::None => NullBackend.device_count(),
            _ => Ok(self.devices),
        }
    }

    fn enumerate_devices(&self, out: &mut Vec<GpuDevice>) -> Result<()> {
        match self.kind {
            BackendKind::Sycl => {
                out.clear();
                out.extend((0..self.devices).map(|ordinal| GpuDevice {
                    ordinal,
                    platform: 0,
                    index: ordinal,
                    name: format!("fake gpu {ordinal}"),
                    device_type: DeviceType::Gpu,
                    handle: NativeDevice::from_raw((ordinal + 1) as *mut _),
                }));
                Ok(())
            }
            BackendKind::None => NullBackend.enumerate_devices(out),
            _ => Err(DeviceError::unsupported("enumerate_devices", self.kind)),
        }
    }

    fn device_free(&self, memory: DeviceMemory, queue: &Queue) -> Result<()> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => {
                self.select("device_free", queue.device())?;
                self.record(MemoryKind::Device, memory.addr(), Some(queue.device()), Some(queue));
                Ok(())
            }
            BackendKind::Sycl => {
                self.record(MemoryKind::Device, memory.addr(), None, Some(queue));
                Ok(())
            }
            BackendKind::None => NullBackend.device_free(memory, queue),
        }
    }

    fn device_free_unqueued(&self, memory: DeviceMemory) -> Result<()> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => {
                self.record(MemoryKind::Device, memory.addr(), Some(self.current_device()), None);
                Ok(())
            }
            BackendKind::Sycl => Err(DeviceError::unsupported("device_free", self.kind)),
            BackendKind::None => NullBackend.device_free_unqueued(memory),
        }
    }

    fn host_free_pinned(&self, memory: PinnedHostMemory, queue: &Queue) -> Result<()> {
        match self.kind {
            BackendKind::None => NullBackend.host_free_pinned(memory, queue),
            _ => {
                self.record(MemoryKind::PinnedHost, memory.addr(), None, Some(queue));
                Ok(())
            }
        }
    }

    fn host_free_pinned_unqueued(&self, memory: PinnedHostMemory) -> Result<()> {
        match self.kind {
            BackendKind::Cuda | BackendKind::Rocm => {
                self.record(MemoryKind::PinnedHost, memory.addr(), None, None);
                Ok(())
            }
            BackendKind::Sycl => Err(DeviceError::unsupported("host_free_pinned", self.kind)),
            BackendKind::None => NullBackend.host_free_pinned_unqueued(memory),
        }
    }
}

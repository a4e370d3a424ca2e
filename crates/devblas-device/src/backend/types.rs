//! Handle and descriptor types shared by every backend

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

/// Device identifier, meaningful only to the active backend's runtime
///
/// The bridge never validates identifiers; they are forwarded as-is.
pub type DeviceId = i32;

/// Which runtime family a backend drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CUDA runtime (NVIDIA)
    Cuda,
    /// HIP runtime (AMD ROCm)
    Rocm,
    /// SYCL-class runtime, driven through oneAPI Level Zero
    Sycl,
    /// No GPU support
    None,
}

impl BackendKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Rocm => "rocm",
            Self::Sycl => "sycl",
            Self::None => "none",
        }
    }

    /// Whether the runtime keeps a process-global "current device"
    ///
    /// CUDA and ROCm do; SYCL-class runtimes anchor every operation to a queue.
    pub const fn has_current_device(self) -> bool {
        matches!(self, Self::Cuda | Self::Rocm)
    }

    /// Whether a GPU runtime backs this kind at all
    pub const fn is_configured(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native execution stream or context handle carried by a [`Queue`]
///
/// CUDA/ROCm interpret it as a stream; the SYCL-class backend interprets it as
/// the Level Zero context the queue's allocations belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeStream(*mut c_void);

// Native handles are opaque tokens owned by the vendor runtime, which is
// internally synchronized.
unsafe impl Send for NativeStream {}
unsafe impl Sync for NativeStream {}

impl NativeStream {
    pub const fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    /// The runtime's default (null) stream
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub const fn as_raw(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for NativeStream {
    fn default() -> Self {
        Self::null()
    }
}

/// Execution queue owned by the caller
///
/// Pairs a device identifier with the native stream used to anchor backend
/// operations without relying on the global current device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queue {
    device: DeviceId,
    stream: NativeStream,
}

impl Queue {
    pub const fn new(device: DeviceId, stream: NativeStream) -> Self {
        Self { device, stream }
    }

    pub const fn device(&self) -> DeviceId {
        self.device
    }

    pub const fn stream(&self) -> NativeStream {
        self.stream
    }
}

macro_rules! memory_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, Hash)]
        pub struct $name(NonNull<c_void>);

        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            /// Take ownership of a pointer returned by the companion allocator
            ///
            /// Returns `None` for a null pointer.
            ///
            /// # Safety
            ///
            /// `ptr` must come from the matching allocation function of the
            /// active backend and must not be owned by any other handle. The
            /// bridge does not detect double frees of re-wrapped pointers.
            pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            /// Give up ownership without freeing
            pub fn into_raw(self) -> *mut c_void {
                self.0.as_ptr()
            }

            pub fn as_ptr(&self) -> *mut c_void {
                self.0.as_ptr()
            }

            pub fn addr(&self) -> usize {
                self.0.as_ptr() as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.addr())
            }
        }
    };
}

memory_handle! {
    /// Device-resident allocation from `device_malloc`
    ///
    /// Consumed by value when freed; the handle is not `Clone`.
    DeviceMemory
}

memory_handle! {
    /// Pinned host allocation from `host_malloc_pinned`
    PinnedHostMemory
}

/// Classification a runtime reports for an enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Gpu,
    Cpu,
    Fpga,
    Accelerator,
    Other(u32),
}

impl DeviceType {
    pub fn is_gpu(self) -> bool {
        self == Self::Gpu
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "GPU"),
            Self::Cpu => write!(f, "CPU"),
            Self::Fpga => write!(f, "FPGA"),
            Self::Accelerator => write!(f, "accelerator"),
            Self::Other(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Opaque native device handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeDevice(*mut c_void);

unsafe impl Send for NativeDevice {}
unsafe impl Sync for NativeDevice {}

impl NativeDevice {
    pub const fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> *mut c_void {
        self.0
    }
}

/// A device found by [`enumerate_devices`](crate::Bridge::enumerate_devices)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDevice {
    /// Position in the enumeration (platform-then-device order)
    pub ordinal: usize,
    /// Index of the platform (driver) exposing the device
    pub platform: usize,
    /// Index of the device within its platform
    pub index: usize,
    pub name: String,
    pub device_type: DeviceType,
    pub handle: NativeDevice,
}

impl GpuDevice {
    pub fn is_gpu(&self) -> bool {
        self.device_type.is_gpu()
    }
}

//! Backend interface and shared types

pub mod traits;
pub mod types;

pub use traits::DeviceBackend;
pub use types::{
    BackendKind, DeviceId, DeviceMemory, DeviceType, GpuDevice, NativeDevice, NativeStream, PinnedHostMemory, Queue,
};

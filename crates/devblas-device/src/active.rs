//! Process-wide active bridge
//!
//! Exactly one bridge is active per process. It is chosen by [`init`] or
//! [`install`], or lazily from the environment on first use. The free
//! functions here dispatch to it and mirror the methods of [`Bridge`].
//!
//! Swapping the active bridge while other threads issue calls is safe; calls
//! already in flight finish against the bridge they started with.

use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::backend::{BackendKind, DeviceId, DeviceMemory, GpuDevice, PinnedHostMemory, Queue};
use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::Result;

static ACTIVE: OnceLock<RwLock<Option<Bridge>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Bridge>> {
    ACTIVE.get_or_init(|| RwLock::new(None))
}

/// Make `bridge` the active bridge, returning the one it replaces
pub fn install(bridge: Bridge) -> Option<Bridge> {
    tracing::info!(backend = %bridge.kind(), "installing active device bridge");
    slot().write().replace(bridge)
}

/// Select a backend from `config` and make it active
///
/// The previous bridge stays active when selection fails.
pub fn init(config: &BridgeConfig) -> Result<BackendKind> {
    let bridge = Bridge::from_config(config)?;
    let kind = bridge.kind();
    install(bridge);
    Ok(kind)
}

/// The active bridge, selected from the environment if none is set yet
///
/// A failed selection is returned and not remembered; the next call retries.
pub fn current() -> Result<Bridge> {
    if let Some(bridge) = slot().read().as_ref() {
        return Ok(bridge.clone());
    }

    let mut guard = slot().write();
    if let Some(bridge) = guard.as_ref() {
        return Ok(bridge.clone());
    }
    let bridge = Bridge::from_env()?;
    *guard = Some(bridge.clone());
    Ok(bridge)
}

/// Clear the active bridge so the next call selects again
pub fn reset() -> Option<Bridge> {
    slot().write().take()
}

/// See [`Bridge::set_device`]
#[deprecated(note = "pass a Queue to the operation instead of relying on the current device")]
#[allow(deprecated)]
pub fn set_device(device: DeviceId) -> Result<()> {
    current()?.set_device(device)
}

/// See [`Bridge::internal_set_device`]
pub fn internal_set_device(device: DeviceId) -> Result<()> {
    current()?.internal_set_device(device)
}

/// See [`Bridge::get_device`]
#[deprecated(note = "track the device through a Queue instead")]
#[allow(deprecated)]
pub fn get_device() -> Result<DeviceId> {
    current()?.get_device()
}

/// See [`Bridge::get_device_count`]
pub fn get_device_count() -> Result<usize> {
    current()?.get_device_count()
}

/// See [`Bridge::enumerate_devices`]
pub fn enumerate_devices(devices: &mut Vec<GpuDevice>) -> Result<()> {
    current()?.enumerate_devices(devices)
}

/// See [`Bridge::device_free`]
pub fn device_free(memory: DeviceMemory, queue: &Queue) -> Result<()> {
    current()?.device_free(memory, queue)
}

/// See [`Bridge::device_free_unqueued`]
#[deprecated(note = "use device_free with the Queue the memory was allocated on")]
#[allow(deprecated)]
pub fn device_free_unqueued(memory: DeviceMemory) -> Result<()> {
    current()?.device_free_unqueued(memory)
}

/// See [`Bridge::host_free_pinned`]
pub fn host_free_pinned(memory: PinnedHostMemory, queue: &Queue) -> Result<()> {
    current()?.host_free_pinned(memory, queue)
}

/// See [`Bridge::host_free_pinned_unqueued`]
#[deprecated(note = "use host_free_pinned with the Queue the memory was allocated against")]
#[allow(deprecated)]
pub fn host_free_pinned_unqueued(memory: PinnedHostMemory) -> Result<()> {
    current()?.host_free_pinned_unqueued(memory)
}

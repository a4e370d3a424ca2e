//! Backend implementations for each GPU runtime family
//!
//! This module contains:
//! - `runtime` - Shared implementation for CUDA-style runtimes (current device + free/free-host)
//! - `cuda` - CUDA runtime flavor (NVIDIA GPUs)
//! - `rocm` - HIP runtime flavor (AMD GPUs)
//! - `sycl` - SYCL-class backend over oneAPI Level Zero (Intel GPUs)
//! - `null` - No GPU support configured
//! - `fake` - In-process fake for tests of code built on the bridge

pub mod cuda;
pub mod fake;
pub(crate) mod loader;
pub mod null;
pub mod rocm;
pub mod runtime;
pub mod sycl;

use std::sync::Arc;

use crate::backend::{BackendKind, DeviceBackend};
use crate::config::{BackendSelection, BridgeConfig};
use crate::error::Result;

// Re-export backends
pub use cuda::CudaBackend;
pub use fake::{FakeBackend, FreeRecord, MemoryKind};
pub use null::NullBackend;
pub use rocm::RocmBackend;
pub use runtime::{RuntimeBackend, RuntimeFlavor};
pub use sycl::SyclBackend;

/// Load the backend named by `config`
///
/// `Auto` settles on the first of CUDA, ROCm and SYCL whose runtime loads and
/// falls back to [`NullBackend`]. An explicit selection is never downgraded.
///
/// # Errors
///
/// Returns [`RuntimeUnavailable`](crate::DeviceError::RuntimeUnavailable) when an explicitly selected
/// runtime cannot be loaded.
pub fn select(config: &BridgeConfig) -> Result<Arc<dyn DeviceBackend>> {
    let backend = match config.backend {
        BackendSelection::Auto => auto_select(config),
        BackendSelection::Cuda => load(BackendKind::Cuda, config)?,
        BackendSelection::Rocm => load(BackendKind::Rocm, config)?,
        BackendSelection::Sycl => load(BackendKind::Sycl, config)?,
        BackendSelection::None => Arc::new(NullBackend),
    };

    tracing::info!(
        selection = %config.backend,
        backend = %backend.kind(),
        "device backend selected"
    );
    Ok(backend)
}

fn auto_select(config: &BridgeConfig) -> Arc<dyn DeviceBackend> {
    for kind in [BackendKind::Cuda, BackendKind::Rocm, BackendKind::Sycl] {
        match load(kind, config) {
            Ok(backend) => return backend,
            Err(err) => tracing::debug!(backend = %kind, error = %err, "skipping backend"),
        }
    }
    Arc::new(NullBackend)
}

fn load(kind: BackendKind, config: &BridgeConfig) -> Result<Arc<dyn DeviceBackend>> {
    Ok(match kind {
        BackendKind::Cuda => Arc::new(CudaBackend::load(config.cuda_runtime.as_deref())?),
        BackendKind::Rocm => Arc::new(RocmBackend::load(config.hip_runtime.as_deref())?),
        BackendKind::Sycl => Arc::new(SyclBackend::load(config.level_zero_loader.as_deref())?),
        BackendKind::None => Arc::new(NullBackend),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::DeviceError;

    fn missing(name: &str) -> Option<PathBuf> {
        Some(PathBuf::from(format!("/nonexistent/devblas/{name}")))
    }

    #[test]
    fn test_none_selection_is_null_backend() {
        let config = BridgeConfig {
            backend: BackendSelection::None,
            ..Default::default()
        };
        let backend = select(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::None);
        assert_eq!(backend.device_count().unwrap(), 0);
    }

    #[test]
    fn test_explicit_selection_is_not_downgraded() {
        let config = BridgeConfig {
            backend: BackendSelection::Rocm,
            hip_runtime: missing("libamdhip64.so"),
            ..Default::default()
        };
        match select(&config) {
            Err(DeviceError::RuntimeUnavailable { backend, .. }) => assert_eq!(backend, BackendKind::Rocm),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(backend) => panic!("selected {} from a missing library", backend.kind()),
        }
    }

    #[test]
    fn test_auto_falls_back_to_null() {
        let config = BridgeConfig {
            backend: BackendSelection::Auto,
            cuda_runtime: missing("libcudart.so"),
            hip_runtime: missing("libamdhip64.so"),
            level_zero_loader: missing("libze_loader.so"),
        };
        assert_eq!(select(&config).unwrap().kind(), BackendKind::None);
    }
}

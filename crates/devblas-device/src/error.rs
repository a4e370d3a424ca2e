//! Error types for device and memory operations

use crate::backend::BackendKind;

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors surfaced by the device bridge
///
/// Every operation resolves to success, [`DeviceError::UnsupportedBackend`],
/// [`DeviceError::NoBackendConfigured`], or a [`DeviceError::Runtime`] error
/// reported by the vendor runtime itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The vendor runtime rejected the forwarded call
    #[error("{op}: {call} failed on {backend} backend with status {code}: {message}")]
    Runtime {
        op: &'static str,
        backend: BackendKind,
        call: &'static str,
        code: i64,
        message: String,
    },

    /// The operation has no meaningful implementation on the active backend
    #[error("{op}: unsupported function for {backend} backend")]
    UnsupportedBackend { op: &'static str, backend: BackendKind },

    /// No GPU backend is active
    #[error("{op}: device support not available (no backend configured)")]
    NoBackendConfigured { op: &'static str },

    /// The selected backend's runtime library could not be loaded
    #[error("{backend} runtime unavailable: {reason}")]
    RuntimeUnavailable { backend: BackendKind, reason: String },

    /// Configuration could not be interpreted
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DeviceError {
    /// Create an unsupported-operation error
    pub fn unsupported(op: &'static str, backend: BackendKind) -> Self {
        Self::UnsupportedBackend { op, backend }
    }

    /// Create a no-backend error
    pub fn no_backend(op: &'static str) -> Self {
        Self::NoBackendConfigured { op }
    }

    /// Create a runtime-unavailable error
    pub fn unavailable(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::RuntimeUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Name of the bridge operation that failed, if the error came from one
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Self::Runtime { op, .. } | Self::UnsupportedBackend { op, .. } | Self::NoBackendConfigured { op } => {
                Some(op)
            }
            Self::RuntimeUnavailable { .. } | Self::InvalidConfig(_) => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedBackend { .. })
    }

    pub fn is_no_backend(&self) -> bool {
        matches!(self, Self::NoBackendConfigured { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime { .. })
    }
}

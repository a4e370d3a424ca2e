//! Backend selection configuration

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

pub const BACKEND_ENV: &str = "DEVBLAS_BACKEND";
pub const CUDA_RUNTIME_ENV: &str = "DEVBLAS_CUDA_RUNTIME";
pub const HIP_RUNTIME_ENV: &str = "DEVBLAS_HIP_RUNTIME";
pub const LEVEL_ZERO_LOADER_ENV: &str = "DEVBLAS_LEVEL_ZERO_LOADER";

/// Which backend to bring up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSelection {
    /// First loadable of CUDA, ROCm and SYCL, else none
    #[default]
    Auto,
    Cuda,
    Rocm,
    Sycl,
    None,
}

impl BackendSelection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cuda => "cuda",
            Self::Rocm => "rocm",
            Self::Sycl => "sycl",
            Self::None => "none",
        }
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendSelection {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cuda" => Ok(Self::Cuda),
            "rocm" | "hip" => Ok(Self::Rocm),
            "sycl" | "level_zero" | "levelzero" => Ok(Self::Sycl),
            "none" => Ok(Self::None),
            other => Err(DeviceError::InvalidConfig(format!(
                "unknown backend `{other}` (expected auto, cuda, rocm, sycl or none)"
            ))),
        }
    }
}

/// Runtime selection and library locations
///
/// Every field is optional in serialized form. Library paths override the
/// platform default names the loaders try.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub backend: BackendSelection,
    pub cuda_runtime: Option<PathBuf>,
    pub hip_runtime: Option<PathBuf>,
    pub level_zero_loader: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn new(backend: BackendSelection) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Build a configuration from `DEVBLAS_*` environment variables
    ///
    /// # Environment Variables
    ///
    /// - `DEVBLAS_BACKEND` - `auto` (default), `cuda`, `rocm`, `sycl`, or `none`
    /// - `DEVBLAS_CUDA_RUNTIME` - Path to the CUDA runtime library
    /// - `DEVBLAS_HIP_RUNTIME` - Path to the HIP runtime library
    /// - `DEVBLAS_LEVEL_ZERO_LOADER` - Path to the Level Zero loader
    ///
    /// An unrecognized backend name is logged and treated as `auto`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var(BACKEND_ENV) {
            if !value.trim().is_empty() {
                match value.parse() {
                    Ok(backend) => config.backend = backend,
                    Err(err) => tracing::warn!(
                        variable = BACKEND_ENV,
                        value = %value,
                        error = %err,
                        "ignoring backend selection"
                    ),
                }
            }
        }

        config.cuda_runtime = path_from_env(CUDA_RUNTIME_ENV);
        config.hip_runtime = path_from_env(HIP_RUNTIME_ENV);
        config.level_zero_loader = path_from_env(LEVEL_ZERO_LOADER_ENV);
        config
    }

    pub fn with_backend(mut self, backend: BackendSelection) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_cuda_runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.cuda_runtime = Some(path.into());
        self
    }

    pub fn with_hip_runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.hip_runtime = Some(path.into());
        self
    }

    pub fn with_level_zero_loader(mut self, path: impl Into<PathBuf>) -> Self {
        self.level_zero_loader = Some(path.into());
        self
    }
}

fn path_from_env(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|value| !value.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [BACKEND_ENV, CUDA_RUNTIME_ENV, HIP_RUNTIME_ENV, LEVEL_ZERO_LOADER_ENV] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_selection_parses_case_insensitively() {
        assert_eq!("CUDA".parse::<BackendSelection>().unwrap(), BackendSelection::Cuda);
        assert_eq!(" Rocm ".parse::<BackendSelection>().unwrap(), BackendSelection::Rocm);
        assert_eq!("hip".parse::<BackendSelection>().unwrap(), BackendSelection::Rocm);
        assert_eq!("Level_Zero".parse::<BackendSelection>().unwrap(), BackendSelection::Sycl);
        assert_eq!("none".parse::<BackendSelection>().unwrap(), BackendSelection::None);
    }

    #[test]
    fn test_unknown_selection_is_invalid_config() {
        let err = "metal".parse::<BackendSelection>().unwrap_err();
        assert!(matches!(err, DeviceError::InvalidConfig(_)));
        assert!(err.to_string().contains("metal"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: BridgeConfig = serde_json::from_str(r#"{"backend":"sycl"}"#).unwrap();
        assert_eq!(config, BridgeConfig::new(BackendSelection::Sycl));

        let config: BridgeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backend, BackendSelection::Auto);
    }

    #[test]
    fn test_serialize_uses_lowercase_names() {
        let config = BridgeConfig::default()
            .with_backend(BackendSelection::Rocm)
            .with_hip_runtime("/opt/rocm/lib/libamdhip64.so");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["backend"], "rocm");
        assert_eq!(json["hip_runtime"], "/opt/rocm/lib/libamdhip64.so");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_defaults() {
        clear_env();
        env::set_var(BACKEND_ENV, "Cuda");
        env::set_var(CUDA_RUNTIME_ENV, "/usr/local/cuda/lib64/libcudart.so");
        env::set_var(HIP_RUNTIME_ENV, "");

        let config = BridgeConfig::from_env();
        assert_eq!(config.backend, BackendSelection::Cuda);
        assert_eq!(
            config.cuda_runtime.as_deref(),
            Some(std::path::Path::new("/usr/local/cuda/lib64/libcudart.so"))
        );
        assert!(config.hip_runtime.is_none());
        assert!(config.level_zero_loader.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_unknown_backend() {
        clear_env();
        env::set_var(BACKEND_ENV, "opencl");
        assert_eq!(BridgeConfig::from_env().backend, BackendSelection::Auto);
        clear_env();
    }
}

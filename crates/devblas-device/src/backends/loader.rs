//! Runtime library loading via dlopen
//!
//! Vendor runtimes are resolved at run time so that one build can drive any
//! installed runtime without a build-time SDK dependency.

use std::path::Path;

use libloading::Library;

use crate::backend::BackendKind;
use crate::error::{DeviceError, Result};

/// Open the runtime library for `backend`
///
/// An explicit path is tried alone; otherwise each platform candidate is tried
/// in order and the first that loads wins.
pub(crate) fn open_library(backend: BackendKind, explicit: Option<&Path>, candidates: &[&str]) -> Result<Library> {
    if let Some(path) = explicit {
        let lib = unsafe { Library::new(path) }
            .map_err(|err| DeviceError::unavailable(backend, format!("{}: {err}", path.display())))?;
        tracing::debug!(%backend, library = %path.display(), "loaded runtime library");
        return Ok(lib);
    }

    let mut failures = Vec::with_capacity(candidates.len());
    for name in candidates {
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                tracing::debug!(%backend, library = name, "loaded runtime library");
                return Ok(lib);
            }
            Err(err) => failures.push(format!("{name}: {err}")),
        }
    }

    if failures.is_empty() {
        return Err(DeviceError::unavailable(backend, "no runtime library known for this platform"));
    }
    Err(DeviceError::unavailable(backend, failures.join("; ")))
}

/// Resolve one entry point from a loaded runtime
///
/// # Safety
///
/// `T` must be the exact function-pointer type of the exported symbol, and the
/// returned pointer must not outlive `lib`.
pub(crate) unsafe fn symbol<T: Copy>(lib: &Library, backend: BackendKind, name: &str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|err| DeviceError::unavailable(backend, format!("missing symbol {name}: {err}")))
}

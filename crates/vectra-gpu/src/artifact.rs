//! Module artifact handling.
//!
//! The runtime's code generator writes each compiled kernel as a PTX file
//! and passes the path here. Artifacts are single-use: loaded once, then
//! deleted after the launch. Reading happens before any device work so a
//! missing artifact never touches the driver.

use std::path::Path;

use crate::{GpuError, Result};

/// Read a module artifact fully into memory.
///
/// Any open or read failure maps to [`GpuError::ArtifactNotFound`], a
/// variant disjoint from the driver errors, so callers can tell "the
/// compiler never produced the file" apart from "the device is broken".
pub fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| GpuError::ArtifactNotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Delete a consumed artifact. Best-effort: the launch already happened,
/// so a failed delete is logged, not returned.
pub(crate) fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("failed to delete module artifact {}: {}", path.display(), e);
    }
}

#[cfg(feature = "cuda")]
mod module {
    use std::ffi::CString;
    use std::ptr;
    use std::sync::Arc;

    use cudarc::driver::sys;
    use cudarc::driver::CudaDevice;

    use crate::{GpuError, Result};

    /// A PTX module loaded via the raw driver API.
    ///
    /// cudarc's safe module map keeps modules loaded for the lifetime of
    /// the device, but artifacts here are single-use: the module must
    /// unload when the dispatch ends. Loading through `cuModuleLoadData`
    /// directly gives us that lifetime, plus a raw `CUfunction` handle
    /// for the dynamic-arity launch.
    pub struct LoadedModule {
        module: sys::CUmodule,
        function: sys::CUfunction,
    }

    impl LoadedModule {
        /// Load a module image and resolve the named entry point.
        pub fn load(device: &Arc<CudaDevice>, image: &[u8], entry: &str) -> Result<Self> {
            // Module load requires the device's primary context current
            // on this thread.
            device
                .bind_to_thread()
                .map_err(|e| GpuError::ModuleLoad(format!("bind context: {}", e)))?;

            // The driver parses PTX as a NUL-terminated string.
            let image = CString::new(image)
                .map_err(|_| GpuError::ModuleLoad("artifact contains a NUL byte".into()))?;

            let mut module: sys::CUmodule = ptr::null_mut();
            let rc = unsafe { sys::cuModuleLoadData(&mut module, image.as_ptr() as *const _) };
            if rc != sys::CUresult::CUDA_SUCCESS {
                return Err(GpuError::ModuleLoad(format!("cuModuleLoadData: {:?}", rc)));
            }

            let c_entry = CString::new(entry).map_err(|_| GpuError::EntryNotFound {
                entry: entry.to_string(),
            })?;
            let mut function: sys::CUfunction = ptr::null_mut();
            let rc = unsafe { sys::cuModuleGetFunction(&mut function, module, c_entry.as_ptr()) };
            if rc != sys::CUresult::CUDA_SUCCESS {
                unsafe {
                    let _ = sys::cuModuleUnload(module);
                }
                return Err(GpuError::EntryNotFound {
                    entry: entry.to_string(),
                });
            }

            Ok(Self { module, function })
        }

        /// Raw handle of the resolved entry point.
        pub fn function(&self) -> sys::CUfunction {
            self.function
        }
    }

    impl Drop for LoadedModule {
        fn drop(&mut self) {
            unsafe {
                let _ = sys::cuModuleUnload(self.module);
            }
        }
    }
}

#[cfg(feature = "cuda")]
pub use module::LoadedModule;

//! CUDA device context management.
//!
//! Provides lazy-initialized singleton device handles per GPU index with
//! an explicit teardown hook. Uses `cudarc` for safe CUDA driver API
//! access; one primary context per ordinal is shared across dispatches
//! instead of creating (and leaking) a context per call.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::CudaDevice;
use parking_lot::Mutex;

use crate::{GpuError, Result};

/// Global registry of CUDA device handles (one per GPU index).
static DEVICES: OnceLock<Mutex<HashMap<usize, Arc<CudaDevice>>>> = OnceLock::new();

fn devices() -> &'static Mutex<HashMap<usize, Arc<CudaDevice>>> {
    DEVICES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get or create the device handle for the given GPU index.
///
/// The device (and its primary context) is initialized on first access
/// and cached for reuse. First access also checks the compute capability
/// and warns if the device predates SM 2.0.
pub fn acquire(device_idx: usize) -> Result<Arc<CudaDevice>> {
    let mut map = devices().lock();
    if let Some(dev) = map.get(&device_idx) {
        return Ok(Arc::clone(dev));
    }

    let dev = CudaDevice::new(device_idx)
        .map_err(|e| GpuError::DeviceInit(format!("device {}: {}", device_idx, e)))?;

    let major = dev
        .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
        .map_err(|e| GpuError::DeviceInit(format!("compute capability query: {}", e)))?;
    if major < 2 {
        tracing::warn!(
            "CUDA device {} is below SM 2.0 (major {}); generated kernels may not run",
            device_idx,
            major
        );
    }

    map.insert(device_idx, Arc::clone(&dev));
    Ok(dev)
}

/// Name of a device, for the per-dispatch diagnostic banner.
pub fn device_name(dev: &Arc<CudaDevice>) -> Result<String> {
    dev.name()
        .map_err(|e| GpuError::DeviceInit(format!("device name query: {}", e)))
}

/// Tear down the device registry.
///
/// Outstanding result handles keep their own reference to the device, so
/// buffers registered before shutdown remain retrievable; new dispatches
/// re-initialize on demand.
pub fn shutdown() {
    if let Some(map) = DEVICES.get() {
        map.lock().clear();
    }
}

/// Check if any CUDA device is available.
pub fn is_available() -> bool {
    CudaDevice::new(0).is_ok()
}

/// Number of available CUDA devices.
pub fn device_count() -> usize {
    (0..16).take_while(|&i| CudaDevice::new(i).is_ok()).count()
}

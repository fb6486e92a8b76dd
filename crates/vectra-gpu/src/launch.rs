//! Launch geometry and kernel dispatch.
//!
//! Geometry is one-dimensional: a fixed block size along x and a grid
//! that covers the first argument's element count. The launch itself
//! goes through the raw driver API because the kernel's parameter list
//! is dynamic (N inputs plus one output); cudarc's tuple-based launch
//! only covers fixed arities.

use std::time::Duration;

/// One-dimensional launch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Blocks along x.
    pub grid: u32,
    /// Threads per block along x.
    pub block: u32,
}

impl Geometry {
    /// Geometry covering `elements` work items at the given block size.
    pub fn one_dimensional(elements: usize, block_size: u32) -> Self {
        Self {
            grid: grid_count(elements, block_size),
            block: block_size,
        }
    }
}

/// Number of blocks needed to cover `elements` items: ceil(n / block).
pub fn grid_count(elements: usize, block_size: u32) -> u32 {
    let block = block_size as u64;
    ((elements as u64 + block - 1) / block) as u32
}

/// Diagnostic timing tags. The outer runtime's profiling scripts scrape
/// these exact strings from stdout.
pub(crate) const CTX_CREATE_TAG: &str = "CUDA-ctx-create-Timing";
pub(crate) const COMPILE_TAG: &str = "CUDA-Compile-Timing";
pub(crate) const KERNEL_TAG: &str = "GPU-Kernel-Timing";

/// Format a timing line as `tag: seconds.microseconds`.
pub(crate) fn format_timing(tag: &str, elapsed: Duration) -> String {
    format!("{}: {}.{:06}", tag, elapsed.as_secs(), elapsed.subsec_micros())
}

#[cfg(feature = "cuda")]
pub(crate) fn emit_timing(tag: &str, elapsed: Duration) {
    println!("{}", format_timing(tag, elapsed));
}

#[cfg(feature = "cuda")]
mod raw {
    use std::ffi::c_void;
    use std::ptr;

    use cudarc::driver::{result, sys, CudaSlice, DevicePtr};

    use super::Geometry;
    use crate::{GpuError, Result};

    /// Launch `func` over `geometry` with parameters bound in the order
    /// input₀ … inputₙ₋₁, output.
    ///
    /// Enqueues on the null stream and returns without synchronizing:
    /// the retrieval copy runs on the same in-order stream, so kernel
    /// completion is ordered before it by the device.
    ///
    /// # Safety
    ///
    /// `func` must be a live entry point whose signature matches the
    /// bound parameter list; every buffer must be a live allocation on
    /// the current device.
    pub(crate) unsafe fn launch(
        func: sys::CUfunction,
        geometry: Geometry,
        inputs: &[CudaSlice<u8>],
        output: &CudaSlice<u8>,
    ) -> Result<()> {
        // The driver reads each kernel parameter through a pointer to
        // its value; collect the device addresses first so the cells
        // stay put while the pointer vector is built.
        let mut addrs: Vec<sys::CUdeviceptr> =
            inputs.iter().map(|s| *s.device_ptr()).collect();
        addrs.push(*output.device_ptr());

        let mut params: Vec<*mut c_void> = addrs
            .iter_mut()
            .map(|p| p as *mut sys::CUdeviceptr as *mut c_void)
            .collect();

        result::launch_kernel(
            func,
            (geometry.grid, 1, 1),
            (geometry.block, 1, 1),
            0,
            ptr::null_mut(),
            &mut params,
        )
        .map_err(|e| GpuError::LaunchError(format!("{:?}", e)))
    }
}

#[cfg(feature = "cuda")]
pub(crate) use raw::launch;

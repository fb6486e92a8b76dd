//! C FFI for the Vectra GPU dispatch core.
//!
//! The outer runtime's generated code calls these two entry points: one
//! to dispatch a kernel over array operands, one to pull the result back
//! into host memory. Enable with the `cuda` feature flag.
//!
//! ```c
//! uint64_t h = vectra_gpu_execute(args, n_args, path, path_len);
//! /* ... */
//! vectra_gpu_retrieve(host_out, h, out_bytes);
//! ```
//!
//! The handle is an opaque id; 0 is never a valid handle and doubles as
//! the error return of `vectra_gpu_execute`.

/// One array operand, as the outer runtime lays it out.
///
/// Field order and widths are ABI: pointer, then two 64-bit integers
/// (24 bytes, 8-byte aligned, no padding).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawKernelArg {
    /// Host buffer; not owned, must stay valid for the call.
    pub data: *const u8,
    /// Buffer size in bytes.
    pub size: i64,
    /// Logical element count.
    pub num_elements: i64,
}

#[cfg(feature = "cuda")]
mod exports {
    use std::path::Path;
    use std::slice;

    use vectra_gpu::{DispatchOptions, KernelArg, ResultHandle};

    use super::RawKernelArg;

    /// Dispatch a kernel over `num_args` operands.
    ///
    /// `module_path` is a pointer + explicit length (not NUL-terminated)
    /// naming the single-use PTX artifact; it is deleted on success.
    /// Returns the result handle id, or 0 on failure. The output buffer
    /// is sized equal to the first operand (the generated-kernel
    /// convention); Rust callers needing a different output size use
    /// `vectra_gpu::execute` directly.
    ///
    /// # Safety
    ///
    /// `args` must point to `num_args` valid descriptors whose `data`
    /// pointers reference `size` readable bytes each; `module_path` must
    /// reference `path_len` bytes of valid UTF-8.
    #[no_mangle]
    pub unsafe extern "C" fn vectra_gpu_execute(
        args: *const RawKernelArg,
        num_args: i32,
        module_path: *const u8,
        path_len: i32,
    ) -> u64 {
        if module_path.is_null() || path_len <= 0 {
            return 0;
        }
        if num_args < 0 || (num_args > 0 && args.is_null()) {
            return 0;
        }

        let raw_args = if num_args == 0 {
            &[]
        } else {
            slice::from_raw_parts(args, num_args as usize)
        };

        let mut kernel_args = Vec::with_capacity(raw_args.len());
        for raw in raw_args {
            if raw.size < 0 || raw.num_elements < 0 {
                return 0;
            }
            if raw.data.is_null() && raw.size > 0 {
                return 0;
            }
            let data = if raw.size == 0 {
                &[]
            } else {
                slice::from_raw_parts(raw.data, raw.size as usize)
            };
            kernel_args.push(KernelArg::new(data, raw.num_elements as usize));
        }

        let path_bytes = slice::from_raw_parts(module_path, path_len as usize);
        let path = match std::str::from_utf8(path_bytes) {
            Ok(s) => Path::new(s),
            Err(_) => return 0,
        };

        match vectra_gpu::execute(&kernel_args, path, &DispatchOptions::default()) {
            Ok(handle) => handle.into_raw(),
            Err(e) => {
                tracing::error!("vectra_gpu_execute failed: {}", e);
                0
            }
        }
    }

    /// Copy `size` bytes of a dispatched result into `host` and release
    /// the device buffer. Returns 0 on success, -1 on failure.
    ///
    /// Each handle is consumed exactly once; a second call with the same
    /// id fails without touching device memory.
    ///
    /// # Safety
    ///
    /// `host` must reference `size` writable bytes.
    #[no_mangle]
    pub unsafe extern "C" fn vectra_gpu_retrieve(host: *mut u8, handle: u64, size: i64) -> i32 {
        if host.is_null() || size < 0 || handle == 0 {
            return -1;
        }
        let dst = slice::from_raw_parts_mut(host, size as usize);
        match vectra_gpu::retrieve(dst, ResultHandle::from_raw(handle)) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("vectra_gpu_retrieve failed: {}", e);
                -1
            }
        }
    }
}

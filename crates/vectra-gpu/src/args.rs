//! Argument descriptors and per-dispatch options.

/// Default kernel entry point name. Every module the runtime's code
/// generator emits exports exactly one kernel under this name.
pub const DEFAULT_ENTRY_POINT: &str = "kernel";

/// Default thread block size along the x axis.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// One array operand of a kernel launch.
///
/// Borrows the caller's host buffer; the dispatcher copies it to the
/// device and never writes back through it. `elements` is the logical
/// element count; it must agree with the element type the kernel was
/// generated for, which this crate does not (and cannot) check.
#[derive(Debug, Clone, Copy)]
pub struct KernelArg<'a> {
    /// Contiguous host bytes for this operand.
    pub data: &'a [u8],
    /// Logical element count (not bytes).
    pub elements: usize,
}

impl<'a> KernelArg<'a> {
    pub fn new(data: &'a [u8], elements: usize) -> Self {
        Self { data, elements }
    }

    /// Size of the operand in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Options for one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// CUDA device ordinal to run on.
    pub device: usize,
    /// Kernel entry point to resolve in the loaded module.
    pub entry_point: String,
    /// Thread block size along the x axis.
    pub block_size: u32,
    /// Output buffer size in bytes. `None` sizes the output equal to the
    /// first input, the convention the runtime's generated kernels
    /// follow for element-wise operations. Reductions and filters must
    /// set this explicitly.
    pub output_bytes: Option<usize>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            device: 0,
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
            output_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = DispatchOptions::default();
        assert_eq!(opts.device, 0);
        assert_eq!(opts.entry_point, "kernel");
        assert_eq!(opts.block_size, 512);
        assert_eq!(opts.output_bytes, None);
    }

    #[test]
    fn test_arg_size() {
        let data = [0u8; 24];
        let arg = KernelArg::new(&data, 6);
        assert_eq!(arg.size_bytes(), 24);
        assert_eq!(arg.elements, 6);
    }
}

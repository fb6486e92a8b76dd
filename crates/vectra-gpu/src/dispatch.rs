//! The two dispatcher entry points: `execute` and `retrieve`.
//!
//! One `execute` runs the full synchronous flow (read artifact, acquire
//! device, load module, stage inputs, launch, clean up) and parks the
//! output buffer behind a [`ResultHandle`](crate::ResultHandle). The
//! matching `retrieve` copies the result back to the host and is the
//! buffer's only destructor.

use crate::args::{DispatchOptions, KernelArg};
use crate::{GpuError, Result};

/// Transfer and binding plan for one dispatch, derived from the argument
/// list before any device work.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TransferPlan {
    /// Byte size of each input buffer, in binding order.
    pub(crate) input_bytes: Vec<usize>,
    /// Byte size of the output buffer (bound last).
    pub(crate) output_bytes: usize,
    /// Element count the launch geometry covers.
    pub(crate) elements: usize,
}

pub(crate) fn plan_transfers(
    args: &[KernelArg<'_>],
    opts: &DispatchOptions,
) -> Result<TransferPlan> {
    if opts.block_size == 0 {
        return Err(GpuError::InvalidLaunch("block size must be nonzero".into()));
    }
    let output_bytes = match (opts.output_bytes, args.first()) {
        (Some(n), _) => n,
        // Default convention: output matches the first input byte-for-byte.
        (None, Some(first)) => first.size_bytes(),
        (None, None) => {
            return Err(GpuError::InvalidLaunch(
                "no arguments and no explicit output size".into(),
            ))
        }
    };
    Ok(TransferPlan {
        input_bytes: args.iter().map(|a| a.size_bytes()).collect(),
        output_bytes,
        elements: args.first().map(|a| a.elements).unwrap_or(0),
    })
}

#[cfg(feature = "cuda")]
mod cuda {
    use std::path::Path;
    use std::time::Instant;

    use super::plan_transfers;
    use crate::args::{DispatchOptions, KernelArg};
    use crate::artifact::{self, LoadedModule};
    use crate::launch::{self, Geometry, COMPILE_TAG, CTX_CREATE_TAG, KERNEL_TAG};
    use crate::memory::{self, ResultHandle};
    use crate::{context, GpuError, Result};

    /// Run one kernel over the given arguments.
    ///
    /// Inputs are copied host→device and bound in order, with the output
    /// buffer appended last. The launch is enqueued without an explicit
    /// synchronize; the device's in-order stream sequences it before the
    /// retrieval copy. On success the module artifact at `module_path`
    /// has been deleted and the returned handle owns the device-resident
    /// output until [`retrieve`] consumes it.
    pub fn execute(
        args: &[KernelArg<'_>],
        module_path: &Path,
        opts: &DispatchOptions,
    ) -> Result<ResultHandle> {
        let plan = plan_transfers(args, opts)?;
        // Read before any device work: a missing artifact must not leave
        // driver-side effects behind.
        let image = artifact::read_artifact(module_path)?;

        let start = Instant::now();
        let dev = context::acquire(opts.device)?;
        println!("Using CUDA device {}", context::device_name(&dev)?);
        launch::emit_timing(CTX_CREATE_TAG, start.elapsed());

        let module = LoadedModule::load(&dev, &image, &opts.entry_point)?;
        launch::emit_timing(COMPILE_TAG, start.elapsed());

        let inputs = memory::stage_inputs(&dev, args)?;
        let output = memory::alloc_output(&dev, plan.output_bytes)?;

        let geometry = Geometry::one_dimensional(plan.elements, opts.block_size);
        tracing::debug!(
            grid = geometry.grid,
            block = geometry.block,
            inputs = inputs.len(),
            output_bytes = plan.output_bytes,
            "launching kernel"
        );

        let launched = Instant::now();
        // Safety: the entry point came from the module just loaded, and
        // every buffer was allocated above on `dev`.
        unsafe { launch::launch(module.function(), geometry, &inputs, &output)? };
        launch::emit_timing(KERNEL_TAG, launched.elapsed());

        // Cleanup in the original order: inputs, module, artifact. The
        // output buffer deliberately survives into the registry.
        drop(inputs);
        drop(module);
        artifact::remove_artifact(module_path);

        Ok(memory::register_result(dev, output, plan.output_bytes))
    }

    /// Copy a dispatched result back to the host and release it.
    ///
    /// Consumes the handle: this is the output buffer's only destructor,
    /// and a second call through a duplicated raw id reports
    /// [`GpuError::UnknownHandle`] instead of double-freeing. An
    /// oversized destination fails without releasing the buffer, so a
    /// caller that kept the raw id can retry.
    pub fn retrieve(dst: &mut [u8], handle: ResultHandle) -> Result<()> {
        let entry = memory::take_result(handle, dst.len())?;
        // Safety: u8→u8 reinterpret of the leading dst.len() bytes; the
        // registry checked dst.len() <= entry.bytes.
        let view = unsafe { entry.buffer.transmute::<u8>(dst.len()) }
            .ok_or(GpuError::RetrieveOutOfBounds {
                requested: dst.len(),
                available: entry.bytes,
            })?;
        entry
            .device
            .dtoh_sync_copy_into(&view, dst)
            .map_err(|e| GpuError::MemoryError(format!("dtoh copy: {}", e)))?;
        Ok(())
    }
}

#[cfg(feature = "cuda")]
pub use cuda::{execute, retrieve};

//! Device memory staging and the cross-call result registry.
//!
//! Input buffers live only for the duration of one dispatch. The output
//! buffer crosses the call boundary: it is parked in a process-wide
//! registry and handed back as a move-only [`ResultHandle`] that the
//! retrieval call consumes exactly once.

/// Opaque handle to a device-resident result buffer.
///
/// Move-only on purpose: the handle is the single ownership token for
/// the buffer, and `retrieve` takes it by value. A duplicated raw id
/// (via [`ResultHandle::from_raw`], which the C ABI needs) still cannot
/// release the buffer twice: the registry's take-once semantics turn
/// the second release into [`crate::GpuError::UnknownHandle`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ResultHandle(u64);

impl ResultHandle {
    /// Rebuild a handle from a raw id that crossed the C ABI.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Consume the handle, yielding the raw id for the C ABI.
    pub fn into_raw(self) -> u64 {
        self.0
    }

    /// The raw id, without giving up ownership.
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[cfg(feature = "cuda")]
mod registry {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, OnceLock};

    use cudarc::driver::{CudaDevice, CudaSlice};
    use parking_lot::Mutex;

    use super::ResultHandle;
    use crate::{GpuError, KernelArg, Result};

    /// A parked result buffer. Holds its own device reference so the
    /// buffer stays valid even if the context registry is torn down
    /// between execute and retrieve.
    pub(crate) struct ResultEntry {
        pub(crate) device: Arc<CudaDevice>,
        pub(crate) buffer: CudaSlice<u8>,
        pub(crate) bytes: usize,
    }

    /// Result buffers awaiting retrieval, keyed by handle id.
    static RESULTS: OnceLock<Mutex<HashMap<u64, ResultEntry>>> = OnceLock::new();

    /// Id 0 is reserved as the C ABI error sentinel.
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    fn results() -> &'static Mutex<HashMap<u64, ResultEntry>> {
        RESULTS.get_or_init(|| Mutex::new(HashMap::new()))
    }

    /// Allocate one device buffer per argument and copy the host data in,
    /// preserving argument order.
    pub(crate) fn stage_inputs(
        dev: &Arc<CudaDevice>,
        args: &[KernelArg<'_>],
    ) -> Result<Vec<CudaSlice<u8>>> {
        let mut inputs = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let slice = dev.htod_sync_copy(arg.data).map_err(|e| {
                GpuError::MemoryError(format!("htod copy of input {} ({} bytes): {}", i, arg.size_bytes(), e))
            })?;
            inputs.push(slice);
        }
        Ok(inputs)
    }

    /// Allocate the zeroed output buffer.
    pub(crate) fn alloc_output(dev: &Arc<CudaDevice>, nbytes: usize) -> Result<CudaSlice<u8>> {
        dev.alloc_zeros::<u8>(nbytes)
            .map_err(|e| GpuError::MemoryError(format!("output alloc ({} bytes): {}", nbytes, e)))
    }

    /// Park a result buffer and mint its handle.
    pub(crate) fn register_result(
        device: Arc<CudaDevice>,
        buffer: CudaSlice<u8>,
        bytes: usize,
    ) -> ResultHandle {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        results().lock().insert(
            id,
            ResultEntry {
                device,
                buffer,
                bytes,
            },
        );
        ResultHandle(id)
    }

    /// Remove a parked result for a retrieval of `requested` bytes. The
    /// entry, and with it the device allocation, is freed when the
    /// returned value drops. An oversized request leaves the buffer
    /// parked so the caller can retry with the raw id.
    pub(crate) fn take_result(handle: ResultHandle, requested: usize) -> Result<ResultEntry> {
        let id = handle.into_raw();
        let mut map = results().lock();
        let entry = map.get(&id).ok_or(GpuError::UnknownHandle(id))?;
        if requested > entry.bytes {
            return Err(GpuError::RetrieveOutOfBounds {
                requested,
                available: entry.bytes,
            });
        }
        map.remove(&id).ok_or(GpuError::UnknownHandle(id))
    }

    /// Number of result buffers awaiting retrieval. Every dispatch must
    /// eventually be matched by one retrieval; this is the leak probe.
    pub fn outstanding() -> usize {
        results().lock().len()
    }
}

#[cfg(feature = "cuda")]
pub use registry::outstanding;
#[cfg(feature = "cuda")]
pub(crate) use registry::{alloc_output, register_result, stage_inputs, take_result};

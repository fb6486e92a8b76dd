use std::path::PathBuf;

/// Dispatch errors.
///
/// Driver-call failures and a missing module artifact are deliberately
/// separate variants: callers recover from a missing artifact (the
/// compiler side may regenerate it) but treat driver failures as a dead
/// device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("CUDA device init failed: {0}")]
    DeviceInit(String),

    #[error("module artifact '{}' not readable: {source}", path.display())]
    ArtifactNotFound {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load module artifact: {0}")]
    ModuleLoad(String),

    #[error("entry point '{entry}' not found in module")]
    EntryNotFound { entry: String },

    #[error("CUDA memory error: {0}")]
    MemoryError(String),

    #[error("CUDA kernel launch failed: {0}")]
    LaunchError(String),

    #[error("invalid launch request: {0}")]
    InvalidLaunch(String),

    #[error("unknown or already released result handle {0}")]
    UnknownHandle(u64),

    #[error("retrieve of {requested} bytes exceeds result buffer of {available} bytes")]
    RetrieveOutOfBounds { requested: usize, available: usize },
}

//! # vectra-gpu
//!
//! CUDA dispatch core for the Vectra array runtime.
//!
//! The runtime lowers array expressions to PTX elsewhere and hands this
//! crate a ready-to-run module artifact plus argument descriptors. This
//! crate owns the rest:
//! - Device acquisition (lazy singleton per GPU index)
//! - Single-use module artifact loading and entry-point resolution
//! - Host↔device transfers and kernel parameter binding
//! - One-dimensional launch geometry and kernel dispatch
//! - Cross-call result handles with single-release semantics
//!
//! All driver-touching code sits behind the `cuda` feature flag.

pub mod args;
pub mod artifact;
#[cfg(feature = "cuda")]
pub mod context;
pub mod dispatch;
pub mod error;
pub mod launch;
pub mod memory;

pub use args::{DispatchOptions, KernelArg};
#[cfg(feature = "cuda")]
pub use dispatch::{execute, retrieve};
pub use error::GpuError;
pub use launch::Geometry;
pub use memory::ResultHandle;

pub type Result<T> = std::result::Result<T, GpuError>;

//! Core types for the tkern execution kernel.
//!
//! `tkern-core` provides the foundational types (`DType`, `Shape`,
//! `TensorHandle`), the tagged buffer representation, the backend-owned
//! [`TensorStore`], and the [`KernelRegistry`] that maps `(op, backend)`
//! pairs to kernel functions.
//!
//! Kernels themselves live in backend crates (see `tkern-cpu`); this crate
//! knows nothing about how an op is computed.

pub mod buffer;
pub mod config;
pub mod registry;
pub mod store;
pub mod types;

pub use buffer::{BufferView, TensorData};
pub use config::StoreConfig;
pub use registry::{KernelConfig, KernelFunc, KernelRegistry, NamedTensorMap, require_input};
pub use store::{DataId, StoredBuffer, TensorHandle, TensorStore};
pub use types::{DType, Shape};

pub type Result<T> = std::result::Result<T, TkernError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TkernError {
    #[error("Operands could not be broadcast together with shapes {a} and {b}")]
    ShapeMismatch { a: Shape, b: Shape },

    #[error("No kernel registered for op '{op}' on backend '{backend}'")]
    UnknownKernel { op: String, backend: String },

    #[error("Unknown data id: {0}")]
    UnknownId(DataId),

    #[error("Out of memory: requested {requested} bytes (available: {available:?})")]
    OutOfMemory {
        requested: usize,
        available: Option<usize>,
    },

    #[error("Buffer length {got} does not match shape {shape} (expected {expected} elements)")]
    ShapeBufferMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    #[error("Kernel '{op}' is missing required input '{name}'")]
    MissingInput { op: String, name: String },
}

//! CPU backend context: a tensor store bound to a kernel registry.
//!
//! A [`CpuBackend`] owns its store and is driven through `&mut self`; it is
//! not internally synchronized. [`SharedBackend`] wraps one behind a lock for
//! hosts that dispatch from several threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::info;

use tkern_core::{
    KernelConfig, KernelRegistry, NamedTensorMap, Result, Shape, StoreConfig, StoredBuffer,
    TensorData, TensorHandle, TensorStore,
};

use crate::div::{DIV, binary_inputs, div_kernel};

/// Backend name the CPU kernels are registered under.
pub const CPU_BACKEND: &str = "cpu";

/// Register every CPU kernel with `registry`.
pub fn register_cpu_kernels(registry: &mut KernelRegistry) {
    registry.register(KernelConfig::new(DIV, CPU_BACKEND, div_kernel));
}

/// A fresh registry holding the CPU kernels.
pub fn cpu_registry() -> Arc<KernelRegistry> {
    let mut registry = KernelRegistry::new();
    register_cpu_kernels(&mut registry);
    Arc::new(registry)
}

/// Reference CPU backend.
#[derive(Debug)]
pub struct CpuBackend {
    registry: Arc<KernelRegistry>,
    store: TensorStore,
}

impl CpuBackend {
    /// Unbounded store with the CPU kernels registered.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::unbounded())
    }

    /// Store limits taken from the environment (see [`StoreConfig::from_env`]).
    pub fn from_env() -> Self {
        Self::with_config(StoreConfig::from_env())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_registry(cpu_registry(), config)
    }

    /// Use an existing registry, e.g. one shared by several backends.
    pub fn with_registry(registry: Arc<KernelRegistry>, config: StoreConfig) -> Self {
        info!(
            kernels = registry.kernels_for_backend(CPU_BACKEND).len(),
            max_bytes = ?config.max_bytes,
            "Initialized CPU backend"
        );
        Self {
            registry,
            store: TensorStore::with_config(config),
        }
    }

    pub fn name(&self) -> &str {
        CPU_BACKEND
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &TensorStore {
        &self.store
    }

    /// Register host data with the store.
    pub fn write(&mut self, data: impl Into<TensorData>, shape: &Shape) -> Result<TensorHandle> {
        self.store.write(data.into(), shape.clone())
    }

    pub fn write_f32(&mut self, data: &[f32], shape: &Shape) -> Result<TensorHandle> {
        self.write(data.to_vec(), shape)
    }

    pub fn read(&self, handle: &TensorHandle) -> Result<&StoredBuffer> {
        self.store.read(handle.id)
    }

    pub fn dispose(&mut self, handle: &TensorHandle) -> Result<()> {
        self.store.dispose(handle.id)
    }

    /// Run a registered kernel on this backend.
    pub fn run_kernel(&mut self, op: &str, inputs: &NamedTensorMap) -> Result<TensorHandle> {
        self.registry.dispatch(op, CPU_BACKEND, inputs, &mut self.store)
    }

    /// Broadcasting `a / b`.
    pub fn div(&mut self, a: &TensorHandle, b: &TensorHandle) -> Result<TensorHandle> {
        self.run_kernel(DIV, &binary_inputs(a, b))
    }

    /// Copy a tensor out as `f32` (real parts for complex data).
    pub fn to_vec_f32(&self, handle: &TensorHandle) -> Result<Vec<f32>> {
        Ok(self.read(handle)?.view().to_vec_f32())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`CpuBackend`] behind a lock, cloneable across threads.
///
/// Every call holds the lock for its full duration, so dispatches are
/// serialized and never observe a half-written store.
#[derive(Clone, Debug)]
pub struct SharedBackend {
    inner: Arc<Mutex<CpuBackend>>,
}

impl SharedBackend {
    pub fn new(backend: CpuBackend) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
        }
    }

    /// Exclusive access for multi-step work.
    pub fn lock(&self) -> MutexGuard<'_, CpuBackend> {
        self.inner.lock()
    }

    pub fn write(&self, data: impl Into<TensorData>, shape: &Shape) -> Result<TensorHandle> {
        self.lock().write(data, shape)
    }

    pub fn run_kernel(&self, op: &str, inputs: &NamedTensorMap) -> Result<TensorHandle> {
        self.lock().run_kernel(op, inputs)
    }

    pub fn div(&self, a: &TensorHandle, b: &TensorHandle) -> Result<TensorHandle> {
        self.lock().div(a, b)
    }

    pub fn to_vec_f32(&self, handle: &TensorHandle) -> Result<Vec<f32>> {
        self.lock().to_vec_f32(handle)
    }
}

//! Kernel registry and dispatch.
//!
//! A [`KernelRegistry`] maps `(kernel name, backend name)` pairs to kernel
//! functions. Registration is an explicit call made by the owning context at
//! startup; nothing registers itself on load.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::store::{TensorHandle, TensorStore};
use crate::{Result, TkernError};

/// Logical input name → tensor handle.
pub type NamedTensorMap = HashMap<String, TensorHandle>;

/// A kernel computes one op on one backend.
///
/// On success the kernel has registered exactly one new buffer in `store`.
/// On failure the store must be left unchanged.
pub type KernelFunc = fn(&NamedTensorMap, &mut TensorStore) -> Result<TensorHandle>;

/// Registration record for one kernel.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    pub kernel_name: String,
    pub backend_name: String,
    pub kernel_func: KernelFunc,
}

impl KernelConfig {
    pub fn new(
        kernel_name: impl Into<String>,
        backend_name: impl Into<String>,
        kernel_func: KernelFunc,
    ) -> Self {
        Self {
            kernel_name: kernel_name.into(),
            backend_name: backend_name.into(),
            kernel_func,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct KernelKey {
    kernel: String,
    backend: String,
}

impl KernelKey {
    fn new(kernel: &str, backend: &str) -> Self {
        Self {
            kernel: kernel.to_owned(),
            backend: backend.to_owned(),
        }
    }
}

/// Process-scoped table of registered kernels.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: HashMap<KernelKey, KernelConfig>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kernel. A second registration for the same pair replaces
    /// the first.
    pub fn register(&mut self, config: KernelConfig) {
        let key = KernelKey::new(&config.kernel_name, &config.backend_name);
        if self.kernels.contains_key(&key) {
            warn!(
                kernel = %config.kernel_name,
                backend = %config.backend_name,
                "kernel already registered, replacing"
            );
        } else {
            debug!(
                kernel = %config.kernel_name,
                backend = %config.backend_name,
                "register kernel"
            );
        }
        self.kernels.insert(key, config);
    }

    /// Remove a kernel, returning its registration if it existed.
    pub fn unregister(&mut self, kernel_name: &str, backend_name: &str) -> Option<KernelConfig> {
        self.kernels.remove(&KernelKey::new(kernel_name, backend_name))
    }

    pub fn get_kernel(&self, kernel_name: &str, backend_name: &str) -> Option<&KernelConfig> {
        self.kernels.get(&KernelKey::new(kernel_name, backend_name))
    }

    pub fn is_registered(&self, kernel_name: &str, backend_name: &str) -> bool {
        self.get_kernel(kernel_name, backend_name).is_some()
    }

    /// Kernels registered for `backend_name`, sorted by kernel name.
    pub fn kernels_for_backend(&self, backend_name: &str) -> Vec<&KernelConfig> {
        let mut out: Vec<&KernelConfig> = self
            .kernels
            .values()
            .filter(|k| k.backend_name == backend_name)
            .collect();
        out.sort_by(|a, b| a.kernel_name.cmp(&b.kernel_name));
        out
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Look up and run the kernel for `(op, backend)`.
    pub fn dispatch(
        &self,
        op: &str,
        backend: &str,
        inputs: &NamedTensorMap,
        store: &mut TensorStore,
    ) -> Result<TensorHandle> {
        let kernel = self
            .get_kernel(op, backend)
            .ok_or_else(|| TkernError::UnknownKernel {
                op: op.to_owned(),
                backend: backend.to_owned(),
            })?;
        debug!(op, backend, num_inputs = inputs.len(), "dispatch");
        (kernel.kernel_func)(inputs, store)
    }
}

/// Fetch a named input or report it missing.
pub fn require_input<'a>(
    inputs: &'a NamedTensorMap,
    op: &str,
    name: &str,
) -> Result<&'a TensorHandle> {
    inputs.get(name).ok_or_else(|| TkernError::MissingInput {
        op: op.to_owned(),
        name: name.to_owned(),
    })
}

//! Backend-owned tensor storage.
//!
//! The store owns every materialized buffer and hands out [`DataId`] keys.
//! Handles are plain descriptors; dropping a handle never frees data, only
//! [`TensorStore::dispose`] does.
//!
//! The store is not internally synchronized. Mutation requires `&mut self`,
//! so callers sharing a store across threads must wrap it in a lock.

use std::collections::HashMap;

use tracing::trace;

use crate::buffer::{BufferView, TensorData};
use crate::config::StoreConfig;
use crate::types::{DType, Shape};
use crate::{Result, TkernError};

/// Opaque key identifying a stored buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub(crate) u64);

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lightweight descriptor of a stored tensor. Does not own the buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorHandle {
    pub id: DataId,
    pub shape: Shape,
    pub dtype: DType,
}

/// A buffer together with the shape it was allocated under.
#[derive(Debug)]
pub struct StoredBuffer {
    shape: Shape,
    data: TensorData,
}

impl StoredBuffer {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn view(&self) -> BufferView<'_> {
        self.data.view()
    }
}

/// Owner of all buffers for one backend.
#[derive(Debug, Default)]
pub struct TensorStore {
    buffers: HashMap<DataId, StoredBuffer>,
    next_id: u64,
    num_bytes: usize,
    config: StoreConfig,
}

impl TensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Take ownership of `data` and register it under a fresh id.
    ///
    /// The dtype is the variant tag of `data`. Ids are never reused.
    pub fn allocate(&mut self, data: TensorData, shape: Shape) -> Result<DataId> {
        let Some(expected) = shape.checked_numel() else {
            return Err(TkernError::ShapeBufferMismatch {
                shape,
                expected: usize::MAX,
                got: data.len(),
            });
        };
        if data.len() != expected {
            return Err(TkernError::ShapeBufferMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        let bytes = data.size_bytes();
        self.check_budget(bytes)?;

        let id = DataId(self.next_id);
        self.next_id += 1;
        trace!(%id, %shape, dtype = %data.dtype(), bytes, "allocate");
        self.num_bytes += bytes;
        self.buffers.insert(id, StoredBuffer { shape, data });
        Ok(id)
    }

    /// Allocate and return the full handle for the new buffer.
    pub fn write(&mut self, data: TensorData, shape: Shape) -> Result<TensorHandle> {
        let dtype = data.dtype();
        let id = self.allocate(data, shape.clone())?;
        Ok(TensorHandle { id, shape, dtype })
    }

    /// Shared, read-only access to a stored buffer.
    pub fn read(&self, id: DataId) -> Result<&StoredBuffer> {
        self.buffers.get(&id).ok_or(TkernError::UnknownId(id))
    }

    /// Free the buffer behind `id`. The id is never handed out again.
    pub fn dispose(&mut self, id: DataId) -> Result<()> {
        let buffer = self.buffers.remove(&id).ok_or(TkernError::UnknownId(id))?;
        let bytes = buffer.data.size_bytes();
        self.num_bytes -= bytes;
        trace!(%id, bytes, "dispose");
        Ok(())
    }

    /// A zero-filled buffer suitable for a kernel output.
    ///
    /// Checks the byte budget and allocator availability up front. The store
    /// itself is left untouched; register the result with [`Self::allocate`].
    pub fn reserve_output(&self, dtype: DType, numel: usize) -> Result<TensorData> {
        let requested = numel
            .checked_mul(dtype.size_bytes())
            .ok_or(TkernError::OutOfMemory {
                requested: usize::MAX,
                available: self.available_bytes(),
            })?;
        self.check_budget(requested)?;
        TensorData::try_zeros(dtype, numel).map_err(|_| TkernError::OutOfMemory {
            requested,
            available: self.available_bytes(),
        })
    }

    pub fn contains(&self, id: DataId) -> bool {
        self.buffers.contains_key(&id)
    }

    /// Number of live buffers.
    pub fn num_data_ids(&self) -> usize {
        self.buffers.len()
    }

    /// Element bytes held by live buffers.
    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    /// Remaining byte budget, `None` when unbounded.
    pub fn available_bytes(&self) -> Option<usize> {
        self.config
            .max_bytes
            .map(|max| max.saturating_sub(self.num_bytes))
    }

    fn check_budget(&self, requested: usize) -> Result<()> {
        match self.available_bytes() {
            Some(available) if requested > available => Err(TkernError::OutOfMemory {
                requested,
                available: Some(available),
            }),
            _ => Ok(()),
        }
    }
}

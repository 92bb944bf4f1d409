//! Tagged element buffers.
//!
//! A stored buffer is one of a closed set of typed vectors. Every read site
//! matches on the variant, so there is no runtime downcast anywhere in the
//! crate.

use half::f16;
use num_complex::Complex32;

use crate::types::DType;

/// Owned, contiguous element storage tagged by dtype.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    Bool(Vec<bool>),
    I32(Vec<i32>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    C64(Vec<Complex32>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Bool(_) => DType::Bool,
            TensorData::I32(_) => DType::I32,
            TensorData::F16(_) => DType::F16,
            TensorData::F32(_) => DType::F32,
            TensorData::C64(_) => DType::C64,
        }
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the elements (not counting vector capacity).
    pub fn size_bytes(&self) -> usize {
        self.len() * self.dtype().size_bytes()
    }

    /// Borrow the buffer as a read-only view.
    pub fn view(&self) -> BufferView<'_> {
        match self {
            TensorData::Bool(v) => BufferView::Bool(v),
            TensorData::I32(v) => BufferView::I32(v),
            TensorData::F16(v) => BufferView::F16(v),
            TensorData::F32(v) => BufferView::F32(v),
            TensorData::C64(v) => BufferView::C64(v),
        }
    }

    /// A zero-filled buffer of `len` elements.
    ///
    /// Reports allocator failure instead of aborting the process.
    pub fn try_zeros(dtype: DType, len: usize) -> Result<Self, std::collections::TryReserveError> {
        fn filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, std::collections::TryReserveError> {
            let mut v = Vec::new();
            v.try_reserve_exact(len)?;
            v.resize(len, value);
            Ok(v)
        }
        Ok(match dtype {
            DType::Bool => TensorData::Bool(filled(len, false)?),
            DType::I32 => TensorData::I32(filled(len, 0)?),
            DType::F16 => TensorData::F16(filled(len, f16::ZERO)?),
            DType::F32 => TensorData::F32(filled(len, 0.0)?),
            DType::C64 => TensorData::C64(filled(len, Complex32::new(0.0, 0.0))?),
        })
    }
}

impl From<Vec<bool>> for TensorData {
    fn from(v: Vec<bool>) -> Self {
        TensorData::Bool(v)
    }
}

impl From<Vec<i32>> for TensorData {
    fn from(v: Vec<i32>) -> Self {
        TensorData::I32(v)
    }
}

impl From<Vec<f16>> for TensorData {
    fn from(v: Vec<f16>) -> Self {
        TensorData::F16(v)
    }
}

impl From<Vec<f32>> for TensorData {
    fn from(v: Vec<f32>) -> Self {
        TensorData::F32(v)
    }
}

impl From<Vec<Complex32>> for TensorData {
    fn from(v: Vec<Complex32>) -> Self {
        TensorData::C64(v)
    }
}

/// Shared, read-only view of a stored buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BufferView<'a> {
    Bool(&'a [bool]),
    I32(&'a [i32]),
    F16(&'a [f16]),
    F32(&'a [f32]),
    C64(&'a [Complex32]),
}

impl<'a> BufferView<'a> {
    pub fn dtype(&self) -> DType {
        match self {
            BufferView::Bool(_) => DType::Bool,
            BufferView::I32(_) => DType::I32,
            BufferView::F16(_) => DType::F16,
            BufferView::F32(_) => DType::F32,
            BufferView::C64(_) => DType::C64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BufferView::Bool(v) => v.len(),
            BufferView::I32(v) => v.len(),
            BufferView::F16(v) => v.len(),
            BufferView::F32(v) => v.len(),
            BufferView::C64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` widened to `f32`. Complex elements yield their real part.
    #[inline]
    pub fn real_at(&self, i: usize) -> f32 {
        match self {
            BufferView::Bool(v) => {
                if v[i] {
                    1.0
                } else {
                    0.0
                }
            }
            BufferView::I32(v) => v[i] as f32,
            BufferView::F16(v) => v[i].to_f32(),
            BufferView::F32(v) => v[i],
            BufferView::C64(v) => v[i].re,
        }
    }

    /// Element `i` widened to `f64`, exact for every `int32` value.
    /// Complex elements yield their real part.
    #[inline]
    pub fn wide_at(&self, i: usize) -> f64 {
        match self {
            BufferView::I32(v) => f64::from(v[i]),
            _ => f64::from(self.real_at(i)),
        }
    }

    /// Element `i` widened to `Complex32`. Real elements get a zero imaginary part.
    #[inline]
    pub fn complex_at(&self, i: usize) -> Complex32 {
        match self {
            BufferView::C64(v) => v[i],
            _ => Complex32::new(self.real_at(i), 0.0),
        }
    }

    /// Copy the view out as `f32` values (real parts for complex data).
    pub fn to_vec_f32(&self) -> Vec<f32> {
        (0..self.len()).map(|i| self.real_at(i)).collect()
    }
}

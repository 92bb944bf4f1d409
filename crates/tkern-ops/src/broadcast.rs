//! Broadcasting rules following NumPy semantics, plus the index arithmetic
//! that lets kernels read broadcast operands without expanding them.
//!
//! Everything here is a pure function of shapes and coordinates.

use smallvec::{SmallVec, smallvec};
use tkern_core::{Result, Shape, TkernError};

/// Row-major strides or coordinates. Four dims stay on the stack.
pub type Dims = SmallVec<[usize; 4]>;

/// Compute the broadcast shape of two shapes.
///
/// Rules (NumPy-style):
/// 1. Align shapes from the trailing dimension.
/// 2. For each dimension pair: must be equal, or one must be 1.
/// 3. The output dimension is the max of the two.
///
/// The first incompatible pair, scanning from the trailing dimension,
/// fails with [`TkernError::ShapeMismatch`].
pub fn broadcast_shapes(a: &Shape, b: &Shape) -> Result<Shape> {
    let a_dims = &a.0;
    let b_dims = &b.0;
    let max_ndim = a_dims.len().max(b_dims.len());

    let mut result = Vec::with_capacity(max_ndim);

    for i in 0..max_ndim {
        let da = aligned_dim(a_dims, i);
        let db = aligned_dim(b_dims, i);

        if da == db || db == 1 {
            result.push(da);
        } else if da == 1 {
            result.push(db);
        } else {
            return Err(TkernError::ShapeMismatch {
                a: a.clone(),
                b: b.clone(),
            });
        }
    }

    result.reverse();
    Ok(Shape::new(result))
}

/// Dimension `i` counted from the trailing end, or 1 past the leading end.
fn aligned_dim(dims: &[usize], i: usize) -> usize {
    if i < dims.len() {
        dims[dims.len() - 1 - i]
    } else {
        1
    }
}

/// Row-major strides of `shape`.
///
/// Strides saturate instead of overflowing. A shape whose product overflows
/// holds no addressable element unless it also has a zero dimension, and
/// then no stride is ever used.
pub fn strides(shape: &Shape) -> Dims {
    let mut out: Dims = smallvec![0; shape.ndim()];
    let mut acc = 1usize;
    for (stride, &dim) in out.iter_mut().zip(shape.0.iter()).rev() {
        *stride = acc;
        acc = acc.saturating_mul(dim);
    }
    out
}

/// Decode a flat row-major index into `coord`, which must have
/// `shape.ndim()` entries.
pub fn unravel_index(flat: usize, shape: &Shape, coord: &mut [usize]) {
    debug_assert_eq!(coord.len(), shape.ndim());
    let mut remaining = flat;
    for (c, &dim) in coord.iter_mut().zip(shape.0.iter()).rev() {
        *c = remaining % dim;
        remaining /= dim;
    }
}

/// Flat offset into an input buffer for an output coordinate.
///
/// `coord` indexes `out_shape`; `in_strides` are the row-major strides of
/// `in_shape`. The input is right-aligned against the output, and every axis
/// where the input has size 1 reads index 0.
pub fn offset_of(out_shape: &Shape, in_strides: &[usize], coord: &[usize], in_shape: &Shape) -> usize {
    debug_assert_eq!(coord.len(), out_shape.ndim());
    debug_assert_eq!(in_strides.len(), in_shape.ndim());
    let pad = out_shape.ndim() - in_shape.ndim();
    in_shape
        .0
        .iter()
        .zip(in_strides)
        .zip(&coord[pad..])
        .map(|((&dim, &stride), &c)| if dim == 1 { 0 } else { c * stride })
        .sum()
}

/// Output axes along which an input of `in_shape` is repeated when
/// broadcast to `out_shape`, in ascending order.
///
/// Leading axes the input lacks are not included.
pub fn broadcast_dims(in_shape: &Shape, out_shape: &Shape) -> Vec<usize> {
    let pad = out_shape.ndim().saturating_sub(in_shape.ndim());
    in_shape
        .0
        .iter()
        .enumerate()
        .filter(|&(i, &dim)| dim == 1 && out_shape.0[pad + i] > 1)
        .map(|(i, _)| pad + i)
        .collect()
}

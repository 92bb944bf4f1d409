//! Broadcasting elementwise division.
//!
//! Operands are read through [`offset_of`], so a `[4]` tensor divided by a
//! `[1]` tensor never materializes an expanded copy of the divisor.
//!
//! Float and bool results are computed in `f32`, `int32` results in `f64`
//! and complex results in `Complex32`, then cast to the promoted dtype:
//! - `int32`: truncation toward zero, saturating at the bounds, NaN → 0
//! - `bool`: any non-zero quotient (NaN included) is `true`
//! - `float16`: rounded to nearest

use half::f16;
use num_complex::Complex32;
use smallvec::smallvec;
use tracing::debug;

use tkern_core::{
    BufferView, NamedTensorMap, Result, Shape, TensorData, TensorHandle, TensorStore,
    TkernError, require_input,
};
use tkern_ops::broadcast::{Dims, broadcast_dims, offset_of, strides, unravel_index};
use tkern_ops::{broadcast_shapes, promote};

/// Kernel name under which division is registered.
pub const DIV: &str = "Div";

/// An output element type for the quotient of two stored elements.
trait Quotient: Copy {
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self;
}

impl Quotient for f32 {
    #[inline]
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self {
        a.real_at(ia) / b.real_at(ib)
    }
}

impl Quotient for f16 {
    #[inline]
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self {
        f16::from_f32(f32::quotient(a, ia, b, ib))
    }
}

impl Quotient for i32 {
    // f64 holds every i32 exactly.
    #[inline]
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self {
        (a.wide_at(ia) / b.wide_at(ib)) as i32
    }
}

impl Quotient for bool {
    #[inline]
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self {
        f32::quotient(a, ia, b, ib) != 0.0
    }
}

impl Quotient for Complex32 {
    #[inline]
    fn quotient(a: &BufferView<'_>, ia: usize, b: &BufferView<'_>, ib: usize) -> Self {
        a.complex_at(ia) / b.complex_at(ib)
    }
}

/// Compute `out[i] = a[off_a(i)] / b[off_b(i)]` for every output index.
///
/// `out` must already hold `out_shape.numel()` elements of the result dtype;
/// its variant selects the cast applied to each quotient. Complex operands
/// feeding a real output contribute their real part only.
pub fn execute(
    a: BufferView<'_>,
    a_shape: &Shape,
    b: BufferView<'_>,
    b_shape: &Shape,
    out: &mut TensorData,
    out_shape: &Shape,
) -> Result<()> {
    check_len(a.len(), a_shape)?;
    check_len(b.len(), b_shape)?;
    check_len(out.len(), out_shape)?;

    match out {
        TensorData::Bool(o) => fill(&a, a_shape, &b, b_shape, o, out_shape),
        TensorData::I32(o) => fill(&a, a_shape, &b, b_shape, o, out_shape),
        TensorData::F16(o) => fill(&a, a_shape, &b, b_shape, o, out_shape),
        TensorData::F32(o) => fill(&a, a_shape, &b, b_shape, o, out_shape),
        TensorData::C64(o) => fill(&a, a_shape, &b, b_shape, o, out_shape),
    }
    Ok(())
}

fn check_len(len: usize, shape: &Shape) -> Result<()> {
    if len == shape.numel() {
        Ok(())
    } else {
        Err(TkernError::ShapeBufferMismatch {
            shape: shape.clone(),
            expected: shape.numel(),
            got: len,
        })
    }
}

fn fill<T: Quotient>(
    a: &BufferView<'_>,
    a_shape: &Shape,
    b: &BufferView<'_>,
    b_shape: &Shape,
    out: &mut [T],
    out_shape: &Shape,
) {
    // Same-shape operands map every output index to itself.
    if a_shape == out_shape && b_shape == out_shape {
        for (i, o) in out.iter_mut().enumerate() {
            *o = T::quotient(a, i, b, i);
        }
        return;
    }

    let a_strides = strides(a_shape);
    let b_strides = strides(b_shape);
    let mut coord: Dims = smallvec![0; out_shape.ndim()];
    for (i, o) in out.iter_mut().enumerate() {
        unravel_index(i, out_shape, &mut coord);
        let off_a = offset_of(out_shape, &a_strides, &coord, a_shape);
        let off_b = offset_of(out_shape, &b_strides, &coord, b_shape);
        *o = T::quotient(a, off_a, b, off_b);
    }
}

/// CPU kernel for `Div` with inputs named `a` and `b`.
///
/// The output is registered in `store` only after the whole quotient has
/// been computed, so any failure leaves the store as it was.
pub fn div_kernel(inputs: &NamedTensorMap, store: &mut TensorStore) -> Result<TensorHandle> {
    let a = require_input(inputs, DIV, "a")?;
    let b = require_input(inputs, DIV, "b")?;

    let a_buf = store.read(a.id)?;
    let b_buf = store.read(b.id)?;
    let out_shape = broadcast_shapes(a_buf.shape(), b_buf.shape())?;
    let dtype = promote(a_buf.dtype(), b_buf.dtype());
    debug!(
        a = %a_buf.shape(),
        b = %b_buf.shape(),
        out = %out_shape,
        a_repeat = ?broadcast_dims(a_buf.shape(), &out_shape),
        b_repeat = ?broadcast_dims(b_buf.shape(), &out_shape),
        %dtype,
        "div"
    );

    let mut out = store.reserve_output(dtype, out_shape.numel())?;
    execute(
        a_buf.view(),
        a_buf.shape(),
        b_buf.view(),
        b_buf.shape(),
        &mut out,
        &out_shape,
    )?;
    store.write(out, out_shape)
}

/// Input map for a binary kernel taking `a` and `b`.
pub fn binary_inputs(a: &TensorHandle, b: &TensorHandle) -> NamedTensorMap {
    NamedTensorMap::from([("a".to_string(), a.clone()), ("b".to_string(), b.clone())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tkern_core::DType;

    fn run(a: TensorData, a_shape: &[usize], b: TensorData, b_shape: &[usize]) -> (TensorData, Shape) {
        let a_shape = Shape::new(a_shape.to_vec());
        let b_shape = Shape::new(b_shape.to_vec());
        let out_shape = broadcast_shapes(&a_shape, &b_shape).unwrap();
        let mut out = TensorData::try_zeros(promote(a.dtype(), b.dtype()), out_shape.numel()).unwrap();
        execute(a.view(), &a_shape, b.view(), &b_shape, &mut out, &out_shape).unwrap();
        (out, out_shape)
    }

    #[test]
    fn test_same_shape() {
        let (out, shape) = run(
            TensorData::from(vec![6.0f32, 9.0, 12.0]),
            &[3],
            TensorData::from(vec![2.0f32, 3.0, 4.0]),
            &[3],
        );
        assert_eq!(shape, Shape::new(vec![3]));
        assert_eq!(out, TensorData::F32(vec![3.0, 3.0, 3.0]));
    }

    #[test]
    fn test_broadcast_divisor() {
        let (out, shape) = run(
            TensorData::from(vec![2.0f32, 4.0, 6.0, 8.0]),
            &[4],
            TensorData::from(vec![2.0f32]),
            &[1],
        );
        assert_eq!(shape, Shape::new(vec![4]));
        assert_eq!(out, TensorData::F32(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_broadcast_both_sides() {
        // [2, 1] / [1, 3] -> [2, 3]
        let (out, shape) = run(
            TensorData::from(vec![6.0f32, 12.0]),
            &[2, 1],
            TensorData::from(vec![1.0f32, 2.0, 3.0]),
            &[1, 3],
        );
        assert_eq!(shape, Shape::new(vec![2, 3]));
        assert_eq!(out, TensorData::F32(vec![6.0, 3.0, 2.0, 12.0, 6.0, 4.0]));
    }

    #[test]
    fn test_broadcast_rank_extension_dividend() {
        // scalar / [2, 2]
        let (out, shape) = run(
            TensorData::from(vec![8.0f32]),
            &[],
            TensorData::from(vec![1.0f32, 2.0, 4.0, 8.0]),
            &[2, 2],
        );
        assert_eq!(shape, Shape::new(vec![2, 2]));
        assert_eq!(out, TensorData::F32(vec![8.0, 4.0, 2.0, 1.0]));
    }

    #[test]
    fn test_division_by_zero() {
        let (out, _) = run(
            TensorData::from(vec![1.0f32, -1.0, 0.0]),
            &[3],
            TensorData::from(vec![0.0f32]),
            &[1],
        );
        let TensorData::F32(v) = out else {
            panic!("expected f32 output");
        };
        assert_eq!(v[0], f32::INFINITY);
        assert_eq!(v[1], f32::NEG_INFINITY);
        assert!(v[2].is_nan());
    }

    #[test]
    fn test_int_division_truncates_toward_zero() {
        let (out, _) = run(
            TensorData::from(vec![7i32, -7, 1, 5]),
            &[4],
            TensorData::from(vec![2i32, 2, 0, 0]),
            &[4],
        );
        // 1/0 saturates to i32::MAX; 5/0 likewise.
        assert_eq!(out, TensorData::I32(vec![3, -3, i32::MAX, i32::MAX]));
    }

    #[test]
    fn test_int_division_by_zero_casts() {
        // 0/0 is NaN and becomes 0; -1/0 is -inf and saturates low.
        let (out, _) = run(
            TensorData::from(vec![0i32, -1]),
            &[2],
            TensorData::from(vec![0i32]),
            &[],
        );
        assert_eq!(out, TensorData::I32(vec![0, i32::MIN]));
    }

    #[test]
    fn test_large_int_division_is_exact() {
        let (out, _) = run(
            TensorData::from(vec![16_777_217i32, i32::MAX, -i32::MAX, i32::MIN]),
            &[4],
            TensorData::from(vec![1i32]),
            &[1],
        );
        assert_eq!(
            out,
            TensorData::I32(vec![16_777_217, i32::MAX, -i32::MAX, i32::MIN])
        );

        let (out, _) = run(
            TensorData::from(vec![i32::MAX, 16_777_217]),
            &[2],
            TensorData::from(vec![2i32, -1]),
            &[2],
        );
        assert_eq!(out, TensorData::I32(vec![1_073_741_823, -16_777_217]));
    }

    #[test]
    fn test_int_by_half_promotes_to_half() {
        let (out, _) = run(
            TensorData::from(vec![3i32, -8]),
            &[2],
            TensorData::from(vec![f16::from_f32(2.0)]),
            &[],
        );
        assert_eq!(
            out,
            TensorData::F16(vec![f16::from_f32(1.5), f16::from_f32(-4.0)])
        );
    }

    #[test]
    fn test_int_by_float_promotes() {
        let (out, _) = run(
            TensorData::from(vec![1i32, 3]),
            &[2],
            TensorData::from(vec![2.0f32]),
            &[],
        );
        assert_eq!(out, TensorData::F32(vec![0.5, 1.5]));
    }

    #[test]
    fn test_bool_division() {
        let (out, _) = run(
            TensorData::from(vec![true, false, true]),
            &[3],
            TensorData::from(vec![true, true, false]),
            &[3],
        );
        // 1/1, 0/1, 1/0 = inf
        assert_eq!(out, TensorData::Bool(vec![true, false, true]));
    }

    #[test]
    fn test_f16_division() {
        let (out, _) = run(
            TensorData::from(vec![f16::from_f32(3.0)]),
            &[1],
            TensorData::from(vec![f16::from_f32(2.0)]),
            &[1],
        );
        assert_eq!(out, TensorData::F16(vec![f16::from_f32(1.5)]));
    }

    #[test]
    fn test_complex_division() {
        // (1 + 2i) / (3 - 4i) = (-1 + 2i) / 5
        let (out, _) = run(
            TensorData::from(vec![Complex32::new(1.0, 2.0)]),
            &[1],
            TensorData::from(vec![Complex32::new(3.0, -4.0)]),
            &[1],
        );
        let TensorData::C64(v) = out else {
            panic!("expected complex output");
        };
        assert!((v[0].re - -0.2).abs() < 1e-6);
        assert!((v[0].im - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_real_by_complex_promotes() {
        let (out, _) = run(
            TensorData::from(vec![4.0f32, 8.0]),
            &[2],
            TensorData::from(vec![Complex32::new(2.0, 0.0)]),
            &[1],
        );
        assert_eq!(out.dtype(), DType::C64);
        assert_eq!(
            out,
            TensorData::C64(vec![Complex32::new(2.0, 0.0), Complex32::new(4.0, 0.0)])
        );
    }

    #[test]
    fn test_empty_output() {
        let (out, shape) = run(
            TensorData::F32(vec![]),
            &[0, 3],
            TensorData::from(vec![1.0f32, 2.0, 3.0]),
            &[3],
        );
        assert_eq!(shape, Shape::new(vec![0, 3]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_huge_empty_shape_by_scalar() {
        let (out, shape) = run(
            TensorData::F32(vec![]),
            &[0, usize::MAX, 2],
            TensorData::from(vec![2.0f32]),
            &[],
        );
        assert_eq!(shape, Shape::new(vec![0, usize::MAX, 2]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_execute_rejects_short_buffer() {
        let a = TensorData::from(vec![1.0f32, 2.0]);
        let b = TensorData::from(vec![1.0f32]);
        let mut out = TensorData::F32(vec![0.0; 3]);
        let err = execute(
            a.view(),
            &Shape::new(vec![3]),
            b.view(),
            &Shape::new(vec![1]),
            &mut out,
            &Shape::new(vec![3]),
        )
        .unwrap_err();
        assert!(matches!(err, TkernError::ShapeBufferMismatch { expected: 3, got: 2, .. }));
    }

    #[test]
    fn test_kernel_registers_one_output() {
        let mut store = TensorStore::new();
        let a = store
            .write(TensorData::from(vec![2.0f32, 4.0]), Shape::new(vec![2]))
            .unwrap();
        let b = store
            .write(TensorData::from(vec![2i32]), Shape::scalar())
            .unwrap();
        let out = div_kernel(&binary_inputs(&a, &b), &mut store).unwrap();
        assert_eq!(out.shape, Shape::new(vec![2]));
        assert_eq!(out.dtype, DType::F32);
        assert_eq!(store.num_data_ids(), 3);
        assert_eq!(store.read(out.id).unwrap().view(), BufferView::F32(&[1.0, 2.0]));
    }

    #[test]
    fn test_kernel_missing_input() {
        let mut store = TensorStore::new();
        let a = store
            .write(TensorData::from(vec![1.0f32]), Shape::scalar())
            .unwrap();
        let inputs = NamedTensorMap::from([("a".to_string(), a)]);
        let err = div_kernel(&inputs, &mut store).unwrap_err();
        assert_eq!(
            err,
            TkernError::MissingInput {
                op: DIV.into(),
                name: "b".into(),
            }
        );
        assert_eq!(store.num_data_ids(), 1);
    }
}

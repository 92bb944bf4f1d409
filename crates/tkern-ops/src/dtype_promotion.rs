//! DType promotion rules.
//!
//! When two tensors with different dtypes are combined in a binary op,
//! the result dtype is the least upper bound in the lattice
//! `bool < int32 < float16 < float32 < complex64`.

use tkern_core::DType;

/// Promote two dtypes to a common result dtype.
///
/// Rules:
/// - Same dtype → same dtype
/// - Bool + anything → the other type
/// - Int + Float → the float type
/// - Anything + Complex → complex
pub fn promote(a: DType, b: DType) -> DType {
    if a == b {
        return a;
    }
    let pa = priority(a);
    let pb = priority(b);
    if pa >= pb { a } else { b }
}

/// Position in the promotion lattice (higher = wider).
pub fn priority(dt: DType) -> u8 {
    match dt {
        DType::Bool => 0,
        DType::I32 => 1,
        DType::F16 => 2,
        DType::F32 => 3,
        DType::C64 => 4,
    }
}

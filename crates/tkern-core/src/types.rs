//! Core type definitions: DType, Shape.

/// Supported element types for stored tensors.
///
/// Variants are listed in promotion order, narrowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    I32,
    F16,
    F32,
    C64,
}

impl DType {
    /// All supported dtypes, narrowest first.
    pub const ALL: [DType; 5] = [DType::Bool, DType::I32, DType::F16, DType::F32, DType::C64];

    /// Size in bytes of a single element.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::Bool => 1,
            DType::I32 => 4,
            DType::F16 => 2,
            DType::F32 => 4,
            DType::C64 => 8,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Bool => write!(f, "bool"),
            DType::I32 => write!(f, "int32"),
            DType::F16 => write!(f, "float16"),
            DType::F32 => write!(f, "float32"),
            DType::C64 => write!(f, "complex64"),
        }
    }
}

/// Tensor shape (dimensions).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    /// Scalar (rank-0) shape.
    pub fn scalar() -> Self {
        Self(vec![])
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements, or `None` if it does not fit in `usize`.
    ///
    /// Any zero dimension makes the count zero, however large the others.
    pub fn checked_numel(&self) -> Option<usize> {
        if self.0.contains(&0) {
            return Some(0);
        }
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Total number of elements. A scalar holds one element.
    ///
    /// Saturates at `usize::MAX`, which no real buffer can match.
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

use crate::dtype::DType;

/// Errors raised by the tensor engine.
///
/// Every variant is fatal for the operation that produced it. The engine
/// performs no local recovery; callers propagate with `?`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("cannot broadcast shapes {shapes:?}: axis {axis} has sizes {a} and {b}")]
    Broadcast {
        shapes: Vec<Vec<usize>>,
        axis: usize,
        a: usize,
        b: usize,
    },

    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("invalid axis {axis} for tensor of rank {ndim}")]
    InvalidAxis { axis: isize, ndim: usize },

    #[error("cannot reshape {numel} elements into {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<i64> },

    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("matmul dimension mismatch: [{m}, {k1}] @ [{k2}, {n}]")]
    MatmulDimMismatch { m: usize, k1: usize, k2: usize, n: usize },

    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType { dtype: DType, op: &'static str },

    #[error("in-place {op} cannot resize destination {dest:?} to {required:?}")]
    InPlaceResize {
        op: &'static str,
        dest: Vec<usize>,
        required: Vec<usize>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

//! Tensor operations: arithmetic, reduction, matmul, quantization, manipulation.
//!
//! All operations return new tensors (functional style).
//! In-place variants are suffixed with `_` (e.g., `add_`).

pub mod arithmetic;
pub mod manipulation;
pub mod matmul;
pub mod quantize;
pub mod reduction;

/// Split `dims` around `axis` into `(outer, axis_len, inner)` element counts.
pub(crate) fn axis_partition(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = dims[..axis].iter().product();
    let inner = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

//! Blocked matrix multiplication.
//!
//! The right operand is resorted once per call into its transpose so that
//! both operands of every dot product are contiguous runs of whole blocks.
//! Output rows are distributed over the worker pool; each output element is
//! produced by exactly one task with a sequential accumulation over `k`, so
//! parallel and sequential results are bit-identical.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::broadcast::broadcast_batch;
use crate::dtype::Numeric;
use crate::error::TensorError;
use crate::shape::Dims;
use crate::tensor::{Tensor, TensorView, TensorViewMut};
use crate::Result;

/// Multiply-adds per call above which output rows go to the worker pool.
const PAR_FLOPS: usize = 1 << 16;

/// Output columns processed against one cached left row.
const TILE_N: usize = 64;

/// `out[m, n] = a[m, k] @ b_t[n, k]^T`, all row-major.
pub fn matmul_kernel<T: Numeric>(a: &[T], b_t: &[T], out: &mut [T], m: usize, k: usize, n: usize) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b_t.len(), n * k);
    debug_assert_eq!(out.len(), m * n);
    if m == 0 || n == 0 {
        return;
    }
    let row = |(i, dst): (usize, &mut [T])| {
        let lhs = &a[i * k..(i + 1) * k];
        for j0 in (0..n).step_by(TILE_N) {
            let j_end = (j0 + TILE_N).min(n);
            for (j, o) in (j0..j_end).zip(&mut dst[j0..j_end]) {
                let rhs = &b_t[j * k..(j + 1) * k];
                *o = dot(lhs, rhs);
            }
        }
    };
    if m * n * k >= PAR_FLOPS {
        out.par_chunks_mut(n).enumerate().for_each(row);
    } else {
        out.chunks_mut(n).enumerate().for_each(row);
    }
}

#[inline]
fn dot<T: Numeric>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::ZERO, |acc, (&x, &y)| acc.wrapping_add(x.wrapping_mul(y)))
}

impl<T: Numeric> Tensor<T> {
    /// Matrix multiplication: self @ other.
    ///
    /// Supports:
    /// - [M, K] @ [K, N] → [M, N]
    /// - [..., M, K] @ [..., K, N] → [broadcast(...), M, N]
    /// - 1-D operands are promoted (prepended / appended 1) and the added
    ///   axis removed from the result
    pub fn matmul(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        if self.ndim() == 0 || other.ndim() == 0 {
            return Err(TensorError::RankMismatch {
                expected: 1,
                got: 0,
            });
        }
        let a_vec = self.ndim() == 1;
        let b_vec = other.ndim() == 1;
        let a = if a_vec {
            self.as_view().reinterpret([1, self.numel()].into())?
        } else {
            self.as_view()
        };
        let b_owned;
        let b = if b_vec {
            b_owned = other.reshaped(&[-1, 1])?;
            b_owned.as_view()
        } else {
            other.as_view()
        };

        let (m, k1) = last_two(a.dims());
        let (k2, n) = last_two(b.dims());
        if k1 != k2 {
            return Err(TensorError::MatmulDimMismatch { m, k1, k2, n });
        }

        // resort once: [..., K, N] -> [..., N, K]
        let b_t = b.to_owned().t()?;
        let batch = broadcast_batch(a.shape(), b_t.shape(), 2)?;
        let mut out_dims: Dims = batch.clone();
        out_dims.extend_from_slice(&[m, n]);
        let rank = out_dims.len();

        let a = a.reinterpret(a.shape().unsqueezed_to(rank))?;
        let b_view = b_t.as_view();
        let b_t = b_view.reinterpret(b_view.shape().unsqueezed_to(rank))?;
        let mut out = Tensor::<T>::zeros(&out_dims);
        batched(&a, &b_t, out.as_view_mut(), (m, k1, n))?;

        let mut final_dims: Dims = SmallVec::from_slice(&batch);
        if !a_vec {
            final_dims.push(m);
        }
        if !b_vec {
            final_dims.push(n);
        }
        out.into_shape(final_dims.into())
    }

    /// General matrix multiply: `alpha * op(A) @ op(B) + beta * C`.
    ///
    /// `A` and `B` are 2-D; `C` broadcasts one way onto `[M, N]`.
    pub fn gemm(
        &self,
        b: &Tensor<T>,
        c: Option<&Tensor<T>>,
        alpha: T,
        beta: T,
        trans_a: bool,
        trans_b: bool,
    ) -> Result<Tensor<T>> {
        for t in [self, b] {
            if t.ndim() != 2 {
                return Err(TensorError::RankMismatch {
                    expected: 2,
                    got: t.ndim(),
                });
            }
        }
        let a_owned;
        let a = if trans_a {
            a_owned = self.t()?;
            &a_owned
        } else {
            self
        };
        // the kernel wants op(B)^T, which is B itself when trans_b is set
        let b_owned;
        let b_t = if trans_b {
            b
        } else {
            b_owned = b.t()?;
            &b_owned
        };
        let (m, k1) = (a.dims()[0], a.dims()[1]);
        let (n, k2) = (b_t.dims()[0], b_t.dims()[1]);
        if k1 != k2 {
            return Err(TensorError::MatmulDimMismatch { m, k1, k2, n });
        }

        let mut out = Tensor::<T>::zeros(&[m, n]);
        matmul_kernel(a.as_slice(), b_t.as_slice(), out.as_mut_slice(), m, k1, n);
        if alpha != T::ONE {
            out.map_inplace(|v| alpha.wrapping_mul(v));
        }
        if let Some(c) = c {
            if beta != T::ZERO {
                crate::broadcast::broadcast_assign(&mut out, c.as_view(), "gemm", |o, c| o.wrapping_add(beta.wrapping_mul(c)))?;
            }
        }
        Ok(out)
    }
}

fn last_two(dims: &[usize]) -> (usize, usize) {
    let n = dims.len();
    (dims[n - 2], dims[n - 1])
}

/// Peel broadcast batch axes down to the trailing matrix.
fn batched<T: Numeric>(
    a: &TensorView<'_, T>,
    b_t: &TensorView<'_, T>,
    mut out: TensorViewMut<'_, T>,
    (m, k, n): (usize, usize, usize),
) -> Result<()> {
    if out.shape().ndim() == 2 {
        matmul_kernel(a.as_slice(), b_t.as_slice(), out.as_mut_slice(), m, k, n);
        return Ok(());
    }
    let replay_a = a.dims()[0] == 1;
    let replay_b = b_t.dims()[0] == 1;
    for (i, dst) in out.into_rows()?.enumerate() {
        let ar = a.row(if replay_a { 0 } else { i })?;
        let br = b_t.row(if replay_b { 0 } else { i })?;
        batched(&ar, &br, dst, (m, k, n))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
        let mut c = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                for p in 0..k {
                    c[i * n + j] += a[i * k + p] * b[p * n + j];
                }
            }
        }
        c
    }

    #[test]
    fn test_matmul_basic() {
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = Tensor::from_vec(vec![7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0], &[3, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.dims(), &[2, 2]);
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_large_matches_naive() {
        let (m, k, n) = (70, 130, 90);
        let a = Tensor::from_fn(&[m, k], |i| (i % 7) as f64 * 0.5);
        let b = Tensor::from_fn(&[k, n], |i| (i % 11) as f64 - 5.0);
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.as_slice(), naive(a.as_slice(), b.as_slice(), m, k, n).as_slice());
    }

    #[test]
    fn test_matmul_batched_broadcast() {
        let a = Tensor::from_fn(&[2, 1, 2, 3], |i| i as i32);
        let b = Tensor::from_fn(&[3, 3, 4], |i| (i % 5) as i32);
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.dims(), &[2, 3, 2, 4]);
        for x in 0..2 {
            for y in 0..3 {
                let lhs = a.view(&[x, 0]).unwrap().to_owned();
                let rhs = b.view(&[y]).unwrap().to_owned();
                let expected = lhs.matmul(&rhs).unwrap();
                assert_eq!(c.view(&[x, y]).unwrap().as_slice(), expected.as_slice());
            }
        }
    }

    #[test]
    fn test_matmul_vectors() {
        let v = Tensor::from_vec(vec![1i64, 2, 3], &[3]).unwrap();
        let m = Tensor::from_fn(&[3, 2], |i| i as i64);
        let vm = v.matmul(&m).unwrap();
        assert_eq!(vm.dims(), &[2]);
        assert_eq!(vm.as_slice(), &[16, 22]);
        let mt = m.t().unwrap();
        let mv = mt.matmul(&v).unwrap();
        assert_eq!(mv.dims(), &[2]);
        assert_eq!(mv.as_slice(), &[16, 22]);
        let dot = v.matmul(&v).unwrap();
        assert!(dot.is_scalar());
        assert_eq!(dot.item().unwrap(), 14);
    }

    #[test]
    fn test_matmul_dim_mismatch() {
        let a = Tensor::<f32>::zeros(&[2, 2]);
        let b = Tensor::<f32>::zeros(&[3, 1]);
        assert!(matches!(
            a.matmul(&b),
            Err(TensorError::MatmulDimMismatch { k1: 2, k2: 3, .. })
        ));
        assert!(a.matmul(&Tensor::scalar(1.0)).is_err());
    }

    #[test]
    fn test_gemm() {
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::from_vec(vec![1.0f32, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
        let c = Tensor::from_vec(vec![10.0f32, 20.0], &[2]).unwrap();
        let y = a.gemm(&b, Some(&c), 2.0, 0.5, true, false).unwrap();
        // 2 * A^T + 0.5 * c
        assert_eq!(y.as_slice(), &[7.0, 16.0, 9.0, 18.0]);

        let y = a.gemm(&b, None, 1.0, 1.0, false, true).unwrap();
        assert_eq!(y.as_slice(), a.as_slice());

        let too_big = Tensor::<f32>::zeros(&[3, 2]);
        assert!(a.gemm(&b, Some(&too_big), 1.0, 1.0, false, false).is_err());
    }

    #[test]
    fn test_kernel_zero_inner() {
        let mut out = vec![1.0f32; 4];
        matmul_kernel(&[], &[], &mut out, 2, 0, 2);
        assert_eq!(out, vec![0.0; 4]);
    }
}

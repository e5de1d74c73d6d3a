//! Reduction operations: sum, min, max.
//!
//! Sums accumulate strictly in index order so results do not depend on the
//! worker count. Min and max are order-independent and may split across the
//! pool.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::dtype::Numeric;
use crate::error::TensorError;
use crate::ops::axis_partition;
use crate::shape::{normalize_axis, Dims};
use crate::tensor::Tensor;
use crate::Result;

const PAR_THRESHOLD: usize = 8192;

impl<T: Numeric> Tensor<T> {
    /// Sum of all elements, accumulated in index order. Integer sums wrap.
    pub fn sum(&self) -> T {
        self.as_slice().iter().fold(T::ZERO, |acc, &v| acc.wrapping_add(v))
    }

    /// Sum along `axis`, removing it or keeping it with size 1.
    pub fn sum_axis(&self, axis: isize, keepdims: bool) -> Result<Tensor<T>> {
        let axis = normalize_axis(axis, self.ndim())?;
        let dims = self.dims();
        let (outer, len, inner) = axis_partition(dims, axis);
        let src = self.as_slice();
        let mut out = vec![T::ZERO; outer * inner];

        if inner > 0 {
            let kernel = |(o, dst): (usize, &mut [T])| {
                for a in 0..len {
                    let row = &src[(o * len + a) * inner..][..inner];
                    for (d, &s) in dst.iter_mut().zip(row) {
                        *d = d.wrapping_add(s);
                    }
                }
            };
            if src.len() >= PAR_THRESHOLD {
                out.par_chunks_mut(inner).enumerate().for_each(kernel);
            } else {
                out.chunks_mut(inner).enumerate().for_each(kernel);
            }
        }

        let mut out_dims: Dims = SmallVec::from_slice(dims);
        if keepdims {
            out_dims[axis] = 1;
        } else {
            out_dims.remove(axis);
        }
        Tensor::from_vec(out, &out_dims)
    }

    /// Sum over several axes. An empty axis list reduces everything.
    pub fn sum_axes(&self, axes: &[isize], keepdims: bool) -> Result<Tensor<T>> {
        let mut resolved: Vec<usize> = if axes.is_empty() {
            (0..self.ndim()).collect()
        } else {
            axes.iter()
                .map(|&a| normalize_axis(a, self.ndim()))
                .collect::<Result<_>>()?
        };
        resolved.sort_unstable();
        resolved.dedup();

        let mut out = self.clone();
        for &axis in &resolved {
            out = out.sum_axis(axis as isize, true)?;
        }
        if keepdims {
            return Ok(out);
        }
        let dims: Vec<usize> = out
            .dims()
            .iter()
            .enumerate()
            .filter(|(i, _)| resolved.binary_search(i).is_err())
            .map(|(_, &d)| d)
            .collect();
        out.into_shape(dims.into())
    }

    /// Smallest and largest element, or `None` for an empty tensor.
    pub fn min_max(&self) -> Option<(T, T)> {
        let data = self.as_slice();
        let first = *data.first()?;
        let fold = |(lo, hi): (T, T), &v: &T| (lo.min_of(v), hi.max_of(v));
        Some(if data.len() >= PAR_THRESHOLD {
            data.par_iter()
                .fold(|| (first, first), fold)
                .reduce(|| (first, first), |(a, b), (c, d)| (a.min_of(c), b.max_of(d)))
        } else {
            data.iter().fold((first, first), fold)
        })
    }

    pub fn min(&self) -> Result<T> {
        self.min_max().map(|(lo, _)| lo).ok_or_else(empty_reduction)
    }

    pub fn max(&self) -> Result<T> {
        self.min_max().map(|(_, hi)| hi).ok_or_else(empty_reduction)
    }
}

fn empty_reduction() -> TensorError {
    TensorError::InvalidArgument("reduction over an empty tensor".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(t.sum(), 10.0);
        assert_eq!(Tensor::<i32>::zeros(&[0]).sum(), 0);
    }

    #[test]
    fn test_integer_sums_wrap() {
        let t = Tensor::from_vec(vec![200u8, 100, 1, 255], &[2, 2]).unwrap();
        assert_eq!(t.sum(), 44);
        assert_eq!(t.sum_axis(0, false).unwrap().as_slice(), &[201, 99]);
    }

    #[test]
    fn test_sum_axis() {
        let t = Tensor::from_fn(&[2, 3, 2], |i| i as i64);
        let s0 = t.sum_axis(0, false).unwrap();
        assert_eq!(s0.dims(), &[3, 2]);
        assert_eq!(s0.as_slice(), &[6, 8, 10, 12, 14, 16]);

        let s1 = t.sum_axis(-2, true).unwrap();
        assert_eq!(s1.dims(), &[2, 1, 2]);
        assert_eq!(s1.as_slice(), &[6, 9, 24, 27]);

        assert!(t.sum_axis(3, false).is_err());
    }

    #[test]
    fn test_sum_axes() {
        let t = Tensor::from_fn(&[2, 3, 4], |_| 1.0f64);
        let s = t.sum_axes(&[0, 2], false).unwrap();
        assert_eq!(s.dims(), &[3]);
        assert_eq!(s.as_slice(), &[8.0, 8.0, 8.0]);

        let all = t.sum_axes(&[], false).unwrap();
        assert!(all.is_scalar());
        assert_eq!(all.item().unwrap(), 24.0);

        let kept = t.sum_axes(&[1], true).unwrap();
        assert_eq!(kept.dims(), &[2, 1, 4]);
    }

    #[test]
    fn test_min_max() {
        let t = Tensor::from_vec(vec![3i8, -7, 5, 0], &[4]).unwrap();
        assert_eq!(t.min_max(), Some((-7, 5)));
        assert_eq!(t.min().unwrap(), -7);
        assert!(Tensor::<f32>::zeros(&[0, 3]).max().is_err());
    }

    #[test]
    fn test_min_max_parallel_matches_sequential() {
        let t = Tensor::from_fn(&[100_000], |i| ((i * 7919) % 10_007) as f32 - 5000.0);
        let (lo, hi) = t.min_max().unwrap();
        let lo_seq = t.as_slice().iter().copied().fold(f32::INFINITY, f32::min);
        let hi_seq = t.as_slice().iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert_eq!((lo, hi), (lo_seq, hi_seq));
    }
}

//! Stacking equally shaped tensors; Loop scan outputs are built with it.

use smallvec::SmallVec;

use crate::dtype::Element;
use crate::error::TensorError;
use crate::shape::Dims;
use crate::tensor::Tensor;
use crate::Result;

impl<T: Element> Tensor<T> {
    /// Join equally shaped tensors along a new leading axis.
    pub fn stack(parts: &[&Tensor<T>]) -> Result<Tensor<T>> {
        let first = parts.first().ok_or_else(|| {
            TensorError::InvalidArgument("stack of zero tensors".into())
        })?;
        let mut data = Vec::with_capacity(first.numel() * parts.len());
        for p in parts {
            if p.dims() != first.dims() {
                return Err(TensorError::ShapeMismatch {
                    expected: first.dims().to_vec(),
                    got: p.dims().to_vec(),
                });
            }
            data.extend_from_slice(p.as_slice());
        }
        let mut dims: Dims = SmallVec::from_slice(&[parts.len()]);
        dims.extend_from_slice(first.dims());
        Tensor::from_vec(data, &dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack() {
        let a = Tensor::from_vec(vec![1, 2], &[2]).unwrap();
        let b = Tensor::from_vec(vec![3, 4], &[2]).unwrap();
        let s = Tensor::stack(&[&a, &b]).unwrap();
        assert_eq!(s.dims(), &[2, 2]);
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);

        let scalars = [Tensor::scalar(1.0f32), Tensor::scalar(2.0)];
        let s = Tensor::stack(&[&scalars[0], &scalars[1]]).unwrap();
        assert_eq!(s.dims(), &[2]);

        let c = Tensor::from_vec(vec![5, 6, 7], &[3]).unwrap();
        assert!(Tensor::stack(&[&a, &c]).is_err());
        assert!(Tensor::<u8>::stack(&[]).is_err());
    }
}

//! Dtype-erased tensors.
//!
//! [`AnyTensor`] tags a [`Tensor<T>`] with its element kind so heterogeneous
//! values can share one container. Typed access goes through
//! [`AnyTensor::downcast_ref`] / [`AnyTensor::into_typed`]; the arithmetic
//! wrappers dispatch on the tag and require matching dtypes.

use std::fmt;

use crate::dtype::{DType, Element};
use crate::error::TensorError;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::Result;

#[derive(Clone, PartialEq)]
pub enum AnyTensor {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    I8(Tensor<i8>),
    U8(Tensor<u8>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
}

/// Element types that can be stored in an [`AnyTensor`].
pub trait AnyElement: Element {
    fn wrap(t: Tensor<Self>) -> AnyTensor;
    fn peek(t: &AnyTensor) -> Option<&Tensor<Self>>;
    fn unwrap_any(t: AnyTensor) -> std::result::Result<Tensor<Self>, AnyTensor>;
}

macro_rules! impl_any_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl AnyElement for $t {
                fn wrap(t: Tensor<Self>) -> AnyTensor {
                    AnyTensor::$variant(t)
                }

                fn peek(t: &AnyTensor) -> Option<&Tensor<Self>> {
                    match t {
                        AnyTensor::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn unwrap_any(t: AnyTensor) -> std::result::Result<Tensor<Self>, AnyTensor> {
                    match t {
                        AnyTensor::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }

            impl From<Tensor<$t>> for AnyTensor {
                fn from(t: Tensor<$t>) -> Self {
                    AnyTensor::$variant(t)
                }
            }
        )*
    };
}

impl_any_element! {
    f32 => F32,
    f64 => F64,
    i8 => I8,
    u8 => U8,
    i32 => I32,
    i64 => I64,
}

/// Run `$body` with `$t` bound to the inner typed tensor, whatever its dtype.
#[macro_export]
macro_rules! with_any {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            $crate::AnyTensor::F32($t) => $body,
            $crate::AnyTensor::F64($t) => $body,
            $crate::AnyTensor::I8($t) => $body,
            $crate::AnyTensor::U8($t) => $body,
            $crate::AnyTensor::I32($t) => $body,
            $crate::AnyTensor::I64($t) => $body,
        }
    };
}

/// Same-dtype binary dispatch; the body's typed result is re-wrapped.
macro_rules! binary_any {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr) => {
        match ($a, $b) {
            (AnyTensor::F32($x), AnyTensor::F32($y)) => Ok(AnyTensor::from($body)),
            (AnyTensor::F64($x), AnyTensor::F64($y)) => Ok(AnyTensor::from($body)),
            (AnyTensor::I8($x), AnyTensor::I8($y)) => Ok(AnyTensor::from($body)),
            (AnyTensor::U8($x), AnyTensor::U8($y)) => Ok(AnyTensor::from($body)),
            (AnyTensor::I32($x), AnyTensor::I32($y)) => Ok(AnyTensor::from($body)),
            (AnyTensor::I64($x), AnyTensor::I64($y)) => Ok(AnyTensor::from($body)),
            (a, b) => Err(TensorError::DTypeMismatch {
                expected: a.dtype(),
                got: b.dtype(),
            }),
        }
    };
}

impl AnyTensor {
    pub fn dtype(&self) -> DType {
        with_any!(self, t => t.dtype())
    }

    pub fn shape(&self) -> &Shape {
        with_any!(self, t => t.shape())
    }

    pub fn dims(&self) -> &[usize] {
        with_any!(self, t => t.dims())
    }

    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape().numel()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape().is_scalar()
    }

    /// Borrow as `Tensor<T>`, failing if the dtype differs.
    pub fn downcast_ref<T: AnyElement>(&self) -> Result<&Tensor<T>> {
        T::peek(self).ok_or(TensorError::DTypeMismatch {
            expected: T::DTYPE,
            got: self.dtype(),
        })
    }

    /// Take as `Tensor<T>`, failing if the dtype differs.
    pub fn into_typed<T: AnyElement>(self) -> Result<Tensor<T>> {
        T::unwrap_any(self).map_err(|other| TensorError::DTypeMismatch {
            expected: T::DTYPE,
            got: other.dtype(),
        })
    }

    /// All elements converted to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        use crate::dtype::Numeric;
        with_any!(self, t => t.as_slice().iter().map(|v| v.to_f64()).collect())
    }

    /// Integer elements as `i64`; used for shape, axis and count inputs.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        match self {
            AnyTensor::I64(t) => Ok(t.to_vec()),
            AnyTensor::I32(t) => Ok(t.as_slice().iter().map(|&v| v as i64).collect()),
            AnyTensor::I8(t) => Ok(t.as_slice().iter().map(|&v| v as i64).collect()),
            AnyTensor::U8(t) => Ok(t.as_slice().iter().map(|&v| v as i64).collect()),
            other => Err(TensorError::UnsupportedDType {
                dtype: other.dtype(),
                op: "integer conversion",
            }),
        }
    }

    /// Truth value of a one-element tensor (non-zero is true).
    pub fn truthy(&self) -> Result<bool> {
        match self.to_f64_vec().as_slice() {
            [v] => Ok(*v != 0.0),
            _ => Err(TensorError::ShapeMismatch {
                expected: vec![],
                got: self.dims().to_vec(),
            }),
        }
    }

    // =========================================================================
    // Dispatching wrappers
    // =========================================================================

    pub fn add(&self, other: &AnyTensor) -> Result<AnyTensor> {
        binary_any!(self, other, a, b => a.add(b)?)
    }

    pub fn sub(&self, other: &AnyTensor) -> Result<AnyTensor> {
        binary_any!(self, other, a, b => a.sub(b)?)
    }

    pub fn mul(&self, other: &AnyTensor) -> Result<AnyTensor> {
        binary_any!(self, other, a, b => a.mul(b)?)
    }

    pub fn div(&self, other: &AnyTensor) -> Result<AnyTensor> {
        binary_any!(self, other, a, b => a.div(b)?)
    }

    pub fn matmul(&self, other: &AnyTensor) -> Result<AnyTensor> {
        binary_any!(self, other, a, b => a.matmul(b)?)
    }

    /// Negation; unsigned tensors are rejected.
    pub fn neg(&self) -> Result<AnyTensor> {
        Ok(match self {
            AnyTensor::F32(t) => t.neg().into(),
            AnyTensor::F64(t) => t.neg().into(),
            AnyTensor::I8(t) => t.neg().into(),
            AnyTensor::I32(t) => t.neg().into(),
            AnyTensor::I64(t) => t.neg().into(),
            AnyTensor::U8(_) => {
                return Err(TensorError::UnsupportedDType {
                    dtype: DType::U8,
                    op: "neg",
                })
            }
        })
    }

    pub fn relu(&self) -> AnyTensor {
        with_any!(self, t => t.relu().into())
    }

    pub fn sum_axes(&self, axes: &[isize], keepdims: bool) -> Result<AnyTensor> {
        Ok(with_any!(self, t => t.sum_axes(axes, keepdims)?.into()))
    }

    pub fn transpose(&self, perm: &[usize]) -> Result<AnyTensor> {
        Ok(with_any!(self, t => t.transpose(perm)?.into()))
    }

    /// Reshape with `-1` / `0` rules; consumes to avoid a copy.
    pub fn reshape(self, target: &[i64]) -> Result<AnyTensor> {
        Ok(with_any!(self, t => t.reshape(target)?.into()))
    }

    /// Stack equally typed tensors along a new leading axis.
    pub fn stack(parts: &[&AnyTensor]) -> Result<AnyTensor> {
        let first = parts.first().ok_or_else(|| {
            TensorError::InvalidArgument("stack of zero tensors".into())
        })?;
        fn typed<'a, T: AnyElement>(parts: &[&'a AnyTensor]) -> Result<Vec<&'a Tensor<T>>> {
            parts.iter().map(|p| p.downcast_ref::<T>()).collect()
        }
        Ok(match first.dtype() {
            DType::F32 => Tensor::stack(&typed::<f32>(parts)?)?.into(),
            DType::F64 => Tensor::stack(&typed::<f64>(parts)?)?.into(),
            DType::I8 => Tensor::stack(&typed::<i8>(parts)?)?.into(),
            DType::U8 => Tensor::stack(&typed::<u8>(parts)?)?.into(),
            DType::I32 => Tensor::stack(&typed::<i32>(parts)?)?.into(),
            DType::I64 => Tensor::stack(&typed::<i64>(parts)?)?.into(),
        })
    }
}

impl fmt::Debug for AnyTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_any!(self, t => fmt::Debug::fmt(t, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let any = AnyTensor::from(Tensor::from_vec(vec![1.0f32, 2.0], &[2]).unwrap());
        assert_eq!(any.dtype(), DType::F32);
        assert_eq!(any.dims(), &[2]);
        assert!(any.downcast_ref::<f32>().is_ok());
        assert!(matches!(
            any.downcast_ref::<i64>(),
            Err(TensorError::DTypeMismatch {
                expected: DType::I64,
                got: DType::F32
            })
        ));
        let t: Tensor<f32> = any.into_typed().unwrap();
        assert_eq!(t.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_dispatch_requires_matching_dtype() {
        let a = AnyTensor::from(Tensor::from_vec(vec![1i32, 2], &[2]).unwrap());
        let b = AnyTensor::from(Tensor::scalar(3i32));
        let c = a.add(&b).unwrap();
        assert_eq!(c.downcast_ref::<i32>().unwrap().as_slice(), &[4, 5]);

        let f = AnyTensor::from(Tensor::scalar(1.0f64));
        assert!(a.mul(&f).is_err());
    }

    #[test]
    fn test_neg_unsigned_rejected() {
        let u = AnyTensor::from(Tensor::from_vec(vec![1u8], &[1]).unwrap());
        assert!(u.neg().is_err());
        assert_eq!(u.relu(), u);
    }

    #[test]
    fn test_integer_views() {
        let shape = AnyTensor::from(Tensor::from_vec(vec![2i64, -1], &[2]).unwrap());
        assert_eq!(shape.to_i64_vec().unwrap(), vec![2, -1]);
        let f = AnyTensor::from(Tensor::scalar(1.0f32));
        assert!(f.to_i64_vec().is_err());
        assert!(f.truthy().unwrap());
        assert!(!AnyTensor::from(Tensor::scalar(0u8)).truthy().unwrap());
    }

    #[test]
    fn test_stack_any() {
        let a = AnyTensor::from(Tensor::scalar(1i64));
        let b = AnyTensor::from(Tensor::scalar(2i64));
        let s = AnyTensor::stack(&[&a, &b]).unwrap();
        assert_eq!(s.dims(), &[2]);
        let f = AnyTensor::from(Tensor::scalar(2.0f32));
        assert!(AnyTensor::stack(&[&a, &f]).is_err());
    }
}

//! Element-wise arithmetic with broadcasting.

use crate::broadcast::{broadcast_assign, broadcast_binary};
use crate::dtype::{Numeric, Signed};
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::Result;

impl<T: Numeric> Tensor<T> {
    /// Element-wise addition: self + other. Integer overflow wraps.
    pub fn add(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        binary_op(self, other, T::wrapping_add)
    }

    /// Element-wise subtraction: self - other.
    pub fn sub(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        binary_op(self, other, T::wrapping_sub)
    }

    /// Element-wise multiplication: self * other.
    pub fn mul(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        binary_op(self, other, T::wrapping_mul)
    }

    /// Element-wise division: self / other.
    ///
    /// Integer division by zero is an error rather than a panic;
    /// `MIN / -1` wraps to `MIN`.
    pub fn div(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        check_divisor(other)?;
        binary_op(self, other, T::wrapping_div)
    }

    /// Scalar addition: self + scalar.
    pub fn add_scalar(&self, scalar: T) -> Tensor<T> {
        self.map(|a| a.wrapping_add(scalar))
    }

    /// Scalar multiplication: self * scalar.
    pub fn mul_scalar(&self, scalar: T) -> Tensor<T> {
        self.map(|a| a.wrapping_mul(scalar))
    }

    /// max(self, 0)
    pub fn relu(&self) -> Tensor<T> {
        self.map(|a| a.max_of(T::ZERO))
    }

    /// Clamp all elements to [min, max].
    pub fn clamp(&self, min: T, max: T) -> Tensor<T> {
        self.map(|a| a.max_of(min).min_of(max))
    }

    // =========================================================================
    // In-place (destination shape is fixed)
    // =========================================================================

    pub fn add_(&mut self, other: &Tensor<T>) -> Result<()> {
        broadcast_assign(self, other.as_view(), "add", T::wrapping_add)
    }

    pub fn sub_(&mut self, other: &Tensor<T>) -> Result<()> {
        broadcast_assign(self, other.as_view(), "sub", T::wrapping_sub)
    }

    pub fn mul_(&mut self, other: &Tensor<T>) -> Result<()> {
        broadcast_assign(self, other.as_view(), "mul", T::wrapping_mul)
    }

    pub fn div_(&mut self, other: &Tensor<T>) -> Result<()> {
        check_divisor(other)?;
        broadcast_assign(self, other.as_view(), "div", T::wrapping_div)
    }
}

impl<T: Signed> Tensor<T> {
    /// Element-wise negation: -self.
    pub fn neg(&self) -> Tensor<T> {
        self.map(T::wrapping_neg)
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Tensor<T> {
        self.map(|a| a.abs_val())
    }
}

fn check_divisor<T: Numeric>(divisor: &Tensor<T>) -> Result<()> {
    if T::DTYPE.is_integer() && divisor.as_slice().contains(&T::ZERO) {
        return Err(TensorError::InvalidArgument(format!(
            "integer division by zero ({})",
            T::DTYPE
        )));
    }
    Ok(())
}

/// Binary op with the 0-d fast path: a scalar operand skips shape
/// unification and is folded into a single pass over the other operand.
fn binary_op<T: Numeric>(a: &Tensor<T>, b: &Tensor<T>, op: impl Fn(T, T) -> T + Sync) -> Result<Tensor<T>> {
    if b.is_scalar() {
        let y = b.as_slice()[0];
        return Ok(a.map(|x| op(x, y)));
    }
    if a.is_scalar() {
        let x = a.as_slice()[0];
        return Ok(b.map(|y| op(x, y)));
    }
    broadcast_binary(a.as_view(), b.as_view(), op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_broadcast() {
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = Tensor::from_vec(vec![10.0f32, 20.0, 30.0], &[3]).unwrap();
        let c = a.add(&b).unwrap();
        assert_eq!(c.as_slice(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_scalar_operands() {
        let a = Tensor::from_vec(vec![2i32, 4, 6], &[3]).unwrap();
        let two = Tensor::scalar(2i32);
        assert_eq!(a.div(&two).unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(two.sub(&a).unwrap().as_slice(), &[0, -2, -4]);
        assert_eq!(two.mul(&two).unwrap().item().unwrap(), 4);
    }

    #[test]
    fn test_integer_div_by_zero() {
        let a = Tensor::from_vec(vec![1i64, 2], &[2]).unwrap();
        let b = Tensor::from_vec(vec![1i64, 0], &[2]).unwrap();
        assert!(a.div(&b).is_err());
        let f = Tensor::from_vec(vec![1.0f32], &[1]).unwrap();
        let z = Tensor::from_vec(vec![0.0f32], &[1]).unwrap();
        assert!(f.div(&z).unwrap().as_slice()[0].is_infinite());
    }

    #[test]
    fn test_unary() {
        let a = Tensor::from_vec(vec![-1.5f64, 0.0, 2.0], &[3]).unwrap();
        assert_eq!(a.neg().as_slice(), &[1.5, -0.0, -2.0]);
        assert_eq!(a.relu().as_slice(), &[0.0, 0.0, 2.0]);
        assert_eq!(a.abs().as_slice(), &[1.5, 0.0, 2.0]);
        assert_eq!(a.clamp(-1.0, 1.0).as_slice(), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_in_place() {
        let mut a = Tensor::from_vec(vec![1u8, 2, 3, 4], &[2, 2]).unwrap();
        let b = Tensor::from_vec(vec![1u8, 2], &[2, 1]).unwrap();
        a.mul_(&b).unwrap();
        assert_eq!(a.as_slice(), &[1, 2, 6, 8]);

        let big = Tensor::<u8>::zeros(&[3, 2, 2]);
        assert!(matches!(
            a.add_(&big),
            Err(TensorError::InPlaceResize { op: "add", .. })
        ));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let a = Tensor::from_vec(vec![200u8, 255], &[2]).unwrap();
        let b = Tensor::from_vec(vec![100u8, 1], &[2]).unwrap();
        assert_eq!(a.add(&b).unwrap().as_slice(), &[44, 0]);
        assert_eq!(b.sub(&a).unwrap().as_slice(), &[156, 2]);
        assert_eq!(a.mul(&b).unwrap().as_slice(), &[32, 255]);

        let min = Tensor::from_vec(vec![i32::MIN, 7], &[2]).unwrap();
        let neg_one = Tensor::scalar(-1i32);
        assert_eq!(min.div(&neg_one).unwrap().as_slice(), &[i32::MIN, -7]);

        let mut m = min.clone();
        m.div_(&Tensor::from_vec(vec![-1i32, 1], &[2]).unwrap()).unwrap();
        assert_eq!(m.as_slice(), &[i32::MIN, 7]);

        let small = Tensor::from_vec(vec![i8::MIN, -3], &[2]).unwrap();
        assert_eq!(small.neg().as_slice(), &[i8::MIN, 3]);
        assert_eq!(small.abs().as_slice(), &[i8::MIN, 3]);
        assert_eq!(small.add_scalar(-1).as_slice(), &[i8::MAX, -4]);
    }
}

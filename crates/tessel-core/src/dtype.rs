use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Primitive element kinds a tensor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
}

impl DType {
    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I8 => "i8",
            DType::U8 => "u8",
            DType::I32 => "i32",
            DType::I64 => "i64",
        };
        write!(f, "{s}")
    }
}

/// A primitive type that can live in a [`TiledBuffer`](crate::TiledBuffer).
pub trait Element:
    bytemuck::Pod + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const DTYPE: DType;
}

/// Elements that support the arithmetic kernels.
///
/// Integer arithmetic wraps on overflow, matching two's-complement tensor
/// semantics; float arithmetic is plain IEEE 754.
pub trait Numeric: Element {
    const ZERO: Self;
    const ONE: Self;
    const MIN: Self;
    const MAX: Self;

    /// Lossy conversion used by reductions and quantization.
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;
    /// `MIN / -1` wraps to `MIN`. Integer division by zero still panics;
    /// callers reject zero divisors first.
    fn wrapping_div(self, rhs: Self) -> Self;

    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    fn max_of(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

/// Numeric elements with a sign (negation is defined).
pub trait Signed: Numeric {
    /// `-MIN` wraps to `MIN` for integers.
    fn wrapping_neg(self) -> Self;

    fn abs_val(self) -> Self {
        if self < Self::ZERO {
            self.wrapping_neg()
        } else {
            self
        }
    }
}

/// Floating-point elements.
pub trait Float:
    Signed
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    fn round_half_even(self) -> Self;
}

macro_rules! impl_element {
    ($t:ty => $dtype:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;
        }
    };
}

macro_rules! impl_float {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl_element!($t => $dtype);

            impl Numeric for $t {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn wrapping_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    self - rhs
                }

                #[inline]
                fn wrapping_mul(self, rhs: Self) -> Self {
                    self * rhs
                }

                #[inline]
                fn wrapping_div(self, rhs: Self) -> Self {
                    self / rhs
                }
            }

            impl Signed for $t {
                #[inline]
                fn wrapping_neg(self) -> Self {
                    -self
                }
            }

            impl Float for $t {
                #[inline]
                fn round_half_even(self) -> Self {
                    self.round_ties_even()
                }
            }
        )*
    };
}

macro_rules! impl_int {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl_element!($t => $dtype);

            impl Numeric for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn wrapping_add(self, rhs: Self) -> Self {
                    <$t>::wrapping_add(self, rhs)
                }

                #[inline]
                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$t>::wrapping_sub(self, rhs)
                }

                #[inline]
                fn wrapping_mul(self, rhs: Self) -> Self {
                    <$t>::wrapping_mul(self, rhs)
                }

                #[inline]
                fn wrapping_div(self, rhs: Self) -> Self {
                    <$t>::wrapping_div(self, rhs)
                }
            }
        )*
    };
}

macro_rules! impl_signed_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Signed for $t {
                #[inline]
                fn wrapping_neg(self) -> Self {
                    <$t>::wrapping_neg(self)
                }
            }
        )*
    };
}

impl_float!(f32 => F32, f64 => F64);
impl_int!(i8 => I8, u8 => U8, i32 => I32, i64 => I64);
impl_signed_int!(i8, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(DType::F32.element_size(), 4);
        assert_eq!(DType::U8.element_size(), 1);
        assert_eq!(DType::I64.element_size(), 8);
        assert_eq!(<f64 as Element>::DTYPE, DType::F64);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(2.5f32.round_half_even(), 2.0);
        assert_eq!(3.5f32.round_half_even(), 4.0);
        assert_eq!((-0.5f64).round_half_even(), 0.0);
    }

    #[test]
    fn test_min_max_of() {
        assert_eq!(3i32.min_of(-2), -2);
        assert_eq!(1.5f32.max_of(0.5), 1.5);
        assert_eq!((-4i8).abs_val(), 4);
    }

    #[test]
    fn test_integer_ops_wrap() {
        assert_eq!(Numeric::wrapping_add(200u8, 100), 44);
        assert_eq!(Numeric::wrapping_sub(0u8, 1), 255);
        assert_eq!(Numeric::wrapping_mul(i32::MAX, 2), -2);
        assert_eq!(Numeric::wrapping_div(i32::MIN, -1), i32::MIN);
        assert_eq!(i8::MIN.abs_val(), i8::MIN);
        assert_eq!(Signed::wrapping_neg(i64::MIN), i64::MIN);
        assert_eq!(Numeric::wrapping_div(7.0f32, 2.0), 3.5);
    }
}

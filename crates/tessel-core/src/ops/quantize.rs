//! Linear quantization: dynamic u8 quantization, static quantize /
//! dequantize (per tensor or per axis), and integer matmul.
//!
//! Rounding is round-half-to-even throughout.

use crate::dtype::{DType, Element, Float, Numeric};
use crate::error::TensorError;
use crate::ops::axis_partition;
use crate::shape::normalize_axis;
use crate::tensor::Tensor;
use crate::Result;

/// Output of [`dynamic_quantize_linear`].
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicQuantized<F: Float> {
    pub values: Tensor<u8>,
    pub scale: F,
    pub zero_point: u8,
}

/// Asymmetric u8 quantization with a range derived from the data.
///
/// The range always includes zero: `min0 = min(0, min(x))`,
/// `max0 = max(0, max(x))`, `scale = (max0 - min0) / 255`. An all-zero (or
/// empty) input gives `scale = 0`, `zero_point = 0` and zero output.
pub fn dynamic_quantize_linear<F: Float>(x: &Tensor<F>) -> Result<DynamicQuantized<F>> {
    let (lo, hi) = x.min_max().unwrap_or((F::ZERO, F::ZERO));
    let min0 = lo.min_of(F::ZERO);
    let max0 = hi.max_of(F::ZERO);
    let qmax = F::from_f64(255.0);
    let scale = (max0 - min0) / qmax;

    if scale == F::ZERO {
        return Ok(DynamicQuantized {
            values: Tensor::zeros(x.dims()),
            scale,
            zero_point: 0,
        });
    }

    let zero_point = (-min0 / scale).round_half_even().max_of(F::ZERO).min_of(qmax);
    let values = x.map(|v| {
        ((v / scale).round_half_even() + zero_point)
            .max_of(F::ZERO)
            .min_of(qmax)
            .to_f64() as u8
    });
    Ok(DynamicQuantized {
        values,
        scale,
        zero_point: zero_point.to_f64() as u8,
    })
}

/// Per-tensor or per-axis parameters resolved against an input shape.
struct Channels {
    outer: usize,
    len: usize,
    inner: usize,
}

impl Channels {
    /// Scalar parameters cover the whole tensor; 1-D parameters must match
    /// `dims[axis]`.
    fn resolve(dims: &[usize], param_dims: &[usize], axis: isize) -> Result<Self> {
        let numel: usize = dims.iter().product();
        if param_dims.iter().product::<usize>() == 1 && param_dims.len() <= 1 {
            return Ok(Self {
                outer: 1,
                len: 1,
                inner: numel,
            });
        }
        if param_dims.len() != 1 {
            return Err(TensorError::RankMismatch {
                expected: 1,
                got: param_dims.len(),
            });
        }
        let axis = normalize_axis(axis, dims.len())?;
        if param_dims[0] != dims[axis] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![dims[axis]],
                got: param_dims.to_vec(),
            });
        }
        let (outer, len, inner) = axis_partition(dims, axis);
        Ok(Self { outer, len, inner })
    }

    /// Apply `f(value, channel)` to every element in order.
    fn map<T: Element, U: Element>(&self, src: &[T], f: impl Fn(T, usize) -> U) -> Vec<U> {
        let mut out = Vec::with_capacity(src.len());
        let mut idx = 0;
        for _ in 0..self.outer {
            for c in 0..self.len {
                out.extend(src[idx..idx + self.inner].iter().map(|&v| f(v, c)));
                idx += self.inner;
            }
        }
        out
    }
}

fn check_quant_dtype<Q: Element>(op: &'static str) -> Result<()> {
    match Q::DTYPE {
        DType::U8 | DType::I8 => Ok(()),
        dtype => Err(TensorError::UnsupportedDType { dtype, op }),
    }
}

fn zero_points<Q: Numeric>(zp: Option<&Tensor<Q>>, scale_dims: &[usize]) -> Result<Vec<f64>> {
    match zp {
        None => Ok(vec![0.0; scale_dims.iter().product()]),
        Some(zp) if zp.dims() == scale_dims || zp.numel() == 1 && scale_dims.iter().product::<usize>() == 1 => {
            Ok(zp.as_slice().iter().map(|v| v.to_f64()).collect())
        }
        Some(zp) => Err(TensorError::ShapeMismatch {
            expected: scale_dims.to_vec(),
            got: zp.dims().to_vec(),
        }),
    }
}

/// `q = saturate(round(x / scale) + zero_point)` into `u8` or `i8`.
pub fn quantize_linear<F: Float, Q: Numeric>(
    x: &Tensor<F>,
    scale: &Tensor<F>,
    zero_point: Option<&Tensor<Q>>,
    axis: isize,
) -> Result<Tensor<Q>> {
    check_quant_dtype::<Q>("quantize_linear")?;
    let channels = Channels::resolve(x.dims(), scale.dims(), axis)?;
    let zps = zero_points(zero_point, scale.dims())?;
    let scales = scale.as_slice();
    let (lo, hi) = (Q::MIN.to_f64(), Q::MAX.to_f64());
    let data = channels.map(x.as_slice(), |v, c| {
        let q = (v / scales[c]).round_half_even().to_f64() + zps[c];
        Q::from_f64(q.clamp(lo, hi))
    });
    Tensor::from_vec(data, x.dims())
}

/// `x = (q - zero_point) * scale`, per tensor or per axis.
pub fn dequantize_linear<Q: Numeric, F: Float>(
    q: &Tensor<Q>,
    scale: &Tensor<F>,
    zero_point: Option<&Tensor<Q>>,
    axis: isize,
) -> Result<Tensor<F>> {
    let channels = Channels::resolve(q.dims(), scale.dims(), axis)?;
    let zps = zero_points(zero_point, scale.dims())?;
    let scales = scale.as_slice();
    let data = channels.map(q.as_slice(), |v, c| F::from_f64(v.to_f64() - zps[c]) * scales[c]);
    Tensor::from_vec(data, q.dims())
}

/// Integer matmul of 8-bit operands with scalar zero points, accumulated in i32.
pub fn matmul_integer<A: Numeric, B: Numeric>(
    a: &Tensor<A>,
    b: &Tensor<B>,
    a_zero_point: Option<&Tensor<A>>,
    b_zero_point: Option<&Tensor<B>>,
) -> Result<Tensor<i32>> {
    check_quant_dtype::<A>("matmul_integer")?;
    check_quant_dtype::<B>("matmul_integer")?;
    let a_zp = scalar_zero_point(a_zero_point)?;
    let b_zp = scalar_zero_point(b_zero_point)?;
    let a = a.map(|v| v.to_f64() as i32 - a_zp);
    let b = b.map(|v| v.to_f64() as i32 - b_zp);
    a.matmul(&b)
}

fn scalar_zero_point<Q: Numeric>(zp: Option<&Tensor<Q>>) -> Result<i32> {
    match zp {
        None => Ok(0),
        Some(t) if t.numel() == 1 => Ok(t.as_slice()[0].to_f64() as i32),
        Some(t) => Err(TensorError::InvalidArgument(format!(
            "matmul_integer supports scalar zero points only, got shape {:?}",
            t.dims()
        ))),
    }
}

//! Quantization operators over the 8-bit kernels in `tessel_core`.

use std::sync::Arc;

use tessel_core::any::AnyElement;
use tessel_core::ops::quantize as kernels;
use tessel_core::{AnyTensor, DType, Float, Numeric, Tensor, TensorError};

use super::Args;
use crate::context::Context;
use crate::desc::NodeDesc;
use crate::operator::{Operator, OperatorRegistry};
use crate::value::Value;
use crate::Result;

fn unsupported(dtype: DType, op: &'static str) -> crate::error::GraphError {
    TensorError::UnsupportedDType { dtype, op }.into()
}

// =============================================================================
// DynamicQuantizeLinear
// =============================================================================

struct DynamicQuantizeLinear {
    node: String,
}

fn dynamic_typed<F: Float + AnyElement>(x: &AnyTensor) -> Result<Vec<Option<Value>>> {
    let q = kernels::dynamic_quantize_linear(x.downcast_ref::<F>()?)?;
    Ok(vec![
        Some(q.values.into()),
        Some(Tensor::scalar(q.scale).into()),
        Some(Tensor::scalar(q.zero_point).into()),
    ])
}

impl Operator for DynamicQuantizeLinear {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let x = Args::new(&self.node, &inputs).tensor(0)?;
        match x.dtype() {
            DType::F32 => dynamic_typed::<f32>(x),
            DType::F64 => dynamic_typed::<f64>(x),
            other => Err(unsupported(other, "DynamicQuantizeLinear")),
        }
    }
}

// =============================================================================
// QuantizeLinear / DequantizeLinear
// =============================================================================

struct QuantizeLinear {
    node: String,
    axis: isize,
}

fn quantize_typed<F: Float + AnyElement>(args: &Args<'_>, axis: isize) -> Result<AnyTensor> {
    let x = args.tensor(0)?.downcast_ref::<F>()?;
    let scale = args.tensor(1)?.downcast_ref::<F>()?;
    // the zero point's dtype selects the output type; u8 when absent
    Ok(match args.optional(2)? {
        None => kernels::quantize_linear::<F, u8>(x, scale, None, axis)?.into(),
        Some(AnyTensor::U8(zp)) => kernels::quantize_linear(x, scale, Some(zp), axis)?.into(),
        Some(AnyTensor::I8(zp)) => kernels::quantize_linear(x, scale, Some(zp), axis)?.into(),
        Some(other) => return Err(unsupported(other.dtype(), "QuantizeLinear")),
    })
}

impl Operator for QuantizeLinear {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let out = match args.tensor(0)?.dtype() {
            DType::F32 => quantize_typed::<f32>(&args, self.axis)?,
            DType::F64 => quantize_typed::<f64>(&args, self.axis)?,
            other => return Err(unsupported(other, "QuantizeLinear")),
        };
        Ok(vec![Some(out.into())])
    }
}

struct DequantizeLinear {
    node: String,
    axis: isize,
}

fn dequantize_typed<Q: Numeric + AnyElement, F: Float + AnyElement>(args: &Args<'_>, axis: isize) -> Result<AnyTensor>
where
    AnyTensor: From<Tensor<F>>,
{
    let x = args.tensor(0)?.downcast_ref::<Q>()?;
    let scale = args.tensor(1)?.downcast_ref::<F>()?;
    let zero_point = args.optional(2)?.map(|t| t.downcast_ref::<Q>()).transpose()?;
    Ok(kernels::dequantize_linear(x, scale, zero_point, axis)?.into())
}

impl Operator for DequantizeLinear {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let axis = self.axis;
        let out = match (args.tensor(0)?.dtype(), args.tensor(1)?.dtype()) {
            (DType::U8, DType::F32) => dequantize_typed::<u8, f32>(&args, axis)?,
            (DType::I8, DType::F32) => dequantize_typed::<i8, f32>(&args, axis)?,
            (DType::I32, DType::F32) => dequantize_typed::<i32, f32>(&args, axis)?,
            (DType::U8, DType::F64) => dequantize_typed::<u8, f64>(&args, axis)?,
            (DType::I8, DType::F64) => dequantize_typed::<i8, f64>(&args, axis)?,
            (DType::I32, DType::F64) => dequantize_typed::<i32, f64>(&args, axis)?,
            (DType::U8 | DType::I8 | DType::I32, scale) => return Err(unsupported(scale, "DequantizeLinear scale")),
            (other, _) => return Err(unsupported(other, "DequantizeLinear")),
        };
        Ok(vec![Some(out.into())])
    }
}

// =============================================================================
// MatMulInteger
// =============================================================================

struct MatMulInteger {
    node: String,
}

fn matmul_integer_typed<A: Numeric + AnyElement, B: Numeric + AnyElement>(args: &Args<'_>) -> Result<AnyTensor> {
    let a = args.tensor(0)?.downcast_ref::<A>()?;
    let b = args.tensor(1)?.downcast_ref::<B>()?;
    let a_zp = args.optional(2)?.map(|t| t.downcast_ref::<A>()).transpose()?;
    let b_zp = args.optional(3)?.map(|t| t.downcast_ref::<B>()).transpose()?;
    Ok(kernels::matmul_integer(a, b, a_zp, b_zp)?.into())
}

impl Operator for MatMulInteger {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let out = match (args.tensor(0)?.dtype(), args.tensor(1)?.dtype()) {
            (DType::U8, DType::U8) => matmul_integer_typed::<u8, u8>(&args)?,
            (DType::U8, DType::I8) => matmul_integer_typed::<u8, i8>(&args)?,
            (DType::I8, DType::U8) => matmul_integer_typed::<i8, u8>(&args)?,
            (DType::I8, DType::I8) => matmul_integer_typed::<i8, i8>(&args)?,
            (DType::U8 | DType::I8, other) | (other, _) => return Err(unsupported(other, "MatMulInteger")),
        };
        Ok(vec![Some(out.into())])
    }
}

// =============================================================================
// Factories
// =============================================================================

fn axis_attr(node: &NodeDesc) -> Result<isize> {
    Ok(node.attr_int("axis")?.unwrap_or(1) as isize)
}

pub fn dynamic_quantize_linear(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(DynamicQuantizeLinear { node: node.name.clone() }))
}

pub fn quantize_linear(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(QuantizeLinear {
        node: node.name.clone(),
        axis: axis_attr(node)?,
    }))
}

pub fn dequantize_linear(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(DequantizeLinear {
        node: node.name.clone(),
        axis: axis_attr(node)?,
    }))
}

pub fn matmul_integer(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(MatMulInteger { node: node.name.clone() }))
}

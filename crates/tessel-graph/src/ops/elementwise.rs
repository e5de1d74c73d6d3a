//! Broadcasting arithmetic and elementwise maps.

use std::sync::Arc;

use tessel_core::AnyTensor;

use super::{into_owned, Args};
use crate::context::Context;
use crate::desc::NodeDesc;
use crate::operator::{Operator, OperatorRegistry};
use crate::value::Value;
use crate::Result;

type BinaryKernel = fn(&AnyTensor, &AnyTensor) -> tessel_core::Result<AnyTensor>;
type UnaryKernel = fn(&AnyTensor) -> tessel_core::Result<AnyTensor>;

struct Binary {
    node: String,
    kernel: BinaryKernel,
}

impl Operator for Binary {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let out = (self.kernel)(args.tensor(0)?, args.tensor(1)?)?;
        Ok(vec![Some(out.into())])
    }
}

struct Unary {
    node: String,
    kernel: UnaryKernel,
}

impl Operator for Unary {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let out = (self.kernel)(args.tensor(0)?)?;
        Ok(vec![Some(out.into())])
    }
}

struct Identity {
    node: String,
}

impl Operator for Identity {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let value = Args::new(&self.node, &inputs).value(0)?.clone();
        drop(inputs);
        Ok(vec![Some(into_owned(value))])
    }
}

fn binary(node: &NodeDesc, kernel: BinaryKernel) -> Result<Box<dyn Operator>> {
    Ok(Box::new(Binary {
        node: node.name.clone(),
        kernel,
    }))
}

fn unary(node: &NodeDesc, kernel: UnaryKernel) -> Result<Box<dyn Operator>> {
    Ok(Box::new(Unary {
        node: node.name.clone(),
        kernel,
    }))
}

pub fn identity(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(Identity { node: node.name.clone() }))
}

pub fn add(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    binary(node, AnyTensor::add)
}

pub fn sub(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    binary(node, AnyTensor::sub)
}

pub fn mul(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    binary(node, AnyTensor::mul)
}

pub fn div(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    binary(node, AnyTensor::div)
}

pub fn neg(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    unary(node, AnyTensor::neg)
}

pub fn relu(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    unary(node, |t| Ok(t.relu()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use tessel_core::Tensor;

    fn call(op: &dyn Operator, inputs: Vec<AnyTensor>) -> Result<AnyTensor> {
        let ctx = Context::new();
        let inputs = inputs.into_iter().map(|t| Some(Arc::new(Value::from(t)))).collect();
        let mut out = op.apply(&ctx, inputs)?;
        Ok(out.remove(0).unwrap().into_tensor().unwrap())
    }

    #[test]
    fn test_add_broadcasts() {
        let reg = OperatorRegistry::new();
        let op = add(&NodeDesc::new("a", "Add", &["x", "y"], &["z"]), &reg).unwrap();
        let x = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let y = Tensor::from_vec(vec![10.0f32, 20.0], &[2]).unwrap();
        let z = call(op.as_ref(), vec![x.into(), y.into()]).unwrap();
        assert_eq!(z.downcast_ref::<f32>().unwrap().as_slice(), &[11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_dtype_mismatch_is_tensor_error() {
        let reg = OperatorRegistry::new();
        let op = mul(&NodeDesc::new("m", "Mul", &["x", "y"], &["z"]), &reg).unwrap();
        let err = call(op.as_ref(), vec![Tensor::scalar(1.0f32).into(), Tensor::scalar(1i64).into()]).unwrap_err();
        assert!(matches!(err, GraphError::Tensor(_)));
    }

    #[test]
    fn test_relu_and_neg() {
        let reg = OperatorRegistry::new();
        let x = Tensor::from_vec(vec![-1i32, 0, 5], &[3]).unwrap();
        let op = relu(&NodeDesc::new("r", "Relu", &["x"], &["y"]), &reg).unwrap();
        let y = call(op.as_ref(), vec![x.clone().into()]).unwrap();
        assert_eq!(y.downcast_ref::<i32>().unwrap().as_slice(), &[0, 0, 5]);
        let op = neg(&NodeDesc::new("n", "Neg", &["x"], &["y"]), &reg).unwrap();
        let y = call(op.as_ref(), vec![x.into()]).unwrap();
        assert_eq!(y.downcast_ref::<i32>().unwrap().as_slice(), &[1, 0, -5]);
    }

    #[test]
    fn test_missing_input() {
        let reg = OperatorRegistry::new();
        let op = sub(&NodeDesc::new("s", "Sub", &["x", ""], &["z"]), &reg).unwrap();
        let ctx = Context::new();
        let err = op
            .apply(&ctx, vec![Some(Arc::new(Value::from(Tensor::scalar(1.0f32)))), None])
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput { ref node, .. } if node == "s"));
    }
}

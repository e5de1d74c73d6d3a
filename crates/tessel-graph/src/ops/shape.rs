//! Reductions and layout changes: ReduceSum, Transpose, Reshape.

use std::sync::Arc;

use super::Args;
use crate::context::Context;
use crate::desc::NodeDesc;
use crate::error::GraphError;
use crate::operator::{Operator, OperatorRegistry};
use crate::value::Value;
use crate::Result;

struct ReduceSum {
    node: String,
    /// From the attribute (opset < 13); later opsets pass axes as input 1.
    axes: Option<Vec<isize>>,
    keepdims: bool,
    noop_with_empty_axes: bool,
}

impl Operator for ReduceSum {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let data = args.tensor(0)?;
        let axes: Vec<isize> = match (&self.axes, args.optional(1)?) {
            (Some(axes), _) => axes.clone(),
            (None, Some(t)) => t.to_i64_vec()?.into_iter().map(|a| a as isize).collect(),
            (None, None) => Vec::new(),
        };
        if axes.is_empty() && self.noop_with_empty_axes {
            return Ok(vec![Some(Value::Tensor(data.clone()))]);
        }
        Ok(vec![Some(data.sum_axes(&axes, self.keepdims)?.into())])
    }
}

struct Transpose {
    node: String,
    perm: Option<Vec<usize>>,
}

impl Operator for Transpose {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let data = args.tensor(0)?;
        let out = match &self.perm {
            Some(perm) => data.transpose(perm)?,
            None => {
                let reversed: Vec<usize> = (0..data.ndim()).rev().collect();
                data.transpose(&reversed)?
            }
        };
        Ok(vec![Some(out.into())])
    }
}

struct Reshape {
    node: String,
}

impl Operator for Reshape {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let target = args.tensor(1)?.to_i64_vec()?;
        let out = args.tensor(0)?.clone().reshape(&target)?;
        Ok(vec![Some(out.into())])
    }
}

pub fn reduce_sum(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    let axes = node
        .attr_ints("axes")?
        .map(|axes| axes.iter().map(|&a| a as isize).collect());
    Ok(Box::new(ReduceSum {
        node: node.name.clone(),
        axes,
        keepdims: node.attr_int("keepdims")?.unwrap_or(1) != 0,
        noop_with_empty_axes: node.attr_int("noop_with_empty_axes")?.unwrap_or(0) != 0,
    }))
}

pub fn transpose(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    let perm = match node.attr_ints("perm")? {
        None => None,
        Some(perm) => Some(
            perm.iter()
                .map(|&p| {
                    usize::try_from(p).map_err(|_| GraphError::InvalidAttribute {
                        node: node.name.clone(),
                        attribute: "perm".into(),
                        reason: format!("negative axis {p}"),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
    };
    Ok(Box::new(Transpose {
        node: node.name.clone(),
        perm,
    }))
}

pub fn reshape(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(Reshape { node: node.name.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::Attribute;
    use tessel_core::{AnyTensor, Tensor};

    fn run(op: &dyn Operator, inputs: Vec<AnyTensor>) -> Result<AnyTensor> {
        let ctx = Context::new();
        let inputs = inputs.into_iter().map(|t| Some(Arc::new(Value::from(t)))).collect();
        let mut out = op.apply(&ctx, inputs)?;
        Ok(out.remove(0).unwrap().into_tensor().unwrap())
    }

    fn grid() -> Tensor<f32> {
        Tensor::from_vec((0..6).map(|v| v as f32).collect(), &[2, 3]).unwrap()
    }

    #[test]
    fn test_reduce_sum_attribute_axes() {
        let reg = OperatorRegistry::new();
        let node = NodeDesc::new("r", "ReduceSum", &["x"], &["y"])
            .with_version(11)
            .with_attr("axes", Attribute::Ints(vec![-1]))
            .with_attr("keepdims", Attribute::Int(0));
        let y = run(reduce_sum(&node, &reg).unwrap().as_ref(), vec![grid().into()]).unwrap();
        assert_eq!(y.dims(), &[2]);
        assert_eq!(y.downcast_ref::<f32>().unwrap().as_slice(), &[3.0, 12.0]);
    }

    #[test]
    fn test_reduce_sum_input_axes_and_defaults() {
        let reg = OperatorRegistry::new();
        let op = reduce_sum(&NodeDesc::new("r", "ReduceSum", &["x", "axes"], &["y"]), &reg).unwrap();
        let axes = Tensor::from_vec(vec![0i64], &[1]).unwrap();
        let y = run(op.as_ref(), vec![grid().into(), axes.into()]).unwrap();
        assert_eq!(y.dims(), &[1, 3]);
        assert_eq!(y.downcast_ref::<f32>().unwrap().as_slice(), &[3.0, 5.0, 7.0]);

        // no axes: reduce everything, keeping rank
        let y = run(op.as_ref(), vec![grid().into()]).unwrap();
        assert_eq!(y.dims(), &[1, 1]);
        assert_eq!(y.downcast_ref::<f32>().unwrap().as_slice(), &[15.0]);
    }

    #[test]
    fn test_reduce_sum_noop_with_empty_axes() {
        let reg = OperatorRegistry::new();
        let node = NodeDesc::new("r", "ReduceSum", &["x"], &["y"]).with_attr("noop_with_empty_axes", Attribute::Int(1));
        let y = run(reduce_sum(&node, &reg).unwrap().as_ref(), vec![grid().into()]).unwrap();
        assert_eq!(y, AnyTensor::from(grid()));
    }

    #[test]
    fn test_transpose_default_and_perm() {
        let reg = OperatorRegistry::new();
        let op = transpose(&NodeDesc::new("t", "Transpose", &["x"], &["y"]), &reg).unwrap();
        let y = run(op.as_ref(), vec![grid().into()]).unwrap();
        assert_eq!(y.dims(), &[3, 2]);
        assert_eq!(y.downcast_ref::<f32>().unwrap().as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);

        let node = NodeDesc::new("t", "Transpose", &["x"], &["y"]).with_attr("perm", Attribute::Ints(vec![0, -1]));
        assert!(matches!(transpose(&node, &reg), Err(GraphError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_reshape_infers_dims() {
        let reg = OperatorRegistry::new();
        let op = reshape(&NodeDesc::new("s", "Reshape", &["x", "shape"], &["y"]), &reg).unwrap();
        let shape = Tensor::from_vec(vec![3i64, -1], &[2]).unwrap();
        let y = run(op.as_ref(), vec![grid().into(), shape.into()]).unwrap();
        assert_eq!(y.dims(), &[3, 2]);
        assert_eq!(y.downcast_ref::<f32>().unwrap().as_slice(), grid().as_slice());

        let bad = Tensor::from_vec(vec![4i64, 2], &[2]).unwrap();
        assert!(matches!(run(op.as_ref(), vec![grid().into(), bad.into()]), Err(GraphError::Tensor(_))));
    }
}

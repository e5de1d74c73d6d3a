//! Matrix products.

use std::sync::Arc;

use tessel_core::{with_any, AnyTensor, Numeric};

use super::Args;
use crate::context::Context;
use crate::desc::NodeDesc;
use crate::operator::{Operator, OperatorRegistry};
use crate::value::Value;
use crate::Result;

struct MatMul {
    node: String,
}

impl Operator for MatMul {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let out = args.tensor(0)?.matmul(args.tensor(1)?)?;
        Ok(vec![Some(out.into())])
    }
}

/// `alpha * op(A) @ op(B) + beta * C`
struct Gemm {
    node: String,
    alpha: f64,
    beta: f64,
    trans_a: bool,
    trans_b: bool,
}

impl Operator for Gemm {
    fn apply(&self, _ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let b = args.tensor(1)?;
        let c = args.optional(2)?;
        let out: AnyTensor = with_any!(args.tensor(0)?, a => {
            let c = match c {
                Some(c) => Some(c.downcast_ref()?),
                None => None,
            };
            a.gemm(
                b.downcast_ref()?,
                c,
                Numeric::from_f64(self.alpha),
                Numeric::from_f64(self.beta),
                self.trans_a,
                self.trans_b,
            )?
            .into()
        });
        Ok(vec![Some(out.into())])
    }
}

pub fn matmul(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(MatMul { node: node.name.clone() }))
}

pub fn gemm(node: &NodeDesc, _: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    Ok(Box::new(Gemm {
        node: node.name.clone(),
        alpha: node.attr_float("alpha")?.unwrap_or(1.0) as f64,
        beta: node.attr_float("beta")?.unwrap_or(1.0) as f64,
        trans_a: node.attr_int("transA")?.unwrap_or(0) != 0,
        trans_b: node.attr_int("transB")?.unwrap_or(0) != 0,
    }))
}

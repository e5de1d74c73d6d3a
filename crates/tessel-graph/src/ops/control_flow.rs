//! `If` and `Loop`.
//!
//! Bodies are built into [`Graph`]s once, when the enclosing node is
//! resolved. Each invocation runs the body in a child of the caller's
//! [`Context`], so names the body does not define resolve to the caller's
//! values. Releases inside the body only touch the child scope; outer values
//! a body reads survive every iteration.

use std::sync::Arc;

use tessel_core::{AnyTensor, DType, Tensor};

use super::{into_owned, Args};
use crate::context::Context;
use crate::desc::NodeDesc;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::operator::{Operator, OperatorRegistry};
use crate::value::Value;
use crate::Result;

fn truth(args: &Args<'_>, value: &Value, what: &str) -> Result<bool> {
    let tensor = value
        .as_tensor()
        .ok_or_else(|| args.invalid(format!("{what} must be a tensor, got a {}", value.kind())))?;
    Ok(tensor.truthy()?)
}

// =============================================================================
// If
// =============================================================================

struct If {
    node: String,
    then_branch: Graph,
    else_branch: Graph,
}

impl Operator for If {
    fn apply(&self, ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let branch = if truth(&args, args.value(0)?, "condition")? {
            &self.then_branch
        } else {
            &self.else_branch
        };
        tracing::trace!("{}: taking branch '{}'", self.node, branch.name());

        let mut scope = ctx.child();
        let outputs = branch.run_in(&mut scope, std::iter::empty::<(String, Arc<Value>)>())?;
        drop(scope);
        Ok(outputs.into_values().into_iter().map(|v| Some(into_owned(v))).collect())
    }
}

pub fn if_op(node: &NodeDesc, registry: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    let then_branch = Graph::build(node.attr_graph("then_branch")?, registry)?;
    let else_branch = Graph::build(node.attr_graph("else_branch")?, registry)?;
    if then_branch.outputs().len() != else_branch.outputs().len() {
        return Err(GraphError::InvalidAttribute {
            node: node.name.clone(),
            attribute: "else_branch".into(),
            reason: format!(
                "branches declare {} and {} outputs",
                then_branch.outputs().len(),
                else_branch.outputs().len()
            ),
        });
    }
    Ok(Box::new(If {
        node: node.name.clone(),
        then_branch,
        else_branch,
    }))
}

// =============================================================================
// Loop
// =============================================================================

/// Inputs `(max_trip_count?, cond?, v_initial...)`; body inputs
/// `(iteration_num, cond, v...)`; body outputs `(cond, v..., scan...)`.
/// Node outputs are the final `v...` followed by each scan output stacked
/// along a new leading axis.
struct Loop {
    node: String,
    body: Graph,
    carried: usize,
}

impl Loop {
    fn empty_scan(&self, index: usize) -> AnyTensor {
        let dtype = self.body.outputs()[1 + self.carried + index].dtype.unwrap_or(DType::F32);
        match dtype {
            DType::F32 => Tensor::<f32>::zeros(&[0]).into(),
            DType::F64 => Tensor::<f64>::zeros(&[0]).into(),
            DType::I8 => Tensor::<i8>::zeros(&[0]).into(),
            DType::U8 => Tensor::<u8>::zeros(&[0]).into(),
            DType::I32 => Tensor::<i32>::zeros(&[0]).into(),
            DType::I64 => Tensor::<i64>::zeros(&[0]).into(),
        }
    }
}

impl Operator for Loop {
    fn apply(&self, ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>> {
        let args = Args::new(&self.node, &inputs);
        let max_trips = match args.optional(0)? {
            Some(t) => match t.to_i64_vec()?.as_slice() {
                [m] => Some(*m),
                _ => return Err(args.invalid("trip count must hold exactly one element")),
            },
            None => None,
        };
        let cond_given = args.optional_value(1).is_some();
        if max_trips.is_none() && !cond_given {
            return Err(args.invalid("loop needs a trip count or a condition"));
        }
        let mut cond = match args.optional_value(1) {
            Some(v) => truth(&args, v, "condition")?,
            None => true,
        };
        if args.len().saturating_sub(2) != self.carried {
            return Err(args.invalid(format!(
                "body carries {} values, node supplies {}",
                self.carried,
                args.len().saturating_sub(2)
            )));
        }
        let mut carried: Vec<Arc<Value>> = (2..args.len())
            .map(|i| args.value(i).map(Arc::clone))
            .collect::<Result<_>>()?;

        let body_inputs = self.body.inputs();
        let scan_count = self.body.outputs().len() - 1 - self.carried;
        let mut scans: Vec<Vec<AnyTensor>> = vec![Vec::new(); scan_count];

        let mut iteration: i64 = 0;
        while cond && max_trips.map_or(true, |m| iteration < m) {
            let mut feed: Vec<(String, Arc<Value>)> = Vec::with_capacity(body_inputs.len());
            feed.push((body_inputs[0].name.clone(), Arc::new(Tensor::scalar(iteration).into())));
            feed.push((body_inputs[1].name.clone(), Arc::new(Tensor::scalar(u8::from(cond)).into())));
            for (info, value) in body_inputs[2..].iter().zip(carried.drain(..)) {
                feed.push((info.name.clone(), value));
            }

            let mut scope = ctx.child();
            let mut produced = self.body.run_in(&mut scope, feed)?.into_values().into_iter();
            drop(scope);

            let next_cond = produced
                .next()
                .ok_or_else(|| args.invalid("body produced no condition"))?;
            if cond_given {
                cond = truth(&args, &next_cond, "body condition")?;
            }
            carried.extend(produced.by_ref().take(self.carried));
            for (scan, value) in scans.iter_mut().zip(produced) {
                let tensor = value
                    .as_tensor()
                    .ok_or_else(|| args.invalid(format!("scan output must be a tensor, got a {}", value.kind())))?;
                scan.push(tensor.clone());
            }
            iteration += 1;
        }
        tracing::trace!("{}: loop finished after {} iteration(s)", self.node, iteration);

        let mut outputs: Vec<Option<Value>> = carried.into_iter().map(|v| Some(into_owned(v))).collect();
        for (index, scan) in scans.iter().enumerate() {
            let stacked = if scan.is_empty() {
                self.empty_scan(index)
            } else {
                let parts: Vec<&AnyTensor> = scan.iter().collect();
                AnyTensor::stack(&parts)?
            };
            outputs.push(Some(stacked.into()));
        }
        Ok(outputs)
    }
}

pub fn loop_op(node: &NodeDesc, registry: &OperatorRegistry) -> Result<Box<dyn Operator>> {
    let body_desc = node.attr_graph("body")?;
    let invalid = |reason: String| GraphError::InvalidAttribute {
        node: node.name.clone(),
        attribute: "body".into(),
        reason,
    };
    if body_desc.inputs.len() < 2 {
        return Err(invalid(format!(
            "body must declare iteration and condition inputs, found {}",
            body_desc.inputs.len()
        )));
    }
    let carried = body_desc.inputs.len() - 2;
    if body_desc.outputs.len() < 1 + carried {
        return Err(invalid(format!(
            "body declares {} outputs for {} carried values",
            body_desc.outputs.len(),
            carried
        )));
    }
    Ok(Box::new(Loop {
        node: node.name.clone(),
        body: Graph::build(body_desc, registry)?,
        carried,
    }))
}

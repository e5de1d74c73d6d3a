//! Builtin operator set.
//!
//! Each submodule provides factories with the [`OperatorFactory`] signature;
//! [`register_builtins`] wires them into a registry with the opset ranges
//! they implement.
//!
//! [`OperatorFactory`]: crate::operator::OperatorFactory

pub mod control_flow;
pub mod elementwise;
pub mod linalg;
pub mod quantize;
pub mod shape;

use std::sync::Arc;

use tessel_core::AnyTensor;

use crate::error::GraphError;
use crate::operator::{OperatorRegistry, VersionRange};
use crate::value::Value;
use crate::Result;

pub(crate) fn register_builtins(registry: &mut OperatorRegistry) {
    registry
        .register("Identity", VersionRange::since(1), elementwise::identity)
        .register("Add", VersionRange::since(7), elementwise::add)
        .register("Sub", VersionRange::since(7), elementwise::sub)
        .register("Mul", VersionRange::since(7), elementwise::mul)
        .register("Div", VersionRange::since(7), elementwise::div)
        .register("Neg", VersionRange::since(6), elementwise::neg)
        .register("Relu", VersionRange::since(6), elementwise::relu)
        .register("MatMul", VersionRange::since(1), linalg::matmul)
        .register("Gemm", VersionRange::since(7), linalg::gemm)
        .register("ReduceSum", VersionRange::since(1), shape::reduce_sum)
        .register("Transpose", VersionRange::since(1), shape::transpose)
        .register("Reshape", VersionRange::since(5), shape::reshape)
        .register("DynamicQuantizeLinear", VersionRange::since(11), quantize::dynamic_quantize_linear)
        .register("QuantizeLinear", VersionRange::since(10), quantize::quantize_linear)
        .register("DequantizeLinear", VersionRange::since(10), quantize::dequantize_linear)
        .register("MatMulInteger", VersionRange::since(10), quantize::matmul_integer)
        .register("If", VersionRange::since(1), control_flow::if_op)
        .register("Loop", VersionRange::since(1), control_flow::loop_op);
}

// =============================================================================
// Argument access
// =============================================================================

/// Positional inputs of one invocation, tagged with the node name for errors.
pub(crate) struct Args<'a> {
    node: &'a str,
    inputs: &'a [Option<Arc<Value>>],
}

impl<'a> Args<'a> {
    pub(crate) fn new(node: &'a str, inputs: &'a [Option<Arc<Value>>]) -> Self {
        Self { node, inputs }
    }

    pub(crate) fn len(&self) -> usize {
        self.inputs.len()
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> GraphError {
        GraphError::InvalidInput {
            node: self.node.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn optional_value(&self, index: usize) -> Option<&'a Arc<Value>> {
        self.inputs.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn value(&self, index: usize) -> Result<&'a Arc<Value>> {
        self.optional_value(index)
            .ok_or_else(|| self.invalid(format!("input {index} is required")))
    }

    pub(crate) fn optional(&self, index: usize) -> Result<Option<&'a AnyTensor>> {
        match self.optional_value(index) {
            None => Ok(None),
            Some(v) => v
                .as_tensor()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("input {index} must be a tensor, got a {}", v.kind()))),
        }
    }

    pub(crate) fn tensor(&self, index: usize) -> Result<&'a AnyTensor> {
        self.optional(index)?
            .ok_or_else(|| self.invalid(format!("input {index} is required")))
    }
}

/// Take the value out of its handle, copying only when it is still shared.
pub(crate) fn into_owned(value: Arc<Value>) -> Value {
    Arc::unwrap_or_clone(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Tensor;

    #[test]
    fn test_args_access() {
        let inputs = vec![
            Some(Arc::new(Value::from(Tensor::scalar(1.0f32)))),
            None,
            Some(Arc::new(Value::Sequence(vec![]))),
        ];
        let args = Args::new("n", &inputs);
        assert!(args.tensor(0).is_ok());
        assert!(args.optional(1).unwrap().is_none());
        assert!(matches!(args.tensor(1), Err(GraphError::InvalidInput { .. })));
        assert!(matches!(args.tensor(2), Err(GraphError::InvalidInput { .. })));
        assert!(args.optional(7).unwrap().is_none());
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_into_owned_unique_and_shared() {
        let v = Arc::new(Value::from(Tensor::scalar(3i64)));
        let shared = Arc::clone(&v);
        assert_eq!(into_owned(v), *shared);
        assert_eq!(into_owned(shared).kind(), "tensor");
    }
}

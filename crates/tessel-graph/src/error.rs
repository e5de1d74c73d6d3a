use tessel_core::TensorError;

/// Errors raised while building or executing a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("value '{name}' is not defined in any enclosing scope")]
    MissingValue { name: String },

    #[error("value '{name}' is already defined in this scope")]
    DuplicateValue { name: String },

    #[error("step {step} did not produce required output '{name}'")]
    MissingOutput { step: String, name: String },

    #[error("no implementation of {op} for opset version {version}")]
    UnsupportedOperator { op: String, version: u64 },

    #[error("node '{node}': invalid attribute '{attribute}': {reason}")]
    InvalidAttribute {
        node: String,
        attribute: String,
        reason: String,
    },

    #[error("node '{node}': {reason}")]
    InvalidInput { node: String, reason: String },

    #[error("dependency cycle through node '{node}'")]
    Cycle { node: String },

    #[error("step {index} ({label}) failed: {source}")]
    Step {
        index: usize,
        label: String,
        source: Box<GraphError>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl GraphError {
    /// The error beneath any step context wrappers.
    pub fn root_cause(&self) -> &GraphError {
        match self {
            GraphError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn at_step(self, index: usize, label: &str) -> GraphError {
        GraphError::Step {
            index,
            label: label.to_string(),
            source: Box::new(self),
        }
    }
}

//! # tessel-graph
//!
//! Graph executor for ONNX-style operator graphs built on `tessel-core`.
//!
//! - [`GraphDesc`] / [`NodeDesc`]: decoded model description
//! - [`ExecutionPlan`]: evaluation order and per-step buffer release lists
//! - [`Graph`]: plan plus resolved operators, immutable and reusable
//! - [`Session`]: configured runner with an optional worker pool, profiler
//!   and cooperative cancellation
//! - [`Context`]: scoped write-once value store; subgraphs get a child scope
//! - [`OperatorRegistry`]: `(op_type, opset range)` to implementation

pub mod config;
pub mod context;
pub mod desc;
pub mod error;
pub mod graph;
pub mod operator;
pub mod ops;
pub mod plan;
pub mod profile;
pub mod session;
pub mod value;

pub use config::SessionConfig;
pub use context::Context;
pub use desc::{Attribute, GraphDesc, NodeDesc, ValueInfo, DEFAULT_OPSET};
pub use error::GraphError;
pub use graph::{Graph, Outputs, RunHooks, RunOutcome};
pub use operator::{Operator, OperatorFactory, OperatorRegistry, VersionRange};
pub use plan::{ExecutionPlan, PlannedStep};
pub use profile::{LabelStats, Profiler, TimingProfiler};
pub use session::Session;
pub use value::{MapKey, Value};

pub type Result<T> = std::result::Result<T, GraphError>;

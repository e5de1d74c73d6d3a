//! Operator interface and the versioned registry that resolves node
//! descriptions to implementations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::desc::NodeDesc;
use crate::error::GraphError;
use crate::value::Value;
use crate::Result;

/// A resolved operator, ready to run.
///
/// `inputs` holds one entry per declared input; absent optional inputs are
/// `None`. The returned vector may be shorter than the declared outputs or
/// hold `None` for optional outputs the operator did not set.
pub trait Operator: Send + Sync {
    fn apply(&self, ctx: &Context<'_, Value>, inputs: Vec<Option<Arc<Value>>>) -> Result<Vec<Option<Value>>>;
}

/// Builds an [`Operator`] for one node. The registry is passed along so
/// control-flow operators can build their subgraph bodies.
pub type OperatorFactory = fn(&NodeDesc, &OperatorRegistry) -> Result<Box<dyn Operator>>;

/// Opset versions an implementation covers: `since..=until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub since: u64,
    pub until: Option<u64>,
}

impl VersionRange {
    /// Every version from `since` on.
    pub const fn since(since: u64) -> Self {
        Self { since, until: None }
    }

    /// Versions `since` through `until`, inclusive.
    pub const fn between(since: u64, until: u64) -> Self {
        Self {
            since,
            until: Some(until),
        }
    }

    pub fn contains(&self, version: u64) -> bool {
        version >= self.since && self.until.map_or(true, |u| version <= u)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.until {
            Some(u) => write!(f, "{}..={}", self.since, u),
            None => write!(f, "{}..", self.since),
        }
    }
}

/// Maps `(op_type, version range)` to operator factories.
#[derive(Default)]
pub struct OperatorRegistry {
    entries: HashMap<String, Vec<(VersionRange, OperatorFactory)>>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the builtin operator set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ops::register_builtins(&mut registry);
        registry
    }

    /// Add an implementation. Later registrations take precedence over
    /// earlier ones whose range also covers a version.
    pub fn register(&mut self, op_type: impl Into<String>, range: VersionRange, factory: OperatorFactory) -> &mut Self {
        self.entries.entry(op_type.into()).or_default().push((range, factory));
        self
    }

    fn lookup(&self, op_type: &str, version: u64) -> Option<OperatorFactory> {
        self.entries
            .get(op_type)?
            .iter()
            .rev()
            .find(|(range, _)| range.contains(version))
            .map(|&(_, factory)| factory)
    }

    pub fn supports(&self, op_type: &str, version: u64) -> bool {
        self.lookup(op_type, version).is_some()
    }

    /// Build the operator for `node`.
    pub fn resolve(&self, node: &NodeDesc) -> Result<Box<dyn Operator>> {
        let factory = self
            .lookup(&node.op_type, node.version)
            .ok_or_else(|| GraphError::UnsupportedOperator {
                op: node.op_type.clone(),
                version: node.version,
            })?;
        factory(node, self)
    }

    /// Registered operator names, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("op_types", &self.op_types())
            .finish()
    }
}

//! Decoded graph descriptions: nodes, attributes, value infos.
//!
//! These are plain data handed over by a model decoder. Builder helpers let
//! callers assemble them directly.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tessel_core::{AnyTensor, DType};

use crate::error::GraphError;
use crate::Result;

/// Opset version assumed by [`NodeDesc::new`].
pub const DEFAULT_OPSET: u64 = 13;

/// Name plus optional type information of a graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    pub name: String,
    pub dtype: Option<DType>,
    /// `None` when the rank is unknown; `None` entries are unknown dims.
    pub shape: Option<Vec<Option<usize>>>,
}

impl ValueInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            shape: None,
        }
    }

    pub fn typed(name: impl Into<String>, dtype: DType, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            dtype: Some(dtype),
            shape: Some(dims.iter().map(|&d| Some(d)).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Float(f32),
    Int(i64),
    String(String),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Tensor(AnyTensor),
    Graph(GraphDesc),
}

impl Attribute {
    fn kind(&self) -> &'static str {
        match self {
            Attribute::Float(_) => "float",
            Attribute::Int(_) => "int",
            Attribute::String(_) => "string",
            Attribute::Floats(_) => "floats",
            Attribute::Ints(_) => "ints",
            Attribute::Strings(_) => "strings",
            Attribute::Tensor(_) => "tensor",
            Attribute::Graph(_) => "graph",
        }
    }
}

/// One operator application.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    pub name: String,
    pub op_type: String,
    pub version: u64,
    pub attributes: BTreeMap<String, Attribute>,
    /// Input value names; an empty name is an absent optional input.
    pub inputs: Vec<String>,
    /// Output value names; an empty name is an unused optional output.
    pub outputs: Vec<String>,
}

impl NodeDesc {
    pub fn new(name: impl Into<String>, op_type: impl Into<String>, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            version: DEFAULT_OPSET,
            attributes: BTreeMap::new(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Attribute) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    // =========================================================================
    // Typed attribute access
    // =========================================================================

    fn wrong_kind(&self, name: &str, expected: &str, got: &Attribute) -> GraphError {
        GraphError::InvalidAttribute {
            node: self.name.clone(),
            attribute: name.to_string(),
            reason: format!("expected {expected}, got {}", got.kind()),
        }
    }

    pub fn attr_int(&self, name: &str) -> Result<Option<i64>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.wrong_kind(name, "int", other)),
        }
    }

    pub fn attr_float(&self, name: &str) -> Result<Option<f32>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Float(v)) => Ok(Some(*v)),
            Some(Attribute::Int(v)) => Ok(Some(*v as f32)),
            Some(other) => Err(self.wrong_kind(name, "float", other)),
        }
    }

    pub fn attr_ints(&self, name: &str) -> Result<Option<&[i64]>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Ints(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(self.wrong_kind(name, "ints", other)),
        }
    }

    pub fn attr_graph(&self, name: &str) -> Result<&GraphDesc> {
        match self.attributes.get(name) {
            Some(Attribute::Graph(g)) => Ok(g),
            Some(other) => Err(self.wrong_kind(name, "graph", other)),
            None => Err(GraphError::InvalidAttribute {
                node: self.name.clone(),
                attribute: name.to_string(),
                reason: "required attribute is missing".into(),
            }),
        }
    }

    /// Subgraph attributes, in attribute-name order.
    pub fn subgraphs(&self) -> impl Iterator<Item = &GraphDesc> {
        self.attributes.values().filter_map(|a| match a {
            Attribute::Graph(g) => Some(g),
            _ => None,
        })
    }

    /// Names this node reads: its non-empty inputs plus the free variables
    /// of any subgraph attribute.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps: BTreeSet<String> = self.inputs.iter().filter(|n| !n.is_empty()).cloned().collect();
        for g in self.subgraphs() {
            deps.extend(g.free_variables());
        }
        deps
    }
}

/// A graph: nodes plus declared inputs, outputs and constant initializers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphDesc {
    pub name: String,
    pub nodes: Vec<NodeDesc>,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub initializers: Vec<(String, AnyTensor)>,
}

impl GraphDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: NodeDesc) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_input(mut self, info: ValueInfo) -> Self {
        self.inputs.push(info);
        self
    }

    pub fn with_output(mut self, info: ValueInfo) -> Self {
        self.outputs.push(info);
        self
    }

    pub fn with_initializer(mut self, name: impl Into<String>, value: impl Into<AnyTensor>) -> Self {
        self.initializers.push((name.into(), value.into()));
        self
    }

    /// Names referenced inside this graph (including nested subgraphs) that
    /// are not defined by it: its inputs, initializers and node outputs.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let defined: HashSet<&str> = self
            .inputs
            .iter()
            .map(|i| i.name.as_str())
            .chain(self.initializers.iter().map(|(n, _)| n.as_str()))
            .chain(self.nodes.iter().flat_map(|n| n.outputs.iter().map(String::as_str)))
            .collect();

        let mut free = BTreeSet::new();
        for node in &self.nodes {
            for dep in node.dependencies() {
                if !defined.contains(dep.as_str()) {
                    free.insert(dep);
                }
            }
        }
        for out in &self.outputs {
            if !defined.contains(out.name.as_str()) {
                free.insert(out.name.clone());
            }
        }
        free
    }
}

//! Execution plan: evaluation order and buffer lifetimes.
//!
//! Built once per graph. Steps are ordered by an iterative depth-first walk
//! from the declared outputs, so only nodes that contribute to an output are
//! kept. For every value the plan records the last step that reads it and
//! precomputes, per step, which values can be dropped once that step is done.

use std::collections::{HashMap, HashSet};

use crate::desc::GraphDesc;
use crate::error::GraphError;
use crate::Result;

/// One scheduled node.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    /// Index of the node in [`GraphDesc::nodes`].
    pub node: usize,
    /// `"{index}:{op}:{name}"`
    pub label: String,
    /// Values released after this step completes.
    pub release: Vec<String>,
    /// Initializers last read by this step. Released only in runs where a
    /// supplied input shadowed the initializer.
    pub release_if_supplied: Vec<String>,
    /// Per declared output: whether a later step or the graph itself needs it.
    pub required: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    steps: Vec<PlannedStep>,
    unreachable: Vec<String>,
    last_needed: HashMap<String, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Pending,
    Done,
}

impl ExecutionPlan {
    /// Order the nodes of `desc` and compute value lifetimes.
    pub fn build(desc: &GraphDesc) -> Result<Self> {
        let nodes = &desc.nodes;
        let initializers: HashSet<&str> = desc.initializers.iter().map(|(n, _)| n.as_str()).collect();
        let graph_inputs: HashSet<&str> = desc.inputs.iter().map(|i| i.name.as_str()).collect();
        let graph_outputs: HashSet<&str> = desc.outputs.iter().map(|o| o.name.as_str()).collect();

        // single producer per value
        let mut producer: HashMap<&str, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            for out in node.outputs.iter().filter(|o| !o.is_empty()) {
                let taken = producer.insert(out.as_str(), i).is_some()
                    || initializers.contains(out.as_str())
                    || graph_inputs.contains(out.as_str());
                if taken {
                    return Err(GraphError::DuplicateValue { name: out.clone() });
                }
            }
        }

        let deps: Vec<Vec<String>> = nodes.iter().map(|n| n.dependencies().into_iter().collect()).collect();

        // iterative DFS; a node is appended once everything it reads is placed
        let mut state = vec![Visit::Unvisited; nodes.len()];
        let mut order: Vec<usize> = Vec::with_capacity(nodes.len());
        let roots = desc.outputs.iter().filter_map(|o| producer.get(o.name.as_str()).copied());
        for root in roots {
            if state[root] != Visit::Unvisited {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            state[root] = Visit::Pending;
            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                let next = deps[node][cursor..]
                    .iter()
                    .position(|d| producer.get(d.as_str()).map_or(false, |&p| state[p] != Visit::Done));
                match next {
                    Some(offset) => {
                        top.1 = cursor + offset + 1;
                        let dep = producer[deps[node][cursor + offset].as_str()];
                        if state[dep] == Visit::Pending {
                            return Err(GraphError::Cycle {
                                node: nodes[dep].name.clone(),
                            });
                        }
                        state[dep] = Visit::Pending;
                        stack.push((dep, 0));
                    }
                    None => {
                        stack.pop();
                        state[node] = Visit::Done;
                        order.push(node);
                    }
                }
            }
        }

        let unreachable: Vec<String> = nodes
            .iter()
            .zip(&state)
            .filter(|(_, s)| **s != Visit::Done)
            .map(|(n, _)| n.name.clone())
            .collect();
        if !unreachable.is_empty() {
            tracing::warn!(
                "graph '{}': {} node(s) do not contribute to any output and will not run: {:?}",
                desc.name,
                unreachable.len(),
                unreachable
            );
        }

        let mut last_needed: HashMap<String, usize> = HashMap::new();
        let mut initializer_last: HashMap<&str, usize> = HashMap::new();
        for (index, &node) in order.iter().enumerate() {
            for dep in &deps[node] {
                match initializers.get(dep.as_str()) {
                    Some(&name) => {
                        initializer_last.insert(name, index);
                    }
                    None => {
                        last_needed.insert(dep.clone(), index);
                    }
                }
            }
        }
        let mut shadow_release: Vec<Vec<String>> = vec![Vec::new(); order.len()];
        for (&name, &index) in &initializer_last {
            if !graph_outputs.contains(name) {
                shadow_release[index].push(name.to_string());
            }
        }

        let releasable = |name: &str| !graph_outputs.contains(name) && !initializers.contains(name);
        let mut release: Vec<Vec<String>> = vec![Vec::new(); order.len()];
        for (name, &index) in &last_needed {
            if releasable(name) {
                release[index].push(name.clone());
            }
        }

        let steps = order
            .iter()
            .zip(release)
            .zip(shadow_release)
            .enumerate()
            .map(|(index, ((&node, mut release), mut release_if_supplied))| {
                let desc_node = &nodes[node];
                let mut required = Vec::with_capacity(desc_node.outputs.len());
                for out in &desc_node.outputs {
                    let consumed = last_needed.contains_key(out);
                    let is_output = graph_outputs.contains(out.as_str());
                    required.push(!out.is_empty() && (consumed || is_output));
                    // produced but never read: drop right after the producer
                    if !out.is_empty() && !consumed && releasable(out) {
                        release.push(out.clone());
                    }
                }
                release.sort_unstable();
                release_if_supplied.sort_unstable();
                PlannedStep {
                    node,
                    label: format!("{}:{}:{}", index, desc_node.op_type, desc_node.name),
                    release,
                    release_if_supplied,
                    required,
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "graph '{}': planned {} of {} nodes, {} values tracked",
            desc.name,
            steps.len(),
            nodes.len(),
            last_needed.len()
        );

        Ok(Self {
            steps,
            unreachable,
            last_needed,
        })
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of nodes that were dropped because no output depends on them.
    pub fn unreachable(&self) -> &[String] {
        &self.unreachable
    }

    /// Index of the last step that reads `name`, if any step does.
    pub fn last_needed(&self, name: &str) -> Option<usize> {
        self.last_needed.get(name).copied()
    }
}

//! Executable graphs.
//!
//! A [`Graph`] pairs an [`ExecutionPlan`] with one resolved operator per
//! step and the graph's initializers. It is immutable after [`Graph::build`]
//! and can be run any number of times, each run with its own [`Context`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::desc::{GraphDesc, ValueInfo};
use crate::error::GraphError;
use crate::operator::{Operator, OperatorRegistry};
use crate::plan::ExecutionPlan;
use crate::profile::Profiler;
use crate::value::Value;
use crate::Result;

/// Declared outputs of a finished run, in declaration order.
#[derive(Clone, PartialEq)]
pub struct Outputs {
    names: Vec<String>,
    values: Vec<Arc<Value>>,
}

impl Outputs {
    pub fn get(&self, name: &str) -> Option<&Arc<Value>> {
        self.names.iter().position(|n| n == name).map(|i| &self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Value>)> {
        self.names.iter().map(String::as_str).zip(&self.values)
    }

    pub fn into_values(self) -> Vec<Arc<Value>> {
        self.values
    }
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Per-run hooks. The default runs to completion without profiling.
#[derive(Clone, Copy, Default)]
pub struct RunHooks<'a> {
    /// Polled before each step; `true` stops the run.
    pub cancel: Option<&'a (dyn Fn() -> bool + Sync)>,
    pub profiler: Option<&'a dyn Profiler>,
    /// Treat every unset declared output as fatal.
    pub strict_outputs: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Outputs),
    /// Stopped before step `step` ran; no outputs are produced.
    Cancelled { step: usize },
}

impl RunOutcome {
    pub fn completed(self) -> Option<Outputs> {
        match self {
            RunOutcome::Completed(outputs) => Some(outputs),
            RunOutcome::Cancelled { .. } => None,
        }
    }
}

pub struct Graph {
    name: String,
    desc: GraphDesc,
    plan: ExecutionPlan,
    operators: Vec<Box<dyn Operator>>,
    initializers: Vec<(String, Arc<Value>)>,
}

impl Graph {
    /// Plan `desc` and resolve one operator per planned step.
    pub fn build(desc: &GraphDesc, registry: &OperatorRegistry) -> Result<Self> {
        let plan = ExecutionPlan::build(desc)?;
        let operators = plan
            .steps()
            .iter()
            .map(|step| registry.resolve(&desc.nodes[step.node]))
            .collect::<Result<Vec<_>>>()?;
        let initializers = desc
            .initializers
            .iter()
            .map(|(name, t)| (name.clone(), Arc::new(Value::Tensor(t.clone()))))
            .collect();
        Ok(Self {
            name: desc.name.clone(),
            desc: desc.clone(),
            plan,
            operators,
            initializers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn inputs(&self) -> &[ValueInfo] {
        &self.desc.inputs
    }

    pub fn outputs(&self) -> &[ValueInfo] {
        &self.desc.outputs
    }

    /// Run with `inputs` in a fresh root scope.
    pub fn run<I, S>(&self, inputs: I) -> Result<Outputs>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        let mut ctx = Context::new();
        self.run_in(&mut ctx, inputs)
    }

    /// Run to completion in `ctx` with no hooks attached.
    ///
    /// `ctx` may be a child of a caller's scope; names this graph does not
    /// define resolve through the parent chain.
    pub fn run_in<I, S>(&self, ctx: &mut Context<'_, Value>, inputs: I) -> Result<Outputs>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        self.complete(ctx, inputs, RunHooks::default())
    }

    /// Run to completion with a profiler and output policy; any cancel hook
    /// is ignored.
    pub(crate) fn complete<I, S>(&self, ctx: &mut Context<'_, Value>, inputs: I, hooks: RunHooks<'_>) -> Result<Outputs>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        let shadowed = self.bind(ctx, inputs)?;
        self.run_steps(ctx, &shadowed, RunHooks { cancel: None, ..hooks })?;
        self.collect_outputs(ctx)
    }

    /// Bind inputs and initializers into `ctx`, then run every step,
    /// polling `hooks.cancel` before each one.
    pub fn execute<I, S>(&self, ctx: &mut Context<'_, Value>, inputs: I, hooks: RunHooks<'_>) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        let shadowed = self.bind(ctx, inputs)?;
        if let Some(step) = self.run_steps(ctx, &shadowed, hooks)? {
            return Ok(RunOutcome::Cancelled { step });
        }
        self.collect_outputs(ctx).map(RunOutcome::Completed)
    }

    /// Returns the index of the step the run was cancelled before, if any.
    fn run_steps(
        &self,
        ctx: &mut Context<'_, Value>,
        shadowed: &HashSet<&str>,
        hooks: RunHooks<'_>,
    ) -> Result<Option<usize>> {
        for (index, step) in self.plan.steps().iter().enumerate() {
            if hooks.cancel.map_or(false, |cancel| cancel()) {
                tracing::debug!("graph '{}': cancelled before step {}", self.name, index);
                return Ok(Some(index));
            }
            self.run_step(ctx, index, hooks)
                .map_err(|e| e.at_step(index, &step.label))?;

            if let Some(p) = hooks.profiler {
                p.begin("reclaim");
            }
            let supplied = step
                .release_if_supplied
                .iter()
                .filter(|name| shadowed.contains(name.as_str()));
            for name in step.release.iter().chain(supplied) {
                if ctx.remove(name).is_some() {
                    tracing::trace!("released '{}' after {}", name, step.label);
                }
            }
            if let Some(p) = hooks.profiler {
                p.end("reclaim");
            }
        }
        Ok(None)
    }

    fn collect_outputs(&self, ctx: &Context<'_, Value>) -> Result<Outputs> {
        let values = self
            .desc
            .outputs
            .iter()
            .map(|o| ctx.get(&o.name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Outputs {
            names: self.desc.outputs.iter().map(|o| o.name.clone()).collect(),
            values,
        })
    }

    /// Supplied inputs first, then initializers they do not shadow. Returns
    /// the shadowed initializer names.
    fn bind<I, S>(&self, ctx: &mut Context<'_, Value>, inputs: I) -> Result<HashSet<&str>>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        for (name, value) in inputs {
            ctx.insert(name, value)?;
        }
        let mut shadowed = HashSet::new();
        for (name, value) in &self.initializers {
            if ctx.contains_local(name) {
                shadowed.insert(name.as_str());
            } else {
                ctx.insert(name.as_str(), Arc::clone(value))?;
            }
        }
        if let Some(missing) = self.desc.inputs.iter().find(|i| !ctx.contains_local(&i.name)) {
            return Err(GraphError::MissingValue {
                name: missing.name.clone(),
            });
        }
        Ok(shadowed)
    }

    fn run_step(&self, ctx: &mut Context<'_, Value>, index: usize, hooks: RunHooks<'_>) -> Result<()> {
        let step = &self.plan.steps()[index];
        let node = &self.desc.nodes[step.node];

        let inputs = node
            .inputs
            .iter()
            .map(|name| if name.is_empty() { Ok(None) } else { ctx.get(name).map(Some) })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("graph '{}': running {}", self.name, step.label);
        if let Some(p) = hooks.profiler {
            p.begin(&step.label);
        }
        let result = self.operators[index].apply(ctx, inputs);
        if let Some(p) = hooks.profiler {
            p.end(&step.label);
        }
        let produced = result?;

        if produced.len() > node.outputs.len() {
            tracing::trace!(
                "{} returned {} outputs for {} declared; extras dropped",
                step.label,
                produced.len(),
                node.outputs.len()
            );
        }
        let mut produced = produced.into_iter();
        for (name, &required) in node.outputs.iter().zip(&step.required) {
            match produced.next().flatten() {
                Some(value) if !name.is_empty() => ctx.insert(name.as_str(), Arc::new(value))?,
                Some(_) => {}
                None if name.is_empty() => {}
                None if required || hooks.strict_outputs => {
                    return Err(GraphError::MissingOutput {
                        step: step.label.clone(),
                        name: name.clone(),
                    });
                }
                None => tracing::trace!("{} left optional output '{}' unset", step.label, name),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("steps", &self.plan.len())
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

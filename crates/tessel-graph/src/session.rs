//! Configured graph runner.
//!
//! A [`Session`] owns a built [`Graph`] plus everything a run needs besides
//! its inputs: an optional dedicated rayon pool that kernels parallelize
//! on, an optional profiler, and the output policy. Runs are independent;
//! a session can be shared across threads and run concurrently.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::SessionConfig;
use crate::context::Context;
use crate::desc::GraphDesc;
use crate::error::GraphError;
use crate::graph::{Graph, Outputs, RunHooks, RunOutcome};
use crate::operator::OperatorRegistry;
use crate::profile::{Profiler, TimingProfiler};
use crate::value::Value;
use crate::Result;

type Inputs = Vec<(String, Arc<Value>)>;

pub struct Session {
    graph: Arc<Graph>,
    config: SessionConfig,
    pool: Option<ThreadPool>,
    profiler: Option<Arc<dyn Profiler>>,
    timings: Option<Arc<TimingProfiler>>,
}

impl Session {
    /// Build `desc` against `registry` and wrap it.
    pub fn new(desc: &GraphDesc, registry: &OperatorRegistry, config: SessionConfig) -> Result<Self> {
        Self::from_graph(Arc::new(Graph::build(desc, registry)?), config)
    }

    /// Wrap an already built graph; graphs can be shared between sessions.
    pub fn from_graph(graph: Arc<Graph>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("tessel-worker-{i}"))
                    .build()
                    .map_err(|e| GraphError::Config(format!("worker pool: {e}")))?,
            ),
            None => None,
        };
        let timings = config.profile.then(|| Arc::new(TimingProfiler::new()));
        let profiler = timings.clone().map(|t| t as Arc<dyn Profiler>);

        tracing::info!(
            "session for graph '{}': {} steps, threads={}, profile={}",
            graph.name(),
            graph.plan().len(),
            config
                .threads
                .map_or_else(|| format!("global({})", rayon::current_num_threads()), |t| t.to_string()),
            config.profile
        );

        Ok(Self {
            graph,
            config,
            pool,
            profiler,
            timings,
        })
    }

    /// Replace the profiler. The built-in timing profiler, if configured, is
    /// detached.
    pub fn with_profiler(mut self, profiler: Arc<dyn Profiler>) -> Self {
        self.profiler = Some(profiler);
        self.timings = None;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Aggregated timings when the session was configured with `profile`.
    pub fn timings(&self) -> Option<&TimingProfiler> {
        self.timings.as_deref()
    }

    /// Run to completion.
    pub fn run<I, S>(&self, inputs: I) -> Result<Outputs>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        let inputs = collect(inputs);
        self.install(|| {
            let mut ctx = Context::new();
            self.graph.complete(&mut ctx, inputs, self.hooks(None))
        })
    }

    /// Run, polling `cancel` before every step. A cancelled run yields no
    /// outputs.
    pub fn run_with<I, S>(&self, inputs: I, cancel: &(dyn Fn() -> bool + Sync)) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = (S, Arc<Value>)>,
        S: Into<String>,
    {
        let inputs = collect(inputs);
        let outcome = self.install(|| {
            let mut ctx = Context::new();
            self.graph.execute(&mut ctx, inputs, self.hooks(Some(cancel)))
        })?;
        if let RunOutcome::Cancelled { step } = &outcome {
            tracing::info!("graph '{}': run cancelled before step {}", self.graph.name(), step);
        }
        Ok(outcome)
    }

    fn hooks<'a>(&'a self, cancel: Option<&'a (dyn Fn() -> bool + Sync)>) -> RunHooks<'a> {
        RunHooks {
            cancel,
            profiler: self.profiler.as_deref(),
            strict_outputs: self.config.strict_outputs,
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

fn collect<I, S>(inputs: I) -> Inputs
where
    I: IntoIterator<Item = (S, Arc<Value>)>,
    S: Into<String>,
{
    inputs.into_iter().map(|(name, value)| (name.into(), value)).collect()
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .field("profiling", &self.profiler.is_some())
            .finish()
    }
}

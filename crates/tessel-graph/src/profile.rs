//! Profiling hook invoked around each step and each reclamation pass.
//!
//! Hooks fire on whichever thread is running the graph. Concurrent runs of
//! one session call the same profiler from several threads at once, and a
//! worker blocked inside a kernel may pick up another run's step, so spans
//! nest per thread.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Receives `begin` / `end` pairs with the same label.
pub trait Profiler: Send + Sync {
    fn begin(&self, label: &str);
    fn end(&self, label: &str);
}

/// Aggregate timing for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub calls: u64,
    pub total: Duration,
}

#[derive(Default)]
struct TimingState {
    /// Open spans per thread, innermost last.
    open: HashMap<ThreadId, Vec<(String, Instant)>>,
    totals: BTreeMap<String, LabelStats>,
}

/// Wall-clock profiler that sums durations per label.
#[derive(Default)]
pub struct TimingProfiler {
    state: Mutex<TimingState>,
}

impl TimingProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, label: &str) -> Option<LabelStats> {
        self.state.lock().totals.get(label).copied()
    }

    /// Every recorded label with its totals, sorted by label.
    pub fn snapshot(&self) -> Vec<(String, LabelStats)> {
        self.state
            .lock()
            .totals
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.open.clear();
        state.totals.clear();
    }

    /// Human-readable table, slowest label first.
    pub fn report(&self) -> String {
        let mut rows = self.snapshot();
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        let mut out = format!("{:<40} {:>8} {:>12}\n", "label", "calls", "total (ms)");
        for (label, stats) in rows {
            let _ = writeln!(
                out,
                "{:<40} {:>8} {:>12.3}",
                label,
                stats.calls,
                stats.total.as_secs_f64() * 1000.0
            );
        }
        out
    }
}

impl Profiler for TimingProfiler {
    fn begin(&self, label: &str) {
        let id = thread::current().id();
        self.state
            .lock()
            .open
            .entry(id)
            .or_default()
            .push((label.to_string(), Instant::now()));
    }

    fn end(&self, label: &str) {
        let id = thread::current().id();
        let mut state = self.state.lock();
        let Some(spans) = state.open.get_mut(&id) else {
            tracing::trace!("profiler: end without begin for {label}");
            return;
        };
        let Some(pos) = spans.iter().rposition(|(open, _)| open == label) else {
            tracing::trace!("profiler: end without begin for {label}");
            return;
        };
        let (_, start) = spans.remove(pos);
        if spans.is_empty() {
            state.open.remove(&id);
        }
        let entry = state.totals.entry(label.to_string()).or_default();
        entry.calls += 1;
        entry.total += start.elapsed();
    }
}

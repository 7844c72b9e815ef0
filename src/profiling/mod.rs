//! Runtime profiling: the Markov model, time attribution, and the HTTP
//! collector that executing jobs report into.
//!
//! Compilation-side, `DataflowProfiler::observe_plan` folds the plan's
//! topology into the model (bootstrap edges included). Runtime-side, the
//! collector's worker feeds decoded time/size messages into the profiler;
//! after the job, `collect()` turns the per-partition raw times into
//! effective operator durations (`time - max(parent times)`, barrier
//! semantics) and folds them into the model's cost statistics.
//!
//! Everything in this module degrades gracefully: a profiling failure is
//! logged and compilation proceeds as if the data were absent.

pub mod collector;
pub mod markov;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ProfilingError;
use crate::plan::DataflowPlan;

pub use collector::{Collector, ProfilerMsg, SizeMsg, TimeMsg};
pub use markov::{CostStrategy, MarkovModel, ProbStrategy, CONTEXT, END, START};

/// `(lineage, partition)` key of one raw time observation.
pub type TimeKey = (String, i64);

/// Default profile file under the user's home directory.
pub fn default_profile_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".piglet").join("profiling.json")
}

/// Collects runtime statistics for one compilation/execution cycle.
#[derive(Debug, Default)]
pub struct DataflowProfiler {
    pub markov: MarkovModel,
    /// Raw per-partition completion times for the current run
    current_times: HashMap<TimeKey, u64>,
    /// Per-partition parent sets, recorded with the first time message
    parents: HashMap<TimeKey, Vec<(String, Vec<i64>)>>,
}

impl DataflowProfiler {
    pub fn new() -> Self {
        DataflowProfiler::default()
    }

    pub fn with_model(markov: MarkovModel) -> Self {
        DataflowProfiler {
            markov,
            ..Default::default()
        }
    }

    /// Fold the plan's topology into the Markov model: one visit per
    /// operator, plus the bootstrap edges for the runtime's fixed
    /// overhead (`sparkcontext -> start`) and `start -> <sources>`,
    /// and `<sinks> -> end`.
    pub fn observe_plan(&mut self, plan: &DataflowPlan) {
        self.markov.start_run();
        self.markov.add(CONTEXT, START);
        for id in plan.source_nodes() {
            self.markov.add(START, &plan.lineage_signature(id));
        }
        for id in plan.ids() {
            let sig = plan.lineage_signature(id);
            if let Some(node) = plan.node(id) {
                for out in &node.outputs {
                    if let Some(pipe) = plan.pipe(out) {
                        for consumer in &pipe.consumers {
                            self.markov.add(&sig, &plan.lineage_signature(*consumer));
                        }
                    }
                }
            }
        }
        for id in plan.sink_nodes() {
            self.markov.add(&plan.lineage_signature(id), END);
        }
    }

    /// Fold one decoded message. The collector's worker is the only
    /// caller while a job runs.
    pub fn handle(&mut self, msg: ProfilerMsg) {
        match msg {
            ProfilerMsg::Time(time) => self.handle_time(time),
            ProfilerMsg::Size(size) => self.handle_size(size),
        }
    }

    /// First write wins per `(lineage, partition)`; duplicates are logged
    /// and discarded.
    pub fn handle_time(&mut self, msg: TimeMsg) {
        let key = (msg.lineage.clone(), msg.partition);
        if self.current_times.contains_key(&key) {
            warn!(
                lineage = %msg.lineage,
                partition = msg.partition,
                "duplicate time message discarded"
            );
            return;
        }
        self.current_times.insert(key.clone(), msg.time);
        self.parents.insert(key, msg.parents);
    }

    pub fn handle_size(&mut self, msg: SizeMsg) {
        for (lineage, bytes) in msg.entries {
            self.markov.update_size(&lineage, bytes);
        }
    }

    /// Raw recorded time of a `(lineage, partition)` pair.
    pub fn time_of(&self, lineage: &str, partition: i64) -> Option<u64> {
        self.current_times
            .get(&(lineage.to_string(), partition))
            .copied()
    }

    /// Turn the run's raw times into effective durations and fold them
    /// into the Markov cost statistics.
    ///
    /// An operator partition's duration is its completion time minus the
    /// latest completion among its parents (barrier semantics). Missing
    /// parent times are reported but never fatal.
    pub fn collect(&mut self) -> Vec<ProfilingError> {
        let mut errors = Vec::new();
        let entries: Vec<(TimeKey, u64)> = self
            .current_times
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        for ((lineage, partition), time) in entries {
            let parent_specs = self
                .parents
                .get(&(lineage.clone(), partition))
                .cloned()
                .unwrap_or_default();

            let mut parent_max: u64 = 0;
            for (parent, pids) in &parent_specs {
                let mut found = false;
                for pid in pids {
                    if let Some(t) = self.time_of(parent, *pid) {
                        parent_max = parent_max.max(t);
                        found = true;
                    }
                }
                if !found {
                    let err = ProfilingError::MissingParentTime {
                        lineage: lineage.clone(),
                        partition,
                    };
                    warn!(%lineage, partition, parent = %parent, "missing parent timing");
                    errors.push(err);
                }
            }

            let duration = time.saturating_sub(parent_max);
            debug!(%lineage, partition, duration, "operator duration attributed");
            self.markov.update_cost(&lineage, duration);
        }

        self.current_times.clear();
        self.parents.clear();
        errors
    }

    /// Persist the model; errors are returned for logging, never fatal.
    pub fn save(&self, path: &Path) -> Result<(), ProfilingError> {
        self.markov.save(path)
    }
}

/// Fire the end-of-run notification webhook, if configured. Hard timeout
/// of ten seconds; failures are logged and swallowed.
pub async fn notify_webhook(url: &str, payload: &serde_json::Value) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "webhook client construction failed");
            return;
        }
    };
    match client.post(url).json(payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!(%url, "webhook notified");
        }
        Ok(resp) => warn!(%url, status = %resp.status(), "webhook rejected notification"),
        Err(e) => warn!(%url, error = %e, "webhook notification failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_time_first_write_wins() {
        let mut profiler = DataflowProfiler::new();
        profiler.handle_time(TimeMsg {
            lineage: "L".to_string(),
            partition: 0,
            parents: vec![],
            time: 100,
        });
        profiler.handle_time(TimeMsg {
            lineage: "L".to_string(),
            partition: 0,
            parents: vec![],
            time: 999,
        });
        assert_eq!(profiler.time_of("L", 0), Some(100));
    }

    #[test]
    fn test_collect_subtracts_latest_parent() {
        let mut profiler = DataflowProfiler::new();
        profiler.handle_time(TimeMsg {
            lineage: START.to_string(),
            partition: -1,
            parents: vec![],
            time: 300,
        });
        profiler.handle_time(TimeMsg {
            lineage: "L".to_string(),
            partition: 0,
            parents: vec![(START.to_string(), vec![-1])],
            time: 1000,
        });
        let errors = profiler.collect();
        assert!(errors.is_empty());
        let node = profiler.markov.node("L").expect("cost recorded");
        assert_eq!(node.cost.sum, 700);
    }

    #[test]
    fn test_collect_reports_missing_parent() {
        let mut profiler = DataflowProfiler::new();
        profiler.handle_time(TimeMsg {
            lineage: "L".to_string(),
            partition: 0,
            parents: vec![("ghost".to_string(), vec![0])],
            time: 1000,
        });
        let errors = profiler.collect();
        assert_eq!(errors.len(), 1);
        // duration still recorded, as if the parent finished at zero
        assert_eq!(profiler.markov.node("L").unwrap().cost.sum, 1000);
    }

    #[test]
    fn test_collect_drains_state() {
        let mut profiler = DataflowProfiler::new();
        profiler.handle_time(TimeMsg {
            lineage: "L".to_string(),
            partition: 0,
            parents: vec![],
            time: 10,
        });
        profiler.collect();
        assert_eq!(profiler.time_of("L", 0), None);
    }
}

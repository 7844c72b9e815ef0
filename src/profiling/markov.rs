//! Markov model of prior executions.
//!
//! A directed multigraph over lineage signatures, with two synthetic
//! endpoints `start` and `end`. Compilation folds the plan's topology in
//! (one visit per operator per run); the runtime collector folds observed
//! durations and output sizes in afterwards. The materialization planner
//! asks the model two questions about an operator: *how expensive is it
//! to recompute* (`total_cost`) and *how likely is it to be reached
//! again* (the path probability part of the same call).
//!
//! The whole model is one JSON document persisted under the profile
//! directory and written atomically (temp file, then rename).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProfilingError, Result};

/// Synthetic entry node; its visit count equals `total_runs`.
pub const START: &str = "start";
/// Synthetic exit node.
pub const END: &str = "end";
/// Bootstrap node modeling the runtime's fixed startup overhead.
pub const CONTEXT: &str = "sparkcontext";

/// How parallel paths' costs are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostStrategy {
    Min,
    Max,
}

/// How parallel paths' probabilities are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbStrategy {
    Min,
    Max,
    Avg,
    Product,
}

/// Running `{sum, count, min, max}` summary; `avg` derives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStat {
    pub sum: u64,
    pub count: u64,
    pub min: u64,
    pub max: u64,
}

impl RunningStat {
    pub fn add(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn avg(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum as f64 / self.count as f64)
        }
    }
}

/// Per-operator statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkovNode {
    pub visits: u64,
    /// Observed execution durations, milliseconds
    #[serde(default)]
    pub cost: RunningStat,
    /// Observed output sizes, bytes
    #[serde(default)]
    pub size: RunningStat,
    /// Output record count, when the runtime reports it
    #[serde(default)]
    pub records: Option<u64>,
    /// Bytes per output record, when the runtime reports it
    #[serde(default)]
    pub bytes_per_record: Option<u64>,
}

/// The model: nodes keyed by lineage signature, edges with their own
/// transition counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkovModel {
    pub total_runs: u64,
    nodes: BTreeMap<String, MarkovNode>,
    edges: BTreeMap<String, BTreeMap<String, u64>>,
}

impl MarkovModel {
    pub fn new() -> Self {
        MarkovModel::default()
    }

    /// Begin a new profiled compilation. The caller records the bootstrap
    /// edge `sparkcontext -> start` right after, which keeps the start
    /// node's visit count equal to `total_runs`.
    pub fn start_run(&mut self) {
        self.total_runs += 1;
    }

    /// Record one traversal of the edge `u -> v`.
    pub fn add(&mut self, u: &str, v: &str) {
        self.nodes.entry(u.to_string()).or_default();
        self.nodes.entry(v.to_string()).or_default().visits += 1;
        *self
            .edges
            .entry(u.to_string())
            .or_default()
            .entry(v.to_string())
            .or_default() += 1;
    }

    /// Fold an observed duration into a node's cost summary.
    pub fn update_cost(&mut self, v: &str, duration_ms: u64) {
        self.nodes
            .entry(v.to_string())
            .or_default()
            .cost
            .add(duration_ms);
    }

    /// Fold an observed output size into a node's size summary.
    pub fn update_size(&mut self, v: &str, bytes: u64) {
        self.nodes
            .entry(v.to_string())
            .or_default()
            .size
            .add(bytes);
    }

    pub fn node(&self, v: &str) -> Option<&MarkovNode> {
        self.nodes.get(v)
    }

    /// Transition count of the edge `u -> v`.
    pub fn edge_count(&self, u: &str, v: &str) -> u64 {
        self.edges
            .get(u)
            .and_then(|targets| targets.get(v))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all outgoing transition counts of a node.
    pub fn out_count(&self, u: &str) -> u64 {
        self.edges
            .get(u)
            .map(|targets| targets.values().sum())
            .unwrap_or(0)
    }

    /// Direct predecessors of a node.
    pub fn parents(&self, v: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains_key(v))
            .map(|(u, _)| u.as_str())
            .collect()
    }

    /// Sum of the parents' average output sizes: what the operator reads.
    pub fn input_size(&self, v: &str) -> Option<u64> {
        let parents = self.parents(v);
        if parents.is_empty() {
            return None;
        }
        let mut total = 0.0;
        let mut any = false;
        for parent in parents {
            if let Some(avg) = self.nodes.get(parent).and_then(|n| n.size.avg()) {
                total += avg;
                any = true;
            }
        }
        any.then_some(total as u64)
    }

    pub fn result_records(&self, v: &str) -> Option<u64> {
        self.nodes.get(v).and_then(|n| n.records)
    }

    pub fn bytes_per_record(&self, v: &str) -> Option<u64> {
        self.nodes.get(v).and_then(|n| n.bytes_per_record)
    }

    /// Estimated output size of a node in bytes: `records x bytes/record`
    /// when the runtime reported both, the observed size average
    /// otherwise.
    pub fn output_bytes(&self, v: &str) -> Option<u64> {
        let node = self.nodes.get(v)?;
        match (node.records, node.bytes_per_record) {
            (Some(r), Some(b)) => Some(r * b),
            _ => node.size.avg().map(|avg| avg as u64),
        }
    }

    /// Expected cost and reach probability of a node.
    ///
    /// Enumerates all simple paths `start ~> v`. A path's probability is
    /// the product of its edges' relative transition probabilities; its
    /// cost is the sum of the average node costs along it (excluding
    /// `start`). Parallel paths are folded per the given strategies.
    pub fn total_cost(
        &self,
        v: &str,
        prob_strategy: ProbStrategy,
        cost_strategy: CostStrategy,
    ) -> Option<(u64, f64)> {
        if v == START {
            return Some((0, 1.0));
        }
        let mut paths: Vec<(f64, f64)> = Vec::new(); // (cost_ms, prob)
        let mut visited = vec![START.to_string()];
        self.walk(START, v, 0.0, 1.0, &mut visited, &mut paths);
        if paths.is_empty() {
            return None;
        }

        let cost = match cost_strategy {
            CostStrategy::Min => paths.iter().map(|(c, _)| *c).fold(f64::MAX, f64::min),
            CostStrategy::Max => paths.iter().map(|(c, _)| *c).fold(0.0, f64::max),
        };
        let probs: Vec<f64> = paths.iter().map(|(_, p)| *p).collect();
        let prob = match prob_strategy {
            ProbStrategy::Min => probs.iter().copied().fold(f64::MAX, f64::min),
            ProbStrategy::Max => probs.iter().copied().fold(0.0, f64::max),
            ProbStrategy::Avg => probs.iter().sum::<f64>() / probs.len() as f64,
            ProbStrategy::Product => probs.iter().product(),
        };
        Some((cost as u64, prob))
    }

    fn walk(
        &self,
        current: &str,
        target: &str,
        cost: f64,
        prob: f64,
        visited: &mut Vec<String>,
        paths: &mut Vec<(f64, f64)>,
    ) {
        let Some(targets) = self.edges.get(current) else {
            return;
        };
        let out_total: u64 = targets.values().sum();
        if out_total == 0 {
            return;
        }
        for (next, count) in targets {
            if visited.iter().any(|seen| seen == next) {
                continue;
            }
            let edge_prob = *count as f64 / out_total as f64;
            let node_cost = self
                .nodes
                .get(next)
                .and_then(|n| n.cost.avg())
                .unwrap_or(0.0);
            let cost = cost + node_cost;
            let prob = prob * edge_prob;
            if next == target {
                paths.push((cost, prob));
                continue;
            }
            visited.push(next.clone());
            self.walk(next, target, cost, prob, visited, paths);
            visited.pop();
        }
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, ProfilingError> {
        serde_json::to_string_pretty(self).map_err(|e| ProfilingError::Store {
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ProfilingError> {
        serde_json::from_str(json).map_err(|e| ProfilingError::Store {
            message: e.to_string(),
        })
    }

    /// Load from disk; a missing file yields an empty model.
    pub fn load(path: &Path) -> Result<Self, ProfilingError> {
        if !path.exists() {
            debug!(path = %path.display(), "no persisted profile, starting empty");
            return Ok(MarkovModel::new());
        }
        let json = std::fs::read_to_string(path).map_err(|e| ProfilingError::Store {
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Persist atomically: write a sibling temp file, then rename.
    pub fn save(&self, path: &Path) -> Result<(), ProfilingError> {
        let mut json = self.to_json()?;
        json.push('\n');
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProfilingError::Store {
                message: e.to_string(),
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| ProfilingError::Store {
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, path).map_err(|e| ProfilingError::Store {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

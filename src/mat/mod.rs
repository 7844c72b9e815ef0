//! Profile-driven materialization planning.
//!
//! Two passes bracket the rewrite engine:
//!
//! 1. **Load-already-cached** (before optimization): any non-sink
//!    operator whose lineage signature has a catalogue entry gets its
//!    upstream cone detached and its payload swapped for a `LOAD` of the
//!    cached artifact. The operator keeps its output pipe name, so every
//!    consumer's input list is untouched - argument order matters for
//!    `JOIN`, whose emitted code is positional.
//! 2. **Insert new materializations** (after optimization): candidates
//!    are scored against the Markov model (recomputation cost, reach
//!    probability, output size), filtered by the configured thresholds,
//!    selected by the global strategy, and realized as a `STORE` spliced
//!    onto the operator plus an optional `CACHE` hint for the downstream
//!    consumers.
//!
//! Lineage signatures are the only identity matching cached data to
//! operators; a changed input file changes the `LOAD` mtime in the
//! lineage and therefore misses the cache.

pub mod catalogue;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fs::FsService;
use crate::plan::{CacheMode, DataflowPlan, LoaderSpec, OperatorNode, PigOperator};
use crate::profiling::markov::{CostStrategy, MarkovModel, ProbStrategy};

pub use catalogue::{CacheCatalogue, CatalogueEntry};

/// How the final set of materialization points is picked from the
/// eligible candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalStrategy {
    /// The single candidate with the greatest benefit
    GreatestBenefit,
    /// The single candidate with the greatest reach probability
    GreatestProb,
    /// The single candidate maximizing `prob x benefit`
    Product,
    /// Every candidate that passed the thresholds
    AllAboveThreshold,
}

/// A candidate for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializationPoint {
    pub lineage: String,
    /// Expected recomputation cost, milliseconds
    pub cost_ms: u64,
    /// Probability of the operator being reached again, in `[0, 1]`
    pub prob: f64,
    /// Estimated output size
    pub bytes: u64,
    /// `cost - write time`, milliseconds; negative means not worth it
    pub benefit_ms: i64,
}

/// Tuning knobs for the materialization planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatSettings {
    /// Directory holding cached results and the catalogue
    pub base_dir: PathBuf,
    /// Candidates below this benefit are dropped, milliseconds
    pub min_benefit_ms: u64,
    /// Candidates below this reach probability are dropped
    pub prob_threshold: f64,
    /// Sequential write throughput used for the benefit estimate, MiB/s
    pub write_throughput_mib: u64,
    /// Sequential read throughput of cached artifacts, MiB/s
    pub read_throughput_mib: u64,
    pub cost_strategy: CostStrategy,
    pub prob_strategy: ProbStrategy,
    pub global_strategy: GlobalStrategy,
    /// Also splice a CACHE hint between the operator and its consumers
    pub insert_cache_hint: bool,
    pub cache_mode: CacheMode,
}

impl Default for MatSettings {
    fn default() -> Self {
        MatSettings {
            base_dir: PathBuf::from("materializations"),
            min_benefit_ms: 1_000,
            prob_threshold: 0.5,
            write_throughput_mib: 100,
            read_throughput_mib: 200,
            cost_strategy: CostStrategy::Max,
            prob_strategy: ProbStrategy::Max,
            global_strategy: GlobalStrategy::AllAboveThreshold,
            insert_cache_hint: false,
            cache_mode: CacheMode::MemoryAndDisk,
        }
    }
}

/// Threshold filter over a candidate.
pub fn eligible(point: &MaterializationPoint, settings: &MatSettings) -> bool {
    point.benefit_ms > 0
        && point.benefit_ms >= settings.min_benefit_ms as i64
        && point.prob >= settings.prob_threshold
}

/// The materialization planner.
pub struct MaterializationManager {
    settings: MatSettings,
    catalogue: CacheCatalogue,
}

impl MaterializationManager {
    pub fn new(settings: MatSettings) -> Result<Self> {
        let catalogue = CacheCatalogue::load(&settings.base_dir)?;
        Ok(MaterializationManager {
            settings,
            catalogue,
        })
    }

    pub fn catalogue(&self) -> &CacheCatalogue {
        &self.catalogue
    }

    /// Pre-optimization pass: short-circuit every operator whose result
    /// is already materialized. Returns the number of cache hits applied.
    pub fn load_cached(&mut self, plan: &mut DataflowPlan, fs: &dyn FsService) -> Result<usize> {
        let mut hits = 0;
        // Sinks stay; walk from the most-downstream operators so one hit
        // swallows its whole upstream cone at once.
        let mut order = plan.topological_order()?;
        order.reverse();
        for id in order {
            let Some(node) = plan.node(id) else { continue };
            if node.is_sink() || node.is_source() {
                continue;
            }
            let signature = plan.lineage_signature(id);
            let Some(entry) = self.catalogue.lookup(&signature) else {
                continue;
            };
            let uri = PathBuf::from(&entry.uri);
            if !fs.exists(&uri) {
                let err = crate::error::CacheError::Corrupt {
                    lineage: signature.clone(),
                    uri: entry.uri.clone(),
                };
                warn!(error = %err, "dropping catalogue entry");
                self.catalogue.remove(&signature);
                continue;
            }

            info!(lineage = %signature, uri = %entry.uri, "materialization cache hit");
            let schema = node.schema.clone();
            plan.detach_upstream(id)?;
            plan.replace(
                id,
                PigOperator::Load {
                    file: uri,
                    declared_schema: schema.map(|s| s.element),
                    loader: Some(LoaderSpec {
                        name: "BinStorage".to_string(),
                        params: vec![],
                    }),
                    last_modified: -1,
                },
            )?;
            hits += 1;
        }
        if hits > 0 {
            plan.refresh_schemas()?;
            if let Err(e) = self.catalogue.save() {
                warn!(error = %e, "catalogue save failed after hygiene");
            }
        }
        Ok(hits)
    }

    /// Rewrite explicit MATERIALIZE hints: the marker is removed and its
    /// producer is forced into the chosen set regardless of statistics.
    fn forced_points(&self, plan: &mut DataflowPlan) -> Result<Vec<String>> {
        let mut forced = Vec::new();
        for id in plan.ids() {
            let Some(node) = plan.node(id) else { continue };
            if !matches!(node.op, PigOperator::Materialize) {
                continue;
            }
            if let Some(input) = node.inputs.first() {
                if let Some(pipe) = plan.pipe(input) {
                    forced.push(plan.lineage_signature(pipe.producer));
                }
            }
            plan.remove(id, false)?;
        }
        if !forced.is_empty() {
            plan.refresh_schemas()?;
        }
        Ok(forced)
    }

    /// Post-optimization pass: score candidates against the Markov model,
    /// pick the final set, splice in STORE (and CACHE) operators and
    /// register the new artifacts in the catalogue.
    pub fn insert_points(
        &mut self,
        plan: &mut DataflowPlan,
        markov: &MarkovModel,
    ) -> Result<Vec<MaterializationPoint>> {
        let forced = self.forced_points(plan)?;

        let mut candidates = Vec::new();
        for id in plan.topological_order()? {
            let Some(node) = plan.node(id) else { continue };
            if node.is_sink() || node.is_source() {
                continue;
            }
            if matches!(
                node.op,
                PigOperator::TimingOp | PigOperator::Cache { .. } | PigOperator::Store { .. }
            ) {
                continue;
            }
            let signature = plan.lineage_signature(id);
            if self.catalogue.lookup(&signature).is_some() {
                continue;
            }

            if forced.contains(&signature) {
                candidates.push((
                    id,
                    MaterializationPoint {
                        lineage: signature,
                        cost_ms: 0,
                        prob: 1.0,
                        bytes: 0,
                        benefit_ms: i64::MAX,
                    },
                    true,
                ));
                continue;
            }

            let Some((cost_ms, _path_prob)) = markov.total_cost(
                &signature,
                self.settings.prob_strategy,
                self.settings.cost_strategy,
            ) else {
                continue;
            };
            let visits = markov.node(&signature).map(|n| n.visits).unwrap_or(0);
            let prob = if markov.total_runs == 0 {
                0.0
            } else {
                (visits as f64 / markov.total_runs as f64).min(1.0)
            };
            let Some(bytes) = markov.output_bytes(&signature) else {
                debug!(lineage = %signature, "no size statistics, skipping candidate");
                continue;
            };
            let write_ms =
                bytes as f64 * 1000.0 / (self.settings.write_throughput_mib as f64 * 1024.0 * 1024.0);
            let point = MaterializationPoint {
                lineage: signature,
                cost_ms,
                prob,
                bytes,
                benefit_ms: cost_ms as i64 - write_ms as i64,
            };
            if eligible(&point, &self.settings) {
                candidates.push((id, point, false));
            }
        }

        let chosen = self.select(candidates);

        let mut applied = Vec::new();
        for (id, point) in chosen {
            let path = self.settings.base_dir.join(&point.lineage);

            if self.settings.insert_cache_hint {
                let out = plan
                    .node(id)
                    .and_then(|n| n.outputs.first().cloned())
                    .unwrap_or_default();
                let cache = OperatorNode::new(
                    PigOperator::Cache {
                        mode: self.settings.cache_mode,
                    },
                    &format!("{out}_cached"),
                    &[],
                );
                plan.insert_between_all(id, cache)?;
            }

            let store = OperatorNode::new(
                PigOperator::Store {
                    file: path.clone(),
                    storer: Some(LoaderSpec {
                        name: "BinStorage".to_string(),
                        params: vec![],
                    }),
                },
                "",
                &[],
            );
            plan.insert_after(id, store)?;

            info!(lineage = %point.lineage, path = %path.display(), "materialization point inserted");
            self.catalogue
                .insert(&point.lineage, &path.display().to_string());
            applied.push(point);
        }

        if !applied.is_empty() {
            plan.refresh_schemas()?;
            self.catalogue.save()?;
        }
        Ok(applied)
    }

    /// Apply the global strategy to the eligible candidates. Forced
    /// points (MATERIALIZE hints) always survive.
    fn select(
        &self,
        candidates: Vec<(crate::plan::OpId, MaterializationPoint, bool)>,
    ) -> Vec<(crate::plan::OpId, MaterializationPoint)> {
        let (forced, scored): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|(_, _, f)| *f);
        let mut out: Vec<(crate::plan::OpId, MaterializationPoint)> =
            forced.into_iter().map(|(id, p, _)| (id, p)).collect();

        let best = match self.settings.global_strategy {
            GlobalStrategy::AllAboveThreshold => {
                out.extend(scored.into_iter().map(|(id, p, _)| (id, p)));
                return out;
            }
            GlobalStrategy::GreatestBenefit => scored
                .into_iter()
                .max_by_key(|(_, p, _)| p.benefit_ms),
            GlobalStrategy::GreatestProb => scored.into_iter().max_by(|(_, a, _), (_, b, _)| {
                a.prob
                    .partial_cmp(&b.prob)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            GlobalStrategy::Product => scored.into_iter().max_by(|(_, a, _), (_, b, _)| {
                (a.prob * a.benefit_ms as f64)
                    .partial_cmp(&(b.prob * b.benefit_ms as f64))
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        };
        if let Some((id, p, _)) = best {
            out.push((id, p));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(prob: f64, benefit_ms: i64) -> MaterializationPoint {
        MaterializationPoint {
            lineage: "sig".to_string(),
            cost_ms: 10_000,
            prob,
            bytes: 1024,
            benefit_ms,
        }
    }

    #[test]
    fn test_threshold_filtering() {
        let settings = MatSettings {
            prob_threshold: 0.9,
            min_benefit_ms: 1_000,
            ..Default::default()
        };
        assert!(!eligible(&point(0.5, 10_000), &settings), "low probability");
        assert!(!eligible(&point(1.0, 500), &settings), "low benefit");
        assert!(eligible(&point(1.0, 5_000), &settings));
    }

    #[test]
    fn test_negative_benefit_always_dropped() {
        let settings = MatSettings {
            prob_threshold: 0.0,
            min_benefit_ms: 0,
            ..Default::default()
        };
        assert!(!eligible(&point(1.0, 0), &settings));
        assert!(!eligible(&point(1.0, -10), &settings));
    }
}

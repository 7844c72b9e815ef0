//! # Piglet Compiler Core
//!
//! The middle-end of a Pig-lineage dataflow language compiler: it takes
//! the operator list an external parser produces and turns it into
//! executable backend source, consulting runtime profiles from previous
//! executions to decide which intermediate results to persist.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Operator list (external parser)
//!     ↓
//! [DataflowPlan]          → pipe graph + schema propagation
//!     ↓
//! [Materialization: load] → swap cached sub-plans for LOADs
//!     ↓
//! [Rewrite engine]        → filter merge/pushdown, window rewrites
//!     ↓
//! [Materialization: insert] → STORE/CACHE at profitable points
//!     ↓
//! [Timing instrumentation]  → TimingOp shims (profiling only)
//!     ↓
//! [Code emitter]          → backend source artifact
//! ```
//!
//! Orthogonal loop: the profiling collector receives per-stage timing and
//! size messages from executing jobs and folds them into the persisted
//! Markov model, which informs the next compilation's materialization
//! decisions.
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `schema` | Type lattice, tuple/bag/map composites |
//! | `expr` | Predicate and arithmetic expression trees |
//! | `plan` | Operator graph, structural edits, lineage signatures |
//! | `rewrite` | Strategy combinators, rule registry, fixpoint driver |
//! | `mat` | Cache catalogue, materialization planning |
//! | `profiling` | Markov model, HTTP collector, time attribution |
//! | `emit` | Template-driven code emission |
//! | `backend` | Backend registry (spark, flinks) |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use piglet::{compile, CompileOptions, CompilerContext, Config};
//!
//! let ctx = CompilerContext::new(Config::load()?)?;
//! let ops = frontend::parse(&source)?; // external parser contract
//! let artifact = compile(ops, &mut ctx, &CompileOptions::named("wordcount"))?;
//! std::fs::write("wordcount.scala", &artifact.code)?;
//! ```

pub mod backend;
pub mod config;
pub mod emit;
pub mod error;
pub mod expr;
pub mod fs;
pub mod mat;
pub mod plan;
pub mod profiling;
pub mod rewrite;
pub mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

pub use backend::{Backend, BackendManager};
pub use config::Config;
pub use emit::{EmitConfig, ScalaEmitter};
pub use error::{PigletError, PlanError, Result, SchemaError};
pub use mat::{MaterializationManager, MaterializationPoint};
pub use plan::{DataflowPlan, OpId, OperatorNode, PigOperator};
pub use profiling::{DataflowProfiler, MarkovModel};

use fs::{FsService, LocalFs};
use plan::PlanEnv;

/// Everything a compilation needs, threaded explicitly through the
/// pipeline instead of process-wide singletons.
pub struct CompilerContext {
    pub config: Config,
    pub backend: BackendManager,
    pub fs: Box<dyn FsService>,
    /// Shared with the collector worker while a profiled job runs
    pub profiler: Option<Arc<Mutex<DataflowProfiler>>>,
}

impl CompilerContext {
    /// Build a context from configuration. A profiler is attached when
    /// profiling is enabled; failure to read the persisted model degrades
    /// to an empty one.
    pub fn new(config: Config) -> Result<Self> {
        let backend = BackendManager::new(&config.backend.name)?;
        let profiler = if config.profiling.enabled {
            let model = MarkovModel::load(&config.profile_path()).unwrap_or_else(|e| {
                warn!(error = %e, "could not read persisted profile, starting empty");
                MarkovModel::new()
            });
            Some(Arc::new(Mutex::new(DataflowProfiler::with_model(model))))
        } else {
            None
        };
        Ok(CompilerContext {
            config,
            backend,
            fs: Box::new(LocalFs),
            profiler,
        })
    }

    pub fn profiling_enabled(&self) -> bool {
        self.profiler.is_some()
    }

    /// Run `f` against the profiler state, if any.
    fn with_profiler<T>(&self, f: impl FnOnce(&mut DataflowProfiler) -> T) -> Option<T> {
        let profiler = self.profiler.as_ref()?;
        match profiler.lock() {
            Ok(mut guard) => Some(f(&mut guard)),
            Err(poisoned) => Some(f(&mut poisoned.into_inner())),
        }
    }
}

/// Per-invocation compilation options.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Name of the emitted job object
    pub script_name: String,
    /// Directory the artifact is written to; `None` keeps it in memory
    pub outdir: Option<PathBuf>,
    /// Print the final plan to stdout
    pub show_plan: bool,
}

impl CompileOptions {
    pub fn named(script_name: &str) -> Self {
        CompileOptions {
            script_name: script_name.to_string(),
            ..Default::default()
        }
    }
}

/// The compiled result.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub code: String,
    /// Where the artifact was written, when an outdir was given
    pub path: Option<PathBuf>,
    /// Materialization points inserted during this compilation
    pub materialized: Vec<MaterializationPoint>,
}

/// Compile an operator list into a backend artifact.
///
/// Plan-construction and rewrite errors abort with a single diagnostic
/// and no artifact; materialization, profiling and cache problems are
/// logged and compilation proceeds as if that input were unavailable.
pub fn compile(
    ops: Vec<OperatorNode>,
    ctx: &mut CompilerContext,
    options: &CompileOptions,
) -> Result<CompiledArtifact> {
    let env = PlanEnv {
        profiling: ctx.profiling_enabled(),
        fs: ctx.fs.as_ref(),
    };
    let mut plan = DataflowPlan::construct(ops, &env)?;
    plan.check_connectivity()?;
    plan.check_schema_conformance()?;

    // Materialization pass (a): short-circuit already-cached sub-plans.
    let mut mat = match MaterializationManager::new(ctx.config.mat_settings()) {
        Ok(mat) => Some(mat),
        Err(e) => {
            warn!(error = %e, "materialization disabled for this run");
            None
        }
    };
    if let Some(mat) = mat.as_mut() {
        match mat.load_cached(&mut plan, ctx.fs.as_ref()) {
            Ok(hits) if hits > 0 => info!(hits, "reused cached materializations"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cache lookup failed, compiling from sources"),
        }
    }

    // Rewrite to fixpoint with the backend's rule set.
    let registry = ctx.backend.rule_registry();
    let rewrites = rewrite::rewrite_plan(&mut plan, &registry)?;
    if rewrites > 0 {
        info!(rewrites, "plan rewritten");
    }

    // Materialization pass (b): insert new points per the Markov model.
    let mut materialized = Vec::new();
    if let Some(mat) = mat.as_mut() {
        let model = ctx
            .with_profiler(|p| p.markov.clone())
            .unwrap_or_default();
        match mat.insert_points(&mut plan, &model) {
            Ok(points) => materialized = points,
            Err(e) => warn!(error = %e, "materialization insertion failed, continuing"),
        }
    }

    // Profiling: instrument the plan and fold its topology into the model.
    if ctx.profiling_enabled() {
        let shims = rewrite::rules::insert_timing(&mut plan)?;
        info!(shims, "timing instrumentation inserted");
        ctx.with_profiler(|p| p.observe_plan(&plan));
        let path = ctx.config.profile_path();
        if let Some(Err(e)) = ctx.with_profiler(|p| p.save(&path)) {
            warn!(error = %e, "profile save failed");
        }
    }

    if options.show_plan {
        println!("{}", plan.describe());
    }

    // Emission.
    let emitter = ScalaEmitter::new(ctx.backend.backend);
    let emit_config = EmitConfig {
        script_name: options.script_name.clone(),
        profiling_url: if ctx.profiling_enabled() {
            Some(format!(
                "http://localhost:{}",
                ctx.config.profiling.collector_port
            ))
        } else {
            None
        },
    };
    let code = emitter.emit_plan(&plan, &emit_config)?;

    let path = match &options.outdir {
        Some(outdir) => {
            std::fs::create_dir_all(outdir)?;
            let path = outdir.join(format!(
                "{}{}",
                options.script_name,
                ctx.backend.backend.file_suffix()
            ));
            std::fs::write(&path, &code)?;
            info!(path = %path.display(), "artifact written");
            Some(path)
        }
        None => None,
    };

    Ok(CompiledArtifact {
        code,
        path,
        materialized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ArithmeticExpr, CmpOp, Literal, Predicate};
    use crate::schema::{Field, PigType, TupleType};
    use std::path::PathBuf;

    fn sample_ops() -> Vec<OperatorNode> {
        vec![
            OperatorNode::new(
                PigOperator::Load {
                    file: PathBuf::from("data.csv"),
                    declared_schema: Some(TupleType::new(vec![
                        Field::new("x", PigType::Int),
                        Field::new("y", PigType::Int),
                    ])),
                    loader: None,
                    last_modified: -1,
                },
                "a",
                &[],
            ),
            OperatorNode::new(
                PigOperator::Filter {
                    predicate: Predicate::cmp(
                        CmpOp::Gt,
                        ArithmeticExpr::field("x"),
                        ArithmeticExpr::Const(Literal::Int(0)),
                    ),
                },
                "b",
                &["a"],
            ),
            OperatorNode::new(
                PigOperator::Store {
                    file: PathBuf::from("out"),
                    storer: None,
                },
                "",
                &["b"],
            ),
        ]
    }

    #[test]
    fn test_compile_end_to_end() {
        let mut config = Config::default();
        let tmp = tempfile::TempDir::new().unwrap();
        config.materialization.base_dir = tmp.path().to_path_buf();
        let mut ctx = CompilerContext::new(config).unwrap();
        let artifact = compile(sample_ops(), &mut ctx, &CompileOptions::named("job")).unwrap();
        assert!(artifact.code.contains("object job {"));
        assert!(artifact.path.is_none());
        assert!(artifact.materialized.is_empty());
    }

    #[test]
    fn test_compile_writes_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.materialization.base_dir = tmp.path().join("mat");
        let mut ctx = CompilerContext::new(config).unwrap();
        let options = CompileOptions {
            script_name: "job".to_string(),
            outdir: Some(tmp.path().to_path_buf()),
            show_plan: false,
        };
        let artifact = compile(sample_ops(), &mut ctx, &options).unwrap();
        let path = artifact.path.expect("artifact written");
        assert!(path.ends_with("job.scala"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), artifact.code);
    }

    #[test]
    fn test_compile_rejects_disconnected_plan() {
        let mut ops = sample_ops();
        ops.push(OperatorNode::new(
            PigOperator::Load {
                file: PathBuf::from("other.csv"),
                declared_schema: None,
                loader: None,
                last_modified: -1,
            },
            "z",
            &[],
        ));
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.materialization.base_dir = tmp.path().to_path_buf();
        let mut ctx = CompilerContext::new(config).unwrap();
        let result = compile(ops, &mut ctx, &CompileOptions::named("job"));
        assert!(matches!(
            result,
            Err(PigletError::Plan(PlanError::Disconnected))
        ));
    }
}

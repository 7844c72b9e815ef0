//! The built-in rewrite rules.
//!
//! Each rule matches on one operator (the rewrite driver calls it for
//! every operator in the plan) and performs its edit through the plan's
//! structural API, so pipe wiring stays consistent without any local
//! bookkeeping.

use tracing::debug;

use crate::error::Result;
use crate::expr::Predicate;
use crate::plan::{DataflowPlan, Generator, OpId, OperatorNode, PigOperator};

/// Adjacent filters fuse: `FILTER p1` into `FILTER p2` becomes a single
/// `FILTER (p1 AND p2)`. Fires on the upstream filter; it must feed the
/// downstream filter exclusively, or its predicate would be lost for the
/// other consumers.
pub fn merge_filters(plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
    let Some(node) = plan.node(id) else {
        return Ok(false);
    };
    let PigOperator::Filter { predicate: p1 } = node.op.clone() else {
        return Ok(false);
    };
    let Some(out) = node.outputs.first() else {
        return Ok(false);
    };
    let Some(pipe) = plan.pipe(out) else {
        return Ok(false);
    };
    if pipe.consumers.len() != 1 {
        return Ok(false);
    }
    let downstream = pipe.consumers[0];
    let Some(consumer) = plan.node(downstream) else {
        return Ok(false);
    };
    let PigOperator::Filter { predicate: p2 } = consumer.op.clone() else {
        return Ok(false);
    };

    plan.replace(
        downstream,
        PigOperator::Filter {
            predicate: p1.and(p2),
        },
    )?;
    plan.remove(id, false)?;
    Ok(true)
}

/// Push a filter below a FOREACH whose generator is a pure projection of
/// the fields the predicate references (same names in and out). The two
/// operators commute, so their payloads are swapped.
pub fn push_filter_over_foreach(plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
    let Some(node) = plan.node(id) else {
        return Ok(false);
    };
    let PigOperator::Filter { predicate } = &node.op else {
        return Ok(false);
    };
    let predicate = predicate.clone();
    let Some(input) = node.inputs.first() else {
        return Ok(false);
    };
    let Some(pipe) = plan.pipe(input) else {
        return Ok(false);
    };
    let upstream = pipe.producer;
    if pipe.consumers.len() != 1 {
        return Ok(false);
    }
    let Some(up_node) = plan.node(upstream) else {
        return Ok(false);
    };
    let PigOperator::Foreach {
        generator: Generator::List(exprs),
    } = &up_node.op
    else {
        return Ok(false);
    };

    // Every referenced field must pass through the projection unchanged.
    let preserved: Vec<&str> = exprs
        .iter()
        .filter_map(|g| match (&g.expr, &g.alias) {
            (crate::expr::ArithmeticExpr::Ref(crate::expr::RefExpr::Named(n)), None) => {
                Some(n.as_str())
            }
            (crate::expr::ArithmeticExpr::Ref(crate::expr::RefExpr::Named(n)), Some(a))
                if a.name == *n =>
            {
                Some(n.as_str())
            }
            _ => None,
        })
        .collect();
    let referenced = predicate.referenced_fields();
    if referenced.is_empty() || !referenced.iter().all(|f| preserved.contains(&f.as_str())) {
        return Ok(false);
    }

    debug!(%id, "pushing filter below foreach");
    plan.swap(upstream, id)?;
    Ok(true)
}

/// Push a filter below a UNION by duplicating it onto every input branch.
/// Only fires when the predicate conforms to every branch's schema.
pub fn push_filter_over_union(plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
    let Some(node) = plan.node(id) else {
        return Ok(false);
    };
    let PigOperator::Filter { predicate } = &node.op else {
        return Ok(false);
    };
    let predicate = predicate.clone();
    let Some(filter_out) = node.outputs.first().cloned() else {
        return Ok(false);
    };
    let Some(input) = node.inputs.first() else {
        return Ok(false);
    };
    let Some(pipe) = plan.pipe(input) else {
        return Ok(false);
    };
    let union_id = pipe.producer;
    if pipe.consumers.len() != 1 {
        return Ok(false);
    }
    let Some(union_node) = plan.node(union_id) else {
        return Ok(false);
    };
    if !matches!(union_node.op, PigOperator::Union) {
        return Ok(false);
    }

    // Each branch must be able to evaluate the predicate.
    let branch_producers: Vec<OpId> = union_node
        .inputs
        .iter()
        .filter_map(|name| plan.pipe(name).map(|p| p.producer))
        .collect();
    for producer in &branch_producers {
        let schema = plan.node(*producer).and_then(|n| n.schema.clone());
        if predicate.check(schema.as_ref()).is_err() {
            return Ok(false);
        }
    }

    debug!(%id, branches = branch_producers.len(), "duplicating filter below union");
    for (i, producer) in branch_producers.iter().enumerate() {
        let branch_filter = OperatorNode::new(
            PigOperator::Filter {
                predicate: predicate.clone(),
            },
            &format!("{filter_out}_{i}"),
            &[],
        );
        plan.insert_between(*producer, union_id, branch_filter)?;
    }
    plan.remove(id, false)?;
    Ok(true)
}

/// Streaming backends only: fuse `WINDOW` with its downstream operator
/// into a `WindowApply`, which emits the window-variant of the operator.
pub fn apply_window(plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
    let Some(node) = plan.node(id) else {
        return Ok(false);
    };
    let PigOperator::Window { range, slide } = node.op.clone() else {
        return Ok(false);
    };
    let Some(out) = node.outputs.first() else {
        return Ok(false);
    };
    let Some(pipe) = plan.pipe(out) else {
        return Ok(false);
    };
    if pipe.consumers.len() != 1 {
        return Ok(false);
    }
    let downstream = pipe.consumers[0];
    let Some(consumer) = plan.node(downstream) else {
        return Ok(false);
    };
    let windowable = matches!(
        consumer.op,
        PigOperator::Grouping { .. }
            | PigOperator::Distinct
            | PigOperator::Foreach { .. }
            | PigOperator::OrderBy { .. }
    );
    if !windowable {
        return Ok(false);
    }

    let inner = consumer.op.clone();
    plan.replace(
        downstream,
        PigOperator::WindowApply {
            range,
            slide,
            inner: Box::new(inner),
        },
    )?;
    plan.remove(id, false)?;
    Ok(true)
}

/// Opt-in instrumentation pass: wrap every non-sink operator's output
/// pipe with a `TimingOp` so the emitted job tags records with lineage
/// and partition id. Idempotent - already-instrumented pipes are skipped.
pub fn insert_timing(plan: &mut DataflowPlan) -> Result<usize> {
    let mut inserted = 0;
    for id in plan.ids() {
        let Some(node) = plan.node(id) else { continue };
        if matches!(node.op, PigOperator::TimingOp) || node.is_sink() {
            continue;
        }
        let Some(out) = node.outputs.first().cloned() else {
            continue;
        };
        let already = plan
            .pipe(&out)
            .map(|p| {
                p.consumers.iter().any(|c| {
                    plan.node(*c)
                        .map(|n| matches!(n.op, PigOperator::TimingOp))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);
        if already {
            continue;
        }
        let timing = OperatorNode::new(PigOperator::TimingOp, &format!("{out}_t"), &[]);
        plan.insert_after(id, timing)?;
        inserted += 1;
    }
    if inserted > 0 {
        plan.refresh_schemas()?;
    }
    Ok(inserted)
}

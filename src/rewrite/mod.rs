//! Pattern-directed plan rewriting.
//!
//! Rewriting follows the strategic-programming discipline: a rule is a
//! small function that inspects one operator and either edits the plan
//! (returning `true`) or leaves it alone (`false`). Rules compose through
//! `sequence`, `choice` and `innermost` (which rewrites an operator's
//! input producers before the operator itself); the driver supplies the
//! `everywhere` and `fixpoint` part by scanning every operator with every
//! registered rule until a full pass makes no change.
//!
//! ```text
//! DataflowPlan -> [registry rules to fixpoint] -> normalized DataflowPlan
//! ```
//!
//! The registry starts from the standard batch rules (filter merge,
//! predicate pushdown); backends append their own (the streaming backend
//! maps windowed operators onto window-applied equivalents). Rules
//! terminate because each either reduces the operator count or replaces a
//! pattern with a strictly smaller normal form.

pub mod rules;

use tracing::debug;

use crate::error::Result;
use crate::plan::{DataflowPlan, OpId};

/// Bound on full rewrite passes; a safety net, fixpoint is normally
/// reached after two or three.
const MAX_ITERATIONS: usize = 10;

type RuleFn = Box<dyn Fn(&mut DataflowPlan, OpId) -> Result<bool> + Send + Sync>;

/// A named rewrite rule over one operator.
pub struct Rule {
    pub name: &'static str,
    apply: RuleFn,
}

impl Rule {
    pub fn new(
        name: &'static str,
        apply: impl Fn(&mut DataflowPlan, OpId) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name,
            apply: Box::new(apply),
        }
    }

    pub fn apply(&self, plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
        (self.apply)(plan, id)
    }
}

/// Apply `a` then `b` at the same operator; succeeds if either did.
pub fn sequence(a: Rule, b: Rule) -> Rule {
    Rule::new("sequence", move |plan, id| {
        let first = a.apply(plan, id)?;
        // the operator may be gone after the first edit
        let second = if plan.node(id).is_some() {
            b.apply(plan, id)?
        } else {
            false
        };
        Ok(first || second)
    })
}

/// Try `a`; only if it did not fire, try `b`.
pub fn choice(a: Rule, b: Rule) -> Rule {
    Rule::new("choice", move |plan, id| {
        if a.apply(plan, id)? {
            Ok(true)
        } else {
            b.apply(plan, id)
        }
    })
}

/// Apply the rule bottom-up: rewrite the operator's transitive input
/// producers first, then the operator itself. Succeeds if any
/// application in the upstream cone did.
pub fn innermost(rule: Rule) -> Rule {
    let rule = std::sync::Arc::new(rule);
    Rule::new("innermost", move |plan, id| apply_innermost(&rule, plan, id))
}

fn apply_innermost(rule: &Rule, plan: &mut DataflowPlan, id: OpId) -> Result<bool> {
    let producers: Vec<OpId> = plan
        .node(id)
        .map(|node| {
            node.inputs
                .iter()
                .filter_map(|name| plan.pipe(name).map(|pipe| pipe.producer))
                .collect()
        })
        .unwrap_or_default();

    let mut changed = false;
    for producer in producers {
        // an upstream edit may have removed the producer already
        if plan.node(producer).is_some() {
            changed |= apply_innermost(rule, plan, producer)?;
        }
    }
    if plan.node(id).is_some() {
        changed |= rule.apply(plan, id)?;
    }
    Ok(changed)
}

/// Ordered collection of rewrite rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn empty() -> Self {
        RuleRegistry { rules: Vec::new() }
    }

    /// The backend-independent batch rules.
    pub fn standard() -> Self {
        let mut registry = RuleRegistry::empty();
        registry.register(Rule::new("filter-merge", rules::merge_filters));
        registry.register(Rule::new(
            "filter-pushdown-foreach",
            rules::push_filter_over_foreach,
        ));
        registry.register(Rule::new(
            "filter-pushdown-union",
            rules::push_filter_over_union,
        ));
        registry
    }

    pub fn register(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Run the registry to a fixed point, re-propagating schemas after every
/// successful match. Returns the number of applied rewrites.
pub fn rewrite_plan(plan: &mut DataflowPlan, registry: &RuleRegistry) -> Result<usize> {
    let mut applied = 0;
    for _iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for rule in registry.rules() {
            // snapshot: rules edit the arena while we scan it
            for id in plan.ids() {
                if plan.node(id).is_none() {
                    continue;
                }
                if rule.apply(plan, id)? {
                    debug!(rule = rule.name, op = %id, "rewrite applied");
                    plan.refresh_schemas()?;
                    applied += 1;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    Ok(applied)
}

//! The dataflow plan: a typed operator graph with schema propagation.
//!
//! The parser hands over a flat, ordered operator list in which pipes are
//! resolved textually (an operator knows the *names* of its input pipes)
//! but edges are not. Plan assembly
//!
//! 1. strips `REGISTER` statements into `additional_jars`,
//! 2. builds the pipe table keyed by output pipe name (a duplicate name
//!    is an invalid plan),
//! 3. resolves every input pipe, wires producer/consumer edges, prepares
//!    nested FOREACH sub-plans and propagates schemas in dependency order.
//!
//! Operators live in an arena owned by the plan and are addressed by
//! `OpId`; pipes hold `OpId`s on both ends, which keeps the
//! producer/consumer "cycle" as plain indices. The structural edit API
//! (`insert_after`, `insert_between`, `remove`, `replace`, `swap`) is the
//! rewrite engine's primitive toolbox; every edit leaves the plan
//! observing the same invariants as construction.

pub mod lineage;
pub mod matcher;
pub mod operators;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::debug;

use crate::error::{PlanError, Result, SchemaError};
use crate::fs::{FsService, LocalFs};
use crate::schema::Schema;

pub use operators::{
    CacheMode, Generator, GeneratorExpr, LoaderSpec, OrderSpec, PigOperator, PipeInput,
    WindowDef, WindowUnit,
};

/// Maximum depth of nested FOREACH sub-plans.
pub const MAX_NESTING: usize = 2;

/// Index of an operator in the plan's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub usize);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Named edge carrying tuples from one operator's output to its consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub name: String,
    pub producer: OpId,
    pub consumers: Vec<OpId>,
}

/// One operator with its pipe attachments and propagated schema.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub op: PigOperator,
    /// Input pipe names, ordered (JOIN emission is positional)
    pub inputs: Vec<String>,
    /// Output pipe names; usually one, many for SPLIT, empty for sinks
    pub outputs: Vec<String>,
    pub schema: Option<Schema>,
}

impl OperatorNode {
    /// An operator with a single output pipe. The parser's convention of
    /// `""` for sinks is honored: an empty name yields no output pipe.
    pub fn new(op: PigOperator, out_pipe: &str, in_pipes: &[&str]) -> Self {
        let outputs = if out_pipe.is_empty() {
            Vec::new()
        } else {
            vec![out_pipe.to_string()]
        };
        OperatorNode {
            op,
            inputs: in_pipes.iter().map(|s| s.to_string()).collect(),
            outputs,
            schema: None,
        }
    }

    /// An operator with several output pipes (SPLIT).
    pub fn with_outputs(op: PigOperator, out_pipes: &[&str], in_pipes: &[&str]) -> Self {
        OperatorNode {
            op,
            inputs: in_pipes.iter().map(|s| s.to_string()).collect(),
            outputs: out_pipes.iter().map(|s| s.to_string()).collect(),
            schema: None,
        }
    }

    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Primary output alias, used in diagnostics and emitted variable names.
    pub fn alias(&self) -> Option<&str> {
        self.outputs.first().map(|s| s.as_str())
    }
}

/// Environment for plan assembly: profiling toggles whether `LOAD` folds
/// file modification times into lineage.
pub struct PlanEnv<'a> {
    pub profiling: bool,
    pub fs: &'a dyn FsService,
}

impl Default for PlanEnv<'static> {
    fn default() -> Self {
        PlanEnv {
            profiling: false,
            fs: &LocalFs,
        }
    }
}

/// The operator graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataflowPlan {
    nodes: Vec<Option<OperatorNode>>,
    pipes: BTreeMap<String, Pipe>,
    /// Jars accumulated from stripped REGISTER statements
    pub additional_jars: Vec<String>,
}

impl DataflowPlan {
    /// Assemble a plan with profiling disabled and the local filesystem.
    pub fn new(ops: Vec<OperatorNode>) -> Result<Self> {
        Self::construct(ops, &PlanEnv::default())
    }

    /// Assemble a plan from the parser's flat operator list.
    pub fn construct(ops: Vec<OperatorNode>, env: &PlanEnv) -> Result<Self> {
        Self::construct_nested(ops, env, 0, None)
    }

    fn construct_nested(
        ops: Vec<OperatorNode>,
        env: &PlanEnv,
        depth: usize,
        parent_schema: Option<&Schema>,
    ) -> Result<Self> {
        if depth > MAX_NESTING {
            return Err(PlanError::NestingTooDeep { max: MAX_NESTING }.into());
        }

        let mut plan = DataflowPlan::default();

        for mut node in ops {
            // REGISTER is an auxiliary statement, not a graph node
            if let PigOperator::Register { jar } = &node.op {
                plan.additional_jars.push(jar.clone());
                continue;
            }
            // LOAD captures its file's mtime while profiling so that file
            // edits invalidate cached materializations
            if let PigOperator::Load {
                file,
                last_modified,
                ..
            } = &mut node.op
            {
                *last_modified = if env.profiling {
                    env.fs.last_modified(file).unwrap_or_else(|_| {
                        debug!(file = %file.display(), "mtime unavailable, using -1");
                        -1
                    })
                } else {
                    -1
                };
            }
            if let PigOperator::Foreach {
                generator: Generator::List(exprs),
            } = &node.op
            {
                if exprs.is_empty() {
                    return Err(PlanError::EmptyGenerator.into());
                }
            }
            // Nested-FOREACH sources resolve against the enclosing schema
            if let PigOperator::ConstructBag {
                parent_schema: ps, ..
            } = &mut node.op
            {
                *ps = parent_schema.cloned();
            }
            plan.nodes.push(Some(node));
        }

        plan.build_pipe_table()?;
        plan.prepare_and_propagate(env, depth)?;
        Ok(plan)
    }

    /// Rebuild the pipe table from the nodes' declared pipe names.
    fn build_pipe_table(&mut self) -> Result<()> {
        self.pipes.clear();
        for (idx, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            for out in &node.outputs {
                if self.pipes.contains_key(out) {
                    return Err(PlanError::DuplicatePipe { name: out.clone() }.into());
                }
                self.pipes.insert(
                    out.clone(),
                    Pipe {
                        name: out.clone(),
                        producer: OpId(idx),
                        consumers: Vec::new(),
                    },
                );
            }
        }
        for (idx, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            for input in &node.inputs {
                match self.pipes.get_mut(input) {
                    Some(pipe) => pipe.consumers.push(OpId(idx)),
                    None => {
                        return Err(PlanError::InvalidPipe {
                            name: input.clone(),
                        }
                        .into())
                    }
                }
            }
        }
        Ok(())
    }

    /// Prepare nested sub-plans and propagate schemas in dependency order.
    fn prepare_and_propagate(&mut self, env: &PlanEnv, depth: usize) -> Result<()> {
        for id in self.topological_order()? {
            let inputs = self.resolved_inputs(id);

            // Build the sub-plan of a nested FOREACH once its input schema
            // is known; the final statement must be GENERATE.
            let needs_subplan = matches!(
                self.node(id).map(|n| &n.op),
                Some(PigOperator::Foreach {
                    generator: Generator::Plan { plan: None, .. }
                })
            );
            if needs_subplan {
                let parent = inputs.first().and_then(|i| i.schema.clone());
                let node = self.node_mut(id).ok_or(PlanError::UnknownOperator {
                    what: id.to_string(),
                })?;
                if let PigOperator::Foreach {
                    generator: Generator::Plan { ops, plan },
                } = &mut node.op
                {
                    match ops.last().map(|n| &n.op) {
                        Some(PigOperator::Generate { .. }) => {}
                        _ => return Err(PlanError::MissingGenerate.into()),
                    }
                    let sub = DataflowPlan::construct_nested(
                        std::mem::take(ops),
                        env,
                        depth + 1,
                        parent.as_ref(),
                    )?;
                    *plan = Some(Box::new(sub));
                }
            }

            let node = self.node(id).ok_or(PlanError::UnknownOperator {
                what: id.to_string(),
            })?;
            let schema = node.op.construct_schema(&inputs)?;
            if let Some(node) = self.node_mut(id) {
                node.schema = schema;
            }
        }
        Ok(())
    }

    /// Re-run schema propagation after structural edits.
    pub fn refresh_schemas(&mut self) -> Result<()> {
        for id in self.topological_order()? {
            let inputs = self.resolved_inputs(id);
            let node = self.node(id).ok_or(PlanError::UnknownOperator {
                what: id.to_string(),
            })?;
            let schema = node.op.construct_schema(&inputs)?;
            if let Some(node) = self.node_mut(id) {
                node.schema = schema;
            }
        }
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Live operator ids in arena order.
    pub fn ids(&self) -> Vec<OpId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| OpId(idx))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: OpId) -> Option<&OperatorNode> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn node_mut(&mut self, id: OpId) -> Option<&mut OperatorNode> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn pipe(&self, name: &str) -> Option<&Pipe> {
        self.pipes.get(name)
    }

    pub fn schema_of(&self, id: OpId) -> Option<Schema> {
        self.node(id).and_then(|n| n.schema.clone())
    }

    /// Producer and schema for each input pipe of an operator.
    pub fn resolved_inputs(&self, id: OpId) -> Vec<PipeInput> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.inputs
            .iter()
            .map(|name| {
                let schema = self
                    .pipes
                    .get(name)
                    .and_then(|p| self.node(p.producer))
                    .and_then(|n| n.schema.clone());
                PipeInput {
                    pipe: name.clone(),
                    schema,
                }
            })
            .collect()
    }

    /// Operators without output pipes, or whose outputs nobody consumes.
    pub fn sink_nodes(&self) -> Vec<OpId> {
        self.ids()
            .into_iter()
            .filter(|id| {
                let node = self.node(*id).expect("live id");
                node.outputs.iter().all(|out| {
                    self.pipes
                        .get(out)
                        .map(|p| p.consumers.is_empty())
                        .unwrap_or(true)
                })
            })
            .collect()
    }

    /// Operators without inputs.
    pub fn source_nodes(&self) -> Vec<OpId> {
        self.ids()
            .into_iter()
            .filter(|id| self.node(*id).expect("live id").is_source())
            .collect()
    }

    /// Producer of the pipe with the given alias.
    pub fn find_operator_for_alias(&self, alias: &str) -> Option<OpId> {
        self.pipes.get(alias).map(|p| p.producer)
    }

    /// Operator with the given lineage signature.
    pub fn get(&self, signature: &str) -> Option<OpId> {
        self.ids()
            .into_iter()
            .find(|id| self.lineage_signature(*id) == signature)
    }

    // ── Lineage ─────────────────────────────────────────────────────────

    /// Canonical recursive description of an operator.
    pub fn lineage_string(&self, id: OpId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        let mut out = node.op.lineage_tag();
        let parents: Vec<String> = node
            .inputs
            .iter()
            .filter_map(|name| self.pipes.get(name))
            .map(|pipe| self.lineage_string(pipe.producer))
            .collect();
        out.push_str(&parents.join("%"));
        out
    }

    /// MD5 hex signature of the canonical description.
    pub fn lineage_signature(&self, id: OpId) -> String {
        lineage::signature(&self.lineage_string(id))
    }

    // ── Order and checks ────────────────────────────────────────────────

    /// Operators in dependency order (producers before consumers).
    pub fn topological_order(&self) -> Result<Vec<OpId>> {
        let mut in_degree: HashMap<OpId, usize> = HashMap::new();
        for id in self.ids() {
            in_degree.insert(id, self.node(id).expect("live id").inputs.len());
        }
        let mut queue: VecDeque<OpId> = self
            .ids()
            .into_iter()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut order = Vec::new();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let node = self.node(id).expect("live id");
            for out in &node.outputs {
                if let Some(pipe) = self.pipes.get(out) {
                    for consumer in &pipe.consumers {
                        let deg = in_degree.entry(*consumer).or_insert(0);
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            queue.push_back(*consumer);
                        }
                    }
                }
            }
        }
        if order.len() != self.len() {
            return Err(PlanError::InvalidEdit {
                message: "operator graph contains a cycle".to_string(),
            }
            .into());
        }
        Ok(order)
    }

    /// Weak connectivity over the undirected view of the pipe edges.
    pub fn check_connectivity(&self) -> Result<()> {
        let ids = self.ids();
        if ids.len() <= 1 {
            return Ok(());
        }
        let mut adjacency: HashMap<OpId, Vec<OpId>> = HashMap::new();
        for pipe in self.pipes.values() {
            for consumer in &pipe.consumers {
                adjacency.entry(pipe.producer).or_default().push(*consumer);
                adjacency.entry(*consumer).or_default().push(pipe.producer);
            }
        }
        let mut seen: HashSet<OpId> = HashSet::new();
        let mut stack = vec![ids[0]];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(neighbors) = adjacency.get(&id) {
                stack.extend(neighbors.iter().copied());
            }
        }
        if seen.len() != ids.len() {
            return Err(PlanError::Disconnected.into());
        }
        Ok(())
    }

    /// Run every operator's conformance rule; collect all offenders.
    pub fn check_schema_conformance(&self) -> Result<(), SchemaError> {
        let mut offenders = Vec::new();
        for id in self.ids() {
            let node = self.node(id).expect("live id");
            let inputs = self.resolved_inputs(id);
            if node.op.check_conformance(&inputs).is_err() {
                offenders.push(
                    node.alias()
                        .map(|a| format!("{} ({})", node.op.name(), a))
                        .unwrap_or_else(|| node.op.name().to_string()),
                );
            }
        }
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Conformance {
                operators: offenders,
            })
        }
    }

    // ── Structural edits ────────────────────────────────────────────────

    fn require(&self, id: OpId) -> Result<&OperatorNode> {
        self.node(id).ok_or_else(|| {
            PlanError::UnknownOperator {
                what: id.to_string(),
            }
            .into()
        })
    }

    fn push_node(&mut self, node: OperatorNode) -> OpId {
        self.nodes.push(Some(node));
        OpId(self.nodes.len() - 1)
    }

    /// Splice `new_node` onto `old`'s single output pipe, rerouting old's
    /// consumers to read from `new_node`. A sink `new_node` (no output
    /// pipe) instead becomes an additional consumer of `old`'s output.
    pub fn insert_after(&mut self, old: OpId, mut new_node: OperatorNode) -> Result<OpId> {
        let old_node = self.require(old)?;
        let old_out = old_node
            .outputs
            .first()
            .cloned()
            .ok_or(PlanError::InvalidEdit {
                message: format!("insert_after: {old} has no output pipe"),
            })?;

        if new_node.is_sink() {
            new_node.inputs = vec![old_out.clone()];
            let new_id = self.push_node(new_node);
            if let Some(pipe) = self.pipes.get_mut(&old_out) {
                pipe.consumers.push(new_id);
            }
            return Ok(new_id);
        }

        let new_out = new_node.outputs[0].clone();
        if self.pipes.contains_key(&new_out) {
            return Err(PlanError::DuplicatePipe { name: new_out }.into());
        }
        let downstream = self
            .pipes
            .get(&old_out)
            .map(|p| p.consumers.clone())
            .unwrap_or_default();

        new_node.inputs = vec![old_out.clone()];
        let new_id = self.push_node(new_node);

        for consumer in &downstream {
            if let Some(node) = self.node_mut(*consumer) {
                for input in node.inputs.iter_mut() {
                    if *input == old_out {
                        *input = new_out.clone();
                    }
                }
            }
        }
        if let Some(pipe) = self.pipes.get_mut(&old_out) {
            pipe.consumers = vec![new_id];
        }
        self.pipes.insert(
            new_out.clone(),
            Pipe {
                name: new_out,
                producer: new_id,
                consumers: downstream,
            },
        );
        Ok(new_id)
    }

    /// Place `new_node` on the specific edge `producer -> consumer`,
    /// leaving the producer's other consumers untouched.
    pub fn insert_between(
        &mut self,
        producer: OpId,
        consumer: OpId,
        mut new_node: OperatorNode,
    ) -> Result<OpId> {
        self.require(producer)?;
        self.require(consumer)?;
        let edge = self
            .pipes
            .values()
            .find(|p| p.producer == producer && p.consumers.contains(&consumer))
            .map(|p| p.name.clone())
            .ok_or(PlanError::InvalidEdit {
                message: format!("insert_between: no edge {producer} -> {consumer}"),
            })?;
        let new_out = new_node
            .outputs
            .first()
            .cloned()
            .ok_or(PlanError::InvalidEdit {
                message: "insert_between: new operator needs an output pipe".to_string(),
            })?;
        if self.pipes.contains_key(&new_out) {
            return Err(PlanError::DuplicatePipe { name: new_out }.into());
        }

        new_node.inputs = vec![edge.clone()];
        let new_id = self.push_node(new_node);

        if let Some(node) = self.node_mut(consumer) {
            for input in node.inputs.iter_mut() {
                if *input == edge {
                    *input = new_out.clone();
                }
            }
        }
        if let Some(pipe) = self.pipes.get_mut(&edge) {
            for c in pipe.consumers.iter_mut() {
                if *c == consumer {
                    *c = new_id;
                }
            }
        }
        self.pipes.insert(
            new_out.clone(),
            Pipe {
                name: new_out,
                producer: new_id,
                consumers: vec![consumer],
            },
        );
        Ok(new_id)
    }

    /// Place `new_node` between `producer` and all of its consumers.
    pub fn insert_between_all(&mut self, producer: OpId, new_node: OperatorNode) -> Result<OpId> {
        self.insert_after(producer, new_node)
    }

    /// Delete `op`, connecting its input producer directly to its
    /// consumers. With `remove_predecessors`, the transitive upstream cone
    /// feeding only `op` is deleted as well.
    pub fn remove(&mut self, op: OpId, remove_predecessors: bool) -> Result<()> {
        let node = self.require(op)?.clone();

        if remove_predecessors {
            self.detach_upstream(op)?;
        } else if node.inputs.len() > 1 {
            return Err(PlanError::InvalidEdit {
                message: format!("remove: {op} has multiple inputs"),
            }
            .into());
        }

        let node = self.require(op)?.clone();
        let in_pipe = node.inputs.first().cloned();

        for out in &node.outputs {
            let downstream = self
                .pipes
                .get(out)
                .map(|p| p.consumers.clone())
                .unwrap_or_default();
            match &in_pipe {
                Some(in_pipe) => {
                    for consumer in &downstream {
                        if let Some(c) = self.node_mut(*consumer) {
                            for input in c.inputs.iter_mut() {
                                if input == out {
                                    *input = in_pipe.clone();
                                }
                            }
                        }
                    }
                    if let Some(pipe) = self.pipes.get_mut(in_pipe) {
                        // keep the removed operator's position in the
                        // consumer list for its replacements
                        let mut rebuilt = Vec::new();
                        for c in &pipe.consumers {
                            if *c == op {
                                rebuilt.extend(downstream.iter().copied());
                            } else {
                                rebuilt.push(*c);
                            }
                        }
                        pipe.consumers = rebuilt;
                    }
                }
                None => {
                    if !downstream.is_empty() {
                        return Err(PlanError::InvalidEdit {
                            message: format!("remove: source {op} still has consumers"),
                        }
                        .into());
                    }
                }
            }
            self.pipes.remove(out);
        }

        if let Some(in_pipe) = &in_pipe {
            if let Some(pipe) = self.pipes.get_mut(in_pipe) {
                pipe.consumers.retain(|c| *c != op);
            }
        }
        self.nodes[op.0] = None;
        Ok(())
    }

    /// Remove every operator strictly upstream of `op` that feeds nothing
    /// outside the cone, then clear `op`'s inputs.
    pub fn detach_upstream(&mut self, op: OpId) -> Result<()> {
        self.require(op)?;

        // Transitive producers of op
        let mut cone: HashSet<OpId> = HashSet::new();
        let mut stack = vec![op];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            for input in &node.inputs {
                if let Some(pipe) = self.pipes.get(input) {
                    if cone.insert(pipe.producer) {
                        stack.push(pipe.producer);
                    }
                }
            }
        }

        // Only delete producers whose every consumer lies in the cone
        let deletable: HashSet<OpId> = cone
            .iter()
            .copied()
            .filter(|id| {
                let node = self.node(*id).expect("cone member");
                node.outputs.iter().all(|out| {
                    self.pipes
                        .get(out)
                        .map(|p| {
                            p.consumers
                                .iter()
                                .all(|c| cone.contains(c) || *c == op)
                        })
                        .unwrap_or(true)
                })
            })
            .collect();

        for id in &deletable {
            let node = self.node(*id).expect("cone member").clone();
            for out in &node.outputs {
                self.pipes.remove(out);
            }
            self.nodes[id.0] = None;
        }

        // Unlink op from pipes that survived (shared with other branches)
        let inputs = self.require(op)?.inputs.clone();
        for input in &inputs {
            if let Some(pipe) = self.pipes.get_mut(input) {
                pipe.consumers.retain(|c| *c != op);
            }
        }
        if let Some(node) = self.node_mut(op) {
            node.inputs.clear();
        }
        Ok(())
    }

    /// Substitute the operator payload in place, preserving all edges.
    pub fn replace(&mut self, old: OpId, replacement: PigOperator) -> Result<()> {
        let node = self.node_mut(old).ok_or(PlanError::UnknownOperator {
            what: old.to_string(),
        })?;
        node.op = replacement;
        Ok(())
    }

    /// Exchange the payloads of two unary operators (commutativity-
    /// preserving rewrites such as predicate pushdown).
    pub fn swap(&mut self, a: OpId, b: OpId) -> Result<()> {
        for id in [a, b] {
            let node = self.require(id)?;
            if node.inputs.len() != 1 || node.outputs.len() != 1 {
                return Err(PlanError::InvalidEdit {
                    message: format!("swap: {id} is not unary"),
                }
                .into());
            }
        }
        if a == b {
            return Ok(());
        }
        let (low, high) = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (front, back) = self.nodes.split_at_mut(high);
        let left = front[low].as_mut().expect("checked above");
        let right = back[0].as_mut().expect("checked above");
        std::mem::swap(&mut left.op, &mut right.op);
        Ok(())
    }

    /// Multi-line description of the graph for `--show-plan`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let order = self.topological_order().unwrap_or_else(|_| self.ids());
        for id in order {
            let node = self.node(id).expect("live id");
            let ins = node.inputs.join(", ");
            let outs = node.outputs.join(", ");
            let schema = node
                .schema
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string());
            out.push_str(&format!(
                "{id}: {} [{ins}] -> [{outs}] :: {schema}\n",
                node.op.name()
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ArithmeticExpr, CmpOp, Literal, Predicate};
    use crate::schema::{Field, PigType, TupleType};
    use std::path::PathBuf;

    fn load_op(file: &str, fields: Vec<(&str, PigType)>) -> PigOperator {
        PigOperator::Load {
            file: PathBuf::from(file),
            declared_schema: Some(TupleType::new(
                fields
                    .into_iter()
                    .map(|(n, t)| Field::new(n, t))
                    .collect(),
            )),
            loader: None,
            last_modified: -1,
        }
    }

    fn filter_gt(field: &str, value: i32) -> PigOperator {
        PigOperator::Filter {
            predicate: Predicate::cmp(
                CmpOp::Gt,
                ArithmeticExpr::field(field),
                ArithmeticExpr::Const(Literal::Int(value)),
            ),
        }
    }

    fn simple_plan() -> DataflowPlan {
        DataflowPlan::new(vec![
            OperatorNode::new(
                load_op("f", vec![("x", PigType::Int), ("y", PigType::Int)]),
                "a",
                &[],
            ),
            OperatorNode::new(filter_gt("x", 0), "b", &["a"]),
            OperatorNode::new(
                PigOperator::Store {
                    file: PathBuf::from("out"),
                    storer: None,
                },
                "",
                &["b"],
            ),
        ])
        .expect("plan constructs")
    }

    #[test]
    fn test_construction_wires_pipes() {
        let plan = simple_plan();
        assert_eq!(plan.len(), 3);
        let a = plan.pipe("a").expect("pipe a");
        assert_eq!(a.consumers.len(), 1);
        assert_eq!(plan.source_nodes().len(), 1);
        assert_eq!(plan.sink_nodes().len(), 1);
        assert!(plan.check_connectivity().is_ok());
    }

    #[test]
    fn test_duplicate_pipe_is_invalid() {
        let result = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            OperatorNode::new(load_op("g", vec![("x", PigType::Int)]), "a", &[]),
        ]);
        assert!(matches!(
            result,
            Err(crate::error::PigletError::Plan(PlanError::DuplicatePipe { .. }))
        ));
    }

    #[test]
    fn test_missing_pipe_is_invalid() {
        let result = DataflowPlan::new(vec![OperatorNode::new(filter_gt("x", 0), "b", &["nope"])]);
        assert!(matches!(
            result,
            Err(crate::error::PigletError::Plan(PlanError::InvalidPipe { .. }))
        ));
    }

    #[test]
    fn test_register_is_stripped() {
        let plan = DataflowPlan::new(vec![
            OperatorNode::new(
                PigOperator::Register {
                    jar: "udf.jar".to_string(),
                },
                "",
                &[],
            ),
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
        ])
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.additional_jars, vec!["udf.jar".to_string()]);
    }

    #[test]
    fn test_schema_propagates() {
        let plan = simple_plan();
        let filter = plan.find_operator_for_alias("b").unwrap();
        let schema = plan.schema_of(filter).expect("filter has schema");
        assert_eq!(schema.arity(), 2);
    }

    #[test]
    fn test_empty_generator_rejected() {
        let result = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            OperatorNode::new(
                PigOperator::Foreach {
                    generator: Generator::List(vec![]),
                },
                "b",
                &["a"],
            ),
        ]);
        assert!(matches!(
            result,
            Err(crate::error::PigletError::Plan(PlanError::EmptyGenerator))
        ));
    }

    #[test]
    fn test_nested_foreach_requires_generate() {
        let nested = OperatorNode::new(
            PigOperator::Foreach {
                generator: Generator::Plan {
                    ops: vec![OperatorNode::new(
                        PigOperator::ConstructBag {
                            reference: crate::expr::RefExpr::named("x"),
                            parent_schema: None,
                        },
                        "t",
                        &[],
                    )],
                    plan: None,
                },
            },
            "b",
            &["a"],
        );
        let result = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            nested,
        ]);
        assert!(matches!(
            result,
            Err(crate::error::PigletError::Plan(PlanError::MissingGenerate))
        ));
    }

    #[test]
    fn test_insert_after_reroutes_consumers() {
        let mut plan = simple_plan();
        let filter = plan.find_operator_for_alias("b").unwrap();
        let timing = OperatorNode::new(PigOperator::TimingOp, "b_timing", &[]);
        let new_id = plan.insert_after(filter, timing).unwrap();

        // store now reads from the timing op
        let store = plan.sink_nodes()[0];
        assert_eq!(plan.node(store).unwrap().inputs, vec!["b_timing"]);
        assert_eq!(plan.pipe("b").unwrap().consumers, vec![new_id]);
        assert!(plan.check_connectivity().is_ok());
        assert!(plan.refresh_schemas().is_ok());
    }

    #[test]
    fn test_insert_after_sink_becomes_extra_consumer() {
        let mut plan = simple_plan();
        let filter = plan.find_operator_for_alias("b").unwrap();
        let store = OperatorNode::new(
            PigOperator::Store {
                file: PathBuf::from("matdir/abc"),
                storer: None,
            },
            "",
            &[],
        );
        plan.insert_after(filter, store).unwrap();
        assert_eq!(plan.pipe("b").unwrap().consumers.len(), 2);
    }

    #[test]
    fn test_remove_reconnects() {
        let mut plan = simple_plan();
        let filter = plan.find_operator_for_alias("b").unwrap();
        plan.remove(filter, false).unwrap();
        assert_eq!(plan.len(), 2);
        let store = plan.sink_nodes()[0];
        assert_eq!(plan.node(store).unwrap().inputs, vec!["a"]);
        assert!(plan.pipe("b").is_none());
        assert!(plan.check_connectivity().is_ok());
    }

    #[test]
    fn test_detach_upstream_clears_cone() {
        let mut plan = simple_plan();
        let filter = plan.find_operator_for_alias("b").unwrap();
        plan.detach_upstream(filter).unwrap();
        assert!(plan.node(filter).unwrap().inputs.is_empty());
        assert!(plan.find_operator_for_alias("a").is_none(), "load deleted");
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_swap_exchanges_payloads() {
        let mut plan = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            OperatorNode::new(filter_gt("x", 0), "b", &["a"]),
            OperatorNode::new(PigOperator::Distinct, "c", &["b"]),
            OperatorNode::new(
                PigOperator::Store {
                    file: PathBuf::from("out"),
                    storer: None,
                },
                "",
                &["c"],
            ),
        ])
        .unwrap();
        let b = plan.find_operator_for_alias("b").unwrap();
        let c = plan.find_operator_for_alias("c").unwrap();
        plan.swap(b, c).unwrap();
        assert_eq!(plan.node(b).unwrap().op.name(), "DISTINCT");
        assert_eq!(plan.node(c).unwrap().op.name(), "FILTER");
    }

    #[test]
    fn test_lineage_shared_prefix_matches() {
        let p1 = simple_plan();
        let p2 = simple_plan();
        let f1 = p1.find_operator_for_alias("b").unwrap();
        let f2 = p2.find_operator_for_alias("b").unwrap();
        assert_eq!(p1.lineage_signature(f1), p2.lineage_signature(f2));
    }

    #[test]
    fn test_lineage_differs_on_literals() {
        let plan = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            OperatorNode::new(filter_gt("x", 0), "b", &["a"]),
            OperatorNode::new(filter_gt("x", 1), "c", &["a"]),
        ])
        .unwrap();
        let b = plan.find_operator_for_alias("b").unwrap();
        let c = plan.find_operator_for_alias("c").unwrap();
        assert_ne!(plan.lineage_signature(b), plan.lineage_signature(c));
    }

    #[test]
    fn test_disconnected_graph_detected() {
        let plan = DataflowPlan::new(vec![
            OperatorNode::new(load_op("f", vec![("x", PigType::Int)]), "a", &[]),
            OperatorNode::new(load_op("g", vec![("y", PigType::Int)]), "b", &[]),
        ])
        .unwrap();
        assert!(matches!(
            plan.check_connectivity(),
            Err(crate::error::PigletError::Plan(PlanError::Disconnected))
        ));
    }
}

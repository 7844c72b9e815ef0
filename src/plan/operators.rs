//! Operator variants and their per-variant contracts.
//!
//! Every variant answers three questions:
//!
//! - `construct_schema`: given the input schemas, what is the output
//!   schema (or is it unknown)?
//! - `check_conformance`: do all field references resolve? Named
//!   references require a known input schema; positional references only
//!   have to stay in range.
//! - `lineage_tag`: the `TAG%param%...%` prefix of the operator's
//!   canonical lineage string. Literal parameters (paths, predicates,
//!   constants, input mtimes) all appear here so that distinct operators
//!   hash to distinct signatures.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::expr::{ArithmeticExpr, Predicate, RefExpr};
use crate::schema::{Field, PigType, Schema, TupleType};

use super::matcher::{MatchOutput, NfaSpec, SelectionStrategy};
use super::{DataflowPlan, OperatorNode};

/// Loader or storer function with its arguments, e.g. `PigStorage(",")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSpec {
    pub name: String,
    pub params: Vec<String>,
}

impl fmt::Display for LoaderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(","))
    }
}

/// One `GENERATE` output expression with an optional declared alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorExpr {
    pub expr: ArithmeticExpr,
    /// Declared alias; its type is honored when stronger than bytearray
    pub alias: Option<Field>,
}

impl GeneratorExpr {
    pub fn plain(expr: ArithmeticExpr) -> Self {
        GeneratorExpr { expr, alias: None }
    }

    pub fn with_alias(expr: ArithmeticExpr, alias: Field) -> Self {
        GeneratorExpr {
            expr,
            alias: Some(alias),
        }
    }
}

impl fmt::Display for GeneratorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(a) => write!(f, "{} AS {}", self.expr, a),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// Body of a `FOREACH`: a flat expression list or a nested sub-plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Generator {
    List(Vec<GeneratorExpr>),
    /// Nested form: the parser supplies the raw statement list, plan
    /// assembly turns it into a sub-plan whose final statement is GENERATE
    Plan {
        ops: Vec<OperatorNode>,
        plan: Option<Box<DataflowPlan>>,
    },
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generator::List(exprs) => {
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            Generator::Plan { ops, plan } => {
                match plan {
                    Some(p) => {
                        let order = p.topological_order().unwrap_or_else(|_| p.ids());
                        for id in order {
                            if let Some(node) = p.node(id) {
                                write!(f, "{};", node.op.lineage_tag())?;
                            }
                        }
                    }
                    None => {
                        for op in ops {
                            write!(f, "{};", op.op.lineage_tag())?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Persistence mode of an inserted `Cache` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    Memory,
    MemoryAndDisk,
    DiskOnly,
}

impl CacheMode {
    pub fn name(self) -> &'static str {
        match self {
            CacheMode::Memory => "MEMORY_ONLY",
            CacheMode::MemoryAndDisk => "MEMORY_AND_DISK",
            CacheMode::DiskOnly => "DISK_ONLY",
        }
    }
}

/// Window extent, in rows or time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowUnit {
    Rows,
    Seconds,
    Minutes,
}

impl WindowUnit {
    pub fn name(self) -> &'static str {
        match self {
            WindowUnit::Rows => "rows",
            WindowUnit::Seconds => "seconds",
            WindowUnit::Minutes => "minutes",
        }
    }
}

/// `(size, unit)` pair describing a window range or slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDef {
    pub size: u64,
    pub unit: WindowUnit,
}

impl fmt::Display for WindowDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.size, self.unit.name())
    }
}

/// One `ORDER BY` key with its direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub key: RefExpr,
    pub ascending: bool,
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.key,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// The operator sum type.
///
/// Input and output pipes live on the surrounding `OperatorNode`; the
/// variants carry only their literal parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PigOperator {
    Load {
        file: PathBuf,
        declared_schema: Option<TupleType>,
        loader: Option<LoaderSpec>,
        /// File mtime captured at plan assembly when profiling is on,
        /// `-1` otherwise; part of the lineage so file edits invalidate
        /// cached materializations
        last_modified: i64,
    },
    Filter {
        predicate: Predicate,
    },
    Foreach {
        generator: Generator,
    },
    Grouping {
        /// Empty list means GROUP ALL
        keys: Vec<ArithmeticExpr>,
    },
    Join {
        /// One key list per input relation; arities must match
        keys: Vec<Vec<ArithmeticExpr>>,
    },
    Union,
    Distinct,
    OrderBy {
        specs: Vec<OrderSpec>,
    },
    Limit {
        count: u64,
    },
    SplitInto {
        /// `(output pipe, predicate)` per branch, parallel to the node's
        /// output pipe list
        branches: Vec<(String, Predicate)>,
    },
    Store {
        file: PathBuf,
        storer: Option<LoaderSpec>,
    },
    Dump,
    /// User materialization hint; rewritten away by the planner
    Materialize,
    /// Insertion-time pass-through persist hint
    Cache {
        mode: CacheMode,
    },
    Window {
        range: WindowDef,
        slide: Option<WindowDef>,
    },
    /// Fusion of a window with its downstream operator (streaming backends)
    WindowApply {
        range: WindowDef,
        slide: Option<WindowDef>,
        inner: Box<PigOperator>,
    },
    Matcher {
        nfa: NfaSpec,
        selection: SelectionStrategy,
        output: MatchOutput,
    },
    /// Final statement of a nested FOREACH sub-plan
    Generate {
        exprs: Vec<GeneratorExpr>,
    },
    /// Nested-FOREACH source resolving a bag out of the parent tuple
    ConstructBag {
        reference: RefExpr,
        /// Back-reference to the enclosing FOREACH's input schema
        parent_schema: Option<Schema>,
    },
    /// Profiling shim tagging each record with lineage and partition id
    TimingOp,
    /// Auxiliary jar registration; stripped during plan assembly
    Register {
        jar: String,
    },
}

/// Resolved input of an operator: the pipe name and its producer's schema.
#[derive(Debug, Clone)]
pub struct PipeInput {
    pub pipe: String,
    pub schema: Option<Schema>,
}

impl PigOperator {
    /// Tag used in diagnostics, template lookup and plan printing.
    pub fn name(&self) -> &'static str {
        match self {
            PigOperator::Load { .. } => "LOAD",
            PigOperator::Filter { .. } => "FILTER",
            PigOperator::Foreach { .. } => "FOREACH",
            PigOperator::Grouping { .. } => "GROUPBY",
            PigOperator::Join { .. } => "JOIN",
            PigOperator::Union => "UNION",
            PigOperator::Distinct => "DISTINCT",
            PigOperator::OrderBy { .. } => "ORDERBY",
            PigOperator::Limit { .. } => "LIMIT",
            PigOperator::SplitInto { .. } => "SPLIT",
            PigOperator::Store { .. } => "STORE",
            PigOperator::Dump => "DUMP",
            PigOperator::Materialize => "MATERIALIZE",
            PigOperator::Cache { .. } => "CACHE",
            PigOperator::Window { .. } => "WINDOW",
            PigOperator::WindowApply { .. } => "WINDOWAPPLY",
            PigOperator::Matcher { .. } => "MATCHER",
            PigOperator::Generate { .. } => "GENERATE",
            PigOperator::ConstructBag { .. } => "CONSTRUCTBAG",
            PigOperator::TimingOp => "TIMING",
            PigOperator::Register { .. } => "REGISTER",
        }
    }

    /// `TAG%param%...%` prefix of the canonical lineage string.
    pub fn lineage_tag(&self) -> String {
        match self {
            PigOperator::Load {
                file,
                loader,
                last_modified,
                ..
            } => {
                let loader_part = loader
                    .as_ref()
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                format!(
                    "LOAD%{}%{}%{}%",
                    file.display(),
                    last_modified,
                    loader_part
                )
            }
            PigOperator::Filter { predicate } => format!("FILTER%{predicate}%"),
            PigOperator::Foreach { generator } => format!("FOREACH%{generator}%"),
            PigOperator::Grouping { keys } => format!("GROUPBY%{}%", join_exprs(keys)),
            PigOperator::Join { keys } => {
                let parts: Vec<String> = keys.iter().map(|k| join_exprs(k)).collect();
                format!("JOIN%{}%", parts.join("|"))
            }
            PigOperator::Union => "UNION%".to_string(),
            PigOperator::Distinct => "DISTINCT%".to_string(),
            PigOperator::OrderBy { specs } => {
                let parts: Vec<String> = specs.iter().map(|s| s.to_string()).collect();
                format!("ORDERBY%{}%", parts.join(","))
            }
            PigOperator::Limit { count } => format!("LIMIT%{count}%"),
            PigOperator::SplitInto { branches } => {
                let parts: Vec<String> = branches
                    .iter()
                    .map(|(pipe, pred)| format!("{pipe}:{pred}"))
                    .collect();
                format!("SPLIT%{}%", parts.join("|"))
            }
            PigOperator::Store { file, storer } => {
                let storer_part = storer
                    .as_ref()
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                format!("STORE%{}%{}%", file.display(), storer_part)
            }
            PigOperator::Dump => "DUMP%".to_string(),
            PigOperator::Materialize => "MATERIALIZE%".to_string(),
            PigOperator::Cache { mode } => format!("CACHE%{}%", mode.name()),
            PigOperator::Window { range, slide } => {
                format!("WINDOW%{range}%{}%", opt_window(slide))
            }
            PigOperator::WindowApply {
                range,
                slide,
                inner,
            } => format!(
                "WINDOWAPPLY%{range}%{}%{}",
                opt_window(slide),
                inner.lineage_tag()
            ),
            PigOperator::Matcher {
                nfa,
                selection,
                output,
            } => format!("MATCHER%{nfa}%{}%{}%", selection.name(), output.name()),
            PigOperator::Generate { exprs } => {
                let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                format!("GENERATE%{}%", parts.join(","))
            }
            PigOperator::ConstructBag { reference, .. } => {
                format!("CONSTRUCTBAG%{reference}%")
            }
            PigOperator::TimingOp => "TIMING%".to_string(),
            PigOperator::Register { jar } => format!("REGISTER%{jar}%"),
        }
    }

    /// Compute the output schema from the resolved inputs.
    ///
    /// `None` means the schema is unknown downstream; later operators then
    /// accept positional references only.
    pub fn construct_schema(
        &self,
        inputs: &[PipeInput],
    ) -> Result<Option<Schema>, SchemaError> {
        match self {
            PigOperator::Load {
                declared_schema, ..
            } => Ok(declared_schema.clone().map(Schema::new)),

            // Schema pass-through operators
            PigOperator::Filter { .. }
            | PigOperator::Distinct
            | PigOperator::Limit { .. }
            | PigOperator::OrderBy { .. }
            | PigOperator::Materialize
            | PigOperator::Cache { .. }
            | PigOperator::Window { .. }
            | PigOperator::Matcher { .. }
            | PigOperator::SplitInto { .. }
            | PigOperator::TimingOp
            | PigOperator::Store { .. }
            | PigOperator::Dump => Ok(first_schema(inputs)),

            PigOperator::Union => {
                let mut known = inputs.iter().filter_map(|i| i.schema.as_ref());
                let first = match known.next() {
                    Some(s) => s,
                    None => return Ok(None),
                };
                for other in known {
                    if !first.compatible_with(other) && !other.compatible_with(first) {
                        return Err(SchemaError::IncompatibleUnion {
                            left: first.to_string(),
                            right: other.to_string(),
                        });
                    }
                }
                // Field names come from the first input
                Ok(Some(first.clone()))
            }

            PigOperator::Foreach { generator } => match generator {
                Generator::List(exprs) => {
                    generator_schema(exprs, first_schema(inputs).as_ref())
                }
                Generator::Plan { plan, .. } => Ok(plan
                    .as_ref()
                    .and_then(|p| p.sink_nodes().first().and_then(|id| p.schema_of(*id)))),
            },

            PigOperator::Generate { exprs } => {
                generator_schema(exprs, first_schema(inputs).as_ref())
            }

            PigOperator::Grouping { keys } => {
                let input = match first_schema(inputs) {
                    Some(s) => s,
                    None => return Ok(None),
                };
                let key_type = match keys.len() {
                    0 => PigType::CharArray,
                    1 => keys[0].result_type(Some(&input))?,
                    _ => {
                        let mut fields = Vec::new();
                        for (i, key) in keys.iter().enumerate() {
                            fields.push(Field::new(
                                format!("k{i}"),
                                key.result_type(Some(&input))?,
                            ));
                        }
                        PigType::Tuple(TupleType::new(fields))
                    }
                };
                let pipe_name = inputs
                    .first()
                    .map(|i| i.pipe.clone())
                    .unwrap_or_else(|| "t".to_string());
                Ok(Some(Schema::new(TupleType::new(vec![
                    Field::new("group", key_type),
                    Field::new(pipe_name, PigType::Bag(Box::new(input.element.clone()))),
                ]))))
            }

            PigOperator::Join { .. } => {
                let mut fields = Vec::new();
                for input in inputs {
                    match &input.schema {
                        Some(s) => fields.extend(s.element.fields.iter().cloned()),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Schema::new(TupleType::new(fields))))
            }

            PigOperator::WindowApply { inner, .. } => inner.construct_schema(inputs),

            PigOperator::ConstructBag {
                reference,
                parent_schema,
            } => {
                let parent = match parent_schema {
                    Some(s) => s,
                    None => return Ok(None),
                };
                let pos = reference.resolve(parent)?;
                let field = parent
                    .field_at(pos)
                    .cloned()
                    .unwrap_or_else(|| Field::new("value", PigType::ByteArray));
                Ok(Some(Schema::new(TupleType::new(vec![field]))))
            }

            PigOperator::Register { .. } => Ok(None),
        }
    }

    /// Verify field references and per-variant structural rules.
    pub fn check_conformance(&self, inputs: &[PipeInput]) -> Result<(), SchemaError> {
        let input = first_schema(inputs);
        match self {
            PigOperator::Filter { predicate } => predicate.check(input.as_ref()),

            PigOperator::Foreach { generator } => match generator {
                Generator::List(exprs) => {
                    for e in exprs {
                        e.expr.check(input.as_ref())?;
                    }
                    Ok(())
                }
                // The sub-plan was conformance-checked during its own assembly
                Generator::Plan { .. } => Ok(()),
            },

            PigOperator::Generate { exprs } => {
                for e in exprs {
                    e.expr.check(input.as_ref())?;
                }
                Ok(())
            }

            PigOperator::Grouping { keys } => {
                for key in keys {
                    key.check(input.as_ref())?;
                }
                Ok(())
            }

            PigOperator::Join { keys } => {
                if let Some(first) = keys.first() {
                    for other in &keys[1..] {
                        if other.len() != first.len() {
                            return Err(SchemaError::JoinKeyArity {
                                left: first.len(),
                                right: other.len(),
                            });
                        }
                    }
                }
                for (i, key_list) in keys.iter().enumerate() {
                    let schema = inputs.get(i).and_then(|inp| inp.schema.as_ref());
                    for key in key_list {
                        key.check(schema)?;
                    }
                }
                Ok(())
            }

            PigOperator::Union => {
                let mut known = inputs.iter().filter_map(|i| i.schema.as_ref());
                if let Some(first) = known.next() {
                    for other in known {
                        if !first.compatible_with(other) && !other.compatible_with(first) {
                            return Err(SchemaError::IncompatibleUnion {
                                left: first.to_string(),
                                right: other.to_string(),
                            });
                        }
                    }
                }
                Ok(())
            }

            PigOperator::OrderBy { specs } => {
                for spec in specs {
                    ArithmeticExpr::Ref(spec.key.clone()).check(input.as_ref())?;
                }
                Ok(())
            }

            PigOperator::SplitInto { branches } => {
                for (_, pred) in branches {
                    pred.check(input.as_ref())?;
                }
                Ok(())
            }

            PigOperator::Matcher { nfa, .. } => nfa.check(input.as_ref()),

            PigOperator::WindowApply { inner, .. } => inner.check_conformance(inputs),

            PigOperator::ConstructBag {
                reference,
                parent_schema,
            } => match parent_schema {
                Some(parent) => reference.resolve(parent).map(|_| ()),
                None => Ok(()),
            },

            _ => Ok(()),
        }
    }
}

fn first_schema(inputs: &[PipeInput]) -> Option<Schema> {
    inputs.first().and_then(|i| i.schema.clone())
}

fn join_exprs(exprs: &[ArithmeticExpr]) -> String {
    let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
    parts.join(",")
}

fn opt_window(slide: &Option<WindowDef>) -> String {
    slide.map(|w| w.to_string()).unwrap_or_default()
}

/// Output schema of a `GENERATE` expression list.
///
/// The field name comes from the declared alias, or the referenced input
/// field, or is synthesized positionally. The declared type is honored
/// when stronger than bytearray; otherwise the expression is typed
/// against the input schema.
fn generator_schema(
    exprs: &[GeneratorExpr],
    input: Option<&Schema>,
) -> Result<Option<Schema>, SchemaError> {
    let mut fields = Vec::new();
    for (idx, gen) in exprs.iter().enumerate() {
        let name = match &gen.alias {
            Some(field) if !field.name.is_empty() => field.name.clone(),
            _ => match &gen.expr {
                ArithmeticExpr::Ref(RefExpr::Named(n)) => n.clone(),
                _ => format!("f{idx}"),
            },
        };
        let ftype = match gen.alias.as_ref().map(|f| f.ftype.clone()) {
            Some(t) if t != PigType::ByteArray => t,
            _ => gen.expr.result_type(input)?,
        };
        fields.push(Field::new(name, ftype));
    }
    Ok(Some(Schema::new(TupleType::new(fields))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{CmpOp, Literal};

    fn xy_input() -> Vec<PipeInput> {
        vec![PipeInput {
            pipe: "a".to_string(),
            schema: Some(Schema::from_fields(vec![
                ("x", PigType::Int),
                ("y", PigType::Int),
            ])),
        }]
    }

    #[test]
    fn test_filter_schema_pass_through() {
        let op = PigOperator::Filter {
            predicate: Predicate::cmp(
                CmpOp::Gt,
                ArithmeticExpr::field("x"),
                ArithmeticExpr::Const(Literal::Int(0)),
            ),
        };
        let schema = op.construct_schema(&xy_input()).unwrap().unwrap();
        assert_eq!(schema.arity(), 2);
        assert!(op.check_conformance(&xy_input()).is_ok());
    }

    #[test]
    fn test_group_all_schema() {
        let op = PigOperator::Grouping { keys: vec![] };
        let schema = op.construct_schema(&xy_input()).unwrap().unwrap();
        assert_eq!(schema.field("group").unwrap().1.ftype, PigType::CharArray);
        let (_, bag) = schema.field("a").expect("bag field named after in-pipe");
        assert!(matches!(bag.ftype, PigType::Bag(_)));
    }

    #[test]
    fn test_group_by_single_key() {
        let op = PigOperator::Grouping {
            keys: vec![ArithmeticExpr::field("x")],
        };
        let schema = op.construct_schema(&xy_input()).unwrap().unwrap();
        assert_eq!(schema.field("group").unwrap().1.ftype, PigType::Int);
    }

    #[test]
    fn test_foreach_alias_overrides_name() {
        let op = PigOperator::Foreach {
            generator: Generator::List(vec![
                GeneratorExpr::with_alias(
                    ArithmeticExpr::field("x"),
                    Field::new("renamed", PigType::ByteArray),
                ),
                GeneratorExpr::plain(ArithmeticExpr::field("y")),
            ]),
        };
        let schema = op.construct_schema(&xy_input()).unwrap().unwrap();
        // bytearray alias type gets refined from the expression
        assert_eq!(schema.field("renamed").unwrap().1.ftype, PigType::Int);
        assert_eq!(schema.field("y").unwrap().1.ftype, PigType::Int);
    }

    #[test]
    fn test_join_concatenates_fields() {
        let inputs = vec![
            PipeInput {
                pipe: "a".to_string(),
                schema: Some(Schema::from_fields(vec![("x", PigType::Int)])),
            },
            PipeInput {
                pipe: "b".to_string(),
                schema: Some(Schema::from_fields(vec![("y", PigType::Long)])),
            },
        ];
        let op = PigOperator::Join {
            keys: vec![
                vec![ArithmeticExpr::field("x")],
                vec![ArithmeticExpr::field("y")],
            ],
        };
        let schema = op.construct_schema(&inputs).unwrap().unwrap();
        assert_eq!(schema.arity(), 2);
        assert!(op.check_conformance(&inputs).is_ok());
    }

    #[test]
    fn test_join_key_arity_mismatch() {
        let inputs = vec![
            PipeInput {
                pipe: "a".to_string(),
                schema: Some(Schema::from_fields(vec![("x", PigType::Int)])),
            },
            PipeInput {
                pipe: "b".to_string(),
                schema: Some(Schema::from_fields(vec![("y", PigType::Int)])),
            },
        ];
        let op = PigOperator::Join {
            keys: vec![
                vec![ArithmeticExpr::field("x")],
                vec![ArithmeticExpr::field("y"), ArithmeticExpr::field("y")],
            ],
        };
        assert!(matches!(
            op.check_conformance(&inputs),
            Err(SchemaError::JoinKeyArity { .. })
        ));
    }

    #[test]
    fn test_union_name_difference_is_fine_type_difference_is_not() {
        let op = PigOperator::Union;
        let ok = vec![
            PipeInput {
                pipe: "a".to_string(),
                schema: Some(Schema::from_fields(vec![("x", PigType::Int)])),
            },
            PipeInput {
                pipe: "b".to_string(),
                schema: Some(Schema::from_fields(vec![("other", PigType::Int)])),
            },
        ];
        assert!(op.construct_schema(&ok).is_ok());

        let bad = vec![
            PipeInput {
                pipe: "a".to_string(),
                schema: Some(Schema::from_fields(vec![("x", PigType::Int)])),
            },
            PipeInput {
                pipe: "b".to_string(),
                schema: Some(Schema::from_fields(vec![("s", PigType::CharArray)])),
            },
        ];
        assert!(matches!(
            op.construct_schema(&bad),
            Err(SchemaError::IncompatibleUnion { .. })
        ));
    }

    #[test]
    fn test_lineage_tag_carries_literals() {
        let a = PigOperator::Limit { count: 10 };
        let b = PigOperator::Limit { count: 20 };
        assert_ne!(a.lineage_tag(), b.lineage_tag());

        let load = PigOperator::Load {
            file: PathBuf::from("data.csv"),
            declared_schema: None,
            loader: None,
            last_modified: -1,
        };
        assert_eq!(load.lineage_tag(), "LOAD%data.csv%-1%%");
    }
}

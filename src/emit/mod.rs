//! Code emission: walk the final plan and render backend source.
//!
//! The emitted program is assembled in four parts: the imports header,
//! one record class per distinct schema (identical schemas share a class,
//! keyed by the hash of the schema signature), per-operator snippets in
//! topological order, and a `main` wrapper that sets up the execution
//! context, installs the performance listener when profiling is on, and
//! tears down on exit. Helper objects (`OrderHelper_*`, `CepHelper_*`)
//! are emitted once per referencing operator with names derived from the
//! operator's output pipe.

pub mod templates;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::backend::Backend;
use crate::error::{BackendError, Result};
use crate::expr::scala_type;
use crate::plan::matcher::NfaSpec;
use crate::plan::{lineage, DataflowPlan, Generator, GeneratorExpr, OpId, PigOperator, WindowDef, WindowUnit};
use crate::schema::{PigType, Schema};

pub use templates::{render, BackendTemplates};

/// Per-compilation emission settings.
#[derive(Debug, Clone, Default)]
pub struct EmitConfig {
    /// Name of the emitted object (and the job)
    pub script_name: String,
    /// Collector URL; when set, the performance listener is installed
    pub profiling_url: Option<String>,
}

/// Renders a plan into backend source text.
pub struct ScalaEmitter {
    backend: Backend,
    templates: BackendTemplates,
}

impl ScalaEmitter {
    pub fn new(backend: Backend) -> Self {
        ScalaEmitter {
            backend,
            templates: BackendTemplates::new(backend),
        }
    }

    /// Stable class name per schema: identical schemas share a class
    /// across operators.
    pub fn schema_class_name(schema: &Schema) -> String {
        let digest = lineage::signature(&schema.signature());
        format!("Record_{}", &digest[..8])
    }

    /// Render the whole program.
    pub fn emit_plan(&self, plan: &DataflowPlan, config: &EmitConfig) -> Result<String> {
        let order = plan.topological_order()?;
        let mut out = String::new();

        out.push_str(self.templates.header());
        out.push('\n');
        for jar in &plan.additional_jars {
            let _ = writeln!(out, "// requires {jar}");
        }
        if !plan.additional_jars.is_empty() {
            out.push('\n');
        }

        // One record class per distinct schema signature
        let mut classes: BTreeMap<String, Schema> = BTreeMap::new();
        for id in &order {
            if let Some(schema) = plan.schema_of(*id) {
                classes.insert(Self::schema_class_name(&schema), schema);
            }
        }
        for (name, schema) in &classes {
            out.push_str(&emit_schema_class(name, schema));
            out.push('\n');
        }

        // Helpers, once per referencing operator
        for id in &order {
            if let Some(helper) = self.emit_helper(plan, *id)? {
                out.push_str(&helper);
                out.push('\n');
            }
        }

        out.push_str(&render(
            self.templates.main_open(),
            &[("name", config.script_name.clone())],
        ));
        if let Some(url) = &config.profiling_url {
            out.push_str(&render(
                self.templates.perf_listener(),
                &[("url", url.clone())],
            ));
        }

        for id in &order {
            for line in self.emit_operator(plan, *id)? {
                let _ = writeln!(out, "    {line}");
            }
        }

        out.push_str(&render(
            self.templates.main_close(),
            &[("name", config.script_name.clone())],
        ));
        debug!(bytes = out.len(), "emission complete");
        Ok(out)
    }

    /// Helper object for operators that need one.
    fn emit_helper(&self, plan: &DataflowPlan, id: OpId) -> Result<Option<String>> {
        let Some(node) = plan.node(id) else {
            return Ok(None);
        };
        let alias = node.alias().unwrap_or("sink").to_string();
        match &node.op {
            PigOperator::OrderBy { specs } => {
                let class = self.class_or_tuple(plan, id);
                let key = order_key(specs);
                Ok(Some(format!(
                    "object OrderHelper_{alias} {{\n  def key(t: {class}) = {key}\n}}\n"
                )))
            }
            PigOperator::Matcher { nfa, selection, .. } => {
                let class = self.class_or_tuple(plan, id);
                Ok(Some(emit_cep_helper(&alias, &class, nfa, selection.name())))
            }
            _ => Ok(None),
        }
    }

    /// The operator's record class, or a plain tuple when no schema is
    /// known.
    fn class_or_tuple(&self, plan: &DataflowPlan, id: OpId) -> String {
        plan.schema_of(id)
            .map(|s| Self::schema_class_name(&s))
            .unwrap_or_else(|| "Seq[Any]".to_string())
    }

    fn input_var(&self, plan: &DataflowPlan, id: OpId, index: usize) -> String {
        plan.node(id)
            .and_then(|n| n.inputs.get(index).cloned())
            .unwrap_or_else(|| "input".to_string())
    }

    /// Render one operator's snippet lines.
    fn emit_operator(&self, plan: &DataflowPlan, id: OpId) -> Result<Vec<String>> {
        let node = plan.node(id).ok_or(BackendError::MissingTemplate {
            backend: self.backend.name().to_string(),
            operator: id.to_string(),
        })?;
        let out_pipe = node.alias().unwrap_or("sink").to_string();
        let input = self.input_var(plan, id, 0);
        let class = self.class_or_tuple(plan, id);

        let lines = match &node.op {
            PigOperator::Load { file, .. } => {
                vec![render(
                    self.templates.for_op("LOAD")?,
                    &[
                        ("out", out_pipe),
                        ("file", file.display().to_string()),
                        ("class", class),
                    ],
                )]
            }

            PigOperator::Filter { predicate } => {
                vec![render(
                    self.templates.for_op("FILTER")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("pred", predicate.render("t")),
                    ],
                )]
            }

            PigOperator::Foreach { generator } => match generator {
                Generator::List(exprs) => {
                    vec![render(
                        self.templates.for_op("FOREACH")?,
                        &[
                            ("out", out_pipe),
                            ("in", input),
                            ("class", class),
                            ("exprs", generator_args(exprs, "t", &[])),
                        ],
                    )]
                }
                Generator::Plan { plan: sub, .. } => {
                    self.emit_nested_foreach(&out_pipe, &input, &class, sub.as_deref())?
                }
            },

            PigOperator::Grouping { keys } => {
                if keys.is_empty() {
                    vec![render(
                        self.templates.for_op("GROUPALL")?,
                        &[("out", out_pipe), ("in", input), ("class", class)],
                    )]
                } else {
                    vec![render(
                        self.templates.for_op("GROUPBY")?,
                        &[
                            ("out", out_pipe),
                            ("in", input),
                            ("class", class),
                            ("key", key_expr(keys)),
                        ],
                    )]
                }
            }

            PigOperator::Join { keys } => {
                vec![self.emit_join(plan, id, &out_pipe, &class, keys)?]
            }

            PigOperator::Union => {
                let rest: String = node.inputs[1..]
                    .iter()
                    .map(|name| format!(".union({name})"))
                    .collect();
                vec![render(
                    self.templates.for_op("UNION")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("rest", rest),
                    ],
                )]
            }

            PigOperator::Distinct => {
                vec![render(
                    self.templates.for_op("DISTINCT")?,
                    &[("out", out_pipe), ("in", input)],
                )]
            }

            PigOperator::OrderBy { specs } => {
                let ascending = specs.first().map(|s| s.ascending).unwrap_or(true);
                vec![render(
                    self.templates.for_op("ORDERBY")?,
                    &[
                        ("out", out_pipe.clone()),
                        ("in", input),
                        ("key", format!("OrderHelper_{out_pipe}.key(t)")),
                        ("asc", ascending.to_string()),
                    ],
                )]
            }

            PigOperator::Limit { count } => {
                vec![render(
                    self.templates.for_op("LIMIT")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("n", count.to_string()),
                    ],
                )]
            }

            PigOperator::SplitInto { branches } => {
                let mut lines = Vec::new();
                for (branch_out, predicate) in branches {
                    lines.push(render(
                        self.templates.for_op("SPLIT")?,
                        &[
                            ("out", branch_out.clone()),
                            ("in", input.clone()),
                            ("pred", predicate.render("t")),
                        ],
                    ));
                }
                lines
            }

            PigOperator::Store { file, .. } => {
                vec![render(
                    self.templates.for_op("STORE")?,
                    &[("in", input), ("file", file.display().to_string())],
                )]
            }

            PigOperator::Dump => {
                vec![render(self.templates.for_op("DUMP")?, &[("in", input)])]
            }

            PigOperator::Cache { mode } => {
                vec![render(
                    self.templates.for_op("CACHE")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("mode", mode.name().to_string()),
                    ],
                )]
            }

            PigOperator::TimingOp => {
                // tag records with the wrapped operator's lineage
                let producer_sig = node
                    .inputs
                    .first()
                    .and_then(|name| plan.pipe(name))
                    .map(|p| plan.lineage_signature(p.producer))
                    .unwrap_or_default();
                vec![render(
                    self.templates.for_op("TIMING")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("lineage", producer_sig),
                    ],
                )]
            }

            PigOperator::Window { range, slide } => {
                vec![render(
                    self.templates.for_op("WINDOW")?,
                    &[
                        ("out", out_pipe),
                        ("in", input),
                        ("window", window_call(range, slide.as_ref(), false)),
                    ],
                )]
            }

            PigOperator::WindowApply {
                range,
                slide,
                inner,
            } => {
                vec![self.emit_window_apply(&out_pipe, &input, &class, range, slide.as_ref(), inner)?]
            }

            PigOperator::Matcher { .. } => {
                vec![render(
                    self.templates.for_op("MATCHER")?,
                    &[
                        ("out", out_pipe.clone()),
                        ("in", input),
                        ("controller", format!("CepHelper_{out_pipe}")),
                    ],
                )]
            }

            // plan-internal operators never reach emission on their own
            PigOperator::Generate { .. }
            | PigOperator::ConstructBag { .. }
            | PigOperator::Materialize
            | PigOperator::Register { .. } => Vec::new(),
        };
        Ok(lines)
    }

    /// Nested FOREACH: one map over the input tuple whose body evaluates
    /// the sub-plan's statements as locals and yields the GENERATE row.
    fn emit_nested_foreach(
        &self,
        out_pipe: &str,
        input: &str,
        class: &str,
        sub: Option<&DataflowPlan>,
    ) -> Result<Vec<String>> {
        let Some(sub) = sub else {
            return Ok(vec![format!("val {out_pipe} = {input} // empty foreach body")]);
        };
        let mut body = Vec::new();
        let mut locals: Vec<String> = Vec::new();
        for sid in sub.topological_order()? {
            let Some(snode) = sub.node(sid) else { continue };
            let alias = snode.alias().unwrap_or("row").to_string();
            let sin = snode.inputs.first().cloned().unwrap_or_default();
            match &snode.op {
                PigOperator::ConstructBag { reference, .. } => {
                    body.push(format!("val {alias} = t.{reference}.toSeq"));
                    locals.push(alias);
                }
                PigOperator::Distinct => {
                    body.push(format!("val {alias} = {sin}.distinct"));
                    locals.push(alias);
                }
                PigOperator::Filter { predicate } => {
                    body.push(format!(
                        "val {alias} = {sin}.filter(u => {})",
                        predicate.render("u")
                    ));
                    locals.push(alias);
                }
                PigOperator::Limit { count } => {
                    body.push(format!("val {alias} = {sin}.take({count})"));
                    locals.push(alias);
                }
                PigOperator::OrderBy { specs } => {
                    body.push(format!(
                        "val {alias} = {sin}.sortBy(u => {})",
                        order_key(specs).replace("t.", "u.")
                    ));
                    locals.push(alias);
                }
                PigOperator::Generate { exprs } => {
                    body.push(format!("{class}({})", generator_args(exprs, "t", &locals)));
                }
                _ => {}
            }
        }
        let mut lines = vec![format!("val {out_pipe} = {input}.map(t => {{")];
        for stmt in body {
            lines.push(format!("  {stmt}"));
        }
        lines.push("})".to_string());
        Ok(lines)
    }

    /// JOIN: key every input, chain the pairwise joins, flatten the
    /// nested pair pattern into the concatenated record class.
    fn emit_join(
        &self,
        plan: &DataflowPlan,
        id: OpId,
        out_pipe: &str,
        class: &str,
        keys: &[Vec<crate::expr::ArithmeticExpr>],
    ) -> Result<String> {
        let node = plan.node(id).ok_or(BackendError::MissingTemplate {
            backend: self.backend.name().to_string(),
            operator: id.to_string(),
        })?;
        let inputs = &node.inputs;

        let mut keyed = String::new();
        for (i, name) in inputs.iter().enumerate() {
            let key = keys
                .get(i)
                .map(|k| key_expr(k))
                .unwrap_or_else(|| "t".to_string());
            if i == 0 {
                let _ = write!(keyed, "{name}.keyBy(t => {key})");
            } else {
                let _ = write!(keyed, ".join({name}.keyBy(t => {key}))");
            }
        }

        // pattern ((t1, t2), t3) ... for the chained join result
        let mut pattern = "t1".to_string();
        for i in 1..inputs.len() {
            pattern = format!("({pattern}, t{})", i + 1);
        }

        // flatten every input's fields in argument order
        let mut flat = Vec::new();
        for (i, name) in inputs.iter().enumerate() {
            let schema = plan
                .pipe(name)
                .and_then(|p| plan.node(p.producer))
                .and_then(|n| n.schema.clone());
            match schema {
                Some(s) => {
                    for field in &s.element.fields {
                        flat.push(format!("t{}.{}", i + 1, field.name));
                    }
                }
                None => flat.push(format!("t{}", i + 1)),
            }
        }

        Ok(render(
            self.templates.for_op("JOIN")?,
            &[
                ("out", out_pipe.to_string()),
                ("keyed", keyed),
                ("fields", pattern),
                ("flat", flat.join(", ")),
                ("class", class.to_string()),
            ],
        ))
    }

    fn emit_window_apply(
        &self,
        out_pipe: &str,
        input: &str,
        class: &str,
        range: &WindowDef,
        slide: Option<&WindowDef>,
        inner: &PigOperator,
    ) -> Result<String> {
        let keyed = matches!(inner, PigOperator::Grouping { keys } if !keys.is_empty());
        let window = window_call(range, slide, keyed);
        match inner {
            PigOperator::Grouping { keys } if !keys.is_empty() => Ok(format!(
                "val {out_pipe} = {input}.keyBy(t => {key}){window}.apply((key, win, it, coll: Collector[{class}]) => coll.collect({class}(key, it)))",
                key = key_expr(keys),
            )),
            PigOperator::Grouping { .. } => Ok(format!(
                "val {out_pipe} = {input}{window}.apply((win, it, coll: Collector[{class}]) => coll.collect({class}(\"all\", it)))"
            )),
            PigOperator::Distinct => Ok(format!(
                "val {out_pipe} = {input}{window}.apply((win, it, coll: Collector[{class}]) => it.toSeq.distinct.foreach(coll.collect))"
            )),
            PigOperator::OrderBy { specs } => Ok(format!(
                "val {out_pipe} = {input}{window}.apply((win, it, coll: Collector[{class}]) => it.toSeq.sortBy(t => {key}).foreach(coll.collect))",
                key = order_key(specs),
            )),
            PigOperator::Foreach {
                generator: Generator::List(exprs),
            } => Ok(format!(
                "val {out_pipe} = {input}{window}.apply((win, it, coll: Collector[{class}]) => it.foreach(t => coll.collect({class}({args}))))",
                args = generator_args(exprs, "t", &[]),
            )),
            other => Err(BackendError::MissingTemplate {
                backend: self.backend.name().to_string(),
                operator: format!("WINDOWAPPLY/{}", other.name()),
            }
            .into()),
        }
    }
}

/// `case class` plus a `fromLine` companion for one schema.
fn emit_schema_class(name: &str, schema: &Schema) -> String {
    let mut fields = Vec::new();
    let mut parsers = Vec::new();
    for (i, field) in schema.element.fields.iter().enumerate() {
        let fname = if schema
            .element
            .fields
            .iter()
            .take(i)
            .any(|f| f.name == field.name)
        {
            format!("{}_{i}", field.name)
        } else {
            field.name.clone()
        };
        fields.push(format!("{fname}: {}", scala_type(&field.ftype)));
        parsers.push(match field.ftype {
            PigType::Int => format!("f({i}).trim.toInt"),
            PigType::Long => format!("f({i}).trim.toLong"),
            PigType::Float => format!("f({i}).trim.toFloat"),
            PigType::Double => format!("f({i}).trim.toDouble"),
            PigType::Boolean => format!("f({i}).trim.toBoolean"),
            _ => format!("f({i})"),
        });
    }
    format!(
        "case class {name}({})\n\
         object {name} {{\n\
         \x20 def fromLine(line: String): {name} = {{\n\
         \x20   val f = line.split(\",\")\n\
         \x20   {name}({})\n\
         \x20 }}\n\
         }}\n",
        fields.join(", "),
        parsers.join(", ")
    )
}

/// Controller object plus predicate closures for a MATCHER.
fn emit_cep_helper(alias: &str, class: &str, nfa: &NfaSpec, selection: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "object CepHelper_{alias} {{");
    let _ = writeln!(
        out,
        "  val predicates: Map[String, {class} => Boolean] = Map("
    );
    for pred in &nfa.predicates {
        let _ = writeln!(
            out,
            "    \"{}\" -> ((t: {class}) => {}),",
            pred.name,
            pred.predicate.render("t")
        );
    }
    let _ = writeln!(out, "  )");
    let _ = writeln!(out, "  val transitions = List(");
    for t in &nfa.transitions {
        let _ = writeln!(out, "    (\"{}\", \"{}\", \"{}\"),", t.from, t.predicate, t.to);
    }
    let _ = writeln!(out, "  )");
    let start = nfa
        .start_state()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "start".to_string());
    let finals: Vec<String> = nfa
        .final_states()
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect();
    let _ = writeln!(out, "  val startState = \"{start}\"");
    let _ = writeln!(out, "  val finalStates = Set({})", finals.join(", "));
    let _ = writeln!(out, "  val selection = \"{selection}\"");
    let _ = writeln!(
        out,
        "  def run(it: Iterator[{class}]): Iterator[{class}] = {{\n\
         \x20   var state = startState\n\
         \x20   it.filter {{ t =>\n\
         \x20     transitions.find(tr => tr._1 == state && predicates(tr._2)(t)) match {{\n\
         \x20       case Some(tr) => state = tr._3; finalStates.contains(state)\n\
         \x20       case None => selection == \"strict\" && {{ state = startState; false }}\n\
         \x20     }}\n\
         \x20   }}\n\
         \x20 }}\n\
         \x20 def advance(t: {class}): Iterator[{class}] = run(Iterator(t))\n\
         }}"
    );
    out
}

/// Key expression of a GROUP BY / JOIN key list.
fn key_expr(keys: &[crate::expr::ArithmeticExpr]) -> String {
    match keys.len() {
        1 => keys[0].render("t"),
        _ => {
            let parts: Vec<String> = keys.iter().map(|k| k.render("t")).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Key expression of an ORDER BY spec list.
fn order_key(specs: &[crate::plan::OrderSpec]) -> String {
    let exprs: Vec<crate::expr::ArithmeticExpr> = specs
        .iter()
        .map(|s| crate::expr::ArithmeticExpr::Ref(s.key.clone()))
        .collect();
    key_expr(&exprs)
}

/// GENERATE argument list. Named references matching a nested-plan local
/// stay bare; everything else resolves against the input tuple `var`.
fn generator_args(exprs: &[GeneratorExpr], var: &str, locals: &[String]) -> String {
    let rendered: Vec<String> = exprs
        .iter()
        .map(|g| {
            let code = g.expr.render(var);
            if let crate::expr::ArithmeticExpr::Ref(crate::expr::RefExpr::Named(n)) = &g.expr {
                if locals.contains(n) {
                    return n.clone();
                }
            }
            code
        })
        .collect();
    rendered.join(", ")
}

/// The window invocation chain of a flink streaming window.
fn window_call(range: &WindowDef, slide: Option<&WindowDef>, keyed: bool) -> String {
    let all = if keyed { "" } else { "All" };
    let time_unit = |w: &WindowDef| match w.unit {
        WindowUnit::Seconds => format!("Time.seconds({})", w.size),
        WindowUnit::Minutes => format!("Time.minutes({})", w.size),
        WindowUnit::Rows => format!("{}", w.size),
    };
    match (range.unit, slide) {
        (WindowUnit::Rows, None) => format!(".countWindow{all}({})", range.size),
        (WindowUnit::Rows, Some(s)) => format!(".countWindow{all}({}, {})", range.size, s.size),
        (_, None) => format!(".timeWindow{all}({})", time_unit(range)),
        (_, Some(s)) => format!(".timeWindow{all}({}, {})", time_unit(range), time_unit(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ArithmeticExpr, CmpOp, Literal, Predicate};
    use crate::plan::{OperatorNode, PigOperator};
    use crate::schema::{Field, TupleType};
    use std::path::PathBuf;

    fn sample_plan() -> DataflowPlan {
        DataflowPlan::new(vec![
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
        ])
        .unwrap()
    }

    #[test]
    fn test_identical_schemas_share_a_class() {
        let a = Schema::from_fields(vec![("x", PigType::Int), ("y", PigType::Int)]);
        let b = Schema::from_fields(vec![("u", PigType::Int), ("v", PigType::Int)]);
        assert_eq!(
            ScalaEmitter::schema_class_name(&a),
            ScalaEmitter::schema_class_name(&b)
        );
    }

    #[test]
    fn test_emit_simple_spark_program() {
        let emitter = ScalaEmitter::new(Backend::Spark);
        let code = emitter
            .emit_plan(
                &sample_plan(),
                &EmitConfig {
                    script_name: "job".to_string(),
                    profiling_url: None,
                },
            )
            .unwrap();
        assert!(code.contains("import org.apache.spark.SparkContext"));
        assert!(code.contains("case class Record_"));
        assert!(code.contains("val a = sc.textFile(\"data.csv\")"));
        assert!(code.contains("val b = a.filter(t => t.x > 0)"));
        assert!(code.contains("b.saveAsTextFile(\"out\")"));
        assert!(code.contains("object job {"));
        assert!(code.contains("sc.stop()"));
        // one class declaration despite three operators sharing a schema
        assert_eq!(code.matches("case class Record_").count(), 1);
    }

    #[test]
    fn test_profiling_installs_listener() {
        let emitter = ScalaEmitter::new(Backend::Spark);
        let code = emitter
            .emit_plan(
                &sample_plan(),
                &EmitConfig {
                    script_name: "job".to_string(),
                    profiling_url: Some("http://localhost:8080".to_string()),
                },
            )
            .unwrap();
        assert!(code.contains("new PerfMonitor(\"http://localhost:8080\")"));
    }

    #[test]
    fn test_window_on_spark_is_missing_template() {
        let mut ops = vec![
            OperatorNode::new(
                PigOperator::Load {
                    file: PathBuf::from("s"),
                    declared_schema: None,
                    loader: None,
                    last_modified: -1,
                },
                "a",
                &[],
            ),
            OperatorNode::new(
                PigOperator::Window {
                    range: WindowDef {
                        size: 5,
                        unit: WindowUnit::Seconds,
                    },
                    slide: None,
                },
                "w",
                &["a"],
            ),
        ];
        ops.push(OperatorNode::new(PigOperator::Dump, "", &["w"]));
        let plan = DataflowPlan::new(ops).unwrap();
        let emitter = ScalaEmitter::new(Backend::Spark);
        let result = emitter.emit_plan(
            &plan,
            &EmitConfig {
                script_name: "job".to_string(),
                profiling_url: None,
            },
        );
        assert!(result.is_err());
    }
}

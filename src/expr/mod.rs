//! Expression trees for predicates, generators and grouping keys.
//!
//! Expressions appear inside `FILTER`, `FOREACH ... GENERATE`, `GROUP BY`,
//! `JOIN ... BY` and `SPLIT`. Every node knows how to
//!
//! - type itself against an input schema (`result_type`),
//! - verify its field references (`check`): named references require a
//!   known schema, positional references only need to stay in range,
//! - print a canonical form (`Display`) that feeds lineage strings, and
//! - render itself as target-language source (`render`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{PigType, Schema};

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    CharArray(String),
    Boolean(bool),
}

impl Literal {
    pub fn ptype(&self) -> PigType {
        match self {
            Literal::Int(_) => PigType::Int,
            Literal::Long(_) => PigType::Long,
            Literal::Float(_) => PigType::Float,
            Literal::Double(_) => PigType::Double,
            Literal::CharArray(_) => PigType::CharArray,
            Literal::Boolean(_) => PigType::Boolean,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::Float(v) => write!(f, "{v}f"),
            Literal::Double(v) => write!(f, "{v}"),
            Literal::CharArray(s) => write!(f, "\"{s}\""),
            Literal::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Reference to a field of the input tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefExpr {
    /// Reference by field name, e.g. `x`
    Named(String),
    /// Reference by position, e.g. `$0`
    Positional(usize),
    /// Reference into a nested tuple, e.g. `t.x` inside a nested FOREACH
    DerefTuple {
        tuple: Box<RefExpr>,
        field: Box<RefExpr>,
    },
}

impl RefExpr {
    pub fn named(name: impl Into<String>) -> Self {
        RefExpr::Named(name.into())
    }

    /// Resolve the referenced position against a schema.
    pub fn resolve(&self, schema: &Schema) -> Result<usize, SchemaError> {
        match self {
            RefExpr::Named(name) => schema
                .field(name)
                .map(|(pos, _)| pos)
                .ok_or_else(|| SchemaError::UnresolvedField {
                    field: name.clone(),
                    schema: schema.to_string(),
                }),
            RefExpr::Positional(pos) => {
                if *pos < schema.arity() {
                    Ok(*pos)
                } else {
                    Err(SchemaError::PositionOutOfRange {
                        position: *pos,
                        schema: schema.to_string(),
                    })
                }
            }
            RefExpr::DerefTuple { tuple, .. } => tuple.resolve(schema),
        }
    }

    fn check(&self, schema: Option<&Schema>) -> Result<(), SchemaError> {
        match (self, schema) {
            (_, Some(s)) => self.resolve(s).map(|_| ()),
            (RefExpr::Positional(_), None) => Ok(()),
            (RefExpr::Named(name), None) => Err(SchemaError::NamedFieldWithoutSchema {
                field: name.clone(),
            }),
            (RefExpr::DerefTuple { tuple, .. }, None) => tuple.check(None),
        }
    }
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefExpr::Named(name) => write!(f, "{name}"),
            RefExpr::Positional(pos) => write!(f, "${pos}"),
            RefExpr::DerefTuple { tuple, field } => write!(f, "{tuple}.{field}"),
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Leq => "<=",
            CmpOp::Gt => ">",
            CmpOp::Geq => ">=",
        }
    }
}

/// Value-producing expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArithmeticExpr {
    Ref(RefExpr),
    Const(Literal),
    Binary {
        op: ArithOp,
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    /// Call into a user or builtin function, e.g. `COUNT(x)`
    Func {
        name: String,
        args: Vec<ArithmeticExpr>,
    },
    /// Explicit cast, e.g. `(int) $0`
    Cast {
        to: PigType,
        expr: Box<ArithmeticExpr>,
    },
}

impl ArithmeticExpr {
    pub fn field(name: impl Into<String>) -> Self {
        ArithmeticExpr::Ref(RefExpr::named(name))
    }

    pub fn pos(position: usize) -> Self {
        ArithmeticExpr::Ref(RefExpr::Positional(position))
    }

    /// Result type of the expression against an input schema.
    ///
    /// When the schema is unknown, references type as `bytearray` (the
    /// under-typed bottom) and the rest is computed structurally.
    pub fn result_type(&self, schema: Option<&Schema>) -> Result<PigType, SchemaError> {
        match self {
            ArithmeticExpr::Ref(r) => match schema {
                Some(s) => {
                    let pos = r.resolve(s)?;
                    Ok(s.field_at(pos)
                        .map(|f| f.ftype.clone())
                        .unwrap_or(PigType::ByteArray))
                }
                None => Ok(PigType::ByteArray),
            },
            ArithmeticExpr::Const(lit) => Ok(lit.ptype()),
            ArithmeticExpr::Binary { left, right, .. } => {
                let lt = left.result_type(schema)?;
                let rt = right.result_type(schema)?;
                lt.promote(&rt).ok_or(SchemaError::TypeMismatch {
                    left: lt.to_string(),
                    right: rt.to_string(),
                })
            }
            // Function results are opaque until the backend evaluates them
            ArithmeticExpr::Func { .. } => Ok(PigType::ByteArray),
            ArithmeticExpr::Cast { to, .. } => Ok(to.clone()),
        }
    }

    /// Verify all field references.
    pub fn check(&self, schema: Option<&Schema>) -> Result<(), SchemaError> {
        match self {
            ArithmeticExpr::Ref(r) => r.check(schema),
            ArithmeticExpr::Const(_) => Ok(()),
            ArithmeticExpr::Binary { left, right, .. } => {
                left.check(schema)?;
                right.check(schema)
            }
            ArithmeticExpr::Func { args, .. } => {
                for arg in args {
                    arg.check(schema)?;
                }
                Ok(())
            }
            ArithmeticExpr::Cast { expr, .. } => expr.check(schema),
        }
    }

    /// Collect the names of all named fields referenced by this expression.
    pub fn referenced_fields(&self, out: &mut Vec<String>) {
        match self {
            ArithmeticExpr::Ref(RefExpr::Named(name)) => out.push(name.clone()),
            ArithmeticExpr::Ref(RefExpr::DerefTuple { tuple, .. }) => {
                if let RefExpr::Named(name) = tuple.as_ref() {
                    out.push(name.clone());
                }
            }
            ArithmeticExpr::Ref(RefExpr::Positional(_)) | ArithmeticExpr::Const(_) => {}
            ArithmeticExpr::Binary { left, right, .. } => {
                left.referenced_fields(out);
                right.referenced_fields(out);
            }
            ArithmeticExpr::Func { args, .. } => {
                for arg in args {
                    arg.referenced_fields(out);
                }
            }
            ArithmeticExpr::Cast { expr, .. } => expr.referenced_fields(out),
        }
    }

    /// Render as target-language source with `var` naming the input tuple.
    /// Named fields become `var.name`, positional fields `var._<n>`.
    pub fn render(&self, var: &str) -> String {
        match self {
            ArithmeticExpr::Ref(RefExpr::Named(name)) => format!("{var}.{name}"),
            ArithmeticExpr::Ref(RefExpr::Positional(pos)) => format!("{var}._{}", pos + 1),
            ArithmeticExpr::Ref(RefExpr::DerefTuple { tuple, field }) => {
                let base = ArithmeticExpr::Ref(tuple.as_ref().clone()).render(var);
                match field.as_ref() {
                    RefExpr::Named(name) => format!("{base}.{name}"),
                    RefExpr::Positional(pos) => format!("{base}._{}", pos + 1),
                    other => format!("{base}.{other}"),
                }
            }
            ArithmeticExpr::Const(lit) => lit.to_string(),
            ArithmeticExpr::Binary { op, left, right } => {
                format!("({} {} {})", left.render(var), op.symbol(), right.render(var))
            }
            ArithmeticExpr::Func { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.render(var)).collect();
                format!("{}({})", name, rendered.join(", "))
            }
            ArithmeticExpr::Cast { to, expr } => {
                format!("{}.asInstanceOf[{}]", expr.render(var), scala_type(to))
            }
        }
    }
}

impl fmt::Display for ArithmeticExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticExpr::Ref(r) => write!(f, "{r}"),
            ArithmeticExpr::Const(lit) => write!(f, "{lit}"),
            ArithmeticExpr::Binary { op, left, right } => {
                write!(f, "{left}{}{right}", op.symbol())
            }
            ArithmeticExpr::Func { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ArithmeticExpr::Cast { to, expr } => write!(f, "({to}){expr}"),
        }
    }
}

/// Boolean predicate over one input tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Cmp {
        op: CmpOp,
        left: ArithmeticExpr,
        right: ArithmeticExpr,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// A bare expression that must evaluate to boolean (e.g. a UDF call)
    Expr(ArithmeticExpr),
}

impl Predicate {
    /// `left op right` shorthand.
    pub fn cmp(op: CmpOp, left: ArithmeticExpr, right: ArithmeticExpr) -> Self {
        Predicate::Cmp { op, left, right }
    }

    /// Conjunction of two predicates (the filter-merge rule builds these).
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Verify field references and comparison operand compatibility.
    pub fn check(&self, schema: Option<&Schema>) -> Result<(), SchemaError> {
        match self {
            Predicate::Cmp { left, right, .. } => {
                left.check(schema)?;
                right.check(schema)?;
                let lt = left.result_type(schema)?;
                let rt = right.result_type(schema)?;
                if lt.compatible_with(&rt) || rt.compatible_with(&lt) {
                    Ok(())
                } else {
                    Err(SchemaError::TypeMismatch {
                        left: lt.to_string(),
                        right: rt.to_string(),
                    })
                }
            }
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.check(schema)?;
                b.check(schema)
            }
            Predicate::Not(p) => p.check(schema),
            Predicate::Expr(e) => e.check(schema),
        }
    }

    /// Names of all named fields the predicate touches.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<String>) {
        match self {
            Predicate::Cmp { left, right, .. } => {
                left.referenced_fields(out);
                right.referenced_fields(out);
            }
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
            Predicate::Not(p) => p.collect_fields(out),
            Predicate::Expr(e) => e.referenced_fields(out),
        }
    }

    /// Render as target-language source with `var` naming the input tuple.
    pub fn render(&self, var: &str) -> String {
        match self {
            Predicate::Cmp { op, left, right } => {
                format!("{} {} {}", left.render(var), op.symbol(), right.render(var))
            }
            Predicate::And(a, b) => format!("({} && {})", a.render(var), b.render(var)),
            Predicate::Or(a, b) => format!("({} || {})", a.render(var), b.render(var)),
            Predicate::Not(p) => format!("!({})", p.render(var)),
            Predicate::Expr(e) => e.render(var),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Cmp { op, left, right } => write!(f, "{left}{}{right}", op.symbol()),
            Predicate::And(a, b) => write!(f, "({a} AND {b})"),
            Predicate::Or(a, b) => write!(f, "({a} OR {b})"),
            Predicate::Not(p) => write!(f, "NOT({p})"),
            Predicate::Expr(e) => write!(f, "{e}"),
        }
    }
}

/// Map a field type onto the emitted Scala type.
pub fn scala_type(t: &PigType) -> String {
    match t {
        PigType::ByteArray => "Any".to_string(),
        PigType::Boolean => "Boolean".to_string(),
        PigType::Int => "Int".to_string(),
        PigType::Long => "Long".to_string(),
        PigType::Float => "Float".to_string(),
        PigType::Double => "Double".to_string(),
        PigType::CharArray => "String".to_string(),
        PigType::Tuple(t) => {
            let inner: Vec<String> = t.fields.iter().map(|f| scala_type(&f.ftype)).collect();
            format!("({})", inner.join(", "))
        }
        PigType::Bag(t) => {
            let inner: Vec<String> = t.fields.iter().map(|f| scala_type(&f.ftype)).collect();
            format!("Iterable[({})]", inner.join(", "))
        }
        PigType::Map(v) => format!("Map[String, {}]", scala_type(v)),
    }
}

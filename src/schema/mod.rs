//! Schema and type model for dataflow plans.
//!
//! A relation's schema is a bag of tuples: `Schema` wraps a `TupleType`,
//! which is an ordered list of named, typed fields. Scalar types form a
//! widening lattice:
//!
//! ```text
//! Int < Long < Float < Double
//! ```
//!
//! with `ByteArray` as the under-typed bottom (it is promoted to whatever
//! type is first observed for the field) and `CharArray` / `Boolean` as
//! separate chains. `Tuple`, `Bag` and `Map` are structural composites:
//! compatibility recurses field-by-field, where field *order* matters but
//! field *names* do not. Names matter only for named-field lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The scalar and composite types a field can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PigType {
    /// Untyped raw bytes; promoted on first observation
    ByteArray,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    CharArray,
    /// Nested tuple
    Tuple(TupleType),
    /// Bag of tuples
    Bag(Box<TupleType>),
    /// Map from chararray keys to a uniform value type
    Map(Box<PigType>),
}

impl PigType {
    /// Position in the numeric widening chain, or `None` for non-numerics.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            PigType::Int => Some(0),
            PigType::Long => Some(1),
            PigType::Float => Some(2),
            PigType::Double => Some(3),
            _ => None,
        }
    }

    /// True if `self` is a member of the Int..Double chain.
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// True if a value of `self` can be used where `other` is expected,
    /// reaching `other` by widening. ByteArray widens to anything.
    /// Composites are structural: field order matters, names do not.
    pub fn compatible_with(&self, other: &PigType) -> bool {
        match (self, other) {
            (PigType::ByteArray, _) | (_, PigType::ByteArray) => true,
            (PigType::Tuple(a), PigType::Tuple(b)) => a.compatible_with(b),
            (PigType::Bag(a), PigType::Bag(b)) => a.compatible_with(b),
            (PigType::Map(a), PigType::Map(b)) => a.compatible_with(b),
            (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(ra), Some(rb)) => ra <= rb,
                _ => a == b,
            },
        }
    }

    /// Least common supertype of two types, if one exists.
    pub fn promote(&self, other: &PigType) -> Option<PigType> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (PigType::ByteArray, t) | (t, PigType::ByteArray) => Some(t.clone()),
            (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(ra), Some(rb)) => Some(if ra >= rb { a.clone() } else { b.clone() }),
                _ => None,
            },
        }
    }

    /// Short type name used in lineage strings and diagnostics.
    pub fn name(&self) -> String {
        match self {
            PigType::ByteArray => "bytearray".to_string(),
            PigType::Boolean => "boolean".to_string(),
            PigType::Int => "int".to_string(),
            PigType::Long => "long".to_string(),
            PigType::Float => "float".to_string(),
            PigType::Double => "double".to_string(),
            PigType::CharArray => "chararray".to_string(),
            PigType::Tuple(t) => format!("tuple{t}"),
            PigType::Bag(t) => format!("bag{{{t}}}"),
            PigType::Map(v) => format!("map[{}]", v.name()),
        }
    }
}

impl fmt::Display for PigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ftype: PigType,
}

impl Field {
    pub fn new(name: impl Into<String>, ftype: PigType) -> Self {
        Field {
            name: name.into(),
            ftype,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ftype)
    }
}

/// Ordered list of fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TupleType {
    pub fields: Vec<Field>,
}

impl TupleType {
    pub fn new(fields: Vec<Field>) -> Self {
        TupleType { fields }
    }

    /// Find a field by name; returns its position and the field.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
    }

    /// Field at a position.
    pub fn field_at(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Structural compatibility: same arity, pairwise widening. Field
    /// names are ignored.
    pub fn compatible_with(&self, other: &TupleType) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.ftype.compatible_with(&b.ftype))
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ")")
    }
}

/// Schema of a pipe: a bag of tuples.
///
/// Two schemas with identical structure produce the same `signature`,
/// which the emitter uses so that identical schemas share one generated
/// record class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub element: TupleType,
}

impl Schema {
    pub fn new(element: TupleType) -> Self {
        Schema { element }
    }

    /// Build a schema from `(name, type)` pairs.
    pub fn from_fields(fields: Vec<(&str, PigType)>) -> Self {
        Schema {
            element: TupleType::new(fields.into_iter().map(|(n, t)| Field::new(n, t)).collect()),
        }
    }

    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.element.field(name)
    }

    pub fn field_at(&self, position: usize) -> Option<&Field> {
        self.element.field_at(position)
    }

    pub fn arity(&self) -> usize {
        self.element.arity()
    }

    pub fn compatible_with(&self, other: &Schema) -> bool {
        self.element.compatible_with(&other.element)
    }

    /// Canonical structural description; key for generated class sharing.
    pub fn signature(&self) -> String {
        let mut sig = String::from("bag{(");
        for (i, field) in self.element.fields.iter().enumerate() {
            if i > 0 {
                sig.push(',');
            }
            sig.push_str(&field.ftype.name());
        }
        sig.push_str(")}");
        sig
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bag{{{}}}", self.element)
    }
}

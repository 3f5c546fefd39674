//! The boxed runtime value every statement produces and every verb consumes.
//!
//! One tagged sum type with a `tag()` accessor used by verb dispatch for
//! type-checking, and a `Display` impl used by tracing and the `Remember`
//! serializer. Seven tags: `VECTOR`, `SCALAR`, `NUMERIC`, `MEASURED`,
//! `STRING`, `MACRO`, `THEORY`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Macro;
use crate::theory::TheoryDescriptor;
use crate::vector::Vector;

/// Where a value came from: the statement that produced it, so `Remember`
/// can re-emit `@name subject verb object` verbatim, and `Describe` can
/// annotate a copy without losing the original.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// The declaration name (`@result`) the value is bound to, if any.
    pub declaration: Option<String>,
    /// The verb that produced this value (`""` for a bare literal/auto-concept).
    pub verb: String,
    /// Source text of the producing statement's subject operand.
    pub subject_text: Option<String>,
    /// Source text of the producing statement's object operand.
    pub object_text: Option<String>,
    /// Source line the producing statement appeared on, for trace/error context.
    pub line: usize,
    /// Human-readable notes appended by `Describe`; empty until described.
    pub notes: Vec<String>,
}

impl Origin {
    #[must_use]
    pub fn new(declaration: Option<String>, verb: impl Into<String>, line: usize) -> Self {
        Self {
            declaration,
            verb: verb.into(),
            subject_text: None,
            object_text: None,
            line,
            notes: Vec::new(),
        }
    }

    /// Records the statement's operand text, so `Remember` can find a
    /// `(subject, verb, object)` triple to re-emit instead of falling back
    /// to an `Identity` statement.
    #[must_use]
    pub fn with_statement(mut self, subject_text: impl Into<String>, object_text: impl Into<String>) -> Self {
        self.subject_text = Some(subject_text.into());
        self.object_text = Some(object_text.into());
        self
    }

    /// Returns an annotated copy carrying an extra describe note. Does not
    /// mutate `self` — callers hold the original until they swap it in.
    #[must_use]
    pub fn annotated(&self, note: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.notes.push(note.into());
        copy
    }
}

/// A `VECTOR` value: a point in the conceptual space plus any named
/// numeric properties attached via `ProjectNumeric` bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorValue {
    pub vector: Vector,
    pub origin: Origin,
}

impl VectorValue {
    #[must_use]
    pub fn new(vector: Vector, origin: Origin) -> Self {
        Self { vector, origin }
    }
}

/// A `SCALAR` value: the default runtime type for a bare numeric literal —
/// an unboxed `f64`, distinct from a `NUMERIC` explicitly produced by
/// `HasNumericValue`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarValue {
    pub value: f64,
    pub origin: Origin,
}

impl ScalarValue {
    #[must_use]
    pub fn new(value: f64, origin: Origin) -> Self {
        Self { value, origin }
    }
}

/// A `NUMERIC` value: a scalar magnitude boxed via `HasNumericValue`, with
/// an optional unit attached via `AttachUnit`. Units are free-form strings,
/// not a fixed basis — `compose_mul`/`compose_div` in `numeric.rs` handle
/// known compositions and synthesize a name for unknown ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    pub magnitude: f64,
    pub unit: Option<String>,
    pub origin: Origin,
}

impl NumericValue {
    #[must_use]
    pub fn new(magnitude: f64, unit: Option<String>, origin: Origin) -> Self {
        Self { magnitude, unit, origin }
    }
}

/// What `AttachToConcept` bound a `NUMERIC` quantity to: a fresh `VECTOR`
/// or a bare name resolved later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConceptRef {
    Vector(Vector),
    Name(String),
}

/// A `MEASURED` value: a `NUMERIC` magnitude/unit pair attached to a
/// concept via `AttachToConcept`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasuredValue {
    pub magnitude: f64,
    pub unit: Option<String>,
    pub concept: Option<ConceptRef>,
    pub origin: Origin,
}

impl MeasuredValue {
    #[must_use]
    pub fn new(magnitude: f64, unit: Option<String>, concept: Option<ConceptRef>, origin: Origin) -> Self {
        Self { magnitude, unit, concept, origin }
    }
}

/// A `STRING` value: free text — unit symbols, persisted names, and other
/// name-like operand positions that resolve without minting a concept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StringValue {
    pub text: String,
    pub origin: Origin,
}

impl StringValue {
    #[must_use]
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self { text: text.into(), origin }
    }
}

/// A `MACRO` value: a user-defined verb's parsed body, carried as a value
/// so a macro declaration can be looked up and re-bound like anything else
/// in scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroValue {
    pub ast: Macro,
    pub origin: Origin,
}

impl MacroValue {
    #[must_use]
    pub fn new(ast: Macro, origin: Origin) -> Self {
        Self { ast, origin }
    }
}

/// A `THEORY` value: a reference to a loaded, saved, branched, or merged
/// theory's descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TheoryValue {
    pub descriptor: TheoryDescriptor,
    pub origin: Origin,
}

impl TheoryValue {
    #[must_use]
    pub fn new(descriptor: TheoryDescriptor, origin: Origin) -> Self {
        Self { descriptor, origin }
    }
}

/// The engine's runtime value type. Every declaration in a session's
/// namespace is a `Value`; every verb is a function from operand `Value`s
/// to a result `Value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Vector(VectorValue),
    Scalar(ScalarValue),
    Numeric(NumericValue),
    Measured(MeasuredValue),
    String(StringValue),
    Macro(MacroValue),
    Theory(TheoryValue),
}

impl Value {
    /// The type tag used in `SpockError::Type` diagnostics and verb
    /// signature checks.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Vector(_) => "VECTOR",
            Self::Scalar(_) => "SCALAR",
            Self::Numeric(_) => "NUMERIC",
            Self::Measured(_) => "MEASURED",
            Self::String(_) => "STRING",
            Self::Macro(_) => "MACRO",
            Self::Theory(_) => "THEORY",
        }
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        match self {
            Self::Vector(v) => &v.origin,
            Self::Scalar(s) => &s.origin,
            Self::Numeric(n) => &n.origin,
            Self::Measured(m) => &m.origin,
            Self::String(s) => &s.origin,
            Self::Macro(m) => &m.origin,
            Self::Theory(t) => &t.origin,
        }
    }

    /// Returns a copy with `origin` annotated by a `Describe` note.
    #[must_use]
    pub fn described(&self, note: impl Into<String>) -> Self {
        let note = note.into();
        match self {
            Self::Vector(v) => {
                let mut v = v.clone();
                v.origin = v.origin.annotated(note);
                Self::Vector(v)
            }
            Self::Scalar(s) => {
                let mut s = s.clone();
                s.origin = s.origin.annotated(note);
                Self::Scalar(s)
            }
            Self::Numeric(n) => {
                let mut n = n.clone();
                n.origin = n.origin.annotated(note);
                Self::Numeric(n)
            }
            Self::Measured(m) => {
                let mut m = m.clone();
                m.origin = m.origin.annotated(note);
                Self::Measured(m)
            }
            Self::String(s) => {
                let mut s = s.clone();
                s.origin = s.origin.annotated(note);
                Self::String(s)
            }
            Self::Macro(m) => {
                let mut m = m.clone();
                m.origin = m.origin.annotated(note);
                Self::Macro(m)
            }
            Self::Theory(t) => {
                let mut t = t.clone();
                t.origin = t.origin.annotated(note);
                Self::Theory(t)
            }
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<&VectorValue> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<&NumericValue> {
        match self {
            Self::Numeric(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_measured(&self) -> Option<&MeasuredValue> {
        match self {
            Self::Measured(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&StringValue> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_macro(&self) -> Option<&MacroValue> {
        match self {
            Self::Macro(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_theory(&self) -> Option<&TheoryValue> {
        match self {
            Self::Theory(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(v) => write!(f, "VECTOR(dim={}, |v|={:.4})", v.vector.dim(), v.vector.norm()),
            Self::Scalar(s) => write!(f, "SCALAR({})", s.value),
            Self::Numeric(n) => match &n.unit {
                Some(unit) => write!(f, "NUMERIC({} {unit})", n.magnitude),
                None => write!(f, "NUMERIC({})", n.magnitude),
            },
            Self::Measured(m) => match &m.unit {
                Some(unit) => write!(f, "MEASURED({} {unit})", m.magnitude),
                None => write!(f, "MEASURED({})", m.magnitude),
            },
            Self::String(s) => write!(f, "STRING({})", s.text),
            Self::Macro(m) => write!(f, "MACRO({})", m.ast.name),
            Self::Theory(t) => write!(f, "THEORY({})", t.descriptor.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_does_not_mutate_original() {
        let origin = Origin::new(Some("a".into()), String::new(), 1);
        let v = Value::Vector(VectorValue::new(Vector::zeros(4), origin));
        let described = v.described("checked once");
        assert!(v.origin().notes.is_empty());
        assert_eq!(described.origin().notes, vec!["checked once".to_string()]);
    }

    #[test]
    fn tag_matches_variant() {
        let origin = Origin::new(None, String::new(), 0);
        assert_eq!(Value::Vector(VectorValue::new(Vector::zeros(4), origin.clone())).tag(), "VECTOR");
        assert_eq!(Value::Scalar(ScalarValue::new(1.0, origin.clone())).tag(), "SCALAR");
        assert_eq!(Value::Numeric(NumericValue::new(1.0, None, origin.clone())).tag(), "NUMERIC");
        assert_eq!(Value::Measured(MeasuredValue::new(1.0, None, None, origin.clone())).tag(), "MEASURED");
        assert_eq!(Value::String(StringValue::new("m", origin)).tag(), "STRING");
    }

    #[test]
    fn origin_with_statement_carries_operand_text() {
        let origin = Origin::new(Some("r".into()), "Bind", 3).with_statement("a", "b");
        assert_eq!(origin.subject_text.as_deref(), Some("a"));
        assert_eq!(origin.object_text.as_deref(), Some("b"));
    }
}

//! The error hierarchy surfaced by every public entry point of the engine.
//!
//! One enum, no `thiserror` — hand-written `Display`/`Error` impls rather
//! than a derive macro.

use std::fmt;

/// Which operand of a verb call a [`SpockError::Type`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Subject,
    Object,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => write!(f, "subject"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Every error kind the core can surface.
#[derive(Debug, Clone)]
pub enum SpockError {
    /// Malformed line, duplicate declaration, missing `@result`, unterminated macro.
    Parse {
        message: String,
        line: usize,
        column: Option<usize>,
    },
    /// The dependency graph of a macro or script contains a cycle.
    Cycle { declaration: String },
    /// A `$`-prefixed operand did not resolve to anything.
    UnknownReference { name: String },
    /// Verb resolution failed against every registry.
    UnknownVerb { verb: String },
    /// A verb operand did not carry one of the tags the verb accepts.
    Type {
        expected: Vec<&'static str>,
        actual: &'static str,
        verb: String,
        operand: Operand,
    },
    /// `UseTheory`/`Remember`/`BranchTheory`/`MergeTheory` named a theory that does not exist.
    TheoryNotFound { name: String },
    /// `MergeTheory` under the `fail` strategy hit a colliding declaration.
    MergeConflict {
        declaration: String,
        target_version: String,
        source_version: String,
    },
    /// Planner failure, recursion overflow, step-cap overflow, or a missing `@result`.
    Execution {
        message: String,
        statement: String,
        line: usize,
    },
    /// Division by zero or incompatible units in the numeric kernel.
    Numeric(String),
    /// Invalid engine configuration (bad env var, bad dimension, ...).
    Config(String),
    /// A filesystem or serialization failure in the theory store.
    Storage(String),
}

impl fmt::Display for SpockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { message, line, column } => match column {
                Some(c) => write!(f, "parse error at line {line}, column {c}: {message}"),
                None => write!(f, "parse error at line {line}: {message}"),
            },
            Self::Cycle { declaration } => {
                write!(f, "dependency cycle involving '{declaration}'")
            }
            Self::UnknownReference { name } => write!(f, "unknown reference '{name}'"),
            Self::UnknownVerb { verb } => write!(f, "unknown verb '{verb}'"),
            Self::Type {
                expected,
                actual,
                verb,
                operand,
            } => write!(
                f,
                "type error in '{verb}': {operand} expected one of {expected:?}, got {actual}"
            ),
            Self::TheoryNotFound { name } => write!(f, "theory '{name}' not found"),
            Self::MergeConflict {
                declaration,
                target_version,
                source_version,
            } => write!(
                f,
                "merge conflict on '{declaration}' between target version {target_version} and source version {source_version}"
            ),
            Self::Execution { message, statement, line } => {
                write!(f, "execution error at line {line} ('{statement}'): {message}")
            }
            Self::Numeric(message) => write!(f, "numeric error: {message}"),
            Self::Config(message) => write!(f, "configuration error: {message}"),
            Self::Storage(message) => write!(f, "storage error: {message}"),
        }
    }
}

impl std::error::Error for SpockError {}

/// Convenience alias used throughout the crate.
pub type SpockResult<T> = Result<T, SpockError>;

//! The parsed program: `Operand`, `Statement`, `Macro`, and `Script`.
//!
//! `Script` is what `parse.rs` produces and `exec.rs` walks; `Display` is
//! implemented for every node so `Remember` can serialize a namespace's
//! declarations back into SpockDSL source text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The subject or object of a statement, one of the four non-declaration
/// token kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// `$name` — resolved against the session's namespace at execution time.
    Reference(String),
    /// A bare identifier with no sigil: an existing declaration, a
    /// theory/macro/unit name, or (for a handful of documented operand
    /// positions) an auto-concept minted the first time it is seen.
    Identifier(String),
    /// `_` — a discarded operand, never minted or looked up for its value.
    Placeholder,
    /// A signed decimal literal.
    Literal(f64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(n) => write!(f, "${n}"),
            Self::Identifier(n) => write!(f, "{n}"),
            Self::Placeholder => write!(f, "_"),
            Self::Literal(n) => write!(f, "{n}"),
        }
    }
}

/// One `@name subject verb object` line — verb always third, object never
/// optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub declaration: String,
    pub subject: Operand,
    pub verb: String,
    pub object: Operand,
    pub line: usize,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} {} {} {}", self.declaration, self.subject, self.verb, self.object)
    }
}

/// Which of the three macro-header keywords introduced a macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroKind {
    Theory,
    Verb,
    Session,
}

impl fmt::Display for MacroKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Theory => "theory",
            Self::Verb => "verb",
            Self::Session => "session",
        };
        write!(f, "{s}")
    }
}

/// A `@Name kind begin ... end` macro block: a named group of statements
/// and nested macros, in source order. A `verb`-kind macro is callable as
/// a user-defined verb and must declare `@result` exactly once in its own
/// body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub name: String,
    pub kind: MacroKind,
    pub body: Vec<Statement>,
    pub macros: Vec<Macro>,
    pub line: usize,
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{} {} begin", self.name, self.kind)?;
        for stmt in &self.body {
            writeln!(f, "  {stmt}")?;
        }
        for nested in &self.macros {
            for line in nested.to_string().lines() {
                writeln!(f, "  {line}")?;
            }
        }
        write!(f, "end")
    }
}

impl Macro {
    /// Every statement in this macro's own body plus every nested macro's
    /// body, recursively, in source order.
    #[must_use]
    pub fn all_statements(&self) -> Vec<&Statement> {
        let mut out: Vec<&Statement> = self.body.iter().collect();
        for nested in &self.macros {
            out.extend(nested.all_statements());
        }
        out
    }
}

/// One line of a parsed script: either a bare statement or a macro
/// definition, in source order.
#[derive(Clone, Debug, PartialEq)]
pub enum TopLevel {
    Statement(Statement),
    Macro(Macro),
}

/// A fully parsed, SSA-checked program: the unit `exec.rs` executes and
/// `depgraph.rs` schedules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    pub items: Vec<TopLevel>,
}

impl Script {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement in the script, flattening macro bodies (and their
    /// nested macros) in declaration order — the view the dependency graph
    /// builds over.
    #[must_use]
    pub fn statements(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                TopLevel::Statement(s) => out.push(s),
                TopLevel::Macro(m) => out.extend(m.all_statements()),
            }
        }
        out
    }

    #[must_use]
    pub fn macros(&self) -> Vec<&Macro> {
        self.items
            .iter()
            .filter_map(|item| match item {
                TopLevel::Macro(m) => Some(m),
                TopLevel::Statement(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match item {
                TopLevel::Statement(s) => write!(f, "{s}")?,
                TopLevel::Macro(m) => write!(f, "{m}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_display_round_trips_shape() {
        let s = Statement {
            declaration: "r".into(),
            subject: Operand::Reference("a".into()),
            verb: "Bind".into(),
            object: Operand::Identifier("human".into()),
            line: 1,
        };
        assert_eq!(s.to_string(), "@r $a Bind human");
    }

    #[test]
    fn script_statements_flattens_macro_bodies_and_nested_macros() {
        let inner_stmt = Statement {
            declaration: "x".into(),
            subject: Operand::Identifier("a".into()),
            verb: "Bind".into(),
            object: Operand::Identifier("b".into()),
            line: 3,
        };
        let nested = Macro {
            name: "Inner".into(),
            kind: MacroKind::Verb,
            body: vec![inner_stmt.clone()],
            macros: Vec::new(),
            line: 2,
        };
        let script = Script {
            items: vec![TopLevel::Macro(Macro {
                name: "Outer".into(),
                kind: MacroKind::Theory,
                body: Vec::new(),
                macros: vec![nested],
                line: 1,
            })],
        };
        let flattened = script.statements();
        assert_eq!(flattened, vec![&inner_stmt]);
    }
}

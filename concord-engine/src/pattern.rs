//! Action patterns for `when` clauses
//!
//! A pattern names a concept action and constrains fields of its input and
//! output. Each constraint is a [`Term`]: a literal is a hard filter, a
//! variable captures the field's value (or checks it, if already bound).

use crate::binding::{Binding, Var};
use crate::occurrence::ActionOccurrence;
use crate::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A variable or a literal in a field position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Var(Var),
    Lit(Value),
}

/// Variable term
pub fn var(name: impl Into<Var>) -> Term {
    Term::Var(name.into())
}

/// Literal term
pub fn lit(value: impl Into<Value>) -> Term {
    Term::Lit(value.into())
}

impl Term {
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Term::Var(var) => Some(var),
            Term::Lit(_) => None,
        }
    }

    /// Value of the term under `binding`; `None` for an unbound variable
    pub fn resolve(&self, binding: &Binding) -> Option<Value> {
        match self {
            Term::Var(var) => binding.get(var.name()).cloned(),
            Term::Lit(value) => Some(value.clone()),
        }
    }
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Term::Var(var)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Lit(value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(var) => write!(f, "{var}"),
            Term::Lit(value) => write!(f, "{value}"),
        }
    }
}

/// Field constraints, in declaration order
pub type Fields = Vec<(String, Term)>;

pub(crate) fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[(String, Term)]) -> fmt::Result {
    f.write_str("{")?;
    for (i, (field, term)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{field}: {term}")?;
    }
    f.write_str("}")
}

/// Declarative description of an action occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPattern {
    pub concept: String,
    pub action: String,
    pub input: Fields,
    pub output: Fields,
}

impl ActionPattern {
    /// Pattern matching any occurrence of `concept.action`
    pub fn new(concept: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            action: action.into(),
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Constrain an input field
    pub fn input(mut self, field: impl Into<String>, term: Term) -> Self {
        self.input.push((field.into(), term));
        self
    }

    /// Constrain an output field
    pub fn output(mut self, field: impl Into<String>, term: Term) -> Self {
        self.output.push((field.into(), term));
        self
    }

    /// Whether the pattern is about this occurrence's action at all
    pub fn refers_to(&self, occurrence: &ActionOccurrence) -> bool {
        occurrence.is_action(&self.concept, &self.action)
    }

    /// Every variable the pattern captures
    pub fn variables(&self) -> impl Iterator<Item = &Var> {
        self.input
            .iter()
            .chain(self.output.iter())
            .filter_map(|(_, term)| term.as_var())
    }

    /// Unify `binding` with `occurrence`
    ///
    /// Returns the extended binding, or `None` when the action differs, a
    /// constrained field is absent, a literal does not match, or a captured
    /// value clashes with one already bound.
    pub fn unify(&self, binding: &Binding, occurrence: &ActionOccurrence) -> Option<Binding> {
        if !self.refers_to(occurrence) {
            return None;
        }
        let binding = unify_fields(binding.clone(), &self.input, &occurrence.input)?;
        unify_fields(binding, &self.output, &occurrence.output)
    }
}

fn unify_fields(binding: Binding, constraints: &[(String, Term)], record: &Record) -> Option<Binding> {
    constraints.iter().try_fold(binding, |binding, (field, term)| {
        let actual = record.get(field)?;
        match term {
            Term::Lit(expected) => (expected == actual).then_some(binding),
            Term::Var(var) => binding.bind(var, actual.clone()),
        }
    })
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.concept, self.action)?;
        write_fields(f, &self.input)?;
        f.write_str(") => ")?;
        write_fields(f, &self.output)
    }
}

//! Variables and bindings
//!
//! A [`Binding`] assigns values to variables. Once a variable is bound its
//! value never changes: binding it again to an equal value is a no-op, and
//! binding it to anything else discards the whole binding.

use crate::value::{Record, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// A symbolic variable shared across the clauses of a sync rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var(pub String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Var {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&Var> for Var {
    fn from(var: &Var) -> Self {
        var.clone()
    }
}

impl Borrow<str> for Var {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Why a value could not be added to a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clash {
    /// Same kind, different value
    Conflict,
    /// The offered value is of a different kind than the bound one
    KindMismatch { bound: ValueKind, offered: ValueKind },
}

/// One candidate assignment of variables to values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Binding {
    values: BTreeMap<Var, Value>,
}

impl Binding {
    /// The empty binding (nothing bound yet)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.values.iter()
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.values.keys()
    }

    /// Bind `var` to `value` in place
    ///
    /// Leaves the binding untouched and reports the clash when `var` is
    /// already bound to something else.
    pub fn try_bind(&mut self, var: Var, value: Value) -> Result<(), Clash> {
        match self.values.get(&var) {
            None => {
                self.values.insert(var, value);
                Ok(())
            }
            Some(existing) if *existing == value => Ok(()),
            Some(existing) if !existing.compatible_with(&value) => Err(Clash::KindMismatch {
                bound: existing.kind(),
                offered: value.kind(),
            }),
            Some(_) => Err(Clash::Conflict),
        }
    }

    /// Extend the binding, or discard it on a clash
    pub fn bind(mut self, var: impl Into<Var>, value: Value) -> Option<Self> {
        let var = var.into();
        match self.try_bind(var.clone(), value) {
            Ok(()) => Some(self),
            Err(Clash::KindMismatch { bound, offered }) => {
                tracing::trace!(%var, %bound, %offered, "binding dropped on kind mismatch");
                None
            }
            Err(Clash::Conflict) => None,
        }
    }

    /// Values of `vars` as a record keyed by variable name
    ///
    /// `None` when any of the variables is unbound.
    pub fn project(&self, vars: &[Var]) -> Option<Record> {
        vars.iter()
            .map(|var| {
                self.values
                    .get(var)
                    .map(|value| (var.name().to_string(), value.clone()))
            })
            .collect()
    }

    /// A copy of this binding without the given variables
    pub fn without(&self, vars: &[Var]) -> Binding {
        Binding {
            values: self
                .values
                .iter()
                .filter(|(var, _)| !vars.contains(var))
                .map(|(var, value)| (var.clone(), value.clone()))
                .collect(),
        }
    }
}

impl FromIterator<(Var, Value)> for Binding {
    fn from_iter<I: IntoIterator<Item = (Var, Value)>>(iter: I) -> Self {
        Binding {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var} = {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, Value)]) -> Binding {
        pairs
            .iter()
            .map(|(name, value)| (Var::new(*name), value.clone()))
            .collect()
    }

    #[test]
    fn rebinding_to_equal_value_is_a_no_op() {
        let b = binding(&[("user", Value::id("u1"))]);
        let same = b.clone().bind("user", Value::id("u1")).expect("same value unifies");
        assert_eq!(same, b);
    }

    #[test]
    fn conflicting_rebinding_discards_binding() {
        let b = binding(&[("user", Value::id("u1"))]);
        assert!(b.bind("user", Value::id("u2")).is_none());
    }

    #[test]
    fn try_bind_reports_kind_mismatch() {
        let mut b = binding(&[("count", Value::Int(1))]);
        let clash = b.try_bind(Var::new("count"), Value::Float(1.0));
        assert_eq!(
            clash,
            Err(Clash::KindMismatch {
                bound: ValueKind::Int,
                offered: ValueKind::Float
            })
        );
        assert_eq!(b.get("count"), Some(&Value::Int(1)));
    }

    #[test]
    fn project_requires_every_variable() {
        let b = binding(&[("file", Value::id("f1")), ("filename", Value::str("a.txt"))]);
        let record = b
            .project(&[Var::new("file"), Var::new("filename")])
            .expect("both bound");
        assert_eq!(record.get("filename"), Some(&Value::str("a.txt")));
        assert!(b.project(&[Var::new("owner")]).is_none());
    }

    #[test]
    fn display_lists_variables_in_order() {
        let b = binding(&[("b", Value::Int(2)), ("a", Value::str("x"))]);
        assert_eq!(b.to_string(), "{?a = \"x\", ?b = 2}");
    }
}

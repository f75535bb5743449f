//! Binding sets and their algebra
//!
//! [`Frames`] is an ordered set of bindings: every currently viable way of
//! satisfying a rule. All operations build a new set; inputs are never
//! mutated. An empty set means "no way to satisfy the rule", while
//! [`Frames::seed`] (one empty binding) means "one way, nothing bound yet".

use crate::binding::{Binding, Var};
use crate::concept::Concept;
use crate::error::{EngineError, Result};
use crate::pattern::Term;
use crate::value::{Record, Value};

/// An ordered binding set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frames {
    bindings: Vec<Binding>,
}

impl Frames {
    /// The seed set: one empty binding
    pub fn seed() -> Self {
        Self {
            bindings: vec![Binding::new()],
        }
    }

    /// The dead-end set: no bindings at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    pub fn first(&self) -> Option<&Binding> {
        self.bindings.first()
    }

    pub fn as_slice(&self) -> &[Binding] {
        &self.bindings
    }

    /// Keep the bindings satisfying a pure predicate
    pub fn filter<P>(&self, predicate: P) -> Frames
    where
        P: Fn(&Binding) -> bool,
    {
        self.bindings
            .iter()
            .filter(|binding| predicate(binding))
            .cloned()
            .collect()
    }

    /// Join each binding against a concept query
    ///
    /// For every binding, `input` is resolved into the query arguments and
    /// each returned row extends the binding with the `output` captures. A
    /// binding with no rows is dropped; a binding with N rows becomes N
    /// bindings. Rows missing a captured field, or contradicting an already
    /// bound variable, are skipped. Previously bound variables never change.
    pub async fn query(
        &self,
        concept: &dyn Concept,
        query: &str,
        input: &[(String, Term)],
        output: &[(String, Var)],
    ) -> Result<Frames> {
        let mut joined = Vec::new();
        for binding in &self.bindings {
            let args = resolve_args(binding, input, || {
                format!("query {}.{}", concept.name(), query)
            })?;
            let rows = concept
                .query(query, &args)
                .await
                .map_err(|source| EngineError::Concept {
                    concept: concept.name().to_string(),
                    operation: query.to_string(),
                    source,
                })?;
            joined.extend(rows.iter().filter_map(|row| capture_row(binding, row, output)));
        }
        Ok(Frames::from(joined))
    }

    /// Group by every variable not in `vars`, collecting the `vars` tuples
    ///
    /// Each output binding keeps the group's other variables and binds
    /// `result` to the list of `{var: value}` records of its members, in
    /// input order. Groups appear in order of first appearance. Bindings that
    /// lack one of `vars` do not qualify and are left out. An empty input
    /// yields an empty output.
    pub fn collect_as(&self, vars: &[Var], result: impl Into<Var>) -> Frames {
        let result = result.into();
        let mut groups: Vec<(Binding, Vec<Value>)> = Vec::new();
        for binding in &self.bindings {
            let Some(tuple) = binding.project(vars) else {
                continue;
            };
            let key = binding.without(vars);
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(Value::Record(tuple)),
                None => groups.push((key, vec![Value::Record(tuple)])),
            }
        }
        groups
            .into_iter()
            .filter_map(|(key, members)| key.bind(result.clone(), Value::List(members)))
            .collect()
    }

    /// Extend every binding with fixed assignments
    ///
    /// Bindings that already hold a different value for one of the
    /// variables are dropped.
    pub fn assign(&self, assignments: &[(Var, Value)]) -> Frames {
        self.bindings
            .iter()
            .filter_map(|binding| {
                assignments
                    .iter()
                    .try_fold(binding.clone(), |acc, (var, value)| acc.bind(var, value.clone()))
            })
            .collect()
    }
}

/// Resolve argument terms against a binding
///
/// An unbound variable is a configuration error; `site` names the clause
/// for the error message.
pub(crate) fn resolve_args(
    binding: &Binding,
    args: &[(String, Term)],
    site: impl FnOnce() -> String,
) -> Result<Record> {
    let mut record = Record::new();
    for (field, term) in args {
        match term.resolve(binding) {
            Some(value) => {
                record.insert(field.clone(), value);
            }
            None => {
                let variable = term.as_var().cloned().unwrap_or_else(|| Var::new(field.as_str()));
                return Err(EngineError::UnboundVariable {
                    variable,
                    site: site(),
                });
            }
        }
    }
    Ok(record)
}

fn capture_row(binding: &Binding, row: &Record, output: &[(String, Var)]) -> Option<Binding> {
    output.iter().try_fold(binding.clone(), |acc, (field, var)| {
        let value = row.get(field)?;
        acc.bind(var, value.clone())
    })
}

impl From<Vec<Binding>> for Frames {
    fn from(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }
}

impl FromIterator<Binding> for Frames {
    fn from_iter<I: IntoIterator<Item = Binding>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Frames {
    type Item = Binding;
    type IntoIter = std::vec::IntoIter<Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_iter()
    }
}

impl<'a> IntoIterator for &'a Frames {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::RecordExt;
    use crate::error::{ConceptError, ConceptResult};
    use crate::pattern::var;
    use crate::record;
    use async_trait::async_trait;

    fn binding(pairs: &[(&str, Value)]) -> Binding {
        pairs
            .iter()
            .map(|(name, value)| (Var::new(*name), value.clone()))
            .collect()
    }

    /// Owner -> files lookup
    struct Files;

    #[async_trait]
    impl Concept for Files {
        fn name(&self) -> &str {
            "Files"
        }

        fn actions(&self) -> &[&'static str] {
            &[]
        }

        fn queries(&self) -> &[&'static str] {
            &["_byOwner"]
        }

        async fn perform(&self, action: &str, _input: &Record) -> ConceptResult<Record> {
            Err(ConceptError::UnknownAction(action.to_string()))
        }

        async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
            if query != "_byOwner" {
                return Err(ConceptError::UnknownQuery(query.to_string()));
            }
            Ok(match input.require_str("owner")? {
                "u1" => vec![
                    record! { "file" => Value::id("f1"), "filename" => "a.txt" },
                    record! { "file" => Value::id("f2"), "filename" => "b.txt" },
                ],
                "u2" => vec![record! { "file" => Value::id("f3") }],
                _ => Vec::new(),
            })
        }
    }

    fn by_owner_output() -> Vec<(String, Var)> {
        vec![
            ("file".to_string(), Var::new("file")),
            ("filename".to_string(), Var::new("filename")),
        ]
    }

    #[test]
    fn seed_is_not_empty() {
        assert_eq!(Frames::seed().len(), 1);
        assert!(Frames::empty().is_empty());
        assert_ne!(Frames::seed(), Frames::empty());
    }

    #[tokio::test]
    async fn query_expands_and_drops() {
        let frames = Frames::from(vec![
            binding(&[("user", Value::id("u1"))]),
            binding(&[("user", Value::id("u3"))]),
        ]);
        let input = vec![("owner".to_string(), var("user"))];
        let joined = frames
            .query(&Files, "_byOwner", &input, &by_owner_output())
            .await
            .expect("query succeeds");

        assert_eq!(joined.len(), 2);
        for b in &joined {
            assert_eq!(b.get("user"), Some(&Value::id("u1")));
        }
        assert_eq!(joined.as_slice()[0].get("file"), Some(&Value::id("f1")));
        assert_eq!(joined.as_slice()[1].get("file"), Some(&Value::id("f2")));
    }

    #[tokio::test]
    async fn query_skips_rows_missing_captured_fields() {
        let frames = Frames::from(vec![binding(&[("user", Value::id("u2"))])]);
        let input = vec![("owner".to_string(), var("user"))];
        let joined = frames
            .query(&Files, "_byOwner", &input, &by_owner_output())
            .await
            .expect("query succeeds");
        assert!(joined.is_empty());
    }

    #[tokio::test]
    async fn query_with_unbound_input_is_a_configuration_error() {
        let frames = Frames::seed();
        let input = vec![("owner".to_string(), var("user"))];
        let err = frames
            .query(&Files, "_byOwner", &input, &by_owner_output())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnboundVariable { ref variable, .. } if variable.name() == "user"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn filter_keeps_matching_bindings() {
        let frames = Frames::from(vec![
            binding(&[("n", Value::Int(1))]),
            binding(&[("n", Value::Int(2))]),
            binding(&[("n", Value::Int(3))]),
        ]);
        let odd = frames.filter(|b| b.get("n").and_then(Value::as_int).is_some_and(|n| n % 2 == 1));
        assert_eq!(odd.len(), 2);
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn collect_as_groups_by_remaining_variables() {
        let frames = Frames::from(vec![
            binding(&[("request", Value::id("r1")), ("file", Value::id("f1")), ("filename", Value::str("a"))]),
            binding(&[("request", Value::id("r2")), ("file", Value::id("f9")), ("filename", Value::str("z"))]),
            binding(&[("request", Value::id("r1")), ("file", Value::id("f2")), ("filename", Value::str("b"))]),
        ]);
        let collected = frames.collect_as(&[Var::new("file"), Var::new("filename")], "results");
        assert_eq!(collected.len(), 2);

        let first = &collected.as_slice()[0];
        assert_eq!(first.get("request"), Some(&Value::id("r1")));
        assert!(!first.contains("file"));
        let results = first.get("results").and_then(Value::as_list).expect("list");
        assert_eq!(
            results,
            &[
                Value::Record(record! { "file" => Value::id("f1"), "filename" => "a" }),
                Value::Record(record! { "file" => Value::id("f2"), "filename" => "b" }),
            ]
        );
    }

    #[test]
    fn collect_as_on_empty_is_empty() {
        let collected = Frames::empty().collect_as(&[Var::new("file")], "results");
        assert!(collected.is_empty());
    }

    #[test]
    fn assign_extends_every_binding() {
        let frames = Frames::from(vec![binding(&[("request", Value::id("r1"))])]);
        let assigned = frames.assign(&[(Var::new("results"), Value::List(vec![]))]);
        assert_eq!(
            assigned.first().and_then(|b| b.get("results")),
            Some(&Value::List(vec![]))
        );
    }
}

//! Sync rules
//!
//! A rule reads as "when these actions have occurred, where these joins and
//! filters hold, then invoke these actions". Rules are declared once with
//! [`SyncBuilder`] and never change after registration.

use crate::binding::{Binding, Var};
use crate::concept::ConceptRegistry;
use crate::error::{EngineError, Result};
use crate::frames::resolve_args;
use crate::pattern::{write_fields, ActionPattern, Fields, Term};
use crate::pipeline::{OnEmpty, Operation, Pipeline, Predicate, Stage};
use crate::value::{Record, Value};
use std::collections::BTreeSet;
use std::fmt;

/// An action to invoke for each surviving binding
#[derive(Debug, Clone, PartialEq)]
pub struct ActionInvocation {
    pub concept: String,
    pub action: String,
    pub args: Fields,
}

impl ActionInvocation {
    pub fn new(concept: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            action: action.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, field: impl Into<String>, term: Term) -> Self {
        self.args.push((field.into(), term));
        self
    }

    /// Concrete input record for `binding`
    pub fn resolve(&self, binding: &Binding) -> Result<Record> {
        resolve_args(binding, &self.args, || format!("then {}.{}", self.concept, self.action))
    }
}

impl fmt::Display for ActionInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.concept, self.action)?;
        write_fields(f, &self.args)?;
        f.write_str(")")
    }
}

/// A declarative when/where/then reaction
#[derive(Debug, Clone)]
pub struct SyncRule {
    name: String,
    when: Vec<ActionPattern>,
    pipeline: Pipeline,
    then: Vec<ActionInvocation>,
}

impl SyncRule {
    pub fn builder(name: impl Into<String>) -> SyncBuilder {
        SyncBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn when(&self) -> &[ActionPattern] {
        &self.when
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn then(&self) -> &[ActionInvocation] {
        &self.then
    }

    /// Variables captured by the `when` clause
    pub fn when_vars(&self) -> BTreeSet<Var> {
        self.when
            .iter()
            .flat_map(|pattern| pattern.variables().cloned())
            .collect()
    }

    /// Check the rule against the concepts it will run with
    ///
    /// Every concept, action and query must exist, and every variable a
    /// clause reads must be bound on all paths leading to it.
    pub fn validate(&self, registry: &ConceptRegistry) -> Result<()> {
        self.check(registry).map_err(|err| err.within(&self.name))
    }

    fn check(&self, registry: &ConceptRegistry) -> Result<()> {
        for pattern in &self.when {
            registry.check_action(&pattern.concept, &pattern.action)?;
        }
        for stage in self.pipeline.stages() {
            if let Operation::Query { concept, query, .. } = &stage.operation {
                registry.check_query(concept, query)?;
            }
        }
        for invocation in &self.then {
            registry.check_action(&invocation.concept, &invocation.action)?;
        }

        let available = self.pipeline.analyze(&self.when_vars())?;
        for invocation in &self.then {
            let unbound = invocation
                .args
                .iter()
                .filter_map(|(_, term)| term.as_var())
                .find(|var| !available.contains(*var));
            if let Some(variable) = unbound {
                return Err(EngineError::UnboundVariable {
                    variable: variable.clone(),
                    site: format!("then {}.{}", invocation.concept, invocation.action),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for SyncRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sync {}", self.name)?;
        writeln!(f, "  when")?;
        for pattern in &self.when {
            writeln!(f, "    {pattern}")?;
        }
        if !self.pipeline.is_empty() {
            writeln!(f, "  where")?;
            for stage in self.pipeline.stages() {
                writeln!(f, "    {stage}")?;
            }
        }
        write!(f, "  then")?;
        for invocation in &self.then {
            write!(f, "\n    {invocation}")?;
        }
        Ok(())
    }
}

/// Fluent construction of a [`SyncRule`]
///
/// ```
/// use concord_engine::{lit, var, ActionInvocation, ActionPattern, SyncRule};
///
/// let rule = SyncRule::builder("ShareFileResponse")
///     .when(
///         ActionPattern::new("Requesting", "request")
///             .input("path", lit("/share"))
///             .output("request", var("request")),
///     )
///     .when(ActionPattern::new("Sharing", "shareWithUser"))
///     .then(
///         ActionInvocation::new("Requesting", "respond")
///             .arg("request", var("request"))
///             .arg("status", lit("shared")),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(rule.when().len(), 2);
/// ```
#[derive(Debug)]
pub struct SyncBuilder {
    name: String,
    when: Vec<ActionPattern>,
    pipeline: Pipeline,
    then: Vec<ActionInvocation>,
    misuse: Option<String>,
}

impl SyncBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            when: Vec::new(),
            pipeline: Pipeline::new(),
            then: Vec::new(),
            misuse: None,
        }
    }

    pub fn when(mut self, pattern: ActionPattern) -> Self {
        self.when.push(pattern);
        self
    }

    /// Join against `concept.query`, capturing row fields into variables
    pub fn query<'a>(
        mut self,
        concept: impl Into<String>,
        query: impl Into<String>,
        input: impl IntoIterator<Item = (&'a str, Term)>,
        output: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.pipeline.push(Stage::new(Operation::Query {
            concept: concept.into(),
            query: query.into(),
            input: input.into_iter().map(|(field, term)| (field.to_string(), term)).collect(),
            output: output
                .into_iter()
                .map(|(field, var)| (field.to_string(), Var::new(var)))
                .collect(),
        }));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.pipeline.push(Stage::new(Operation::Filter(predicate)));
        self
    }

    pub fn collect_as<'a>(mut self, vars: impl IntoIterator<Item = &'a str>, result: &str) -> Self {
        self.pipeline.push(Stage::new(Operation::CollectAs {
            vars: vars.into_iter().map(Var::new).collect(),
            result: Var::new(result),
        }));
        self
    }

    /// Give the most recent `where` stage a fallback for when it empties
    pub fn or_else<'a>(mut self, assignments: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let assignments: Vec<(Var, Value)> = assignments
            .into_iter()
            .map(|(var, value)| (Var::new(var), value))
            .collect();
        match self.pipeline.last_mut() {
            Some(stage) => stage.on_empty = OnEmpty::Fallback(assignments),
            None => {
                self.misuse
                    .get_or_insert_with(|| "fallback declared before any where stage".to_string());
            }
        }
        self
    }

    pub fn then(mut self, invocation: ActionInvocation) -> Self {
        self.then.push(invocation);
        self
    }

    /// Finish the rule
    ///
    /// Fails when the rule has no `when` pattern or no `then` action.
    pub fn build(self) -> Result<SyncRule> {
        let invalid = |reason: &str| EngineError::InvalidSync {
            sync: self.name.clone(),
            reason: reason.to_string(),
        };
        if let Some(reason) = &self.misuse {
            return Err(invalid(reason));
        }
        if self.when.is_empty() {
            return Err(invalid("`when` clause is empty"));
        }
        if self.then.is_empty() {
            return Err(invalid("`then` clause is empty"));
        }
        if let Some(stage) = self
            .pipeline
            .stages()
            .iter()
            .find(|stage| matches!(&stage.on_empty, OnEmpty::Fallback(a) if a.is_empty()))
        {
            return Err(invalid(&format!("fallback on `{}` assigns nothing", stage.operation)));
        }
        Ok(SyncRule {
            name: self.name,
            when: self.when,
            pipeline: self.pipeline,
            then: self.then,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::error::{ConceptError, ConceptResult};
    use crate::pattern::{lit, var};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Surface {
        name: &'static str,
        actions: &'static [&'static str],
        queries: &'static [&'static str],
    }

    #[async_trait]
    impl Concept for Surface {
        fn name(&self) -> &str {
            self.name
        }

        fn actions(&self) -> &[&'static str] {
            self.actions
        }

        fn queries(&self) -> &[&'static str] {
            self.queries
        }

        async fn perform(&self, action: &str, _input: &Record) -> ConceptResult<Record> {
            Err(ConceptError::UnknownAction(action.to_string()))
        }
    }

    fn registry() -> ConceptRegistry {
        let mut registry = ConceptRegistry::new();
        for concept in [
            Surface {
                name: "Requesting",
                actions: &["request", "respond"],
                queries: &[],
            },
            Surface {
                name: "Sessioning",
                actions: &[],
                queries: &["_getUser"],
            },
            Surface {
                name: "FileUploading",
                actions: &[],
                queries: &["_getFilesByOwner"],
            },
        ] {
            registry.register(Arc::new(concept)).unwrap();
        }
        registry
    }

    fn list_my_files() -> SyncBuilder {
        SyncRule::builder("ListMyFilesRequest")
            .when(
                ActionPattern::new("Requesting", "request")
                    .input("path", lit("/my-files"))
                    .input("session", var("session"))
                    .output("request", var("request")),
            )
            .query("Sessioning", "_getUser", [("session", var("session"))], [("user", "user")])
            .query(
                "FileUploading",
                "_getFilesByOwner",
                [("owner", var("user"))],
                [("file", "file"), ("filename", "filename")],
            )
            .or_else([("results", Value::List(vec![]))])
            .collect_as(["file", "filename"], "results")
    }

    fn respond_with(field: &str) -> ActionInvocation {
        ActionInvocation::new("Requesting", "respond")
            .arg("request", var("request"))
            .arg(field, var(field))
    }

    #[test]
    fn test_display() {
        let rule = list_my_files().then(respond_with("results")).build().unwrap();
        insta::assert_snapshot!(rule.to_string(), @r###"
        sync ListMyFilesRequest
          when
            Requesting.request({path: "/my-files", session: ?session}) => {request: ?request}
          where
            query Sessioning._getUser({session: ?session}) => {user: ?user}
            query FileUploading._getFilesByOwner({owner: ?user}) => {file: ?file, filename: ?filename} else {?results = []}
            collect [?file, ?filename] as ?results
          then
            Requesting.respond({request: ?request, results: ?results})
        "###);
    }

    #[test]
    fn test_validate_accepts_fallback_bound_results() {
        let rule = list_my_files().then(respond_with("results")).build().unwrap();
        rule.validate(&registry()).unwrap();
    }

    #[test]
    fn test_validate_rejects_vars_missing_on_fallback_path() {
        // `user` is only bound when the session lookup succeeds
        let rule = list_my_files().then(respond_with("user")).build().unwrap();
        let err = rule.validate(&registry()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(
            err.root(),
            EngineError::UnboundVariable { variable, .. } if variable.name() == "user"
        ));
        assert_eq!(
            err.to_string(),
            "in sync `ListMyFilesRequest`: unbound variable ?user in then Requesting.respond"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_surface() {
        let rule = SyncRule::builder("Bad")
            .when(ActionPattern::new("Requesting", "request"))
            .then(ActionInvocation::new("Requesting", "shout"))
            .build()
            .unwrap();
        let err = rule.validate(&registry()).unwrap_err();
        assert!(matches!(err.root(), EngineError::UnknownAction { action, .. } if action == "shout"));
    }

    #[test]
    fn test_build_rejects_incomplete_rules() {
        let no_when = SyncRule::builder("NoWhen").then(respond_with("results")).build();
        assert!(matches!(no_when, Err(EngineError::InvalidSync { .. })));

        let early_fallback = SyncRule::builder("Early")
            .or_else([("results", Value::List(vec![]))])
            .when(ActionPattern::new("Requesting", "request"))
            .then(respond_with("results"))
            .build();
        assert!(matches!(early_fallback, Err(EngineError::InvalidSync { .. })));
    }

    #[test]
    fn test_resolve_reports_unbound() {
        let binding = Binding::new().bind("request", Value::id("r1")).unwrap();
        let err = respond_with("results").resolve(&binding).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unbound variable ?results in then Requesting.respond"
        );
        let ok = ActionInvocation::new("Requesting", "respond")
            .arg("request", var("request"))
            .arg("status", lit("shared"))
            .resolve(&binding)
            .unwrap();
        assert_eq!(ok.get("status"), Some(&Value::str("shared")));
    }
}

//! `where` pipelines
//!
//! A pipeline is an ordered list of stages over a binding set: query joins,
//! filters and aggregations. Each stage declares what happens when it leaves
//! the set empty (see [`OnEmpty`]).

use crate::binding::{Binding, Var};
use crate::concept::ConceptRegistry;
use crate::error::{EngineError, Result};
use crate::frames::Frames;
use crate::pattern::{write_fields, Fields};
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Behavior of a stage whose result is empty
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OnEmpty {
    /// Stop here; the rule dispatches nothing
    #[default]
    Propagate,
    /// End the pipeline with its input bindings extended by these assignments
    Fallback(Vec<(Var, Value)>),
}

/// A named, pure test over a binding
#[derive(Clone)]
pub struct Predicate {
    name: String,
    vars: Vec<Var>,
    test: Arc<dyn Fn(&Binding) -> bool + Send + Sync>,
}

impl Predicate {
    /// Arbitrary predicate reading `vars`
    pub fn custom<F>(name: impl Into<String>, vars: Vec<Var>, test: F) -> Self
    where
        F: Fn(&Binding) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            vars,
            test: Arc::new(test),
        }
    }

    /// Both variables bound to equal values
    pub fn equal(a: impl Into<Var>, b: impl Into<Var>) -> Self {
        let (a, b) = (a.into(), b.into());
        let name = format!("{a} == {b}");
        let vars = vec![a.clone(), b.clone()];
        Self::custom(name, vars, move |binding| {
            matches!((binding.get(a.name()), binding.get(b.name())), (Some(x), Some(y)) if x == y)
        })
    }

    /// The variable is bound to `true`
    pub fn is_true(v: impl Into<Var>) -> Self {
        let v = v.into();
        let name = v.to_string();
        Self::custom(name, vec![v.clone()], move |binding| {
            binding.get(v.name()) == Some(&Value::Bool(true))
        })
    }

    pub fn any(predicates: Vec<Predicate>) -> Self {
        Self::combine(predicates, " || ", |preds, binding| preds.iter().any(|p| p.test(binding)))
    }

    pub fn all(predicates: Vec<Predicate>) -> Self {
        Self::combine(predicates, " && ", |preds, binding| preds.iter().all(|p| p.test(binding)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        let name = format!("!({})", predicate.name);
        let vars = predicate.vars.clone();
        Self::custom(name, vars, move |binding| !predicate.test(binding))
    }

    fn combine(
        predicates: Vec<Predicate>,
        separator: &str,
        eval: fn(&[Predicate], &Binding) -> bool,
    ) -> Self {
        let name = format!(
            "({})",
            predicates.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(separator)
        );
        let vars = predicates.iter().flat_map(|p| p.vars.iter().cloned()).collect();
        Self::custom(name, vars, move |binding| eval(&predicates, binding))
    }

    pub fn test(&self, binding: &Binding) -> bool {
        (self.test)(binding)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables the predicate reads
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One binding-set transformation
#[derive(Debug, Clone)]
pub enum Operation {
    /// Join against a concept query
    Query {
        concept: String,
        query: String,
        input: Fields,
        output: Vec<(String, Var)>,
    },
    /// Keep bindings satisfying a predicate
    Filter(Predicate),
    /// Group by the other variables, collecting `vars` into `result`
    CollectAs { vars: Vec<Var>, result: Var },
}

impl Operation {
    async fn apply(&self, registry: &ConceptRegistry, frames: &Frames) -> Result<Frames> {
        match self {
            Operation::Query {
                concept,
                query,
                input,
                output,
            } => {
                let concept = registry.get(concept)?;
                frames.query(concept.as_ref(), query, input, output).await
            }
            Operation::Filter(predicate) => Ok(frames.filter(|binding| predicate.test(binding))),
            Operation::CollectAs { vars, result } => Ok(frames.collect_as(vars, result)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Query {
                concept,
                query,
                input,
                output,
            } => {
                write!(f, "query {concept}.{query}(")?;
                write_fields(f, input)?;
                f.write_str(") => {")?;
                for (i, (field, var)) in output.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}: {var}")?;
                }
                f.write_str("}")
            }
            Operation::Filter(predicate) => write!(f, "filter {predicate}"),
            Operation::CollectAs { vars, result } => {
                let vars: Vec<_> = vars.iter().map(Var::to_string).collect();
                write!(f, "collect [{}] as {result}", vars.join(", "))
            }
        }
    }
}

/// An operation with its empty policy
#[derive(Debug, Clone)]
pub struct Stage {
    pub operation: Operation,
    pub on_empty: OnEmpty,
}

impl Stage {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            on_empty: OnEmpty::Propagate,
        }
    }

    pub fn or_else(mut self, assignments: Vec<(Var, Value)>) -> Self {
        self.on_empty = OnEmpty::Fallback(assignments);
        self
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let OnEmpty::Fallback(assignments) = &self.on_empty {
            f.write_str(" else {")?;
            for (i, (var, value)) in assignments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{var} = {value}")?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// How a pipeline ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every stage ran and left bindings behind
    Completed(Frames),
    /// `stage` emptied the set and no later stage declares a fallback
    ShortCircuited { stage: usize },
    /// The set emptied and the fallback declared on `stage` applied
    Fallback { stage: usize, frames: Frames },
}

impl Outcome {
    /// The bindings to dispatch on
    pub fn into_frames(self) -> Frames {
        match self {
            Outcome::Completed(frames) | Outcome::Fallback { frames, .. } => frames,
            Outcome::ShortCircuited { .. } => Frames::empty(),
        }
    }
}

/// Ordered stages of a `where` clause
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Stage> {
        self.stages.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the stages in order over `input`
    ///
    /// Once a stage leaves nothing, every later stage would too, so the
    /// first fallback at or after that stage decides the result. Without
    /// one, the pipeline short-circuits.
    pub async fn evaluate(
        &self,
        registry: &ConceptRegistry,
        input: Frames,
        trace_bindings: bool,
    ) -> Result<Outcome> {
        let mut frames = input.clone();
        for (index, stage) in self.stages.iter().enumerate() {
            frames = stage.operation.apply(registry, &frames).await?;
            if trace_bindings {
                tracing::trace!(stage = index, operation = %stage.operation, bindings = ?frames, "where stage");
            }
            if frames.is_empty() {
                return Ok(match self.fallback_from(index) {
                    Some((at, assignments)) => Outcome::Fallback {
                        stage: at,
                        frames: input.assign(assignments),
                    },
                    None => Outcome::ShortCircuited { stage: index },
                });
            }
        }
        Ok(Outcome::Completed(frames))
    }

    fn fallback_from(&self, index: usize) -> Option<(usize, &[(Var, Value)])> {
        self.stages
            .iter()
            .enumerate()
            .skip(index)
            .find_map(|(at, stage)| match &stage.on_empty {
                OnEmpty::Fallback(assignments) => Some((at, assignments.as_slice())),
                OnEmpty::Propagate => None,
            })
    }

    /// Variables bound on every way out of the pipeline
    ///
    /// `bound` holds the variables bound on entry. Fails on the first stage
    /// that reads a variable not bound at that point.
    pub fn analyze(&self, bound: &BTreeSet<Var>) -> Result<BTreeSet<Var>> {
        let mut current = bound.clone();
        let mut exits = Vec::new();
        for (index, stage) in self.stages.iter().enumerate() {
            let reads: Vec<&Var> = match &stage.operation {
                Operation::Query { input, .. } => input.iter().filter_map(|(_, term)| term.as_var()).collect(),
                Operation::Filter(predicate) => predicate.vars().iter().collect(),
                Operation::CollectAs { vars, .. } => vars.iter().collect(),
            };
            if let Some(missing) = reads.into_iter().find(|var| !current.contains(*var)) {
                return Err(EngineError::UnboundVariable {
                    variable: missing.clone(),
                    site: format!("where stage {} ({})", index + 1, stage.operation),
                });
            }
            match &stage.operation {
                Operation::Query { output, .. } => {
                    current.extend(output.iter().map(|(_, var)| var.clone()));
                }
                Operation::Filter(_) => {}
                Operation::CollectAs { vars, result } => {
                    for var in vars {
                        current.remove(var);
                    }
                    current.insert(result.clone());
                }
            }
            if let OnEmpty::Fallback(assignments) = &stage.on_empty {
                let mut exit = bound.clone();
                exit.extend(assignments.iter().map(|(var, _)| var.clone()));
                exits.push(exit);
            }
        }
        Ok(exits
            .into_iter()
            .fold(current, |acc, exit| acc.intersection(&exit).cloned().collect()))
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

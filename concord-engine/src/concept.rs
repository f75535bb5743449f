//! The concept interface and registry
//!
//! Concepts own their state. The engine only ever reaches it through the
//! action and query surface declared here.

use crate::error::{ConceptError, ConceptResult, EngineError, Result};
use crate::value::{Record, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// An independently-owned module exposing actions and queries
///
/// Actions change the concept's state and always yield one output record;
/// a domain failure is an output with an `error` field. Queries are pure
/// lookups returning zero or more rows and must be safe under concurrent
/// calls.
///
/// # Example
///
/// ```ignore
/// struct Counter(parking_lot::Mutex<i64>);
///
/// #[async_trait]
/// impl Concept for Counter {
///     fn name(&self) -> &str { "Counter" }
///     fn actions(&self) -> &[&'static str] { &["increment"] }
///
///     async fn perform(&self, action: &str, _input: &Record) -> ConceptResult<Record> {
///         match action {
///             "increment" => {
///                 let mut count = self.0.lock();
///                 *count += 1;
///                 Ok(record! { "count" => *count })
///             }
///             other => Err(ConceptError::UnknownAction(other.to_string())),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Concept: Send + Sync {
    /// Name used in patterns and invocations
    fn name(&self) -> &str;

    /// Names of the actions this concept exposes
    fn actions(&self) -> &[&'static str];

    /// Names of the queries this concept exposes
    fn queries(&self) -> &[&'static str] {
        &[]
    }

    /// Run an action
    async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record>;

    /// Run a query
    async fn query(&self, query: &str, input: &Record) -> ConceptResult<Vec<Record>> {
        let _ = input;
        Err(ConceptError::UnknownQuery(query.to_string()))
    }
}

/// Typed access to action and query inputs
pub trait RecordExt {
    /// The value of a field that must be present
    fn require(&self, field: &str) -> ConceptResult<&Value>;

    /// The text of a string or identifier field
    fn require_str(&self, field: &str) -> ConceptResult<&str>;
}

impl RecordExt for Record {
    fn require(&self, field: &str) -> ConceptResult<&Value> {
        self.get(field)
            .ok_or_else(|| ConceptError::MissingField(field.to_string()))
    }

    fn require_str(&self, field: &str) -> ConceptResult<&str> {
        self.require(field)?
            .as_str()
            .ok_or_else(|| ConceptError::InvalidField {
                field: field.to_string(),
                expected: "a string or identifier",
            })
    }
}

/// Concepts known to an engine, by name
#[derive(Clone, Default)]
pub struct ConceptRegistry {
    concepts: HashMap<String, Arc<dyn Concept>>,
}

impl ConceptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concept under its own name
    pub fn register(&mut self, concept: Arc<dyn Concept>) -> Result<()> {
        let name = concept.name().to_string();
        if self.concepts.contains_key(&name) {
            return Err(EngineError::DuplicateConcept(name));
        }
        self.concepts.insert(name, concept);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Concept>> {
        self.concepts
            .get(name)
            .ok_or_else(|| EngineError::UnknownConcept(name.to_string()))
    }

    /// Fail unless `concept` exists and exposes `action`
    pub fn check_action(&self, concept: &str, action: &str) -> Result<()> {
        if self.get(concept)?.actions().iter().any(|name| *name == action) {
            Ok(())
        } else {
            Err(EngineError::UnknownAction {
                concept: concept.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// Fail unless `concept` exists and exposes `query`
    pub fn check_query(&self, concept: &str, query: &str) -> Result<()> {
        if self.get(concept)?.queries().iter().any(|name| *name == query) {
            Ok(())
        } else {
            Err(EngineError::UnknownQuery {
                concept: concept.to_string(),
                query: query.to_string(),
            })
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.concepts.keys()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl std::fmt::Debug for ConceptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.concepts.keys().collect();
        names.sort();
        f.debug_struct("ConceptRegistry")
            .field("concepts", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    struct Echo;

    #[async_trait]
    impl Concept for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn actions(&self) -> &[&'static str] {
            &["say"]
        }

        async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
            match action {
                "say" => Ok(input.clone()),
                other => Err(ConceptError::UnknownAction(other.to_string())),
            }
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = ConceptRegistry::new();
        registry.register(Arc::new(Echo)).expect("first registration");
        let err = registry.register(Arc::new(Echo)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateConcept(name) if name == "Echo"));
    }

    #[test]
    fn test_surface_checks() {
        let mut registry = ConceptRegistry::new();
        registry.register(Arc::new(Echo)).expect("register");

        assert!(registry.check_action("Echo", "say").is_ok());
        assert!(matches!(
            registry.check_action("Echo", "shout"),
            Err(EngineError::UnknownAction { .. })
        ));
        assert!(matches!(
            registry.check_query("Echo", "_get"),
            Err(EngineError::UnknownQuery { .. })
        ));
        assert!(matches!(
            registry.check_action("Nope", "say"),
            Err(EngineError::UnknownConcept(_))
        ));
    }

    #[tokio::test]
    async fn test_default_query_is_unknown() {
        let err = Echo.query("_get", &Record::new()).await.unwrap_err();
        assert_eq!(err, ConceptError::UnknownQuery("_get".to_string()));
    }

    #[test]
    fn test_record_ext() {
        let input = record! { "file" => Value::id("f1"), "size" => 3 };
        assert_eq!(input.require_str("file"), Ok("f1"));
        assert!(matches!(
            input.require_str("size"),
            Err(ConceptError::InvalidField { .. })
        ));
        assert_eq!(
            input.require("owner"),
            Err(ConceptError::MissingField("owner".to_string()))
        );
    }
}

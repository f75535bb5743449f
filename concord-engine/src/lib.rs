//! Concord - synchronization engine for concept-based applications
//!
//! Concepts are independent modules that own their state and expose actions
//! and queries. They never call each other. Instead, declarative sync rules
//! react to recorded action occurrences, join them with concept state and
//! invoke follow-up actions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SyncEngine<S>                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   invoke ──► Concept.perform ──► OccurrenceStore (append)   │
//! │                                        │                    │
//! │                                        ▼                    │
//! │   ┌─────────────────────────────────────────────────────┐   │
//! │   │ for each SyncRule, in registration order            │   │
//! │   │   when  : match_when over the flow's occurrences    │   │
//! │   │   where : Pipeline (query / filter / collect_as)    │   │
//! │   │   then  : one dispatch per surviving Binding        │   │
//! │   └──────────────────────────┬──────────────────────────┘   │
//! │                              │                              │
//! │         dispatched actions are recorded and reacted         │
//! │         to before the next dispatch (depth first)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Bindings and frames
//!
//! A [`Binding`] assigns values to rule variables; a variable never changes
//! once bound. [`Frames`] is an ordered set of bindings: every viable way of
//! satisfying a rule so far. An empty set is a dead end, while the seed set
//! holds one empty binding.
//!
//! ## Occurrences and flows
//!
//! Every completed action becomes an immutable [`ActionOccurrence`] with a
//! global [`Sequence`] number. An external invocation opens a [`FlowId`];
//! everything dispatched in reaction shares it, and `when` clauses only
//! correlate occurrences of one flow.
//!
//! ## Failures
//!
//! A pattern that does not match, a join with no rows and a conflicting
//! binding all just shrink the binding set. An action that fails reports an
//! `error` field in its output. Only misconfiguration is an [`EngineError`].
//!
//! # Example
//!
//! ```
//! use concord_engine::{
//!     lit, record, var, ActionInvocation, ActionPattern, Concept, ConceptError, ConceptResult,
//!     Record, SyncEngine, SyncRule, Value,
//! };
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! #[async_trait::async_trait]
//! impl Concept for Greeter {
//!     fn name(&self) -> &str { "Greeter" }
//!     fn actions(&self) -> &[&'static str] { &["hello", "wave"] }
//!
//!     async fn perform(&self, action: &str, input: &Record) -> ConceptResult<Record> {
//!         match action {
//!             "hello" | "wave" => Ok(input.clone()),
//!             other => Err(ConceptError::UnknownAction(other.to_string())),
//!         }
//!     }
//! }
//!
//! let rule = SyncRule::builder("WaveBack")
//!     .when(ActionPattern::new("Greeter", "hello").input("to", var("who")))
//!     .then(ActionInvocation::new("Greeter", "wave").arg("at", var("who")).arg("hand", lit("left")))
//!     .build()
//!     .unwrap();
//!
//! let engine = SyncEngine::builder()
//!     .concept(Arc::new(Greeter))
//!     .sync(rule)
//!     .build()
//!     .unwrap();
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let root = runtime
//!     .block_on(engine.invoke("Greeter", "hello", record! { "to" => "ana" }))
//!     .unwrap();
//!
//! let flow = engine.flow(&root.flow);
//! assert_eq!(flow.len(), 2);
//! assert_eq!(flow[1].input.get("at"), Some(&Value::str("ana")));
//! ```

pub mod binding;
pub mod concept;
pub mod config;
pub mod engine;
pub mod error;
pub mod frames;
pub mod log;
pub mod matcher;
pub mod occurrence;
pub mod pattern;
pub mod pipeline;
pub mod sync;
pub mod types;
pub mod value;

pub use binding::{Binding, Clash, Var};
pub use concept::{Concept, ConceptRegistry, RecordExt};
pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineBuilder, EngineStats, SyncEngine};
pub use error::{ConceptError, ConceptResult, EngineError, Result};
pub use frames::Frames;
pub use log::{MemoryLog, OccurrenceStore};
pub use matcher::{match_when, WhenMatch};
pub use occurrence::{ActionOccurrence, Cause, OccurrenceDraft};
pub use pattern::{lit, var, ActionPattern, Fields, Term};
pub use pipeline::{OnEmpty, Operation, Outcome, Pipeline, Predicate, Stage};
pub use sync::{ActionInvocation, SyncBuilder, SyncRule};
pub use types::{FlowId, Sequence};
pub use value::{Record, Value, ValueKind};

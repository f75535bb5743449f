//! Error types for the synchronization engine
//!
//! Pattern mismatches, join misses, binding conflicts and error-shaped action
//! outputs are not errors: they only shrink binding sets. What remains here is
//! misconfiguration (caught at registration or at dispatch) and concepts
//! misusing their own interface.

use crate::binding::Var;
use crate::config::ConfigError;
use crate::types::Sequence;
use thiserror::Error;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// A clause referenced a variable that no earlier clause bound
    #[error("unbound variable {variable} in {site}")]
    UnboundVariable { variable: Var, site: String },

    /// No concept registered under this name
    #[error("unknown concept `{0}`")]
    UnknownConcept(String),

    /// The concept exists but does not expose the action
    #[error("concept `{concept}` has no action `{action}`")]
    UnknownAction { concept: String, action: String },

    /// The concept exists but does not expose the query
    #[error("concept `{concept}` has no query `{query}`")]
    UnknownQuery { concept: String, query: String },

    /// Two concepts registered under the same name
    #[error("concept `{0}` registered twice")]
    DuplicateConcept(String),

    /// Two sync rules registered under the same name
    #[error("sync `{0}` registered twice")]
    DuplicateSync(String),

    /// A sync rule failed static validation
    #[error("invalid sync `{sync}`: {reason}")]
    InvalidSync { sync: String, reason: String },

    /// A concept rejected an action or query invocation
    #[error("{concept}.{operation} failed: {source}")]
    Concept {
        concept: String,
        operation: String,
        #[source]
        source: ConceptError,
    },

    /// A cascade went deeper than the configured fuel limit
    #[error("cascade exceeded depth {limit} at occurrence {sequence}")]
    CascadeLimit { limit: usize, sequence: Sequence },

    /// An error raised while evaluating a particular sync rule
    #[error("in sync `{sync}`: {source}")]
    Sync {
        sync: String,
        #[source]
        source: Box<EngineError>,
    },

    /// Configuration loading errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Attribute this error to a sync rule, unless it already is
    pub fn within(self, sync: &str) -> Self {
        match self {
            already @ EngineError::Sync { .. } => already,
            other => EngineError::Sync {
                sync: sync.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through sync attribution
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::Sync { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the error stems from how rules or concepts were declared
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.root(),
            EngineError::UnboundVariable { .. }
                | EngineError::UnknownConcept(_)
                | EngineError::UnknownAction { .. }
                | EngineError::UnknownQuery { .. }
                | EngineError::DuplicateConcept(_)
                | EngineError::DuplicateSync(_)
                | EngineError::InvalidSync { .. }
        )
    }
}

/// Errors a concept reports for interface misuse
///
/// Domain failures (a missing file, a duplicate username) are not
/// `ConceptError`s: concepts report them as an output record carrying an
/// `error` field so that error-response rules can match on them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConceptError {
    #[error("no action `{0}`")]
    UnknownAction(String),

    #[error("no query `{0}`")]
    UnknownQuery(String),

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

/// Result type using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type using ConceptError
pub type ConceptResult<T> = std::result::Result<T, ConceptError>;

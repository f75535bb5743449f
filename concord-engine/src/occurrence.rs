//! Action occurrences: immutable records of concept actions that ran

use crate::types::{FlowId, Sequence};
use crate::value::{write_record, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The sync rule dispatch that produced an occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// Name of the dispatching sync rule
    pub sync: String,
    /// The occurrence whose reaction dispatched this one
    pub trigger: Sequence,
}

/// Record that a concept action completed
///
/// An occurrence never distinguishes success from failure structurally: an
/// action that failed simply has an `error` field in its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOccurrence {
    pub sequence: Sequence,
    pub flow: FlowId,
    pub concept: String,
    pub action: String,
    pub input: Record,
    pub output: Record,
    /// `None` for occurrences invoked from outside the engine
    pub cause: Option<Cause>,
    /// Wall-clock time of recording; ordering uses `sequence` only
    pub recorded_at: DateTime<Utc>,
}

impl ActionOccurrence {
    /// Whether the action reported an error-shaped output
    pub fn is_error(&self) -> bool {
        self.output.contains_key("error")
    }

    /// Whether this occurrence came from an external invocation
    pub fn is_root(&self) -> bool {
        self.cause.is_none()
    }

    pub fn is_action(&self, concept: &str, action: &str) -> bool {
        self.concept == concept && self.action == action
    }
}

impl fmt::Display for ActionOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}(", self.sequence, self.concept, self.action)?;
        write_record(f, &self.input)?;
        f.write_str(") => ")?;
        write_record(f, &self.output)
    }
}

/// Everything about an occurrence except what the store assigns
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceDraft {
    pub flow: FlowId,
    pub concept: String,
    pub action: String,
    pub input: Record,
    pub output: Record,
    pub cause: Option<Cause>,
}

impl OccurrenceDraft {
    /// Seal the draft with its log position
    pub fn seal(self, sequence: Sequence) -> ActionOccurrence {
        ActionOccurrence {
            sequence,
            flow: self.flow,
            concept: self.concept,
            action: self.action,
            input: self.input,
            output: self.output,
            cause: self.cause,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;

    fn draft(output: Record) -> OccurrenceDraft {
        OccurrenceDraft {
            flow: FlowId::new(),
            concept: "FileUploading".into(),
            action: "confirmUpload".into(),
            input: record! { "file" => Value::id("f1") },
            output,
            cause: None,
        }
    }

    #[test]
    fn error_is_a_matter_of_fields() {
        let ok = draft(record! { "file" => Value::id("f1") }).seal(Sequence(1));
        let failed = draft(record! { "error" => "not pending" }).seal(Sequence(2));
        assert!(!ok.is_error());
        assert!(failed.is_error());
        assert!(ok.is_root());
    }

    #[test]
    fn display_shows_sequence_action_and_records() {
        let occurrence = draft(record! { "file" => Value::id("f1") }).seal(Sequence(7));
        assert_eq!(
            occurrence.to_string(),
            "#7 FileUploading.confirmUpload({file: #f1}) => {file: #f1}"
        );
    }
}

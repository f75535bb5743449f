//! Core identity types for the synchronization engine
//!
//! Sequence numbers order every recorded occurrence; flow identifiers scope
//! matching to the causal chain opened by one external invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position of an occurrence in the log
///
/// Sequence numbers are assigned by the occurrence store at append time and
/// increase monotonically. The first recorded occurrence is `#1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl Sequence {
    /// The position before any occurrence was recorded
    pub fn genesis() -> Self {
        Self(0)
    }

    /// The sequence number following this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Flow identifier for causal scoping
///
/// Every external invocation opens a new flow. Occurrences dispatched by
/// sync rules inherit the flow of the occurrence that triggered them, and
/// `when` clauses only ever correlate occurrences within one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub Uuid);

impl FlowId {
    /// Create a new unique flow
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a flow from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow:{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_uniqueness() {
        let f1 = FlowId::new();
        let f2 = FlowId::new();
        assert_ne!(f1, f2);
    }

    #[test]
    fn test_sequence_ordering() {
        let first = Sequence::genesis().next();
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.value(), 2);
        assert_eq!(second.to_string(), "#2");
    }

    #[test]
    fn test_flow_display_is_short() {
        let flow = FlowId::new();
        assert_eq!(flow.to_string().len(), "flow:".len() + 8);
    }
}

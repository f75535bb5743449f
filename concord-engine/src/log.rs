//! Occurrence storage backends
//!
//! This module defines the `OccurrenceStore` trait for pluggable storage and
//! provides `MemoryLog` as the default append-only in-memory implementation.
//! Stores only ever grow: no entry is removed or reordered, so matching is
//! always re-evaluated against a growing prefix of the log.

use crate::occurrence::{ActionOccurrence, OccurrenceDraft};
use crate::types::{FlowId, Sequence};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for occurrence storage backends
pub trait OccurrenceStore: Send + Sync {
    /// Append an occurrence, assigning it the next sequence number
    fn append(&mut self, draft: OccurrenceDraft) -> Arc<ActionOccurrence>;

    /// Look up an occurrence by sequence number
    fn get(&self, sequence: Sequence) -> Option<Arc<ActionOccurrence>>;

    /// All occurrences of a flow, in sequence order
    fn flow(&self, flow: &FlowId) -> Vec<Arc<ActionOccurrence>>;

    /// Iterate over every occurrence in sequence order
    fn iter(&self) -> Box<dyn Iterator<Item = &Arc<ActionOccurrence>> + '_>;

    /// Number of recorded occurrences
    fn len(&self) -> usize;

    /// Number of distinct flows seen
    fn flow_count(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence number of the most recent occurrence
    fn last_sequence(&self) -> Sequence;
}

/// Append-only in-memory log with a per-flow index
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Vec<Arc<ActionOccurrence>>,
    flows: HashMap<FlowId, Vec<usize>>,
}

impl MemoryLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }
}

impl OccurrenceStore for MemoryLog {
    fn append(&mut self, draft: OccurrenceDraft) -> Arc<ActionOccurrence> {
        let sequence = self.last_sequence().next();
        let flow = draft.flow;
        let occurrence = Arc::new(draft.seal(sequence));
        self.flows.entry(flow).or_default().push(self.entries.len());
        self.entries.push(occurrence.clone());
        occurrence
    }

    fn get(&self, sequence: Sequence) -> Option<Arc<ActionOccurrence>> {
        let index = usize::try_from(sequence.value()).ok()?.checked_sub(1)?;
        self.entries.get(index).cloned()
    }

    fn flow(&self, flow: &FlowId) -> Vec<Arc<ActionOccurrence>> {
        self.flows
            .get(flow)
            .map(|indices| indices.iter().map(|&i| self.entries[i].clone()).collect())
            .unwrap_or_default()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Arc<ActionOccurrence>> + '_> {
        Box::new(self.entries.iter())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn flow_count(&self) -> usize {
        self.flows.len()
    }

    fn last_sequence(&self) -> Sequence {
        Sequence(self.entries.len() as u64)
    }
}

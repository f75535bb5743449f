//! `when` clause matching
//!
//! Patterns are joined left to right over the occurrences of a flow, the
//! same way a query joins over concept state: every prior binding is unified
//! with every qualifying occurrence and clashing combinations fall away.

use crate::binding::Binding;
use crate::occurrence::ActionOccurrence;
use crate::pattern::ActionPattern;
use crate::types::Sequence;
use std::sync::Arc;

/// One way of satisfying a `when` clause
#[derive(Debug, Clone, PartialEq)]
pub struct WhenMatch {
    pub binding: Binding,
    /// The occurrence matched by each pattern, in pattern order
    pub occurrences: Vec<Sequence>,
}

/// Satisfy `patterns` from `history`, using `trigger` in at least one slot
///
/// `history` must be in sequence order and end at the trigger. Each pattern
/// takes a distinct occurrence. Results come out in a deterministic order:
/// pattern by pattern, candidates in sequence order.
pub fn match_when(
    patterns: &[ActionPattern],
    history: &[Arc<ActionOccurrence>],
    trigger: &ActionOccurrence,
) -> Vec<WhenMatch> {
    if !patterns.iter().any(|pattern| pattern.refers_to(trigger)) {
        return Vec::new();
    }

    let mut partial = vec![WhenMatch {
        binding: Binding::new(),
        occurrences: Vec::with_capacity(patterns.len()),
    }];
    for pattern in patterns {
        let candidates: Vec<&Arc<ActionOccurrence>> = history
            .iter()
            .filter(|occurrence| occurrence.sequence <= trigger.sequence && pattern.refers_to(occurrence))
            .collect();

        let mut extended = Vec::new();
        for prior in &partial {
            for occurrence in &candidates {
                if prior.occurrences.contains(&occurrence.sequence) {
                    continue;
                }
                if let Some(binding) = pattern.unify(&prior.binding, occurrence) {
                    let mut occurrences = prior.occurrences.clone();
                    occurrences.push(occurrence.sequence);
                    extended.push(WhenMatch { binding, occurrences });
                }
            }
        }
        if extended.is_empty() {
            return Vec::new();
        }
        partial = extended;
    }

    partial.retain(|m| m.occurrences.contains(&trigger.sequence));
    partial
}

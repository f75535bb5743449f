//! The synchronization engine
//!
//! The engine records every action occurrence, matches new occurrences
//! against each rule's `when` clause, runs the rule's `where` pipeline and
//! dispatches its `then` actions. Dispatched actions are recorded in turn
//! and reacted to before the next dispatch proceeds, so a cascade runs
//! depth first until no rule fires anymore.

use crate::binding::Binding;
use crate::concept::{Concept, ConceptRegistry};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::frames::Frames;
use crate::log::{MemoryLog, OccurrenceStore};
use crate::matcher::match_when;
use crate::occurrence::{ActionOccurrence, Cause, OccurrenceDraft};
use crate::pipeline::Outcome;
use crate::sync::SyncRule;
use crate::types::FlowId;
use crate::value::Record;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Assembles concepts, rules and configuration into a [`SyncEngine`]
///
/// Problems are reported by [`build`](Self::build): duplicate names,
/// references to unknown concepts, actions or queries, and rules that read
/// variables nothing binds.
#[derive(Default)]
pub struct EngineBuilder {
    concepts: Vec<Arc<dyn Concept>>,
    syncs: Vec<SyncRule>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concept(mut self, concept: Arc<dyn Concept>) -> Self {
        self.concepts.push(concept);
        self
    }

    pub fn sync(mut self, rule: SyncRule) -> Self {
        self.syncs.push(rule);
        self
    }

    pub fn syncs(mut self, rules: impl IntoIterator<Item = SyncRule>) -> Self {
        self.syncs.extend(rules);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build an engine over an in-memory log
    pub fn build(self) -> Result<SyncEngine> {
        self.build_with_store(MemoryLog::new())
    }

    /// Build an engine over a custom occurrence store
    pub fn build_with_store<S: OccurrenceStore>(self, store: S) -> Result<SyncEngine<S>> {
        let mut registry = ConceptRegistry::new();
        for concept in self.concepts {
            registry.register(concept)?;
        }

        let mut names = HashSet::new();
        for rule in &self.syncs {
            if !names.insert(rule.name()) {
                return Err(EngineError::DuplicateSync(rule.name().to_string()));
            }
            rule.validate(&registry)?;
        }

        tracing::debug!(
            concepts = registry.len(),
            syncs = self.syncs.len(),
            max_cascade_depth = ?self.config.max_cascade_depth,
            "sync engine ready"
        );

        Ok(SyncEngine {
            registry,
            syncs: self.syncs,
            config: self.config,
            log: Mutex::new(store),
            metrics: EngineMetrics::default(),
        })
    }
}

#[derive(Debug, Default)]
struct EngineMetrics {
    firings: AtomicU64,
    dispatches: AtomicU64,
    short_circuits: AtomicU64,
    fallbacks: AtomicU64,
}

impl EngineMetrics {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

/// Counters describing what an engine has done so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngineStats {
    /// Occurrences in the log
    pub occurrences: usize,
    /// Distinct flows seen
    pub flows: usize,
    /// Fresh `when` matches handed to a pipeline
    pub firings: u64,
    /// Actions invoked by `then` clauses
    pub dispatches: u64,
    /// Pipelines that emptied out with no fallback
    pub short_circuits: u64,
    /// Pipelines that ended on a declared fallback
    pub fallbacks: u64,
}

/// Reactive engine connecting concepts through sync rules
///
/// The engine is `Send + Sync`; share it through an `Arc` and invoke
/// actions from as many tasks as needed. Each external invocation opens its
/// own flow and rules only correlate occurrences within one flow.
pub struct SyncEngine<S: OccurrenceStore = MemoryLog> {
    registry: ConceptRegistry,
    syncs: Vec<SyncRule>,
    config: EngineConfig,
    log: Mutex<S>,
    metrics: EngineMetrics,
}

impl SyncEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }
}

impl<S: OccurrenceStore> SyncEngine<S> {
    /// Perform an action in a new flow and run its cascade to quiescence
    ///
    /// Returns the occurrence of the invoked action itself.
    pub async fn invoke(&self, concept: &str, action: &str, input: Record) -> Result<Arc<ActionOccurrence>> {
        self.invoke_in(FlowId::new(), concept, action, input).await
    }

    /// Like [`invoke`](Self::invoke), within an existing flow
    pub async fn invoke_in(
        &self,
        flow: FlowId,
        concept: &str,
        action: &str,
        input: Record,
    ) -> Result<Arc<ActionOccurrence>> {
        self.registry.check_action(concept, action)?;
        let occurrence = self.perform(flow, concept, action, input, None).await?;
        tracing::debug!(%flow, occurrence = %occurrence, "external invocation");
        self.react(occurrence.clone(), 0).await?;
        Ok(occurrence)
    }

    /// Occurrences of `flow`, in sequence order
    pub fn flow(&self, flow: &FlowId) -> Vec<Arc<ActionOccurrence>> {
        self.log.lock().flow(flow)
    }

    /// Every recorded occurrence, in sequence order
    pub fn occurrences(&self) -> Vec<Arc<ActionOccurrence>> {
        self.log.lock().iter().cloned().collect()
    }

    pub fn syncs(&self) -> &[SyncRule] {
        &self.syncs
    }

    pub fn concepts(&self) -> &ConceptRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        let (occurrences, flows) = {
            let log = self.log.lock();
            (log.len(), log.flow_count())
        };
        EngineStats {
            occurrences,
            flows,
            firings: self.metrics.firings.load(Ordering::Relaxed),
            dispatches: self.metrics.dispatches.load(Ordering::Relaxed),
            short_circuits: self.metrics.short_circuits.load(Ordering::Relaxed),
            fallbacks: self.metrics.fallbacks.load(Ordering::Relaxed),
        }
    }

    async fn perform(
        &self,
        flow: FlowId,
        concept: &str,
        action: &str,
        input: Record,
        cause: Option<Cause>,
    ) -> Result<Arc<ActionOccurrence>> {
        let output = self
            .registry
            .get(concept)?
            .perform(action, &input)
            .await
            .map_err(|source| EngineError::Concept {
                concept: concept.to_string(),
                operation: action.to_string(),
                source,
            })?;
        let draft = OccurrenceDraft {
            flow,
            concept: concept.to_string(),
            action: action.to_string(),
            input,
            output,
            cause,
        };
        Ok(self.log.lock().append(draft))
    }

    /// React to `trigger`, dispatching every rule it completes
    fn react(&self, trigger: Arc<ActionOccurrence>, depth: usize) -> BoxFuture<'_, Result<()>> {
        async move {
            let history = self.log.lock().flow(&trigger.flow);
            for rule in &self.syncs {
                let fresh = Self::fresh_matches(rule, &history, &trigger);
                if fresh.is_empty() {
                    continue;
                }
                EngineMetrics::bump(&self.metrics.firings, fresh.len() as u64);
                tracing::debug!(
                    sync = rule.name(),
                    trigger = %trigger.sequence,
                    matches = fresh.len(),
                    "sync fired"
                );

                let frames = self
                    .evaluate(rule, fresh)
                    .await
                    .map_err(|err| self.surface(err.within(rule.name())))?;
                for binding in &frames {
                    for invocation in rule.then() {
                        let input = invocation
                            .resolve(binding)
                            .map_err(|err| self.surface(err.within(rule.name())))?;
                        if let Some(limit) = self.config.max_cascade_depth {
                            if depth >= limit {
                                tracing::warn!(sync = rule.name(), limit, trigger = %trigger.sequence, "cascade limit reached");
                                return Err(EngineError::CascadeLimit {
                                    limit,
                                    sequence: trigger.sequence,
                                });
                            }
                        }
                        let cause = Cause {
                            sync: rule.name().to_string(),
                            trigger: trigger.sequence,
                        };
                        let occurrence = self
                            .perform(trigger.flow, &invocation.concept, &invocation.action, input, Some(cause))
                            .await
                            .map_err(|err| err.within(rule.name()))?;
                        EngineMetrics::bump(&self.metrics.dispatches, 1);
                        tracing::debug!(sync = rule.name(), occurrence = %occurrence, "dispatched");
                        self.react(occurrence, depth + 1).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// `when` matches of `rule` that include `trigger`
    ///
    /// Every match contains the trigger and each occurrence is reacted to
    /// exactly once, so a combination of occurrences fires a rule at most
    /// once without any record of past firings.
    fn fresh_matches(
        rule: &SyncRule,
        history: &[Arc<ActionOccurrence>],
        trigger: &ActionOccurrence,
    ) -> Vec<Binding> {
        match_when(rule.when(), history, trigger)
            .into_iter()
            .map(|m| m.binding)
            .collect()
    }

    async fn evaluate(&self, rule: &SyncRule, matched: Vec<Binding>) -> Result<Frames> {
        let input = Frames::from(matched);
        if self.config.trace_bindings {
            tracing::trace!(sync = rule.name(), bindings = ?input, "when bindings");
        }
        let outcome = rule
            .pipeline()
            .evaluate(&self.registry, input, self.config.trace_bindings)
            .await?;
        match &outcome {
            Outcome::Completed(frames) => {
                tracing::debug!(sync = rule.name(), bindings = frames.len(), "where completed");
            }
            Outcome::ShortCircuited { stage } => {
                EngineMetrics::bump(&self.metrics.short_circuits, 1);
                tracing::debug!(sync = rule.name(), stage, "where emptied; nothing to dispatch");
            }
            Outcome::Fallback { stage, frames } => {
                EngineMetrics::bump(&self.metrics.fallbacks, 1);
                tracing::debug!(sync = rule.name(), stage, bindings = frames.len(), "where fell back");
            }
        }
        Ok(outcome.into_frames())
    }

    fn surface(&self, err: EngineError) -> EngineError {
        if err.is_configuration_error() {
            tracing::warn!(error = %err, "sync misconfigured");
        }
        err
    }
}

impl<S: OccurrenceStore> std::fmt::Debug for SyncEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("concepts", &self.registry)
            .field("syncs", &self.syncs.iter().map(SyncRule::name).collect::<Vec<_>>())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

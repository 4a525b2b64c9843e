//! Per-instance run-time engine.
//!
//! A [`Machine`] owns one instance's internal state and current state name.
//! Each inbound event resolves to a handler in three tiers:
//!
//! 1. the current state's direct handler for the event kind
//! 2. the per-kind fallback for that polarity
//! 3. the machine-wide default fallback
//!
//! The chosen next state is then checked against the transition table
//! before any hook runs.

use crate::core::{
    FsmEvent, FsmId, FsmTypes, PatternContainer, Polarity, StateHistory, StateName,
    StateTransition,
};
use crate::error::FsmError;
use crate::machine::definition::MachineDef;
use crate::machine::state::FsmState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// History entries kept per instance unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// What happened to an instance as a result of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// No instance key could be extracted; nothing ran.
    Dropped,
    /// Only the default fallback ran and it kept the current state.
    Unhandled,
    /// The instance moved along an edge of the transition table.
    Transitioned { from: StateName, to: StateName },
    /// The instance reached `FINAL` and is gone.
    Finished,
    /// A handler failed and the exception policy absorbed the error.
    Failed,
}

impl Outcome {
    /// Check if the event moved the instance to a new state or ended it.
    pub fn changed_state(&self) -> bool {
        matches!(self, Self::Transitioned { .. } | Self::Finished)
    }
}

/// Which resolution tier produced the next state.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Tier {
    Handler,
    Default,
}

/// One running instance of a machine definition.
pub struct Machine<T: FsmTypes> {
    id: FsmId<T::BaseId>,
    def: Arc<MachineDef<T>>,
    internal: T::Internal,
    current: StateName,
    history: StateHistory,
    created_at: DateTime<Utc>,
}

impl<T: FsmTypes> Machine<T> {
    pub(crate) fn new(
        def: Arc<MachineDef<T>>,
        id: FsmId<T::BaseId>,
        internal: T::Internal,
    ) -> Self {
        Self {
            id,
            def,
            internal,
            current: StateName::START,
            history: StateHistory::with_limit(DEFAULT_HISTORY_LIMIT),
            created_at: Utc::now(),
        }
    }

    /// Replace the history buffer with one holding at most `limit` entries.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = StateHistory::with_limit(limit);
        self
    }

    pub fn id(&self) -> &FsmId<T::BaseId> {
        &self.id
    }

    /// Current state. Never `FINAL`: a finished machine is discarded.
    pub fn state(&self) -> StateName {
        self.current
    }

    pub fn definition(&self) -> &Arc<MachineDef<T>> {
        &self.def
    }

    pub fn internal(&self) -> &T::Internal {
        &self.internal
    }

    pub fn internal_mut(&mut self) -> &mut T::Internal {
        &mut self.internal
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Deliver a plain event.
    pub fn handle_event(
        &mut self,
        polarity: Polarity,
        es: &mut T::External,
        event: &T::Event,
    ) -> Result<Outcome, FsmError> {
        tracing::trace!(fsm = %self.id, state = %self.current, %polarity, ?event, "event received");

        let def = Arc::clone(&self.def);
        let state = self.current_state(&def)?;
        let is = &mut self.internal;

        let (next, tier) = match state.handle_event(polarity, es, is, event) {
            Some(result) => (result?, Tier::Handler),
            None => match def.event_fallback(polarity, event.kind()) {
                Some(fallback) => (state.fallback_event(fallback, es, is, event)?, Tier::Handler),
                None => (
                    state.fallback_event(def.default_event(), es, is, event)?,
                    Tier::Default,
                ),
            },
        };

        self.advance(&def, state, next, tier, format!("{:?}", event.kind()), es)
    }

    /// Deliver a pattern event. Handlers are looked up by the payload kind
    /// together with the container kind.
    pub fn handle_pattern(
        &mut self,
        polarity: Polarity,
        es: &mut T::External,
        container: &T::Container,
    ) -> Result<Outcome, FsmError> {
        tracing::trace!(
            fsm = %self.id,
            state = %self.current,
            %polarity,
            ?container,
            "pattern received"
        );

        let def = Arc::clone(&self.def);
        let state = self.current_state(&def)?;
        let is = &mut self.internal;
        let key = (container.extract_pattern(), container.container_kind());

        let (next, tier) = match state.handle_pattern(polarity, es, is, container) {
            Some(result) => (result?, Tier::Handler),
            None => match def.pattern_fallback(polarity, key) {
                Some(fallback) => (
                    state.fallback_pattern(fallback, es, is, container)?,
                    Tier::Handler,
                ),
                None => (
                    state.fallback_pattern(def.default_pattern(), es, is, container)?,
                    Tier::Default,
                ),
            },
        };

        self.advance(&def, state, next, tier, format!("{key:?}"), es)
    }

    fn current_state<'d>(&self, def: &'d MachineDef<T>) -> Result<FsmState<'d, T>, FsmError> {
        def.state(self.current).ok_or_else(|| FsmError::UnknownState {
            fsm: self.id.to_string(),
            state: self.current.to_string(),
        })
    }

    fn advance(
        &mut self,
        def: &MachineDef<T>,
        state: FsmState<'_, T>,
        next: StateName,
        tier: Tier,
        trigger: String,
        es: &mut T::External,
    ) -> Result<Outcome, FsmError> {
        let from = self.current;

        if next.is_final() {
            state.on_exit(next, es, &mut self.internal);
            self.record(from, next, trigger);
            tracing::trace!(fsm = %self.id, %from, "machine finished");
            return Ok(Outcome::Finished);
        }

        if next == from && tier == Tier::Default {
            return Ok(Outcome::Unhandled);
        }

        if !def.has_transition(from, next) {
            return Err(FsmError::UndefinedTransition {
                fsm: self.id.to_string(),
                from: from.to_string(),
                to: next.to_string(),
            });
        }

        state.on_exit(next, es, &mut self.internal);
        self.current = next;
        if let Some(entered) = def.state(next) {
            entered.on_entry(from, es, &mut self.internal);
        }
        self.record(from, next, trigger);
        tracing::trace!(fsm = %self.id, %from, to = %next, "transition");

        Ok(Outcome::Transitioned { from, to: next })
    }

    fn record(&mut self, from: StateName, to: StateName, trigger: String) {
        self.history.record(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            trigger,
        });
    }
}

impl<T: FsmTypes> fmt::Debug for Machine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.id)
            .field("machine", &self.def.name())
            .field("state", &self.current)
            .field("transitions", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{SemanticDefinition, StructuralDefinition};

    #[derive(Debug)]
    enum Job {
        Submit,
        Work,
        Poke,
        Cancel,
        Jump,
        Fail,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum JobKind {
        Submit,
        Work,
        Poke,
        Cancel,
        Jump,
        Fail,
    }

    impl FsmEvent for Job {
        type Kind = JobKind;

        fn kind(&self) -> JobKind {
            match self {
                Self::Submit => JobKind::Submit,
                Self::Work => JobKind::Work,
                Self::Poke => JobKind::Poke,
                Self::Cancel => JobKind::Cancel,
                Self::Jump => JobKind::Jump,
                Self::Fail => JobKind::Fail,
            }
        }
    }

    #[derive(Debug)]
    enum Envelope {
        Urgent(Job),
        Normal(Job),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum EnvelopeKind {
        Urgent,
        Normal,
    }

    impl PatternContainer for Envelope {
        type Content = Job;
        type Kind = EnvelopeKind;

        fn container_kind(&self) -> EnvelopeKind {
            match self {
                Self::Urgent(_) => EnvelopeKind::Urgent,
                Self::Normal(_) => EnvelopeKind::Normal,
            }
        }

        fn extract_value(&self) -> &Job {
            match self {
                Self::Urgent(job) | Self::Normal(job) => job,
            }
        }
    }

    struct Worker;

    impl FsmTypes for Worker {
        type Port = ();
        type Event = Job;
        type Container = Envelope;
        type External = Vec<String>;
        type Internal = u32;
        type BaseId = u32;
    }

    const QUEUED: StateName = StateName::new("QUEUED");
    const BUSY: StateName = StateName::new("BUSY");

    fn worker() -> Arc<MachineDef<Worker>> {
        let structural = StructuralDefinition::<Worker>::new()
            .on_start()
            .next_states([QUEUED])
            .build_transition()
            .on_state(QUEUED)
            .next_states([BUSY])
            .to_final()
            .on_exit(|from, to, log: &mut Vec<String>, _| log.push(format!("exit {from}->{to}")))
            .build_transition()
            .on_state(BUSY)
            .next_states([BUSY])
            .to_final()
            .on_entry(|from, to, log: &mut Vec<String>, _| log.push(format!("entry {from}->{to}")))
            .build_transition();

        let semantic = SemanticDefinition::<Worker>::new()
            .positive_port(())
            .on_event(JobKind::Submit)
            .subscribe_on_start(|_, _, _, _| Ok(QUEUED))
            .on_event(JobKind::Work)
            .subscribe(|_, _, _, _| Ok(BUSY), [QUEUED, BUSY])
            .on_event(JobKind::Poke)
            .subscribe(
                |state, _, pokes: &mut u32, _| {
                    *pokes += 1;
                    Ok(state)
                },
                [QUEUED],
            )
            .on_event(JobKind::Cancel)
            .fallback(|_, _, _, _| Ok(StateName::FINAL))
            .on_event(JobKind::Jump)
            .subscribe_on_start(|_, _, _, _| Ok(BUSY))
            .on_event(JobKind::Fail)
            .subscribe_on_start(|_, _, _, _| Err(FsmError::handler("refused")))
            .on_pattern(JobKind::Work, EnvelopeKind::Urgent)
            .subscribe(|_, _, _, _, _| Ok(BUSY), [QUEUED])
            .build_events();

        Arc::new(MachineDef::compile("worker", structural, semantic).unwrap())
    }

    #[test]
    fn new_machine_starts_in_start() {
        let machine = worker().build(7, 0);

        assert_eq!(machine.state(), StateName::START);
        assert_eq!(machine.id().base, 7);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn handled_event_follows_edge_and_runs_hooks() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();

        machine
            .handle_event(Polarity::Positive, &mut log, &Job::Submit)
            .unwrap();
        let outcome = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Work)
            .unwrap();

        assert_eq!(outcome, Outcome::Transitioned { from: QUEUED, to: BUSY });
        assert_eq!(machine.state(), BUSY);
        assert_eq!(log, vec!["exit QUEUED->BUSY", "entry QUEUED->BUSY"]);
        assert_eq!(machine.history().get_path(), vec![StateName::START, QUEUED, BUSY]);
    }

    #[test]
    fn self_edge_is_a_full_transition() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();
        machine.handle_event(Polarity::Positive, &mut log, &Job::Submit).unwrap();
        machine.handle_event(Polarity::Positive, &mut log, &Job::Work).unwrap();
        log.clear();

        let outcome = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Work)
            .unwrap();

        assert_eq!(outcome, Outcome::Transitioned { from: BUSY, to: BUSY });
        assert_eq!(log, vec!["entry BUSY->BUSY"]);
    }

    #[test]
    fn answering_current_state_without_self_edge_fails() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();
        machine.handle_event(Polarity::Positive, &mut log, &Job::Submit).unwrap();

        let err = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Poke)
            .unwrap_err();

        assert!(matches!(err, FsmError::UndefinedTransition { ref from, ref to, .. }
            if from == "QUEUED" && to == "QUEUED"));
        assert_eq!(machine.state(), QUEUED);
        assert!(log.is_empty());
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn unhandled_event_keeps_state() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();

        let outcome = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Poke)
            .unwrap();
        let negative = machine
            .handle_event(Polarity::Negative, &mut log, &Job::Submit)
            .unwrap();

        assert_eq!(outcome, Outcome::Unhandled);
        assert_eq!(negative, Outcome::Unhandled);
        assert_eq!(machine.state(), StateName::START);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn per_kind_fallback_runs_in_any_state() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();
        machine.handle_event(Polarity::Positive, &mut log, &Job::Submit).unwrap();

        let outcome = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Cancel)
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(log, vec!["exit QUEUED->FINAL"]);
        assert!(outcome.changed_state());
    }

    #[test]
    fn missing_edge_is_an_error() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();

        let err = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Jump)
            .unwrap_err();

        assert!(matches!(err, FsmError::UndefinedTransition { ref from, ref to, .. }
            if from == "START" && to == "BUSY"));
        assert_eq!(machine.state(), StateName::START);
    }

    #[test]
    fn handler_error_propagates() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();

        let err = machine
            .handle_event(Polarity::Positive, &mut log, &Job::Fail)
            .unwrap_err();

        assert_eq!(err.to_string(), "handler failed: refused");
    }

    #[test]
    fn pattern_is_matched_on_container_kind() {
        let mut machine = worker().build(1, 0);
        let mut log = Vec::new();
        machine.handle_event(Polarity::Positive, &mut log, &Job::Submit).unwrap();

        let normal = machine
            .handle_pattern(Polarity::Positive, &mut log, &Envelope::Normal(Job::Work))
            .unwrap();
        assert_eq!(normal, Outcome::Unhandled);

        let urgent = machine
            .handle_pattern(Polarity::Positive, &mut log, &Envelope::Urgent(Job::Work))
            .unwrap();
        assert_eq!(urgent, Outcome::Transitioned { from: QUEUED, to: BUSY });
    }

    #[test]
    fn history_limit_is_respected() {
        let mut machine = worker().build(1, 0).with_history_limit(2);
        let mut log = Vec::new();

        for job in [Job::Submit, Job::Work, Job::Work, Job::Work] {
            machine.handle_event(Polarity::Positive, &mut log, &job).unwrap();
        }

        assert_eq!(machine.history().len(), 2);
        assert_eq!(machine.history().get_path(), vec![BUSY, BUSY, BUSY]);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(Outcome::Transitioned {
            from: StateName::START,
            to: QUEUED,
        })
        .unwrap();

        assert_eq!(json["outcome"], "transitioned");
        assert_eq!(json["to"], "QUEUED");
    }
}

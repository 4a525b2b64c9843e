//! Compiled, immutable machine definitions.

use crate::builder::semantic::{HandlerTable, PolarityHandlers};
use crate::builder::structural::StateHooks;
use crate::builder::{DefinitionViolation, PortEvents, SemanticDefinition, StructuralDefinition};
use crate::core::{
    EventKind, FsmDefId, FsmId, FsmTypes, PatternKey, Polarity, StateName, TransitionTable,
};
use crate::error::FsmError;
use crate::machine::engine::Machine;
use crate::machine::handler::{EventHandler, PatternHandler, StateChangeHandler};
use crate::machine::state::FsmState;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionViolation>>;

/// Direct handlers of one state for one polarity.
pub(crate) struct StateHandlers<T: FsmTypes> {
    pub(crate) events: HashMap<EventKind<T>, EventHandler<T>>,
    pub(crate) patterns: HashMap<PatternKey<T>, PatternHandler<T>>,
}

impl<T: FsmTypes> StateHandlers<T> {
    fn slice(handlers: &PolarityHandlers<T>, state: StateName) -> Self {
        Self {
            events: handlers.events.slice(state),
            patterns: handlers.patterns.slice(state),
        }
    }
}

/// Everything one state needs at run time: hooks and direct handlers.
pub struct StateDef<T: FsmTypes> {
    pub(crate) on_entry: Option<StateChangeHandler<T>>,
    pub(crate) on_exit: Option<StateChangeHandler<T>>,
    pub(crate) positive: StateHandlers<T>,
    pub(crate) negative: StateHandlers<T>,
}

impl<T: FsmTypes> StateDef<T> {
    pub(crate) fn handlers(&self, polarity: Polarity) -> &StateHandlers<T> {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    /// Check if the state has a direct handler for `kind`.
    pub fn handles_event(&self, polarity: Polarity, kind: EventKind<T>) -> bool {
        self.handlers(polarity).events.contains_key(&kind)
    }

    /// Check if the state has a direct handler for the pattern `key`.
    pub fn handles_pattern(&self, polarity: Polarity, key: PatternKey<T>) -> bool {
        self.handlers(polarity).patterns.contains_key(&key)
    }

    pub fn has_entry_hook(&self) -> bool {
        self.on_entry.is_some()
    }

    pub fn has_exit_hook(&self) -> bool {
        self.on_exit.is_some()
    }
}

/// Per-kind fallbacks for one polarity.
struct Fallbacks<T: FsmTypes> {
    events: HashMap<EventKind<T>, EventHandler<T>>,
    patterns: HashMap<PatternKey<T>, PatternHandler<T>>,
}

impl<T: FsmTypes> Fallbacks<T> {
    fn from_handlers(handlers: &PolarityHandlers<T>) -> Self {
        Self {
            events: handlers.events.fallbacks().clone(),
            patterns: handlers.patterns.fallbacks().clone(),
        }
    }
}

#[derive(Serialize)]
struct Description<'a> {
    name: &'a str,
    id: FsmDefId,
    states: Vec<StateName>,
    transitions: &'a TransitionTable,
}

/// A validated machine definition shared by every instance.
///
/// Created with [`MachineDef::compile`] from a structural and a semantic
/// definition. Once compiled nothing about it can change.
pub struct MachineDef<T: FsmTypes> {
    name: String,
    id: FsmDefId,
    table: TransitionTable,
    states: BTreeMap<StateName, StateDef<T>>,
    default_event: EventHandler<T>,
    default_pattern: PatternHandler<T>,
    positive: Fallbacks<T>,
    negative: Fallbacks<T>,
    ports: Vec<PortEvents<T>>,
}

impl<T: FsmTypes> MachineDef<T> {
    /// Validate both halves of a definition and compile them.
    ///
    /// Every problem is reported at once: violations recorded by the
    /// builders plus the transition-table invariants (a `START` edge, a
    /// `FINAL` edge, no dead ends other than `FINAL`) and handlers
    /// subscribed to undeclared states.
    pub fn compile(
        name: impl Into<String>,
        structural: StructuralDefinition<T>,
        semantic: SemanticDefinition<T>,
    ) -> Result<Self, FsmError> {
        let name = name.into();

        if let Validation::Failure(errors) = validate(&structural, &semantic) {
            let violations: Vec<DefinitionViolation> = errors.iter().cloned().collect();
            tracing::debug!(machine = %name, count = violations.len(), "definition rejected");
            return Err(FsmError::InvalidDefinition {
                machine: name,
                violations,
            });
        }

        let reachable = structural.table.reachable_from_start();
        for state in structural.states.keys() {
            if !reachable.contains(state) {
                tracing::warn!(machine = %name, %state, "state is not reachable from START");
            }
        }

        let states = structural
            .states
            .into_iter()
            .map(|(state, hooks)| {
                let StateHooks { on_entry, on_exit } = hooks;
                let def = StateDef {
                    on_entry,
                    on_exit,
                    positive: StateHandlers::slice(&semantic.positive, state),
                    negative: StateHandlers::slice(&semantic.negative, state),
                };
                (state, def)
            })
            .collect();

        let id = FsmDefId::from_name(&name);
        tracing::debug!(
            machine = %name,
            %id,
            edges = structural.table.len(),
            "definition compiled"
        );

        Ok(Self {
            id,
            table: structural.table,
            states,
            positive: Fallbacks::from_handlers(&semantic.positive),
            negative: Fallbacks::from_handlers(&semantic.negative),
            default_event: semantic.default_event,
            default_pattern: semantic.default_pattern,
            ports: semantic.ports,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> FsmDefId {
        self.id
    }

    /// Instance id of `base` under this definition.
    pub fn fsm_id(&self, base: T::BaseId) -> FsmId<T::BaseId> {
        self.id.fsm_id(base)
    }

    pub fn transition_table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn has_transition(&self, from: StateName, to: StateName) -> bool {
        self.table.contains(from, to)
    }

    /// All states of the machine, `FINAL` included, in sorted order.
    pub fn state_names(&self) -> Vec<StateName> {
        let mut names: BTreeSet<StateName> = self.states.keys().copied().collect();
        names.insert(StateName::FINAL);
        names.into_iter().collect()
    }

    /// Run-time view of a declared state. `FINAL` has none.
    pub fn state(&self, name: StateName) -> Option<FsmState<'_, T>> {
        self.states.get(&name).map(|def| FsmState::new(name, def))
    }

    /// Host wiring: the kinds expected per port and polarity.
    pub fn port_events(&self) -> &[PortEvents<T>] {
        &self.ports
    }

    /// Create a new instance in `START`.
    pub fn build(self: &Arc<Self>, base: T::BaseId, internal: T::Internal) -> Machine<T> {
        Machine::new(Arc::clone(self), self.fsm_id(base), internal)
    }

    /// Describe the machine's states and transitions as JSON.
    pub fn to_json(&self) -> Result<String, FsmError> {
        let description = Description {
            name: &self.name,
            id: self.id,
            states: self.state_names(),
            transitions: &self.table,
        };
        Ok(serde_json::to_string_pretty(&description)?)
    }

    pub(crate) fn event_fallback(
        &self,
        polarity: Polarity,
        kind: EventKind<T>,
    ) -> Option<&EventHandler<T>> {
        self.fallbacks(polarity).events.get(&kind)
    }

    pub(crate) fn pattern_fallback(
        &self,
        polarity: Polarity,
        key: PatternKey<T>,
    ) -> Option<&PatternHandler<T>> {
        self.fallbacks(polarity).patterns.get(&key)
    }

    pub(crate) fn default_event(&self) -> &EventHandler<T> {
        &self.default_event
    }

    pub(crate) fn default_pattern(&self) -> &PatternHandler<T> {
        &self.default_pattern
    }

    fn fallbacks(&self, polarity: Polarity) -> &Fallbacks<T> {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }
}

/// Gather every violation of a definition pair.
fn validate<T: FsmTypes>(
    structural: &StructuralDefinition<T>,
    semantic: &SemanticDefinition<T>,
) -> Check {
    let table = &structural.table;
    let mut checks: Vec<Check> = Vec::new();

    checks.extend(recorded(structural.violations()));

    checks.push(if table.contains_row(StateName::START) {
        Validation::success(())
    } else {
        Validation::fail(DefinitionViolation::MissingStart)
    });

    checks.push(if table.contains_column(StateName::FINAL) {
        Validation::success(())
    } else {
        Validation::fail(DefinitionViolation::MissingFinal)
    });

    let dead_ends: Vec<StateName> = table
        .dead_ends()
        .into_iter()
        .filter(|state| !state.is_final())
        .collect();
    checks.push(if dead_ends.is_empty() {
        Validation::success(())
    } else {
        Validation::fail(DefinitionViolation::DeadEndStates { states: dead_ends })
    });

    checks.extend(recorded(semantic.violations()));

    for polarity in [Polarity::Positive, Polarity::Negative] {
        let handlers = semantic.handlers(polarity);
        checks.extend(undeclared(polarity, &handlers.events, structural));
        checks.extend(undeclared(polarity, &handlers.patterns, structural));
    }

    Validation::all_vec(checks).map(|_| ())
}

fn recorded(violations: &[DefinitionViolation]) -> impl Iterator<Item = Check> + '_ {
    violations.iter().cloned().map(Validation::fail)
}

/// Subscriptions to states the structural definition never declared.
fn undeclared<T, K, P, H>(
    polarity: Polarity,
    table: &HandlerTable<K, P, H>,
    structural: &StructuralDefinition<T>,
) -> Vec<Check>
where
    T: FsmTypes,
    K: Copy + Eq + Hash + Debug,
    P: Copy + Eq + Debug,
{
    let mut missing: Vec<(StateName, String)> = table
        .subscriptions()
        .filter(|(_, state)| !structural.states.contains_key(state))
        .map(|(kind, state)| (state, format!("{kind:?}")))
        .collect();
    missing.sort();

    missing
        .into_iter()
        .map(|(state, event)| {
            Validation::fail(DefinitionViolation::HandlerOnUndeclaredState {
                polarity,
                event,
                state,
            })
        })
        .collect()
}

//! Builder for the structural half of a machine: states, edges and hooks.

use crate::builder::error::DefinitionViolation;
use crate::core::{FsmTypes, StateName, TransitionTable};
use crate::machine::StateChangeHandler;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry and exit hooks registered for one state.
pub(crate) struct StateHooks<T: FsmTypes> {
    pub(crate) on_entry: Option<StateChangeHandler<T>>,
    pub(crate) on_exit: Option<StateChangeHandler<T>>,
}

impl<T: FsmTypes> Clone for StateHooks<T> {
    fn clone(&self) -> Self {
        Self {
            on_entry: self.on_entry.clone(),
            on_exit: self.on_exit.clone(),
        }
    }
}

/// Fluent builder for a machine's transition table and per-state hooks.
///
/// Calls never fail. Duplicate states and edges are recorded and reported
/// together with the table invariants when the definition is compiled.
///
/// # Example
///
/// ```rust
/// use multifsm::builder::StructuralDefinition;
/// use multifsm::core::{FsmEvent, FsmTypes, NoPattern, StateName};
///
/// # #[derive(Debug)]
/// # struct Tick;
/// # impl FsmEvent for Tick {
/// #     type Kind = ();
/// #     fn kind(&self) {}
/// # }
/// struct Clock;
///
/// impl FsmTypes for Clock {
///     type Port = ();
///     type Event = Tick;
///     type Container = NoPattern<Tick>;
///     type External = ();
///     type Internal = u32;
///     type BaseId = u32;
/// }
///
/// const RUNNING: StateName = StateName::new("RUNNING");
///
/// let structure = StructuralDefinition::<Clock>::new()
///     .on_start()
///         .next_states([RUNNING])
///         .build_transition()
///     .on_state(RUNNING)
///         .next_states([RUNNING])
///         .to_final()
///         .on_entry(|_from, _to, _es, ticks| *ticks += 1)
///         .build_transition();
///
/// assert!(structure.violations().is_empty());
/// assert_eq!(structure.transition_table().len(), 3);
/// ```
pub struct StructuralDefinition<T: FsmTypes> {
    pub(crate) table: TransitionTable,
    pub(crate) states: BTreeMap<StateName, StateHooks<T>>,
    pub(crate) violations: Vec<DefinitionViolation>,
}

impl<T: FsmTypes> StructuralDefinition<T> {
    /// Create an empty structural definition.
    pub fn new() -> Self {
        Self {
            table: TransitionTable::new(),
            states: BTreeMap::new(),
            violations: Vec::new(),
        }
    }

    /// Start describing the outgoing edges of `START`.
    pub fn on_start(self) -> TransitionBuilder<T> {
        self.on_state(StateName::START)
    }

    /// Start describing the outgoing edges and hooks of `state`.
    pub fn on_state(self, state: StateName) -> TransitionBuilder<T> {
        TransitionBuilder::new(self, state)
    }

    /// Edges registered so far.
    pub fn transition_table(&self) -> &TransitionTable {
        &self.table
    }

    /// Declared states in deterministic order.
    pub fn states(&self) -> impl Iterator<Item = StateName> + '_ {
        self.states.keys().copied()
    }

    /// Problems recorded while building.
    pub fn violations(&self) -> &[DefinitionViolation] {
        &self.violations
    }

    fn build_transition(
        &mut self,
        from: StateName,
        to_states: Vec<StateName>,
        to_final: bool,
        hooks: StateHooks<T>,
    ) {
        if from.is_final() {
            self.violations.push(DefinitionViolation::FinalHasTransitions);
            return;
        }
        if self.states.contains_key(&from) {
            self.violations
                .push(DefinitionViolation::DuplicateState { state: from });
            return;
        }

        let finals = to_final.then_some(StateName::FINAL);
        for to in to_states.into_iter().chain(finals) {
            if !self.table.insert(from, to) {
                self.violations
                    .push(DefinitionViolation::DuplicateTransition { from, to });
            }
        }
        self.states.insert(from, hooks);
    }
}

impl<T: FsmTypes> Default for StructuralDefinition<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one state's outgoing edges and hooks.
pub struct TransitionBuilder<T: FsmTypes> {
    parent: StructuralDefinition<T>,
    from: StateName,
    to_states: Vec<StateName>,
    to_final: bool,
    hooks: StateHooks<T>,
}

impl<T: FsmTypes> TransitionBuilder<T> {
    fn new(parent: StructuralDefinition<T>, from: StateName) -> Self {
        Self {
            parent,
            from,
            to_states: Vec::new(),
            to_final: false,
            hooks: StateHooks {
                on_entry: None,
                on_exit: None,
            },
        }
    }

    /// Add permitted target states.
    pub fn next_states(mut self, states: impl IntoIterator<Item = StateName>) -> Self {
        self.to_states.extend(states);
        self
    }

    /// Permit the terminal transition from this state.
    pub fn to_final(mut self) -> Self {
        self.to_final = true;
        self
    }

    /// Hook run after entering this state.
    pub fn on_entry<F>(mut self, hook: F) -> Self
    where
        F: Fn(StateName, StateName, &mut T::External, &mut T::Internal) + Send + Sync + 'static,
    {
        self.hooks.on_entry = Some(Arc::new(hook));
        self
    }

    /// Hook run before leaving this state.
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(StateName, StateName, &mut T::External, &mut T::Internal) + Send + Sync + 'static,
    {
        self.hooks.on_exit = Some(Arc::new(hook));
        self
    }

    /// Record the edges and hooks, returning to the parent builder.
    pub fn build_transition(self) -> StructuralDefinition<T> {
        let mut parent = self.parent;
        parent.build_transition(self.from, self.to_states, self.to_final, self.hooks);
        parent
    }
}

//! Transition table: the set of permitted `(from, to)` edges.

use super::state::StateName;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Set of ordered state pairs, each present at most once.
///
/// Rows are source states, columns are targets. Ordered collections keep
/// iteration deterministic, so two compilations of the same structure
/// produce identical tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransitionTable {
    rows: BTreeMap<StateName, BTreeSet<StateName>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge. Returns `false` if it was already present.
    pub fn insert(&mut self, from: StateName, to: StateName) -> bool {
        self.rows.entry(from).or_default().insert(to)
    }

    pub fn contains(&self, from: StateName, to: StateName) -> bool {
        self.rows.get(&from).is_some_and(|targets| targets.contains(&to))
    }

    /// Check if `state` has at least one outgoing edge.
    pub fn contains_row(&self, state: StateName) -> bool {
        self.rows.get(&state).is_some_and(|targets| !targets.is_empty())
    }

    /// Check if `state` is the target of at least one edge.
    pub fn contains_column(&self, state: StateName) -> bool {
        self.rows.values().any(|targets| targets.contains(&state))
    }

    /// States with at least one outgoing edge.
    pub fn sources(&self) -> BTreeSet<StateName> {
        self.rows
            .iter()
            .filter(|(_, targets)| !targets.is_empty())
            .map(|(from, _)| *from)
            .collect()
    }

    /// States that are the target of at least one edge.
    pub fn targets(&self) -> BTreeSet<StateName> {
        self.rows.values().flatten().copied().collect()
    }

    /// Targets reachable in one step from `from`.
    pub fn next_states(&self, from: StateName) -> impl Iterator<Item = StateName> + '_ {
        self.rows.get(&from).into_iter().flatten().copied()
    }

    /// All edges in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (StateName, StateName)> + '_ {
        self.rows
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    /// Targets that have no outgoing edge of their own.
    pub fn dead_ends(&self) -> BTreeSet<StateName> {
        let sources = self.sources();
        self.targets()
            .into_iter()
            .filter(|state| !sources.contains(state))
            .collect()
    }

    /// States reachable from `START`, including `START` itself.
    pub fn reachable_from_start(&self) -> BTreeSet<StateName> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![StateName::START];
        while let Some(state) = pending.pop() {
            if seen.insert(state) {
                pending.extend(self.next_states(state));
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

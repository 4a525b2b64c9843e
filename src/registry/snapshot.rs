//! Point-in-time view of a running instance.

use crate::core::{FsmId, FsmTypes, StateName, StateTransition};
use crate::machine::Machine;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Serializable copy of one instance's id, state, internal state and
/// recent history.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot<B, I> {
    pub id: FsmId<B>,
    pub machine: String,
    pub state: StateName,
    pub internal: I,
    pub history: Vec<StateTransition>,
    pub created_at: DateTime<Utc>,
    pub taken_at: DateTime<Utc>,
}

impl<B, I> InstanceSnapshot<B, I> {
    /// Time the instance has been alive when the snapshot was taken.
    pub fn age(&self) -> chrono::Duration {
        self.taken_at - self.created_at
    }
}

impl<T> From<&Machine<T>> for InstanceSnapshot<T::BaseId, T::Internal>
where
    T: FsmTypes,
    T::Internal: Clone,
{
    fn from(machine: &Machine<T>) -> Self {
        Self {
            id: *machine.id(),
            machine: machine.definition().name().to_string(),
            state: machine.state(),
            internal: machine.internal().clone(),
            history: machine.history().transitions().cloned().collect(),
            created_at: machine.created_at(),
            taken_at: Utc::now(),
        }
    }
}

//! Per-instance transition history.
//!
//! Every running instance keeps a bounded, ordered record of the state
//! changes it went through. The history is for introspection only; it
//! never influences handler resolution.

use super::state::StateName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use multifsm::core::{StateName, StateTransition};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: StateName::START,
///     to: StateName::new("RUNNING"),
///     timestamp: Utc::now(),
///     trigger: "Start".to_string(),
/// };
/// assert_eq!(transition.to.as_str(), "RUNNING");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateTransition {
    /// The state being transitioned from
    pub from: StateName,
    /// The state being transitioned to
    pub to: StateName,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// Debug rendering of the event kind that caused it
    pub trigger: String,
}

/// Ordered, bounded history of state transitions.
///
/// Once `limit` transitions are held, recording a new one discards the
/// oldest. A limit of zero disables recording.
///
/// # Example
///
/// ```rust
/// use multifsm::core::{StateHistory, StateName, StateTransition};
/// use chrono::Utc;
///
/// const MIDDLE: StateName = StateName::new("MIDDLE");
/// const END: StateName = StateName::new("END");
///
/// let mut history = StateHistory::with_limit(8);
/// history.record(StateTransition {
///     from: StateName::START,
///     to: MIDDLE,
///     timestamp: Utc::now(),
///     trigger: "Go".to_string(),
/// });
/// history.record(StateTransition {
///     from: MIDDLE,
///     to: END,
///     timestamp: Utc::now(),
///     trigger: "Stop".to_string(),
/// });
///
/// let path = history.get_path();
/// assert_eq!(path, vec![StateName::START, MIDDLE, END]);
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct StateHistory {
    transitions: VecDeque<StateTransition>,
    #[serde(skip)]
    limit: usize,
}

impl StateHistory {
    /// Create an empty history holding at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Record a transition, discarding the oldest one when full.
    pub fn record(&mut self, transition: StateTransition) {
        if self.limit == 0 {
            return;
        }
        if self.transitions.len() == self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest retained transition, then the
    /// `to` state of each transition in order.
    pub fn get_path(&self) -> Vec<StateName> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Calculate total duration from first to last retained transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all retained transitions, oldest first.
    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition> + '_ {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

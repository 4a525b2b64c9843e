//! Violations detected while compiling structural and semantic definitions.

use crate::core::{Polarity, StateName};
use thiserror::Error;

/// A single reason a machine definition was rejected.
///
/// Event kinds and port types are rendered with their `Debug` output so the
/// violation does not carry the machine's type parameters.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionViolation {
    #[error("state '{state}' already registered")]
    DuplicateState { state: StateName },

    #[error("transition from '{from}' to '{to}' already registered")]
    DuplicateTransition { from: StateName, to: StateName },

    #[error("FINAL cannot have outgoing transitions or hooks")]
    FinalHasTransitions,

    #[error("START state not defined. Call .on_start() with at least one next state")]
    MissingStart,

    #[error("FINAL state not defined. Call .to_final() on at least one state")]
    MissingFinal,

    #[error("states {states:?} are dead end states. Only FINAL allowed as dead end state")]
    DeadEndStates { states: Vec<StateName> },

    #[error("{polarity} handler already registered for state '{state}' event {event}")]
    DuplicateHandler {
        polarity: Polarity,
        event: String,
        state: StateName,
    },

    #[error("{polarity} fallback already registered for event {event}")]
    DuplicateFallback { polarity: Polarity, event: String },

    #[error("{polarity} event {event} registered on port {first} and port {second}")]
    CrossPortCollision {
        polarity: Polarity,
        event: String,
        first: String,
        second: String,
    },

    #[error("{polarity} handler for event {event} subscribed to FINAL")]
    HandlerOnFinal { polarity: Polarity, event: String },

    #[error("{polarity} handler for event {event} subscribed to undeclared state '{state}'")]
    HandlerOnUndeclaredState {
        polarity: Polarity,
        event: String,
        state: StateName,
    },
}

//! Compiled definitions and the per-instance engine that runs them.

mod definition;
mod engine;
mod handler;
mod state;

pub use definition::{MachineDef, StateDef};
pub use engine::{Machine, Outcome, DEFAULT_HISTORY_LIMIT};
pub use handler::{
    log_unhandled_event, log_unhandled_pattern, EventHandler, HandlerResult, PatternHandler,
    StateChangeHandler,
};
pub use state::FsmState;

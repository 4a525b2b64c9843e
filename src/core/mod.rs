//! Core value types shared by builders, definitions and the registry.
//!
//! - State names and the reserved `START`/`FINAL` markers
//! - The event model: kinds, pattern containers, polarity
//! - Definition and instance identifiers
//! - The transition table
//! - Bounded per-instance history
//!
//! Nothing in this module runs handlers or performs side effects.

mod event;
mod history;
mod id;
mod state;
mod table;

pub use event::{
    ContainerKind, EventKind, FsmEvent, FsmTypes, NoPattern, PatternContainer, PatternKey,
    Polarity,
};
pub use history::{StateHistory, StateTransition};
pub use id::{FsmDefId, FsmId};
pub use state::StateName;
pub use table::TransitionTable;

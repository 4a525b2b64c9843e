//! Handler signatures used by definitions and the runtime engine.
//!
//! Handlers are stored behind `Arc` so one closure can be subscribed to
//! many states and shared by every instance of a definition.

use crate::core::{FsmTypes, StateName};
use crate::error::FsmError;
use std::sync::Arc;

/// Next state chosen by a handler, or the reason it failed.
pub type HandlerResult = Result<StateName, FsmError>;

/// Handler for a plain event.
///
/// Receives the current state, the shared external state, the instance's
/// internal state and the event.
pub type EventHandler<T> = Arc<
    dyn Fn(
            StateName,
            &mut <T as FsmTypes>::External,
            &mut <T as FsmTypes>::Internal,
            &<T as FsmTypes>::Event,
        ) -> HandlerResult
        + Send
        + Sync,
>;

/// Handler for a payload extracted from a pattern container.
pub type PatternHandler<T> = Arc<
    dyn Fn(
            StateName,
            &mut <T as FsmTypes>::External,
            &mut <T as FsmTypes>::Internal,
            &<T as FsmTypes>::Event,
            &<T as FsmTypes>::Container,
        ) -> HandlerResult
        + Send
        + Sync,
>;

/// Entry/exit hook. Receives `(from, to)` of the transition in progress.
pub type StateChangeHandler<T> = Arc<
    dyn Fn(StateName, StateName, &mut <T as FsmTypes>::External, &mut <T as FsmTypes>::Internal)
        + Send
        + Sync,
>;

/// Machine-wide last resort for plain events: log and stay.
pub fn log_unhandled_event<T: FsmTypes>() -> EventHandler<T> {
    Arc::new(|state: StateName, _: &mut T::External, _: &mut T::Internal, event: &T::Event| {
        tracing::info!(%state, ?event, "state does not handle event");
        Ok(state)
    })
}

/// Machine-wide last resort for pattern events: log and stay.
pub fn log_unhandled_pattern<T: FsmTypes>() -> PatternHandler<T> {
    Arc::new(
        |state: StateName,
         _: &mut T::External,
         _: &mut T::Internal,
         _: &T::Event,
         container: &T::Container| {
            tracing::info!(%state, ?container, "state does not handle container");
            Ok(state)
        },
    )
}

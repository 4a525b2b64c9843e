//! Handling of run-time errors raised while an instance processes an event.

use crate::core::FsmId;
use crate::error::FsmError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// What the registry does with an instance whose event failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Keep the instance in the state it was in before the event.
    KeepInstance,
    /// Discard the instance; the next event for its key starts a fresh one.
    DropInstance,
}

/// Receives errors raised by handlers and transitions.
///
/// Returning `Err` hands the error back to the caller of the dispatch
/// method. Returning `Ok` absorbs it and the dispatch reports
/// [`Outcome::Failed`](crate::machine::Outcome::Failed).
pub trait OnFsmException<B> {
    fn handle(&mut self, fsm: &FsmId<B>, error: FsmError) -> Result<Recovery, FsmError>;
}

impl<B, F> OnFsmException<B> for F
where
    F: FnMut(&FsmId<B>, FsmError) -> Result<Recovery, FsmError>,
{
    fn handle(&mut self, fsm: &FsmId<B>, error: FsmError) -> Result<Recovery, FsmError> {
        self(fsm, error)
    }
}

/// Built-in exception policies, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionPolicy {
    /// Return the error to the caller. The instance is kept.
    #[default]
    Rethrow,
    /// Log the error and discard the instance.
    LogAndDrop,
    /// Log the error and keep the instance.
    LogAndKeep,
}

impl<B: Debug> OnFsmException<B> for ExceptionPolicy {
    fn handle(&mut self, fsm: &FsmId<B>, error: FsmError) -> Result<Recovery, FsmError> {
        match self {
            Self::Rethrow => Err(error),
            Self::LogAndDrop => {
                tracing::error!(%fsm, %error, "fsm failed, dropping instance");
                Ok(Recovery::DropInstance)
            }
            Self::LogAndKeep => {
                tracing::error!(%fsm, %error, "fsm failed, keeping instance");
                Ok(Recovery::KeepInstance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FsmDefId;

    fn fsm() -> FsmId<u32> {
        FsmDefId::from_name("ping").fsm_id(3)
    }

    #[test]
    fn rethrow_returns_the_error() {
        let result = ExceptionPolicy::Rethrow.handle(&fsm(), FsmError::handler("boom"));

        assert!(matches!(result, Err(FsmError::Handler { ref reason }) if reason == "boom"));
    }

    #[test]
    fn soft_policies_choose_recovery() {
        assert_eq!(
            ExceptionPolicy::LogAndDrop
                .handle(&fsm(), FsmError::handler("boom"))
                .unwrap(),
            Recovery::DropInstance
        );
        assert_eq!(
            ExceptionPolicy::LogAndKeep
                .handle(&fsm(), FsmError::handler("boom"))
                .unwrap(),
            Recovery::KeepInstance
        );
    }

    #[test]
    fn closures_are_policies() {
        let mut seen = Vec::new();
        let mut policy = |fsm: &FsmId<u32>, error: FsmError| -> Result<Recovery, FsmError> {
            seen.push((fsm.base, error.to_string()));
            Ok(Recovery::KeepInstance)
        };

        let recovery = policy.handle(&fsm(), FsmError::handler("late"));

        assert_eq!(recovery.unwrap(), Recovery::KeepInstance);
        assert_eq!(seen, vec![(3, "handler failed: late".to_string())]);
    }

    #[test]
    fn policy_names_are_snake_case() {
        let policy: ExceptionPolicy = serde_json::from_str("\"log_and_keep\"").unwrap();
        assert_eq!(policy, ExceptionPolicy::LogAndKeep);
    }
}

//! Crate error types.

use crate::builder::DefinitionViolation;
use thiserror::Error;

/// Errors raised while defining or running state machines.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("invalid machine definition '{machine}': {}", render_violations(.violations))]
    InvalidDefinition {
        machine: String,
        violations: Vec<DefinitionViolation>,
    },

    #[error("internal state builder already registered for {def}")]
    DefinitionAlreadyRegistered { def: String },

    #[error("no internal state builder registered for {def}")]
    UnregisteredDefinition { def: String },

    #[error("{fsm} transition from '{from}' to '{to}' not defined")]
    UndefinedTransition {
        fsm: String,
        from: String,
        to: String,
    },

    #[error("{fsm} is in undeclared state '{state}'")]
    UnknownState { fsm: String, state: String },

    #[error("handler failed: {reason}")]
    Handler { reason: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl FsmError {
    /// Error for handler code to return when it cannot proceed.
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler {
            reason: reason.into(),
        }
    }

    /// Returns whether this error was raised while building a definition.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDefinition { .. }
                | Self::DefinitionAlreadyRegistered { .. }
                | Self::UnregisteredDefinition { .. }
        )
    }

    /// Violations carried by an `InvalidDefinition` error.
    pub fn violations(&self) -> &[DefinitionViolation] {
        match self {
            Self::InvalidDefinition { violations, .. } => violations,
            _ => &[],
        }
    }
}

fn render_violations(violations: &[DefinitionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateName;

    #[test]
    fn invalid_definition_lists_every_violation() {
        let err = FsmError::InvalidDefinition {
            machine: "ping".to_string(),
            violations: vec![
                DefinitionViolation::MissingStart,
                DefinitionViolation::DuplicateState {
                    state: StateName::new("A"),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.starts_with("invalid machine definition 'ping': "));
        assert!(message.contains("START"));
        assert!(message.contains("state 'A' already registered"));
        assert_eq!(err.violations().len(), 2);
        assert!(err.is_definition_error());
    }

    #[test]
    fn handler_error_is_runtime() {
        let err = FsmError::handler("peer vanished");
        assert_eq!(err.to_string(), "handler failed: peer vanished");
        assert!(!err.is_definition_error());
        assert!(err.violations().is_empty());
    }
}

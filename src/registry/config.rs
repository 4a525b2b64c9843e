//! Registry configuration.

use crate::error::FsmError;
use crate::machine::DEFAULT_HISTORY_LIMIT;
use crate::registry::exception::ExceptionPolicy;
use serde::{Deserialize, Serialize};

/// Tunables for a [`MultiFsm`](crate::registry::MultiFsm).
///
/// Every field has a default, so a partial document is enough:
///
/// ```rust
/// use multifsm::registry::{ExceptionPolicy, MultiFsmConfig};
///
/// let config = MultiFsmConfig::from_json(r#"{ "exception_policy": "log_and_drop" }"#).unwrap();
/// assert_eq!(config.exception_policy, ExceptionPolicy::LogAndDrop);
/// assert_eq!(config.log_prefix, "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiFsmConfig {
    /// Prepended to every registry log line, typically the component name.
    pub log_prefix: String,
    /// Transitions kept per instance. Zero disables history.
    pub history_limit: usize,
    /// What to do when a handler or transition fails.
    pub exception_policy: ExceptionPolicy,
}

impl Default for MultiFsmConfig {
    fn default() -> Self {
        Self {
            log_prefix: String::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            exception_policy: ExceptionPolicy::default(),
        }
    }
}

impl MultiFsmConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, FsmError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_exception_policy(mut self, policy: ExceptionPolicy) -> Self {
        self.exception_policy = policy;
        self
    }
}

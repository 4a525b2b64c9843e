//! State names for state machine definitions.
//!
//! A machine's states are identified by opaque, copyable tokens. Two
//! names are reserved: [`StateName::START`], where every instance begins,
//! and [`StateName::FINAL`], the terminal marker that only ever appears
//! as a transition target.

use serde::Serialize;
use std::fmt;

/// Identity of a state within a machine definition.
///
/// State names are cheap to copy, comparable and hashable, so they can be
/// used directly as keys in transition and handler tables.
///
/// # Example
///
/// ```rust
/// use multifsm::core::StateName;
///
/// const WAIT_PONG: StateName = StateName::new("WAIT_PONG");
///
/// assert_eq!(WAIT_PONG.as_str(), "WAIT_PONG");
/// assert!(!WAIT_PONG.is_final());
/// assert!(StateName::FINAL.is_final());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StateName(&'static str);

impl StateName {
    /// The state every instance starts in.
    pub const START: StateName = StateName("START");

    /// Terminal marker. Reaching it tears the instance down.
    pub const FINAL: StateName = StateName("FINAL");

    /// Create a state name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Get the name for display/logging.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Check if this is the initial state.
    pub fn is_start(&self) -> bool {
        *self == Self::START
    }

    /// Check if this is the terminal marker.
    pub fn is_final(&self) -> bool {
        *self == Self::FINAL
    }
}

impl fmt::Debug for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

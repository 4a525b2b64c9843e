//! Identifiers for machine definitions and running instances.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Namespace for deriving definition ids from machine names.
const FSM_DEF_NAMESPACE: Uuid = Uuid::from_u128(0x6d75_6c74_6966_736d_8000_0000_6466_6964);

/// Identifier of a compiled machine definition.
///
/// Derived deterministically from the machine name, so every component
/// that compiles the same machine agrees on its id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FsmDefId(Uuid);

impl FsmDefId {
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&FSM_DEF_NAMESPACE, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Instance id for the given base id under this definition.
    pub fn fsm_id<B>(&self, base: B) -> FsmId<B> {
        FsmId { def: *self, base }
    }
}

impl fmt::Debug for FsmDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fsm,md:{}>", self.0.simple())
    }
}

impl fmt::Display for FsmDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifier of one running instance: definition id plus base id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FsmId<B> {
    pub def: FsmDefId,
    pub base: B,
}

impl<B> FsmId<B> {
    pub fn new(def: FsmDefId, base: B) -> Self {
        Self { def, base }
    }
}

impl<B: fmt::Debug> fmt::Debug for FsmId<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fsm,md:{},bid:{:?}>", self.def.0.simple(), self.base)
    }
}

impl<B: fmt::Debug> fmt::Display for FsmId<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

//! Factories for the internal state of new instances.

use crate::core::{FsmDefId, FsmId, FsmTypes};
use crate::error::FsmError;
use std::collections::HashMap;

/// Builds the internal state of a fresh instance from its id.
pub type InternalStateBuilder<T> =
    Box<dyn Fn(&FsmId<<T as FsmTypes>::BaseId>) -> <T as FsmTypes>::Internal + Send + Sync>;

/// Internal-state factories keyed by definition id.
///
/// # Example
///
/// ```rust
/// use multifsm::core::{FsmDefId, FsmEvent, FsmTypes, NoPattern};
/// use multifsm::registry::InternalStateBuilders;
///
/// # #[derive(Debug)]
/// # struct Tick;
/// # impl FsmEvent for Tick {
/// #     type Kind = ();
/// #     fn kind(&self) {}
/// # }
/// struct Counter;
///
/// impl FsmTypes for Counter {
///     type Port = ();
///     type Event = Tick;
///     type Container = NoPattern<Tick>;
///     type External = ();
///     type Internal = (u32, usize);
///     type BaseId = u32;
/// }
///
/// let def = FsmDefId::from_name("counter");
/// let mut builders = InternalStateBuilders::<Counter>::new();
/// builders.register(def, |id| (id.base, 0)).unwrap();
///
/// assert_eq!(builders.new_internal_state(&def.fsm_id(9)).unwrap(), (9, 0));
/// assert!(builders.register(def, |_| (0, 0)).is_err());
/// ```
pub struct InternalStateBuilders<T: FsmTypes> {
    builders: HashMap<FsmDefId, InternalStateBuilder<T>>,
}

impl<T: FsmTypes> InternalStateBuilders<T> {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register the factory for `def`. Each definition gets exactly one.
    pub fn register<F>(&mut self, def: FsmDefId, builder: F) -> Result<(), FsmError>
    where
        F: Fn(&FsmId<T::BaseId>) -> T::Internal + Send + Sync + 'static,
    {
        if self.builders.contains_key(&def) {
            return Err(FsmError::DefinitionAlreadyRegistered {
                def: def.to_string(),
            });
        }
        self.builders.insert(def, Box::new(builder));
        Ok(())
    }

    /// Build the internal state of the instance `fsm`.
    pub fn new_internal_state(&self, fsm: &FsmId<T::BaseId>) -> Result<T::Internal, FsmError> {
        let builder = self
            .builders
            .get(&fsm.def)
            .ok_or_else(|| FsmError::UnregisteredDefinition {
                def: fsm.def.to_string(),
            })?;
        Ok(builder(fsm))
    }

    pub fn contains(&self, def: FsmDefId) -> bool {
        self.builders.contains_key(&def)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl<T: FsmTypes> Default for InternalStateBuilders<T> {
    fn default() -> Self {
        Self::new()
    }
}

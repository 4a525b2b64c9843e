//! Multi-instance registry.
//!
//! A [`MultiFsm`] hosts many instances of one machine definition inside a
//! single event-processing component. Each event is routed to the instance
//! named by its base id, which is extracted from the event itself. Instances
//! are created on the first event for a key and removed as soon as one of
//! their handlers answers `FINAL`.
//!
//! The registry owns the component's external state and lends it to the
//! instance handling the current event. All methods take `&mut self`, so one
//! event is fully processed before the next one starts.

mod builders;
mod config;
mod exception;
mod setup;
mod snapshot;

pub use builders::{InternalStateBuilder, InternalStateBuilders};
pub use config::MultiFsmConfig;
pub use exception::{ExceptionPolicy, OnFsmException, Recovery};
pub use setup::{subscribe_all, PortSubscriber};
pub use snapshot::InstanceSnapshot;

use crate::builder::PortEvents;
use crate::core::{FsmId, FsmTypes, PatternContainer, Polarity, StateHistory, StateName};
use crate::error::FsmError;
use crate::machine::{Machine, MachineDef, Outcome};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Extracts the instance base id from an event, if it carries one.
pub type IdExtractor<T> =
    Box<dyn Fn(&<T as FsmTypes>::Event) -> Option<<T as FsmTypes>::BaseId> + Send + Sync>;

type ExceptionHandler<T> = Box<dyn OnFsmException<<T as FsmTypes>::BaseId> + Send>;

/// Registry of running instances of one machine definition.
pub struct MultiFsm<T: FsmTypes> {
    def: Arc<MachineDef<T>>,
    external: T::External,
    extractor: IdExtractor<T>,
    builders: InternalStateBuilders<T>,
    on_exception: ExceptionHandler<T>,
    config: MultiFsmConfig,
    machines: HashMap<FsmId<T::BaseId>, Machine<T>>,
}

impl<T: FsmTypes> MultiFsm<T> {
    /// Start building a registry for `def`.
    ///
    /// `extractor` names the instance an event belongs to; events for
    /// which it returns `None` are dropped.
    pub fn builder<F>(
        def: impl Into<Arc<MachineDef<T>>>,
        external: T::External,
        extractor: F,
    ) -> MultiFsmBuilder<T>
    where
        F: Fn(&T::Event) -> Option<T::BaseId> + Send + Sync + 'static,
    {
        MultiFsmBuilder {
            def: def.into(),
            external,
            extractor: Box::new(extractor),
            internal_state: None,
            builders: InternalStateBuilders::new(),
            on_exception: None,
            config: MultiFsmConfig::default(),
        }
    }

    /// Deliver a plain event received on the positive side of a port.
    pub fn handle_positive(&mut self, event: &T::Event) -> Result<Outcome, FsmError> {
        self.dispatch(Polarity::Positive, event)
    }

    /// Deliver a plain event received on the negative side of a port.
    pub fn handle_negative(&mut self, event: &T::Event) -> Result<Outcome, FsmError> {
        self.dispatch(Polarity::Negative, event)
    }

    pub fn handle_positive_pattern(
        &mut self,
        container: &T::Container,
    ) -> Result<Outcome, FsmError> {
        self.dispatch_pattern(Polarity::Positive, container)
    }

    pub fn handle_negative_pattern(
        &mut self,
        container: &T::Container,
    ) -> Result<Outcome, FsmError> {
        self.dispatch_pattern(Polarity::Negative, container)
    }

    /// Route a plain event to its instance, creating the instance if needed.
    pub fn dispatch(&mut self, polarity: Polarity, event: &T::Event) -> Result<Outcome, FsmError> {
        let Some(base) = (self.extractor)(event) else {
            tracing::warn!("{}fsm did not handle event:{:?}", self.config.log_prefix, event);
            return Ok(Outcome::Dropped);
        };
        let id = self.def.fsm_id(base);

        let result = instance(&mut self.machines, &self.def, &self.builders, &self.config, id)
            .and_then(|machine| machine.handle_event(polarity, &mut self.external, event));
        self.settle(id, result)
    }

    /// Route a pattern event to the instance named by its payload.
    pub fn dispatch_pattern(
        &mut self,
        polarity: Polarity,
        container: &T::Container,
    ) -> Result<Outcome, FsmError> {
        let Some(base) = (self.extractor)(container.extract_value()) else {
            tracing::warn!("{}fsm did not handle event:{:?}", self.config.log_prefix, container);
            return Ok(Outcome::Dropped);
        };
        let id = self.def.fsm_id(base);

        let result = instance(&mut self.machines, &self.def, &self.builders, &self.config, id)
            .and_then(|machine| machine.handle_pattern(polarity, &mut self.external, container));
        self.settle(id, result)
    }

    /// Current state of the instance for `base`, if it is running.
    pub fn get_state(&self, base: T::BaseId) -> Option<StateName> {
        self.machine(base).map(Machine::state)
    }

    pub fn contains(&self, base: T::BaseId) -> bool {
        self.machines.contains_key(&self.def.fsm_id(base))
    }

    /// Number of running instances.
    pub fn size(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn internal_state(&self, base: T::BaseId) -> Option<&T::Internal> {
        self.machine(base).map(Machine::internal)
    }

    pub fn history(&self, base: T::BaseId) -> Option<&StateHistory> {
        self.machine(base).map(Machine::history)
    }

    /// Copy of the instance for `base`, suitable for serialization.
    pub fn snapshot(&self, base: T::BaseId) -> Option<InstanceSnapshot<T::BaseId, T::Internal>>
    where
        T::Internal: Clone,
    {
        self.machine(base).map(InstanceSnapshot::from)
    }

    /// Ids of all running instances, in no particular order.
    pub fn instance_ids(&self) -> impl Iterator<Item = &FsmId<T::BaseId>> + '_ {
        self.machines.keys()
    }

    /// Remove the instance for `base` without running any hook.
    ///
    /// Instances that never reach `FINAL` stay registered until evicted.
    pub fn evict(&mut self, base: T::BaseId) -> Option<Machine<T>> {
        let id = self.def.fsm_id(base);
        let machine = self.machines.remove(&id)?;
        tracing::info!(
            "{}evicting fsm:{} in state:{}",
            self.config.log_prefix,
            id,
            machine.state()
        );
        Some(machine)
    }

    /// Events and patterns the definition handles, per port and polarity.
    pub fn port_events(&self) -> &[PortEvents<T>] {
        self.def.port_events()
    }

    /// Subscribe the host component to everything this registry handles.
    pub fn setup_handlers<S>(&self, host: &mut S)
    where
        S: PortSubscriber<T> + ?Sized,
    {
        subscribe_all(self.def.port_events(), host, &self.config.log_prefix);
    }

    pub fn definition(&self) -> &Arc<MachineDef<T>> {
        &self.def
    }

    pub fn external(&self) -> &T::External {
        &self.external
    }

    pub fn external_mut(&mut self) -> &mut T::External {
        &mut self.external
    }

    pub fn config(&self) -> &MultiFsmConfig {
        &self.config
    }

    fn machine(&self, base: T::BaseId) -> Option<&Machine<T>> {
        self.machines.get(&self.def.fsm_id(base))
    }

    fn settle(
        &mut self,
        id: FsmId<T::BaseId>,
        result: Result<Outcome, FsmError>,
    ) -> Result<Outcome, FsmError> {
        match result {
            Ok(Outcome::Finished) => {
                self.remove(&id);
                Ok(Outcome::Finished)
            }
            Ok(outcome) => Ok(outcome),
            Err(error) => match self.on_exception.handle(&id, error)? {
                Recovery::DropInstance => {
                    self.remove(&id);
                    Ok(Outcome::Failed)
                }
                Recovery::KeepInstance => Ok(Outcome::Failed),
            },
        }
    }

    fn remove(&mut self, id: &FsmId<T::BaseId>) {
        if self.machines.remove(id).is_some() {
            tracing::info!("{}removing fsm:{}", self.config.log_prefix, id);
        }
    }
}

/// Look up the instance for `id`, creating it in `START` if absent.
fn instance<'m, T: FsmTypes>(
    machines: &'m mut HashMap<FsmId<T::BaseId>, Machine<T>>,
    def: &Arc<MachineDef<T>>,
    builders: &InternalStateBuilders<T>,
    config: &MultiFsmConfig,
    id: FsmId<T::BaseId>,
) -> Result<&'m mut Machine<T>, FsmError> {
    match machines.entry(id) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let internal = builders.new_internal_state(&id)?;
            let machine = def
                .build(id.base, internal)
                .with_history_limit(config.history_limit);
            tracing::info!("{}creating fsm:{}", config.log_prefix, id);
            Ok(entry.insert(machine))
        }
    }
}

/// Builder for [`MultiFsm`].
pub struct MultiFsmBuilder<T: FsmTypes> {
    def: Arc<MachineDef<T>>,
    external: T::External,
    extractor: IdExtractor<T>,
    internal_state: Option<InternalStateBuilder<T>>,
    builders: InternalStateBuilders<T>,
    on_exception: Option<ExceptionHandler<T>>,
    config: MultiFsmConfig,
}

impl<T: FsmTypes> MultiFsmBuilder<T> {
    /// Factory for the internal state of this definition's instances.
    pub fn internal_state<F>(mut self, builder: F) -> Self
    where
        F: Fn(&FsmId<T::BaseId>) -> T::Internal + Send + Sync + 'static,
    {
        self.internal_state = Some(Box::new(builder));
        self
    }

    /// Use a shared registry of internal-state factories.
    pub fn builders(mut self, builders: InternalStateBuilders<T>) -> Self {
        self.builders = builders;
        self
    }

    /// Custom error handling. Overrides the configured exception policy.
    pub fn on_exception<E>(mut self, handler: E) -> Self
    where
        E: OnFsmException<T::BaseId> + Send + 'static,
    {
        self.on_exception = Some(Box::new(handler));
        self
    }

    pub fn config(mut self, config: MultiFsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish the registry.
    ///
    /// Fails if no internal-state factory exists for the definition, or if
    /// one was given both directly and through [`builders`](Self::builders).
    pub fn build(self) -> Result<MultiFsm<T>, FsmError> {
        let mut builders = self.builders;
        if let Some(builder) = self.internal_state {
            builders.register(self.def.id(), builder)?;
        }
        if !builders.contains(self.def.id()) {
            return Err(FsmError::UnregisteredDefinition {
                def: self.def.id().to_string(),
            });
        }

        let on_exception: ExceptionHandler<T> = match self.on_exception {
            Some(handler) => handler,
            None => Box::new(self.config.exception_policy),
        };

        tracing::debug!(
            "{}registry ready for {} ({})",
            self.config.log_prefix,
            self.def.name(),
            self.def.id()
        );

        Ok(MultiFsm {
            def: self.def,
            external: self.external,
            extractor: self.extractor,
            builders,
            on_exception,
            config: self.config,
            machines: HashMap::new(),
        })
    }
}

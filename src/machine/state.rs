//! Run-time view of one state of a compiled machine.

use crate::core::{FsmEvent, FsmTypes, PatternContainer, Polarity, StateName};
use crate::machine::definition::StateDef;
use crate::machine::handler::{EventHandler, HandlerResult, PatternHandler};
use std::fmt;

/// A state together with its compiled hooks and handlers.
///
/// Handler lookups return `None` when the state has no direct handler for
/// the event. That is distinct from `Some(Ok(current))`, which means the
/// handler ran and chose to stay.
pub struct FsmState<'a, T: FsmTypes> {
    name: StateName,
    def: &'a StateDef<T>,
}

impl<'a, T: FsmTypes> FsmState<'a, T> {
    pub(crate) fn new(name: StateName, def: &'a StateDef<T>) -> Self {
        Self { name, def }
    }

    pub fn name(&self) -> StateName {
        self.name
    }

    pub fn def(&self) -> &'a StateDef<T> {
        self.def
    }

    /// Run the entry hook, if any, for a transition from `from`.
    pub fn on_entry(&self, from: StateName, es: &mut T::External, is: &mut T::Internal) {
        if let Some(hook) = &self.def.on_entry {
            hook(from, self.name, es, is);
        }
    }

    /// Run the exit hook, if any, for a transition to `to`.
    pub fn on_exit(&self, to: StateName, es: &mut T::External, is: &mut T::Internal) {
        if let Some(hook) = &self.def.on_exit {
            hook(self.name, to, es, is);
        }
    }

    /// Run the direct handler for `event`, if this state has one.
    pub fn handle_event(
        &self,
        polarity: Polarity,
        es: &mut T::External,
        is: &mut T::Internal,
        event: &T::Event,
    ) -> Option<HandlerResult> {
        let handler = self.def.handlers(polarity).events.get(&event.kind())?;
        Some(handler(self.name, es, is, event))
    }

    /// Run the direct handler for the payload of `container`, if this
    /// state has one.
    pub fn handle_pattern(
        &self,
        polarity: Polarity,
        es: &mut T::External,
        is: &mut T::Internal,
        container: &T::Container,
    ) -> Option<HandlerResult> {
        let key = (container.extract_pattern(), container.container_kind());
        let handler = self.def.handlers(polarity).patterns.get(&key)?;
        Some(handler(self.name, es, is, container.extract_value(), container))
    }

    /// Run a fallback handler as if it were subscribed to this state.
    pub fn fallback_event(
        &self,
        handler: &EventHandler<T>,
        es: &mut T::External,
        is: &mut T::Internal,
        event: &T::Event,
    ) -> HandlerResult {
        handler(self.name, es, is, event)
    }

    pub fn fallback_pattern(
        &self,
        handler: &PatternHandler<T>,
        es: &mut T::External,
        is: &mut T::Internal,
        container: &T::Container,
    ) -> HandlerResult {
        handler(self.name, es, is, container.extract_value(), container)
    }
}

impl<T: FsmTypes> Clone for FsmState<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: FsmTypes> Copy for FsmState<'_, T> {}

impl<T: FsmTypes> fmt::Debug for FsmState<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmState")
            .field("name", &self.name)
            .field("on_entry", &self.def.has_entry_hook())
            .field("on_exit", &self.def.has_exit_hook())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{SemanticDefinition, StructuralDefinition};
    use crate::machine::MachineDef;
    use std::sync::Arc;

    #[derive(Debug)]
    enum Signal {
        Up(u32),
        Down,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum SignalKind {
        Up,
        Down,
    }

    impl FsmEvent for Signal {
        type Kind = SignalKind;

        fn kind(&self) -> SignalKind {
            match self {
                Self::Up(_) => SignalKind::Up,
                Self::Down => SignalKind::Down,
            }
        }
    }

    #[derive(Debug)]
    struct Boxed(Signal);

    impl PatternContainer for Boxed {
        type Content = Signal;
        type Kind = ();

        fn container_kind(&self) {}

        fn extract_value(&self) -> &Signal {
            &self.0
        }
    }

    struct Gauge;

    impl FsmTypes for Gauge {
        type Port = ();
        type Event = Signal;
        type Container = Boxed;
        type External = Vec<String>;
        type Internal = u32;
        type BaseId = u32;
    }

    const HIGH: StateName = StateName::new("HIGH");

    fn gauge() -> MachineDef<Gauge> {
        let structural = StructuralDefinition::<Gauge>::new()
            .on_start()
            .next_states([HIGH])
            .on_exit(|from, to, log: &mut Vec<String>, _| log.push(format!("exit {from}->{to}")))
            .build_transition()
            .on_state(HIGH)
            .to_final()
            .on_entry(|from, to, log: &mut Vec<String>, _| log.push(format!("entry {from}->{to}")))
            .build_transition();
        let semantic = SemanticDefinition::<Gauge>::new()
            .positive_port(())
            .on_event(SignalKind::Up)
            .subscribe(
                |_, _, level: &mut u32, event: &Signal| {
                    if let Signal::Up(by) = event {
                        *level += by;
                    }
                    Ok(HIGH)
                },
                [StateName::START],
            )
            .on_pattern(SignalKind::Down, ())
            .subscribe(|_, _, _, _, _| Ok(StateName::FINAL), [HIGH])
            .build_events();
        MachineDef::compile("gauge", structural, semantic).unwrap()
    }

    #[test]
    fn handle_event_runs_direct_handler() {
        let def = gauge();
        let start = def.state(StateName::START).unwrap();
        let (mut log, mut level) = (Vec::new(), 0);

        let next = start.handle_event(Polarity::Positive, &mut log, &mut level, &Signal::Up(3));

        assert_eq!(next.unwrap().unwrap(), HIGH);
        assert_eq!(level, 3);
    }

    #[test]
    fn missing_handler_is_none() {
        let def = gauge();
        let start = def.state(StateName::START).unwrap();
        let (mut log, mut level) = (Vec::new(), 0);

        assert!(start
            .handle_event(Polarity::Positive, &mut log, &mut level, &Signal::Down)
            .is_none());
        assert!(start
            .handle_event(Polarity::Negative, &mut log, &mut level, &Signal::Up(1))
            .is_none());
        assert!(start
            .handle_pattern(Polarity::Positive, &mut log, &mut level, &Boxed(Signal::Down))
            .is_none());
    }

    #[test]
    fn handle_pattern_matches_payload_and_container() {
        let def = gauge();
        let high = def.state(HIGH).unwrap();
        let (mut log, mut level) = (Vec::new(), 0);

        let next = high.handle_pattern(Polarity::Positive, &mut log, &mut level, &Boxed(Signal::Down));
        assert_eq!(next.unwrap().unwrap(), StateName::FINAL);

        let other = high.handle_pattern(Polarity::Positive, &mut log, &mut level, &Boxed(Signal::Up(1)));
        assert!(other.is_none());
    }

    #[test]
    fn hooks_receive_transition_endpoints() {
        let def = gauge();
        let (mut log, mut level) = (Vec::new(), 0);

        def.state(StateName::START)
            .unwrap()
            .on_exit(HIGH, &mut log, &mut level);
        def.state(HIGH)
            .unwrap()
            .on_entry(StateName::START, &mut log, &mut level);
        def.state(HIGH)
            .unwrap()
            .on_exit(StateName::FINAL, &mut log, &mut level);

        assert_eq!(log, vec!["exit START->HIGH", "entry START->HIGH"]);
    }

    #[test]
    fn fallback_runs_scoped_to_state() {
        let def = gauge();
        let high = def.state(HIGH).unwrap();
        let (mut log, mut level) = (Vec::new(), 0);
        let fallback: EventHandler<Gauge> =
            Arc::new(|state: StateName, log: &mut Vec<String>, _: &mut u32, _: &Signal| {
                log.push(format!("fallback in {state}"));
                Ok(state)
            });

        let next = high.fallback_event(&fallback, &mut log, &mut level, &Signal::Down);

        assert_eq!(next.unwrap(), HIGH);
        assert_eq!(log, vec!["fallback in HIGH"]);
    }
}

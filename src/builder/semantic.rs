//! Builder for the semantic half of a machine: which handler runs for which
//! event kind, in which state, on which port and polarity.

use crate::builder::error::DefinitionViolation;
use crate::core::{ContainerKind, EventKind, FsmTypes, PatternKey, Polarity, StateName};
use crate::machine::{
    log_unhandled_event, log_unhandled_pattern, EventHandler, HandlerResult, PatternHandler,
};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

/// Handlers of one family (plain or pattern) for one polarity.
pub(crate) struct HandlerTable<K, P, H> {
    owners: HashMap<K, P>,
    handlers: HashMap<(K, StateName), H>,
    fallbacks: HashMap<K, H>,
}

impl<K, P, H> HandlerTable<K, P, H>
where
    K: Copy + Eq + Hash + Debug,
    P: Copy + Eq + Debug,
{
    fn new() -> Self {
        Self {
            owners: HashMap::new(),
            handlers: HashMap::new(),
            fallbacks: HashMap::new(),
        }
    }

    /// Bind `kind` to `port`. The first port to claim a kind owns it.
    fn claim(
        &mut self,
        polarity: Polarity,
        kind: K,
        port: P,
        violations: &mut Vec<DefinitionViolation>,
    ) -> bool {
        match self.owners.get(&kind) {
            Some(owner) if *owner != port => {
                violations.push(DefinitionViolation::CrossPortCollision {
                    polarity,
                    event: format!("{kind:?}"),
                    first: format!("{owner:?}"),
                    second: format!("{port:?}"),
                });
                false
            }
            Some(_) => true,
            None => {
                self.owners.insert(kind, port);
                true
            }
        }
    }

    fn subscribe(
        &mut self,
        polarity: Polarity,
        kind: K,
        state: StateName,
        handler: H,
        violations: &mut Vec<DefinitionViolation>,
    ) {
        if state.is_final() {
            violations.push(DefinitionViolation::HandlerOnFinal {
                polarity,
                event: format!("{kind:?}"),
            });
            return;
        }
        if self.handlers.contains_key(&(kind, state)) {
            violations.push(DefinitionViolation::DuplicateHandler {
                polarity,
                event: format!("{kind:?}"),
                state,
            });
            return;
        }
        self.handlers.insert((kind, state), handler);
    }

    fn fallback(
        &mut self,
        polarity: Polarity,
        kind: K,
        handler: H,
        violations: &mut Vec<DefinitionViolation>,
    ) {
        if self.fallbacks.contains_key(&kind) {
            violations.push(DefinitionViolation::DuplicateFallback {
                polarity,
                event: format!("{kind:?}"),
            });
            return;
        }
        self.fallbacks.insert(kind, handler);
    }

    /// Every `(kind, state)` pair with a direct handler.
    pub(crate) fn subscriptions(&self) -> impl Iterator<Item = (K, StateName)> + '_ {
        self.handlers.keys().copied()
    }

    /// Direct handlers subscribed to `state`, keyed by kind.
    pub(crate) fn slice(&self, state: StateName) -> HashMap<K, H>
    where
        H: Clone,
    {
        self.handlers
            .iter()
            .filter(|((_, subscribed), _)| *subscribed == state)
            .map(|((kind, _), handler)| (*kind, handler.clone()))
            .collect()
    }

    pub(crate) fn fallbacks(&self) -> &HashMap<K, H> {
        &self.fallbacks
    }
}

/// Plain and pattern handler tables for one polarity.
pub(crate) struct PolarityHandlers<T: FsmTypes> {
    pub(crate) events: HandlerTable<EventKind<T>, T::Port, EventHandler<T>>,
    pub(crate) patterns: HandlerTable<PatternKey<T>, T::Port, PatternHandler<T>>,
}

impl<T: FsmTypes> PolarityHandlers<T> {
    fn new() -> Self {
        Self {
            events: HandlerTable::new(),
            patterns: HandlerTable::new(),
        }
    }
}

/// Event kinds and pattern keys a machine expects on one port and polarity.
///
/// Hosts use this to subscribe the component to exactly the traffic the
/// machine handles.
pub struct PortEvents<T: FsmTypes> {
    pub port: T::Port,
    pub polarity: Polarity,
    pub events: Vec<EventKind<T>>,
    pub patterns: Vec<PatternKey<T>>,
}

impl<T: FsmTypes> Clone for PortEvents<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port,
            polarity: self.polarity,
            events: self.events.clone(),
            patterns: self.patterns.clone(),
        }
    }
}

impl<T: FsmTypes> Debug for PortEvents<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortEvents")
            .field("port", &self.port)
            .field("polarity", &self.polarity)
            .field("events", &self.events)
            .field("patterns", &self.patterns)
            .finish()
    }
}

/// Fluent builder for a machine's handler tables.
///
/// Like the structural builder, calls never fail. Duplicate handlers,
/// duplicate fallbacks and kinds claimed by two ports of the same polarity
/// are recorded and reported when the definition is compiled.
///
/// # Example
///
/// ```rust
/// use multifsm::builder::SemanticDefinition;
/// use multifsm::core::{FsmEvent, FsmTypes, NoPattern, StateName};
///
/// #[derive(Debug)]
/// enum Net {
///     Ping,
///     Pong,
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum NetKind {
///     Ping,
///     Pong,
/// }
///
/// impl FsmEvent for Net {
///     type Kind = NetKind;
///
///     fn kind(&self) -> NetKind {
///         match self {
///             Self::Ping => NetKind::Ping,
///             Self::Pong => NetKind::Pong,
///         }
///     }
/// }
///
/// struct Pinger;
///
/// impl FsmTypes for Pinger {
///     type Port = &'static str;
///     type Event = Net;
///     type Container = NoPattern<Net>;
///     type External = ();
///     type Internal = u32;
///     type BaseId = u32;
/// }
///
/// const WAITING: StateName = StateName::new("WAITING");
///
/// let semantic = SemanticDefinition::<Pinger>::new()
///     .negative_port("network")
///         .on_event(NetKind::Ping)
///             .subscribe_on_start(|_, _, _, _| Ok(WAITING))
///         .on_event(NetKind::Pong)
///             .subscribe(|_, _, pongs, _| {
///                 *pongs += 1;
///                 Ok(StateName::FINAL)
///             }, [WAITING])
///         .build_events();
///
/// assert!(semantic.violations().is_empty());
/// assert_eq!(semantic.port_events()[0].events, vec![NetKind::Ping, NetKind::Pong]);
/// ```
pub struct SemanticDefinition<T: FsmTypes> {
    pub(crate) positive: PolarityHandlers<T>,
    pub(crate) negative: PolarityHandlers<T>,
    pub(crate) default_event: EventHandler<T>,
    pub(crate) default_pattern: PatternHandler<T>,
    pub(crate) ports: Vec<PortEvents<T>>,
    pub(crate) violations: Vec<DefinitionViolation>,
}

impl<T: FsmTypes> SemanticDefinition<T> {
    pub fn new() -> Self {
        Self {
            positive: PolarityHandlers::new(),
            negative: PolarityHandlers::new(),
            default_event: log_unhandled_event::<T>(),
            default_pattern: log_unhandled_pattern::<T>(),
            ports: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Register handlers for events arriving on the positive side of `port`.
    pub fn positive_port(self, port: T::Port) -> PortBuilder<T> {
        PortBuilder::new(self, port, Polarity::Positive)
    }

    /// Register handlers for events arriving on the negative side of `port`.
    pub fn negative_port(self, port: T::Port) -> PortBuilder<T> {
        PortBuilder::new(self, port, Polarity::Negative)
    }

    /// Replace the machine-wide last-resort handlers.
    ///
    /// They run when neither the current state nor a per-kind fallback
    /// handles an event. Without this call unhandled events are logged and
    /// the state is left unchanged.
    pub fn default_fallback<E, P>(mut self, event_handler: E, pattern_handler: P) -> Self
    where
        E: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event) -> HandlerResult
            + Send
            + Sync
            + 'static,
        P: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event, &T::Container) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.default_event = Arc::new(event_handler);
        self.default_pattern = Arc::new(pattern_handler);
        self
    }

    /// Port wiring in registration order.
    pub fn port_events(&self) -> &[PortEvents<T>] {
        &self.ports
    }

    /// Problems recorded while building.
    pub fn violations(&self) -> &[DefinitionViolation] {
        &self.violations
    }

    pub(crate) fn handlers(&self, polarity: Polarity) -> &PolarityHandlers<T> {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    fn handlers_mut(
        &mut self,
        polarity: Polarity,
    ) -> (&mut PolarityHandlers<T>, &mut Vec<DefinitionViolation>) {
        let handlers = match polarity {
            Polarity::Positive => &mut self.positive,
            Polarity::Negative => &mut self.negative,
        };
        (handlers, &mut self.violations)
    }

    fn port_entry(&mut self, port: T::Port, polarity: Polarity) -> &mut PortEvents<T> {
        let index = match self
            .ports
            .iter()
            .position(|entry| entry.port == port && entry.polarity == polarity)
        {
            Some(index) => index,
            None => {
                self.ports.push(PortEvents {
                    port,
                    polarity,
                    events: Vec::new(),
                    patterns: Vec::new(),
                });
                self.ports.len() - 1
            }
        };
        &mut self.ports[index]
    }

    fn open_event(&mut self, port: T::Port, polarity: Polarity, kind: EventKind<T>) {
        let (handlers, violations) = self.handlers_mut(polarity);
        if !handlers.events.claim(polarity, kind, port, violations) {
            return;
        }
        let entry = self.port_entry(port, polarity);
        if !entry.events.contains(&kind) {
            entry.events.push(kind);
        }
    }

    fn open_pattern(&mut self, port: T::Port, polarity: Polarity, key: PatternKey<T>) {
        let (handlers, violations) = self.handlers_mut(polarity);
        if !handlers.patterns.claim(polarity, key, port, violations) {
            return;
        }
        let entry = self.port_entry(port, polarity);
        if !entry.patterns.contains(&key) {
            entry.patterns.push(key);
        }
    }
}

impl<T: FsmTypes> Default for SemanticDefinition<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the handlers of one port and polarity.
pub struct PortBuilder<T: FsmTypes> {
    parent: SemanticDefinition<T>,
    port: T::Port,
    polarity: Polarity,
}

impl<T: FsmTypes> PortBuilder<T> {
    fn new(parent: SemanticDefinition<T>, port: T::Port, polarity: Polarity) -> Self {
        Self {
            parent,
            port,
            polarity,
        }
    }

    /// Start registering handlers for plain events of `kind`.
    pub fn on_event(mut self, kind: EventKind<T>) -> EventBuilder<T> {
        self.parent.open_event(self.port, self.polarity, kind);
        EventBuilder { port: self, kind }
    }

    /// Start registering handlers for `content` payloads wrapped in
    /// `container` envelopes.
    pub fn on_pattern(
        mut self,
        content: EventKind<T>,
        container: ContainerKind<T>,
    ) -> PatternBuilder<T> {
        let key = (content, container);
        self.parent.open_pattern(self.port, self.polarity, key);
        PatternBuilder { port: self, key }
    }

    pub fn build_port(self) -> SemanticDefinition<T> {
        self.parent
    }
}

/// Builder for the handlers of one plain event kind.
pub struct EventBuilder<T: FsmTypes> {
    port: PortBuilder<T>,
    kind: EventKind<T>,
}

impl<T: FsmTypes> EventBuilder<T> {
    /// Run `handler` when the event arrives in any of `states`.
    pub fn subscribe<F>(mut self, handler: F, states: impl IntoIterator<Item = StateName>) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        let handler: EventHandler<T> = Arc::new(handler);
        let polarity = self.port.polarity;
        let (handlers, violations) = self.port.parent.handlers_mut(polarity);
        for state in states {
            handlers
                .events
                .subscribe(polarity, self.kind, state, handler.clone(), violations);
        }
        self
    }

    /// Run `handler` when the event arrives in `START`.
    pub fn subscribe_on_start<F>(self, handler: F) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(handler, [StateName::START])
    }

    /// Run `handler` when the event arrives in a state without a direct
    /// handler for it.
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        let polarity = self.port.polarity;
        let (handlers, violations) = self.port.parent.handlers_mut(polarity);
        handlers
            .events
            .fallback(polarity, self.kind, Arc::new(handler), violations);
        self
    }

    pub fn build_event(self) -> PortBuilder<T> {
        self.port
    }

    /// Close this event and start the next one on the same port.
    pub fn on_event(self, kind: EventKind<T>) -> EventBuilder<T> {
        self.build_event().on_event(kind)
    }

    /// Close this event and start a pattern on the same port.
    pub fn on_pattern(
        self,
        content: EventKind<T>,
        container: ContainerKind<T>,
    ) -> PatternBuilder<T> {
        self.build_event().on_pattern(content, container)
    }

    /// Close this event and its port.
    pub fn build_events(self) -> SemanticDefinition<T> {
        self.build_event().build_port()
    }
}

/// Builder for the handlers of one `(payload kind, container kind)` pair.
pub struct PatternBuilder<T: FsmTypes> {
    port: PortBuilder<T>,
    key: PatternKey<T>,
}

impl<T: FsmTypes> PatternBuilder<T> {
    /// Run `handler` when the pattern arrives in any of `states`.
    pub fn subscribe<F>(mut self, handler: F, states: impl IntoIterator<Item = StateName>) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event, &T::Container) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        let handler: PatternHandler<T> = Arc::new(handler);
        let polarity = self.port.polarity;
        let (handlers, violations) = self.port.parent.handlers_mut(polarity);
        for state in states {
            handlers
                .patterns
                .subscribe(polarity, self.key, state, handler.clone(), violations);
        }
        self
    }

    pub fn subscribe_on_start<F>(self, handler: F) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event, &T::Container) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.subscribe(handler, [StateName::START])
    }

    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(StateName, &mut T::External, &mut T::Internal, &T::Event, &T::Container) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        let polarity = self.port.polarity;
        let (handlers, violations) = self.port.parent.handlers_mut(polarity);
        handlers
            .patterns
            .fallback(polarity, self.key, Arc::new(handler), violations);
        self
    }

    pub fn build_event(self) -> PortBuilder<T> {
        self.port
    }

    pub fn on_event(self, kind: EventKind<T>) -> EventBuilder<T> {
        self.build_event().on_event(kind)
    }

    pub fn on_pattern(
        self,
        content: EventKind<T>,
        container: ContainerKind<T>,
    ) -> PatternBuilder<T> {
        self.build_event().on_pattern(content, container)
    }

    pub fn build_events(self) -> SemanticDefinition<T> {
        self.build_event().build_port()
    }
}

//! Event model for handler resolution.
//!
//! Each machine declares a closed set of plain events (usually an enum)
//! and tags every value with a *kind*. Handler tables are keyed by kind,
//! so dispatch is a table lookup rather than a run-time type check.
//!
//! Pattern events arrive wrapped in a container (an envelope). They are
//! keyed by the pair of the payload's kind and the container's kind, which
//! lets many envelope types share one payload type.

use serde::Serialize;
use std::convert::Infallible;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;

/// Which side of a bidirectional port a handler is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain event that can be routed to a state machine.
///
/// # Example
///
/// ```rust
/// use multifsm::core::FsmEvent;
///
/// #[derive(Debug)]
/// enum PingEvent {
///     Start { session: u32 },
///     Pong { session: u32 },
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum PingKind {
///     Start,
///     Pong,
/// }
///
/// impl FsmEvent for PingEvent {
///     type Kind = PingKind;
///
///     fn kind(&self) -> PingKind {
///         match self {
///             Self::Start { .. } => PingKind::Start,
///             Self::Pong { .. } => PingKind::Pong,
///         }
///     }
/// }
///
/// assert_eq!(PingEvent::Pong { session: 1 }.kind(), PingKind::Pong);
/// ```
pub trait FsmEvent: Debug {
    /// Tag used as the handler-table key.
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

/// An envelope wrapping an [`FsmEvent`] payload.
pub trait PatternContainer: Debug {
    type Content: FsmEvent;

    /// Tag of the envelope itself.
    type Kind: Copy + Eq + Hash + Debug;

    fn container_kind(&self) -> Self::Kind;

    /// Borrow the wrapped payload.
    fn extract_value(&self) -> &Self::Content;

    /// Kind of the wrapped payload.
    fn extract_pattern(&self) -> <Self::Content as FsmEvent>::Kind {
        self.extract_value().kind()
    }
}

/// Container type for machines that never receive pattern events.
///
/// The type is uninhabited, so no value of it can ever be dispatched.
pub enum NoPattern<E> {
    #[doc(hidden)]
    Never(Infallible, PhantomData<E>),
}

impl<E> Debug for NoPattern<E> {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never(never, _) => match *never {},
        }
    }
}

impl<E: FsmEvent> PatternContainer for NoPattern<E> {
    type Content = E;
    type Kind = ();

    fn container_kind(&self) {}

    fn extract_value(&self) -> &E {
        match self {
            Self::Never(never, _) => match *never {},
        }
    }
}

/// Bundle of the types a machine family works with.
///
/// Implemented once per machine (typically on a zero-sized marker type) so
/// that builders, definitions and registries carry a single type parameter.
pub trait FsmTypes: 'static {
    /// Identity of a port/channel type the machine subscribes to.
    type Port: Copy + Eq + Hash + Debug + 'static;

    /// Closed set of plain events.
    type Event: FsmEvent + 'static;

    /// Envelope for pattern events. Use [`NoPattern`] when unused.
    type Container: PatternContainer<Content = Self::Event> + 'static;

    /// State shared by every instance hosted in one component.
    type External: 'static;

    /// State private to one instance.
    type Internal: 'static;

    /// Caller-supplied identifier distinguishing instances.
    type BaseId: Copy + Eq + Hash + Debug + 'static;
}

/// Kind of a machine's plain events.
pub type EventKind<T> = <<T as FsmTypes>::Event as FsmEvent>::Kind;

/// Kind of a machine's pattern containers.
pub type ContainerKind<T> = <<T as FsmTypes>::Container as PatternContainer>::Kind;

/// Key of a pattern handler: payload kind and container kind.
pub type PatternKey<T> = (EventKind<T>, ContainerKind<T>);

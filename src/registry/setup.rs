//! Wiring a machine's handled events into the host component.

use crate::builder::PortEvents;
use crate::core::{ContainerKind, EventKind, FsmTypes, Polarity};

/// Host-side hook that subscribes the component to one kind of traffic.
///
/// The host decides how a port and polarity map onto its own channels.
/// Every subscribed event should be routed back to the registry's
/// `dispatch` or `dispatch_pattern` with the same polarity.
pub trait PortSubscriber<T: FsmTypes> {
    /// Called once per port and polarity before its subscriptions, so the
    /// host can create the channel if it does not have it yet.
    fn ensure_port(&mut self, _port: T::Port, _polarity: Polarity) {}

    fn subscribe_event(&mut self, port: T::Port, polarity: Polarity, kind: EventKind<T>);

    fn subscribe_pattern(
        &mut self,
        port: T::Port,
        polarity: Polarity,
        content: EventKind<T>,
        container: ContainerKind<T>,
    );
}

/// Subscribe `host` to every event and pattern listed in `wiring`.
pub fn subscribe_all<T, S>(wiring: &[PortEvents<T>], host: &mut S, log_prefix: &str)
where
    T: FsmTypes,
    S: PortSubscriber<T> + ?Sized,
{
    for entry in wiring {
        host.ensure_port(entry.port, entry.polarity);
        for kind in &entry.events {
            tracing::info!(
                "{}{} port:{:?} event:{:?}",
                log_prefix,
                entry.polarity,
                entry.port,
                kind
            );
            host.subscribe_event(entry.port, entry.polarity, *kind);
        }
        for (content, container) in &entry.patterns {
            tracing::info!(
                "{}{} port:{:?} container:{:?} content:{:?}",
                log_prefix,
                entry.polarity,
                entry.port,
                container,
                content
            );
            host.subscribe_pattern(entry.port, entry.polarity, *content, *container);
        }
    }
}

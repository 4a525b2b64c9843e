//! Multifsm: finite state machines multiplexed inside event-driven components
//!
//! A machine is declared in two halves. The *structural* half lists states,
//! permitted transitions and entry/exit hooks. The *semantic* half says which
//! handler runs for which event kind, in which state, on which port and
//! polarity. Both halves are validated together, once, and compiled into an
//! immutable [`MachineDef`]. A [`MultiFsm`] registry then runs any number of
//! instances of that definition, each keyed by a base id carried in the
//! events themselves.
//!
//! # Core Concepts
//!
//! - **StateName**: opaque state token; `START` and `FINAL` are reserved
//! - **Event kinds**: handler tables are keyed by the kind of a closed event enum
//! - **Two-phase validation**: builders record problems, compilation reports them all
//! - **Instances**: created lazily per base id, removed when a handler answers `FINAL`
//!
//! # Example
//!
//! ```rust
//! use multifsm::core::{FsmEvent, FsmTypes, NoPattern, StateName};
//! use multifsm::{state_names, MachineDef, MultiFsm, Outcome, SemanticDefinition, StructuralDefinition};
//!
//! #[derive(Debug)]
//! enum Net {
//!     Ping { session: u32 },
//!     Pong { session: u32 },
//! }
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum NetKind {
//!     Ping,
//!     Pong,
//! }
//!
//! impl FsmEvent for Net {
//!     type Kind = NetKind;
//!
//!     fn kind(&self) -> NetKind {
//!         match self {
//!             Self::Ping { .. } => NetKind::Ping,
//!             Self::Pong { .. } => NetKind::Pong,
//!         }
//!     }
//! }
//!
//! struct Ponger;
//!
//! impl FsmTypes for Ponger {
//!     type Port = &'static str;
//!     type Event = Net;
//!     type Container = NoPattern<Net>;
//!     type External = u32;
//!     type Internal = ();
//!     type BaseId = u32;
//! }
//!
//! state_names! {
//!     ANSWERED,
//! }
//!
//! let structural = StructuralDefinition::<Ponger>::new()
//!     .on_start()
//!         .next_states([ANSWERED])
//!         .build_transition()
//!     .on_state(ANSWERED)
//!         .to_final()
//!         .build_transition();
//!
//! let semantic = SemanticDefinition::<Ponger>::new()
//!     .negative_port("network")
//!         .on_event(NetKind::Ping)
//!             .subscribe_on_start(|_, pongs_sent, _, _| {
//!                 *pongs_sent += 1;
//!                 Ok(ANSWERED)
//!             })
//!         .on_event(NetKind::Pong)
//!             .subscribe(|_, _, _, _| Ok(StateName::FINAL), [ANSWERED])
//!         .build_events();
//!
//! let def = MachineDef::compile("ponger", structural, semantic).unwrap();
//! let mut fsm = MultiFsm::<Ponger>::builder(def, 0, |event: &Net| match event {
//!     Net::Ping { session } | Net::Pong { session } => Some(*session),
//! })
//! .internal_state(|_| ())
//! .build()
//! .unwrap();
//!
//! fsm.handle_negative(&Net::Ping { session: 1 }).unwrap();
//! assert_eq!(fsm.get_state(1), Some(ANSWERED));
//!
//! let outcome = fsm.handle_negative(&Net::Pong { session: 1 }).unwrap();
//! assert_eq!(outcome, Outcome::Finished);
//! assert!(fsm.is_empty());
//! assert_eq!(*fsm.external(), 1);
//! ```

pub mod builder;
pub mod core;
pub mod error;
pub mod machine;
pub mod registry;

// Re-export commonly used types
pub use crate::builder::{DefinitionViolation, SemanticDefinition, StructuralDefinition};
pub use crate::core::{FsmDefId, FsmEvent, FsmId, FsmTypes, PatternContainer, Polarity, StateName};
pub use crate::error::FsmError;
pub use crate::machine::{HandlerResult, Machine, MachineDef, Outcome};
pub use crate::registry::{ExceptionPolicy, MultiFsm, MultiFsmConfig};

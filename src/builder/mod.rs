//! Builder API for machine definitions.
//!
//! A machine is described by two independent builders:
//!
//! - [`StructuralDefinition`]: states, permitted transitions, entry/exit hooks
//! - [`SemanticDefinition`]: event handlers per port, polarity and state
//!
//! Both record problems instead of failing mid-chain. The full list of
//! [`DefinitionViolation`]s is reported when the two halves are compiled
//! into a [`MachineDef`](crate::machine::MachineDef).

pub mod error;
pub mod macros;
pub mod semantic;
pub mod structural;

pub use error::DefinitionViolation;
pub use semantic::{EventBuilder, PatternBuilder, PortBuilder, PortEvents, SemanticDefinition};
pub use structural::{StructuralDefinition, TransitionBuilder};

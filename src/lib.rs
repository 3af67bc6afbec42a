/// MANDATE
///
/// Umbrella crate for the Mandate stack: a delegated-authority override
/// engine in front of an escalation-game price oracle. Re-exports the
/// workspace members so integrators depend on one crate.

pub use mandate_core;
pub use mandate_escalation;
pub use mandate_oracle;

pub use mandate_core::{Address, Identifier};
pub use mandate_escalation::{EscalationCore, EscalationProtocol};
pub use mandate_oracle::{EngineError, ManagedEscalationEngine, Role};

/// MANDATE ORACLE
///
/// Delegated-authority override engine in front of the base escalation
/// game. A config admin fixes per-currency bond ranges and a global
/// challenge-window floor; request managers stage per-request overrides
/// inside those bounds; at proposal time the engine merges the overrides
/// into the stored request before base proposal logic prices it.
///
/// The managed identity deliberately drops the timestamp dimension, so
/// overrides staged for a (requester, identifier, ancillary) triple apply
/// to every later request instance of that triple.

pub mod access_control;
pub mod bounds;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod overrides;

pub use access_control::{role_admin, Role, RoleRegistry};
pub use bounds::{BondRange, BoundsRegistry};
pub use engine::{ConfigOp, ManagedEscalationEngine};
pub use error::EngineError;
pub use events::OracleEvent;
pub use identity::{managed_request_id, ManagedRequestId};
pub use overrides::OverrideStore;

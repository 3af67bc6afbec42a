/// MANDATE ESCALATION
///
/// The base escalation-game price protocol the override engine fronts:
/// - Request lifecycle (requested -> proposed -> expired/disputed -> settled)
/// - Bond accounting: amount pulled from a proposer = bond + final fee
/// - Challenge-window (liveness) validation and read-time expiry
///
/// The engine reads and writes per-request {currency, bond, custom_liveness}
/// through this crate's storage accessor and never duplicates them.

pub mod protocol;
pub mod request;

pub use request::{PriceRequest, RequestKey, RequestState};

pub use protocol::{
    EscalationCore, EscalationProtocol, FeeSchedule, ProtocolError, Settlement,
    MAXIMUM_LIVENESS_SECS,
};

// Engine error taxonomy. Every variant is a synchronous, fail-closed
// validation failure: the operation aborts with no partial state change,
// and the caller corrects and resubmits.

use crate::access_control::Role;
use mandate_core::{Address, WhitelistId};
use mandate_escalation::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("caller {caller} lacks required role {required:?}")]
    Unauthorized { caller: Address, required: Role },

    #[error("currency {0} is not on the collateral whitelist")]
    UnsupportedCurrency(Address),

    #[error("bond range minimum {minimum} exceeds maximum {maximum}")]
    MinimumAboveMaximum { minimum: u128, maximum: u128 },

    #[error("custom bond of zero is not allowed")]
    ZeroBondNotAllowed,

    #[error("bond {amount} below allowed minimum {minimum}")]
    BondBelowMinimum { amount: u128, minimum: u128 },

    #[error("bond {amount} exceeds allowed maximum {maximum}")]
    BondExceedsMaximum { amount: u128, maximum: u128 },

    #[error("challenge window {window}s below global minimum {minimum}s")]
    LivenessBelowMinimum { window: u64, minimum: u64 },

    #[error("{0} does not satisfy the whitelist capability")]
    UnsupportedWhitelistCapability(WhitelistId),

    #[error("proposer {0} is not on the effective whitelist")]
    ProposerNotWhitelisted(Address),

    #[error("sender {0} is not on the effective whitelist")]
    SenderNotWhitelisted(Address),

    #[error("requester {0} is not on the requester whitelist")]
    RequesterNotWhitelisted(Address),

    #[error("mutating call re-entered the engine")]
    ReentrantCall,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

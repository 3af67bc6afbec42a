// Observer notifications. Every successful mutating engine operation
// emits exactly one event; a failed operation emits none.

use crate::access_control::Role;
use mandate_core::{Address, Identifier, WhitelistId};
use serde::{Deserialize, Serialize};

/// Notification record buffered on the engine and drained by observers.
/// Override events carry the full key tuple so an observer can re-derive
/// the managed id without extra lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleEvent {
    RoleGranted {
        role: Role,
        account: Address,
        by: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        by: Address,
    },
    BondRangeSet {
        currency: Address,
        minimum: u128,
        maximum: u128,
    },
    MinimumLivenessSet {
        window: u64,
    },
    DefaultProposerWhitelistSet {
        whitelist: WhitelistId,
    },
    RequesterWhitelistSet {
        whitelist: WhitelistId,
    },
    CustomBondSet {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        currency: Address,
        amount: u128,
    },
    CustomLivenessSet {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        window: u64,
    },
    ProposerWhitelistSet {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        whitelist: Option<WhitelistId>,
    },
    PriceRequested {
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        currency: Address,
        reward: u128,
    },
    ProposalSubmitted {
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        proposer: Address,
        payer: Address,
        price: i128,
        amount_pulled: u128,
    },
    PriceDisputed {
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        disputer: Address,
    },
    RequestSettled {
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        price: i128,
        payout: u128,
    },
    UpgradeAuthorized {
        by: Address,
        logic_digest: [u8; 32],
    },
}

// Price request identity and lifecycle.
//
// SAFETY INVARIANTS:
// 1. A request is addressed by the full 4-dimensional key, timestamp
//    included; two instants of the same query are distinct requests
// 2. Expiry is a read-time computation against a caller-supplied clock;
//    no timer is ever armed
// 3. Settled is terminal; no field mutates after settlement

use mandate_core::{Address, Identifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Full identity of a price request: who asked, for what, when, and with
/// which ancillary context.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Account the price is requested on behalf of.
    pub requester: Address,

    /// Registered price identifier being asked about.
    pub identifier: Identifier,

    /// Ledger time the request refers to (epoch seconds).
    pub timestamp: u64,

    /// Free-form context bytes refining the question.
    pub ancillary: Vec<u8>,
}

impl RequestKey {
    /// Storage digest over all four dimensions. The fixed-width requester
    /// and identifier lead, so the variable-length tail cannot alias them.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.requester.as_bytes());
        hasher.update(self.identifier.as_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(&self.ancillary);
        hasher.finalize().into()
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.digest()[..8]))
    }
}

/// Lifecycle state of a price request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    /// No request stored for the key.
    Invalid,

    /// Requested, awaiting a proposal.
    Requested,

    /// Proposal live, challenge window still open.
    Proposed,

    /// Challenge window elapsed unchallenged; settleable.
    Expired,

    /// Proposal challenged; resolution happens outside this protocol.
    Disputed,

    /// Settled; terminal.
    Settled,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Invalid => "INVALID",
            RequestState::Requested => "REQUESTED",
            RequestState::Proposed => "PROPOSED",
            RequestState::Expired => "EXPIRED",
            RequestState::Disputed => "DISPUTED",
            RequestState::Settled => "SETTLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Settled)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored per-request state. `bond` and `custom_liveness` are the two
/// fields the override engine rewrites through the storage accessor before
/// proposal logic reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRequest {
    /// Settlement currency for reward and bond.
    pub currency: Address,

    /// Reward paid to the successful proposer.
    pub reward: u128,

    /// Final fee snapshotted at request time; added to every bond.
    pub final_fee: u128,

    /// Stake beyond the final fee. Defaults to the final fee at request
    /// time; a custom bond override replaces it at proposal time.
    pub bond: u128,

    /// Per-request challenge window; protocol default applies when unset.
    pub custom_liveness: Option<u64>,

    /// Account credited as proposer.
    pub proposer: Option<Address>,

    /// Account that funded the proposal (may differ from proposer).
    pub payer: Option<Address>,

    /// The proposed price value.
    pub proposed_price: Option<i128>,

    /// Ledger time the challenge window closes.
    pub expiration: Option<u64>,

    /// Account that challenged the proposal.
    pub disputer: Option<Address>,

    /// Final price after settlement.
    pub resolved_price: Option<i128>,

    /// Terminal flag.
    pub settled: bool,
}

impl PriceRequest {
    pub fn new(currency: Address, reward: u128, final_fee: u128) -> Self {
        PriceRequest {
            currency,
            reward,
            final_fee,
            bond: final_fee,
            custom_liveness: None,
            proposer: None,
            payer: None,
            proposed_price: None,
            expiration: None,
            disputer: None,
            resolved_price: None,
            settled: false,
        }
    }

    /// Total stake pulled from a proposer: bond plus the final fee.
    pub fn total_bond(&self) -> u128 {
        self.bond.saturating_add(self.final_fee)
    }

    /// Read-time lifecycle state against the supplied clock.
    pub fn state(&self, now: u64) -> RequestState {
        if self.settled {
            return RequestState::Settled;
        }
        if self.disputer.is_some() {
            return RequestState::Disputed;
        }
        match self.expiration {
            Some(expiration) if now >= expiration => RequestState::Expired,
            Some(_) => RequestState::Proposed,
            None => RequestState::Requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(timestamp: u64) -> RequestKey {
        RequestKey {
            requester: Address([1; 20]),
            identifier: Identifier::from_label("GAS_PRICE"),
            timestamp,
            ancillary: b"chain:1".to_vec(),
        }
    }

    #[test]
    fn test_digest_covers_timestamp() {
        assert_ne!(key(100).digest(), key(101).digest());
        assert_eq!(key(100).digest(), key(100).digest());
    }

    #[test]
    fn test_state_progression() {
        let mut req = PriceRequest::new(Address([2; 20]), 10, 5);
        assert_eq!(req.state(0), RequestState::Requested);

        req.proposer = Some(Address([3; 20]));
        req.expiration = Some(500);
        assert_eq!(req.state(499), RequestState::Proposed);
        assert_eq!(req.state(500), RequestState::Expired);

        req.disputer = Some(Address([4; 20]));
        assert_eq!(req.state(400), RequestState::Disputed);

        req.settled = true;
        assert_eq!(req.state(400), RequestState::Settled);
        assert!(req.state(400).is_terminal());
    }

    #[test]
    fn test_total_bond_adds_final_fee() {
        let mut req = PriceRequest::new(Address([2; 20]), 0, 7);
        assert_eq!(req.total_bond(), 14); // default bond equals the final fee
        req.bond = 5;
        assert_eq!(req.total_bond(), 12);
    }
}

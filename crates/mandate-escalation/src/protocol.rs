// Escalation protocol seam and reference implementation.
//
// SAFETY INVARIANTS:
// 1. Proposal logic reads {bond, custom_liveness} from stored request
//    state at the moment of proposal; whatever was written through the
//    storage accessor beforehand is what gets priced
// 2. Every mutating operation validates the full transition before
//    touching stored state
// 3. Liveness bounds are enforced in exactly one place; callers that need
//    a window checked delegate to validate_liveness

use crate::request::{PriceRequest, RequestKey, RequestState};
use log::{info, warn};
use mandate_core::{Address, CurrencyWhitelist, SharedCollateral};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ceiling on any challenge window (5200 weeks, in seconds). Windows at or
/// above this are rejected as nonsensical.
pub const MAXIMUM_LIVENESS_SECS: u64 = 5200 * 7 * 24 * 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("challenge window cannot be zero")]
    ZeroLiveness,

    #[error("challenge window {window}s is at or above the ceiling {ceiling}s")]
    LivenessAboveCeiling { window: u64, ceiling: u64 },

    #[error("currency {0} is not on the collateral whitelist")]
    UnsupportedCurrency(Address),

    #[error("no request stored for key {0}")]
    UnknownRequest(String),

    #[error("request {0} already exists")]
    RequestAlreadyExists(String),

    #[error("request is {0}; operation not permitted in this state")]
    InvalidRequestState(RequestState),

    #[error("disputed request cannot be settled by the escalation game")]
    DisputeUnresolved,
}

/// Outcome of settling an unchallenged, expired proposal. Figures are
/// computed only; token movement happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// The price that resolved.
    pub price: i128,

    /// Returned stake plus reward.
    pub payout: u128,

    /// Account the payout is owed to.
    pub recipient: Address,
}

/// The interface the override engine drives. Mutable request fields are
/// reached through `request_mut`, the protocol's own storage accessor.
pub trait EscalationProtocol {
    fn request_price(
        &mut self,
        key: &RequestKey,
        currency: Address,
        reward: u128,
    ) -> Result<(), ProtocolError>;

    fn request(&self, key: &RequestKey) -> Option<&PriceRequest>;

    fn request_mut(&mut self, key: &RequestKey) -> Result<&mut PriceRequest, ProtocolError>;

    fn state(&self, key: &RequestKey, now: u64) -> RequestState;

    /// Bound-sanity check for any challenge window: nonzero and below the
    /// protocol ceiling.
    fn validate_liveness(&self, window: u64) -> Result<(), ProtocolError>;

    fn default_liveness(&self) -> u64;

    fn final_fee(&self, currency: &Address) -> u128;

    /// Commit a proposal. Reads the stored (possibly overridden) bond and
    /// custom liveness; returns the total amount pulled from the payer.
    fn propose_price_for(
        &mut self,
        key: &RequestKey,
        proposer: Address,
        payer: Address,
        price: i128,
        now: u64,
    ) -> Result<u128, ProtocolError>;

    fn dispute_price_for(
        &mut self,
        key: &RequestKey,
        disputer: Address,
        now: u64,
    ) -> Result<(), ProtocolError>;

    fn settle(&mut self, key: &RequestKey, now: u64) -> Result<Settlement, ProtocolError>;
}

/// Per-currency final fee, the protocol-fixed stake component added to
/// every bond. Unset currencies carry a zero fee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    fees: BTreeMap<Address, u128>,
}

impl FeeSchedule {
    pub fn new() -> Self {
        FeeSchedule {
            fees: BTreeMap::new(),
        }
    }

    pub fn set_final_fee(&mut self, currency: Address, fee: u128) {
        info!("final fee for {} set to {}", currency, fee);
        self.fees.insert(currency, fee);
    }

    pub fn final_fee(&self, currency: &Address) -> u128 {
        self.fees.get(currency).copied().unwrap_or(0)
    }
}

/// Reference implementation of the escalation game.
pub struct EscalationCore {
    default_liveness: u64,
    currencies: SharedCollateral,
    fees: FeeSchedule,
    requests: BTreeMap<[u8; 32], PriceRequest>,
}

impl EscalationCore {
    pub fn new(default_liveness: u64, currencies: SharedCollateral) -> Result<Self, ProtocolError> {
        let core = EscalationCore {
            default_liveness,
            currencies,
            fees: FeeSchedule::new(),
            requests: BTreeMap::new(),
        };
        core.validate_liveness(default_liveness)?;
        Ok(core)
    }

    pub fn set_final_fee(&mut self, currency: Address, fee: u128) {
        self.fees.set_final_fee(currency, fee);
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

impl EscalationProtocol for EscalationCore {
    fn request_price(
        &mut self,
        key: &RequestKey,
        currency: Address,
        reward: u128,
    ) -> Result<(), ProtocolError> {
        if !self.currencies.is_supported(&currency) {
            return Err(ProtocolError::UnsupportedCurrency(currency));
        }
        let digest = key.digest();
        if self.requests.contains_key(&digest) {
            return Err(ProtocolError::RequestAlreadyExists(key.to_string()));
        }
        let final_fee = self.fees.final_fee(&currency);
        self.requests
            .insert(digest, PriceRequest::new(currency, reward, final_fee));
        info!(
            "price requested: key={} identifier={} currency={} reward={}",
            key, key.identifier, currency, reward
        );
        Ok(())
    }

    fn request(&self, key: &RequestKey) -> Option<&PriceRequest> {
        self.requests.get(&key.digest())
    }

    fn request_mut(&mut self, key: &RequestKey) -> Result<&mut PriceRequest, ProtocolError> {
        self.requests
            .get_mut(&key.digest())
            .ok_or_else(|| ProtocolError::UnknownRequest(key.to_string()))
    }

    fn state(&self, key: &RequestKey, now: u64) -> RequestState {
        match self.requests.get(&key.digest()) {
            Some(request) => request.state(now),
            None => RequestState::Invalid,
        }
    }

    fn validate_liveness(&self, window: u64) -> Result<(), ProtocolError> {
        if window == 0 {
            return Err(ProtocolError::ZeroLiveness);
        }
        if window >= MAXIMUM_LIVENESS_SECS {
            return Err(ProtocolError::LivenessAboveCeiling {
                window,
                ceiling: MAXIMUM_LIVENESS_SECS,
            });
        }
        Ok(())
    }

    fn default_liveness(&self) -> u64 {
        self.default_liveness
    }

    fn final_fee(&self, currency: &Address) -> u128 {
        self.fees.final_fee(currency)
    }

    fn propose_price_for(
        &mut self,
        key: &RequestKey,
        proposer: Address,
        payer: Address,
        price: i128,
        now: u64,
    ) -> Result<u128, ProtocolError> {
        let default_liveness = self.default_liveness;
        let request = self.request_mut(key)?;

        let state = request.state(now);
        if state != RequestState::Requested {
            return Err(ProtocolError::InvalidRequestState(state));
        }

        let window = request.custom_liveness.unwrap_or(default_liveness);
        request.proposer = Some(proposer);
        request.payer = Some(payer);
        request.proposed_price = Some(price);
        request.expiration = Some(now.saturating_add(window));

        let pulled = request.total_bond();
        info!(
            "price proposed: key={} proposer={} payer={} price={} pulled={} window={}s",
            key, proposer, payer, price, pulled, window
        );
        Ok(pulled)
    }

    fn dispute_price_for(
        &mut self,
        key: &RequestKey,
        disputer: Address,
        now: u64,
    ) -> Result<(), ProtocolError> {
        let request = self.request_mut(key)?;

        let state = request.state(now);
        if state != RequestState::Proposed {
            return Err(ProtocolError::InvalidRequestState(state));
        }

        request.disputer = Some(disputer);
        warn!("price disputed: key={} disputer={}", key, disputer);
        Ok(())
    }

    fn settle(&mut self, key: &RequestKey, now: u64) -> Result<Settlement, ProtocolError> {
        let request = self.request_mut(key)?;

        match request.state(now) {
            RequestState::Expired => {}
            RequestState::Disputed => return Err(ProtocolError::DisputeUnresolved),
            state => return Err(ProtocolError::InvalidRequestState(state)),
        }

        // Expired implies a proposal landed, so these fields are present.
        let price = request.proposed_price.unwrap_or_default();
        let recipient = request.proposer.unwrap_or(Address::ZERO);
        request.resolved_price = Some(price);
        request.settled = true;

        let payout = request.total_bond().saturating_add(request.reward);
        info!(
            "request settled: key={} price={} payout={} recipient={}",
            key, price, payout, recipient
        );
        Ok(Settlement {
            price,
            payout,
            recipient,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandate_core::Identifier;

    fn setup() -> (EscalationCore, RequestKey, Address) {
        let currencies = SharedCollateral::new();
        let token = Address([0x10; 20]);
        currencies.add_currency(token);

        let mut core = EscalationCore::new(7200, currencies).unwrap();
        core.set_final_fee(token, 100);

        let key = RequestKey {
            requester: Address([1; 20]),
            identifier: Identifier::from_label("GAS_PRICE"),
            timestamp: 1_000,
            ancillary: Vec::new(),
        };
        (core, key, token)
    }

    #[test]
    fn test_request_snapshots_final_fee_as_default_bond() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 25).unwrap();

        let request = core.request(&key).unwrap();
        assert_eq!(request.final_fee, 100);
        assert_eq!(request.bond, 100);
        assert_eq!(request.reward, 25);
    }

    #[test]
    fn test_request_rejects_unsupported_currency() {
        let (mut core, key, _) = setup();
        let unknown = Address([0x99; 20]);
        assert_eq!(
            core.request_price(&key, unknown, 0).unwrap_err(),
            ProtocolError::UnsupportedCurrency(unknown)
        );
    }

    #[test]
    fn test_duplicate_request_rejected() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 0).unwrap();
        assert!(matches!(
            core.request_price(&key, token, 0).unwrap_err(),
            ProtocolError::RequestAlreadyExists(_)
        ));
    }

    #[test]
    fn test_proposal_pulls_bond_plus_final_fee_and_arms_expiry() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 25).unwrap();

        let proposer = Address([7; 20]);
        let pulled = core
            .propose_price_for(&key, proposer, proposer, 42, 2_000)
            .unwrap();
        assert_eq!(pulled, 200); // default bond (=fee) + final fee

        let request = core.request(&key).unwrap();
        assert_eq!(request.expiration, Some(2_000 + 7200));
        assert_eq!(core.state(&key, 2_000), RequestState::Proposed);
        assert_eq!(core.state(&key, 2_000 + 7200), RequestState::Expired);
    }

    #[test]
    fn test_custom_liveness_drives_expiry() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 0).unwrap();
        core.request_mut(&key).unwrap().custom_liveness = Some(60);

        let proposer = Address([7; 20]);
        core.propose_price_for(&key, proposer, proposer, 1, 5_000)
            .unwrap();
        assert_eq!(core.request(&key).unwrap().expiration, Some(5_060));
    }

    #[test]
    fn test_double_proposal_rejected() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 0).unwrap();
        let proposer = Address([7; 20]);
        core.propose_price_for(&key, proposer, proposer, 1, 100)
            .unwrap();
        assert_eq!(
            core.propose_price_for(&key, proposer, proposer, 1, 101)
                .unwrap_err(),
            ProtocolError::InvalidRequestState(RequestState::Proposed)
        );
    }

    #[test]
    fn test_settle_expired_pays_bond_fee_and_reward() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 25).unwrap();
        let proposer = Address([7; 20]);
        core.propose_price_for(&key, proposer, proposer, 42, 1_000)
            .unwrap();

        let settlement = core.settle(&key, 1_000 + 7200).unwrap();
        assert_eq!(settlement.price, 42);
        assert_eq!(settlement.payout, 225);
        assert_eq!(settlement.recipient, proposer);
        assert_eq!(core.state(&key, u64::MAX), RequestState::Settled);
    }

    #[test]
    fn test_disputed_request_cannot_settle_here() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 0).unwrap();
        let proposer = Address([7; 20]);
        core.propose_price_for(&key, proposer, proposer, 42, 1_000)
            .unwrap();
        core.dispute_price_for(&key, Address([8; 20]), 1_500).unwrap();

        assert_eq!(
            core.settle(&key, u64::MAX).unwrap_err(),
            ProtocolError::DisputeUnresolved
        );
    }

    #[test]
    fn test_dispute_after_expiry_rejected() {
        let (mut core, key, token) = setup();
        core.request_price(&key, token, 0).unwrap();
        let proposer = Address([7; 20]);
        core.propose_price_for(&key, proposer, proposer, 42, 1_000)
            .unwrap();

        assert_eq!(
            core.dispute_price_for(&key, Address([8; 20]), 1_000 + 7200)
                .unwrap_err(),
            ProtocolError::InvalidRequestState(RequestState::Expired)
        );
    }

    #[test]
    fn test_liveness_validator_bounds() {
        let (core, _, _) = setup();
        assert_eq!(
            core.validate_liveness(0).unwrap_err(),
            ProtocolError::ZeroLiveness
        );
        assert_eq!(
            core.validate_liveness(MAXIMUM_LIVENESS_SECS).unwrap_err(),
            ProtocolError::LivenessAboveCeiling {
                window: MAXIMUM_LIVENESS_SECS,
                ceiling: MAXIMUM_LIVENESS_SECS,
            }
        );
        assert!(core.validate_liveness(MAXIMUM_LIVENESS_SECS - 1).is_ok());
    }
}

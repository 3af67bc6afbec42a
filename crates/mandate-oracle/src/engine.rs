// Managed escalation engine: delegated-authority overrides in front of the
// base escalation game.
//
// SAFETY INVARIANTS:
// 1. Bounds are never violated at set time: a custom bond lands only
//    inside the currency's admin-fixed range, a custom window only at or
//    above the global floor and below the protocol ceiling
// 2. Role separation is never bypassed: every mutating operation is gated
//    on exactly the role the hierarchy assigns it
// 3. Overrides land in the base-protocol request before base proposal
//    logic reads it; amounts pulled and expiry always reflect the
//    overridden values
// 4. Every mutating operation validates completely before touching any
//    state; a failed operation has no observable effect
// 5. Mutating entry points are non-reentrant; a batch commits all of its
//    operations or none of them
// 6. Proposer and sender are checked against the same resolved whitelist

use crate::access_control::{Role, RoleRegistry};
use crate::bounds::{BondRange, BoundsRegistry};
use crate::error::EngineError;
use crate::events::OracleEvent;
use crate::identity::{managed_request_id, ManagedRequestId};
use crate::overrides::OverrideStore;
use log::{debug, info, warn};
use mandate_core::{
    Address, CurrencyWhitelist, Identifier, OpenWhitelist, WhitelistCapability, WhitelistId,
    WhitelistRegistry, WhitelistStatus,
};
use mandate_escalation::{
    EscalationProtocol, ProtocolError, RequestKey, RequestState, Settlement,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Engine-owned configuration: everything a batch can touch. Cloneable so
/// a batch stages against a copy and swaps it in atomically.
#[derive(Debug, Clone)]
struct ConfigState {
    roles: RoleRegistry,
    bounds: BoundsRegistry,
    overrides: OverrideStore,
    default_proposer_whitelist: WhitelistId,
    requester_whitelist: WhitelistId,
    authorized_logic: Option<[u8; 32]>,
}

/// One configuration operation, as submitted singly or inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigOp {
    GrantRole {
        role: Role,
        account: Address,
    },
    RevokeRole {
        role: Role,
        account: Address,
    },
    SetAllowedBondRange {
        currency: Address,
        minimum: u128,
        maximum: u128,
    },
    SetMinimumLiveness {
        window: u64,
    },
    SetDefaultProposerWhitelist {
        whitelist: WhitelistId,
    },
    SetRequesterWhitelist {
        whitelist: WhitelistId,
    },
    SetBond {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        currency: Address,
        amount: u128,
    },
    SetCustomLiveness {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        window: u64,
    },
    SetProposerWhitelist {
        requester: Address,
        identifier: Identifier,
        ancillary: Vec<u8>,
        whitelist: Option<WhitelistId>,
    },
}

/// The override engine. Generic over the base protocol it fronts and the
/// collateral whitelist it consults.
pub struct ManagedEscalationEngine<P, C> {
    config: ConfigState,
    whitelists: WhitelistRegistry,
    currencies: C,
    protocol: P,
    events: Vec<OracleEvent>,
    guard: Mutex<()>,
}

impl<P: EscalationProtocol, C: CurrencyWhitelist> ManagedEscalationEngine<P, C> {
    /// Bootstrap with the initial root authority. Both engine-wide
    /// whitelists start as always-allow instances until the config admin
    /// replaces them.
    pub fn new(
        root: Address,
        minimum_liveness: u64,
        protocol: P,
        currencies: C,
    ) -> Result<Self, EngineError> {
        protocol.validate_liveness(minimum_liveness)?;

        let mut whitelists = WhitelistRegistry::new();
        let default_proposer_whitelist = whitelists.register(Box::new(OpenWhitelist));
        let requester_whitelist = whitelists.register(Box::new(OpenWhitelist));

        info!(
            "engine bootstrapped: root={} minimum_liveness={}s",
            root, minimum_liveness
        );
        Ok(ManagedEscalationEngine {
            config: ConfigState {
                roles: RoleRegistry::bootstrap(root),
                bounds: BoundsRegistry::new(minimum_liveness),
                overrides: OverrideStore::new(),
                default_proposer_whitelist,
                requester_whitelist,
                authorized_logic: None,
            },
            whitelists,
            currencies,
            protocol,
            events: Vec::new(),
            guard: Mutex::new(()),
        })
    }

    // ---------------------------------------------------------------
    // Configuration entry points (singly and batched)
    // ---------------------------------------------------------------

    pub fn grant_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), EngineError> {
        self.submit_config_op(caller, ConfigOp::GrantRole { role, account })
    }

    pub fn revoke_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), EngineError> {
        self.submit_config_op(caller, ConfigOp::RevokeRole { role, account })
    }

    pub fn set_allowed_bond_range(
        &mut self,
        caller: Address,
        currency: Address,
        minimum: u128,
        maximum: u128,
    ) -> Result<(), EngineError> {
        self.submit_config_op(
            caller,
            ConfigOp::SetAllowedBondRange {
                currency,
                minimum,
                maximum,
            },
        )
    }

    pub fn set_minimum_liveness(
        &mut self,
        caller: Address,
        window: u64,
    ) -> Result<(), EngineError> {
        self.submit_config_op(caller, ConfigOp::SetMinimumLiveness { window })
    }

    pub fn set_default_proposer_whitelist(
        &mut self,
        caller: Address,
        whitelist: WhitelistId,
    ) -> Result<(), EngineError> {
        self.submit_config_op(caller, ConfigOp::SetDefaultProposerWhitelist { whitelist })
    }

    pub fn set_requester_whitelist(
        &mut self,
        caller: Address,
        whitelist: WhitelistId,
    ) -> Result<(), EngineError> {
        self.submit_config_op(caller, ConfigOp::SetRequesterWhitelist { whitelist })
    }

    pub fn set_bond(
        &mut self,
        caller: Address,
        requester: Address,
        identifier: Identifier,
        ancillary: &[u8],
        currency: Address,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.submit_config_op(
            caller,
            ConfigOp::SetBond {
                requester,
                identifier,
                ancillary: ancillary.to_vec(),
                currency,
                amount,
            },
        )
    }

    pub fn set_custom_liveness(
        &mut self,
        caller: Address,
        requester: Address,
        identifier: Identifier,
        ancillary: &[u8],
        window: u64,
    ) -> Result<(), EngineError> {
        self.submit_config_op(
            caller,
            ConfigOp::SetCustomLiveness {
                requester,
                identifier,
                ancillary: ancillary.to_vec(),
                window,
            },
        )
    }

    pub fn set_proposer_whitelist(
        &mut self,
        caller: Address,
        requester: Address,
        identifier: Identifier,
        ancillary: &[u8],
        whitelist: Option<WhitelistId>,
    ) -> Result<(), EngineError> {
        self.submit_config_op(
            caller,
            ConfigOp::SetProposerWhitelist {
                requester,
                identifier,
                ancillary: ancillary.to_vec(),
                whitelist,
            },
        )
    }

    /// Apply a sequence of configuration operations atomically: the ops
    /// run against a staged copy of the configuration, and the copy is
    /// swapped in only if every op succeeds.
    pub fn execute_batch(
        &mut self,
        caller: Address,
        ops: Vec<ConfigOp>,
    ) -> Result<(), EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;

        let mut staged = self.config.clone();
        let mut staged_events = Vec::with_capacity(ops.len());
        for op in ops {
            staged_events.push(Self::apply_config_op(
                &mut staged,
                &self.whitelists,
                &self.currencies,
                &self.protocol,
                caller,
                op,
            )?);
        }

        self.config = staged;
        for event in staged_events {
            Self::emit(&mut self.events, event);
        }
        Ok(())
    }

    fn submit_config_op(&mut self, caller: Address, op: ConfigOp) -> Result<(), EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;
        let event = Self::apply_config_op(
            &mut self.config,
            &self.whitelists,
            &self.currencies,
            &self.protocol,
            caller,
            op,
        )?;
        Self::emit(&mut self.events, event);
        Ok(())
    }

    /// All configuration validation and mutation in one place. Checks run
    /// before any write, so an error leaves `config` untouched.
    fn apply_config_op(
        config: &mut ConfigState,
        whitelists: &WhitelistRegistry,
        currencies: &C,
        protocol: &P,
        caller: Address,
        op: ConfigOp,
    ) -> Result<OracleEvent, EngineError> {
        match op {
            ConfigOp::GrantRole { role, account } => {
                config.roles.grant(caller, role, account)?;
                Ok(OracleEvent::RoleGranted {
                    role,
                    account,
                    by: caller,
                })
            }
            ConfigOp::RevokeRole { role, account } => {
                config.roles.revoke(caller, role, &account)?;
                Ok(OracleEvent::RoleRevoked {
                    role,
                    account,
                    by: caller,
                })
            }
            ConfigOp::SetAllowedBondRange {
                currency,
                minimum,
                maximum,
            } => {
                config.roles.require(caller, Role::ConfigAdmin)?;
                if !currencies.is_supported(&currency) {
                    return Err(EngineError::UnsupportedCurrency(currency));
                }
                let range = BondRange::new(minimum, maximum)?;
                config.bounds.set_range(currency, range);
                info!(
                    "bond range for {} set to [{}, {}]",
                    currency, minimum, maximum
                );
                Ok(OracleEvent::BondRangeSet {
                    currency,
                    minimum,
                    maximum,
                })
            }
            ConfigOp::SetMinimumLiveness { window } => {
                config.roles.require(caller, Role::ConfigAdmin)?;
                protocol.validate_liveness(window)?;
                config.bounds.set_minimum_liveness(window);
                info!("minimum liveness set to {}s", window);
                Ok(OracleEvent::MinimumLivenessSet { window })
            }
            ConfigOp::SetDefaultProposerWhitelist { whitelist } => {
                config.roles.require(caller, Role::ConfigAdmin)?;
                if !whitelists.contains(whitelist) {
                    return Err(EngineError::UnsupportedWhitelistCapability(whitelist));
                }
                config.default_proposer_whitelist = whitelist;
                info!("default proposer whitelist set to {}", whitelist);
                Ok(OracleEvent::DefaultProposerWhitelistSet { whitelist })
            }
            ConfigOp::SetRequesterWhitelist { whitelist } => {
                config.roles.require(caller, Role::ConfigAdmin)?;
                if !whitelists.contains(whitelist) {
                    return Err(EngineError::UnsupportedWhitelistCapability(whitelist));
                }
                config.requester_whitelist = whitelist;
                info!("requester whitelist set to {}", whitelist);
                Ok(OracleEvent::RequesterWhitelistSet { whitelist })
            }
            ConfigOp::SetBond {
                requester,
                identifier,
                ancillary,
                currency,
                amount,
            } => {
                config.roles.require(caller, Role::RequestManager)?;
                if !currencies.is_supported(&currency) {
                    return Err(EngineError::UnsupportedCurrency(currency));
                }
                if amount == 0 {
                    return Err(EngineError::ZeroBondNotAllowed);
                }
                let range = config.bounds.allowed_range(&currency);
                if amount < range.minimum {
                    return Err(EngineError::BondBelowMinimum {
                        amount,
                        minimum: range.minimum,
                    });
                }
                if amount > range.maximum {
                    return Err(EngineError::BondExceedsMaximum {
                        amount,
                        maximum: range.maximum,
                    });
                }
                let id = managed_request_id(&requester, &identifier, &ancillary);
                config.overrides.set_bond(id, currency, amount);
                info!("custom bond for {} / {} set to {}", id, currency, amount);
                Ok(OracleEvent::CustomBondSet {
                    requester,
                    identifier,
                    ancillary,
                    currency,
                    amount,
                })
            }
            ConfigOp::SetCustomLiveness {
                requester,
                identifier,
                ancillary,
                window,
            } => {
                config.roles.require(caller, Role::RequestManager)?;
                let minimum = config.bounds.minimum_liveness();
                if window < minimum {
                    return Err(EngineError::LivenessBelowMinimum { window, minimum });
                }
                protocol.validate_liveness(window)?;
                let id = managed_request_id(&requester, &identifier, &ancillary);
                config.overrides.set_liveness(id, window);
                info!("custom liveness for {} set to {}s", id, window);
                Ok(OracleEvent::CustomLivenessSet {
                    requester,
                    identifier,
                    ancillary,
                    window,
                })
            }
            ConfigOp::SetProposerWhitelist {
                requester,
                identifier,
                ancillary,
                whitelist,
            } => {
                config.roles.require(caller, Role::RequestManager)?;
                let id = managed_request_id(&requester, &identifier, &ancillary);
                match whitelist {
                    Some(reference) => {
                        if !whitelists.contains(reference) {
                            return Err(EngineError::UnsupportedWhitelistCapability(reference));
                        }
                        config.overrides.set_whitelist(id, reference);
                        info!("proposer whitelist for {} set to {}", id, reference);
                    }
                    None => {
                        config.overrides.clear_whitelist(&id);
                        info!("proposer whitelist for {} cleared to default", id);
                    }
                }
                Ok(OracleEvent::ProposerWhitelistSet {
                    requester,
                    identifier,
                    ancillary,
                    whitelist,
                })
            }
        }
    }

    // ---------------------------------------------------------------
    // Upgrade authority
    // ---------------------------------------------------------------

    /// Record root authorization for a logic replacement. Upgrade
    /// mechanics live outside the engine; the root-only gate does not.
    pub fn authorize_upgrade(
        &mut self,
        caller: Address,
        logic_digest: [u8; 32],
    ) -> Result<(), EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;
        self.config.roles.require(caller, Role::RootAuthority)?;
        self.config.authorized_logic = Some(logic_digest);
        warn!(
            "logic replacement authorized by {}: 0x{}",
            caller,
            hex::encode(logic_digest)
        );
        Self::emit(
            &mut self.events,
            OracleEvent::UpgradeAuthorized {
                by: caller,
                logic_digest,
            },
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Request lifecycle
    // ---------------------------------------------------------------

    /// Create a request through the engine. The requester must clear the
    /// engine-wide requester whitelist before the protocol sees the call.
    pub fn request_price(
        &mut self,
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        ancillary: &[u8],
        currency: Address,
        reward: u128,
    ) -> Result<(), EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;

        let gate = self.config.requester_whitelist;
        let whitelist = self
            .whitelists
            .get(gate)
            .ok_or(EngineError::UnsupportedWhitelistCapability(gate))?;
        if !whitelist.contains(&requester) {
            return Err(EngineError::RequesterNotWhitelisted(requester));
        }

        let key = RequestKey {
            requester,
            identifier,
            timestamp,
            ancillary: ancillary.to_vec(),
        };
        self.protocol.request_price(&key, currency, reward)?;
        Self::emit(
            &mut self.events,
            OracleEvent::PriceRequested {
                requester,
                identifier,
                timestamp,
                currency,
                reward,
            },
        );
        Ok(())
    }

    /// Proposer funds their own proposal.
    #[allow(clippy::too_many_arguments)]
    pub fn propose_price(
        &mut self,
        sender: Address,
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        ancillary: &[u8],
        price: i128,
        now: u64,
    ) -> Result<u128, EngineError> {
        self.propose_price_for(
            sender, sender, requester, identifier, timestamp, ancillary, price, now,
        )
    }

    /// The central merge: resolve overrides for the managed id, write them
    /// into the stored request, then delegate to base proposal logic so it
    /// prices the overridden values. Returns the amount pulled from the
    /// sender. All validation precedes the first write.
    #[allow(clippy::too_many_arguments)]
    pub fn propose_price_for(
        &mut self,
        sender: Address,
        proposer: Address,
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        ancillary: &[u8],
        price: i128,
        now: u64,
    ) -> Result<u128, EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;

        let key = RequestKey {
            requester,
            identifier,
            timestamp,
            ancillary: ancillary.to_vec(),
        };
        let state = self.protocol.state(&key, now);
        if state != RequestState::Requested {
            return Err(EngineError::Protocol(ProtocolError::InvalidRequestState(
                state,
            )));
        }

        let id = managed_request_id(&requester, &identifier, ancillary);
        let effective = self
            .config
            .overrides
            .whitelist(&id)
            .unwrap_or(self.config.default_proposer_whitelist);
        let whitelist = self
            .whitelists
            .get(effective)
            .ok_or(EngineError::UnsupportedWhitelistCapability(effective))?;

        // One resolved list for both identities.
        if !whitelist.contains(&proposer) {
            return Err(EngineError::ProposerNotWhitelisted(proposer));
        }
        if !whitelist.contains(&sender) {
            return Err(EngineError::SenderNotWhitelisted(sender));
        }

        let currency = self
            .protocol
            .request(&key)
            .map(|request| request.currency)
            .ok_or_else(|| ProtocolError::UnknownRequest(key.to_string()))?;
        let bond_override = self.config.overrides.bond(&id, &currency);
        let liveness_override = self.config.overrides.liveness(&id);

        {
            let request = self.protocol.request_mut(&key)?;
            if let Some(bond) = bond_override {
                debug!("applying bond override {} to {}", bond, key);
                request.bond = bond;
            }
            if let Some(window) = liveness_override {
                debug!("applying liveness override {}s to {}", window, key);
                request.custom_liveness = Some(window);
            }
        }

        let pulled = self
            .protocol
            .propose_price_for(&key, proposer, sender, price, now)?;
        Self::emit(
            &mut self.events,
            OracleEvent::ProposalSubmitted {
                requester,
                identifier,
                timestamp,
                proposer,
                payer: sender,
                price,
                amount_pulled: pulled,
            },
        );
        Ok(pulled)
    }

    pub fn dispute_price_for(
        &mut self,
        disputer: Address,
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        ancillary: &[u8],
        now: u64,
    ) -> Result<(), EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;
        let key = RequestKey {
            requester,
            identifier,
            timestamp,
            ancillary: ancillary.to_vec(),
        };
        self.protocol.dispute_price_for(&key, disputer, now)?;
        Self::emit(
            &mut self.events,
            OracleEvent::PriceDisputed {
                requester,
                identifier,
                timestamp,
                disputer,
            },
        );
        Ok(())
    }

    pub fn settle(
        &mut self,
        requester: Address,
        identifier: Identifier,
        timestamp: u64,
        ancillary: &[u8],
        now: u64,
    ) -> Result<Settlement, EngineError> {
        let _guard = self.guard.try_lock().ok_or(EngineError::ReentrantCall)?;
        let key = RequestKey {
            requester,
            identifier,
            timestamp,
            ancillary: ancillary.to_vec(),
        };
        let settlement = self.protocol.settle(&key, now)?;
        Self::emit(
            &mut self.events,
            OracleEvent::RequestSettled {
                requester,
                identifier,
                timestamp,
                price: settlement.price,
                payout: settlement.payout,
            },
        );
        Ok(settlement)
    }

    // ---------------------------------------------------------------
    // Reads (lock-free)
    // ---------------------------------------------------------------

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.config.roles.has_role(role, account)
    }

    pub fn allowed_bond_range(&self, currency: &Address) -> BondRange {
        self.config.bounds.allowed_range(currency)
    }

    pub fn minimum_liveness(&self) -> u64 {
        self.config.bounds.minimum_liveness()
    }

    pub fn custom_bond(
        &self,
        requester: &Address,
        identifier: &Identifier,
        ancillary: &[u8],
        currency: &Address,
    ) -> Option<u128> {
        let id = managed_request_id(requester, identifier, ancillary);
        self.config.overrides.bond(&id, currency)
    }

    pub fn custom_liveness(
        &self,
        requester: &Address,
        identifier: &Identifier,
        ancillary: &[u8],
    ) -> Option<u64> {
        let id = managed_request_id(requester, identifier, ancillary);
        self.config.overrides.liveness(&id)
    }

    /// The whitelist actually in force for a triple: the custom override
    /// when set, the engine-wide default otherwise.
    pub fn effective_proposer_whitelist(
        &self,
        requester: &Address,
        identifier: &Identifier,
        ancillary: &[u8],
    ) -> WhitelistId {
        let id = managed_request_id(requester, identifier, ancillary);
        self.config
            .overrides
            .whitelist(&id)
            .unwrap_or(self.config.default_proposer_whitelist)
    }

    /// Status view of the effective whitelist for external callers.
    pub fn proposer_whitelist_status(
        &self,
        requester: &Address,
        identifier: &Identifier,
        ancillary: &[u8],
    ) -> WhitelistStatus {
        let effective = self.effective_proposer_whitelist(requester, identifier, ancillary);
        match self.whitelists.status(effective) {
            Some(status) => status,
            None => {
                warn!("effective whitelist {} missing from registry", effective);
                WhitelistStatus {
                    members: Vec::new(),
                    is_enabled: false,
                }
            }
        }
    }

    pub fn default_proposer_whitelist(&self) -> WhitelistId {
        self.config.default_proposer_whitelist
    }

    pub fn requester_whitelist(&self) -> WhitelistId {
        self.config.requester_whitelist
    }

    pub fn authorized_logic(&self) -> Option<[u8; 32]> {
        self.config.authorized_logic
    }

    pub fn managed_request_id(
        &self,
        requester: &Address,
        identifier: &Identifier,
        ancillary: &[u8],
    ) -> ManagedRequestId {
        managed_request_id(requester, identifier, ancillary)
    }

    /// Register a whitelist instance. Registration is permissionless, the
    /// way deploying a list is; only referencing one from engine
    /// configuration is role-gated.
    pub fn register_whitelist(&mut self, instance: Box<dyn WhitelistCapability>) -> WhitelistId {
        self.whitelists.register(instance)
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    /// Hand buffered notifications to an observer.
    pub fn drain_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(events: &mut Vec<OracleEvent>, event: OracleEvent) {
        debug!(
            "event: {}",
            serde_json::to_string(&event).unwrap_or_default()
        );
        events.push(event);
    }
}

// Per-managed-request override store.
//
// SAFETY INVARIANTS:
// 1. Presence in a map is the is-set flag; there is no half-set entry
// 2. Bond and liveness overrides are overwrite-only; the whitelist
//    override alone can be cleared back to the default
// 3. Entries are validated against the bounds in force when they are
//    set, and never re-validated afterwards

use crate::identity::ManagedRequestId;
use mandate_core::{Address, WhitelistId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Custom stake, challenge window, and proposer whitelist staged per
/// managed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideStore {
    bonds: BTreeMap<(ManagedRequestId, Address), u128>,
    liveness: BTreeMap<ManagedRequestId, u64>,
    whitelists: BTreeMap<ManagedRequestId, WhitelistId>,
}

impl OverrideStore {
    pub fn new() -> Self {
        OverrideStore::default()
    }

    pub fn set_bond(&mut self, id: ManagedRequestId, currency: Address, amount: u128) {
        self.bonds.insert((id, currency), amount);
    }

    pub fn bond(&self, id: &ManagedRequestId, currency: &Address) -> Option<u128> {
        self.bonds.get(&(*id, *currency)).copied()
    }

    pub fn set_liveness(&mut self, id: ManagedRequestId, window: u64) {
        self.liveness.insert(id, window);
    }

    pub fn liveness(&self, id: &ManagedRequestId) -> Option<u64> {
        self.liveness.get(id).copied()
    }

    pub fn set_whitelist(&mut self, id: ManagedRequestId, whitelist: WhitelistId) {
        self.whitelists.insert(id, whitelist);
    }

    /// Clear the whitelist override; later resolution falls back to the
    /// engine-wide default.
    pub fn clear_whitelist(&mut self, id: &ManagedRequestId) {
        self.whitelists.remove(id);
    }

    pub fn whitelist(&self, id: &ManagedRequestId) -> Option<WhitelistId> {
        self.whitelists.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ManagedRequestId {
        ManagedRequestId([byte; 32])
    }

    #[test]
    fn test_bond_is_keyed_by_id_and_currency() {
        let mut store = OverrideStore::new();
        let usdc = Address([1; 20]);
        let wei = Address([2; 20]);

        store.set_bond(id(1), usdc, 500);
        assert_eq!(store.bond(&id(1), &usdc), Some(500));
        assert_eq!(store.bond(&id(1), &wei), None);
        assert_eq!(store.bond(&id(2), &usdc), None);

        store.set_bond(id(1), usdc, 700);
        assert_eq!(store.bond(&id(1), &usdc), Some(700));
    }

    #[test]
    fn test_whitelist_override_round_trip() {
        let mut store = OverrideStore::new();
        store.set_whitelist(id(1), WhitelistId(3));
        assert_eq!(store.whitelist(&id(1)), Some(WhitelistId(3)));

        store.clear_whitelist(&id(1));
        assert_eq!(store.whitelist(&id(1)), None);
    }
}

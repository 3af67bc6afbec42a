// Whitelist capability seam.
//
// SAFETY INVARIANTS:
// 1. Every conforming instance answers membership through the same trait;
//    callers never branch on the concrete variant
// 2. A WhitelistId resolves against the registry or the reference is
//    rejected outright; there is no partially-usable whitelist
// 3. Registered instances are immutable through the registry; membership
//    is fixed before registration, the way a deployed list is

use crate::types::Address;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WhitelistError {
    #[error("caller {0} does not own this whitelist")]
    NotOwner(Address),
}

/// Membership check with an enabled flag and enumeration.
///
/// Variants differ in policy, not in surface: an enforced list answers from
/// finite membership, a disabled list admits everyone, and a per-request
/// custom implementation may answer however it likes.
pub trait WhitelistCapability {
    /// Whether the identity may act.
    fn contains(&self, account: &Address) -> bool;

    /// Current explicit membership. Empty for always-allow lists.
    fn enumerate(&self) -> Vec<Address>;

    /// Whether membership is actually enforced.
    fn is_enabled(&self) -> bool;
}

/// Registry handle standing in for a deployed whitelist instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WhitelistId(pub u64);

impl WhitelistId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WhitelistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "whitelist#{}", self.0)
    }
}

/// Read-only view surfaced to external callers: explicit members plus
/// whether enforcement is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistStatus {
    pub members: Vec<Address>,
    pub is_enabled: bool,
}

/// Finite-membership whitelist, mutable only by its owner until registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcedWhitelist {
    owner: Address,
    members: BTreeSet<Address>,
}

impl EnforcedWhitelist {
    pub fn new(owner: Address) -> Self {
        EnforcedWhitelist {
            owner,
            members: BTreeSet::new(),
        }
    }

    pub fn add_member(&mut self, caller: Address, account: Address) -> Result<(), WhitelistError> {
        if caller != self.owner {
            return Err(WhitelistError::NotOwner(caller));
        }
        if self.members.insert(account) {
            info!("whitelist member added: {}", account);
        }
        Ok(())
    }

    pub fn remove_member(
        &mut self,
        caller: Address,
        account: &Address,
    ) -> Result<(), WhitelistError> {
        if caller != self.owner {
            return Err(WhitelistError::NotOwner(caller));
        }
        if self.members.remove(account) {
            info!("whitelist member removed: {}", account);
        }
        Ok(())
    }
}

impl WhitelistCapability for EnforcedWhitelist {
    fn contains(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    fn enumerate(&self) -> Vec<Address> {
        self.members.iter().copied().collect()
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Always-allow list: enumerates nothing, enforces nothing, admits everyone.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OpenWhitelist;

impl WhitelistCapability for OpenWhitelist {
    fn contains(&self, _account: &Address) -> bool {
        true
    }

    fn enumerate(&self) -> Vec<Address> {
        Vec::new()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Id-keyed store of capability instances. Resolving an id is the runtime
/// capability probe: an id that does not resolve does not satisfy the
/// capability.
#[derive(Default)]
pub struct WhitelistRegistry {
    next_id: u64,
    instances: BTreeMap<u64, Box<dyn WhitelistCapability>>,
}

impl WhitelistRegistry {
    pub fn new() -> Self {
        WhitelistRegistry {
            next_id: 0,
            instances: BTreeMap::new(),
        }
    }

    /// Register an instance and hand back its id. Ids start at 1 and are
    /// never reused.
    pub fn register(&mut self, instance: Box<dyn WhitelistCapability>) -> WhitelistId {
        self.next_id += 1;
        let id = WhitelistId(self.next_id);
        self.instances.insert(id.0, instance);
        info!("whitelist registered: {}", id);
        id
    }

    pub fn contains(&self, id: WhitelistId) -> bool {
        self.instances.contains_key(&id.0)
    }

    pub fn get(&self, id: WhitelistId) -> Option<&dyn WhitelistCapability> {
        self.instances.get(&id.0).map(|b| b.as_ref())
    }

    pub fn status(&self, id: WhitelistId) -> Option<WhitelistStatus> {
        self.get(id).map(|wl| WhitelistStatus {
            members: wl.enumerate(),
            is_enabled: wl.is_enabled(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_enforced_whitelist_membership() {
        let owner = addr(1);
        let mut wl = EnforcedWhitelist::new(owner);
        wl.add_member(owner, addr(2)).unwrap();

        assert!(wl.contains(&addr(2)));
        assert!(!wl.contains(&addr(3)));
        assert!(wl.is_enabled());
        assert_eq!(wl.enumerate(), vec![addr(2)]);
    }

    #[test]
    fn test_enforced_whitelist_rejects_non_owner() {
        let mut wl = EnforcedWhitelist::new(addr(1));
        let err = wl.add_member(addr(9), addr(2)).unwrap_err();
        assert_eq!(err, WhitelistError::NotOwner(addr(9)));
        assert!(!wl.contains(&addr(2)));
    }

    #[test]
    fn test_open_whitelist_admits_everyone() {
        let wl = OpenWhitelist;
        assert!(wl.contains(&addr(7)));
        assert!(wl.enumerate().is_empty());
        assert!(!wl.is_enabled());
    }

    #[test]
    fn test_registry_resolution_is_the_capability_probe() {
        let mut registry = WhitelistRegistry::new();
        let id = registry.register(Box::new(OpenWhitelist));

        assert!(registry.contains(id));
        assert!(!registry.contains(WhitelistId(id.as_u64() + 1)));

        let status = registry.status(id).unwrap();
        assert!(status.members.is_empty());
        assert!(!status.is_enabled);
    }
}

// Three-tier role hierarchy.
//
// SAFETY INVARIANTS:
// 1. Exactly one administering role per role: RootAuthority administers
//    itself and ConfigAdmin; ConfigAdmin administers RequestManager
// 2. Grant and revoke are gated on the administering role of the target
//    role, never on the target role itself
// 3. Role changes take effect immediately; a revoked holder fails
//    authorization from the very next operation

use crate::error::EngineError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use mandate_core::Address;

/// The three delegation tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
    /// Holds ultimate control: administers ConfigAdmin and is the sole
    /// authority over logic replacement.
    RootAuthority,

    /// Fixes the bounds delegated authority operates within.
    ConfigAdmin,

    /// Tunes per-request parameters inside admin-fixed bounds.
    RequestManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::RootAuthority => "ROOT_AUTHORITY",
            Role::ConfigAdmin => "CONFIG_ADMIN",
            Role::RequestManager => "REQUEST_MANAGER",
        }
    }
}

/// The single role-admin edge for each role.
pub fn role_admin(role: Role) -> Role {
    match role {
        Role::RootAuthority => Role::RootAuthority,
        Role::ConfigAdmin => Role::RootAuthority,
        Role::RequestManager => Role::ConfigAdmin,
    }
}

/// Membership sets per role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRegistry {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleRegistry {
    /// Seed the registry with the initial root authority.
    pub fn bootstrap(root: Address) -> Self {
        let mut registry = RoleRegistry {
            members: BTreeMap::new(),
        };
        registry
            .members
            .entry(Role::RootAuthority)
            .or_default()
            .insert(root);
        info!("role {} bootstrapped to {}", Role::RootAuthority.as_str(), root);
        registry
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    pub fn require(&self, caller: Address, required: Role) -> Result<(), EngineError> {
        if self.has_role(required, &caller) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized { caller, required })
        }
    }

    /// Grant `role` to `account`. Caller must hold the administering role.
    /// Idempotent for existing members.
    pub fn grant(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> Result<(), EngineError> {
        self.require(caller, role_admin(role))?;
        if self.members.entry(role).or_default().insert(account) {
            info!("role {} granted to {} by {}", role.as_str(), account, caller);
        }
        Ok(())
    }

    /// Revoke `role` from `account`. Caller must hold the administering
    /// role. Idempotent for non-members.
    pub fn revoke(
        &mut self,
        caller: Address,
        role: Role,
        account: &Address,
    ) -> Result<(), EngineError> {
        self.require(caller, role_admin(role))?;
        if self
            .members
            .get_mut(&role)
            .map(|set| set.remove(account))
            .unwrap_or(false)
        {
            info!("role {} revoked from {} by {}", role.as_str(), account, caller);
        }
        Ok(())
    }

    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_admin_edges_are_fixed() {
        assert_eq!(role_admin(Role::RootAuthority), Role::RootAuthority);
        assert_eq!(role_admin(Role::ConfigAdmin), Role::RootAuthority);
        assert_eq!(role_admin(Role::RequestManager), Role::ConfigAdmin);
    }

    #[test]
    fn test_root_grants_config_admin_grants_manager() {
        let root = addr(1);
        let admin = addr(2);
        let manager = addr(3);
        let mut roles = RoleRegistry::bootstrap(root);

        roles.grant(root, Role::ConfigAdmin, admin).unwrap();
        roles.grant(admin, Role::RequestManager, manager).unwrap();

        assert!(roles.has_role(Role::ConfigAdmin, &admin));
        assert!(roles.has_role(Role::RequestManager, &manager));
    }

    #[test]
    fn test_config_admin_cannot_mint_config_admins() {
        let root = addr(1);
        let admin = addr(2);
        let mut roles = RoleRegistry::bootstrap(root);
        roles.grant(root, Role::ConfigAdmin, admin).unwrap();

        let err = roles.grant(admin, Role::ConfigAdmin, addr(4)).unwrap_err();
        assert_eq!(
            err,
            EngineError::Unauthorized {
                caller: admin,
                required: Role::RootAuthority,
            }
        );
    }

    #[test]
    fn test_manager_cannot_grant_anything() {
        let root = addr(1);
        let admin = addr(2);
        let manager = addr(3);
        let mut roles = RoleRegistry::bootstrap(root);
        roles.grant(root, Role::ConfigAdmin, admin).unwrap();
        roles.grant(admin, Role::RequestManager, manager).unwrap();

        assert!(roles.grant(manager, Role::RequestManager, addr(5)).is_err());
    }

    #[test]
    fn test_revocation_is_immediate() {
        let root = addr(1);
        let admin = addr(2);
        let manager = addr(3);
        let mut roles = RoleRegistry::bootstrap(root);
        roles.grant(root, Role::ConfigAdmin, admin).unwrap();
        roles.grant(admin, Role::RequestManager, manager).unwrap();

        roles.revoke(admin, Role::RequestManager, &manager).unwrap();
        assert!(!roles.has_role(Role::RequestManager, &manager));
        assert_eq!(
            roles.require(manager, Role::RequestManager).unwrap_err(),
            EngineError::Unauthorized {
                caller: manager,
                required: Role::RequestManager,
            }
        );
    }
}

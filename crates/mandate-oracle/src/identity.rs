// Managed request identity.
//
// SAFETY INVARIANTS:
// 1. Derivation is a pure function of (requester, identifier, ancillary);
//    the timestamp dimension of the full request key is deliberately
//    excluded so configuration can be staged before a request exists
// 2. Every request sharing the triple inherits the same override set,
//    across any number of timestamped instances
// 3. The encoding is fixed: stored keys must remain resolvable across a
//    logic upgrade

use mandate_core::{Address, Identifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of a managed request: the timestamp-free collapse of the full
/// request key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ManagedRequestId(pub [u8; 32]);

impl ManagedRequestId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ManagedRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Derive the managed id for a (requester, identifier, ancillary) triple.
/// The fixed-width requester and identifier lead, so the variable-length
/// ancillary tail cannot alias them.
pub fn managed_request_id(
    requester: &Address,
    identifier: &Identifier,
    ancillary: &[u8],
) -> ManagedRequestId {
    let mut hasher = Sha256::new();
    hasher.update(requester.as_bytes());
    hasher.update(identifier.as_bytes());
    hasher.update(ancillary);
    ManagedRequestId(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_pure() {
        let requester = Address([1; 20]);
        let identifier = Identifier::from_label("GAS_PRICE");
        let a = managed_request_id(&requester, &identifier, b"chain:1");
        let b = managed_request_id(&requester, &identifier, b"chain:1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_dimension_matters() {
        let requester = Address([1; 20]);
        let identifier = Identifier::from_label("GAS_PRICE");
        let base = managed_request_id(&requester, &identifier, b"chain:1");

        assert_ne!(
            base,
            managed_request_id(&Address([2; 20]), &identifier, b"chain:1")
        );
        assert_ne!(
            base,
            managed_request_id(&requester, &Identifier::from_label("FUEL_PRICE"), b"chain:1")
        );
        assert_ne!(base, managed_request_id(&requester, &identifier, b"chain:2"));
    }

    #[test]
    fn test_empty_ancillary_is_a_valid_triple() {
        let requester = Address([1; 20]);
        let identifier = Identifier::from_label("GAS_PRICE");
        let id = managed_request_id(&requester, &identifier, &[]);
        assert_ne!(id, managed_request_id(&requester, &identifier, b"x"));
    }
}

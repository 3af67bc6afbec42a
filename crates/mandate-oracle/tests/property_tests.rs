// Property tests for identity derivation and bond-range enforcement.

use mandate_core::{Address, Identifier, SharedCollateral};
use mandate_escalation::EscalationCore;
use mandate_oracle::{managed_request_id, EngineError, ManagedEscalationEngine, Role};
use proptest::prelude::*;

const ROOT: Address = Address([0xA0; 20]);
const ADMIN: Address = Address([0xA1; 20]);
const MANAGER: Address = Address([0xA2; 20]);
const TOKEN: Address = Address([0x10; 20]);

fn engine_with_range(
    minimum: u128,
    maximum: u128,
) -> ManagedEscalationEngine<EscalationCore, SharedCollateral> {
    let currencies = SharedCollateral::new();
    currencies.add_currency(TOKEN);
    let core = EscalationCore::new(7200, currencies.clone()).unwrap();

    let mut engine = ManagedEscalationEngine::new(ROOT, 600, core, currencies).unwrap();
    engine.grant_role(ROOT, Role::ConfigAdmin, ADMIN).unwrap();
    engine
        .grant_role(ADMIN, Role::RequestManager, MANAGER)
        .unwrap();
    engine
        .set_allowed_bond_range(ADMIN, TOKEN, minimum, maximum)
        .unwrap();
    engine
}

proptest! {
    /// The managed id is a pure function of the triple, and nothing else.
    #[test]
    fn managed_id_is_deterministic(
        requester in prop::array::uniform20(any::<u8>()),
        identifier in prop::array::uniform32(any::<u8>()),
        ancillary in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let requester = Address(requester);
        let identifier = Identifier(identifier);
        let a = managed_request_id(&requester, &identifier, &ancillary);
        let b = managed_request_id(&requester, &identifier, &ancillary);
        prop_assert_eq!(a, b);
    }

    /// Flipping any byte of the ancillary data changes the id.
    #[test]
    fn managed_id_binds_ancillary(
        requester in prop::array::uniform20(any::<u8>()),
        identifier in prop::array::uniform32(any::<u8>()),
        mut ancillary in prop::collection::vec(any::<u8>(), 1..64),
        flip in any::<prop::sample::Index>(),
    ) {
        let requester = Address(requester);
        let identifier = Identifier(identifier);
        let base = managed_request_id(&requester, &identifier, &ancillary);

        let at = flip.index(ancillary.len());
        ancillary[at] ^= 0xFF;
        prop_assert_ne!(base, managed_request_id(&requester, &identifier, &ancillary));
    }

    /// A custom bond is accepted exactly when it is nonzero and inside the
    /// admin-fixed range.
    #[test]
    fn bond_acceptance_matches_range(
        minimum in 1u128..500,
        width in 0u128..500,
        amount in 0u128..1_500,
    ) {
        let maximum = minimum + width;
        let mut engine = engine_with_range(minimum, maximum);
        let requester = Address([0xB0; 20]);
        let identifier = Identifier::from_label("GAS_PRICE");

        let result = engine.set_bond(MANAGER, requester, identifier, b"", TOKEN, amount);
        if amount == 0 {
            prop_assert_eq!(result.unwrap_err(), EngineError::ZeroBondNotAllowed);
        } else if amount < minimum {
            prop_assert_eq!(
                result.unwrap_err(),
                EngineError::BondBelowMinimum { amount, minimum }
            );
        } else if amount > maximum {
            prop_assert_eq!(
                result.unwrap_err(),
                EngineError::BondExceedsMaximum { amount, maximum }
            );
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(
                engine.custom_bond(&requester, &identifier, b"", &TOKEN),
                Some(amount)
            );
        }
    }
}

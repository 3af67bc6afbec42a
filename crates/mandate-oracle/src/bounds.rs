// Admin-owned bounds: per-currency bond ranges and the global challenge
// window floor.
//
// SAFETY INVARIANTS:
// 1. A stored range always satisfies minimum <= maximum
// 2. An unconfigured currency reads as the (0,0) range, which admits no
//    nonzero bond; the default fails closed
// 3. Ranges are overwritten, never deleted

use crate::error::EngineError;
use mandate_core::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive bond range for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BondRange {
    /// Minimum allowed custom bond (inclusive).
    pub minimum: u128,

    /// Maximum allowed custom bond (inclusive).
    pub maximum: u128,
}

impl BondRange {
    pub const ZERO: BondRange = BondRange {
        minimum: 0,
        maximum: 0,
    };

    pub fn new(minimum: u128, maximum: u128) -> Result<Self, EngineError> {
        if minimum > maximum {
            return Err(EngineError::MinimumAboveMaximum { minimum, maximum });
        }
        Ok(BondRange { minimum, maximum })
    }

    pub fn contains(&self, amount: u128) -> bool {
        amount >= self.minimum && amount <= self.maximum
    }
}

/// Per-currency ranges plus the global minimum challenge window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsRegistry {
    ranges: BTreeMap<Address, BondRange>,
    minimum_liveness: u64,
}

impl BoundsRegistry {
    pub fn new(minimum_liveness: u64) -> Self {
        BoundsRegistry {
            ranges: BTreeMap::new(),
            minimum_liveness,
        }
    }

    /// The range in force for a currency; (0,0) when unconfigured.
    pub fn allowed_range(&self, currency: &Address) -> BondRange {
        self.ranges.get(currency).copied().unwrap_or(BondRange::ZERO)
    }

    /// Overwrite unconditionally; no diffing against the prior value.
    pub fn set_range(&mut self, currency: Address, range: BondRange) {
        self.ranges.insert(currency, range);
    }

    pub fn minimum_liveness(&self) -> u64 {
        self.minimum_liveness
    }

    pub fn set_minimum_liveness(&mut self, window: u64) {
        self.minimum_liveness = window;
    }
}

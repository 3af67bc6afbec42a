// Collateral whitelist collaborator.
//
// The engine and the base protocol both consult the same set of supported
// currencies; SharedCollateral is the clone-able handle that keeps them in
// agreement inside one process.

use crate::types::Address;
use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Membership check for currencies accepted as reward/bond collateral.
pub trait CurrencyWhitelist {
    fn is_supported(&self, currency: &Address) -> bool;
}

/// The set of currencies accepted for rewards and bonds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralList {
    supported: BTreeSet<Address>,
}

impl CollateralList {
    pub fn new() -> Self {
        CollateralList {
            supported: BTreeSet::new(),
        }
    }

    pub fn add_currency(&mut self, currency: Address) {
        if self.supported.insert(currency) {
            info!("collateral currency added: {}", currency);
        }
    }

    pub fn remove_currency(&mut self, currency: &Address) {
        if self.supported.remove(currency) {
            info!("collateral currency removed: {}", currency);
        }
    }

    pub fn supported(&self) -> Vec<Address> {
        self.supported.iter().copied().collect()
    }
}

impl CurrencyWhitelist for CollateralList {
    fn is_supported(&self, currency: &Address) -> bool {
        self.supported.contains(currency)
    }
}

/// Shared read-locked handle to one collateral list.
#[derive(Clone, Default)]
pub struct SharedCollateral(Arc<RwLock<CollateralList>>);

impl SharedCollateral {
    pub fn new() -> Self {
        SharedCollateral(Arc::new(RwLock::new(CollateralList::new())))
    }

    pub fn add_currency(&self, currency: Address) {
        self.0.write().add_currency(currency);
    }

    pub fn remove_currency(&self, currency: &Address) {
        self.0.write().remove_currency(currency);
    }

    pub fn supported(&self) -> Vec<Address> {
        self.0.read().supported()
    }
}

impl CurrencyWhitelist for SharedCollateral {
    fn is_supported(&self, currency: &Address) -> bool {
        self.0.read().is_supported(currency)
    }
}

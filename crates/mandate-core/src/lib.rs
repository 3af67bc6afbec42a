/// MANDATE CORE
///
/// Shared primitives for the Mandate oracle stack:
/// - Fixed-width identity types used across every registry key
/// - The whitelist capability seam and its conforming variants
/// - The collateral (currency) whitelist collaborator

pub mod currency;
pub mod types;
pub mod whitelist;

pub use types::{Address, Identifier, TypeError};

pub use whitelist::{
    EnforcedWhitelist, OpenWhitelist, WhitelistCapability, WhitelistError, WhitelistId,
    WhitelistRegistry, WhitelistStatus,
};

pub use currency::{CollateralList, CurrencyWhitelist, SharedCollateral};

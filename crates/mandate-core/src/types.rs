// Identity primitives shared by every registry and store in the stack.
//
// SAFETY INVARIANTS:
// 1. Address and Identifier are fixed-width so every hash derivation over
//    them is unambiguous without length framing
// 2. Byte accessors return the exact bytes that were constructed; no
//    canonicalization happens after construction

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("expected {expected} hex bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}

/// A 20-byte account identity (externally-owned account or deployed logic).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(TypeError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A 32-byte price identifier (e.g. the registered name of a price feed).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Identifier(pub [u8; 32]);

impl Identifier {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build an identifier from a short label, zero-padded on the right.
    /// Labels longer than 32 bytes are truncated.
    pub fn from_label(label: &str) -> Self {
        let mut out = [0u8; 32];
        let raw = label.as_bytes();
        let len = raw.len().min(32);
        out[..len].copy_from_slice(&raw[..len]);
        Identifier(out)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render the label portion when printable, otherwise fall back to hex.
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(32);
        match std::str::from_utf8(&self.0[..end]) {
            Ok(label) if !label.is_empty() && label.chars().all(|c| c.is_ascii_graphic()) => {
                write!(f, "{}", label)
            }
            _ => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}
